pub mod migrations;
pub mod models;
pub mod queries;

use anyhow::Result;
use rusqlite::Connection;
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // WAL mode for concurrent reads
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        migrations::run(&conn)?;

        info!("Database opened at {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| anyhow::anyhow!("DB lock poisoned: {}", e))?;
        f(&conn)
    }
}

pub(crate) fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

#[cfg(test)]
pub(crate) mod test_util {
    use super::Database;
    use crate::models::GithubProfile;

    pub fn open_temp() -> (Database, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(&dir.path().join("test.db")).unwrap();
        (db, dir)
    }

    pub fn seed_user(db: &Database, github_id: &str, username: &str) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        let user = db
            .upsert_github_user(
                &id,
                &GithubProfile {
                    github_id,
                    username,
                    display_name: Some(username),
                    avatar_url: None,
                    profile_url: None,
                    email: None,
                },
            )
            .unwrap();
        user.id
    }

    pub fn seed_root_post(db: &Database, author_id: &str, content: &str) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        db.insert_post(&id, content, author_id, None, None, "root", None)
            .unwrap();
        db.set_seed_to_self(&id).unwrap();
        id
    }
}
