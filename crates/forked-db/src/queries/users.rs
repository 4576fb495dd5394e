use anyhow::{Result, anyhow};
use rusqlite::{OptionalExtension, Row, params};

use crate::models::{GithubProfile, ProfilePatch, UserRow};
use crate::{Database, now_rfc3339};

pub(crate) const USER_COLS: &str = "id, github_id, username, display_name, avatar_url, \
     profile_url, email, bio, location, website, banner_url, \
     followers_count, following_count, created_at, updated_at";

pub(crate) fn map_user(row: &Row) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        github_id: row.get(1)?,
        username: row.get(2)?,
        display_name: row.get(3)?,
        avatar_url: row.get(4)?,
        profile_url: row.get(5)?,
        email: row.get(6)?,
        bio: row.get(7)?,
        location: row.get(8)?,
        website: row.get(9)?,
        banner_url: row.get(10)?,
        followers_count: row.get(11)?,
        following_count: row.get(12)?,
        created_at: row.get(13)?,
        updated_at: row.get(14)?,
    })
}

impl Database {
    /// Find-or-create a user from an OAuth login. Existing users get their
    /// display name and avatar refreshed from the provider.
    pub fn upsert_github_user(&self, id_if_new: &str, profile: &GithubProfile) -> Result<UserRow> {
        self.with_conn(|conn| {
            let existing = conn
                .query_row(
                    &format!("SELECT {USER_COLS} FROM users WHERE github_id = ?1"),
                    [profile.github_id],
                    map_user,
                )
                .optional()?;

            let now = now_rfc3339();
            let id = match existing {
                Some(user) => {
                    conn.execute(
                        "UPDATE users SET display_name = ?1, avatar_url = ?2, updated_at = ?3
                         WHERE id = ?4",
                        params![profile.display_name, profile.avatar_url, now, user.id],
                    )?;
                    user.id
                }
                None => {
                    conn.execute(
                        "INSERT INTO users (id, github_id, username, display_name, avatar_url,
                                            profile_url, email, created_at, updated_at)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                        params![
                            id_if_new,
                            profile.github_id,
                            profile.username,
                            profile.display_name,
                            profile.avatar_url,
                            profile.profile_url,
                            profile.email,
                            now,
                            now,
                        ],
                    )?;
                    id_if_new.to_string()
                }
            };

            conn.query_row(
                &format!("SELECT {USER_COLS} FROM users WHERE id = ?1"),
                [&id],
                map_user,
            )
            .map_err(|e| anyhow!("user {} vanished after upsert: {}", id, e))
        })
    }

    pub fn get_user(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    &format!("SELECT {USER_COLS} FROM users WHERE id = ?1"),
                    [id],
                    map_user,
                )
                .optional()?)
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    &format!("SELECT {USER_COLS} FROM users WHERE username = ?1"),
                    [username],
                    map_user,
                )
                .optional()?)
        })
    }

    pub fn list_users(&self) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {USER_COLS} FROM users ORDER BY created_at"))?;
            let rows = stmt
                .query_map([], map_user)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    /// Case-insensitive substring match on username or display name.
    pub fn search_users(&self, query: &str, limit: u32) -> Result<Vec<UserRow>> {
        let pattern = format!("%{}%", query);
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {USER_COLS} FROM users
                 WHERE username LIKE ?1 OR display_name LIKE ?1
                 ORDER BY username
                 LIMIT ?2"
            ))?;
            let rows = stmt
                .query_map(params![pattern, limit], map_user)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    /// Apply a partial profile edit; untouched fields keep their value.
    pub fn update_profile(&self, id: &str, patch: &ProfilePatch) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let mut sets: Vec<&str> = Vec::new();
            let mut values: Vec<&dyn rusqlite::types::ToSql> = Vec::new();

            if let Some(v) = &patch.display_name {
                sets.push("display_name = ?");
                values.push(v);
            }
            if let Some(v) = &patch.bio {
                sets.push("bio = ?");
                values.push(v);
            }
            if let Some(v) = &patch.location {
                sets.push("location = ?");
                values.push(v);
            }
            if let Some(v) = &patch.website {
                sets.push("website = ?");
                values.push(v);
            }
            if let Some(v) = &patch.avatar_url {
                sets.push("avatar_url = ?");
                values.push(v);
            }
            if let Some(v) = &patch.banner_url {
                sets.push("banner_url = ?");
                values.push(v);
            }

            let now = now_rfc3339();
            if !sets.is_empty() {
                sets.push("updated_at = ?");
                values.push(&now);
                values.push(&id);
                let sql = format!("UPDATE users SET {} WHERE id = ?", sets.join(", "));
                conn.execute(&sql, values.as_slice())?;
            }

            Ok(conn
                .query_row(
                    &format!("SELECT {USER_COLS} FROM users WHERE id = ?1"),
                    [id],
                    map_user,
                )
                .optional()?)
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::models::ProfilePatch;
    use crate::test_util::{open_temp, seed_user};

    #[test]
    fn upsert_is_idempotent_per_github_id() {
        let (db, _dir) = open_temp();
        let first = seed_user(&db, "gh-1", "octocat");
        let second = seed_user(&db, "gh-1", "octocat");
        assert_eq!(first, second);
        assert_eq!(db.list_users().unwrap().len(), 1);
    }

    #[test]
    fn repeat_login_refreshes_profile() {
        let (db, _dir) = open_temp();
        let id = seed_user(&db, "gh-2", "hubber");
        let user = db
            .upsert_github_user(
                "ignored-new-id",
                &crate::models::GithubProfile {
                    github_id: "gh-2",
                    username: "hubber",
                    display_name: Some("The Hubber"),
                    avatar_url: Some("https://example.com/a.png"),
                    profile_url: None,
                    email: None,
                },
            )
            .unwrap();
        assert_eq!(user.id, id);
        assert_eq!(user.display_name.as_deref(), Some("The Hubber"));
        assert_eq!(user.avatar_url.as_deref(), Some("https://example.com/a.png"));
    }

    #[test]
    fn profile_patch_touches_only_provided_fields() {
        let (db, _dir) = open_temp();
        let id = seed_user(&db, "gh-3", "patchy");

        let user = db
            .update_profile(
                &id,
                &ProfilePatch {
                    bio: Some("hello".into()),
                    ..Default::default()
                },
            )
            .unwrap()
            .unwrap();
        assert_eq!(user.bio.as_deref(), Some("hello"));
        assert_eq!(user.display_name.as_deref(), Some("patchy"));

        // Empty patch is a no-op read-back.
        let user = db.update_profile(&id, &ProfilePatch::default()).unwrap().unwrap();
        assert_eq!(user.bio.as_deref(), Some("hello"));
    }

    #[test]
    fn search_matches_username_and_display_name() {
        let (db, _dir) = open_temp();
        seed_user(&db, "gh-4", "alice");
        seed_user(&db, "gh-5", "bob");

        let hits = db.search_users("ali", 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].username, "alice");

        assert!(db.search_users("zzz", 10).unwrap().is_empty());
    }
}
