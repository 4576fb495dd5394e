use anyhow::Result;
use rusqlite::{Row, params};

use crate::models::NotificationRow;
use crate::{Database, now_rfc3339};

fn map_notification(row: &Row) -> rusqlite::Result<NotificationRow> {
    Ok(NotificationRow {
        id: row.get(0)?,
        recipient_id: row.get(1)?,
        sender_id: row.get(2)?,
        kind: row.get(3)?,
        post_id: row.get(4)?,
        read: row.get(5)?,
        created_at: row.get(6)?,
        sender_username: row.get(7)?,
        sender_display_name: row.get(8)?,
        sender_avatar_url: row.get(9)?,
        post_content: row.get(10)?,
    })
}

impl Database {
    pub fn insert_notification(
        &self,
        id: &str,
        recipient_id: &str,
        sender_id: &str,
        kind: &str,
        post_id: Option<&str>,
    ) -> Result<()> {
        let now = now_rfc3339();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO notifications (id, recipient_id, sender_id, kind, post_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![id, recipient_id, sender_id, kind, post_id, now],
            )?;
            Ok(())
        })
    }

    /// Inbox listing, newest first, with sender summary and post preview
    /// joined in one query.
    pub fn list_notifications(
        &self,
        recipient_id: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<NotificationRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT n.id, n.recipient_id, n.sender_id, n.kind, n.post_id, n.read,
                        n.created_at, u.username, u.display_name, u.avatar_url, p.content
                 FROM notifications n
                 JOIN users u ON n.sender_id = u.id
                 LEFT JOIN posts p ON n.post_id = p.id
                 WHERE n.recipient_id = ?1
                 ORDER BY n.created_at DESC
                 LIMIT ?2 OFFSET ?3",
            )?;
            let rows = stmt
                .query_map(params![recipient_id, limit, offset], map_notification)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    pub fn count_notifications(&self, recipient_id: &str) -> Result<i64> {
        self.with_conn(|conn| {
            Ok(conn.query_row(
                "SELECT COUNT(*) FROM notifications WHERE recipient_id = ?1",
                [recipient_id],
                |row| row.get(0),
            )?)
        })
    }

    pub fn count_unread(&self, recipient_id: &str) -> Result<i64> {
        self.with_conn(|conn| {
            Ok(conn.query_row(
                "SELECT COUNT(*) FROM notifications WHERE recipient_id = ?1 AND read = 0",
                [recipient_id],
                |row| row.get(0),
            )?)
        })
    }

    /// Scoped to the recipient so nobody can mark another inbox's entries.
    pub fn mark_notification_read(&self, id: &str, recipient_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "UPDATE notifications SET read = 1 WHERE id = ?1 AND recipient_id = ?2",
                params![id, recipient_id],
            )?;
            Ok(n > 0)
        })
    }

    pub fn mark_all_read(&self, recipient_id: &str) -> Result<usize> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "UPDATE notifications SET read = 1 WHERE recipient_id = ?1 AND read = 0",
                [recipient_id],
            )?;
            Ok(n)
        })
    }

    pub fn delete_notification(&self, id: &str, recipient_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "DELETE FROM notifications WHERE id = ?1 AND recipient_id = ?2",
                params![id, recipient_id],
            )?;
            Ok(n > 0)
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::test_util::{open_temp, seed_root_post, seed_user};
    use uuid::Uuid;

    #[test]
    fn inbox_lists_newest_first_with_sender_and_post() {
        let (db, _dir) = open_temp();
        let alice = seed_user(&db, "gh-1", "alice");
        let bob = seed_user(&db, "gh-2", "bob");
        let post = seed_root_post(&db, &alice, "root");

        db.insert_notification(&Uuid::new_v4().to_string(), &alice, &bob, "follow", None)
            .unwrap();
        db.insert_notification(&Uuid::new_v4().to_string(), &alice, &bob, "like", Some(&post))
            .unwrap();

        let inbox = db.list_notifications(&alice, 20, 0).unwrap();
        assert_eq!(inbox.len(), 2);
        assert!(inbox.iter().all(|n| n.sender_username == "bob"));
        assert!(inbox.iter().any(|n| n.post_content.as_deref() == Some("root")));
        assert_eq!(db.count_notifications(&alice).unwrap(), 2);
        assert_eq!(db.count_unread(&alice).unwrap(), 2);
    }

    #[test]
    fn read_marking_is_scoped_to_recipient() {
        let (db, _dir) = open_temp();
        let alice = seed_user(&db, "gh-1", "alice");
        let bob = seed_user(&db, "gh-2", "bob");

        let id = Uuid::new_v4().to_string();
        db.insert_notification(&id, &alice, &bob, "follow", None).unwrap();

        // bob cannot touch alice's inbox entry.
        assert!(!db.mark_notification_read(&id, &bob).unwrap());
        assert_eq!(db.count_unread(&alice).unwrap(), 1);

        assert!(db.mark_notification_read(&id, &alice).unwrap());
        assert_eq!(db.count_unread(&alice).unwrap(), 0);
    }

    #[test]
    fn mark_all_read_reports_rows_touched() {
        let (db, _dir) = open_temp();
        let alice = seed_user(&db, "gh-1", "alice");
        let bob = seed_user(&db, "gh-2", "bob");

        for _ in 0..3 {
            db.insert_notification(&Uuid::new_v4().to_string(), &alice, &bob, "follow", None)
                .unwrap();
        }

        assert_eq!(db.mark_all_read(&alice).unwrap(), 3);
        assert_eq!(db.mark_all_read(&alice).unwrap(), 0);
    }

    #[test]
    fn delete_is_scoped_to_recipient() {
        let (db, _dir) = open_temp();
        let alice = seed_user(&db, "gh-1", "alice");
        let bob = seed_user(&db, "gh-2", "bob");

        let id = Uuid::new_v4().to_string();
        db.insert_notification(&id, &alice, &bob, "follow", None).unwrap();

        assert!(!db.delete_notification(&id, &bob).unwrap());
        assert!(db.delete_notification(&id, &alice).unwrap());
        assert_eq!(db.count_notifications(&alice).unwrap(), 0);
    }
}
