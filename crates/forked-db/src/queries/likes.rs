use anyhow::Result;
use rusqlite::{OptionalExtension, params};

use crate::models::{LikedPostRow, LikerRow, PostRow};
use crate::{Database, now_rfc3339};

impl Database {
    pub fn like_exists(&self, user_id: &str, post_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let hit: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM likes WHERE user_id = ?1 AND post_id = ?2",
                    params![user_id, post_id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(hit.is_some())
        })
    }

    /// Fails on a duplicate (user, post) pair via the unique index.
    pub fn insert_like(&self, id: &str, user_id: &str, post_id: &str) -> Result<()> {
        let now = now_rfc3339();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO likes (id, user_id, post_id, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![id, user_id, post_id, now],
            )?;
            Ok(())
        })
    }

    /// Deleting an absent like is a no-op; returns whether a row was removed.
    pub fn delete_like(&self, user_id: &str, post_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "DELETE FROM likes WHERE user_id = ?1 AND post_id = ?2",
                params![user_id, post_id],
            )?;
            Ok(n > 0)
        })
    }

    pub fn count_likes(&self, post_id: &str) -> Result<i64> {
        self.with_conn(|conn| {
            Ok(conn.query_row(
                "SELECT COUNT(*) FROM likes WHERE post_id = ?1",
                [post_id],
                |row| row.get(0),
            )?)
        })
    }

    /// Posts a user has liked, newest like first, with post + author joined.
    pub fn list_likes_by_user(&self, user_id: &str) -> Result<Vec<LikedPostRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT l.id, l.created_at,
                        p.id, p.content, p.author_id, p.parent_id, p.seed_id, p.kind, p.image,
                        p.replies, p.forks, p.likes, p.bookmarks, p.created_at, p.updated_at,
                        u.username, u.display_name, u.avatar_url
                 FROM likes l
                 JOIN posts p ON l.post_id = p.id
                 JOIN users u ON p.author_id = u.id
                 WHERE l.user_id = ?1
                 ORDER BY l.created_at DESC",
            )?;
            let rows = stmt
                .query_map([user_id], |row| {
                    Ok(LikedPostRow {
                        like_id: row.get(0)?,
                        liked_at: row.get(1)?,
                        post: PostRow {
                            id: row.get(2)?,
                            content: row.get(3)?,
                            author_id: row.get(4)?,
                            parent_id: row.get(5)?,
                            seed_id: row.get(6)?,
                            kind: row.get(7)?,
                            image: row.get(8)?,
                            replies: row.get(9)?,
                            forks: row.get(10)?,
                            likes: row.get(11)?,
                            bookmarks: row.get(12)?,
                            created_at: row.get(13)?,
                            updated_at: row.get(14)?,
                            author_username: row.get(15)?,
                            author_display_name: row.get(16)?,
                            author_avatar_url: row.get(17)?,
                        },
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    /// Lightweight liked-status check: just the post ids.
    pub fn list_liked_post_ids(&self, user_id: &str) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT post_id FROM likes WHERE user_id = ?1")?;
            let rows = stmt
                .query_map([user_id], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    pub fn list_likers(&self, post_id: &str) -> Result<Vec<LikerRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT l.id, l.user_id, u.username, u.display_name, u.avatar_url, l.created_at
                 FROM likes l
                 JOIN users u ON l.user_id = u.id
                 WHERE l.post_id = ?1
                 ORDER BY l.created_at DESC",
            )?;
            let rows = stmt
                .query_map([post_id], |row| {
                    Ok(LikerRow {
                        like_id: row.get(0)?,
                        user_id: row.get(1)?,
                        username: row.get(2)?,
                        display_name: row.get(3)?,
                        avatar_url: row.get(4)?,
                        liked_at: row.get(5)?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::test_util::{open_temp, seed_root_post, seed_user};
    use uuid::Uuid;

    #[test]
    fn duplicate_like_is_rejected() {
        let (db, _dir) = open_temp();
        let alice = seed_user(&db, "gh-1", "alice");
        let bob = seed_user(&db, "gh-2", "bob");
        let post = seed_root_post(&db, &alice, "root");

        db.insert_like(&Uuid::new_v4().to_string(), &bob, &post).unwrap();
        assert!(db.like_exists(&bob, &post).unwrap());

        let dup = db.insert_like(&Uuid::new_v4().to_string(), &bob, &post);
        assert!(dup.is_err());
        assert_eq!(db.count_likes(&post).unwrap(), 1);
    }

    #[test]
    fn unlike_missing_is_a_noop() {
        let (db, _dir) = open_temp();
        let alice = seed_user(&db, "gh-1", "alice");
        let post = seed_root_post(&db, &alice, "root");

        assert!(!db.delete_like(&alice, &post).unwrap());
        assert_eq!(db.count_likes(&post).unwrap(), 0);
    }

    #[test]
    fn recount_matches_live_rows() {
        let (db, _dir) = open_temp();
        let alice = seed_user(&db, "gh-1", "alice");
        let bob = seed_user(&db, "gh-2", "bob");
        let carol = seed_user(&db, "gh-3", "carol");
        let post = seed_root_post(&db, &alice, "root");

        db.insert_like(&Uuid::new_v4().to_string(), &bob, &post).unwrap();
        db.insert_like(&Uuid::new_v4().to_string(), &carol, &post).unwrap();
        assert_eq!(db.count_likes(&post).unwrap(), 2);

        db.delete_like(&bob, &post).unwrap();
        let count = db.count_likes(&post).unwrap();
        assert_eq!(count, 1);

        db.set_like_count(&post, count).unwrap();
        assert_eq!(db.get_post(&post).unwrap().unwrap().likes, 1);
    }

    #[test]
    fn liked_listings_follow_the_join() {
        let (db, _dir) = open_temp();
        let alice = seed_user(&db, "gh-1", "alice");
        let bob = seed_user(&db, "gh-2", "bob");
        let post = seed_root_post(&db, &alice, "root");

        db.insert_like(&Uuid::new_v4().to_string(), &bob, &post).unwrap();

        let liked = db.list_likes_by_user(&bob).unwrap();
        assert_eq!(liked.len(), 1);
        assert_eq!(liked[0].post.id, post);
        assert_eq!(liked[0].post.author_username, "alice");

        assert_eq!(db.list_liked_post_ids(&bob).unwrap(), vec![post.clone()]);

        let likers = db.list_likers(&post).unwrap();
        assert_eq!(likers.len(), 1);
        assert_eq!(likers[0].username, "bob");
    }
}
