use anyhow::Result;
use rusqlite::{OptionalExtension, Row, params};

use crate::models::{FollowRow, FollowUserRow};
use crate::{Database, now_rfc3339};

fn map_follow_user(row: &Row) -> rusqlite::Result<FollowUserRow> {
    Ok(FollowUserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        display_name: row.get(2)?,
        avatar_url: row.get(3)?,
        bio: row.get(4)?,
        followers_count: row.get(5)?,
        following_count: row.get(6)?,
        followed_at: row.get(7)?,
    })
}

impl Database {
    pub fn follow_exists(&self, follower_id: &str, following_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let hit: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM follows WHERE follower_id = ?1 AND following_id = ?2",
                    params![follower_id, following_id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(hit.is_some())
        })
    }

    /// Fails on a duplicate (follower, following) pair via the unique index.
    pub fn insert_follow(&self, id: &str, follower_id: &str, following_id: &str) -> Result<FollowRow> {
        let now = now_rfc3339();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO follows (id, follower_id, following_id, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![id, follower_id, following_id, now],
            )?;
            Ok(FollowRow {
                id: id.to_string(),
                follower_id: follower_id.to_string(),
                following_id: following_id.to_string(),
                created_at: now.clone(),
            })
        })
    }

    pub fn delete_follow(&self, follower_id: &str, following_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "DELETE FROM follows WHERE follower_id = ?1 AND following_id = ?2",
                params![follower_id, following_id],
            )?;
            Ok(n > 0)
        })
    }

    /// Adjust both users' denormalized counters after a follow (+1) or
    /// unfollow (-1). Read-modify-write, two users, no transaction.
    pub fn adjust_follow_counts(
        &self,
        follower_id: &str,
        following_id: &str,
        delta: i64,
    ) -> Result<()> {
        self.with_conn(|conn| {
            let following_count: i64 = conn.query_row(
                "SELECT following_count FROM users WHERE id = ?1",
                [follower_id],
                |row| row.get(0),
            )?;
            conn.execute(
                "UPDATE users SET following_count = ?1 WHERE id = ?2",
                params![following_count + delta, follower_id],
            )?;

            let followers_count: i64 = conn.query_row(
                "SELECT followers_count FROM users WHERE id = ?1",
                [following_id],
                |row| row.get(0),
            )?;
            conn.execute(
                "UPDATE users SET followers_count = ?1 WHERE id = ?2",
                params![followers_count + delta, following_id],
            )?;
            Ok(())
        })
    }

    pub fn list_followers(
        &self,
        user_id: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<FollowUserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT u.id, u.username, u.display_name, u.avatar_url, u.bio,
                        u.followers_count, u.following_count, f.created_at
                 FROM follows f
                 JOIN users u ON f.follower_id = u.id
                 WHERE f.following_id = ?1
                 ORDER BY f.created_at DESC
                 LIMIT ?2 OFFSET ?3",
            )?;
            let rows = stmt
                .query_map(params![user_id, limit, offset], map_follow_user)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    pub fn list_following(
        &self,
        user_id: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<FollowUserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT u.id, u.username, u.display_name, u.avatar_url, u.bio,
                        u.followers_count, u.following_count, f.created_at
                 FROM follows f
                 JOIN users u ON f.following_id = u.id
                 WHERE f.follower_id = ?1
                 ORDER BY f.created_at DESC
                 LIMIT ?2 OFFSET ?3",
            )?;
            let rows = stmt
                .query_map(params![user_id, limit, offset], map_follow_user)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    pub fn count_followers(&self, user_id: &str) -> Result<i64> {
        self.with_conn(|conn| {
            Ok(conn.query_row(
                "SELECT COUNT(*) FROM follows WHERE following_id = ?1",
                [user_id],
                |row| row.get(0),
            )?)
        })
    }

    pub fn count_following(&self, user_id: &str) -> Result<i64> {
        self.with_conn(|conn| {
            Ok(conn.query_row(
                "SELECT COUNT(*) FROM follows WHERE follower_id = ?1",
                [user_id],
                |row| row.get(0),
            )?)
        })
    }

    /// Which of `candidate_ids` does `follower_id` follow? One batched
    /// membership query for the isFollowing flags on listings.
    pub fn filter_following(
        &self,
        follower_id: &str,
        candidate_ids: &[String],
    ) -> Result<Vec<String>> {
        if candidate_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let placeholders: Vec<String> = (2..=candidate_ids.len() + 1)
                .map(|i| format!("?{}", i))
                .collect();
            let sql = format!(
                "SELECT following_id FROM follows
                 WHERE follower_id = ?1 AND following_id IN ({})",
                placeholders.join(", ")
            );

            let mut stmt = conn.prepare(&sql)?;
            let mut sql_params: Vec<&dyn rusqlite::types::ToSql> = vec![&follower_id];
            for id in candidate_ids {
                sql_params.push(id);
            }

            let rows = stmt
                .query_map(sql_params.as_slice(), |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::test_util::{open_temp, seed_user};
    use uuid::Uuid;

    #[test]
    fn duplicate_follow_is_rejected() {
        let (db, _dir) = open_temp();
        let alice = seed_user(&db, "gh-1", "alice");
        let bob = seed_user(&db, "gh-2", "bob");

        db.insert_follow(&Uuid::new_v4().to_string(), &alice, &bob).unwrap();
        assert!(db.follow_exists(&alice, &bob).unwrap());
        assert!(db.insert_follow(&Uuid::new_v4().to_string(), &alice, &bob).is_err());
    }

    #[test]
    fn counters_move_by_one_per_edge() {
        let (db, _dir) = open_temp();
        let alice = seed_user(&db, "gh-1", "alice");
        let bob = seed_user(&db, "gh-2", "bob");

        db.insert_follow(&Uuid::new_v4().to_string(), &alice, &bob).unwrap();
        db.adjust_follow_counts(&alice, &bob, 1).unwrap();

        let alice_row = db.get_user(&alice).unwrap().unwrap();
        let bob_row = db.get_user(&bob).unwrap().unwrap();
        assert_eq!(alice_row.following_count, 1);
        assert_eq!(alice_row.followers_count, 0);
        assert_eq!(bob_row.followers_count, 1);

        db.delete_follow(&alice, &bob).unwrap();
        db.adjust_follow_counts(&alice, &bob, -1).unwrap();

        let alice_row = db.get_user(&alice).unwrap().unwrap();
        let bob_row = db.get_user(&bob).unwrap().unwrap();
        assert_eq!(alice_row.following_count, 0);
        assert_eq!(bob_row.followers_count, 0);
    }

    #[test]
    fn unfollow_missing_edge_reports_nothing_removed() {
        let (db, _dir) = open_temp();
        let alice = seed_user(&db, "gh-1", "alice");
        let bob = seed_user(&db, "gh-2", "bob");
        assert!(!db.delete_follow(&alice, &bob).unwrap());
    }

    #[test]
    fn followers_listing_and_batch_membership() {
        let (db, _dir) = open_temp();
        let alice = seed_user(&db, "gh-1", "alice");
        let bob = seed_user(&db, "gh-2", "bob");
        let carol = seed_user(&db, "gh-3", "carol");

        // bob and carol follow alice; alice follows carol back.
        db.insert_follow(&Uuid::new_v4().to_string(), &bob, &alice).unwrap();
        db.insert_follow(&Uuid::new_v4().to_string(), &carol, &alice).unwrap();
        db.insert_follow(&Uuid::new_v4().to_string(), &alice, &carol).unwrap();

        let followers = db.list_followers(&alice, 20, 0).unwrap();
        assert_eq!(followers.len(), 2);
        assert_eq!(db.count_followers(&alice).unwrap(), 2);

        let ids: Vec<String> = followers.iter().map(|f| f.id.clone()).collect();
        let followed_back = db.filter_following(&alice, &ids).unwrap();
        assert_eq!(followed_back, vec![carol.clone()]);

        assert!(db.filter_following(&alice, &[]).unwrap().is_empty());
    }
}
