use anyhow::Result;
use rusqlite::{OptionalExtension, Row, params};

use crate::models::PostRow;
use crate::{Database, now_rfc3339};

/// Posts are always selected together with their author's summary columns,
/// in a single query.
pub(crate) const POST_SELECT: &str = "SELECT p.id, p.content, p.author_id, p.parent_id, p.seed_id, p.kind, p.image, \
            p.replies, p.forks, p.likes, p.bookmarks, p.created_at, p.updated_at, \
            u.username, u.display_name, u.avatar_url \
     FROM posts p \
     JOIN users u ON p.author_id = u.id";

pub(crate) fn map_post(row: &Row) -> rusqlite::Result<PostRow> {
    Ok(PostRow {
        id: row.get(0)?,
        content: row.get(1)?,
        author_id: row.get(2)?,
        parent_id: row.get(3)?,
        seed_id: row.get(4)?,
        kind: row.get(5)?,
        image: row.get(6)?,
        replies: row.get(7)?,
        forks: row.get(8)?,
        likes: row.get(9)?,
        bookmarks: row.get(10)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
        author_username: row.get(13)?,
        author_display_name: row.get(14)?,
        author_avatar_url: row.get(15)?,
    })
}

impl Database {
    pub fn insert_post(
        &self,
        id: &str,
        content: &str,
        author_id: &str,
        parent_id: Option<&str>,
        seed_id: Option<&str>,
        kind: &str,
        image: Option<&str>,
    ) -> Result<()> {
        let now = now_rfc3339();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO posts (id, content, author_id, parent_id, seed_id, kind, image,
                                    created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![id, content, author_id, parent_id, seed_id, kind, image, now, now],
            )?;
            Ok(())
        })
    }

    /// Second step of root-post creation: the id does not exist before the
    /// first insert, so the self-referencing seed is written afterwards.
    pub fn set_seed_to_self(&self, id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("UPDATE posts SET seed_id = id WHERE id = ?1", [id])?;
            Ok(())
        })
    }

    pub fn get_post(&self, id: &str) -> Result<Option<PostRow>> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row(&format!("{POST_SELECT} WHERE p.id = ?1"), [id], map_post)
                .optional()?)
        })
    }

    pub fn list_posts(&self, limit: u32, offset: u32) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{POST_SELECT} ORDER BY p.created_at DESC LIMIT ?1 OFFSET ?2"
            ))?;
            let rows = stmt
                .query_map(params![limit, offset], map_post)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    pub fn list_posts_by_author(
        &self,
        author_id: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{POST_SELECT} WHERE p.author_id = ?1
                 ORDER BY p.created_at DESC LIMIT ?2 OFFSET ?3"
            ))?;
            let rows = stmt
                .query_map(params![author_id, limit, offset], map_post)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    /// Direct children of a post ("branches"), oldest first.
    pub fn list_children(&self, parent_id: &str) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{POST_SELECT} WHERE p.parent_id = ?1 ORDER BY p.created_at"
            ))?;
            let rows = stmt
                .query_map([parent_id], map_post)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    pub fn list_children_of_kind(&self, parent_id: &str, kind: &str) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{POST_SELECT} WHERE p.parent_id = ?1 AND p.kind = ?2 ORDER BY p.created_at"
            ))?;
            let rows = stmt
                .query_map(params![parent_id, kind], map_post)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    pub fn bump_reply_count(&self, id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("UPDATE posts SET replies = replies + 1 WHERE id = ?1", [id])?;
            Ok(())
        })
    }

    pub fn bump_fork_count(&self, id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("UPDATE posts SET forks = forks + 1 WHERE id = ?1", [id])?;
            Ok(())
        })
    }

    /// Write back a recomputed like count (see the like toggle flow: the
    /// count query and this write are separate statements, not a transaction).
    pub fn set_like_count(&self, id: &str, count: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE posts SET likes = ?1 WHERE id = ?2",
                params![count, id],
            )?;
            Ok(())
        })
    }

    /// Hard delete. Likes and notifications referencing the post cascade;
    /// children are detached but keep their seed.
    pub fn delete_post(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute("DELETE FROM posts WHERE id = ?1", [id])?;
            Ok(n > 0)
        })
    }
}
