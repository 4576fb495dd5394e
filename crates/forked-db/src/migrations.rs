use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id              TEXT PRIMARY KEY,
            github_id       TEXT NOT NULL UNIQUE,
            username        TEXT NOT NULL,
            display_name    TEXT,
            avatar_url      TEXT,
            profile_url     TEXT,
            email           TEXT,
            bio             TEXT,
            location        TEXT,
            website         TEXT,
            banner_url      TEXT,
            followers_count INTEGER NOT NULL DEFAULT 0,
            following_count INTEGER NOT NULL DEFAULT 0,
            created_at      TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at      TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS posts (
            id          TEXT PRIMARY KEY,
            content     TEXT NOT NULL,
            author_id   TEXT NOT NULL REFERENCES users(id),
            parent_id   TEXT REFERENCES posts(id) ON DELETE SET NULL,
            -- Root of the conversation tree. Self-reference for roots,
            -- written in a second step after the insert; inherited otherwise.
            seed_id     TEXT,
            kind        TEXT NOT NULL DEFAULT 'root'
                        CHECK (kind IN ('root', 'reply', 'fork')),
            image       TEXT,
            replies     INTEGER NOT NULL DEFAULT 0,
            forks       INTEGER NOT NULL DEFAULT 0,
            likes       INTEGER NOT NULL DEFAULT 0,
            bookmarks   INTEGER NOT NULL DEFAULT 0,
            created_at  TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_posts_author
            ON posts(author_id, created_at);
        CREATE INDEX IF NOT EXISTS idx_posts_parent
            ON posts(parent_id);
        CREATE INDEX IF NOT EXISTS idx_posts_seed
            ON posts(seed_id);

        CREATE TABLE IF NOT EXISTS likes (
            id          TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL REFERENCES users(id),
            post_id     TEXT NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
            created_at  TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(user_id, post_id)
        );

        CREATE INDEX IF NOT EXISTS idx_likes_post
            ON likes(post_id);

        CREATE TABLE IF NOT EXISTS follows (
            id           TEXT PRIMARY KEY,
            follower_id  TEXT NOT NULL REFERENCES users(id),
            following_id TEXT NOT NULL REFERENCES users(id),
            created_at   TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(follower_id, following_id)
        );

        CREATE INDEX IF NOT EXISTS idx_follows_follower
            ON follows(follower_id, created_at);
        CREATE INDEX IF NOT EXISTS idx_follows_following
            ON follows(following_id, created_at);

        CREATE TABLE IF NOT EXISTS notifications (
            id           TEXT PRIMARY KEY,
            recipient_id TEXT NOT NULL REFERENCES users(id),
            sender_id    TEXT NOT NULL REFERENCES users(id),
            kind         TEXT NOT NULL
                         CHECK (kind IN ('follow', 'reply', 'fork', 'like')),
            post_id      TEXT REFERENCES posts(id) ON DELETE CASCADE,
            read         INTEGER NOT NULL DEFAULT 0,
            created_at   TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_notifications_recipient
            ON notifications(recipient_id, created_at);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
