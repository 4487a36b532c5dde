use anyhow::{Context, Result};
use rusqlite::{OptionalExtension, Row};

use snapgram_types::{FeedPost, Post};

use crate::db::{now_timestamp, parse_timestamp, DbPool};

/// Feed projection: post, author and read-time aggregates. `?1` is the viewer.
const FEED_SELECT: &str = "SELECT p.id, p.user_id, u.username, u.profile_picture, p.image_url, p.caption, p.created_at,
        (SELECT COUNT(*) FROM likes l WHERE l.post_id = p.id) AS like_count,
        (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id) AS comment_count,
        EXISTS(SELECT 1 FROM likes l WHERE l.post_id = p.id AND l.user_id = ?1) AS is_liked
 FROM posts p
 JOIN users u ON p.user_id = u.id";

pub struct PostRepository {
    pool: DbPool,
}

fn map_post(row: &Row<'_>) -> rusqlite::Result<Post> {
    Ok(Post {
        id: row.get(0)?,
        user_id: row.get(1)?,
        image_url: row.get(2)?,
        caption: row.get(3)?,
        created_at: parse_timestamp(4, row.get(4)?)?,
    })
}

fn map_feed_post(row: &Row<'_>) -> rusqlite::Result<FeedPost> {
    Ok(FeedPost {
        id: row.get(0)?,
        user_id: row.get(1)?,
        username: row.get(2)?,
        profile_picture: row.get(3)?,
        image_url: row.get(4)?,
        caption: row.get(5)?,
        created_at: parse_timestamp(6, row.get(6)?)?,
        like_count: row.get(7)?,
        comment_count: row.get(8)?,
        is_liked: row.get(9)?,
    })
}

impl PostRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Create a new post
    pub fn create(&self, user_id: i64, image_url: &str, caption: Option<&str>) -> Result<Post> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO posts (user_id, image_url, caption, created_at) VALUES (?, ?, ?, ?)",
            (user_id, image_url, caption, now_timestamp()),
        )
        .context("Failed to create post")?;

        let id = conn.last_insert_rowid();
        let post = conn
            .query_row(
                "SELECT id, user_id, image_url, caption, created_at FROM posts WHERE id = ?",
                [id],
                map_post,
            )
            .context("Failed to load created post")?;
        Ok(post)
    }

    /// Get a post row by ID
    pub fn get_by_id(&self, post_id: i64) -> Result<Option<Post>> {
        let conn = self.pool.get()?;
        let post = conn
            .query_row(
                "SELECT id, user_id, image_url, caption, created_at FROM posts WHERE id = ?",
                [post_id],
                map_post,
            )
            .optional()?;
        Ok(post)
    }

    pub fn exists(&self, post_id: i64) -> Result<bool> {
        let conn = self.pool.get()?;
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM posts WHERE id = ?)",
            [post_id],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Get a single post annotated for `viewer_id`
    pub fn get_feed_post(&self, post_id: i64, viewer_id: i64) -> Result<Option<FeedPost>> {
        let conn = self.pool.get()?;
        let query = format!("{} WHERE p.id = ?2", FEED_SELECT);
        let post = conn
            .query_row(&query, (viewer_id, post_id), map_feed_post)
            .optional()?;
        Ok(post)
    }

    /// Get all posts, newest first
    pub fn get_feed(&self, viewer_id: i64, limit: i64, offset: i64) -> Result<Vec<FeedPost>> {
        let conn = self.pool.get()?;
        let query = format!(
            "{}
             ORDER BY p.created_at DESC, p.id DESC
             LIMIT ?2 OFFSET ?3",
            FEED_SELECT
        );

        let mut stmt = conn.prepare(&query)?;
        let posts = stmt
            .query_map((viewer_id, limit, offset), map_feed_post)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(posts)
    }

    /// Get posts owned by `user_id`, newest first
    pub fn get_by_user(
        &self,
        user_id: i64,
        viewer_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<FeedPost>> {
        let conn = self.pool.get()?;
        let query = format!(
            "{}
             WHERE p.user_id = ?2
             ORDER BY p.created_at DESC, p.id DESC
             LIMIT ?3 OFFSET ?4",
            FEED_SELECT
        );

        let mut stmt = conn.prepare(&query)?;
        let posts = stmt
            .query_map((viewer_id, user_id, limit, offset), map_feed_post)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(posts)
    }

    /// Delete a post; likes and comments go with it via cascade
    pub fn delete(&self, post_id: i64) -> Result<bool> {
        let conn = self.pool.get()?;
        let rows = conn
            .execute("DELETE FROM posts WHERE id = ?", [post_id])
            .context("Failed to delete post")?;
        Ok(rows > 0)
    }
}
