use anyhow::{Context, Result};
use rusqlite::Row;

use snapgram_types::Comment;

use crate::db::{now_timestamp, parse_timestamp, DbPool};

const COMMENT_SELECT: &str = "SELECT c.id, c.user_id, c.post_id, u.username, u.profile_picture, c.content, c.created_at
 FROM comments c
 JOIN users u ON c.user_id = u.id";

pub struct CommentRepository {
    pool: DbPool,
}

fn map_comment(row: &Row<'_>) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: row.get(0)?,
        user_id: row.get(1)?,
        post_id: row.get(2)?,
        username: row.get(3)?,
        profile_picture: row.get(4)?,
        content: row.get(5)?,
        created_at: parse_timestamp(6, row.get(6)?)?,
    })
}

impl CommentRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Add a comment and return it with the author's username attached
    pub fn create(&self, user_id: i64, post_id: i64, content: &str) -> Result<Comment> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO comments (user_id, post_id, content, created_at) VALUES (?, ?, ?, ?)",
            (user_id, post_id, content, now_timestamp()),
        )
        .context("Failed to create comment")?;

        let id = conn.last_insert_rowid();
        let comment = conn
            .query_row(&format!("{} WHERE c.id = ?", COMMENT_SELECT), [id], map_comment)
            .context("Failed to load created comment")?;
        Ok(comment)
    }

    /// Comments on a post in the order they were written (oldest first)
    pub fn list_for_post(&self, post_id: i64, limit: i64, offset: i64) -> Result<Vec<Comment>> {
        let conn = self.pool.get()?;
        let query = format!(
            "{}
             WHERE c.post_id = ?1
             ORDER BY c.created_at ASC, c.id ASC
             LIMIT ?2 OFFSET ?3",
            COMMENT_SELECT
        );

        let mut stmt = conn.prepare(&query)?;
        let comments = stmt
            .query_map((post_id, limit, offset), map_comment)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(comments)
    }
}
