use anyhow::{Context, Result};

use snapgram_types::UserSummary;

use crate::db::{now_timestamp, DbPool};

pub struct FollowRepository {
    pool: DbPool,
}

impl FollowRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Check if user A is following user B. Handlers read this through
    /// `UserRepository::get_profile`.
    #[cfg(test)]
    pub fn is_following(&self, follower_id: i64, following_id: i64) -> Result<bool> {
        let conn = self.pool.get()?;
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM follows WHERE follower_id = ? AND following_id = ?)",
            (follower_id, following_id),
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Follow a user. Returns `false` if the edge already existed, which
    /// also covers a concurrent duplicate request.
    pub fn follow(&self, follower_id: i64, following_id: i64) -> Result<bool> {
        let conn = self.pool.get()?;
        let inserted = conn
            .execute(
                "INSERT OR IGNORE INTO follows (follower_id, following_id, created_at) VALUES (?, ?, ?)",
                (follower_id, following_id, now_timestamp()),
            )
            .context("Failed to follow user")?;
        Ok(inserted > 0)
    }

    /// Unfollow a user. Returns `false` if there was nothing to remove.
    pub fn unfollow(&self, follower_id: i64, following_id: i64) -> Result<bool> {
        let conn = self.pool.get()?;
        let removed = conn
            .execute(
                "DELETE FROM follows WHERE follower_id = ? AND following_id = ?",
                (follower_id, following_id),
            )
            .context("Failed to unfollow user")?;
        Ok(removed > 0)
    }

    /// Users following `user_id`, most recent follow first
    pub fn get_followers(&self, user_id: i64) -> Result<Vec<UserSummary>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT u.id, u.username, u.profile_picture
             FROM follows f
             JOIN users u ON f.follower_id = u.id
             WHERE f.following_id = ?
             ORDER BY f.created_at DESC, f.id DESC",
        )?;

        let followers = stmt
            .query_map([user_id], |row| {
                Ok(UserSummary {
                    id: row.get(0)?,
                    username: row.get(1)?,
                    profile_picture: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(followers)
    }

    /// Users that `user_id` follows, most recent follow first
    pub fn get_following(&self, user_id: i64) -> Result<Vec<UserSummary>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT u.id, u.username, u.profile_picture
             FROM follows f
             JOIN users u ON f.following_id = u.id
             WHERE f.follower_id = ?
             ORDER BY f.created_at DESC, f.id DESC",
        )?;

        let following = stmt
            .query_map([user_id], |row| {
                Ok(UserSummary {
                    id: row.get(0)?,
                    username: row.get(1)?,
                    profile_picture: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(following)
    }
}
