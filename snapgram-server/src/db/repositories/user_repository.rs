use anyhow::{Context, Result};
use rusqlite::{OptionalExtension, Row};

use snapgram_types::{User, UserProfile};

use crate::db::{now_timestamp, parse_timestamp, DbPool};

const USER_COLUMNS: &str = "id, username, email, profile_picture, bio, created_at";

/// A user row together with its stored password hash. Only the credential
/// service ever sees this type.
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: User,
    pub password_hash: String,
}

pub struct UserRepository {
    pool: DbPool,
}

fn map_user(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        profile_picture: row.get(3)?,
        bio: row.get(4)?,
        created_at: parse_timestamp(5, row.get(5)?)?,
    })
}

impl UserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Insert a new user.
    ///
    /// Returns `None` when the username or email is already taken, including
    /// when a concurrent registration won the race.
    pub fn create(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<Option<User>> {
        let conn = self.pool.get()?;
        let created_at = now_timestamp();
        let inserted = conn
            .execute(
                "INSERT INTO users (username, email, password, created_at)
                 VALUES (?, ?, ?, ?)
                 ON CONFLICT DO NOTHING",
                (username, email, password_hash, &created_at),
            )
            .context("Failed to create user")?;

        if inserted == 0 {
            return Ok(None);
        }

        let id = conn.last_insert_rowid();
        let user = conn
            .query_row(
                &format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS),
                [id],
                map_user,
            )
            .context("Failed to load created user")?;
        Ok(Some(user))
    }

    /// Get user by ID
    pub fn get_by_id(&self, user_id: i64) -> Result<Option<User>> {
        let conn = self.pool.get()?;
        let user = conn
            .query_row(
                &format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS),
                [user_id],
                map_user,
            )
            .optional()?;
        Ok(user)
    }

    /// Get user and password hash by email (exact, case-sensitive match)
    pub fn get_credentials_by_email(&self, email: &str) -> Result<Option<UserCredentials>> {
        let conn = self.pool.get()?;
        let credentials = conn
            .query_row(
                &format!("SELECT {}, password FROM users WHERE email = ?", USER_COLUMNS),
                [email],
                |row| {
                    Ok(UserCredentials {
                        user: map_user(row)?,
                        password_hash: row.get(6)?,
                    })
                },
            )
            .optional()?;
        Ok(credentials)
    }

    pub fn username_exists(&self, username: &str) -> Result<bool> {
        let conn = self.pool.get()?;
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM users WHERE username = ?)",
            [username],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    pub fn email_exists(&self, email: &str) -> Result<bool> {
        let conn = self.pool.get()?;
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = ?)",
            [email],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Update bio and/or profile picture. Fields passed as `None` keep their
    /// stored value.
    pub fn update_profile(
        &self,
        user_id: i64,
        bio: Option<&str>,
        profile_picture: Option<&str>,
    ) -> Result<Option<User>> {
        let conn = self.pool.get()?;
        conn.execute(
            "UPDATE users
             SET bio = COALESCE(?, bio),
                 profile_picture = COALESCE(?, profile_picture)
             WHERE id = ?",
            (bio, profile_picture, user_id),
        )
        .context("Failed to update user profile")?;

        let user = conn
            .query_row(
                &format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS),
                [user_id],
                map_user,
            )
            .optional()?;
        Ok(user)
    }

    /// Get a user's public profile with post and follow counts.
    ///
    /// `viewer_id` is the requesting user, used for `is_following`.
    pub fn get_profile(&self, user_id: i64, viewer_id: i64) -> Result<Option<UserProfile>> {
        let conn = self.pool.get()?;
        let profile = conn
            .query_row(
                "SELECT u.id, u.username, u.profile_picture, u.bio, u.created_at,
                        (SELECT COUNT(*) FROM posts WHERE user_id = u.id) AS post_count,
                        (SELECT COUNT(*) FROM follows WHERE following_id = u.id) AS followers_count,
                        (SELECT COUNT(*) FROM follows WHERE follower_id = u.id) AS following_count,
                        EXISTS(SELECT 1 FROM follows WHERE follower_id = ?1 AND following_id = u.id) AS is_following
                 FROM users u
                 WHERE u.id = ?2",
                (viewer_id, user_id),
                |row| {
                    Ok(UserProfile {
                        id: row.get(0)?,
                        username: row.get(1)?,
                        profile_picture: row.get(2)?,
                        bio: row.get(3)?,
                        created_at: parse_timestamp(4, row.get(4)?)?,
                        post_count: row.get(5)?,
                        followers_count: row.get(6)?,
                        following_count: row.get(7)?,
                        is_following: row.get(8)?,
                    })
                },
            )
            .optional()?;
        Ok(profile)
    }
}
