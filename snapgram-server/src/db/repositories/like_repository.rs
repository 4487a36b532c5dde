use anyhow::{Context, Result};
use rusqlite::TransactionBehavior;

use snapgram_types::LikeAction;

use crate::db::{now_timestamp, DbPool};

pub struct LikeRepository {
    pool: DbPool,
}

impl LikeRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Flip the like state of (`user_id`, `post_id`).
    ///
    /// Runs under an immediate transaction: the write lock is taken before the
    /// delete, so two toggles for the same pair are serialized by SQLite and
    /// each one observes the other's result. Returns `None` if the post does
    /// not exist when the lock is taken.
    pub fn toggle(&self, user_id: i64, post_id: i64) -> Result<Option<LikeAction>> {
        let mut conn = self.pool.get()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .context("Failed to begin like transaction")?;

        let post_exists: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM posts WHERE id = ?)",
            [post_id],
            |row| row.get(0),
        )?;
        if !post_exists {
            return Ok(None);
        }

        let removed = tx
            .execute(
                "DELETE FROM likes WHERE user_id = ? AND post_id = ?",
                (user_id, post_id),
            )
            .context("Failed to remove like")?;

        let action = if removed > 0 {
            LikeAction::Unliked
        } else {
            tx.execute(
                "INSERT OR IGNORE INTO likes (user_id, post_id, created_at) VALUES (?, ?, ?)",
                (user_id, post_id, now_timestamp()),
            )
            .context("Failed to add like")?;
            LikeAction::Liked
        };

        tx.commit().context("Failed to commit like toggle")?;
        Ok(Some(action))
    }

    /// Remove a like if present. Returns whether a row was deleted.
    pub fn unlike(&self, user_id: i64, post_id: i64) -> Result<bool> {
        let conn = self.pool.get()?;
        let removed = conn
            .execute(
                "DELETE FROM likes WHERE user_id = ? AND post_id = ?",
                (user_id, post_id),
            )
            .context("Failed to remove like")?;
        Ok(removed > 0)
    }

    pub fn count_for_post(&self, post_id: i64) -> Result<i64> {
        let conn = self.pool.get()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM likes WHERE post_id = ?",
            [post_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{PostRepository, UserRepository};
    use crate::db::Database;

    fn seed(db: &Database) -> (i64, i64) {
        db.initialize().expect("Failed to initialize schema");
        let user = UserRepository::new(db.pool.clone())
            .create("alice", "alice@x.com", "hash")
            .unwrap()
            .unwrap();
        let post = PostRepository::new(db.pool.clone())
            .create(user.id, "/uploads/a.png", None)
            .unwrap();
        (user.id, post.id)
    }

    #[test]
    fn test_toggle_like_then_unlike() {
        let db = Database::in_memory().unwrap();
        let (user_id, post_id) = seed(&db);
        let repo = LikeRepository::new(db.pool.clone());

        assert_eq!(repo.toggle(user_id, post_id).unwrap(), Some(LikeAction::Liked));
        assert_eq!(repo.count_for_post(post_id).unwrap(), 1);

        assert_eq!(repo.toggle(user_id, post_id).unwrap(), Some(LikeAction::Unliked));
        assert_eq!(repo.count_for_post(post_id).unwrap(), 0);
    }

    #[test]
    fn test_unlike_is_idempotent() {
        let db = Database::in_memory().unwrap();
        let (user_id, post_id) = seed(&db);
        let repo = LikeRepository::new(db.pool.clone());

        repo.toggle(user_id, post_id).unwrap();
        assert!(repo.unlike(user_id, post_id).unwrap());
        assert!(!repo.unlike(user_id, post_id).unwrap());
        assert_eq!(repo.count_for_post(post_id).unwrap(), 0);
    }

    #[test]
    fn test_like_on_missing_post_is_none() {
        let db = Database::in_memory().unwrap();
        let (user_id, _) = seed(&db);
        let repo = LikeRepository::new(db.pool.clone());

        assert_eq!(repo.toggle(user_id, 999).unwrap(), None);
    }

    #[test]
    fn test_like_after_post_deleted_is_none() {
        let db = Database::in_memory().unwrap();
        let (user_id, post_id) = seed(&db);
        let repo = LikeRepository::new(db.pool.clone());

        assert!(PostRepository::new(db.pool.clone()).delete(post_id).unwrap());
        assert_eq!(repo.toggle(user_id, post_id).unwrap(), None);
        assert_eq!(repo.count_for_post(post_id).unwrap(), 0);
    }

    #[test]
    fn test_concurrent_toggles_never_duplicate() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("likes.db")).unwrap();
        let (user_id, post_id) = seed(&db);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let pool = db.pool.clone();
                std::thread::spawn(move || LikeRepository::new(pool).toggle(user_id, post_id))
            })
            .collect();

        for handle in handles {
            handle.join().unwrap().expect("toggle should not fail under contention");
        }

        // Eight serialized flips end where they started
        let repo = LikeRepository::new(db.pool.clone());
        assert_eq!(repo.count_for_post(post_id).unwrap(), 0);
    }
}
