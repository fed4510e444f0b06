//! Share repository (resource store side of shares, their files and ACLs).

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use super::link::generate_link;
use super::types::{public_window_end, NewShare, Share, ShareDetail};
use crate::file::FileRecord;
use crate::{FileShareError, Result};

const SHARE_COLUMNS: &str = "id, owner_id, name, is_public, link, valid_until, created_at";

/// Repository for share rows and their associations.
pub struct ShareRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ShareRepository<'a> {
    /// Create a new ShareRepository.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a private share and attach its files in one transaction.
    ///
    /// Callers check file ownership beforehand. A name already used by the
    /// same owner is reported as a validation error.
    pub async fn create(&self, new_share: &NewShare) -> Result<Share> {
        let id = Uuid::new_v4().to_string();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO shares (id, owner_id, name, is_public, link, valid_until, created_at)
             VALUES (?, ?, ?, 0, ?, NULL, ?)",
        )
        .bind(&id)
        .bind(&new_share.owner_id)
        .bind(&new_share.name)
        .bind(generate_link())
        .bind(Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                FileShareError::Validation("share already exists".to_string())
            }
            e => FileShareError::Database(e.to_string()),
        })?;

        for file_id in &new_share.file_ids {
            sqlx::query("INSERT OR IGNORE INTO share_files (share_id, file_id) VALUES (?, ?)")
                .bind(&id)
                .bind(file_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        self.get_by_id(&id)
            .await?
            .ok_or_else(|| FileShareError::NotFound("share".to_string()))
    }

    /// Get a share by ID.
    pub async fn get_by_id(&self, id: &str) -> Result<Option<Share>> {
        let share = sqlx::query_as::<_, Share>(&format!(
            "SELECT {SHARE_COLUMNS} FROM shares WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| FileShareError::Database(e.to_string()))?;

        Ok(share)
    }

    /// Get a share by its public link token.
    pub async fn get_by_link(&self, link: &str) -> Result<Option<Share>> {
        let share = sqlx::query_as::<_, Share>(&format!(
            "SELECT {SHARE_COLUMNS} FROM shares WHERE link = ?"
        ))
        .bind(link)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| FileShareError::Database(e.to_string()))?;

        Ok(share)
    }

    /// Check whether an owner already has a share with this name.
    pub async fn name_exists(&self, owner_id: &str, name: &str) -> Result<bool> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM shares WHERE owner_id = ? AND name = ?")
                .bind(owner_id)
                .bind(name)
                .fetch_one(self.pool)
                .await
                .map_err(|e| FileShareError::Database(e.to_string()))?;
        Ok(count > 0)
    }

    /// Shares owned by a user, oldest first.
    pub async fn list_owned(&self, user_id: &str) -> Result<Vec<Share>> {
        let shares = sqlx::query_as::<_, Share>(&format!(
            "SELECT {SHARE_COLUMNS} FROM shares WHERE owner_id = ? ORDER BY created_at, id"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await
        .map_err(|e| FileShareError::Database(e.to_string()))?;

        Ok(shares)
    }

    /// Shares a user can read through the ACL, oldest first.
    pub async fn list_accessible(&self, user_id: &str) -> Result<Vec<Share>> {
        let shares = sqlx::query_as::<_, Share>(
            "SELECT s.id, s.owner_id, s.name, s.is_public, s.link, s.valid_until, s.created_at
             FROM shares s
             JOIN share_acl a ON a.share_id = s.id
             WHERE a.user_id = ?
             ORDER BY s.created_at, s.id",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await
        .map_err(|e| FileShareError::Database(e.to_string()))?;

        Ok(shares)
    }

    /// Files attached to a share.
    pub async fn files(&self, share_id: &str) -> Result<Vec<FileRecord>> {
        let files = sqlx::query_as::<_, FileRecord>(
            "SELECT f.id, f.owner_id, f.name, f.locator, f.created_at
             FROM files f
             JOIN share_files sf ON sf.file_id = f.id
             WHERE sf.share_id = ?
             ORDER BY f.created_at, f.id",
        )
        .bind(share_id)
        .fetch_all(self.pool)
        .await
        .map_err(|e| FileShareError::Database(e.to_string()))?;

        Ok(files)
    }

    /// A file of the share, by file ID.
    pub async fn file_by_id(&self, share_id: &str, file_id: &str) -> Result<Option<FileRecord>> {
        let file = sqlx::query_as::<_, FileRecord>(
            "SELECT f.id, f.owner_id, f.name, f.locator, f.created_at
             FROM files f
             JOIN share_files sf ON sf.file_id = f.id
             WHERE sf.share_id = ? AND f.id = ?",
        )
        .bind(share_id)
        .bind(file_id)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| FileShareError::Database(e.to_string()))?;

        Ok(file)
    }

    /// A file of the share, by display name. The oldest wins on duplicates.
    pub async fn file_by_name(&self, share_id: &str, name: &str) -> Result<Option<FileRecord>> {
        let file = sqlx::query_as::<_, FileRecord>(
            "SELECT f.id, f.owner_id, f.name, f.locator, f.created_at
             FROM files f
             JOIN share_files sf ON sf.file_id = f.id
             WHERE sf.share_id = ? AND f.name = ?
             ORDER BY f.created_at, f.id
             LIMIT 1",
        )
        .bind(share_id)
        .bind(name)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| FileShareError::Database(e.to_string()))?;

        Ok(file)
    }

    /// Attach a file. Returns false if it was already attached.
    pub async fn add_file(&self, share_id: &str, file_id: &str) -> Result<bool> {
        let result =
            sqlx::query("INSERT OR IGNORE INTO share_files (share_id, file_id) VALUES (?, ?)")
                .bind(share_id)
                .bind(file_id)
                .execute(self.pool)
                .await
                .map_err(|e| FileShareError::Database(e.to_string()))?;
        Ok(result.rows_affected() > 0)
    }

    /// Detach a file. Returns false if it was not attached.
    pub async fn remove_file(&self, share_id: &str, file_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM share_files WHERE share_id = ? AND file_id = ?")
            .bind(share_id)
            .bind(file_id)
            .execute(self.pool)
            .await
            .map_err(|e| FileShareError::Database(e.to_string()))?;
        Ok(result.rows_affected() > 0)
    }

    /// IDs of users on the share's ACL, in grant order.
    pub async fn allowed_users(&self, share_id: &str) -> Result<Vec<String>> {
        let users: Vec<String> = sqlx::query_scalar(
            "SELECT user_id FROM share_acl WHERE share_id = ? ORDER BY granted_at, user_id",
        )
        .bind(share_id)
        .fetch_all(self.pool)
        .await
        .map_err(|e| FileShareError::Database(e.to_string()))?;
        Ok(users)
    }

    /// Check ACL membership.
    pub async fn is_member(&self, share_id: &str, user_id: &str) -> Result<bool> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM share_acl WHERE share_id = ? AND user_id = ?")
                .bind(share_id)
                .bind(user_id)
                .fetch_one(self.pool)
                .await
                .map_err(|e| FileShareError::Database(e.to_string()))?;
        Ok(count > 0)
    }

    /// Add a user to the ACL. Idempotent; returns false if already present.
    pub async fn add_member(&self, share_id: &str, user_id: &str) -> Result<bool> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO share_acl (share_id, user_id, granted_at) VALUES (?, ?, ?)",
        )
        .bind(share_id)
        .bind(user_id)
        .bind(Utc::now())
        .execute(self.pool)
        .await
        .map_err(|e| FileShareError::Database(e.to_string()))?;
        Ok(result.rows_affected() > 0)
    }

    /// Flip the public flag of a share owned by `owner_id`.
    ///
    /// Computed from the stored state in a single statement, so concurrent
    /// toggles serialize and never leave a public share without an expiry.
    /// Becoming public opens a window ending at `now` + 7 days; becoming
    /// private clears it. Returns `None` if no such share is owned by
    /// `owner_id` (including when it was deleted concurrently).
    pub async fn toggle_visibility(
        &self,
        share_id: &str,
        owner_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Share>> {
        let share = sqlx::query_as::<_, Share>(&format!(
            "UPDATE shares
             SET is_public = CASE WHEN is_public = 0 THEN 1 ELSE 0 END,
                 valid_until = CASE WHEN is_public = 0 THEN ? ELSE NULL END
             WHERE id = ? AND owner_id = ?
             RETURNING {SHARE_COLUMNS}"
        ))
        .bind(public_window_end(now))
        .bind(share_id)
        .bind(owner_id)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| FileShareError::Database(e.to_string()))?;

        Ok(share)
    }

    /// Delete a share: ACL rows, file associations, then the share row.
    ///
    /// Files themselves belong to their owner and are left in place.
    /// Returns false if the share did not exist.
    pub async fn delete(&self, share_id: &str) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM share_acl WHERE share_id = ?")
            .bind(share_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM share_files WHERE share_id = ?")
            .bind(share_id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM shares WHERE id = ?")
            .bind(share_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    /// Load the files and ACL of a share.
    pub async fn detail(&self, share: Share) -> Result<ShareDetail> {
        let files = self.files(&share.id).await?;
        let allowed_users = self.allowed_users(&share.id).await?;
        Ok(ShareDetail {
            share,
            files,
            allowed_users,
        })
    }
}
