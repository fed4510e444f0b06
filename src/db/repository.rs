//! User repository (credential store).

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;
use uuid::Uuid;

use super::user::{NewUser, User};
use crate::auth::validation::validate_username;
use crate::{FileShareError, Result};

const USER_COLUMNS: &str = "id, username, password, role, verified, otp_secret, created_at";

/// Repository for user CRUD operations.
pub struct UserRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> UserRepository<'a> {
    /// Create a new UserRepository with the given pool reference.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new user.
    ///
    /// The username is trimmed and must be 5 to 100 characters. A
    /// duplicate username is reported as a validation error.
    pub async fn create(&self, new_user: &NewUser) -> Result<User> {
        let username = validate_username(&new_user.username)
            .map_err(|e| FileShareError::Validation(e.to_string()))?;
        let id = Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO users (id, username, password, role, verified, otp_secret, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&username)
        .bind(&new_user.password)
        .bind(new_user.role.as_str())
        .bind(new_user.verified)
        .bind(&new_user.otp_secret)
        .bind(Utc::now())
        .execute(self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                FileShareError::Validation("username is already used".to_string())
            }
            e => FileShareError::Database(e.to_string()),
        })?;

        self.get_by_id(&id)
            .await?
            .ok_or_else(|| FileShareError::NotFound("user".to_string()))
    }

    /// Get a user by ID.
    pub async fn get_by_id(&self, id: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| FileShareError::Database(e.to_string()))?;

        Ok(user)
    }

    /// Get a user by exact username.
    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = ?"
        ))
        .bind(username)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| FileShareError::Database(e.to_string()))?;

        Ok(user)
    }

    /// Check whether a username is taken.
    pub async fn username_exists(&self, username: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE username = ?")
            .bind(username)
            .fetch_one(self.pool)
            .await
            .map_err(|e| FileShareError::Database(e.to_string()))?;
        Ok(count > 0)
    }

    /// Set the verified flag. Returns false if the user does not exist.
    pub async fn set_verified(&self, id: &str, verified: bool) -> Result<bool> {
        let result = sqlx::query("UPDATE users SET verified = ? WHERE id = ?")
            .bind(verified)
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| FileShareError::Database(e.to_string()))?;
        Ok(result.rows_affected() > 0)
    }

    /// Replace the password hash. Returns false if the user does not exist.
    pub async fn update_password(&self, id: &str, password_hash: &str) -> Result<bool> {
        let result = sqlx::query("UPDATE users SET password = ? WHERE id = ?")
            .bind(password_hash)
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| FileShareError::Database(e.to_string()))?;
        Ok(result.rows_affected() > 0)
    }

    /// Count users.
    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(self.pool)
            .await
            .map_err(|e| FileShareError::Database(e.to_string()))?;
        Ok(count)
    }

    /// Delete a user together with everything they own.
    ///
    /// Runs in one transaction and returns the storage locators of the
    /// deleted files so the caller can remove the stored bytes. Returns
    /// `None` when the user does not exist.
    pub async fn delete(&self, id: &str) -> Result<Option<Vec<String>>> {
        let mut tx = self.pool.begin().await?;

        let exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE id = ?")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
        if exists == 0 {
            return Ok(None);
        }

        let locators = delete_user_rows(&mut *tx, id).await?;
        tx.commit().await?;

        info!(user_id = %id, files = locators.len(), "Deleted account");
        Ok(Some(locators))
    }

    /// Delete every unverified account with the same cascade as [`delete`].
    ///
    /// Returns the number of accounts removed and the storage locators of
    /// their files.
    ///
    /// [`delete`]: UserRepository::delete
    pub async fn purge_unverified(&self) -> Result<(usize, Vec<String>)> {
        let mut tx = self.pool.begin().await?;

        let ids: Vec<String> = sqlx::query_scalar("SELECT id FROM users WHERE verified = 0")
            .fetch_all(&mut *tx)
            .await?;

        let mut locators = Vec::new();
        for id in &ids {
            locators.extend(delete_user_rows(&mut *tx, id).await?);
        }
        tx.commit().await?;

        Ok((ids.len(), locators))
    }
}

/// Remove ACL rows, share associations, shares, files and finally the user.
async fn delete_user_rows(conn: &mut SqliteConnection, user_id: &str) -> Result<Vec<String>> {
    let locators: Vec<String> = sqlx::query_scalar("SELECT locator FROM files WHERE owner_id = ?")
        .bind(user_id)
        .fetch_all(&mut *conn)
        .await?;

    sqlx::query(
        "DELETE FROM share_acl
         WHERE user_id = ? OR share_id IN (SELECT id FROM shares WHERE owner_id = ?)",
    )
    .bind(user_id)
    .bind(user_id)
    .execute(&mut *conn)
    .await?;

    sqlx::query(
        "DELETE FROM share_files
         WHERE share_id IN (SELECT id FROM shares WHERE owner_id = ?)
            OR file_id IN (SELECT id FROM files WHERE owner_id = ?)",
    )
    .bind(user_id)
    .bind(user_id)
    .execute(&mut *conn)
    .await?;

    sqlx::query("DELETE FROM shares WHERE owner_id = ?")
        .bind(user_id)
        .execute(&mut *conn)
        .await?;

    sqlx::query("DELETE FROM files WHERE owner_id = ?")
        .bind(user_id)
        .execute(&mut *conn)
        .await?;

    sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(user_id)
        .execute(&mut *conn)
        .await?;

    Ok(locators)
}
