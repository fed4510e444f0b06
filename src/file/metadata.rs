//! File records and their repository.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{QueryBuilder, SqlitePool};
use uuid::Uuid;

use crate::{FileShareError, Result};

const FILE_COLUMNS: &str = "id, owner_id, name, locator, created_at";

/// An uploaded file owned by exactly one user.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct FileRecord {
    /// Opaque UUID string.
    pub id: String,
    pub owner_id: String,
    /// Display name (basename of the uploaded file).
    pub name: String,
    /// Storage locator, opaque outside [`FileStorage`](super::FileStorage).
    pub locator: String,
    pub created_at: DateTime<Utc>,
}

/// Short form used in listings.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FileSummary {
    pub id: String,
    pub name: String,
}

impl From<&FileRecord> for FileSummary {
    fn from(file: &FileRecord) -> Self {
        Self {
            id: file.id.clone(),
            name: file.name.clone(),
        }
    }
}

/// Data for creating a new file entry.
#[derive(Debug, Clone)]
pub struct NewFile {
    pub owner_id: String,
    pub name: String,
    pub locator: String,
}

impl NewFile {
    /// Create a new NewFile.
    pub fn new(
        owner_id: impl Into<String>,
        name: impl Into<String>,
        locator: impl Into<String>,
    ) -> Self {
        Self {
            owner_id: owner_id.into(),
            name: name.into(),
            locator: locator.into(),
        }
    }
}

/// Repository for file rows.
pub struct FileRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> FileRepository<'a> {
    /// Create a new FileRepository.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a file row.
    pub async fn create(&self, new_file: &NewFile) -> Result<FileRecord> {
        let id = Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO files (id, owner_id, name, locator, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&new_file.owner_id)
        .bind(&new_file.name)
        .bind(&new_file.locator)
        .bind(Utc::now())
        .execute(self.pool)
        .await
        .map_err(|e| FileShareError::Database(e.to_string()))?;

        self.get_by_id(&id)
            .await?
            .ok_or_else(|| FileShareError::NotFound("file".to_string()))
    }

    /// Get a file by ID.
    pub async fn get_by_id(&self, id: &str) -> Result<Option<FileRecord>> {
        let file = sqlx::query_as::<_, FileRecord>(&format!(
            "SELECT {FILE_COLUMNS} FROM files WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| FileShareError::Database(e.to_string()))?;

        Ok(file)
    }

    /// Fetch the subset of `ids` that exist. Order follows creation time.
    pub async fn get_many(&self, ids: &[String]) -> Result<Vec<FileRecord>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut query: QueryBuilder<sqlx::Sqlite> =
            QueryBuilder::new(format!("SELECT {FILE_COLUMNS} FROM files WHERE id IN ("));
        let mut separated = query.separated(", ");
        for id in ids {
            separated.push_bind(id);
        }
        separated.push_unseparated(") ORDER BY created_at, id");

        let files = query
            .build_query_as::<FileRecord>()
            .fetch_all(self.pool)
            .await
            .map_err(|e| FileShareError::Database(e.to_string()))?;

        Ok(files)
    }

    /// List files owned by a user, oldest first.
    pub async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<FileRecord>> {
        let files = sqlx::query_as::<_, FileRecord>(&format!(
            "SELECT {FILE_COLUMNS} FROM files WHERE owner_id = ? ORDER BY created_at, id"
        ))
        .bind(owner_id)
        .fetch_all(self.pool)
        .await
        .map_err(|e| FileShareError::Database(e.to_string()))?;

        Ok(files)
    }

    /// Delete a file row and its share associations in one transaction.
    ///
    /// Returns false if the file did not exist.
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM share_files WHERE file_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM files WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Database, NewUser, User, UserRepository};

    async fn setup() -> (Database, User) {
        let db = Database::open_in_memory().await.unwrap();
        let user = UserRepository::new(db.pool())
            .create(&NewUser::new("alice", "hash", "S").verified())
            .await
            .unwrap();
        (db, user)
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let (db, user) = setup().await;
        let repo = FileRepository::new(db.pool());

        let file = repo
            .create(&NewFile::new(&user.id, "report.pdf", "abcdef"))
            .await
            .unwrap();
        assert_eq!(file.owner_id, user.id);
        assert_eq!(file.name, "report.pdf");

        let found = repo.get_by_id(&file.id).await.unwrap().unwrap();
        assert_eq!(found, file);
        assert!(repo.get_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_many_skips_missing() {
        let (db, user) = setup().await;
        let repo = FileRepository::new(db.pool());
        let a = repo
            .create(&NewFile::new(&user.id, "a.txt", "loc-a"))
            .await
            .unwrap();
        let b = repo
            .create(&NewFile::new(&user.id, "b.txt", "loc-b"))
            .await
            .unwrap();

        let found = repo
            .get_many(&[a.id.clone(), "missing".to_string(), b.id.clone()])
            .await
            .unwrap();
        assert_eq!(found.len(), 2);
        assert!(repo.get_many(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_by_owner() {
        let (db, user) = setup().await;
        let other = UserRepository::new(db.pool())
            .create(&NewUser::new("bobby", "hash", "S"))
            .await
            .unwrap();
        let repo = FileRepository::new(db.pool());
        repo.create(&NewFile::new(&user.id, "a.txt", "loc-a"))
            .await
            .unwrap();
        repo.create(&NewFile::new(&other.id, "b.txt", "loc-b"))
            .await
            .unwrap();

        let files = repo.list_by_owner(&user.id).await.unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "a.txt");
    }

    #[tokio::test]
    async fn test_delete() {
        let (db, user) = setup().await;
        let repo = FileRepository::new(db.pool());
        let file = repo
            .create(&NewFile::new(&user.id, "a.txt", "loc-a"))
            .await
            .unwrap();

        assert!(repo.delete(&file.id).await.unwrap());
        assert!(!repo.delete(&file.id).await.unwrap());
        assert!(repo.get_by_id(&file.id).await.unwrap().is_none());
    }
}
