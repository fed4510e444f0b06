//! File service.
//!
//! Upload, listing and deletion of a user's own files. Reading a file
//! through a share goes through [`ShareService`](crate::share::ShareService).

use tracing::{info, warn};

use super::metadata::{FileRecord, FileRepository, NewFile};
use super::storage::FileStorage;
use super::DEFAULT_MAX_FILE_SIZE;
use crate::auth::permission::{require_mutate, require_verified};
use crate::auth::validation::sanitize_filename;
use crate::db::{Database, User};
use crate::{ServiceError, ServiceResult};

/// File service for managing uploads and deletions.
pub struct FileService<'a> {
    db: &'a Database,
    storage: &'a FileStorage,
    max_file_size: u64,
}

impl<'a> FileService<'a> {
    /// Create a new FileService.
    pub fn new(db: &'a Database, storage: &'a FileStorage) -> Self {
        Self {
            db,
            storage,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }

    /// Create a new FileService with a custom max file size.
    pub fn with_max_file_size(mut self, max_size: u64) -> Self {
        self.max_file_size = max_size;
        self
    }

    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    /// Store an uploaded file for `actor`.
    ///
    /// The display name is reduced to its base component. Bytes are written
    /// first; if the row cannot be inserted they are removed again.
    pub async fn upload(
        &self,
        actor: &User,
        filename: &str,
        content: &[u8],
    ) -> ServiceResult<FileRecord> {
        require_verified(actor)?;
        let name = sanitize_filename(filename).map_err(|e| ServiceError::Invalid(e.to_string()))?;

        if content.len() as u64 > self.max_file_size {
            let max_mb = self.max_file_size / 1024 / 1024;
            return Err(ServiceError::Invalid(format!(
                "File is too large (max {max_mb}MB)."
            )));
        }

        let locator = self.storage.put(content).await?;
        let created = FileRepository::new(self.db.pool())
            .create(&NewFile::new(&actor.id, &name, &locator))
            .await;

        match created {
            Ok(file) => {
                info!(file_id = %file.id, user_id = %actor.id, size = content.len(), "File uploaded");
                Ok(file)
            }
            Err(e) => {
                if let Err(cleanup) = self.storage.delete(&locator).await {
                    warn!(%locator, error = %cleanup, "Failed to remove orphaned upload");
                }
                Err(e.into())
            }
        }
    }

    /// Files owned by `actor`, newest first.
    pub async fn list(&self, actor: &User) -> ServiceResult<Vec<FileRecord>> {
        Ok(FileRepository::new(self.db.pool())
            .list_by_owner(&actor.id)
            .await?)
    }

    /// Delete one of the actor's files.
    ///
    /// The row (and with it every share association) goes first, then the
    /// stored bytes. A failure on the second step only leaves unreferenced
    /// bytes behind.
    pub async fn delete(&self, actor: &User, file_id: &str) -> ServiceResult<()> {
        let files = FileRepository::new(self.db.pool());
        let file = files
            .get_by_id(file_id)
            .await?
            .ok_or(ServiceError::NotFound("File does not exist."))?;
        require_mutate(actor, &file.owner_id)?;

        if !files.delete(&file.id).await? {
            return Err(ServiceError::NotFound("File does not exist."));
        }
        if let Err(e) = self.storage.delete(&file.locator).await {
            warn!(file_id = %file.id, error = %e, "Failed to delete stored bytes");
        }

        info!(file_id = %file.id, user_id = %actor.id, "File deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AccessError;
    use crate::db::{NewUser, UserRepository};
    use crate::share::{NewShare, ShareRepository};
    use tempfile::TempDir;

    async fn setup() -> (TempDir, Database, FileStorage, User, User) {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path().join("media")).unwrap();
        let db = Database::open_in_memory().await.unwrap();
        let users = UserRepository::new(db.pool());
        let alice = users
            .create(&NewUser::new("alice", "h", "S").verified())
            .await
            .unwrap();
        let bob = users
            .create(&NewUser::new("bobby", "h", "S"))
            .await
            .unwrap();
        (dir, db, storage, alice, bob)
    }

    #[tokio::test]
    async fn test_upload_and_list() {
        let (_dir, db, storage, alice, _) = setup().await;
        let service = FileService::new(&db, &storage);

        let file = service
            .upload(&alice, "../../etc/report.pdf", b"%PDF")
            .await
            .unwrap();
        assert_eq!(file.name, "report.pdf");
        assert_eq!(storage.get(&file.locator).await.unwrap(), b"%PDF");

        let files = service.list(&alice).await.unwrap();
        assert_eq!(files, vec![file]);
    }

    #[tokio::test]
    async fn test_unverified_cannot_upload() {
        let (_dir, db, storage, _, bob) = setup().await;
        let err = FileService::new(&db, &storage)
            .upload(&bob, "a.txt", b"A")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Access(AccessError::Unverified)));
    }

    #[tokio::test]
    async fn test_upload_size_limit() {
        let (_dir, db, storage, alice, _) = setup().await;
        let service = FileService::new(&db, &storage).with_max_file_size(4);

        assert!(service.upload(&alice, "a.txt", b"1234").await.is_ok());
        assert!(matches!(
            service.upload(&alice, "b.txt", b"12345").await,
            Err(ServiceError::Invalid(_))
        ));
    }

    #[tokio::test]
    async fn test_upload_rejects_empty_name() {
        let (_dir, db, storage, alice, _) = setup().await;
        let err = FileService::new(&db, &storage)
            .upload(&alice, "../", b"A")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Invalid(_)));
    }

    #[tokio::test]
    async fn test_delete_removes_row_bytes_and_associations() {
        let (_dir, db, storage, alice, _) = setup().await;
        let service = FileService::new(&db, &storage);
        let file = service.upload(&alice, "a.txt", b"A").await.unwrap();
        let share = ShareRepository::new(db.pool())
            .create(&NewShare::new(&alice.id, "Holiday", vec![file.id.clone()]))
            .await
            .unwrap();

        service.delete(&alice, &file.id).await.unwrap();

        assert!(!storage.exists(&file.locator).await);
        assert!(ShareRepository::new(db.pool())
            .files(&share.id)
            .await
            .unwrap()
            .is_empty());
        assert!(matches!(
            service.delete(&alice, &file.id).await,
            Err(ServiceError::NotFound("File does not exist."))
        ));
    }

    #[tokio::test]
    async fn test_delete_requires_owner() {
        let (_dir, db, storage, alice, mut bob) = setup().await;
        let service = FileService::new(&db, &storage);
        let file = service.upload(&alice, "a.txt", b"A").await.unwrap();

        bob.verified = true;
        assert!(matches!(
            service.delete(&bob, &file.id).await,
            Err(ServiceError::Access(AccessError::NotOwner))
        ));
        assert!(storage.exists(&file.locator).await);
    }
}
