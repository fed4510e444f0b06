//! Share operations with access control applied.
//!
//! Both HTTP surfaces of the authority (REST routes and the typed query
//! endpoint) go through this service, so every path enforces the same
//! ownership, ACL, verification and public-window rules.

use chrono::{DateTime, Utc};
use tracing::info;

use super::repository::ShareRepository;
use super::types::{NewShare, Share, ShareDetail, ShareScope, Visibility};
use crate::auth::permission::{
    check_public_download, require_mutate, require_read, require_verified,
};
use crate::auth::validation::{validate_share_name, validate_uid};
use crate::db::{Database, User};
use crate::file::{build_archive, FileRecord, FileRepository, FileStorage};
use crate::{FileShareError, ServiceError, ServiceResult};

const SHARE_NOT_FOUND: &str = "Share not found.";
const FILE_NOT_IN_SHARE: &str = "File not present in share.";

/// A file together with its stored bytes.
#[derive(Debug, Clone)]
pub struct FileContent {
    pub file: FileRecord,
    pub data: Vec<u8>,
}

/// A share archive ready to send.
#[derive(Debug, Clone)]
pub struct ShareArchive {
    pub share: Share,
    /// Zip bytes.
    pub data: Vec<u8>,
}

/// Service for share operations.
pub struct ShareService<'a> {
    db: &'a Database,
    storage: &'a FileStorage,
}

impl<'a> ShareService<'a> {
    /// Create a new ShareService.
    pub fn new(db: &'a Database, storage: &'a FileStorage) -> Self {
        Self { db, storage }
    }

    fn shares(&self) -> ShareRepository<'_> {
        ShareRepository::new(self.db.pool())
    }

    async fn find(&self, share_id: &str) -> ServiceResult<Share> {
        self.shares()
            .get_by_id(share_id)
            .await?
            .ok_or(ServiceError::NotFound(SHARE_NOT_FOUND))
    }

    /// Create a share from a name and files owned by `actor`.
    ///
    /// Fails with 403-class errors when the actor is unverified or lists
    /// files owned by someone else, and with not-found when a listed file
    /// does not exist.
    pub async fn create(
        &self,
        actor: &User,
        name: &str,
        file_ids: &[String],
    ) -> ServiceResult<Share> {
        require_verified(actor)?;
        validate_share_name(name).map_err(|e| ServiceError::Invalid(e.to_string()))?;
        if file_ids.is_empty() {
            return Err(ServiceError::Invalid("Empty files' list.".to_string()));
        }
        for id in file_ids {
            validate_uid(id).map_err(|e| ServiceError::Invalid(e.to_string()))?;
        }

        let shares = self.shares();
        if shares.name_exists(&actor.id, name).await? {
            return Err(ServiceError::Invalid("Share already exists.".to_string()));
        }

        let mut wanted: Vec<String> = file_ids.to_vec();
        wanted.sort();
        wanted.dedup();

        let files = FileRepository::new(self.db.pool()).get_many(&wanted).await?;
        let not_owned: Vec<String> = files
            .iter()
            .filter(|f| f.owner_id != actor.id)
            .map(|f| f.id.clone())
            .collect();
        if !not_owned.is_empty() {
            return Err(ServiceError::FilesNotOwned(not_owned));
        }
        if files.len() != wanted.len() {
            return Err(ServiceError::NotFound("No file found."));
        }

        let share = shares
            .create(&NewShare::new(&actor.id, name, wanted))
            .await
            .map_err(|e| match e {
                FileShareError::Validation(_) => {
                    ServiceError::Invalid("Share already exists.".to_string())
                }
                e => e.into(),
            })?;

        info!(share_id = %share.id, user_id = %actor.id, "Share created");
        Ok(share)
    }

    /// Shares visible to `actor` in the given scope, owned ones first.
    pub async fn list(&self, actor: &User, scope: ShareScope) -> ServiceResult<Vec<ShareDetail>> {
        let shares = self.shares();
        let mut found = Vec::new();
        if scope.includes_owned() {
            found.extend(shares.list_owned(&actor.id).await?);
        }
        if scope.includes_accessible() {
            found.extend(shares.list_accessible(&actor.id).await?);
        }

        let mut details = Vec::with_capacity(found.len());
        for share in found {
            details.push(shares.detail(share).await?);
        }
        Ok(details)
    }

    /// A share with its files and ACL. Owner or ACL member only.
    pub async fn get(&self, actor: &User, share_id: &str) -> ServiceResult<ShareDetail> {
        let share = self.find(share_id).await?;
        let shares = self.shares();
        let is_member = shares.is_member(&share.id, &actor.id).await?;
        require_read(actor, &share, is_member)?;
        Ok(shares.detail(share).await?)
    }

    /// Flip the public flag. Owner and verified only.
    pub async fn toggle_visibility(
        &self,
        actor: &User,
        share_id: &str,
        now: DateTime<Utc>,
    ) -> ServiceResult<Visibility> {
        let share = self.find(share_id).await?;
        require_mutate(actor, &share.owner_id)?;

        let updated = self
            .shares()
            .toggle_visibility(&share.id, &actor.id, now)
            .await?
            .ok_or(ServiceError::NotFound(SHARE_NOT_FOUND))?;

        info!(
            share_id = %updated.id,
            is_public = updated.is_public,
            "Share visibility toggled"
        );
        Ok(Visibility::from(&updated))
    }

    /// Attach one of the actor's files. Idempotent.
    pub async fn add_file(&self, actor: &User, share_id: &str, file_id: &str) -> ServiceResult<()> {
        let share = self.find(share_id).await?;
        require_mutate(actor, &share.owner_id)?;

        let file = FileRepository::new(self.db.pool())
            .get_by_id(file_id)
            .await?
            .ok_or(ServiceError::NotFound("File not found."))?;
        if file.owner_id != actor.id {
            return Err(ServiceError::FilesNotOwned(vec![file.id]));
        }

        self.shares().add_file(&share.id, &file.id).await?;
        Ok(())
    }

    /// Detach a file by its display name.
    pub async fn remove_file(
        &self,
        actor: &User,
        share_id: &str,
        filename: &str,
    ) -> ServiceResult<()> {
        let share = self.find(share_id).await?;
        require_mutate(actor, &share.owner_id)?;

        let shares = self.shares();
        let file = shares
            .file_by_name(&share.id, filename)
            .await?
            .ok_or(ServiceError::NotFound(FILE_NOT_IN_SHARE))?;
        shares.remove_file(&share.id, &file.id).await?;
        Ok(())
    }

    /// Read a file of the share by display name. Owner or ACL member only.
    pub async fn file_by_name(
        &self,
        actor: &User,
        share_id: &str,
        filename: &str,
    ) -> ServiceResult<(Share, FileContent)> {
        let share = self.find(share_id).await?;
        let shares = self.shares();
        let is_member = shares.is_member(&share.id, &actor.id).await?;
        require_read(actor, &share, is_member)?;

        let file = shares
            .file_by_name(&share.id, filename)
            .await?
            .ok_or(ServiceError::NotFound(FILE_NOT_IN_SHARE))?;
        let content = self.load(file).await?;
        Ok((share, content))
    }

    /// Read a file of the share by ID. Owner or ACL member only.
    pub async fn file_by_id(
        &self,
        actor: &User,
        share_id: &str,
        file_id: &str,
    ) -> ServiceResult<(Share, FileContent)> {
        let share = self.find(share_id).await?;
        let shares = self.shares();
        let is_member = shares.is_member(&share.id, &actor.id).await?;
        require_read(actor, &share, is_member)?;

        let file = shares
            .file_by_id(&share.id, file_id)
            .await?
            .ok_or(ServiceError::NotFound(FILE_NOT_IN_SHARE))?;
        let content = self.load(file).await?;
        Ok((share, content))
    }

    /// Zip every file of a share for an owner or ACL member.
    pub async fn archive_for(&self, actor: &User, share_id: &str) -> ServiceResult<ShareArchive> {
        let share = self.find(share_id).await?;
        let is_member = self.shares().is_member(&share.id, &actor.id).await?;
        require_read(actor, &share, is_member)?;
        self.archive(share).await
    }

    /// Delete a share with its ACL and file associations.
    pub async fn delete(&self, actor: &User, share_id: &str) -> ServiceResult<()> {
        let share = self.find(share_id).await?;
        require_mutate(actor, &share.owner_id)?;

        if !self.shares().delete(&share.id).await? {
            return Err(ServiceError::NotFound(SHARE_NOT_FOUND));
        }
        info!(share_id = %share.id, user_id = %actor.id, "Share deleted");
        Ok(())
    }

    /// Resolve a public link and check its window.
    pub async fn open_public(&self, link: &str, now: DateTime<Utc>) -> ServiceResult<Share> {
        let share = self
            .shares()
            .get_by_link(link)
            .await?
            .ok_or(ServiceError::NotFound(SHARE_NOT_FOUND))?;
        check_public_download(&share, now)?;
        Ok(share)
    }

    /// Zip every file of a public share reached through its link.
    pub async fn public_archive(
        &self,
        link: &str,
        now: DateTime<Utc>,
    ) -> ServiceResult<ShareArchive> {
        let share = self.open_public(link, now).await?;
        self.archive(share).await
    }

    /// One file of a public share reached through its link.
    pub async fn public_file(
        &self,
        link: &str,
        file_id: &str,
        now: DateTime<Utc>,
    ) -> ServiceResult<(Share, FileContent)> {
        let share = self.open_public(link, now).await?;
        let file = self
            .shares()
            .file_by_id(&share.id, file_id)
            .await?
            .ok_or(ServiceError::NotFound(FILE_NOT_IN_SHARE))?;
        let content = self.load(file).await?;
        Ok((share, content))
    }

    async fn archive(&self, share: Share) -> ServiceResult<ShareArchive> {
        let files = self.shares().files(&share.id).await?;
        let mut contents = Vec::with_capacity(files.len());
        for file in files {
            contents.push(self.load(file).await?);
        }

        let data = build_archive(
            contents
                .iter()
                .map(|c| (c.file.name.as_str(), c.data.as_slice())),
        )?;
        Ok(ShareArchive { share, data })
    }

    async fn load(&self, file: FileRecord) -> ServiceResult<FileContent> {
        match self.storage.get(&file.locator).await {
            Ok(data) => Ok(FileContent { file, data }),
            Err(FileShareError::NotFound(_)) => {
                tracing::warn!(file_id = %file.id, "Stored bytes missing for file");
                Err(ServiceError::NotFound(
                    "The file has been deleted on the file system but not on the database",
                ))
            }
            Err(e) => Err(e.into()),
        }
    }
}
