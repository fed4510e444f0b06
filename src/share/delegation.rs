//! OTP-gated access grants.
//!
//! An owner adds another user to a share's ACL by presenting a live code
//! from their own authenticator. Nothing is persisted between attempts; a
//! wrong code leaves the ACL untouched and can simply be retried.

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::repository::ShareRepository;
use crate::auth::otp;
use crate::auth::permission::require_mutate;
use crate::db::{Database, User, UserRepository};
use crate::{ServiceError, ServiceResult};

/// A grant request from the share owner.
#[derive(Debug, Clone)]
pub struct GrantRequest<'r> {
    pub share_id: &'r str,
    pub username: &'r str,
    pub otp_code: &'r str,
}

/// Result of a grant attempt that passed the ownership checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantOutcome {
    /// The target was added to the ACL.
    Granted,
    /// The target already had access. Also returned for the owner.
    AlreadyMember,
    /// The owner's code did not match.
    OtpInvalid,
}

impl GrantOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, GrantOutcome::OtpInvalid)
    }
}

/// Run one grant attempt for `actor` at time `now`.
pub async fn give_access(
    db: &Database,
    actor: &User,
    request: &GrantRequest<'_>,
    now: DateTime<Utc>,
) -> ServiceResult<GrantOutcome> {
    let target = UserRepository::new(db.pool())
        .get_by_username(request.username.trim())
        .await?
        .ok_or(ServiceError::NotFound("User not found."))?;

    let shares = ShareRepository::new(db.pool());
    let share = shares
        .get_by_id(request.share_id)
        .await?
        .ok_or(ServiceError::NotFound("Share not found."))?;

    require_mutate(actor, &share.owner_id)?;

    // the owner's secret, never the target's
    if !otp::verify_code(&actor.otp_secret, request.otp_code, now)? {
        warn!(share_id = %share.id, user_id = %actor.id, "Rejected grant with invalid OTP");
        return Ok(GrantOutcome::OtpInvalid);
    }

    if target.id == share.owner_id {
        return Ok(GrantOutcome::AlreadyMember);
    }

    if shares.add_member(&share.id, &target.id).await? {
        info!(share_id = %share.id, user_id = %target.id, "Share access granted");
        Ok(GrantOutcome::Granted)
    } else {
        Ok(GrantOutcome::AlreadyMember)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AccessError;
    use crate::db::NewUser;
    use crate::file::{FileRepository, NewFile};
    use crate::share::{NewShare, Share};
    use chrono::Duration;

    struct Fixture {
        db: Database,
        owner: User,
        target: User,
        share: Share,
    }

    async fn fixture() -> Fixture {
        let db = Database::open_in_memory().await.unwrap();
        let users = UserRepository::new(db.pool());
        let owner = users
            .create(&NewUser::new("alice", "h", otp::generate_secret()).verified())
            .await
            .unwrap();
        let target = users
            .create(&NewUser::new("bobby", "h", otp::generate_secret()).verified())
            .await
            .unwrap();
        let file = FileRepository::new(db.pool())
            .create(&NewFile::new(&owner.id, "a.txt", "0".repeat(32)))
            .await
            .unwrap();
        let share = ShareRepository::new(db.pool())
            .create(&NewShare::new(&owner.id, "Holiday", vec![file.id]))
            .await
            .unwrap();
        Fixture {
            db,
            owner,
            target,
            share,
        }
    }

    fn request<'r>(share: &'r Share, username: &'r str, code: &'r str) -> GrantRequest<'r> {
        GrantRequest {
            share_id: &share.id,
            username,
            otp_code: code,
        }
    }

    async fn members(fx: &Fixture) -> Vec<String> {
        ShareRepository::new(fx.db.pool())
            .allowed_users(&fx.share.id)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_grant_with_valid_code() {
        let fx = fixture().await;
        let now = Utc::now();
        let code = otp::code_at(&fx.owner.otp_secret, now).unwrap();

        let outcome = give_access(&fx.db, &fx.owner, &request(&fx.share, "bobby", &code), now)
            .await
            .unwrap();
        assert_eq!(outcome, GrantOutcome::Granted);
        assert_eq!(members(&fx).await, vec![fx.target.id.clone()]);
    }

    #[tokio::test]
    async fn test_invalid_code_leaves_acl_unchanged() {
        let fx = fixture().await;
        let now = Utc::now();
        let stale = otp::code_at(&fx.owner.otp_secret, now - Duration::minutes(10)).unwrap();

        let outcome = give_access(&fx.db, &fx.owner, &request(&fx.share, "bobby", &stale), now)
            .await
            .unwrap();
        assert_eq!(outcome, GrantOutcome::OtpInvalid);
        assert!(!outcome.is_success());
        assert!(members(&fx).await.is_empty());
    }

    #[tokio::test]
    async fn test_target_code_is_not_accepted() {
        let fx = fixture().await;
        let now = Utc::now();
        let code = otp::code_at(&fx.target.otp_secret, now).unwrap();
        let owner_code = otp::code_at(&fx.owner.otp_secret, now).unwrap();
        if code == owner_code {
            return;
        }

        let outcome = give_access(&fx.db, &fx.owner, &request(&fx.share, "bobby", &code), now)
            .await
            .unwrap();
        assert_eq!(outcome, GrantOutcome::OtpInvalid);
    }

    #[tokio::test]
    async fn test_grant_is_idempotent() {
        let fx = fixture().await;
        let now = Utc::now();
        let code = otp::code_at(&fx.owner.otp_secret, now).unwrap();
        let req = request(&fx.share, "bobby", &code);

        assert_eq!(
            give_access(&fx.db, &fx.owner, &req, now).await.unwrap(),
            GrantOutcome::Granted
        );
        let second = give_access(&fx.db, &fx.owner, &req, now).await.unwrap();
        assert_eq!(second, GrantOutcome::AlreadyMember);
        assert!(second.is_success());
        assert_eq!(members(&fx).await.len(), 1);
    }

    #[tokio::test]
    async fn test_grant_to_owner_is_noop() {
        let fx = fixture().await;
        let now = Utc::now();
        let code = otp::code_at(&fx.owner.otp_secret, now).unwrap();

        let outcome = give_access(&fx.db, &fx.owner, &request(&fx.share, "alice", &code), now)
            .await
            .unwrap();
        assert_eq!(outcome, GrantOutcome::AlreadyMember);
        assert!(members(&fx).await.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_user_and_share() {
        let fx = fixture().await;
        let now = Utc::now();

        let err = give_access(&fx.db, &fx.owner, &request(&fx.share, "nobody", "000000"), now)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound("User not found.")));

        let req = GrantRequest {
            share_id: "3f2504e0-4f89-41d3-9a0c-0305e82c3301",
            username: "bobby",
            otp_code: "000000",
        };
        let err = give_access(&fx.db, &fx.owner, &req, now).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound("Share not found.")));
    }

    #[tokio::test]
    async fn test_only_verified_owner_may_grant() {
        let fx = fixture().await;
        let now = Utc::now();
        let code = otp::code_at(&fx.target.otp_secret, now).unwrap();

        let err = give_access(&fx.db, &fx.target, &request(&fx.share, "bobby", &code), now)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Access(AccessError::NotOwner)));

        let mut owner = fx.owner.clone();
        owner.verified = false;
        let code = otp::code_at(&owner.otp_secret, now).unwrap();
        let err = give_access(&fx.db, &owner, &request(&fx.share, "bobby", &code), now)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Access(AccessError::Unverified)));
        assert!(members(&fx).await.is_empty());
    }
}
