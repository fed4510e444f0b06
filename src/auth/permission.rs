//! Access-control decisions for files and shares.
//!
//! Three relations grant rights on a share: ownership (full rights), ACL
//! membership (read only) and, for public downloads, presenting the share's
//! link token while its public window is open. Every mutation also requires
//! the actor's account to be verified.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::db::User;
use crate::share::Share;

/// Reasons an action is denied.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccessError {
    /// Mutations need a verified account.
    #[error("Only verified users can perform this action.")]
    Unverified,

    /// Only the owner may change the resource.
    #[error("You don't have the permission to edit this resource.")]
    NotOwner,

    /// Neither owner nor ACL member.
    #[error("You're not allowed to access this share.")]
    NotAllowed,

    /// Public link used on a private share.
    #[error("Share not public.")]
    NotPublic,

    /// Public share without an expiry. Rejected by the schema, kept for
    /// rows written by other tools.
    #[error("An error has occurred.")]
    MissingExpiry,

    /// Public window has closed.
    #[error("The public link has expired.")]
    Expired,
}

/// Whether `actor` may read `share` through their session.
///
/// # Examples
///
/// ```ignore
/// assert!(can_access(&owner, &share, false));
/// assert!(can_access(&member, &share, true));
/// assert!(!can_access(&stranger, &share, false));
/// ```
pub fn can_access(actor: &User, share: &Share, is_member: bool) -> bool {
    actor.id == share.owner_id || is_member
}

/// Whether `actor` owns the resource owned by `owner_id`.
///
/// ACL membership never grants mutation rights.
pub fn can_mutate(actor: &User, owner_id: &str) -> bool {
    actor.id == owner_id
}

/// Require a verified account.
pub fn require_verified(actor: &User) -> Result<(), AccessError> {
    if actor.verified {
        Ok(())
    } else {
        Err(AccessError::Unverified)
    }
}

/// Require read access through ownership or ACL membership.
pub fn require_read(actor: &User, share: &Share, is_member: bool) -> Result<(), AccessError> {
    if can_access(actor, share, is_member) {
        Ok(())
    } else {
        Err(AccessError::NotAllowed)
    }
}

/// Require ownership and a verified account.
pub fn require_mutate(actor: &User, owner_id: &str) -> Result<(), AccessError> {
    if !can_mutate(actor, owner_id) {
        return Err(AccessError::NotOwner);
    }
    require_verified(actor)
}

/// Check the capability path for a share found by its link token.
///
/// Allowed only while `now < valid_until`; at exactly `valid_until` the
/// link is already expired.
pub fn check_public_download(share: &Share, now: DateTime<Utc>) -> Result<(), AccessError> {
    if !share.is_public {
        return Err(AccessError::NotPublic);
    }
    let valid_until = share.valid_until.ok_or(AccessError::MissingExpiry)?;
    if now < valid_until {
        Ok(())
    } else {
        Err(AccessError::Expired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Role;
    use chrono::Duration;

    fn user(id: &str, verified: bool) -> User {
        User {
            id: id.to_string(),
            username: format!("user-{id}"),
            password: String::new(),
            role: Role::User,
            verified,
            otp_secret: String::new(),
            created_at: Utc::now(),
        }
    }

    fn share(owner: &str, valid_until: Option<DateTime<Utc>>) -> Share {
        Share {
            id: "share".to_string(),
            owner_id: owner.to_string(),
            name: "Holiday".to_string(),
            is_public: valid_until.is_some(),
            link: "l".repeat(64),
            valid_until,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_owner_can_access() {
        let owner = user("a", false);
        assert!(can_access(&owner, &share("a", None), false));
    }

    #[test]
    fn test_member_can_access() {
        let member = user("b", true);
        assert!(can_access(&member, &share("a", None), true));
        assert!(require_read(&member, &share("a", None), true).is_ok());
    }

    #[test]
    fn test_stranger_denied() {
        let stranger = user("c", true);
        let public = share("a", Some(Utc::now() + Duration::days(1)));
        // public exposure does not help a session-based read
        assert!(!can_access(&stranger, &public, false));
        assert_eq!(
            require_read(&stranger, &public, false),
            Err(AccessError::NotAllowed)
        );
    }

    #[test]
    fn test_mutation_requires_owner() {
        let member = user("b", true);
        assert!(!can_mutate(&member, "a"));
        assert_eq!(require_mutate(&member, "a"), Err(AccessError::NotOwner));
    }

    #[test]
    fn test_mutation_requires_verified() {
        let owner = user("a", false);
        assert!(can_mutate(&owner, "a"));
        assert_eq!(require_mutate(&owner, "a"), Err(AccessError::Unverified));
        assert!(require_mutate(&user("a", true), "a").is_ok());
    }

    #[test]
    fn test_public_download_window() {
        let now = Utc::now();
        let valid_until = now + Duration::days(7);
        let share = share("a", Some(valid_until));

        assert!(check_public_download(&share, now).is_ok());
        assert!(check_public_download(&share, valid_until - Duration::seconds(1)).is_ok());
        assert_eq!(
            check_public_download(&share, valid_until),
            Err(AccessError::Expired)
        );
        assert_eq!(
            check_public_download(&share, valid_until + Duration::seconds(1)),
            Err(AccessError::Expired)
        );
    }

    #[test]
    fn test_public_download_private_share() {
        assert_eq!(
            check_public_download(&share("a", None), Utc::now()),
            Err(AccessError::NotPublic)
        );
    }

    #[test]
    fn test_public_download_missing_expiry() {
        let mut broken = share("a", None);
        broken.is_public = true;
        assert_eq!(
            check_public_download(&broken, Utc::now()),
            Err(AccessError::MissingExpiry)
        );
    }
}
