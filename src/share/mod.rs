//! Shares: named bundles of files with an ACL and an optional public link.

pub mod delegation;
mod link;
mod repository;
mod service;
mod types;

pub use delegation::{give_access, GrantOutcome, GrantRequest};
pub use link::{generate_link, LINK_LENGTH};
pub use repository::ShareRepository;
pub use service::{FileContent, ShareArchive, ShareService};
pub use types::{
    public_window_end, NewShare, Share, ShareDetail, ShareScope, Visibility, PUBLIC_WINDOW_DAYS,
};
