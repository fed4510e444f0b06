//! FileShare - owner-controlled file sharing.
//!
//! Users upload files and bundle them into shares. A share is readable by
//! its owner and by the users on its access list, and can be published
//! through a time-limited public link. Access is granted to other users
//! with a live one-time password from the owner.
//!
//! Two processes are built from this crate: the authority, which owns the
//! store and makes every authorization decision, and the edge gateway,
//! which authenticates and validates requests before forwarding them.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod file;
pub mod gateway;
pub mod logging;
pub mod share;
pub mod web;

pub use config::Config;
pub use db::{Database, NewUser, Role, User, UserRepository};
pub use error::{FileShareError, Result, ServiceError, ServiceResult};
