//! HTTP surface of the authority.
//!
//! The authority owns the database and the stored bytes and answers every
//! domain operation. It is normally reached only through the gateway.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use router::create_router;
pub use server::AuthorityServer;
