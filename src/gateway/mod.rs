//! Edge gateway.
//!
//! The only network-facing process. For every request it:
//!
//! - authenticates the bearer token (except login, registration and
//!   public downloads)
//! - checks ids, links, file names, enumerations and list fields
//! - forwards the request to the authority and relays its answer verbatim
//!
//! A request that fails a check is answered here and never reaches the
//! authority. Transport failures answer a uniform internal error.

pub mod proxy;
pub mod rate_limit;
pub mod router;
pub mod routes;
pub mod server;
pub mod validate;

pub use proxy::{AuthorityClient, Forward, Outbound, Upstream};
pub use rate_limit::RateLimits;
pub use router::{create_router, GatewayOptions};
pub use routes::GatewayState;
pub use server::GatewayServer;
