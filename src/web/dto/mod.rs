//! Data transfer objects for the HTTP surfaces.

pub mod query;
pub mod request;
pub mod response;
pub mod validation;

pub use query::{Query, QueryResponse, UserView, QUERY_OPS};
pub use request::*;
pub use response::*;
pub use validation::ValidatedJson;
