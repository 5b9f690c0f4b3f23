//! API token authentication

pub mod tokens;

pub use tokens::{Principal, TokenRegistry};
