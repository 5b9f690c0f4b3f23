//! Common error handling utilities for Relay Console
//!
//! Every crate in the workspace keeps its own `thiserror` enum for the
//! failures it owns. This crate holds what they share:
//!
//! - **`RelayError`**: the process-level error returned by binaries and
//!   startup code, where library errors are folded in
//! - **Error codes**: stable, machine-readable identifiers that the HTTP layer
//!   puts in every error body so the console can branch on them without
//!   parsing messages
//!
//! # Example
//!
//! ```rust
//! use error_common::{codes, ErrorCode, RelayError};
//!
//! fn bind_port(port: u16) -> Result<u16, RelayError> {
//!     if port == 0 {
//!         return Err(RelayError::ConfigError("port must be non-zero".to_string()));
//!     }
//!     Ok(port)
//! }
//!
//! let err = bind_port(0).unwrap_err();
//! assert_eq!(err.code(), ErrorCode(codes::config::INVALID_VALUE));
//! ```

pub mod codes;
pub mod types;

pub use codes::ErrorCode;
pub use types::*;
