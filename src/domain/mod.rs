//! Domain types for Veil.
//!
//! The domain layer provides the error taxonomy ([`VeilError`], [`DetectorError`])
//! and the crate-wide [`Result`] alias. Every fallible operation in the core returns
//! [`Result<T>`]:
//!
//! ```rust
//! use veil::domain::{VeilError, Result};
//!
//! fn parse_flag(raw: &str) -> Result<bool> {
//!     raw.parse()
//!         .map_err(|_| VeilError::InvalidInput(format!("not a boolean: {raw}")))
//! }
//! ```

pub mod errors;
pub mod result;

pub use errors::{DetectorError, VeilError};
pub use result::Result;
