//! Core types for greater
//!
//! Error handling lives here:
//! - [`GreaterError`] - Enumerated error types covering all failure modes
//! - [`ErrorContext`] - User-friendly error wrapper with suggestions and details
//! - [`user_friendly_error`] - Convert any error to user-friendly format
//! - [`FileOperationError`] / [`FileResultExt`] - IO errors with operation context
//!
//! # Examples
//!
//! ```rust
//! use greater_cli::core::{GreaterError, user_friendly_error};
//! use anyhow::Result;
//!
//! fn example_operation() -> Result<String> {
//!     Err(GreaterError::ConfigNotFound { path: "components.json".into() }.into())
//! }
//!
//! if let Err(e) = example_operation() {
//!     let friendly = user_friendly_error(e);
//!     assert!(friendly.suggestion.is_some());
//! }
//! ```

pub mod error;
pub mod file_error;

pub use error::{ErrorContext, GreaterError, user_friendly_error};
pub use file_error::{FileOperation, FileOperationError, FileResultExt};
