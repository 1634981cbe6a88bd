//! Error handling for greater
//!
//! This module provides the error types and user-friendly error reporting for the
//! component installer. The error system is designed around two core principles:
//! 1. **Strongly-typed errors** for precise error handling in code
//! 2. **User-friendly messages** with actionable suggestions for CLI users
//!
//! # Architecture
//!
//! - [`GreaterError`] - Enumerated error types for all failure cases
//! - [`ErrorContext`] - Wrapper that adds user-friendly messages and suggestions
//!
//! # Error Categories
//!
//! - **Path safety**: [`GreaterError::PathTraversal`]
//! - **Integrity**: [`GreaterError::ChecksumMismatch`], [`GreaterError::IntegrityCheckFailed`]
//! - **Network**: [`GreaterError::NetworkError`], [`GreaterError::FetchFailed`]
//! - **Registry index**: [`GreaterError::RegistryIndexError`], [`GreaterError::ComponentNotFound`],
//!   [`GreaterError::CircularDependency`]
//! - **Cache**: [`GreaterError::CacheError`], [`GreaterError::MissingFromCache`]
//! - **Installation**: [`GreaterError::InstallConflict`], [`GreaterError::PackageInstallFailed`]
//! - **Configuration**: [`GreaterError::ConfigNotFound`], [`GreaterError::ConfigParseError`]
//!
//! Functions throughout the crate return [`anyhow::Result`]; typed errors are created at
//! the failure site and recovered at the CLI boundary with [`user_friendly_error`].
//!
//! # Examples
//!
//! ```rust,no_run
//! use greater_cli::core::{GreaterError, user_friendly_error};
//!
//! let error = GreaterError::ComponentNotFound {
//!     name: "Buton".to_string(),
//!     required_by: None,
//!     suggestions: vec!["Button".to_string()],
//! };
//! let ctx = user_friendly_error(anyhow::Error::from(error));
//! ctx.display(); // Shows colored error with suggestions
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The main error type for greater operations
///
/// Each variant names the offending component, file, or ref so that the message
/// printed at the CLI boundary is actionable on its own.
#[derive(Error, Debug)]
pub enum GreaterError {
    /// A path would resolve outside the directory it is confined to.
    ///
    /// Always fatal and never retried. Raised by path sanitization before any
    /// filesystem mutation takes place.
    #[error("Unsafe path '{path}': {reason}")]
    PathTraversal {
        /// The offending input path
        path: String,
        /// Why the path was rejected
        reason: String,
    },

    /// Fetched content does not match the checksum recorded in the registry.
    #[error("Checksum mismatch for '{path}': expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// Registry-virtual path of the file
        path: String,
        /// Checksum recorded in the registry index
        expected: String,
        /// Checksum of the fetched bytes
        actual: String,
    },

    /// One or more files failed batch verification.
    #[error("Integrity check failed for {} file(s): {}", files.len(), files.join(", "))]
    IntegrityCheckFailed {
        /// Registry-virtual paths that failed verification
        files: Vec<String>,
    },

    /// A network request failed or timed out.
    #[error("Network error while {operation}: {reason}")]
    NetworkError {
        /// What was being fetched (usually includes the URL)
        operation: String,
        /// Underlying failure
        reason: String,
    },

    /// Some files of a batch could not be fetched.
    #[error(
        "Failed to fetch {} file(s) at ref '{git_ref}': {}",
        failures.len(),
        failures.join("; ")
    )]
    FetchFailed {
        /// The ref the batch was fetched at
        git_ref: String,
        /// One `path: reason` entry per failed file
        failures: Vec<String>,
    },

    /// The registry manifest is missing, unreachable, or malformed.
    #[error("Registry index error: {reason}")]
    RegistryIndexError {
        /// Description of the problem
        reason: String,
    },

    /// A requested component (or a dependency of one) is not in the registry.
    #[error(
        "Component '{name}' not found in registry{}",
        required_by.as_ref().map(|r| format!(" (required by '{r}')")).unwrap_or_default()
    )]
    ComponentNotFound {
        /// The missing component name
        name: String,
        /// The component that declared the dependency, if any
        required_by: Option<String>,
        /// Close matches from the registry
        suggestions: Vec<String>,
    },

    /// The internal dependency graph contains a cycle.
    #[error("Circular dependency detected: {chain}")]
    CircularDependency {
        /// Cycle rendered as `A → B → A`
        chain: String,
    },

    /// The local cache could not be read or written.
    #[error("Cache error while {operation} '{path}': {reason}")]
    CacheError {
        /// What the cache was doing
        operation: String,
        /// Cache path involved
        path: String,
        /// Underlying failure
        reason: String,
    },

    /// Offline mode was requested but some files are not cached.
    #[error("Missing from cache at ref '{git_ref}': {}", files.join(", "))]
    MissingFromCache {
        /// The ref that was requested
        git_ref: String,
        /// Registry-virtual paths that are not cached
        files: Vec<String>,
    },

    /// Installed files were modified locally and would be overwritten.
    #[error("Refusing to overwrite locally modified file(s): {}", files.join(", "))]
    InstallConflict {
        /// Project-relative paths of the conflicting files
        files: Vec<String>,
    },

    /// The consumer configuration file was not found.
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// Where the file was expected
        path: String,
    },

    /// A configuration file could not be parsed or is invalid.
    #[error("Invalid configuration in {file}: {reason}")]
    ConfigParseError {
        /// The configuration file
        file: String,
        /// Parser or validation message
        reason: String,
    },

    /// Git executable not found in PATH (needed to resolve floating refs).
    #[error("Git is not installed or not found in PATH")]
    GitNotFound,

    /// A git command returned a non-zero exit code or timed out.
    #[error("Git operation failed: {operation}")]
    GitCommandError {
        /// The git operation that failed (e.g., "ls-remote")
        operation: String,
        /// The error output from the git command
        stderr: String,
    },

    /// The package manager failed to install external dependencies.
    #[error("Package installation with {manager} failed: {reason}")]
    PackageInstallFailed {
        /// Package manager executable
        manager: String,
        /// Failure description
        reason: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing or serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Generic error for cases not covered above
    #[error("{message}")]
    Other {
        /// Error message
        message: String,
    },
}

impl Clone for GreaterError {
    fn clone(&self) -> Self {
        match self {
            Self::PathTraversal {
                path,
                reason,
            } => Self::PathTraversal {
                path: path.clone(),
                reason: reason.clone(),
            },
            Self::ChecksumMismatch {
                path,
                expected,
                actual,
            } => Self::ChecksumMismatch {
                path: path.clone(),
                expected: expected.clone(),
                actual: actual.clone(),
            },
            Self::IntegrityCheckFailed {
                files,
            } => Self::IntegrityCheckFailed {
                files: files.clone(),
            },
            Self::NetworkError {
                operation,
                reason,
            } => Self::NetworkError {
                operation: operation.clone(),
                reason: reason.clone(),
            },
            Self::FetchFailed {
                git_ref,
                failures,
            } => Self::FetchFailed {
                git_ref: git_ref.clone(),
                failures: failures.clone(),
            },
            Self::RegistryIndexError {
                reason,
            } => Self::RegistryIndexError {
                reason: reason.clone(),
            },
            Self::ComponentNotFound {
                name,
                required_by,
                suggestions,
            } => Self::ComponentNotFound {
                name: name.clone(),
                required_by: required_by.clone(),
                suggestions: suggestions.clone(),
            },
            Self::CircularDependency {
                chain,
            } => Self::CircularDependency {
                chain: chain.clone(),
            },
            Self::CacheError {
                operation,
                path,
                reason,
            } => Self::CacheError {
                operation: operation.clone(),
                path: path.clone(),
                reason: reason.clone(),
            },
            Self::MissingFromCache {
                git_ref,
                files,
            } => Self::MissingFromCache {
                git_ref: git_ref.clone(),
                files: files.clone(),
            },
            Self::InstallConflict {
                files,
            } => Self::InstallConflict {
                files: files.clone(),
            },
            Self::ConfigNotFound {
                path,
            } => Self::ConfigNotFound {
                path: path.clone(),
            },
            Self::ConfigParseError {
                file,
                reason,
            } => Self::ConfigParseError {
                file: file.clone(),
                reason: reason.clone(),
            },
            Self::GitNotFound => Self::GitNotFound,
            Self::GitCommandError {
                operation,
                stderr,
            } => Self::GitCommandError {
                operation: operation.clone(),
                stderr: stderr.clone(),
            },
            Self::PackageInstallFailed {
                manager,
                reason,
            } => Self::PackageInstallFailed {
                manager: manager.clone(),
                reason: reason.clone(),
            },
            Self::Other {
                message,
            } => Self::Other {
                message: message.clone(),
            },
            // For errors that don't implement Clone, convert to Other
            Self::Io(e) => Self::Other {
                message: format!("IO error: {e}"),
            },
            Self::Json(e) => Self::Other {
                message: format!("JSON error: {e}"),
            },
            Self::Toml(e) => Self::Other {
                message: format!("TOML parsing error: {e}"),
            },
        }
    }
}

/// Error context wrapper that provides user-friendly error information
///
/// Wraps a [`GreaterError`] with an optional suggestion and details, displayed with
/// terminal colors at the CLI boundary.
///
/// # Examples
///
/// ```rust,no_run
/// use greater_cli::core::{ErrorContext, GreaterError};
///
/// let context = ErrorContext::new(GreaterError::GitNotFound)
///     .with_suggestion("Install git from https://git-scm.com/")
///     .with_details("git is used to resolve branch names to commits");
/// context.display();
/// ```
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: GreaterError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with no suggestion or details.
    #[must_use]
    pub const fn new(error: GreaterError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error (displayed in green).
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add details explaining the error (displayed in yellow).
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Display the error context to stderr with terminal colors
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error to a user-friendly [`ErrorContext`] with actionable suggestions
///
/// Recognizes [`GreaterError`] anywhere in the `anyhow` chain (so `.context()` layers
/// added on the way up do not hide it), [`std::io::Error`] and file-operation errors.
/// Anything else is rendered with its full cause chain.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(greater_error) = error.chain().find_map(|e| e.downcast_ref::<GreaterError>()) {
        let mut ctx = create_error_context(greater_error.clone());
        let outer = error.to_string();
        if ctx.details.is_none() && outer != greater_error.to_string() {
            ctx.details = Some(outer);
        }
        return ctx;
    }

    if let Some(file_error) =
        error.chain().find_map(|e| e.downcast_ref::<super::file_error::FileOperationError>())
    {
        return ErrorContext::new(GreaterError::Other {
            message: file_error.user_message(),
        });
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        match io_error.kind() {
            std::io::ErrorKind::PermissionDenied => {
                return ErrorContext::new(GreaterError::Other {
                    message: format!("Permission denied: {io_error}"),
                })
                .with_suggestion("Check file ownership and permissions of the project directory");
            }
            std::io::ErrorKind::NotFound => {
                return ErrorContext::new(GreaterError::Other {
                    message: format!("File not found: {io_error}"),
                })
                .with_suggestion("Check that the file or directory exists and the path is correct");
            }
            _ => {}
        }
    }

    // Generic error - include the full error chain for better diagnostics
    let mut message = error.to_string();
    let chain: Vec<String> =
        error.chain().skip(1).map(std::string::ToString::to_string).collect();

    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }

    ErrorContext::new(GreaterError::Other {
        message,
    })
}

/// Map each [`GreaterError`] variant to an [`ErrorContext`] with tailored suggestions.
fn create_error_context(error: GreaterError) -> ErrorContext {
    match &error {
        GreaterError::PathTraversal { .. } => ErrorContext::new(error.clone())
            .with_suggestion(
                "Check the alias directories in components.json; \
                 all of them must stay inside the project",
            )
            .with_details(
                "Registry paths and alias targets may not contain '..', \
                 absolute prefixes or drive letters",
            ),

        GreaterError::ChecksumMismatch { path, .. } => {
            let path = path.clone();
            ErrorContext::new(error)
                .with_suggestion(
                    "Clear the cache with 'greater cache clean' and retry; \
                     pass --no-verify only if you trust the source",
                )
                .with_details(format!(
                    "The content fetched for '{path}' differs from the registry manifest. \
                     This indicates corruption or tampering"
                ))
        }

        GreaterError::IntegrityCheckFailed { .. } => ErrorContext::new(error.clone())
            .with_suggestion("Clear the cache with 'greater cache clean' and retry")
            .with_details("Nothing was written to the project"),

        GreaterError::NetworkError { .. } | GreaterError::FetchFailed { .. } => {
            ErrorContext::new(error.clone())
                .with_suggestion(
                    "Check your internet connection and retry, \
                     or pass --offline to use cached content",
                )
        }

        GreaterError::RegistryIndexError { .. } => ErrorContext::new(error.clone())
            .with_suggestion(
                "Verify the ref exists and the registry is reachable; \
                 'greater doctor' checks connectivity",
            ),

        GreaterError::ComponentNotFound { suggestions, .. } => {
            let suggestion = if suggestions.is_empty() {
                "Run 'greater list' to see the available components".to_string()
            } else {
                format!("Did you mean: {}?", suggestions.join(", "))
            };
            ErrorContext::new(error.clone()).with_suggestion(suggestion)
        }

        GreaterError::CircularDependency { chain } => {
            let details = format!("Dependency chain {chain} loops back on itself");
            ErrorContext::new(error.clone())
                .with_suggestion(
                    "The registry at this ref is inconsistent; pin an earlier ref with --ref",
                )
                .with_details(details)
        }

        GreaterError::CacheError { .. } => ErrorContext::new(error.clone())
            .with_suggestion(
                "Check disk space and permissions of the cache directory, \
                 or set GREATER_CACHE_DIR",
            ),

        GreaterError::MissingFromCache { .. } => ErrorContext::new(error.clone())
            .with_suggestion("Run the same command once without --offline to populate the cache")
            .with_details("Nothing was written to the project"),

        GreaterError::InstallConflict { .. } => ErrorContext::new(error.clone())
            .with_suggestion(
                "Inspect the changes with 'greater diff --patch', \
                 then re-run with --force to overwrite",
            )
            .with_details("Nothing was written to the project"),

        GreaterError::ConfigNotFound { .. } => ErrorContext::new(error.clone())
            .with_suggestion("Run 'greater init' to create components.json"),

        GreaterError::ConfigParseError { file, .. } => {
            let suggestion =
                format!("Fix the syntax in {file} or recreate it with 'greater init --force'");
            ErrorContext::new(error.clone()).with_suggestion(suggestion)
        }

        GreaterError::GitNotFound => ErrorContext::new(GreaterError::GitNotFound)
            .with_suggestion(
                "Install git from https://git-scm.com/ \
                 or pin a tag/commit with --ref so no resolution is needed",
            )
            .with_details("git is used to resolve branch names to commits"),

        GreaterError::GitCommandError { stderr, .. } => {
            let details = stderr.trim().to_string();
            ErrorContext::new(error.clone())
                .with_suggestion(
                    "Verify the ref exists in the repository \
                     and that the repository URL is reachable",
                )
                .with_details(details)
        }

        GreaterError::PackageInstallFailed { .. } => ErrorContext::new(error.clone())
            .with_suggestion(
                "Install the listed packages manually; component files were already written",
            ),

        _ => ErrorContext::new(error.clone()),
    }
}
