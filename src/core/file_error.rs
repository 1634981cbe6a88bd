//! Structured file system errors
//!
//! File operations capture their context (operation, path, purpose, caller) at
//! the call site instead of leaving callers to parse `io::Error` messages.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Types of file operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOperation {
    /// Reading a file completely
    Read,
    /// Writing a file
    Write,
    /// Getting file metadata
    Metadata,
    /// Creating a directory
    CreateDir,
    /// Removing a file or directory
    Remove,
}

impl std::fmt::Display for FileOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileOperation::Read => write!(f, "reading"),
            FileOperation::Write => write!(f, "writing"),
            FileOperation::Metadata => write!(f, "getting metadata of"),
            FileOperation::CreateDir => write!(f, "creating directory"),
            FileOperation::Remove => write!(f, "removing"),
        }
    }
}

/// File operation error with full context
#[derive(Error, Debug)]
#[error("Failed {operation} '{}' for {purpose}", file_path.display())]
pub struct FileOperationError {
    /// The type of operation that failed
    pub operation: FileOperation,
    /// The file path that was being accessed
    pub file_path: PathBuf,
    /// Why the file was being accessed
    pub purpose: String,
    /// What code initiated the operation
    pub caller: String,
    /// The underlying IO error
    #[source]
    pub source: std::io::Error,
}

impl FileOperationError {
    /// Get a user-friendly error message with a hint based on the IO error kind.
    pub fn user_message(&self) -> String {
        let mut message = format!(
            "Failed {} '{}' for {} ({})",
            self.operation,
            self.file_path.display(),
            self.purpose,
            self.caller
        );

        match self.source.kind() {
            std::io::ErrorKind::NotFound => {
                message.push_str("\n\nThe file does not exist at the specified path.");
            }
            std::io::ErrorKind::PermissionDenied => {
                message.push_str(&format!(
                    "\n\nPermission denied. Check file/directory permissions for: {}",
                    self.file_path.display()
                ));
            }
            std::io::ErrorKind::InvalidData => {
                message.push_str("\n\nThe file contains invalid data or encoding.");
            }
            _ => {
                message.push_str(&format!("\n\nError details: {}", self.source));
            }
        }

        message
    }
}

/// Extension trait for Result types to add file operation context
pub trait FileResultExt<T> {
    /// Add file operation context to a Result
    fn with_file_context(
        self,
        operation: FileOperation,
        file_path: impl Into<PathBuf>,
        purpose: impl Into<String>,
        caller: impl Into<String>,
    ) -> Result<T, FileOperationError>;
}

impl<T> FileResultExt<T> for Result<T, std::io::Error> {
    fn with_file_context(
        self,
        operation: FileOperation,
        file_path: impl Into<PathBuf>,
        purpose: impl Into<String>,
        caller: impl Into<String>,
    ) -> Result<T, FileOperationError> {
        self.map_err(|source| FileOperationError {
            operation,
            file_path: file_path.into(),
            purpose: purpose.into(),
            caller: caller.into(),
            source,
        })
    }
}

/// Read a file that may legitimately be absent.
///
/// Returns `Ok(None)` for `NotFound`; every other failure carries context.
pub async fn read_optional(
    path: &Path,
    purpose: &str,
    caller: &str,
) -> Result<Option<Vec<u8>>, FileOperationError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_file_context(FileOperation::Read, path, purpose, caller),
    }
}
