//! Cross-cutting utilities.
//!
//! - [`fs`] - atomic writes and JSON helpers
//! - [`path_validation`] - confinement of relative paths to a base directory
//! - [`platform`] - home/cache directories and executable lookup
//! - [`progress`] - spinners and progress bars

pub mod fs;
pub mod path_validation;
pub mod platform;
pub mod progress;

pub use fs::{atomic_write, safe_write};
pub use path_validation::{is_within_dir, resolve_path_within_dir, sanitize_relative_path};
pub use platform::{command_exists, get_cache_dir, get_git_command, get_home_dir};
pub use progress::ProgressBar;
