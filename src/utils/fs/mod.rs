//! File system utilities.
//!
//! - [`atomic`] - temp-file + rename writes, including write-once semantics for the cache
//! - [`formats`] - JSON read and write helpers
//! - [`metadata`] - directory sizes

pub mod atomic;
pub mod formats;
pub mod metadata;

pub use atomic::{atomic_write, safe_write, write_once};
pub use formats::{read_json_file, read_text_file, write_json_file};
pub use metadata::{dir_size, format_size, get_directory_size};
