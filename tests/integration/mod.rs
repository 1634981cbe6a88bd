//! Integration test suite for greater
//!
//! End-to-end tests that run the `greater` binary against a registry checkout
//! served through `GREATER_LOCAL_REPO`, plus library-level pipeline tests.
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! - **add**: installing components, dependencies, import rewriting, conflicts
//! - **update_diff**: `update` and `diff` against a new upstream release
//! - **audit**: detection of modified and missing files
//! - **list**: registry and installed listings, JSON output
//! - **environment**: `init`, `doctor`, `cache`, and offline failures
//! - **pipeline**: library API over the cache with an in-memory source

#[path = "../common/mod.rs"]
mod common;

mod add;
mod audit;
mod environment;
mod list;
mod pipeline;
mod update_diff;
