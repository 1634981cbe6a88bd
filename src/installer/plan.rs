//! Per-file install plan and the report returned to commands.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use crate::integrity::verify_checksum;
use crate::resolver::PackageConflict;
use crate::transform::TransformSummary;

/// What installing a file will do to the project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FileAction {
    /// Nothing exists at the target
    Create,
    /// The target is an unmodified earlier install and will be replaced
    Update,
    /// The target already holds exactly the new bytes
    UpToDate,
    /// The target differs from both the new bytes and the recorded install
    Conflict,
}

impl fmt::Display for FileAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::UpToDate => "up to date",
            Self::Conflict => "conflict",
        })
    }
}

/// Decide the action for one target.
///
/// `recorded_checksum` is the digest greater wrote last time, if the file is
/// tracked. An untracked existing file that differs from `new` is a conflict.
pub fn determine_action(
    existing: Option<&[u8]>,
    new: &[u8],
    recorded_checksum: Option<&str>,
) -> FileAction {
    match existing {
        None => FileAction::Create,
        Some(bytes) if bytes == new => FileAction::UpToDate,
        Some(bytes) => match recorded_checksum {
            Some(recorded) if verify_checksum(bytes, recorded) => FileAction::Update,
            _ => FileAction::Conflict,
        },
    }
}

/// One file of a component, ready to write.
#[derive(Debug, Clone)]
pub struct PlannedFile {
    /// Registry-virtual path
    pub path: String,
    /// Project-relative target
    pub local_path: String,
    /// Absolute target, already checked to be inside the project
    pub target: PathBuf,
    /// Bytes to write (after import rewriting)
    pub content: Vec<u8>,
    /// Digest of `content`
    pub checksum: String,
    /// Registry digest of the fetched bytes
    pub source_checksum: String,
    /// Current bytes at the target
    pub existing: Option<Vec<u8>>,
    pub action: FileAction,
    pub summary: TransformSummary,
}

impl PlannedFile {
    /// Whether executing the plan writes this file.
    #[must_use]
    pub fn needs_write(&self, force: bool) -> bool {
        match self.action {
            FileAction::Create | FileAction::Update => true,
            FileAction::Conflict => force,
            FileAction::UpToDate => false,
        }
    }
}

/// All files of one component.
#[derive(Debug, Clone)]
pub struct ComponentPlan {
    pub name: String,
    /// Pulled in only as a dependency
    pub transitive: bool,
    pub files: Vec<PlannedFile>,
}

impl ComponentPlan {
    /// Whether any file changes.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        self.files.iter().any(|f| f.action != FileAction::UpToDate)
    }
}

/// Outcome of an install, update, or diff.
#[derive(Debug, Clone, Default)]
pub struct InstallReport {
    /// Ref as requested
    pub git_ref: String,
    /// Immutable ref content was fetched at
    pub resolved_ref: String,
    /// Components in install order
    pub components: Vec<ComponentPlan>,
    /// External packages the components need
    pub packages: BTreeMap<String, String>,
    pub package_conflicts: Vec<PackageConflict>,
    /// Packages handed to the package manager
    pub installed_packages: Vec<String>,
    /// Checksum mismatches tolerated because verification was disabled
    pub checksum_warnings: Vec<String>,
    /// Nothing was written
    pub dry_run: bool,
}

impl InstallReport {
    /// Every planned file with its component name.
    pub fn files(&self) -> impl Iterator<Item = (&str, &PlannedFile)> {
        self.components.iter().flat_map(|c| c.files.iter().map(move |f| (c.name.as_str(), f)))
    }

    /// Number of files with `action`.
    #[must_use]
    pub fn count(&self, action: FileAction) -> usize {
        self.files().filter(|(_, f)| f.action == action).count()
    }

    /// Project-relative paths of conflicting files.
    pub fn conflicts(&self) -> Vec<String> {
        self.files()
            .filter(|(_, f)| f.action == FileAction::Conflict)
            .map(|(_, f)| f.local_path.clone())
            .collect()
    }

    /// Whether anything would be or was written.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        self.components.iter().any(ComponentPlan::has_changes)
    }
}
