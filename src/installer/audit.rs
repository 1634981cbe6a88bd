//! Checking installed files against what greater recorded writing.

use serde::Serialize;
use std::fmt;

/// State of one installed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuditStatus {
    /// On-disk bytes match the recorded checksum
    Ok,
    /// The file was edited after install
    Modified,
    /// The file no longer exists
    Missing,
}

impl fmt::Display for AuditStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ok => "ok",
            Self::Modified => "modified",
            Self::Missing => "missing",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub component: String,
    pub path: String,
    pub local_path: String,
    pub status: AuditStatus,
}

/// Result of [`Installer::audit`](super::Installer::audit).
#[derive(Debug, Clone, Default, Serialize)]
pub struct AuditReport {
    pub entries: Vec<AuditEntry>,
}

impl AuditReport {
    /// Entries that are not [`AuditStatus::Ok`].
    pub fn issues(&self) -> impl Iterator<Item = &AuditEntry> {
        self.entries.iter().filter(|e| e.status != AuditStatus::Ok)
    }

    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.issues().next().is_none()
    }

    #[must_use]
    pub fn count(&self, status: AuditStatus) -> usize {
        self.entries.iter().filter(|e| e.status == status).count()
    }
}
