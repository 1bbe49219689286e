//! # Progress Markers
//!
//! The partially ordered set of provisioning milestones.
//!
//! ```text
//! unset ─► pushed ─► templates-pushed ─┬─► version-file-pushed
//!   │                                  └─► gitlab-ci-pushed
//!   └─► branch-pushed
//! ```
//!
//! `version-file-pushed` and `gitlab-ci-pushed` are incomparable, as is
//! `branch-pushed` with every codebase milestone past `unset`.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ProgressMarker {
    #[default]
    Unset,
    Pushed,
    TemplatesPushed,
    VersionFilePushed,
    GitlabCiPushed,
    BranchPushed,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown progress marker: {0}")]
pub struct UnknownMarker(pub String);

impl ProgressMarker {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ProgressMarker::Unset => "",
            ProgressMarker::Pushed => "pushed",
            ProgressMarker::TemplatesPushed => "templates-pushed",
            ProgressMarker::VersionFilePushed => "version-file-pushed",
            ProgressMarker::GitlabCiPushed => "gitlab-ci-pushed",
            ProgressMarker::BranchPushed => "branch-pushed",
        }
    }

    /// Strict predecessors
    fn predecessors(self) -> &'static [ProgressMarker] {
        use ProgressMarker::*;
        match self {
            Unset => &[],
            Pushed | BranchPushed => &[Unset],
            TemplatesPushed => &[Unset, Pushed],
            VersionFilePushed | GitlabCiPushed => &[Unset, Pushed, TemplatesPushed],
        }
    }

    /// Whether `self` is at or past `milestone`
    #[must_use]
    pub fn reached(self, milestone: ProgressMarker) -> bool {
        matches!(
            self.partial_cmp(&milestone),
            Some(Ordering::Greater | Ordering::Equal)
        )
    }
}

impl PartialOrd for ProgressMarker {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self == other {
            Some(Ordering::Equal)
        } else if self.predecessors().contains(other) {
            Some(Ordering::Greater)
        } else if other.predecessors().contains(self) {
            Some(Ordering::Less)
        } else {
            None
        }
    }
}

impl fmt::Display for ProgressMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgressMarker::Unset => f.write_str("unset"),
            other => f.write_str(other.as_str()),
        }
    }
}

impl FromStr for ProgressMarker {
    type Err = UnknownMarker;

    /// Accepts both the dashed form and the underscore form older records carry
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().replace('_', "-").as_str() {
            "" | "unset" => Ok(ProgressMarker::Unset),
            "pushed" => Ok(ProgressMarker::Pushed),
            "templates-pushed" => Ok(ProgressMarker::TemplatesPushed),
            "version-file-pushed" => Ok(ProgressMarker::VersionFilePushed),
            "gitlab-ci-pushed" => Ok(ProgressMarker::GitlabCiPushed),
            "branch-pushed" => Ok(ProgressMarker::BranchPushed),
            _ => Err(UnknownMarker(s.to_string())),
        }
    }
}
