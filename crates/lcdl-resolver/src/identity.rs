//! Projects and the identity triple derived from posted names.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ResolveError;

/// Branch recorded when the source format carries no branch information.
pub const NO_BRANCH: &str = "none";

/// Per-project directory holding the latest pointers. Never a valid version.
pub const LATEST_DIR: &str = "latest";

/// A project whose builds are published to the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Project {
    Lawnchair,
    Lawnstep,
}

/// Fixed file name layout of a project's artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NamingConvention {
    /// Literal prefix, e.g. `Lawnchair-`.
    pub prefix: &'static str,
    /// Literal suffix including the dot, e.g. `.apk`.
    pub suffix: &'static str,
    /// Separates branch tokens from the trailing version token.
    pub delimiter: char,
}

impl Project {
    /// All known projects, in registry order.
    pub const ALL: [Project; 2] = [Project::Lawnchair, Project::Lawnstep];

    /// Directory name under the download root.
    pub fn folder_name(&self) -> &'static str {
        match self {
            Project::Lawnchair => "lawnchair",
            Project::Lawnstep => "lawnstep",
        }
    }

    /// Lowercase keyword that routes a changelog to this project.
    pub fn changelog_keyword(&self) -> &'static str {
        self.folder_name()
    }

    pub fn naming(&self) -> NamingConvention {
        match self {
            Project::Lawnchair => NamingConvention {
                prefix: "Lawnchair-",
                suffix: ".apk",
                delimiter: '_',
            },
            Project::Lawnstep => NamingConvention {
                prefix: "Lawnstep-",
                suffix: ".zip",
                delimiter: '_',
            },
        }
    }

    /// Reverse of [`Project::folder_name`].
    pub fn from_folder_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.folder_name() == name)
    }
}

impl fmt::Display for Project {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.folder_name())
    }
}

/// The `{project, branch, version}` storage key.
///
/// Recomputed from the posted name each time; never persisted on its own.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct BuildIdentity {
    pub project: Project,
    pub branch: String,
    pub version: String,
}

impl BuildIdentity {
    /// Build an identity, rejecting versions that cannot name a version
    /// directory: unsafe path components and the reserved [`LATEST_DIR`].
    ///
    /// An empty branch is replaced by [`NO_BRANCH`].
    pub fn new(
        project: Project,
        branch: impl Into<String>,
        version: impl Into<String>,
    ) -> Result<Self, ResolveError> {
        let version = version.into();
        if !is_path_component(&version) || version.eq_ignore_ascii_case(LATEST_DIR) {
            return Err(ResolveError::InvalidVersion(version));
        }

        let mut branch = branch.into();
        if branch.is_empty() {
            branch = NO_BRANCH.to_string();
        }

        Ok(Self {
            project,
            branch,
            version,
        })
    }
}

impl fmt::Display for BuildIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}@{}", self.project, self.branch, self.version)
    }
}

/// True when `s` can be joined onto a directory without escaping it.
pub(crate) fn is_path_component(s: &str) -> bool {
    !s.is_empty()
        && s != "."
        && s != ".."
        && !s.contains(&['/', '\\', '\0'][..])
}
