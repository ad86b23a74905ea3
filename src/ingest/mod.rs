//! Artifact and changelog ingestion
//!
//! Each posted item runs through one ingestor to completion:
//!
//! - artifacts: resolve name, prepare directories, download, MD5, relink
//! - changelogs: resolve metadata line, prepare directories, write, relink
//!
//! Failures never escape as errors. Every outcome comes back as a value the
//! dispatcher can log and move past.

mod artifact;
mod changelog;
pub mod checksum;
pub mod remote;

pub use artifact::ArtifactIngestor;
pub use changelog::ChangelogIngestor;
pub use remote::{LocalFiles, MockRemote, RemoteError, RemoteFiles};

use std::fmt;
use std::io;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use lcdl_resolver::{BuildIdentity, ResolveError};
use serde::Serialize;
use thiserror::Error;

use crate::storage::LayoutError;

/// A binary file posted to the channel.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub file_name: String,
    pub mime_type: Option<String>,
    /// Size announced by the channel; 0 when unknown.
    pub size_bytes: u64,
    /// Handle understood by the [`RemoteFiles`] implementation.
    pub remote_file_id: String,
    pub posted_at: DateTime<Utc>,
}

/// A text message carrying release notes.
#[derive(Debug, Clone)]
pub struct Changelog {
    pub text: String,
    pub posted_at: DateTime<Utc>,
}

/// Failure class, for logs and callers that only care about the stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureKind {
    Directory,
    Transfer,
    Checksum,
    Symlink,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Directory => write!(f, "DIRECTORY"),
            Self::Transfer => write!(f, "TRANSFER"),
            Self::Checksum => write!(f, "CHECKSUM"),
            Self::Symlink => write!(f, "SYMLINK"),
        }
    }
}

/// A failure partway through storing an item.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("cannot prepare storage: {0}")]
    Directory(#[source] LayoutError),

    #[error("cannot fetch {file_name}: {source}")]
    Fetch {
        file_name: String,
        #[source]
        source: RemoteError,
    },

    #[error("cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("size mismatch for {path}: announced {expected} bytes, received {actual}")]
    SizeMismatch {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },

    #[error("cannot checksum {path}: {source}")]
    Checksum {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot update latest pointer: {0}")]
    Symlink(#[source] LayoutError),
}

impl IngestError {
    pub fn kind(&self) -> FailureKind {
        match self {
            IngestError::Directory(_) => FailureKind::Directory,
            IngestError::Fetch { .. }
            | IngestError::Write { .. }
            | IngestError::SizeMismatch { .. } => FailureKind::Transfer,
            IngestError::Checksum { .. } => FailureKind::Checksum,
            IngestError::Symlink(_) => FailureKind::Symlink,
        }
    }
}

/// Why an item was not stored at all.
#[derive(Debug)]
pub enum Rejection {
    /// The name or metadata line did not resolve to an identity.
    Unresolved(ResolveError),
    /// Storing failed; used for changelogs, which have no partial state.
    Failed(IngestError),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::Unresolved(e) => write!(f, "{}", e),
            Rejection::Failed(e) => write!(f, "{}", e),
        }
    }
}

/// An artifact that made it all the way to the latest pointers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredArtifact {
    pub identity: BuildIdentity,
    pub artifact_path: PathBuf,
    pub checksum_path: PathBuf,
    pub latest_link: PathBuf,
    /// Lowercase hex MD5 of the stored bytes.
    pub md5: String,
    pub bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredChangelog {
    pub identity: BuildIdentity,
    pub changelog_path: PathBuf,
    pub latest_link: PathBuf,
}

/// Result of ingesting one artifact.
#[derive(Debug)]
pub enum IngestOutcome {
    Ingested(StoredArtifact),
    Rejected(Rejection),
    /// Directories or a partial file may remain; latest pointers are only
    /// touched after the download and checksum succeed.
    PartialFailure(IngestError),
}

impl IngestOutcome {
    pub fn is_ingested(&self) -> bool {
        matches!(self, IngestOutcome::Ingested(_))
    }
}

/// Result of ingesting one changelog.
#[derive(Debug)]
pub enum ChangelogOutcome {
    Ingested(StoredChangelog),
    Rejected(Rejection),
}

impl ChangelogOutcome {
    pub fn is_ingested(&self) -> bool {
        matches!(self, ChangelogOutcome::Ingested(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_kinds() {
        let write = IngestError::Write {
            path: PathBuf::from("/x"),
            source: io::Error::other("disk full"),
        };
        assert_eq!(write.kind(), FailureKind::Transfer);

        let mismatch = IngestError::SizeMismatch {
            path: PathBuf::from("/x"),
            expected: 10,
            actual: 3,
        };
        assert_eq!(mismatch.kind(), FailureKind::Transfer);
        assert!(mismatch.to_string().contains("announced 10 bytes, received 3"));

        let checksum = IngestError::Checksum {
            path: PathBuf::from("/x"),
            source: io::Error::other("gone"),
        };
        assert_eq!(checksum.kind(), FailureKind::Checksum);
        assert_eq!(checksum.kind().to_string(), "CHECKSUM");
    }
}
