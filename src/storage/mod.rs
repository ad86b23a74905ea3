//! Versioned download tree
//!
//! Layout produced under the download root:
//!
//! ```text
//! <root>/<project>/<version>/<original-file-name>
//! <root>/<project>/<version>/MD5SUM
//! <root>/<project>/<version>/CHANGELOG
//! <root>/<project>/latest/latest<ext>   -> ../<version>/<original-file-name>
//! <root>/<project>/latest/MD5SUM        -> ../<version>/MD5SUM
//! <root>/<project>/latest/CHANGELOG     -> ../<version>/CHANGELOG
//! ```
//!
//! `latest/` only ever holds symlinks. They point at whatever was ingested
//! last; versions are never compared.

mod scan;

pub use scan::{scan, LatestLink, ProjectSummary};

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use lcdl_resolver::{BuildIdentity, Project};
use thiserror::Error;
use uuid::Uuid;

pub use lcdl_resolver::LATEST_DIR;

/// Stem of the latest artifact link; the artifact's extension is appended.
pub const LATEST_STEM: &str = "latest";

/// Checksum sidecar written next to each artifact.
pub const CHECKSUM_FILE: &str = "MD5SUM";

pub const CHANGELOG_FILE: &str = "CHANGELOG";

/// Errors from preparing or mutating the download tree.
#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("version '{0}' collides with the latest/ directory")]
    ReservedVersion(String),

    #[error("cannot create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot link {link} -> {target}: {source}")]
    Relink {
        link: PathBuf,
        target: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot read link {path}: {source}")]
    ReadLink {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot scan download tree: {0}")]
    Scan(#[from] walkdir::Error),
}

/// Root of the download tree.
#[derive(Debug, Clone)]
pub struct StorageRoot {
    root: PathBuf,
}

impl StorageRoot {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn project_dir(&self, project: Project) -> PathBuf {
        self.root.join(project.folder_name())
    }

    /// Compute the paths for `identity` without touching the filesystem.
    pub fn layout(&self, identity: &BuildIdentity) -> StorageLayout {
        let project_dir = self.project_dir(identity.project);
        StorageLayout {
            project: identity.project,
            version: identity.version.clone(),
            version_dir: project_dir.join(&identity.version),
            latest_dir: project_dir.join(LATEST_DIR),
        }
    }

    /// Compute the paths for `identity` and create its directories.
    ///
    /// Idempotent: existing directories are left alone.
    pub fn ensure_layout(&self, identity: &BuildIdentity) -> Result<StorageLayout, LayoutError> {
        if identity.version.eq_ignore_ascii_case(LATEST_DIR) {
            return Err(LayoutError::ReservedVersion(identity.version.clone()));
        }
        let layout = self.layout(identity);
        for dir in [&layout.version_dir, &layout.latest_dir] {
            fs::create_dir_all(dir).map_err(|source| LayoutError::CreateDir {
                path: dir.clone(),
                source,
            })?;
        }
        Ok(layout)
    }
}

/// Canonical paths for one build identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLayout {
    pub project: Project,
    pub version: String,
    /// `<root>/<project>/<version>/`
    pub version_dir: PathBuf,
    /// `<root>/<project>/latest/`
    pub latest_dir: PathBuf,
}

impl StorageLayout {
    pub fn artifact_path(&self, file_name: &str) -> PathBuf {
        self.version_dir.join(file_name)
    }

    pub fn checksum_path(&self) -> PathBuf {
        self.version_dir.join(CHECKSUM_FILE)
    }

    pub fn changelog_path(&self) -> PathBuf {
        self.version_dir.join(CHANGELOG_FILE)
    }

    pub fn latest_artifact_link(&self, file_name: &str) -> PathBuf {
        self.latest_dir.join(latest_name(file_name))
    }

    pub fn latest_checksum_link(&self) -> PathBuf {
        self.latest_dir.join(CHECKSUM_FILE)
    }

    pub fn latest_changelog_link(&self) -> PathBuf {
        self.latest_dir.join(CHANGELOG_FILE)
    }

    /// Link target, relative to `latest/`, for a file in the version directory.
    pub fn link_target(&self, file_name: &str) -> PathBuf {
        Path::new("..").join(&self.version).join(file_name)
    }
}

/// `latest` plus the extension of `file_name`, e.g. `latest.apk`.
pub fn latest_name(file_name: &str) -> String {
    match Path::new(file_name).extension() {
        Some(ext) => format!("{}.{}", LATEST_STEM, ext.to_string_lossy()),
        None => LATEST_STEM.to_string(),
    }
}

/// Replace whatever sits at `link` with a symlink to `target`.
pub fn relink(target: &Path, link: &Path) -> Result<(), LayoutError> {
    relink_all(&[(target.to_path_buf(), link.to_path_buf())])
}

/// Point every `(target, link)` pair at its new target, or none of them.
///
/// Each link is checked and staged under a temporary name first; only when
/// all are staged are they renamed over their final names. A failure before
/// that point leaves every existing link untouched.
pub fn relink_all(links: &[(PathBuf, PathBuf)]) -> Result<(), LayoutError> {
    let fail = |target: &Path, link: &Path, source: io::Error| LayoutError::Relink {
        link: link.to_path_buf(),
        target: target.to_path_buf(),
        source,
    };

    for (target, link) in links {
        match fs::symlink_metadata(link) {
            Ok(meta) if meta.is_dir() => {
                return Err(fail(target, link, io::Error::other("a directory is in the way")));
            }
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(fail(target, link, e)),
        }
    }

    let mut staged: Vec<PathBuf> = Vec::with_capacity(links.len());
    for (target, link) in links {
        let temp = staging_path(link);
        if let Err(e) = create_symlink(target, &temp) {
            discard(&staged);
            return Err(fail(target, link, e));
        }
        staged.push(temp);
    }

    for (i, (target, link)) in links.iter().enumerate() {
        if let Err(e) = fs::rename(&staged[i], link) {
            discard(&staged[i..]);
            return Err(fail(target, link, e));
        }
    }

    Ok(())
}

/// Hidden sibling of `link` used while staging.
fn staging_path(link: &Path) -> PathBuf {
    let name = link
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    link.with_file_name(format!(".{}.{}.tmp", name, Uuid::new_v4()))
}

fn discard(paths: &[PathBuf]) {
    for path in paths {
        let _ = fs::remove_file(path);
    }
}

#[cfg(unix)]
fn create_symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn create_symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(target, link)
}
