//! Build identity resolution for posted Lawnchair artifacts and changelogs.
//!
//! Maps a raw file name, or the first line of a changelog message, to the
//! `{project, branch, version}` key that the download tree is laid out by.
//! Nothing in this crate touches the filesystem.

mod changelog;
mod error;
mod explain;
mod identity;
mod registry;

pub use changelog::resolve_from_changelog;
pub use error::ResolveError;
pub use explain::{InputKind, Resolution};
pub use identity::{BuildIdentity, NamingConvention, Project, LATEST_DIR, NO_BRANCH};
pub use registry::{FileMatch, Registry, SupportedFileRule, DEFAULT_RULES};
