//! Resolution errors.

use thiserror::Error;

/// Why a file name or changelog could not be turned into a [`BuildIdentity`].
///
/// [`BuildIdentity`]: crate::BuildIdentity
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// No registered rule matches the file name. Expected for off-topic posts.
    #[error("file name not supported: {0}")]
    NotSupported(String),

    /// A rule matched but the name does not yield a usable identity.
    #[error("file name '{file_name}' matched '{pattern}' but {reason}")]
    MalformedFileName {
        file_name: String,
        pattern: String,
        reason: String,
    },

    /// The changelog metadata line could not be parsed.
    #[error("malformed changelog: {0}")]
    MalformedChangelog(String),

    /// Version is empty or not usable as a single path component.
    #[error("invalid version '{0}'")]
    InvalidVersion(String),
}

impl ResolveError {
    /// Whether this is the quiet "not for us" case rather than a real failure.
    pub fn is_not_supported(&self) -> bool {
        matches!(self, ResolveError::NotSupported(_))
    }
}
