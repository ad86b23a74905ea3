//! Changelog metadata parsing.
//!
//! A changelog post starts with a line such as `Changelog dev-1.0.0.` whose
//! last whitespace-delimited token carries the build metadata. Every
//! failure comes back as [`ResolveError::MalformedChangelog`].

use crate::error::ResolveError;
use crate::identity::{BuildIdentity, Project, NO_BRANCH};

/// Resolve the identity a changelog message refers to.
pub fn resolve_from_changelog(text: &str) -> Result<BuildIdentity, ResolveError> {
    let first_line = text.lines().next().unwrap_or_default().to_lowercase();
    let metadata = first_line
        .split_whitespace()
        .last()
        .ok_or_else(|| malformed("first line is empty"))?;

    let project = if first_line.contains(Project::Lawnstep.changelog_keyword()) {
        Project::Lawnstep
    } else {
        Project::Lawnchair
    };

    let identity = match project {
        Project::Lawnstep => parse_lawnstep(metadata),
        Project::Lawnchair => parse_lawnchair(metadata),
    }?;

    Ok(identity)
}

/// `<anything>-<version>`; lawnstep changelogs carry no branch.
fn parse_lawnstep(metadata: &str) -> Result<BuildIdentity, ResolveError> {
    let version = metadata
        .split('-')
        .nth(1)
        .ok_or_else(|| malformed(format!("'{metadata}' has no version segment")))?;

    BuildIdentity::new(Project::Lawnstep, NO_BRANCH, version)
        .map_err(|e| malformed(e.to_string()))
}

/// `<branch>-<version><terminator>`, e.g. `dev-1.0.0.`
fn parse_lawnchair(metadata: &str) -> Result<BuildIdentity, ResolveError> {
    let mut segments = metadata.split('-');
    let branch = segments.next().unwrap_or_default();
    let raw_version = segments
        .next()
        .ok_or_else(|| malformed(format!("'{metadata}' has no version segment")))?;

    let mut chars = raw_version.chars();
    chars.next_back();
    let version = chars.as_str();

    BuildIdentity::new(Project::Lawnchair, branch, version)
        .map_err(|e| malformed(e.to_string()))
}

fn malformed(reason: impl Into<String>) -> ResolveError {
    ResolveError::MalformedChangelog(reason.into())
}
