//! Registry of supported artifact file names.
//!
//! Each rule pairs a shell-style glob with the project whose naming
//! convention applies. Rules are checked in registration order and the
//! first match wins.

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::Serialize;

use crate::error::ResolveError;
use crate::identity::{is_path_component, BuildIdentity, Project, NO_BRANCH};

/// One supported artifact naming pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SupportedFileRule {
    /// Shell-style glob matched against the full file name.
    pub pattern: &'static str,
    /// MIME type the channel is expected to report for this file.
    pub mime_type: &'static str,
    /// Project whose naming convention and folder apply.
    pub project: Project,
}

/// Built-in rules, in match order.
pub const DEFAULT_RULES: &[SupportedFileRule] = &[
    SupportedFileRule {
        pattern: "Lawnchair-*.apk",
        mime_type: "application/vnd.android.package-archive",
        project: Project::Lawnchair,
    },
    SupportedFileRule {
        pattern: "Lawnstep-*.zip",
        mime_type: "application/zip",
        project: Project::Lawnstep,
    },
];

/// A file name that matched a rule and resolved to an identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMatch {
    /// Registration index of the winning rule.
    pub rule_index: usize,
    pub rule: SupportedFileRule,
    pub identity: BuildIdentity,
}

/// Compiled, immutable rule registry.
#[derive(Debug, Clone)]
pub struct Registry {
    rules: Vec<SupportedFileRule>,
    glob_set: GlobSet,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(DEFAULT_RULES.to_vec()).expect("built-in file patterns compile")
    }
}

impl Registry {
    /// Compile a registry from rules, keeping their order.
    pub fn new(rules: Vec<SupportedFileRule>) -> Result<Self, globset::Error> {
        let mut builder = GlobSetBuilder::new();
        for rule in &rules {
            builder.add(Glob::new(rule.pattern)?);
        }

        Ok(Self {
            rules,
            glob_set: builder.build()?,
        })
    }

    /// Registered rules in match order.
    pub fn rules(&self) -> &[SupportedFileRule] {
        &self.rules
    }

    /// Find the first rule (by registration order) matching `file_name`.
    pub fn match_rule(&self, file_name: &str) -> Option<(usize, &SupportedFileRule)> {
        self.glob_set
            .matches(file_name)
            .into_iter()
            .min()
            .map(|index| (index, &self.rules[index]))
    }

    /// Resolve a posted file name to its identity.
    pub fn resolve_from_filename(&self, file_name: &str) -> Result<BuildIdentity, ResolveError> {
        self.resolve(file_name).map(|m| m.identity)
    }

    /// Resolve a posted file name, keeping the matched rule.
    pub fn resolve(&self, file_name: &str) -> Result<FileMatch, ResolveError> {
        let (rule_index, rule) = self
            .match_rule(file_name)
            .ok_or_else(|| ResolveError::NotSupported(file_name.to_string()))?;
        let rule = *rule;

        let malformed = |reason: String| ResolveError::MalformedFileName {
            file_name: file_name.to_string(),
            pattern: rule.pattern.to_string(),
            reason,
        };

        // The name becomes a path component of the version directory.
        if !is_path_component(file_name) {
            return Err(malformed("it is not a plain file name".to_string()));
        }

        let naming = rule.project.naming();
        let remainder = file_name
            .strip_prefix(naming.prefix)
            .and_then(|rest| rest.strip_suffix(naming.suffix))
            .ok_or_else(|| {
                malformed(format!(
                    "it lacks the '{}' prefix or '{}' suffix",
                    naming.prefix, naming.suffix
                ))
            })?;

        let (branch, version) = match remainder.rsplit_once(naming.delimiter) {
            Some((branch, version)) => (branch, version),
            None => (NO_BRANCH, remainder),
        };

        let identity = BuildIdentity::new(rule.project, branch, version)
            .map_err(|e| malformed(e.to_string()))?;

        Ok(FileMatch {
            rule_index,
            rule,
            identity,
        })
    }
}
