//! Human- and machine-readable account of how an input resolved.

use serde::Serialize;

use crate::changelog::resolve_from_changelog;
use crate::identity::BuildIdentity;
use crate::registry::Registry;

/// What kind of input was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    FileName,
    Changelog,
}

/// Outcome of resolving one input, suitable for printing.
#[derive(Debug, Clone, Serialize)]
pub struct Resolution {
    pub kind: InputKind,
    pub input: String,
    /// Glob of the rule that matched (file names only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<BuildIdentity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection: Option<String>,
}

impl Resolution {
    /// Resolve a file name against `registry`.
    pub fn for_file_name(registry: &Registry, file_name: &str) -> Self {
        let rule = registry.match_rule(file_name).map(|(_, rule)| *rule);
        let result = registry.resolve_from_filename(file_name);

        Self {
            kind: InputKind::FileName,
            input: file_name.to_string(),
            matched_pattern: rule.map(|r| r.pattern.to_string()),
            expected_mime_type: rule.map(|r| r.mime_type.to_string()),
            identity: result.as_ref().ok().cloned(),
            rejection: result.err().map(|e| e.to_string()),
        }
    }

    /// Resolve a changelog message.
    pub fn for_changelog(text: &str) -> Self {
        let result = resolve_from_changelog(text);

        Self {
            kind: InputKind::Changelog,
            input: text.lines().next().unwrap_or_default().to_string(),
            matched_pattern: None,
            expected_mime_type: None,
            identity: result.as_ref().ok().cloned(),
            rejection: result.err().map(|e| e.to_string()),
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.identity.is_some()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn to_human(&self) -> String {
        let mut out = String::new();
        let label = match self.kind {
            InputKind::FileName => "File name",
            InputKind::Changelog => "Changelog",
        };
        out.push_str(&format!("{}: {}\n", label, self.input));

        if let Some(ref pattern) = self.matched_pattern {
            out.push_str(&format!("  Rule: {}\n", pattern));
        }
        if let Some(ref mime) = self.expected_mime_type {
            out.push_str(&format!("  Expected MIME type: {}\n", mime));
        }

        match (&self.identity, &self.rejection) {
            (Some(id), _) => {
                out.push_str(&format!("  Project: {}\n", id.project));
                out.push_str(&format!("  Branch: {}\n", id.branch));
                out.push_str(&format!("  Version: {}\n", id.version));
            }
            (None, Some(reason)) => {
                out.push_str(&format!("  Rejected: {}\n", reason));
            }
            (None, None) => {}
        }

        out
    }
}
