//! Changelog ingestion.

use std::fs;

use lcdl_resolver::resolve_from_changelog;
use tracing::{error, info};

use super::{Changelog, ChangelogOutcome, IngestError, Rejection, StoredChangelog};
use crate::storage::{relink, StorageRoot, CHANGELOG_FILE};

/// Stores changelog posts next to the build they describe.
///
/// No attempt is made to pair a changelog with its artifact; both just
/// share the version directory.
#[derive(Debug, Clone)]
pub struct ChangelogIngestor {
    storage: StorageRoot,
}

impl ChangelogIngestor {
    pub fn new(storage: StorageRoot) -> Self {
        Self { storage }
    }

    /// Ingest one changelog. Every failure becomes [`ChangelogOutcome::Rejected`].
    pub fn ingest(&self, changelog: &Changelog) -> ChangelogOutcome {
        let identity = match resolve_from_changelog(&changelog.text) {
            Ok(identity) => identity,
            Err(e) => {
                error!(error = %e, "cannot parse changelog metadata");
                return ChangelogOutcome::Rejected(Rejection::Unresolved(e));
            }
        };

        info!(
            project = %identity.project,
            branch = %identity.branch,
            version = %identity.version,
            posted_at = %changelog.posted_at,
            "saving changelog"
        );

        let layout = match self.storage.ensure_layout(&identity) {
            Ok(layout) => layout,
            Err(e) => return self.fail(IngestError::Directory(e)),
        };

        let changelog_path = layout.changelog_path();
        if let Err(source) = fs::write(&changelog_path, &changelog.text) {
            return self.fail(IngestError::Write {
                path: changelog_path,
                source,
            });
        }

        let latest_link = layout.latest_changelog_link();
        if let Err(e) = relink(&layout.link_target(CHANGELOG_FILE), &latest_link) {
            return self.fail(IngestError::Symlink(e));
        }

        info!(path = %changelog_path.display(), "changelog saved");
        ChangelogOutcome::Ingested(StoredChangelog {
            identity,
            changelog_path,
            latest_link,
        })
    }

    fn fail(&self, e: IngestError) -> ChangelogOutcome {
        error!(failure = %e.kind(), error = %e, "changelog ingestion failed");
        ChangelogOutcome::Rejected(Rejection::Failed(e))
    }
}
