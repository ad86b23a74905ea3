//! Event dispatch
//!
//! Routes channel events to the matching ingestor after checking the chat
//! allow-list. Events from other chats are dropped before any filesystem
//! access.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::{debug, info_span, warn};
use uuid::Uuid;

use lcdl_resolver::Registry;

use crate::config::Config;
use crate::ingest::{
    Artifact, ArtifactIngestor, Changelog, ChangelogIngestor, ChangelogOutcome, IngestOutcome,
    RemoteFiles,
};
use crate::storage::StorageRoot;

/// Text posts must start with this token to be treated as changelogs.
pub const CHANGELOG_PREFIX: &str = "Changelog";

/// A document was posted to a chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentPosted {
    pub chat_id: i64,
    pub posted_at: DateTime<Utc>,
    pub file_name: String,
    pub mime_type: Option<String>,
    pub size_bytes: u64,
    pub remote_file_id: String,
}

/// A text message was posted to a chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextPosted {
    pub chat_id: i64,
    pub posted_at: DateTime<Utc>,
    pub text: String,
}

/// Inbound channel event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    DocumentPosted(DocumentPosted),
    TextPosted(TextPosted),
}

impl Event {
    pub fn chat_id(&self) -> i64 {
        match self {
            Event::DocumentPosted(doc) => doc.chat_id,
            Event::TextPosted(text) => text.chat_id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Chat is not on the allow-list.
    ChatNotAllowed(i64),
    /// Text post that is not a changelog.
    NotAChangelog,
}

/// What happened to one event.
#[derive(Debug)]
pub enum DispatchOutcome {
    Ignored(IgnoreReason),
    Artifact(IngestOutcome),
    Changelog(ChangelogOutcome),
}

/// Routes events to the ingestors.
pub struct Dispatcher<R> {
    allowed_chats: HashSet<i64>,
    artifacts: ArtifactIngestor<R>,
    changelogs: ChangelogIngestor,
}

impl<R: RemoteFiles> Dispatcher<R> {
    pub fn new(
        allowed_chats: HashSet<i64>,
        artifacts: ArtifactIngestor<R>,
        changelogs: ChangelogIngestor,
    ) -> Self {
        Self {
            allowed_chats,
            artifacts,
            changelogs,
        }
    }

    /// Wire up both ingestors against the configured download root.
    pub fn from_config(config: &Config, remote: R) -> Self {
        let storage = StorageRoot::new(&config.storage.download_dir);
        Self::new(
            config.allowed_chats(),
            ArtifactIngestor::new(Registry::default(), storage.clone(), remote),
            ChangelogIngestor::new(storage),
        )
    }

    pub fn artifacts(&self) -> &ArtifactIngestor<R> {
        &self.artifacts
    }

    pub fn is_allowed(&self, chat_id: i64) -> bool {
        self.allowed_chats.contains(&chat_id)
    }

    /// Handle one event to completion.
    pub fn dispatch(&self, event: &Event) -> DispatchOutcome {
        let event_id = Uuid::new_v4();
        let span = info_span!("event", %event_id, chat_id = event.chat_id());
        let _guard = span.enter();

        if !self.is_allowed(event.chat_id()) {
            warn!("ignoring post from chat not on the allow-list");
            return DispatchOutcome::Ignored(IgnoreReason::ChatNotAllowed(event.chat_id()));
        }

        match event {
            Event::DocumentPosted(doc) => {
                let artifact = Artifact {
                    file_name: doc.file_name.clone(),
                    mime_type: doc.mime_type.clone(),
                    size_bytes: doc.size_bytes,
                    remote_file_id: doc.remote_file_id.clone(),
                    posted_at: doc.posted_at,
                };
                DispatchOutcome::Artifact(self.artifacts.ingest(&artifact))
            }
            Event::TextPosted(text) => {
                if !text.text.starts_with(CHANGELOG_PREFIX) {
                    debug!("text post is not a changelog");
                    return DispatchOutcome::Ignored(IgnoreReason::NotAChangelog);
                }
                let changelog = Changelog {
                    text: text.text.clone(),
                    posted_at: text.posted_at,
                };
                DispatchOutcome::Changelog(self.changelogs.ingest(&changelog))
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::ingest::MockRemote;
    use tempfile::TempDir;

    const CHAT: i64 = -1001180711841;

    fn dispatcher(dir: &TempDir) -> Dispatcher<MockRemote> {
        let storage = StorageRoot::new(dir.path());
        let remote = MockRemote::new().with_file("f1", b"bytes".to_vec());
        Dispatcher::new(
            HashSet::from([CHAT]),
            ArtifactIngestor::new(Registry::default(), storage.clone(), remote),
            ChangelogIngestor::new(storage),
        )
    }

    fn text(chat_id: i64, text: &str) -> Event {
        Event::TextPosted(TextPosted {
            chat_id,
            posted_at: Utc::now(),
            text: text.to_string(),
        })
    }

    #[test]
    fn test_non_changelog_text_ignored() {
        let dir = TempDir::new().unwrap();
        let dispatcher = dispatcher(&dir);

        let outcome = dispatcher.dispatch(&text(CHAT, "New build is out! dev-1.0.0."));

        assert!(matches!(
            outcome,
            DispatchOutcome::Ignored(IgnoreReason::NotAChangelog)
        ));
    }

    #[test]
    fn test_changelog_prefix_is_case_sensitive() {
        let dir = TempDir::new().unwrap();
        let dispatcher = dispatcher(&dir);

        let outcome = dispatcher.dispatch(&text(CHAT, "changelog dev-1.0.0."));

        assert!(matches!(
            outcome,
            DispatchOutcome::Ignored(IgnoreReason::NotAChangelog)
        ));
    }

    #[test]
    fn test_changelog_routed() {
        let dir = TempDir::new().unwrap();
        let dispatcher = dispatcher(&dir);

        let outcome = dispatcher.dispatch(&text(CHAT, "Changelog dev-1.0.0."));

        assert!(matches!(outcome, DispatchOutcome::Changelog(ref o) if o.is_ingested()));
    }

    #[test]
    fn test_unknown_chat_ignored() {
        let dir = TempDir::new().unwrap();
        let dispatcher = dispatcher(&dir);

        let outcome = dispatcher.dispatch(&text(42, "Changelog dev-1.0.0."));

        assert!(matches!(
            outcome,
            DispatchOutcome::Ignored(IgnoreReason::ChatNotAllowed(42))
        ));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
