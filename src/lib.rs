//! lcdl - Lawnchair build downloader
//!
//! Watches a Telegram channel for posted builds and changelogs, stores each
//! build under `<root>/<project>/<version>/` with an MD5 sidecar, and keeps
//! `<root>/<project>/latest/` pointing at the most recent one.

pub mod config;
pub mod dispatch;
pub mod ingest;
pub mod listener;
pub mod logging;
pub mod storage;

pub use config::{Config, ConfigError};
pub use dispatch::{DispatchOutcome, Dispatcher, DocumentPosted, Event, IgnoreReason, TextPosted};
pub use ingest::{
    Artifact, ArtifactIngestor, Changelog, ChangelogIngestor, ChangelogOutcome, FailureKind,
    IngestError, IngestOutcome, LocalFiles, MockRemote, Rejection, RemoteError, RemoteFiles,
    StoredArtifact, StoredChangelog,
};
pub use lcdl_resolver::{BuildIdentity, Project, Registry, ResolveError};
pub use listener::{event_from_update, Listener, PollSettings, UpdateSource};
pub use storage::{relink, relink_all, LayoutError, StorageLayout, StorageRoot};
