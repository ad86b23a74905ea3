//! Artifact ingestion: resolve, download, checksum, relink.

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use lcdl_resolver::{FileMatch, Registry};
use tracing::{error, info, warn};

use super::checksum;
use super::remote::{RemoteError, RemoteFiles};
use super::{Artifact, IngestError, IngestOutcome, Rejection, StoredArtifact};
use crate::storage::{relink_all, StorageLayout, StorageRoot, CHECKSUM_FILE};

const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Stores posted artifacts into the download tree.
pub struct ArtifactIngestor<R> {
    registry: Registry,
    storage: StorageRoot,
    remote: R,
}

impl<R: RemoteFiles> ArtifactIngestor<R> {
    pub fn new(registry: Registry, storage: StorageRoot, remote: R) -> Self {
        Self {
            registry,
            storage,
            remote,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn storage(&self) -> &StorageRoot {
        &self.storage
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    /// Ingest one artifact. Never panics and never returns an error.
    pub fn ingest(&self, artifact: &Artifact) -> IngestOutcome {
        let file_match = match self.registry.resolve(&artifact.file_name) {
            Ok(m) => m,
            Err(e) if e.is_not_supported() => {
                info!(file_name = %artifact.file_name, "ignoring unsupported file");
                return IngestOutcome::Rejected(Rejection::Unresolved(e));
            }
            Err(e) => {
                error!(file_name = %artifact.file_name, error = %e, "cannot resolve build identity");
                return IngestOutcome::Rejected(Rejection::Unresolved(e));
            }
        };

        self.check_mime_type(artifact, &file_match);

        info!(
            file_name = %artifact.file_name,
            project = %file_match.identity.project,
            branch = %file_match.identity.branch,
            version = %file_match.identity.version,
            size_bytes = artifact.size_bytes,
            posted_at = %artifact.posted_at,
            "ingesting new build"
        );

        match self.store(artifact, &file_match) {
            Ok(stored) => {
                info!(
                    path = %stored.artifact_path.display(),
                    md5 = %stored.md5,
                    bytes = stored.bytes,
                    "build downloaded and hashed"
                );
                IngestOutcome::Ingested(stored)
            }
            Err(e) => {
                error!(
                    file_name = %artifact.file_name,
                    failure = %e.kind(),
                    error = %e,
                    "build ingestion failed"
                );
                IngestOutcome::PartialFailure(e)
            }
        }
    }

    fn check_mime_type(&self, artifact: &Artifact, file_match: &FileMatch) {
        if let Some(ref posted) = artifact.mime_type {
            if posted != file_match.rule.mime_type {
                warn!(
                    file_name = %artifact.file_name,
                    posted = %posted,
                    expected = %file_match.rule.mime_type,
                    "unexpected MIME type; going by file name"
                );
            }
        }
    }

    fn store(
        &self,
        artifact: &Artifact,
        file_match: &FileMatch,
    ) -> Result<StoredArtifact, IngestError> {
        let layout = self
            .storage
            .ensure_layout(&file_match.identity)
            .map_err(IngestError::Directory)?;

        let artifact_path = layout.artifact_path(&artifact.file_name);
        let bytes = self.download(artifact, &artifact_path)?;

        let md5 = checksum::md5_file(&artifact_path).map_err(|source| IngestError::Checksum {
            path: artifact_path.clone(),
            source,
        })?;
        let checksum_path = layout.checksum_path();
        checksum::write_sidecar(&checksum_path, &md5).map_err(|source| IngestError::Checksum {
            path: checksum_path.clone(),
            source,
        })?;

        let latest_link = self.update_latest(&layout, &artifact.file_name)?;

        Ok(StoredArtifact {
            identity: file_match.identity.clone(),
            artifact_path,
            checksum_path,
            latest_link,
            md5,
            bytes,
        })
    }

    /// Stream the remote bytes into `path`, truncating any previous copy.
    fn download(&self, artifact: &Artifact, path: &Path) -> Result<u64, IngestError> {
        let fetch_error = |source: RemoteError| IngestError::Fetch {
            file_name: artifact.file_name.clone(),
            source,
        };
        let write_error = |source| IngestError::Write {
            path: path.to_path_buf(),
            source,
        };

        let remote_path = self.remote.locate(&artifact.remote_file_id).map_err(fetch_error)?;
        let mut reader = self.remote.open(&remote_path).map_err(fetch_error)?;
        let mut file = File::create(path).map_err(write_error)?;

        let mut buffer = vec![0u8; COPY_BUFFER_SIZE];
        let mut total = 0u64;
        loop {
            let n = match reader.read(&mut buffer) {
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(fetch_error(RemoteError::Io(e))),
            };
            if n == 0 {
                break;
            }
            file.write_all(&buffer[..n]).map_err(write_error)?;
            total += n as u64;
        }
        file.flush().map_err(write_error)?;

        if artifact.size_bytes > 0 && total != artifact.size_bytes {
            return Err(IngestError::SizeMismatch {
                path: path.to_path_buf(),
                expected: artifact.size_bytes,
                actual: total,
            });
        }

        Ok(total)
    }

    fn update_latest(&self, layout: &StorageLayout, file_name: &str) -> Result<PathBuf, IngestError> {
        let latest_link = layout.latest_artifact_link(file_name);
        relink_all(&[
            (layout.link_target(file_name), latest_link.clone()),
            (layout.link_target(CHECKSUM_FILE), layout.latest_checksum_link()),
        ])
        .map_err(IngestError::Symlink)?;
        info!(link = %latest_link.display(), "latest pointers updated");
        Ok(latest_link)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::ingest::remote::MockRemote;
    use crate::ingest::FailureKind;
    use chrono::Utc;
    use lcdl_resolver::ResolveError;
    use std::fs;
    use tempfile::TempDir;

    fn artifact(file_name: &str, file_id: &str, size: u64) -> Artifact {
        Artifact {
            file_name: file_name.to_string(),
            mime_type: Some("application/vnd.android.package-archive".to_string()),
            size_bytes: size,
            remote_file_id: file_id.to_string(),
            posted_at: Utc::now(),
        }
    }

    fn ingestor(dir: &TempDir, remote: MockRemote) -> ArtifactIngestor<MockRemote> {
        ArtifactIngestor::new(Registry::default(), StorageRoot::new(dir.path()), remote)
    }

    #[test]
    fn test_ingest_stores_and_links() {
        let dir = TempDir::new().unwrap();
        let remote = MockRemote::new().with_file("f1", b"apk bytes".to_vec());
        let ingestor = ingestor(&dir, remote);

        let outcome = ingestor.ingest(&artifact("Lawnchair-dev_1.0.0.apk", "f1", 9));
        let stored = match outcome {
            IngestOutcome::Ingested(stored) => stored,
            other => panic!("expected ingestion, got {:?}", other),
        };

        let version_dir = dir.path().join("lawnchair/1.0.0");
        assert_eq!(stored.artifact_path, version_dir.join("Lawnchair-dev_1.0.0.apk"));
        assert_eq!(fs::read(&stored.artifact_path).unwrap(), b"apk bytes");
        assert_eq!(
            fs::read_to_string(version_dir.join("MD5SUM")).unwrap(),
            checksum::md5_bytes(b"apk bytes")
        );
        assert_eq!(
            fs::read(dir.path().join("lawnchair/latest/latest.apk")).unwrap(),
            b"apk bytes"
        );
        assert_eq!(stored.bytes, 9);
    }

    #[test]
    fn test_unsupported_file_touches_nothing() {
        let dir = TempDir::new().unwrap();
        let ingestor = ingestor(&dir, MockRemote::new().with_file("f1", b"x".to_vec()));

        let outcome = ingestor.ingest(&artifact("screenshot.png", "f1", 1));

        assert!(matches!(
            outcome,
            IngestOutcome::Rejected(Rejection::Unresolved(ResolveError::NotSupported(_)))
        ));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
        assert_eq!(ingestor.remote().open_count(), 0);
    }

    #[test]
    fn test_broken_download_leaves_latest_alone() {
        let dir = TempDir::new().unwrap();
        let remote = MockRemote::new().with_file("good", b"v1".to_vec());
        remote.insert_broken("bad", b"half".to_vec());
        let ingestor = ingestor(&dir, remote);

        assert!(ingestor
            .ingest(&artifact("Lawnchair-dev_1.0.0.apk", "good", 2))
            .is_ingested());
        let outcome = ingestor.ingest(&artifact("Lawnchair-dev_1.1.0.apk", "bad", 100));

        match outcome {
            IngestOutcome::PartialFailure(e) => assert_eq!(e.kind(), FailureKind::Transfer),
            other => panic!("expected partial failure, got {:?}", other),
        }
        let latest = dir.path().join("lawnchair/latest");
        assert_eq!(
            fs::read_link(latest.join("latest.apk")).unwrap(),
            Path::new("../1.0.0/Lawnchair-dev_1.0.0.apk")
        );
        assert!(!dir.path().join("lawnchair/1.1.0/MD5SUM").exists());
    }

    #[test]
    fn test_size_mismatch_is_transfer_failure() {
        let dir = TempDir::new().unwrap();
        let ingestor = ingestor(&dir, MockRemote::new().with_file("f1", b"short".to_vec()));

        let outcome = ingestor.ingest(&artifact("Lawnchair-dev_1.0.0.apk", "f1", 500));

        assert!(matches!(
            outcome,
            IngestOutcome::PartialFailure(IngestError::SizeMismatch { expected: 500, actual: 5, .. })
        ));
        assert!(!dir.path().join("lawnchair/latest/latest.apk").exists());
    }

    #[test]
    fn test_unknown_size_is_accepted() {
        let dir = TempDir::new().unwrap();
        let ingestor = ingestor(&dir, MockRemote::new().with_file("f1", b"zip".to_vec()));

        let outcome = ingestor.ingest(&artifact("Lawnstep-2.3.zip", "f1", 0));

        assert!(outcome.is_ingested());
        assert!(dir.path().join("lawnstep/latest/latest.zip").exists());
    }

    #[test]
    fn test_missing_remote_file() {
        let dir = TempDir::new().unwrap();
        let ingestor = ingestor(&dir, MockRemote::new());

        let outcome = ingestor.ingest(&artifact("Lawnchair-dev_1.0.0.apk", "nope", 1));

        assert!(matches!(
            outcome,
            IngestOutcome::PartialFailure(IngestError::Fetch { .. })
        ));
    }

    #[test]
    fn test_directory_failure() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("lawnchair"), b"not a directory").unwrap();
        let ingestor = ingestor(&dir, MockRemote::new().with_file("f1", b"x".to_vec()));

        let outcome = ingestor.ingest(&artifact("Lawnchair-dev_1.0.0.apk", "f1", 1));

        match outcome {
            IngestOutcome::PartialFailure(e) => assert_eq!(e.kind(), FailureKind::Directory),
            other => panic!("expected directory failure, got {:?}", other),
        }
    }

    #[test]
    fn test_blocked_checksum_link_keeps_previous_latest() {
        let dir = TempDir::new().unwrap();
        let remote = MockRemote::new()
            .with_file("v1", b"one".to_vec())
            .with_file("v2", b"two".to_vec());
        let ingestor = ingestor(&dir, remote);
        assert!(ingestor
            .ingest(&artifact("Lawnchair-dev_1.0.0.apk", "v1", 3))
            .is_ingested());

        let latest = dir.path().join("lawnchair/latest");
        fs::remove_file(latest.join("MD5SUM")).unwrap();
        fs::create_dir(latest.join("MD5SUM")).unwrap();

        let outcome = ingestor.ingest(&artifact("Lawnchair-dev_1.1.0.apk", "v2", 3));

        match outcome {
            IngestOutcome::PartialFailure(e) => assert_eq!(e.kind(), FailureKind::Symlink),
            other => panic!("expected symlink failure, got {:?}", other),
        }
        assert_eq!(
            fs::read_link(latest.join("latest.apk")).unwrap(),
            Path::new("../1.0.0/Lawnchair-dev_1.0.0.apk")
        );
        let names: Vec<_> = fs::read_dir(&latest)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 2, "unexpected entries in latest/: {:?}", names);
    }

    #[test]
    fn test_blocked_sidecar_is_checksum_failure() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("lawnchair/1.0.0/MD5SUM")).unwrap();
        let ingestor = ingestor(&dir, MockRemote::new().with_file("f1", b"apk".to_vec()));

        let outcome = ingestor.ingest(&artifact("Lawnchair-dev_1.0.0.apk", "f1", 3));

        match outcome {
            IngestOutcome::PartialFailure(e) => assert_eq!(e.kind(), FailureKind::Checksum),
            other => panic!("expected checksum failure, got {:?}", other),
        }
        assert!(fs::symlink_metadata(dir.path().join("lawnchair/latest/latest.apk")).is_err());
    }

    #[test]
    fn test_version_named_latest_is_rejected() {
        let dir = TempDir::new().unwrap();
        let remote = MockRemote::new()
            .with_file("v1", b"one".to_vec())
            .with_file("v2", b"two".to_vec());
        let ingestor = ingestor(&dir, remote);
        assert!(ingestor
            .ingest(&artifact("Lawnchair-dev_1.0.0.apk", "v1", 3))
            .is_ingested());

        let outcome = ingestor.ingest(&artifact("Lawnchair-dev_latest.apk", "v2", 3));

        assert!(matches!(
            outcome,
            IngestOutcome::Rejected(Rejection::Unresolved(ResolveError::MalformedFileName { .. }))
        ));
        assert_eq!(ingestor.remote().open_count(), 1);
        assert_eq!(
            fs::read_to_string(dir.path().join("lawnchair/1.0.0/MD5SUM")).unwrap(),
            checksum::md5_bytes(b"one")
        );
        assert!(!dir.path().join("lawnchair/latest/Lawnchair-dev_latest.apk").exists());
    }

    /// Serves one file whose stream reports `Interrupted` between chunks.
    struct InterruptingRemote;

    struct InterruptingReader {
        chunks: Vec<&'static [u8]>,
        ready: bool,
    }

    impl Read for InterruptingReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.chunks.is_empty() {
                return Ok(0);
            }
            if !self.ready {
                self.ready = true;
                return Err(io::ErrorKind::Interrupted.into());
            }
            self.ready = false;
            let chunk = self.chunks.remove(0);
            buf[..chunk.len()].copy_from_slice(chunk);
            Ok(chunk.len())
        }
    }

    impl RemoteFiles for InterruptingRemote {
        fn locate(&self, file_id: &str) -> Result<String, RemoteError> {
            Ok(file_id.to_string())
        }

        fn open(&self, _path: &str) -> Result<Box<dyn Read + '_>, RemoteError> {
            Ok(Box::new(InterruptingReader {
                chunks: vec![&b"apk "[..], &b"bytes"[..]],
                ready: false,
            }))
        }
    }

    #[test]
    fn test_interrupted_reads_are_retried() {
        let dir = TempDir::new().unwrap();
        let ingestor =
            ArtifactIngestor::new(Registry::default(), StorageRoot::new(dir.path()), InterruptingRemote);

        let outcome = ingestor.ingest(&artifact("Lawnchair-dev_1.0.0.apk", "f1", 9));

        assert!(outcome.is_ingested(), "got {:?}", outcome);
        assert_eq!(
            fs::read(dir.path().join("lawnchair/1.0.0/Lawnchair-dev_1.0.0.apk")).unwrap(),
            b"apk bytes"
        );
    }

    #[test]
    fn test_reingest_truncates_partial_file() {
        let dir = TempDir::new().unwrap();
        let remote = MockRemote::new();
        remote.insert_broken("f1", b"a much longer partial payload".to_vec());
        let ingestor = ingestor(&dir, remote);

        let name = "Lawnchair-dev_1.0.0.apk";
        assert!(!ingestor.ingest(&artifact(name, "f1", 0)).is_ingested());

        ingestor.remote().insert("f1", b"ok".to_vec());
        assert!(ingestor.ingest(&artifact(name, "f1", 2)).is_ingested());
        assert_eq!(fs::read(dir.path().join("lawnchair/1.0.0").join(name)).unwrap(), b"ok");
    }
}
