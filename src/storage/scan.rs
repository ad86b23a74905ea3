//! Summary of what the download tree currently holds.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use lcdl_resolver::Project;
use serde::Serialize;
use walkdir::WalkDir;

use super::{LayoutError, StorageRoot, LATEST_DIR};

/// One pointer in a project's `latest/` directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LatestLink {
    pub name: String,
    pub target: PathBuf,
    /// The link exists but its target does not.
    pub dangling: bool,
}

/// Stored versions and latest pointers for one project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectSummary {
    pub project: Project,
    /// Version directories, sorted by name.
    pub versions: Vec<String>,
    pub latest: Vec<LatestLink>,
}

impl ProjectSummary {
    fn new(project: Project) -> Self {
        Self {
            project,
            versions: Vec::new(),
            latest: Vec::new(),
        }
    }
}

/// Walk the tree and summarise each known project.
///
/// Directories under the root that are not project folders are skipped. A
/// missing root yields an empty summary.
pub fn scan(storage: &StorageRoot) -> Result<Vec<ProjectSummary>, LayoutError> {
    let root = storage.path();
    if !root.exists() {
        return Ok(Vec::new());
    }

    let mut summaries: BTreeMap<Project, ProjectSummary> = BTreeMap::new();

    let walker = WalkDir::new(root)
        .min_depth(1)
        .max_depth(3)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            e.depth() != 1
                || e.file_name()
                    .to_str()
                    .and_then(Project::from_folder_name)
                    .is_some()
        });

    for entry in walker {
        let entry = entry?;
        let rel = match entry.path().strip_prefix(root) {
            Ok(rel) => rel,
            Err(_) => continue,
        };
        let parts: Vec<String> = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();

        let Some(project) = parts.first().and_then(|p| Project::from_folder_name(p)) else {
            continue;
        };
        let summary = summaries
            .entry(project)
            .or_insert_with(|| ProjectSummary::new(project));

        match parts.as_slice() {
            [_, dir] if dir != LATEST_DIR && entry.file_type().is_dir() => {
                summary.versions.push(dir.clone());
            }
            [_, dir, name] if dir == LATEST_DIR && entry.path_is_symlink() => {
                let target = fs::read_link(entry.path()).map_err(|source| LayoutError::ReadLink {
                    path: entry.path().to_path_buf(),
                    source,
                })?;
                summary.latest.push(LatestLink {
                    name: name.clone(),
                    target,
                    dangling: !entry.path().exists(),
                });
            }
            _ => {}
        }
    }

    Ok(summaries.into_values().collect())
}
