//! Applying edit blocks to documents owned by the host.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{accept_preview, apply_edits, EditBlock, EditStyle};
use crate::error::{KhojError, Result};

/// Outcome for one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchStatus {
    Applied { edits: usize },
    Unchanged,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchReport {
    pub path: PathBuf,
    pub status: PatchStatus,
}

impl PatchReport {
    pub fn is_applied(&self) -> bool {
        matches!(self.status, PatchStatus::Applied { .. })
    }
}

/// Receives the edit blocks of a finalized turn.
#[async_trait]
pub trait FilePatcher: Send + Sync {
    async fn apply(&self, blocks: &[EditBlock]) -> Vec<PatchReport>;
}

/// Patches files on disk. The original content of every modified file is
/// kept until [`FsPatcher::accept`] or [`FsPatcher::revert`].
pub struct FsPatcher {
    files: Vec<PathBuf>,
    style: EditStyle,
    backups: Mutex<HashMap<PathBuf, String>>,
}

impl FsPatcher {
    pub fn new(files: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        Self {
            files: files.into_iter().map(Into::into).collect(),
            style: EditStyle::Direct,
            backups: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_style(mut self, style: EditStyle) -> Self {
        self.style = style;
        self
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn style(&self) -> EditStyle {
        self.style
    }

    /// Files modified since the last accept or revert.
    pub fn pending(&self) -> Vec<PathBuf> {
        let mut paths: Vec<_> = self.lock_backups().keys().cloned().collect();
        paths.sort();
        paths
    }

    async fn patch_file(&self, path: &Path, blocks: &[EditBlock]) -> Result<PatchStatus> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| edit_error(path, e))?;

        let title = note_title(path);
        let relevant: Vec<EditBlock> = blocks
            .iter()
            .filter(|block| block.targets(&title) || block_names_file(block, path))
            .cloned()
            .collect();
        if relevant.is_empty() {
            return Ok(PatchStatus::Unchanged);
        }

        let outcome = apply_edits(&content, &relevant, self.style);
        if !outcome.changed() {
            debug!(path = %path.display(), "No edit blocks matched");
            return Ok(PatchStatus::Unchanged);
        }

        tokio::fs::write(path, &outcome.content)
            .await
            .map_err(|e| edit_error(path, e))?;
        self.lock_backups()
            .entry(path.to_path_buf())
            .or_insert(content);

        Ok(PatchStatus::Applied {
            edits: outcome.applied,
        })
    }

    /// Restore every modified file to its content before the first patch.
    ///
    /// Each file is handled on its own. A file that cannot be restored keeps
    /// its backup, stays in [`FsPatcher::pending`] and is named in the
    /// returned error.
    pub async fn revert(&self) -> Result<usize> {
        let mut restored = 0;
        let mut failures = Vec::new();
        for (path, original) in self.snapshot() {
            match tokio::fs::write(&path, original).await {
                Ok(()) => {
                    self.lock_backups().remove(&path);
                    restored += 1;
                }
                Err(e) => failures.push(edit_error(&path, e)),
            }
        }
        settle("restore", restored, failures)
    }

    /// Keep the changes. Previews are resolved to their final text.
    ///
    /// Failures are handled as in [`FsPatcher::revert`]: the file keeps its
    /// backup so it can still be restored.
    pub async fn accept(&self) -> Result<usize> {
        let mut accepted = 0;
        let mut failures = Vec::new();
        for (path, _) in self.snapshot() {
            if self.style == EditStyle::Preview {
                if let Err(e) = resolve_preview(&path).await {
                    failures.push(e);
                    continue;
                }
            }
            self.lock_backups().remove(&path);
            accepted += 1;
        }
        settle("accept", accepted, failures)
    }

    fn snapshot(&self) -> Vec<(PathBuf, String)> {
        let mut entries: Vec<_> = self
            .lock_backups()
            .iter()
            .map(|(path, original)| (path.clone(), original.clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    fn lock_backups(&self) -> std::sync::MutexGuard<'_, HashMap<PathBuf, String>> {
        self.backups.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl FilePatcher for FsPatcher {
    async fn apply(&self, blocks: &[EditBlock]) -> Vec<PatchReport> {
        let mut reports = Vec::with_capacity(self.files.len());
        for path in &self.files {
            let status = match self.patch_file(path, blocks).await {
                Ok(status) => status,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to apply edits");
                    PatchStatus::Failed(e.to_string())
                }
            };
            reports.push(PatchReport {
                path: path.clone(),
                status,
            });
        }
        reports
    }
}

fn note_title(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn block_names_file(block: &EditBlock, path: &Path) -> bool {
    match (block.target.as_deref(), path.file_name()) {
        (Some(target), Some(name)) => target.trim() == name.to_string_lossy(),
        _ => false,
    }
}

async fn resolve_preview(path: &Path) -> Result<()> {
    let current = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| edit_error(path, e))?;
    tokio::fs::write(path, accept_preview(&current))
        .await
        .map_err(|e| edit_error(path, e))
}

/// `Ok(done)` when every file went through, otherwise one error naming
/// each file that did not.
fn settle(action: &str, done: usize, failures: Vec<KhojError>) -> Result<usize> {
    if failures.is_empty() {
        return Ok(done);
    }
    for err in &failures {
        warn!(action, error = %err, "File left pending");
    }
    let paths: Vec<String> = failures
        .iter()
        .filter_map(|err| match err {
            KhojError::EditApply { path, .. } => Some(path.clone()),
            _ => None,
        })
        .collect();
    Err(KhojError::EditApply {
        path: paths.join(", "),
        message: format!(
            "could not {action} {} of {} file(s); their backups are kept",
            failures.len(),
            done + failures.len()
        ),
    })
}

fn edit_error(path: &Path, err: std::io::Error) -> KhojError {
    KhojError::EditApply {
        path: path.display().to_string(),
        message: err.to_string(),
    }
}
