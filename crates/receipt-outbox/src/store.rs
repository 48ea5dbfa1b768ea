//! The outbox store: state directories and pair moves.

use crate::fs_util::{atomic_write, move_if_exists};
use crate::meta::{meta_file_name, ReceiptMeta, META_SUFFIX};
use crate::{OutboxError, OutboxResult};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Outbox state directory an entry lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutboxDir {
    Pending,
    Sent,
    Failed,
}

impl OutboxDir {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutboxDir::Pending => "pending",
            OutboxDir::Sent => "sent",
            OutboxDir::Failed => "failed",
        }
    }
}

impl std::fmt::Display for OutboxDir {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Disk-backed receipt outbox rooted at a single directory.
pub struct ReceiptOutbox {
    root: PathBuf,
}

impl ReceiptOutbox {
    /// Open the outbox at `root`, creating the state directories if needed.
    pub fn open(root: impl Into<PathBuf>) -> OutboxResult<Self> {
        let outbox = Self { root: root.into() };
        outbox.ensure_dirs()?;
        Ok(outbox)
    }

    /// Create any missing state directories. Idempotent.
    pub fn ensure_dirs(&self) -> OutboxResult<()> {
        for dir in [OutboxDir::Pending, OutboxDir::Sent, OutboxDir::Failed] {
            fs::create_dir_all(self.dir_path(dir))?;
        }
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of a state directory.
    pub fn dir_path(&self, dir: OutboxDir) -> PathBuf {
        self.root.join(dir.as_str())
    }

    /// Path of a receipt artifact in a state directory.
    pub fn artifact_path(&self, dir: OutboxDir, file_name: &str) -> PathBuf {
        self.dir_path(dir).join(file_name)
    }

    /// Path of a metadata sidecar in a state directory.
    pub fn meta_path(&self, dir: OutboxDir, file_name: &str) -> PathBuf {
        self.dir_path(dir).join(meta_file_name(file_name))
    }

    // ------------------------------------------------------------------
    // Metadata
    // ------------------------------------------------------------------

    /// Persist a fresh sidecar in `pending/`. Written before the artifact:
    /// once this succeeds, the receipt can always be regenerated.
    pub fn write_meta_to_pending(&self, meta: &ReceiptMeta) -> OutboxResult<()> {
        self.write_meta(OutboxDir::Pending, meta)
    }

    /// Persist the sidecar in the given state directory.
    pub fn write_meta(&self, dir: OutboxDir, meta: &ReceiptMeta) -> OutboxResult<()> {
        let json = serde_json::to_string_pretty(meta)?;
        atomic_write(&self.meta_path(dir, &meta.file_name), &json)?;
        debug!(trace_id = %meta.trace_id, file_name = %meta.file_name, dir = %dir, "Wrote metadata");
        Ok(())
    }

    /// Read the sidecar for `file_name` from a state directory.
    pub fn read_meta(&self, dir: OutboxDir, file_name: &str) -> OutboxResult<ReceiptMeta> {
        let path = self.meta_path(dir, file_name);
        if !path.exists() {
            return Err(OutboxError::EntryNotFound {
                dir: dir.as_str(),
                file_name: file_name.to_string(),
            });
        }
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Rewrite the sidecar after bookkeeping changes.
    pub fn update_meta(&self, dir: OutboxDir, meta: &ReceiptMeta) -> OutboxResult<()> {
        self.write_meta(dir, meta)
    }

    // ------------------------------------------------------------------
    // Artifacts
    // ------------------------------------------------------------------

    /// Write a receipt artifact into a state directory.
    pub fn write_receipt(&self, dir: OutboxDir, file_name: &str, content: &str) -> OutboxResult<()> {
        atomic_write(&self.artifact_path(dir, file_name), content)
    }

    /// Write a receipt artifact into `pending/`.
    pub fn write_receipt_to_pending(&self, file_name: &str, content: &str) -> OutboxResult<()> {
        self.write_receipt(OutboxDir::Pending, file_name, content)
    }

    // ------------------------------------------------------------------
    // State transitions
    // ------------------------------------------------------------------

    /// Move a pending pair to `sent/` after a confirmed delivery.
    pub fn mark_sent(&self, file_name: &str) -> OutboxResult<()> {
        self.move_pair(OutboxDir::Pending, OutboxDir::Sent, file_name)
    }

    /// Move a pending pair to `failed/` once retries are exhausted or the
    /// entry is unrecoverable without an operator.
    pub fn mark_failed(&self, file_name: &str) -> OutboxResult<()> {
        self.move_pair(OutboxDir::Pending, OutboxDir::Failed, file_name)
    }

    /// Move a pair from any state directory to `sent/` (recovery path).
    pub fn move_to_sent_from(&self, dir: OutboxDir, file_name: &str) -> OutboxResult<()> {
        self.move_pair(dir, OutboxDir::Sent, file_name)
    }

    /// Rename an entry in place, sidecar included. Refuses to clobber an
    /// existing target. The caller is responsible for updating the
    /// `file_name` field in the sidecar afterwards.
    pub fn rename_entry(&self, dir: OutboxDir, old_name: &str, new_name: &str) -> OutboxResult<()> {
        let new_artifact = self.artifact_path(dir, new_name);
        let new_meta = self.meta_path(dir, new_name);
        if new_artifact.exists() || new_meta.exists() {
            return Err(OutboxError::DuplicateTarget {
                target: new_name.to_string(),
            });
        }

        move_if_exists(&self.artifact_path(dir, old_name), &new_artifact)?;
        move_if_exists(&self.meta_path(dir, old_name), &new_meta)?;
        info!(dir = %dir, old_name, new_name, "Renamed outbox entry");
        Ok(())
    }

    /// Move the artifact and its sidecar between state directories. Each
    /// half is moved independently; a missing half (crash between two
    /// earlier moves) is logged by `move_if_exists` and skipped.
    fn move_pair(&self, from: OutboxDir, to: OutboxDir, file_name: &str) -> OutboxResult<()> {
        move_if_exists(
            &self.artifact_path(from, file_name),
            &self.artifact_path(to, file_name),
        )?;
        move_if_exists(
            &self.meta_path(from, file_name),
            &self.meta_path(to, file_name),
        )?;
        info!(file_name, from = %from, to = %to, "Moved outbox entry");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Scanning
    // ------------------------------------------------------------------

    /// All metadata sidecars in `pending/`. Unreadable or unparseable
    /// sidecars are logged and skipped so one bad entry cannot stall the
    /// sweep; a sidecar may also vanish between the directory listing and
    /// the read when a concurrent recovery moves the pair out.
    pub fn list_pending_metas(&self) -> OutboxResult<Vec<ReceiptMeta>> {
        let mut metas = Vec::new();
        for entry in fs::read_dir(self.dir_path(OutboxDir::Pending))? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            if !name.ends_with(META_SUFFIX) {
                continue;
            }
            if let Some(meta) = read_sidecar(&entry.path(), &name) {
                metas.push(meta);
            }
        }
        metas.sort_by(|a, b| a.file_name.cmp(&b.file_name));
        Ok(metas)
    }

    /// Find an entry by trace id, searching `pending/` first, then
    /// `failed/`. Entries in `sent/` are done and not searched.
    pub fn find_by_trace_id(&self, trace_id: &str) -> OutboxResult<Option<(OutboxDir, ReceiptMeta)>> {
        for dir in [OutboxDir::Pending, OutboxDir::Failed] {
            for entry in fs::read_dir(self.dir_path(dir))? {
                let entry = entry?;
                let name = entry.file_name().to_string_lossy().to_string();
                if !name.ends_with(META_SUFFIX) {
                    continue;
                }
                match read_sidecar(&entry.path(), &name) {
                    Some(meta) if meta.trace_id == trace_id => return Ok(Some((dir, meta))),
                    _ => {}
                }
            }
        }
        Ok(None)
    }
}

/// Read and parse one sidecar, logging and skipping anything that cannot
/// be read or parsed.
fn read_sidecar(path: &Path, name: &str) -> Option<ReceiptMeta> {
    let json = match fs::read_to_string(path) {
        Ok(json) => json,
        Err(err) => {
            warn!(file = %name, error = %err, "Skipping unreadable metadata sidecar");
            return None;
        }
    };
    match serde_json::from_str::<ReceiptMeta>(&json) {
        Ok(meta) => Some(meta),
        Err(err) => {
            warn!(file = %name, error = %err, "Skipping unparseable metadata sidecar");
            None
        }
    }
}
