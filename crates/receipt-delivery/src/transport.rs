//! Remote-channel seam.

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;
use tracing::debug;

/// Opaque transport failure. The outbox only records the text; retry
/// policy does not depend on the failure kind.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct TransportError(pub String);

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// One-way upload channel for receipt artifacts.
///
/// Implementations are expected to be cheap to call repeatedly with the
/// same artifact; redelivery of an already-received file must be harmless
/// on the remote side.
pub trait ReceiptTransport: Send + Sync {
    fn upload(&self, local_path: &Path, remote_name: &str) -> Result<(), TransportError>;
}

/// Transport that copies artifacts into a local drop directory. Used by
/// the daemon when the remote side mounts a shared directory, and by dev
/// setups.
pub struct LocalDirTransport {
    drop_dir: PathBuf,
}

impl LocalDirTransport {
    pub fn new(drop_dir: impl Into<PathBuf>) -> Self {
        Self {
            drop_dir: drop_dir.into(),
        }
    }
}

impl ReceiptTransport for LocalDirTransport {
    fn upload(&self, local_path: &Path, remote_name: &str) -> Result<(), TransportError> {
        fs::create_dir_all(&self.drop_dir)
            .map_err(|e| TransportError::new(format!("create drop dir: {e}")))?;
        let target = self.drop_dir.join(remote_name);
        fs::copy(local_path, &target)
            .map_err(|e| TransportError::new(format!("copy to drop dir: {e}")))?;
        debug!(remote_name, target = %target.display(), "Uploaded receipt to drop directory");
        Ok(())
    }
}

/// Test transport with scripted outcomes and a recorded upload log.
pub struct ScriptedTransport {
    outcomes: Mutex<VecDeque<Result<(), TransportError>>>,
    uploads: Mutex<Vec<(PathBuf, String)>>,
}

impl ScriptedTransport {
    /// With an empty script every upload succeeds.
    pub fn new() -> Self {
        Self {
            outcomes: Mutex::new(VecDeque::new()),
            uploads: Mutex::new(Vec::new()),
        }
    }

    pub fn push_ok(&self) {
        self.outcomes.lock().expect("lock poisoned").push_back(Ok(()));
    }

    pub fn push_err(&self, message: &str) {
        self.outcomes
            .lock()
            .expect("lock poisoned")
            .push_back(Err(TransportError::new(message)));
    }

    /// Every upload seen so far, as (local path, remote name).
    pub fn uploads(&self) -> Vec<(PathBuf, String)> {
        self.uploads.lock().expect("lock poisoned").clone()
    }
}

impl Default for ScriptedTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl ReceiptTransport for ScriptedTransport {
    fn upload(&self, local_path: &Path, remote_name: &str) -> Result<(), TransportError> {
        self.uploads
            .lock()
            .expect("lock poisoned")
            .push((local_path.to_path_buf(), remote_name.to_string()));
        self.outcomes
            .lock()
            .expect("lock poisoned")
            .pop_front()
            .unwrap_or(Ok(()))
    }
}
