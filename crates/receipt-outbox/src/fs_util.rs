//! Filesystem primitives for the outbox.

use crate::OutboxResult;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::time::UNIX_EPOCH;
use tracing::{error, warn};

/// Write `content` to `path` atomically: same-directory temp file, sync,
/// rename. Failures before the rename propagate — the existing file, if
/// any, is left intact. Only a failed rename (a filesystem without atomic
/// rename) falls back to a direct write.
pub fn atomic_write(path: &Path, content: &str) -> OutboxResult<()> {
    let dir = match path.parent() {
        Some(dir) => dir,
        None => return Ok(fs::write(path, content)?),
    };
    let file_name = path.file_name().and_then(|name| name.to_str()).unwrap_or("out");

    let tmp_name = format!(
        ".{}.tmp.{}",
        file_name,
        std::time::SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
    );
    let tmp_path = dir.join(tmp_name);

    let write_result = (|| -> Result<(), io::Error> {
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&tmp_path)?;
        file.write_all(content.as_bytes())?;
        file.sync_all()?;
        Ok(())
    })();

    if let Err(err) = write_result {
        let _ = fs::remove_file(&tmp_path);
        return Err(err.into());
    }

    if let Err(err) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        warn!(
            path = %path.display(),
            error = %err,
            "Atomic rename failed, falling back to direct write"
        );
        fs::write(path, content)?;
        return Ok(());
    }

    if let Ok(parent_dir) = fs::File::open(dir) {
        let _ = parent_dir.sync_all();
    }

    Ok(())
}

/// Move `from` to `to` if the source exists. A missing source is logged and
/// reported as `false`, not an error; pair moves must tolerate a half-moved
/// pair left by an earlier crash.
pub fn move_if_exists(from: &Path, to: &Path) -> OutboxResult<bool> {
    if !from.exists() {
        error!(
            from = %from.display(),
            to = %to.display(),
            "Move source missing, skipping"
        );
        return Ok(false);
    }
    fs::rename(from, to)?;
    Ok(true)
}
