//! Advisory per-year enrichment lock.
//!
//! Enrichment is the only stage where two concurrent invocations could
//! interleave writes, so it takes an exclusive-create lock file recording
//! `{pid, acquiredAt}`. A lock whose owner is gone, or which is older than
//! [`STALE_AFTER`], is treated as a leftover from a killed run and removed.
//! Live contention is a hard error; the operator re-runs later.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// Locks older than this are presumed dead regardless of their pid.
pub const STALE_AFTER: Duration = Duration::from_secs(2 * 60 * 60);

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LockInfo {
    pid: u32,
    acquired_at: DateTime<Utc>,
}

/// Held lock; the file is removed on drop.
#[derive(Debug)]
pub struct YearLock {
    path: PathBuf,
}

impl YearLock {
    /// Acquire the lock at `path`, clearing a stale one if present.
    pub fn acquire(path: &Path) -> Result<YearLock> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        match try_create(path) {
            Ok(()) => Ok(YearLock {
                path: path.to_path_buf(),
            }),
            Err(PipelineError::Io(e)) if e.kind() == ErrorKind::AlreadyExists => {
                let holder = read_info(path);
                if is_stale(holder.as_ref()) {
                    warn!("removing stale lock at {}", path.display());
                    fs::remove_file(path)?;
                    try_create(path)?;
                    return Ok(YearLock {
                        path: path.to_path_buf(),
                    });
                }
                Err(PipelineError::LockHeld {
                    pid: holder.map(|i| i.pid).unwrap_or(0),
                })
            }
            Err(e) => Err(e),
        }
    }
}

impl Drop for YearLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!("failed to remove lock {}: {e}", self.path.display());
        }
    }
}

fn try_create(path: &Path) -> Result<()> {
    let info = LockInfo {
        pid: std::process::id(),
        acquired_at: Utc::now(),
    };
    let file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)?;
    serde_json::to_writer(file, &info)?;
    Ok(())
}

fn read_info(path: &Path) -> Option<LockInfo> {
    let bytes = fs::read(path).ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// An unreadable lock file counts as stale; so does a dead owner or an
/// ancient timestamp.
fn is_stale(info: Option<&LockInfo>) -> bool {
    let Some(info) = info else {
        return true;
    };
    if !process_alive(info.pid) {
        return true;
    }
    let age = Utc::now().signed_duration_since(info.acquired_at);
    match age.to_std() {
        Ok(age) => age > STALE_AFTER,
        // Timestamp in the future: clock skew, treat as fresh.
        Err(_) => false,
    }
}

#[cfg(target_os = "linux")]
fn process_alive(pid: u32) -> bool {
    Path::new(&format!("/proc/{pid}")).exists()
}

/// Without a portable liveness check, assume the owner is alive and let the
/// age window decide.
#[cfg(not(target_os = "linux"))]
fn process_alive(_pid: u32) -> bool {
    true
}
