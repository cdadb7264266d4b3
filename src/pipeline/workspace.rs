//! Per-job scratch directories
//!
//! Every pipeline claims its own `run-<pid>-*` directory under the work root
//! and creates job directories only inside it. The owning process id is
//! recorded in the run directory, so a starting pipeline removes only runs
//! whose process has exited.

use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};

use super::job::JobId;
use crate::error::SubforgeResult;

/// Prefix of every pipeline run directory under the work root
pub const RUN_PREFIX: &str = "run-";

/// Prefix of every job directory inside a run directory
pub const WORKSPACE_PREFIX: &str = "job-";

/// File inside a run directory holding the owner's process id
pub const OWNER_FILE: &str = "owner.pid";

/// Run directory owned by one pipeline, removed when dropped
#[derive(Debug)]
pub struct RunDirectory {
    dir: TempDir,
}

impl RunDirectory {
    /// Claim a fresh run directory under `root`
    pub fn claim(root: &Path) -> SubforgeResult<Self> {
        std::fs::create_dir_all(root)?;
        let pid = std::process::id();
        let dir = tempfile::Builder::new()
            .prefix(&format!("{}{}-", RUN_PREFIX, pid))
            .tempdir_in(root)?;
        std::fs::write(dir.path().join(OWNER_FILE), pid.to_string())?;
        debug!("Claimed run directory {}", dir.path().display());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

/// Private working directory of one job, removed when dropped
#[derive(Debug)]
pub struct JobWorkspace {
    dir: TempDir,
}

impl JobWorkspace {
    /// Create a fresh directory for `id` under `root`
    pub fn create(root: &Path, id: JobId) -> SubforgeResult<Self> {
        std::fs::create_dir_all(root)?;
        let dir = tempfile::Builder::new()
            .prefix(&format!("{}{}-", WORKSPACE_PREFIX, id))
            .tempdir_in(root)?;
        debug!("Created workspace {}", dir.path().display());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Location of the rendered subtitle script
    pub fn script_path(&self) -> PathBuf {
        self.dir.path().join("subtitles.ass")
    }
}

/// Remove run directories whose owning process is gone
///
/// Runs without a readable owner file are left alone, since their owner may
/// still be starting. Returns how many were removed.
pub fn purge_stale(root: &Path) -> usize {
    let entries = match std::fs::read_dir(root) {
        Ok(entries) => entries,
        Err(_) => return 0,
    };

    let mut removed = 0;
    for entry in entries.flatten() {
        let is_run_dir = entry.file_name().to_string_lossy().starts_with(RUN_PREFIX)
            && entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
        if !is_run_dir {
            continue;
        }

        let Some(owner) = read_owner(&entry.path()) else {
            continue;
        };
        if process_alive(owner) {
            continue;
        }

        match std::fs::remove_dir_all(entry.path()) {
            Ok(()) => removed += 1,
            Err(e) => warn!("Could not remove stale run {}: {}", entry.path().display(), e),
        }
    }
    removed
}

fn read_owner(run_dir: &Path) -> Option<u32> {
    std::fs::read_to_string(run_dir.join(OWNER_FILE))
        .ok()?
        .trim()
        .parse()
        .ok()
}

#[cfg(target_os = "linux")]
fn process_alive(pid: u32) -> bool {
    Path::new("/proc").join(pid.to_string()).exists()
}

// Without a process table to consult, every run counts as live
#[cfg(not(target_os = "linux"))]
fn process_alive(_pid: u32) -> bool {
    true
}
