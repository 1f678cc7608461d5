use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Best-effort removal of job-scoped files when the guard goes out of scope.
///
/// Every exit path of a job, including failures and panics unwinding through
/// this frame, releases the disk it used. Files that were never created are
/// skipped silently.
pub struct CleanupGuard {
    paths: Vec<PathBuf>,
}

impl CleanupGuard {
    pub fn new() -> Self {
        Self { paths: Vec::new() }
    }

    pub fn add(&mut self, path: impl Into<PathBuf>) {
        self.paths.push(path.into());
    }

    /// Release ownership: another owner (e.g. a stored session) takes over the
    /// files and the guard no longer removes anything.
    pub fn disarm(&mut self) {
        self.paths.clear();
    }
}

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        for path in &self.paths {
            remove_if_exists(path);
        }
    }
}

pub fn remove_if_exists(path: &Path) {
    if !path.exists() {
        return;
    }
    match fs::remove_file(path) {
        Ok(_) => debug!(path = %path.display(), "removed job file"),
        Err(e) => warn!(path = %path.display(), "failed to remove job file: {}", e),
    }
}
