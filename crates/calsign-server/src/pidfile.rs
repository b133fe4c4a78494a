//! PID file management.
//!
//! The PID file lets process supervisors find the daemon and keeps a
//! second instance from driving the same sign.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::process;

use tracing::{debug, info, warn};

use crate::error::{ServerError, ServerResult};

/// A PID file owned by this process.
///
/// Removed by [`PidFile::release`] or, failing that, on drop. Removal is
/// best-effort: failures are logged and otherwise ignored.
#[derive(Debug)]
pub struct PidFile {
    path: PathBuf,
    released: bool,
}

/// Who holds an existing PID file.
#[derive(Debug, PartialEq, Eq)]
enum Holder {
    Running(u32),
    Gone(u32),
    Unreadable,
}

impl Holder {
    fn inspect(path: &Path) -> Self {
        match read_pid(path) {
            Some(pid) if is_process_running(pid) => Self::Running(pid),
            Some(pid) => Self::Gone(pid),
            None => Self::Unreadable,
        }
    }
}

impl PidFile {
    /// Writes this process's id to `path`.
    ///
    /// Fails if a live process already holds the file. Files left by dead
    /// processes, or holding garbage, are replaced.
    pub fn create(path: impl Into<PathBuf>) -> ServerResult<Self> {
        let path = path.into();

        if path.exists() {
            match Holder::inspect(&path) {
                Holder::Running(pid) => {
                    debug!(path = %path.display(), pid, "PID file held by a running process");
                    return Err(ServerError::already_running(path.to_string_lossy()));
                }
                Holder::Gone(pid) => {
                    warn!(path = %path.display(), pid, "Replacing stale PID file");
                }
                Holder::Unreadable => {
                    warn!(path = %path.display(), "Replacing unreadable PID file");
                }
            }
            fs::remove_file(&path)?;
        }

        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }

        let pid = process::id();
        let mut file = fs::File::create(&path)?;
        writeln!(file, "{pid}")?;
        file.sync_all()?;
        info!(path = %path.display(), pid, "Wrote PID file");

        Ok(Self {
            path,
            released: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Removes the file now instead of on drop.
    pub fn release(mut self) {
        self.remove();
    }

    fn remove(&mut self) {
        if std::mem::replace(&mut self.released, true) {
            return;
        }
        match fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "Removed PID file"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "Could not remove PID file"),
        }
    }
}

impl Drop for PidFile {
    fn drop(&mut self) {
        self.remove();
    }
}

fn read_pid(path: &Path) -> Option<u32> {
    fs::read_to_string(path).ok()?.trim().parse().ok()
}

#[cfg(unix)]
fn is_process_running(pid: u32) -> bool {
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return false;
    };
    // signal 0 checks for existence without delivering anything
    unsafe { libc::kill(pid, 0) == 0 }
}

#[cfg(not(unix))]
fn is_process_running(_pid: u32) -> bool {
    true
}

/// `$XDG_RUNTIME_DIR/calsign.pid`, or `calsign-$UID.pid` in the temp
/// directory without one.
pub fn default_pid_path() -> PathBuf {
    match std::env::var_os("XDG_RUNTIME_DIR") {
        Some(dir) => PathBuf::from(dir).join("calsign.pid"),
        None => std::env::temp_dir().join(format!("calsign-{}.pid", current_uid())),
    }
}

#[cfg(unix)]
fn current_uid() -> u32 {
    unsafe { libc::getuid() }
}

#[cfg(not(unix))]
fn current_uid() -> u32 {
    0
}
