// Run Lock
// Exclusive lock file preventing overlapping pipeline invocations

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

/// Lock acquisition failure
#[derive(Debug, Error)]
pub enum LockError {
    /// Another invocation holds the lock
    #[error("another invocation is already running (pid {pid})")]
    AlreadyHeld { pid: u32 },

    /// The lock file could not be created or inspected
    #[error("failed to manage lock file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Scoped exclusive lock held for the duration of one invocation.
///
/// The lock is a file created with create-new semantics containing the
/// holder's PID. A lock file whose holder is no longer alive is treated
/// as stale and reclaimed, so a crashed run does not wedge the schedule.
/// Dropping the guard removes the file.
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
}

impl RunLock {
    /// Acquire the lock, failing with [`LockError::AlreadyHeld`] when a
    /// live invocation owns it.
    pub fn acquire(path: &Path) -> Result<Self, LockError> {
        // Two attempts: the second runs after reclaiming a stale file.
        for attempt in 0..2 {
            match OpenOptions::new().write(true).create_new(true).open(path) {
                Ok(mut file) => {
                    let pid = std::process::id();
                    writeln!(file, "{}", pid).map_err(|source| LockError::Io {
                        path: path.to_path_buf(),
                        source,
                    })?;
                    debug!(path = %path.display(), pid, "acquired run lock");
                    return Ok(Self {
                        path: path.to_path_buf(),
                    });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists && attempt == 0 => {
                    match read_holder(path) {
                        Some(pid) if pid_alive(pid) => {
                            return Err(LockError::AlreadyHeld { pid });
                        }
                        holder => {
                            warn!(
                                path = %path.display(),
                                stale_pid = holder,
                                "reclaiming stale lock file"
                            );
                            if let Err(source) = fs::remove_file(path) {
                                if source.kind() != ErrorKind::NotFound {
                                    return Err(LockError::Io {
                                        path: path.to_path_buf(),
                                        source,
                                    });
                                }
                            }
                        }
                    }
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    // Lost the race to whoever recreated it
                    let pid = read_holder(path).unwrap_or(0);
                    return Err(LockError::AlreadyHeld { pid });
                }
                Err(source) => {
                    return Err(LockError::Io {
                        path: path.to_path_buf(),
                        source,
                    });
                }
            }
        }
        unreachable!("lock acquisition loop always returns")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            if e.kind() != ErrorKind::NotFound {
                warn!(path = %self.path.display(), error = %e, "failed to remove lock file");
            }
        }
    }
}

/// PID recorded in the lock file, if it parses
fn read_holder(path: &Path) -> Option<u32> {
    let contents = fs::read_to_string(path).ok()?;
    contents.trim().parse().ok()
}

#[cfg(target_os = "linux")]
fn pid_alive(pid: u32) -> bool {
    Path::new("/proc").join(pid.to_string()).exists()
}

#[cfg(not(target_os = "linux"))]
fn pid_alive(_pid: u32) -> bool {
    // No portable liveness probe; treat the holder as alive and let the
    // operator remove the file after a crash.
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_and_release() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("run.lock");

        let lock = RunLock::acquire(&path).unwrap();
        assert!(path.exists());
        assert_eq!(read_holder(&path), Some(std::process::id()));

        drop(lock);
        assert!(!path.exists());
    }

    #[test]
    fn test_second_acquire_fails_while_held() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("run.lock");

        let _lock = RunLock::acquire(&path).unwrap();
        match RunLock::acquire(&path) {
            Err(LockError::AlreadyHeld { pid }) => assert_eq!(pid, std::process::id()),
            other => panic!("expected AlreadyHeld, got {other:?}"),
        }
    }

    #[test]
    fn test_acquire_after_release() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("run.lock");

        drop(RunLock::acquire(&path).unwrap());
        let second = RunLock::acquire(&path);
        assert!(second.is_ok());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_stale_lock_is_reclaimed() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("run.lock");

        // u32::MAX is far above any kernel pid_max, so this holder
        // cannot be alive.
        fs::write(&path, format!("{}\n", u32::MAX)).unwrap();

        let lock = RunLock::acquire(&path).unwrap();
        assert_eq!(read_holder(&path), Some(std::process::id()));
        drop(lock);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_unparseable_lock_is_reclaimed() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("run.lock");
        fs::write(&path, "not a pid\n").unwrap();

        assert!(RunLock::acquire(&path).is_ok());
    }

    #[test]
    fn test_io_error_on_bad_path() {
        let err = RunLock::acquire(Path::new("/nonexistent-dir/run.lock")).unwrap_err();
        assert!(matches!(err, LockError::Io { .. }));
    }
}
