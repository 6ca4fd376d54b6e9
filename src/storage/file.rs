//! File-based storage backend.
//!
//! All hooks live in one JSON file. Mutations run under a process-local mutex
//! and an exclusive advisory lock on a sidecar `.lock` file, so threads and
//! separate processes sharing the file cannot interleave read-modify-write
//! cycles. The state file itself is only ever replaced by rename, never
//! written in place.

use crate::config::CircuitBreakerConfig;
use crate::core::{HookExecutionState, Recorded, StateSnapshot};
use crate::error::{Error, Result};
use crate::storage::traits::StateStore;
use chrono::{DateTime, Utc};
use fs2::FileExt;
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use uuid::Uuid;

/// How long a mutation waits for the file lock.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(2);

/// Interval between lock attempts.
const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// File-based storage backend with atomic writes.
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    lock_path: PathBuf,
    config: CircuitBreakerConfig,
    lock_timeout: Duration,
    guard: Mutex<()>,
}

impl FileBackend {
    /// Create a new file backend.
    ///
    /// Creates the parent directory if it doesn't exist. The state file is
    /// created lazily on the first mutation.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent directory cannot be created.
    pub fn new(path: PathBuf, config: CircuitBreakerConfig) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let lock_path = sidecar(&path, ".lock");
        Ok(Self {
            path,
            lock_path,
            config,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            guard: Mutex::new(()),
        })
    }

    /// Override how long mutations wait for the file lock.
    #[must_use]
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// Path of the state file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the advisory lock file.
    #[must_use]
    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    /// Read the state file without locking.
    ///
    /// A missing file is empty state. A corrupt file is logged and treated as
    /// empty; it is repaired on the next mutation.
    fn read(&self) -> Result<StateSnapshot> {
        match self.load() {
            Err(Error::StateCorruption { path, reason }) => {
                warn!(path = %path.display(), %reason, "state file is corrupt, treating as empty");
                Ok(StateSnapshot::default())
            }
            other => other,
        }
    }

    fn load(&self) -> Result<StateSnapshot> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(StateSnapshot::default()),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&contents).map_err(|e| Error::StateCorruption {
            path: self.path.clone(),
            reason: e.to_string(),
        })
    }

    /// Run `f` on the current state under both locks and persist the result.
    ///
    /// Nothing is written when `f` leaves the state unchanged.
    fn mutate<R>(&self, f: impl FnOnce(&mut StateSnapshot) -> R) -> Result<R> {
        let _guard = self.guard.lock().unwrap_or_else(PoisonError::into_inner);

        let lock_file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&self.lock_path)?;
        self.acquire(&lock_file)?;

        let (mut snapshot, repaired) = match self.load() {
            Ok(s) => (s, false),
            Err(Error::StateCorruption { path, reason }) => {
                warn!(path = %path.display(), %reason, "state file is corrupt, reinitializing");
                let backup = sidecar(&self.path, ".corrupt");
                if let Err(e) = fs::copy(&self.path, &backup) {
                    warn!(error = %e, "could not back up corrupt state file");
                }
                (StateSnapshot::default(), true)
            }
            Err(e) => return Err(e),
        };

        let before = snapshot.clone();
        let result = f(&mut snapshot);
        if repaired || snapshot != before {
            self.write_atomic(&snapshot)?;
        }

        FileExt::unlock(&lock_file)?;
        Ok(result)
    }

    fn acquire(&self, lock_file: &File) -> Result<()> {
        let started = Instant::now();
        loop {
            match FileExt::try_lock_exclusive(lock_file) {
                Ok(()) => return Ok(()),
                Err(e) if is_contended(&e) => {
                    let waited = started.elapsed();
                    if waited >= self.lock_timeout {
                        return Err(Error::LockContention {
                            path: self.lock_path.clone(),
                            waited,
                        });
                    }
                    thread::sleep(LOCK_POLL_INTERVAL);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn write_atomic(&self, snapshot: &StateSnapshot) -> Result<()> {
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let name = self
            .path
            .file_name()
            .map_or_else(|| "state".into(), |n| n.to_string_lossy().into_owned());
        let temp = dir.join(format!(".{name}.{}.tmp", Uuid::new_v4()));

        let mut contents = serde_json::to_string_pretty(snapshot)?;
        contents.push('\n');

        let written = File::create(&temp).and_then(|mut file| {
            file.write_all(contents.as_bytes())?;
            file.sync_all()
        });

        // Atomic rename - readers see the old file or the new one, never a
        // partial write.
        if let Err(e) = written.and_then(|()| fs::rename(&temp, &self.path)) {
            let _ = fs::remove_file(&temp);
            return Err(e.into());
        }

        debug!(path = %self.path.display(), hooks = snapshot.hooks.len(), "state written");
        Ok(())
    }
}

impl StateStore for FileBackend {
    fn get(&self, hook_id: &str) -> Result<Option<HookExecutionState>> {
        Ok(self.read()?.hooks.remove(hook_id))
    }

    fn get_all(&self) -> Result<StateSnapshot> {
        self.read()
    }

    fn record_success(&self, hook_id: &str, now: DateTime<Utc>) -> Result<Recorded> {
        self.mutate(|s| super::record_success(s, hook_id, &self.config, now))
    }

    fn record_failure(&self, hook_id: &str, error: &str, now: DateTime<Utc>) -> Result<Recorded> {
        self.mutate(|s| super::record_failure(s, hook_id, error, &self.config, now))
    }

    fn reset_one(&self, hook_id: &str) -> Result<bool> {
        self.mutate(|s| s.hooks.remove(hook_id).is_some())
    }

    fn reset_all(&self) -> Result<usize> {
        self.mutate(|s| {
            let removed = s.hooks.len();
            s.hooks.clear();
            removed
        })
    }

    fn enable(&self, hook_id: &str, force: bool, now: DateTime<Utc>) -> Result<HookExecutionState> {
        self.mutate(|s| super::enable(s, hook_id, force, now))
    }

    fn disable(&self, hook_id: &str, now: DateTime<Utc>) -> Result<HookExecutionState> {
        self.mutate(|s| super::disable(s, hook_id, now))
    }
}

fn is_contended(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::WouldBlock
        || err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

/// `path` with `suffix` appended to its file name.
fn sidecar(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}
