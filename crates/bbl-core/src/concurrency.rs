use crate::CoreError;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

/// Exclusive advisory lock on a state directory.
///
/// Commands themselves assume a single writer; the CLI takes this lock
/// around every mutating command to provide that.
pub struct StateLock {
    lock_file: File,
}

impl StateLock {
    fn open(lock_path: &Path) -> Result<File, CoreError> {
        if let Some(parent) = lock_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(lock_path)?)
    }

    pub fn try_acquire(lock_path: &Path) -> Result<Option<Self>, CoreError> {
        let file = Self::open(lock_path)?;
        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(Self { lock_file: file })),
            Err(_) => Ok(None),
        }
    }

    /// Take the lock or fail at once naming the directory.
    pub fn acquire_or_fail(lock_path: &Path) -> Result<Self, CoreError> {
        Self::try_acquire(lock_path)?.ok_or_else(|| {
            let dir = lock_path.parent().unwrap_or(lock_path);
            CoreError::Locked(dir.display().to_string())
        })
    }
}

impl Drop for StateLock {
    fn drop(&mut self) {
        let _ = self.lock_file.unlock();
    }
}

static INTERRUPT_REQUESTED: AtomicBool = AtomicBool::new(false);

/// Defer Ctrl-C while a command runs.
///
/// The first interrupt only sets a flag so the step in flight and its
/// state write complete; a second one exits immediately.
pub fn install_signal_handler() {
    let _ = ctrlc::set_handler(move || {
        if INTERRUPT_REQUESTED.swap(true, Ordering::SeqCst) {
            std::process::exit(130);
        }
        eprintln!("\ninterrupt received, finishing the current step (press Ctrl-C again to exit)...");
    });
}

pub fn interrupt_requested() -> bool {
    INTERRUPT_REQUESTED.load(Ordering::SeqCst)
}
