//! Cross-process guard for the snapshot file
//!
//! Every read and every write of the snapshot holds an exclusive fs2 lock
//! on a `<data file>.lock` sidecar. Writes go to a temp file in the same
//! directory which is then renamed over the snapshot.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use fs2::FileExt;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{Error, Result};

/// Default lock timeout in milliseconds
pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 5000;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Exclusive hold on one snapshot file, released on drop.
#[derive(Debug)]
pub struct SnapshotLock {
    sidecar: File,
    snapshot: PathBuf,
}

impl SnapshotLock {
    /// Wait up to `timeout_ms` for the sidecar lock of `snapshot`.
    ///
    /// Missing parent directories are created.
    pub fn acquire(snapshot: &Path, timeout_ms: u64) -> Result<Self> {
        let sidecar_path = sidecar_for(snapshot);
        fs::create_dir_all(directory_of(&sidecar_path))?;
        let sidecar = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&sidecar_path)?;

        let deadline = Instant::now() + Duration::from_millis(timeout_ms);
        loop {
            match sidecar.try_lock_exclusive() {
                Ok(()) => break,
                Err(err) if !is_contended(&err) => return Err(Error::Io(err)),
                Err(_) if Instant::now() >= deadline => {
                    return Err(Error::LockFailed(sidecar_path));
                }
                Err(_) => thread::sleep(POLL_INTERVAL),
            }
        }
        debug!(path = %snapshot.display(), "snapshot locked");
        Ok(Self {
            sidecar,
            snapshot: snapshot.to_path_buf(),
        })
    }

    /// The snapshot text, or `None` when nothing was saved yet.
    pub fn read(&self) -> Result<Option<String>> {
        match fs::read_to_string(&self.snapshot) {
            Ok(content) => Ok(Some(content)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(Error::Io(err)),
        }
    }

    /// Replace the snapshot with `contents` in one rename.
    pub fn replace(&self, contents: &[u8]) -> Result<()> {
        let mut temp = NamedTempFile::new_in(directory_of(&self.snapshot))?;
        temp.write_all(contents)?;
        temp.as_file().sync_all()?;
        temp.persist(&self.snapshot)
            .map_err(|err| Error::Io(err.error))?;
        Ok(())
    }
}

impl Drop for SnapshotLock {
    fn drop(&mut self) {
        let _ = self.sidecar.unlock();
    }
}

fn sidecar_for(snapshot: &Path) -> PathBuf {
    let mut name = snapshot.as_os_str().to_owned();
    name.push(".lock");
    PathBuf::from(name)
}

fn directory_of(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

// Windows reports a held lock as a sharing violation rather than WouldBlock.
fn is_contended(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::WouldBlock
        || err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}
