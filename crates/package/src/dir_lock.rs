//! Cooperative on-disk lock over a package directory.
//!
//! Every process touching a package directory takes an exclusive `flock` on
//! `<dir>/.runpad.lock` first. Acquisition polls so the wait stays bounded by
//! the caller's budget.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use fs2::FileExt;
use runpad_worker::Budget;

use crate::PackageError;

/// Name of the lock file inside a package directory.
pub const LOCK_FILE: &str = ".runpad.lock";

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Held directory lock; released on drop.
#[derive(Debug)]
pub(crate) struct DirLock {
	file: File,
	path: PathBuf,
}

impl DirLock {
	/// Waits for the lock on `directory` within `budget`.
	pub(crate) async fn acquire(directory: &Path, budget: &Budget) -> Result<Self, PackageError> {
		let path = directory.join(LOCK_FILE);
		let file = OpenOptions::new()
			.write(true)
			.create(true)
			.truncate(false)
			.open(&path)
			.map_err(|err| PackageError::io(&path, err))?;

		loop {
			match file.try_lock_exclusive() {
				Ok(()) => {
					tracing::trace!(path = %path.display(), "dir_lock.acquired");
					return Ok(Self { file, path });
				}
				Err(err) if is_contended(&err) => {
					budget.race("package.dir_lock", tokio::time::sleep(POLL_INTERVAL)).await?;
				}
				Err(err) => {
					return Err(PackageError::Lock {
						path,
						message: err.to_string(),
					});
				}
			}
		}
	}
}

impl Drop for DirLock {
	fn drop(&mut self) {
		let _ = FileExt::unlock(&self.file);
		tracing::trace!(path = %self.path.display(), "dir_lock.released");
	}
}

fn is_contended(err: &io::Error) -> bool {
	err.kind() == io::ErrorKind::WouldBlock || err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}
