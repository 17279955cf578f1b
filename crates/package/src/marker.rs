//! Build marker persisted next to a built package.
//!
//! The marker lets a fresh process (or a copied directory) reuse a previous
//! build when its entry point is still on disk.

use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::BuildArtifact;

/// Name of the marker file inside a package directory.
pub const MARKER_FILE: &str = ".runpad-build.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct BuildMarker {
	/// Entry point relative to the package directory.
	pub entry_point: PathBuf,
	/// Build completion time in milliseconds since the Unix epoch.
	pub built_at_ms: u64,
}

impl BuildMarker {
	/// Describes `artifact` relative to `directory`. Returns `None` when the
	/// entry point lies outside the directory.
	pub(crate) fn for_artifact(directory: &Path, artifact: &BuildArtifact) -> Option<Self> {
		let entry_point = artifact.entry_point.strip_prefix(directory).ok()?.to_path_buf();
		let built_at_ms = artifact
			.built_at
			.duration_since(UNIX_EPOCH)
			.map_or(0, |since| u64::try_from(since.as_millis()).unwrap_or(u64::MAX));
		Some(Self {
			entry_point,
			built_at_ms,
		})
	}

	/// Reads the marker in `directory`. A missing marker is `Ok(None)`.
	pub(crate) fn read(directory: &Path) -> io::Result<Option<Self>> {
		let bytes = match std::fs::read(directory.join(MARKER_FILE)) {
			Ok(bytes) => bytes,
			Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
			Err(err) => return Err(err),
		};
		serde_json::from_slice(&bytes).map(Some).map_err(io::Error::other)
	}

	pub(crate) fn write(&self, directory: &Path) -> io::Result<()> {
		let json = serde_json::to_vec_pretty(self).map_err(io::Error::other)?;
		std::fs::write(directory.join(MARKER_FILE), json)
	}

	/// Removes the marker in `directory`, if any.
	pub(crate) fn clear(directory: &Path) -> io::Result<()> {
		match std::fs::remove_file(directory.join(MARKER_FILE)) {
			Err(err) if err.kind() != io::ErrorKind::NotFound => Err(err),
			_ => Ok(()),
		}
	}

	/// Rebuilds the artifact if the recorded entry point still exists.
	pub(crate) fn restore(&self, directory: &Path) -> Option<BuildArtifact> {
		let entry_point = directory.join(&self.entry_point);
		entry_point.is_file().then(|| BuildArtifact {
			entry_point,
			built_at: UNIX_EPOCH + Duration::from_millis(self.built_at_ms),
			restored: true,
		})
	}
}

impl BuildArtifact {
	pub(crate) fn fresh(entry_point: PathBuf) -> Self {
		Self {
			entry_point,
			built_at: SystemTime::now(),
			restored: false,
		}
	}
}
