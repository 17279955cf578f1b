use std::path::{Path, PathBuf};

use runpad_worker::{BudgetExceeded, LockError};

/// Errors from package lookup, locking and building.
///
/// Cloneable so one build outcome can be handed to every waiter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PackageError {
	/// No package is registered under the name.
	#[error("package {name} not found")]
	NotFound {
		/// Requested package name.
		name: String,
	},
	/// The builder failed or produced no entry point.
	#[error("package {name} failed to build: {reason}")]
	BuildFailed {
		/// Package name.
		name: String,
		/// Builder output or failure description.
		reason: String,
	},
	/// The build task ended without publishing an outcome.
	#[error("build of package {name} was aborted")]
	Aborted {
		/// Package name.
		name: String,
	},
	/// A package configuration entry is unusable.
	#[error("invalid configuration for package {name}: {reason}")]
	InvalidConfig {
		/// Package name.
		name: String,
		/// What is wrong with the entry.
		reason: String,
	},
	/// The budget ran out first.
	#[error(transparent)]
	Budget(#[from] BudgetExceeded),
	/// The directory lock could not be taken.
	#[error("failed to lock {}: {message}", path.display())]
	Lock {
		/// Lock file path.
		path: PathBuf,
		/// Underlying failure.
		message: String,
	},
	/// Filesystem failure.
	#[error("I/O error at {}: {message}", path.display())]
	Io {
		/// Path involved.
		path: PathBuf,
		/// Underlying failure.
		message: String,
	},
}

impl PackageError {
	pub(crate) fn io(path: &Path, err: impl std::fmt::Display) -> Self {
		Self::Io {
			path: path.to_path_buf(),
			message: err.to_string(),
		}
	}
}

impl From<LockError> for PackageError {
	fn from(err: LockError) -> Self {
		match err {
			LockError::Budget(exceeded) => Self::Budget(exceeded),
			LockError::Closed { name } => Self::Lock {
				path: PathBuf::from(&name),
				message: format!("lock {name} is closed"),
			},
		}
	}
}
