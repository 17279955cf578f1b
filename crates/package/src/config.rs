//! Package configuration entries.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::{CommandBuilder, DEFAULT_BUILD_TIMEOUT, Package, PackageError, PackageOptions, RebuildPolicy};

/// One `[[packages]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackageConfig {
	/// Workspace type served by this package.
	pub name: String,
	/// Package directory.
	pub directory: PathBuf,
	/// Build command, program first.
	pub build_command: Vec<String>,
	/// Built entry point, relative to `directory`.
	pub entry_point: PathBuf,
	/// Build timeout in seconds.
	#[serde(default = "default_build_timeout_secs")]
	pub build_timeout_secs: u64,
	#[serde(default)]
	pub rebuild: RebuildConfig,
}

fn default_build_timeout_secs() -> u64 {
	DEFAULT_BUILD_TIMEOUT.as_secs()
}

/// Rebuild policy as written in configuration: either
/// `{ throttle_ms = 1000 }` or `"never"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RebuildConfig {
	Throttled { throttle_ms: u64 },
	Keyword(RebuildKeyword),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RebuildKeyword {
	Never,
}

impl Default for RebuildConfig {
	fn default() -> Self {
		Self::from(RebuildPolicy::default())
	}
}

impl From<RebuildPolicy> for RebuildConfig {
	fn from(policy: RebuildPolicy) -> Self {
		match policy {
			RebuildPolicy::ThrottledRebuild(window) => Self::Throttled {
				throttle_ms: u64::try_from(window.as_millis()).unwrap_or(u64::MAX),
			},
			RebuildPolicy::NeverRebuild => Self::Keyword(RebuildKeyword::Never),
		}
	}
}

impl From<RebuildConfig> for RebuildPolicy {
	fn from(config: RebuildConfig) -> Self {
		match config {
			RebuildConfig::Throttled { throttle_ms } => Self::ThrottledRebuild(Duration::from_millis(throttle_ms)),
			RebuildConfig::Keyword(RebuildKeyword::Never) => Self::NeverRebuild,
		}
	}
}

impl PackageConfig {
	pub fn options(&self) -> PackageOptions {
		PackageOptions {
			rebuild: self.rebuild.into(),
			build_timeout: Duration::from_secs(self.build_timeout_secs),
		}
	}

	/// Creates the `NotReady` package described by this entry, built with a
	/// [`CommandBuilder`].
	///
	/// # Errors
	///
	/// Returns [`PackageError::InvalidConfig`] for an empty name or build
	/// command.
	pub fn to_package(&self) -> Result<Package, PackageError> {
		let invalid = |reason: String| PackageError::InvalidConfig {
			name: self.name.clone(),
			reason,
		};
		if self.name.trim().is_empty() {
			return Err(invalid("name is empty".into()));
		}
		let builder = CommandBuilder::new(&self.build_command, &self.entry_point).map_err(|err| invalid(err.to_string()))?;
		Ok(Package::new(
			&self.name,
			&self.directory,
			Arc::new(builder),
			self.options(),
		))
	}
}
