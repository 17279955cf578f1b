//! Server configuration.
//!
//! ```toml
//! default_timeout_ms = 15000
//! max_concurrent_runs = 4
//!
//! [[packages]]
//! name = "console"
//! directory = "/var/lib/runpad/console"
//! build_command = ["dotnet", "build"]
//! entry_point = "bin/Debug/console.dll"
//! rebuild = { throttle_ms = 1000 }
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use runpad_package::{PackageConfig, PackageError, PackageRegistry};
use runpad_worker::Budget;
use serde::Deserialize;

/// Errors loading a configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	#[error("failed to read {}: {source}", path.display())]
	Read {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},
	#[error("failed to parse configuration: {0}")]
	Parse(#[from] toml::de::Error),
}

/// Top-level server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
	/// Budget given to a request that brings none.
	#[serde(default = "default_timeout_ms")]
	pub default_timeout_ms: u64,
	/// Programs allowed to execute at once, per language.
	#[serde(default = "default_max_concurrent_runs")]
	pub max_concurrent_runs: usize,
	#[serde(default)]
	pub packages: Vec<PackageConfig>,
}

fn default_timeout_ms() -> u64 {
	15_000
}

fn default_max_concurrent_runs() -> usize {
	4
}

impl Default for ServerConfig {
	fn default() -> Self {
		Self {
			default_timeout_ms: default_timeout_ms(),
			max_concurrent_runs: default_max_concurrent_runs(),
			packages: Vec::new(),
		}
	}
}

impl ServerConfig {
	/// Parses a TOML document.
	///
	/// # Errors
	///
	/// Returns [`ConfigError::Parse`] for malformed or unknown keys.
	pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
		Ok(toml::from_str(text)?)
	}

	/// Reads and parses a TOML file.
	///
	/// # Errors
	///
	/// Returns [`ConfigError::Read`] if the file cannot be read, or
	/// [`ConfigError::Parse`] if it is malformed.
	pub fn load(path: &Path) -> Result<Self, ConfigError> {
		let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
			path: path.to_path_buf(),
			source,
		})?;
		Self::from_toml_str(&text)
	}

	pub fn default_timeout(&self) -> Duration {
		Duration::from_millis(self.default_timeout_ms)
	}

	/// A fresh budget bounded by [`Self::default_timeout`].
	pub fn request_budget(&self) -> Budget {
		Budget::with_timeout(self.default_timeout())
	}

	/// Registry holding every configured package, none of them built yet.
	///
	/// # Errors
	///
	/// Returns [`PackageError::InvalidConfig`] for an unusable entry.
	pub fn package_registry(&self) -> Result<PackageRegistry, PackageError> {
		PackageRegistry::from_configs(&self.packages)
	}
}
