use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::info;

use crate::{Package, PackageConfig, PackageError, Result};

/// Packages keyed by workspace type.
#[derive(Debug, Default)]
pub struct PackageRegistry {
	packages: RwLock<HashMap<String, Package>>,
}

impl PackageRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Builds a registry from configuration entries. Later entries replace
	/// earlier ones with the same name.
	///
	/// # Errors
	///
	/// Returns [`PackageError::InvalidConfig`] for an unusable entry.
	pub fn from_configs<'a>(configs: impl IntoIterator<Item = &'a PackageConfig>) -> Result<Self> {
		let registry = Self::new();
		for config in configs {
			registry.register(config.to_package()?);
		}
		Ok(registry)
	}

	/// Registers `package` under its name, returning the one it replaces.
	pub fn register(&self, package: Package) -> Option<Package> {
		info!(package = %package.name(), dir = %package.directory().display(), "registry.register");
		self.packages.write().insert(package.name().to_string(), package)
	}

	/// Looks up a package. Never creates one.
	///
	/// # Errors
	///
	/// Returns [`PackageError::NotFound`] for an unknown name.
	pub fn find(&self, name: &str) -> Result<Package> {
		self.packages
			.read()
			.get(name)
			.cloned()
			.ok_or_else(|| PackageError::NotFound { name: name.to_string() })
	}

	/// Registered names, sorted.
	pub fn names(&self) -> Vec<String> {
		let mut names: Vec<String> = self.packages.read().keys().cloned().collect();
		names.sort();
		names
	}
}
