//! Prebuilt project packages.
//!
//! A [`Package`] is a project directory that must be built once before any
//! workspace of its type can compile against it. The [`PackageRegistry`] maps
//! workspace types to packages; [`PackageBuilder`] abstracts the build itself,
//! with [`CommandBuilder`] running an external build command.

mod builder;
mod config;
mod dir_lock;
mod error;
mod marker;
mod package;
mod registry;

pub use builder::{BuildArtifact, BuildError, CommandBuilder, PackageBuilder};
pub use config::{PackageConfig, RebuildConfig, RebuildKeyword};
pub use dir_lock::LOCK_FILE;
pub use error::PackageError;
pub use marker::MARKER_FILE;
pub use package::{
	DEFAULT_BUILD_TIMEOUT, DEFAULT_REBUILD_WINDOW, Package, PackageOptions, PackageState, RebuildPolicy,
};
pub use registry::PackageRegistry;

/// Result type for package operations.
pub type Result<T, E = PackageError> = std::result::Result<T, E>;
