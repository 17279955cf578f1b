//! Package lifecycle.
//!
//! A package moves `NotReady -> Building -> Ready | Faulted`. Builds are
//! single-flight: the first caller of [`Package::ensure_ready`] schedules one
//! detached build task and every caller, the first included, waits for its
//! published outcome under its own budget. A caller that gives up does not
//! cancel the build.
//!
//! # Locking
//!
//! The build task holds the package's in-process [`AsyncLock`] and then the
//! on-disk directory lock for the whole build, so two processes sharing a
//! directory never build it at the same time.

use std::fmt;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use runpad_worker::{AsyncLock, Budget, TaskClass};
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::dir_lock::{DirLock, LOCK_FILE};
use crate::marker::BuildMarker;
use crate::{BuildArtifact, PackageBuilder, PackageError, Result};

/// Default minimum spacing between build starts.
pub const DEFAULT_REBUILD_WINDOW: Duration = Duration::from_secs(1);

/// Default upper bound on a single build.
pub const DEFAULT_BUILD_TIMEOUT: Duration = Duration::from_secs(120);

/// How a package reacts to [`Package::invalidate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildPolicy {
	/// Rebuild on the next request, starting no sooner than the window after
	/// the previous build start.
	ThrottledRebuild(Duration),
	/// Build once and ignore invalidation.
	NeverRebuild,
}

impl Default for RebuildPolicy {
	fn default() -> Self {
		Self::ThrottledRebuild(DEFAULT_REBUILD_WINDOW)
	}
}

/// Per-package tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackageOptions {
	/// Reaction to invalidation.
	pub rebuild: RebuildPolicy,
	/// Upper bound on a single build, lock waits included.
	pub build_timeout: Duration,
}

impl Default for PackageOptions {
	fn default() -> Self {
		Self {
			rebuild: RebuildPolicy::default(),
			build_timeout: DEFAULT_BUILD_TIMEOUT,
		}
	}
}

/// Observable lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageState {
	/// No build has been requested since creation or invalidation.
	NotReady,
	/// A build task is running.
	Building,
	/// The last build succeeded.
	Ready,
	/// The last build failed; the failure is returned until invalidation.
	Faulted,
}

type Outcome = Result<Arc<BuildArtifact>>;

enum Phase {
	NotReady,
	Building(watch::Receiver<Option<Outcome>>),
	Ready(Arc<BuildArtifact>),
	Faulted(PackageError),
}

impl Phase {
	fn state(&self) -> PackageState {
		match self {
			Self::NotReady => PackageState::NotReady,
			Self::Building(_) => PackageState::Building,
			Self::Ready(_) => PackageState::Ready,
			Self::Faulted(_) => PackageState::Faulted,
		}
	}
}

struct Lifecycle {
	phase: Phase,
	/// Set by invalidation; the next request after a settled build rebuilds.
	dirty: bool,
	/// Scheduled start of the most recent build, delay included.
	last_build_start: Option<Instant>,
	/// Only the first build may reuse an on-disk marker.
	may_restore: bool,
}

struct Inner {
	name: String,
	directory: PathBuf,
	builder: Arc<dyn PackageBuilder>,
	options: PackageOptions,
	lock: AsyncLock,
	lifecycle: Mutex<Lifecycle>,
	builds: AtomicUsize,
}

/// A prebuilt project directory shared by every request of one workspace
/// type. Cloning is cheap and clones share state.
#[derive(Clone)]
pub struct Package {
	inner: Arc<Inner>,
}

impl fmt::Debug for Package {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Package")
			.field("name", &self.inner.name)
			.field("directory", &self.inner.directory)
			.field("state", &self.state())
			.finish_non_exhaustive()
	}
}

impl Package {
	/// Creates a `NotReady` package. Nothing touches the directory until the
	/// first [`Self::ensure_ready`].
	pub fn new(
		name: impl Into<String>,
		directory: impl Into<PathBuf>,
		builder: Arc<dyn PackageBuilder>,
		options: PackageOptions,
	) -> Self {
		let name = name.into();
		Self {
			inner: Arc::new(Inner {
				lock: AsyncLock::new(format!("package:{name}")),
				name,
				directory: directory.into(),
				builder,
				options,
				lifecycle: Mutex::new(Lifecycle {
					phase: Phase::NotReady,
					dirty: false,
					last_build_start: None,
					may_restore: true,
				}),
				builds: AtomicUsize::new(0),
			}),
		}
	}

	pub fn name(&self) -> &str {
		&self.inner.name
	}

	pub fn directory(&self) -> &Path {
		&self.inner.directory
	}

	pub fn options(&self) -> PackageOptions {
		self.inner.options
	}

	/// Current lifecycle state.
	pub fn state(&self) -> PackageState {
		self.inner.lifecycle.lock().phase.state()
	}

	/// Number of times the builder has been invoked. Restores do not count.
	pub fn build_count(&self) -> usize {
		self.inner.builds.load(Ordering::SeqCst)
	}

	/// Waits until the package is built, starting a build if none is running.
	///
	/// `Ready` returns immediately and `Faulted` returns the cached failure,
	/// unless the package was invalidated since, in which case a new build is
	/// scheduled.
	///
	/// # Errors
	///
	/// - [`PackageError::Budget`] if `budget` runs out first. The build keeps
	///   running for later callers.
	/// - The build failure otherwise.
	pub async fn ensure_ready(&self, budget: &Budget) -> Result<Arc<BuildArtifact>> {
		budget.ensure_within("package.ensure_ready")?;

		let rx = {
			let mut lifecycle = self.inner.lifecycle.lock();
			if lifecycle.dirty && matches!(lifecycle.phase, Phase::Ready(_) | Phase::Faulted(_)) {
				lifecycle.phase = Phase::NotReady;
			}
			let pending = match &lifecycle.phase {
				Phase::Ready(artifact) => return Ok(Arc::clone(artifact)),
				Phase::Faulted(err) => return Err(err.clone()),
				Phase::Building(rx) => Some(rx.clone()),
				Phase::NotReady => None,
			};
			match pending {
				Some(rx) => rx,
				None => self.start_build(&mut lifecycle),
			}
		};

		budget
			.race("package.ensure_ready", wait_for_outcome(rx, &self.inner.name))
			.await?
	}

	/// Marks the package for rebuild.
	///
	/// Under [`RebuildPolicy::NeverRebuild`] only a faulted package accepts
	/// invalidation; otherwise this returns `false`. Repeated calls before the
	/// next request coalesce into one rebuild; a build already running is not
	/// interrupted.
	pub fn invalidate(&self) -> bool {
		let mut lifecycle = self.inner.lifecycle.lock();
		let faulted = matches!(lifecycle.phase, Phase::Faulted(_));
		if self.inner.options.rebuild == RebuildPolicy::NeverRebuild && !faulted {
			debug!(package = %self.inner.name, state = ?lifecycle.phase.state(), "package.invalidate_ignored");
			return false;
		}
		lifecycle.dirty = true;
		lifecycle.may_restore = false;
		debug!(package = %self.inner.name, state = ?lifecycle.phase.state(), "package.invalidated");
		true
	}

	/// Copies the built package into `destination` and returns it as a new
	/// `NotReady` package with the same builder and options.
	///
	/// The build marker travels with the copy, so the new package restores
	/// instead of rebuilding. The lock file is not copied.
	///
	/// # Errors
	///
	/// Fails if the package cannot be made ready, `budget` runs out, the copy
	/// fails, or `destination` resolves to a path inside the package
	/// directory.
	pub async fn copy_to(
		&self,
		name: impl Into<String>,
		destination: impl Into<PathBuf>,
		budget: &Budget,
	) -> Result<Package> {
		let name = name.into();
		let destination = destination.into();

		self.ensure_ready(budget).await?;
		let _lock = self.inner.lock.acquire(budget).await?;
		let _dir = DirLock::acquire(&self.inner.directory, budget).await?;

		let source = self.inner.directory.clone();
		let target = destination.clone();
		let copy = blocking("package.copy", move || {
			if resolve(&target)?.starts_with(source.canonicalize()?) {
				return Err(io::Error::new(
					io::ErrorKind::InvalidInput,
					"destination lies inside the package directory",
				));
			}
			copy_dir(&source, &target)
		});
		budget
			.race("package.copy", copy)
			.await?
			.map_err(|err| PackageError::io(&destination, err))?;

		info!(
			package = %self.inner.name,
			copy = %name,
			destination = %destination.display(),
			"package.copied"
		);
		Ok(Package::new(
			name,
			destination,
			Arc::clone(&self.inner.builder),
			self.inner.options,
		))
	}

	fn start_build(&self, lifecycle: &mut Lifecycle) -> watch::Receiver<Option<Outcome>> {
		let now = Instant::now();
		let delay = match (self.inner.options.rebuild, lifecycle.last_build_start) {
			(RebuildPolicy::ThrottledRebuild(window), Some(last)) => (last + window).saturating_duration_since(now),
			_ => Duration::ZERO,
		};

		let (tx, rx) = watch::channel(None);
		lifecycle.phase = Phase::Building(rx.clone());
		lifecycle.dirty = false;
		lifecycle.last_build_start = Some(now + delay);
		let restore = std::mem::take(&mut lifecycle.may_restore);

		debug!(package = %self.inner.name, ?delay, restore, "package.build_scheduled");
		let guard = BuildGuard {
			inner: Arc::clone(&self.inner),
			tx: Some(tx),
		};
		runpad_worker::spawn(TaskClass::Background, "package.build", async move {
			let outcome = build(&guard.inner, delay, restore).await;
			guard.complete(outcome);
		});
		rx
	}
}

/// Publishes the build outcome to waiters. Dropping it unpublished (the build
/// task panicked or was aborted) faults the package instead of wedging it.
struct BuildGuard {
	inner: Arc<Inner>,
	tx: Option<watch::Sender<Option<Outcome>>>,
}

impl BuildGuard {
	fn complete(mut self, outcome: Outcome) {
		self.publish(outcome);
	}

	fn publish(&mut self, outcome: Outcome) {
		let Some(tx) = self.tx.take() else {
			return;
		};
		self.inner.lifecycle.lock().phase = match &outcome {
			Ok(artifact) => Phase::Ready(Arc::clone(artifact)),
			Err(err) => Phase::Faulted(err.clone()),
		};
		tx.send_replace(Some(outcome));
	}
}

impl Drop for BuildGuard {
	fn drop(&mut self) {
		if self.tx.is_some() {
			warn!(package = %self.inner.name, "package.build_aborted");
			let name = self.inner.name.clone();
			self.publish(Err(PackageError::Aborted { name }));
		}
	}
}

async fn wait_for_outcome(mut rx: watch::Receiver<Option<Outcome>>, name: &str) -> Outcome {
	let published = match rx.wait_for(Option::is_some).await {
		Ok(outcome) => outcome.clone(),
		Err(_) => None,
	};
	published.unwrap_or_else(|| Err(PackageError::Aborted { name: name.to_string() }))
}

async fn build(inner: &Inner, delay: Duration, restore: bool) -> Outcome {
	if !delay.is_zero() {
		debug!(package = %inner.name, ?delay, "package.build_throttled");
		tokio::time::sleep(delay).await;
	}

	let mut budget = Budget::with_timeout(inner.options.build_timeout);
	let outcome = match run_build(inner, &mut budget, restore).await {
		Err(PackageError::Budget(exceeded)) => Err(PackageError::BuildFailed {
			name: inner.name.clone(),
			reason: format!("timed out at {} after {:?}", exceeded.checkpoint, exceeded.elapsed),
		}),
		other => other,
	};

	match &outcome {
		Ok(artifact) => info!(
			package = %inner.name,
			entry_point = %artifact.entry_point.display(),
			restored = artifact.restored,
			elapsed = ?budget.elapsed(),
			"package.ready"
		),
		Err(err) => warn!(package = %inner.name, error = %err, "package.faulted"),
	}
	outcome.map(Arc::new)
}

async fn run_build(inner: &Inner, budget: &mut Budget, restore: bool) -> Result<BuildArtifact> {
	let _lock = inner.lock.acquire(budget).await?;
	let _dir = DirLock::acquire(&inner.directory, budget).await?;
	budget.record_entry("package.locked");

	if restore && let Some(artifact) = restore_from_marker(inner).await {
		return Ok(artifact);
	}
	let directory = inner.directory.clone();
	if let Err(err) = blocking("package.marker_clear", move || BuildMarker::clear(&directory)).await {
		warn!(package = %inner.name, error = %err, "package.marker_clear_failed");
	}

	inner.builds.fetch_add(1, Ordering::SeqCst);
	info!(package = %inner.name, dir = %inner.directory.display(), "package.build_started");
	let entry_point = budget
		.run("package.build", inner.builder.build(&inner.directory))
		.await?
		.map_err(|err| PackageError::BuildFailed {
			name: inner.name.clone(),
			reason: err.to_string(),
		})?;

	let artifact = BuildArtifact::fresh(entry_point);
	match BuildMarker::for_artifact(&inner.directory, &artifact) {
		Some(marker) => {
			let directory = inner.directory.clone();
			if let Err(err) = blocking("package.marker_write", move || marker.write(&directory)).await {
				warn!(package = %inner.name, error = %err, "package.marker_write_failed");
			}
		}
		None => debug!(package = %inner.name, "package.entry_outside_directory"),
	}
	Ok(artifact)
}

async fn restore_from_marker(inner: &Inner) -> Option<BuildArtifact> {
	let directory = inner.directory.clone();
	let read = blocking("package.marker_read", move || {
		Ok(BuildMarker::read(&directory)?.map(|marker| {
			let artifact = marker.restore(&directory);
			(marker, artifact)
		}))
	});
	match read.await {
		Ok(Some((marker, artifact))) => {
			if artifact.is_none() {
				debug!(package = %inner.name, entry_point = %marker.entry_point.display(), "package.marker_stale");
			}
			artifact
		}
		Ok(None) => None,
		Err(err) => {
			warn!(package = %inner.name, error = %err, "package.marker_unreadable");
			None
		}
	}
}

/// Runs filesystem work on the blocking pool.
async fn blocking<T, F>(task: &'static str, f: F) -> io::Result<T>
where
	F: FnOnce() -> io::Result<T> + Send + 'static,
	T: Send + 'static,
{
	runpad_worker::spawn_blocking(TaskClass::IoBlocking, task, f)
		.await
		.map_err(io::Error::other)?
}

/// Absolute form of `path` with `.`/`..` folded and symlinks resolved as far
/// as the path exists.
fn resolve(path: &Path) -> io::Result<PathBuf> {
	let mut lexical = PathBuf::new();
	for component in std::path::absolute(path)?.components() {
		match component {
			Component::CurDir => {}
			Component::ParentDir => {
				lexical.pop();
			}
			other => lexical.push(other),
		}
	}

	let mut missing = Vec::new();
	let mut base = lexical.as_path();
	loop {
		match base.canonicalize() {
			Ok(canonical) => return Ok(missing.iter().rev().fold(canonical, |path, name| path.join(name))),
			Err(err) if err.kind() == io::ErrorKind::NotFound => match (base.parent(), base.file_name()) {
				(Some(parent), Some(name)) => {
					missing.push(name);
					base = parent;
				}
				_ => return Ok(lexical.clone()),
			},
			Err(err) => return Err(err),
		}
	}
}

fn copy_dir(source: &Path, target: &Path) -> io::Result<()> {
	std::fs::create_dir_all(target)?;
	for entry in std::fs::read_dir(source)? {
		let entry = entry?;
		if entry.file_name() == LOCK_FILE {
			continue;
		}
		let destination = target.join(entry.file_name());
		if entry.file_type()?.is_dir() {
			copy_dir(&entry.path(), &destination)?;
		} else {
			std::fs::copy(entry.path(), &destination)?;
		}
	}
	Ok(())
}
