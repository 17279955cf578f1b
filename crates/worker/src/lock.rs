//! Budget-bounded async exclusion.
//!
//! Guards and permits are owned, so they can move into spawned tasks, and are
//! released on drop on every exit path.

use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard, OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;

use crate::{Budget, BudgetExceeded};

/// Errors from lock and semaphore acquisition.
#[derive(Debug, thiserror::Error)]
pub enum LockError {
	/// The budget ran out while waiting.
	#[error(transparent)]
	Budget(#[from] BudgetExceeded),
	/// The semaphore was closed.
	#[error("semaphore {name} is closed")]
	Closed {
		/// Semaphore name.
		name: String,
	},
}

/// Async mutual exclusion scoped to one named resource.
#[derive(Debug, Clone)]
pub struct AsyncLock {
	name: Arc<str>,
	inner: Arc<Mutex<()>>,
}

/// Held [`AsyncLock`]; released on drop.
#[derive(Debug)]
pub struct AsyncLockGuard {
	name: Arc<str>,
	acquired: Instant,
	_guard: OwnedMutexGuard<()>,
}

impl AsyncLock {
	/// Creates an unlocked lock.
	pub fn new(name: impl Into<Arc<str>>) -> Self {
		Self {
			name: name.into(),
			inner: Arc::new(Mutex::new(())),
		}
	}

	/// Lock name, used in traces.
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Waits for the lock within `budget`.
	///
	/// # Errors
	///
	/// Returns [`LockError::Budget`] if the budget runs out first.
	pub async fn acquire(&self, budget: &Budget) -> Result<AsyncLockGuard, LockError> {
		let guard = budget
			.race("lock.acquire", Arc::clone(&self.inner).lock_owned())
			.await?;
		tracing::trace!(lock = %self.name, "lock.acquired");
		Ok(AsyncLockGuard {
			name: Arc::clone(&self.name),
			acquired: Instant::now(),
			_guard: guard,
		})
	}

	/// Takes the lock if it is free.
	pub fn try_acquire(&self) -> Option<AsyncLockGuard> {
		let guard = Arc::clone(&self.inner).try_lock_owned().ok()?;
		Some(AsyncLockGuard {
			name: Arc::clone(&self.name),
			acquired: Instant::now(),
			_guard: guard,
		})
	}

	/// Returns true while some guard is held.
	pub fn is_locked(&self) -> bool {
		self.inner.try_lock().is_err()
	}
}

impl Drop for AsyncLockGuard {
	fn drop(&mut self) {
		tracing::trace!(lock = %self.name, held = ?self.acquired.elapsed(), "lock.released");
	}
}

/// Counting semaphore with budget-bounded acquisition.
#[derive(Debug, Clone)]
pub struct AsyncSemaphore {
	name: Arc<str>,
	permits: usize,
	inner: Arc<Semaphore>,
}

/// Held [`AsyncSemaphore`] permit; returned on drop.
#[derive(Debug)]
pub struct AsyncPermit {
	_permit: OwnedSemaphorePermit,
}

impl AsyncSemaphore {
	/// Creates a semaphore with `permits` slots (at least one).
	pub fn new(name: impl Into<Arc<str>>, permits: usize) -> Self {
		let permits = permits.max(1);
		Self {
			name: name.into(),
			permits,
			inner: Arc::new(Semaphore::new(permits)),
		}
	}

	/// Total number of permits.
	pub fn permits(&self) -> usize {
		self.permits
	}

	/// Permits currently free.
	pub fn available(&self) -> usize {
		self.inner.available_permits()
	}

	/// Waits for a permit within `budget`.
	///
	/// # Errors
	///
	/// Returns [`LockError::Budget`] if the budget runs out first, or
	/// [`LockError::Closed`] if the semaphore was closed.
	pub async fn acquire(&self, budget: &Budget) -> Result<AsyncPermit, LockError> {
		let permit = budget
			.race("semaphore.acquire", Arc::clone(&self.inner).acquire_owned())
			.await?
			.map_err(|_| LockError::Closed {
				name: self.name.to_string(),
			})?;
		tracing::trace!(semaphore = %self.name, available = self.available(), "semaphore.acquired");
		Ok(AsyncPermit { _permit: permit })
	}
}
