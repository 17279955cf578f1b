//! Execution primitives shared by every runpad request path.
//!
//! - [`Budget`]: deadline plus checkpoint log threaded through a request.
//! - [`AsyncLock`] / [`AsyncSemaphore`]: budget-bounded exclusion.
//! - [`spawn`] / [`spawn_blocking`]: task spawning tagged with a [`TaskClass`].

mod budget;
mod class;
mod lock;
mod spawn;

pub use budget::{Budget, BudgetEntry, BudgetExceeded};
pub use class::TaskClass;
pub use lock::{AsyncLock, AsyncLockGuard, AsyncPermit, AsyncSemaphore, LockError};
pub use spawn::{spawn, spawn_blocking};
