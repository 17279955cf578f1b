use std::future::Future;

use tokio::task::JoinHandle;

use crate::TaskClass;

/// Spawns an async task on the current runtime.
///
/// Must be called from within a tokio runtime.
pub fn spawn<F>(class: TaskClass, task: &'static str, fut: F) -> JoinHandle<F::Output>
where
	F: Future + Send + 'static,
	F::Output: Send + 'static,
{
	tracing::trace!(worker_class = class.as_str(), task, "worker.spawn");
	tokio::spawn(fut)
}

/// Spawns blocking work on the runtime's blocking pool.
pub fn spawn_blocking<F, R>(class: TaskClass, task: &'static str, f: F) -> JoinHandle<R>
where
	F: FnOnce() -> R + Send + 'static,
	R: Send + 'static,
{
	tracing::trace!(worker_class = class.as_str(), task, "worker.spawn_blocking");
	tokio::task::spawn_blocking(f)
}
