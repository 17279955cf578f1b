//! Request budgets.
//!
//! A [`Budget`] bounds one logical operation chain. It carries an optional
//! deadline, a cancellation token shared with child budgets, and an
//! append-only log of named checkpoints. Budgets are created per request and
//! passed explicitly (`&mut` where checkpoints are recorded), never shared
//! between requests.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// A named checkpoint recorded against a budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BudgetEntry {
	/// Checkpoint name.
	pub name: String,
	/// Time since the budget was created.
	pub elapsed: Duration,
}

/// Error returned when a bounded operation runs past its budget.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("budget exceeded at {checkpoint} after {elapsed:?}")]
pub struct BudgetExceeded {
	/// Checkpoint at which the budget ran out.
	pub checkpoint: String,
	/// Time since the budget was created.
	pub elapsed: Duration,
	/// True when the budget was cancelled rather than timed out.
	pub cancelled: bool,
}

/// Deadline, cancellation and checkpoint log for one operation chain.
#[derive(Debug)]
pub struct Budget {
	started: Instant,
	deadline: Option<Instant>,
	cancel: CancellationToken,
	entries: Vec<BudgetEntry>,
}

impl Default for Budget {
	fn default() -> Self {
		Self::unbounded()
	}
}

impl Budget {
	/// A budget without a deadline. It can still be cancelled.
	pub fn unbounded() -> Self {
		Self {
			started: Instant::now(),
			deadline: None,
			cancel: CancellationToken::new(),
			entries: Vec::new(),
		}
	}

	/// A budget expiring `timeout` from now.
	pub fn with_timeout(timeout: Duration) -> Self {
		let started = Instant::now();
		Self {
			started,
			deadline: started.checked_add(timeout),
			cancel: CancellationToken::new(),
			entries: Vec::new(),
		}
	}

	/// A budget expiring at `deadline`.
	pub fn with_deadline(deadline: Instant) -> Self {
		Self {
			deadline: Some(deadline),
			..Self::unbounded()
		}
	}

	/// Derives a child budget.
	///
	/// The child's deadline is the earlier of the parent's and `timeout` from
	/// now; cancelling the parent cancels the child. The child starts with an
	/// empty checkpoint log.
	pub fn child(&self, timeout: Option<Duration>) -> Self {
		let started = Instant::now();
		let own = timeout.and_then(|timeout| started.checked_add(timeout));
		let deadline = match (self.deadline, own) {
			(Some(parent), Some(own)) => Some(parent.min(own)),
			(parent, own) => parent.or(own),
		};
		Self {
			started,
			deadline,
			cancel: self.cancel.child_token(),
			entries: Vec::new(),
		}
	}

	/// Deadline, if any.
	pub fn deadline(&self) -> Option<Instant> {
		self.deadline
	}

	/// Time since the budget was created.
	pub fn elapsed(&self) -> Duration {
		self.started.elapsed()
	}

	/// Time left before the deadline, `None` when unbounded.
	pub fn remaining(&self) -> Option<Duration> {
		self.deadline
			.map(|deadline| deadline.saturating_duration_since(Instant::now()))
	}

	/// Returns true once the deadline has passed or the budget was cancelled.
	pub fn is_exceeded(&self) -> bool {
		self.cancel.is_cancelled() || self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
	}

	/// Cancels this budget and every child derived from it.
	pub fn cancel(&self) {
		self.cancel.cancel();
	}

	/// Token cancelled together with this budget.
	pub fn cancellation_token(&self) -> CancellationToken {
		self.cancel.clone()
	}

	/// Appends a checkpoint.
	pub fn record_entry(&mut self, name: impl Into<String>) {
		let entry = BudgetEntry {
			name: name.into(),
			elapsed: self.elapsed(),
		};
		tracing::trace!(checkpoint = %entry.name, elapsed = ?entry.elapsed, "budget.entry");
		self.entries.push(entry);
	}

	/// Appends a checkpoint, then fails if the budget is exceeded.
	///
	/// # Errors
	///
	/// Returns [`BudgetExceeded`] when the deadline has passed or the budget
	/// was cancelled.
	pub fn record_entry_and_check(&mut self, name: impl Into<String>) -> Result<(), BudgetExceeded> {
		let name = name.into();
		self.record_entry(name.clone());
		self.ensure_within(&name)
	}

	/// Fails if the budget is exceeded, without recording anything.
	///
	/// # Errors
	///
	/// Returns [`BudgetExceeded`] when the deadline has passed or the budget
	/// was cancelled.
	pub fn ensure_within(&self, checkpoint: &str) -> Result<(), BudgetExceeded> {
		if self.is_exceeded() {
			Err(self.exceeded(checkpoint))
		} else {
			Ok(())
		}
	}

	/// Races `fut` against the deadline and cancellation.
	///
	/// An already exhausted budget fails without polling `fut`. When the budget
	/// wins, `fut` is dropped, which cancels it.
	///
	/// # Errors
	///
	/// Returns [`BudgetExceeded`] if the budget runs out first.
	pub async fn race<F>(&self, checkpoint: &str, fut: F) -> Result<F::Output, BudgetExceeded>
	where
		F: Future,
	{
		self.ensure_within(checkpoint)?;
		let cancel = self.cancel.clone();
		let outcome = match self.deadline {
			Some(deadline) => tokio::select! {
				biased;
				() = cancel.cancelled() => None,
				res = tokio::time::timeout_at(deadline, fut) => res.ok(),
			},
			None => tokio::select! {
				biased;
				() = cancel.cancelled() => None,
				out = fut => Some(out),
			},
		};
		outcome.ok_or_else(|| self.exceeded(checkpoint))
	}

	/// Like [`Self::race`], recording `checkpoint` once the race settles.
	///
	/// # Errors
	///
	/// Returns [`BudgetExceeded`] if the budget runs out first.
	pub async fn run<F>(&mut self, checkpoint: &str, fut: F) -> Result<F::Output, BudgetExceeded>
	where
		F: Future,
	{
		let outcome = self.race(checkpoint, fut).await;
		match &outcome {
			Ok(_) => self.record_entry(checkpoint),
			Err(_) => self.record_entry(format!("{checkpoint}:exceeded")),
		}
		outcome
	}

	/// Recorded checkpoints, oldest first.
	pub fn entries(&self) -> &[BudgetEntry] {
		&self.entries
	}

	/// Consumes the budget, returning its checkpoints.
	pub fn into_entries(self) -> Vec<BudgetEntry> {
		self.entries
	}

	fn exceeded(&self, checkpoint: &str) -> BudgetExceeded {
		BudgetExceeded {
			checkpoint: checkpoint.to_string(),
			elapsed: self.elapsed(),
			cancelled: self.cancel.is_cancelled(),
		}
	}
}
