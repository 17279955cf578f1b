//! Source transforms between the caller's buffers and the compiled document.
//!
//! A request moves through three steps here:
//!
//! 1. [`extract_viewports`] finds `#region name` / `#endregion` spans in every
//!    file.
//! 2. [`inline`] produces the document the compiler sees: the active region is
//!    injected between [`PADDING`] markers, other regions are injected or
//!    blanked, and whole-file buffers replace their files.
//! 3. [`map_diagnostics`] moves compiler diagnostics from the inlined document
//!    back into the active buffer's coordinates.

mod diagnostics;
mod inline;
mod text;
mod viewport;

pub use diagnostics::{MappedDiagnostics, map_diagnostics};
pub use inline::{PADDING, PADDING_SIZE, inline, locate_position};
pub use viewport::{extract_file_viewports, extract_viewports};

use runpad_primitives::BufferId;
use runpad_worker::BudgetExceeded;

/// A convenient type alias for `Result` with `E` = [`enum@Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors raised while transforming a workspace.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
	/// Two regions in one file share a name.
	#[error("duplicate region '{region}' in {file}")]
	DuplicateRegion {
		/// File holding both regions.
		file: String,
		/// Repeated region name.
		region: String,
	},
	/// A buffer references a region or file that does not exist.
	#[error("unknown buffer {id}")]
	UnknownBuffer {
		/// The offending buffer id.
		id: BufferId,
	},
	/// The request budget ran out.
	#[error(transparent)]
	Budget(#[from] BudgetExceeded),
}
