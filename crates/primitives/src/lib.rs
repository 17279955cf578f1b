//! Core types for runpad: files, buffers, workspaces, viewports, diagnostics
//! and the request/result shapes exchanged with callers.
//!
//! Everything here is plain data. Text offsets are UTF-8 byte offsets unless a
//! field says otherwise.

/// Buffer identifiers and path normalization.
pub mod buffer_id;
/// Raw and caller-facing diagnostics.
pub mod diagnostic;
/// Wire-level request and result shapes.
pub mod protocol;
/// Byte spans over source text.
pub mod span;
/// Named region spans derived from source files.
pub mod viewport;
/// Files, buffers and immutable workspaces.
pub mod workspace;

pub use buffer_id::{BufferId, normalize_file_name, paths_match};
pub use diagnostic::{RawDiagnostic, SerializableDiagnostic, Severity};
pub use protocol::{
	CompileResult, CompletionItem, CompletionResult, DiagnosticResult, ParameterInfo, RunResult,
	SignatureHelpItem, SignatureHelpResult, WorkspaceRequest,
};
pub use span::TextSpan;
pub use viewport::Viewport;
pub use workspace::{Buffer, File, Language, Workspace};
