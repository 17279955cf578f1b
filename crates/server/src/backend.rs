//! Compiler backend contract.
//!
//! The backend is the language toolchain: it compiles a set of files against
//! a built package and runs the emitted assembly. It reports diagnostics in
//! absolute document offsets; mapping them back to buffers is not its job.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use runpad_package::BuildArtifact;
use runpad_primitives::{CompletionItem, File, RawDiagnostic, SignatureHelpItem};

/// Failure inside the compiler backend itself, as opposed to diagnostics
/// about the compiled code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("compiler backend failed: {message}")]
pub struct BackendError {
	message: String,
}

impl BackendError {
	pub fn new(message: impl Into<String>) -> Self {
		Self { message: message.into() }
	}

	pub fn message(&self) -> &str {
		&self.message
	}
}

/// Input to [`CompilerBackend::compile`].
#[derive(Debug, Clone)]
pub struct CompileInput {
	/// Inlined files.
	pub files: Vec<File>,
	/// Namespaces imported implicitly.
	pub usings: Vec<String>,
	/// Directory of the package compiled against.
	pub package_directory: PathBuf,
	/// The package's build output.
	pub package: Arc<BuildArtifact>,
	pub include_instrumentation: bool,
}

/// Output of [`CompilerBackend::compile`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileOutput {
	/// Diagnostics in absolute document offsets.
	pub diagnostics: Vec<RawDiagnostic>,
	/// Emitted assembly; absent when compilation failed.
	pub assembly: Option<Vec<u8>>,
}

/// Input to [`CompilerBackend::run`].
#[derive(Debug, Clone)]
pub struct RunInput {
	pub assembly: Vec<u8>,
	/// Command-line arguments.
	pub args: Option<String>,
	/// Time left in the request; the backend should stop the program by then.
	pub timeout: Option<Duration>,
	pub package: Arc<BuildArtifact>,
}

/// Output of [`CompilerBackend::run`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOutput {
	pub stdout: String,
	pub stderr: String,
	/// Unhandled exception raised by the program.
	pub exception: Option<String>,
}

/// Input to position-based queries.
#[derive(Debug, Clone)]
pub struct PositionInput {
	/// Inlined files.
	pub files: Vec<File>,
	pub usings: Vec<String>,
	pub package: Arc<BuildArtifact>,
	/// File holding the cursor.
	pub file_name: String,
	/// Cursor byte offset within `file_name`.
	pub offset: usize,
}

/// Signature help computed by a backend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignatureHelp {
	pub signatures: Vec<SignatureHelpItem>,
	pub active_signature: usize,
	pub active_parameter: usize,
}

/// A language toolchain.
#[async_trait]
pub trait CompilerBackend: Send + Sync {
	/// Compiles `input.files` against the package.
	async fn compile(&self, input: CompileInput) -> Result<CompileOutput, BackendError>;

	/// Runs a compiled assembly.
	async fn run(&self, input: RunInput) -> Result<RunOutput, BackendError>;

	/// Completion candidates at a position. Empty by default.
	async fn completions(&self, input: PositionInput) -> Result<Vec<CompletionItem>, BackendError> {
		let _ = input;
		Ok(Vec::new())
	}

	/// Signature help at a position. Empty by default.
	async fn signature_help(&self, input: PositionInput) -> Result<SignatureHelp, BackendError> {
		let _ = input;
		Ok(SignatureHelp::default())
	}
}
