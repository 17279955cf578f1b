//! Per-language request pipeline.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use runpad_package::{BuildArtifact, PackageRegistry};
use runpad_primitives::{
	CompileResult, CompletionResult, DiagnosticResult, Language, RunResult, SerializableDiagnostic,
	SignatureHelpResult, Workspace, WorkspaceRequest,
};
use runpad_worker::{AsyncSemaphore, Budget};
use runpad_workspace::{MappedDiagnostics, inline, locate_position, map_diagnostics};
use tracing::{debug, warn};

use crate::{CompileInput, CompileOutput, CompilerBackend, PositionInput, RunInput, ServerError};

/// Request surface shared by language servers and the multiplexer.
///
/// Language servers report every failure inside the returned result
/// (`succeeded = false` plus an error diagnostic); only routing failures
/// surface as `Err`.
#[async_trait]
pub trait WorkspaceServer: Send + Sync {
	async fn compile(&self, request: &WorkspaceRequest, budget: &mut Budget) -> Result<CompileResult, ServerError>;

	async fn run(&self, request: &WorkspaceRequest, budget: &mut Budget) -> Result<RunResult, ServerError>;

	async fn diagnostics(&self, request: &WorkspaceRequest, budget: &mut Budget) -> Result<DiagnosticResult, ServerError>;

	async fn completions(&self, request: &WorkspaceRequest, budget: &mut Budget) -> Result<CompletionResult, ServerError>;

	async fn signature_help(
		&self,
		request: &WorkspaceRequest,
		budget: &mut Budget,
	) -> Result<SignatureHelpResult, ServerError>;
}

/// Workspace after inlining, with its package ready.
struct Prepared {
	inlined: Workspace,
	package_directory: PathBuf,
	artifact: Arc<BuildArtifact>,
}

struct Compiled {
	output: CompileOutput,
	mapped: MappedDiagnostics,
}

/// Id reported when a compile fails without any error diagnostic.
const COMPILATION_FAILED: &str = "CompilationFailed";

impl Compiled {
	fn succeeded(&self) -> bool {
		self.output.assembly.is_some() && !self.output.diagnostics.iter().any(|d| d.severity.is_error())
	}

	/// Errors explaining a failed compile when none lies in the active buffer.
	fn errors_elsewhere(&self) -> Vec<SerializableDiagnostic> {
		if self.succeeded() || self.mapped.in_active_buffer.iter().any(SerializableDiagnostic::is_error) {
			return Vec::new();
		}
		let errors: Vec<_> = self.mapped.all.iter().filter(|d| d.is_error()).cloned().collect();
		if errors.is_empty() {
			return vec![SerializableDiagnostic::error(
				COMPILATION_FAILED,
				"compilation produced no assembly",
			)];
		}
		errors
	}

	/// Active-buffer diagnostics followed by [`Self::errors_elsewhere`].
	fn into_reported(self) -> Vec<SerializableDiagnostic> {
		let elsewhere = self.errors_elsewhere();
		let mut diagnostics = self.mapped.in_active_buffer;
		diagnostics.extend(elsewhere);
		diagnostics
	}
}

/// Output line for an error outside the active buffer.
fn error_line(diagnostic: &SerializableDiagnostic) -> String {
	match &diagnostic.buffer_id {
		Some(buffer_id) => format!(
			"{buffer_id}: {} {}: {}",
			diagnostic.severity, diagnostic.id, diagnostic.message
		),
		None => format!("{} {}: {}", diagnostic.severity, diagnostic.id, diagnostic.message),
	}
}

/// Serves one language: inline, ready the package, compile through the
/// backend, map diagnostics back onto the active buffer.
pub struct LanguageWorkspaceServer<B> {
	language: Language,
	backend: Arc<B>,
	packages: Arc<PackageRegistry>,
	run_slots: AsyncSemaphore,
}

impl<B: CompilerBackend> LanguageWorkspaceServer<B> {
	/// Creates a server allowing at most `max_concurrent_runs` programs to
	/// execute at once.
	pub fn new(language: Language, backend: B, packages: Arc<PackageRegistry>, max_concurrent_runs: usize) -> Self {
		let run_slots = AsyncSemaphore::new(format!("runs:{language}"), max_concurrent_runs);
		Self {
			language,
			backend: Arc::new(backend),
			packages,
			run_slots,
		}
	}

	pub fn language(&self) -> &Language {
		&self.language
	}

	pub fn backend(&self) -> &B {
		&self.backend
	}

	async fn prepare(&self, request: &WorkspaceRequest, budget: &mut Budget) -> Result<Prepared, ServerError> {
		budget.record_entry_and_check("server.inline")?;
		let inlined = inline(&request.workspace, &request.active_buffer_id)?;

		let package = self.packages.find(request.workspace.workspace_type())?;
		let artifact = package.ensure_ready(budget).await?;
		budget.record_entry_and_check("server.package_ready")?;

		Ok(Prepared {
			inlined,
			package_directory: package.directory().to_path_buf(),
			artifact,
		})
	}

	async fn compile_prepared(
		&self,
		request: &WorkspaceRequest,
		prepared: &Prepared,
		budget: &mut Budget,
	) -> Result<Compiled, ServerError> {
		let input = CompileInput {
			files: prepared.inlined.files().to_vec(),
			usings: prepared.inlined.usings().to_vec(),
			package_directory: prepared.package_directory.clone(),
			package: Arc::clone(&prepared.artifact),
			include_instrumentation: prepared.inlined.include_instrumentation(),
		};
		let output = budget.run("server.compile", self.backend.compile(input)).await??;
		let mapped = map_diagnostics(
			&prepared.inlined,
			&request.active_buffer_id,
			&output.diagnostics,
			budget,
		)?;
		debug!(
			language = %self.language,
			request_id = %request.request_id,
			raw = output.diagnostics.len(),
			mapped = mapped.in_active_buffer.len(),
			"server.compiled"
		);
		Ok(Compiled { output, mapped })
	}

	async fn try_compile(&self, request: &WorkspaceRequest, budget: &mut Budget) -> Result<CompileResult, ServerError> {
		let prepared = self.prepare(request, budget).await?;
		let compiled = self.compile_prepared(request, &prepared, budget).await?;
		let succeeded = compiled.succeeded();
		let assembly_base64 = compiled
			.output
			.assembly
			.as_deref()
			.filter(|_| succeeded)
			.map(|bytes| BASE64.encode(bytes));
		Ok(CompileResult {
			succeeded,
			assembly_base64,
			diagnostics: compiled.into_reported(),
			request_id: request.request_id.clone(),
		})
	}

	async fn try_run(&self, request: &WorkspaceRequest, budget: &mut Budget) -> Result<RunResult, ServerError> {
		let _permit = self.run_slots.acquire(budget).await?;
		budget.record_entry("server.run_slot");

		let prepared = self.prepare(request, budget).await?;
		let compiled = self.compile_prepared(request, &prepared, budget).await?;
		let succeeded = compiled.succeeded();
		let errors_elsewhere = compiled.errors_elsewhere();
		let Compiled { output, mapped } = compiled;
		let assembly = match output.assembly {
			Some(assembly) if succeeded => assembly,
			_ => {
				let mut failed = RunResult::failed(request.request_id.clone(), None, mapped.in_active_buffer);
				failed.output = errors_elsewhere.iter().map(error_line).collect();
				return Ok(failed);
			}
		};

		let input = RunInput {
			assembly,
			args: request.run_args.clone(),
			timeout: budget.remaining(),
			package: prepared.artifact,
		};
		let ran = budget.run("server.run", self.backend.run(input)).await??;
		budget.record_entry_and_check("server.ran")?;

		let mut output: Vec<String> = ran.stdout.lines().map(str::to_string).collect();
		output.extend(ran.stderr.lines().map(str::to_string));
		Ok(RunResult {
			succeeded: ran.exception.is_none(),
			output,
			exception: ran.exception,
			diagnostics: mapped.in_active_buffer,
			request_id: request.request_id.clone(),
		})
	}

	async fn position_input(
		&self,
		request: &WorkspaceRequest,
		budget: &mut Budget,
	) -> Result<PositionInput, ServerError> {
		let prepared = self.prepare(request, budget).await?;
		let active = &request.active_buffer_id;
		let position = request.workspace.buffer(active).map_or(0, |buffer| buffer.position);
		let (file_name, offset) = locate_position(&prepared.inlined, active, position)
			.ok_or_else(|| runpad_workspace::Error::UnknownBuffer { id: active.clone() })?;
		Ok(PositionInput {
			files: prepared.inlined.files().to_vec(),
			usings: prepared.inlined.usings().to_vec(),
			package: prepared.artifact,
			file_name,
			offset,
		})
	}

	fn report(&self, request: &WorkspaceRequest, operation: &'static str, err: &ServerError) {
		warn!(
			language = %self.language,
			request_id = %request.request_id,
			operation,
			error = %err,
			id = err.diagnostic_id(),
			"server.request_failed"
		);
	}
}

#[async_trait]
impl<B: CompilerBackend + 'static> WorkspaceServer for LanguageWorkspaceServer<B> {
	async fn compile(&self, request: &WorkspaceRequest, budget: &mut Budget) -> Result<CompileResult, ServerError> {
		match self.try_compile(request, budget).await {
			Ok(result) => Ok(result),
			Err(err) => {
				self.report(request, "compile", &err);
				Ok(CompileResult::failed(request.request_id.clone(), vec![err.to_diagnostic()]))
			}
		}
	}

	async fn run(&self, request: &WorkspaceRequest, budget: &mut Budget) -> Result<RunResult, ServerError> {
		match self.try_run(request, budget).await {
			Ok(result) => Ok(result),
			Err(err) => {
				self.report(request, "run", &err);
				Ok(RunResult::failed(
					request.request_id.clone(),
					Some(err.to_string()),
					vec![err.to_diagnostic()],
				))
			}
		}
	}

	async fn diagnostics(&self, request: &WorkspaceRequest, budget: &mut Budget) -> Result<DiagnosticResult, ServerError> {
		let outcome = match self.prepare(request, budget).await {
			Ok(prepared) => self.compile_prepared(request, &prepared, budget).await,
			Err(err) => Err(err),
		};
		let diagnostics = match outcome {
			Ok(compiled) => compiled.into_reported(),
			Err(err) => {
				self.report(request, "diagnostics", &err);
				vec![err.to_diagnostic()]
			}
		};
		Ok(DiagnosticResult {
			diagnostics,
			request_id: request.request_id.clone(),
		})
	}

	async fn completions(&self, request: &WorkspaceRequest, budget: &mut Budget) -> Result<CompletionResult, ServerError> {
		let outcome = match self.position_input(request, budget).await {
			Ok(input) => budget
				.run("server.completions", self.backend.completions(input))
				.await
				.map_err(ServerError::from)
				.and_then(|items| items.map_err(ServerError::from)),
			Err(err) => Err(err),
		};
		Ok(match outcome {
			Ok(items) => CompletionResult {
				items,
				diagnostics: Vec::new(),
				request_id: request.request_id.clone(),
			},
			Err(err) => {
				self.report(request, "completions", &err);
				CompletionResult {
					items: Vec::new(),
					diagnostics: vec![err.to_diagnostic()],
					request_id: request.request_id.clone(),
				}
			}
		})
	}

	async fn signature_help(
		&self,
		request: &WorkspaceRequest,
		budget: &mut Budget,
	) -> Result<SignatureHelpResult, ServerError> {
		let outcome = match self.position_input(request, budget).await {
			Ok(input) => budget
				.run("server.signature_help", self.backend.signature_help(input))
				.await
				.map_err(ServerError::from)
				.and_then(|help| help.map_err(ServerError::from)),
			Err(err) => Err(err),
		};
		Ok(match outcome {
			Ok(help) => SignatureHelpResult {
				signatures: help.signatures,
				active_signature: help.active_signature,
				active_parameter: help.active_parameter,
				diagnostics: Vec::new(),
				request_id: request.request_id.clone(),
			},
			Err(err) => {
				self.report(request, "signature_help", &err);
				SignatureHelpResult {
					diagnostics: vec![err.to_diagnostic()],
					request_id: request.request_id.clone(),
					..SignatureHelpResult::default()
				}
			}
		})
	}
}
