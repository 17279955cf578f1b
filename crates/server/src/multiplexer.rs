use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use runpad_primitives::{
	CompileResult, CompletionResult, DiagnosticResult, Language, RunResult, SignatureHelpResult, WorkspaceRequest,
};
use runpad_worker::Budget;
use tracing::debug;

use crate::{ServerError, WorkspaceServer};

/// Routes each request to the server registered for its workspace language.
///
/// Requests are forwarded unchanged. A language without a server fails with
/// [`ServerError::UnsupportedLanguage`] instead of falling back to another.
#[derive(Default)]
pub struct WorkspaceServerMultiplexer {
	servers: HashMap<Language, Arc<dyn WorkspaceServer>>,
}

impl WorkspaceServerMultiplexer {
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds (or replaces) the server for `language`.
	#[must_use]
	pub fn with_server(mut self, language: Language, server: Arc<dyn WorkspaceServer>) -> Self {
		self.register(language, server);
		self
	}

	/// Adds (or replaces) the server for `language`, returning the previous one.
	pub fn register(&mut self, language: Language, server: Arc<dyn WorkspaceServer>) -> Option<Arc<dyn WorkspaceServer>> {
		self.servers.insert(language, server)
	}

	/// Languages with a registered server, sorted.
	pub fn languages(&self) -> Vec<Language> {
		let mut languages: Vec<Language> = self.servers.keys().cloned().collect();
		languages.sort_by(|a, b| a.as_str().cmp(b.as_str()));
		languages
	}

	/// Server for the request's workspace language.
	///
	/// # Errors
	///
	/// Returns [`ServerError::UnsupportedLanguage`] when none is registered.
	pub fn route(&self, request: &WorkspaceRequest) -> Result<&Arc<dyn WorkspaceServer>, ServerError> {
		let language = request.workspace.language();
		let server = self.servers.get(language).ok_or_else(|| ServerError::UnsupportedLanguage {
			language: language.clone(),
		})?;
		debug!(language = %language, request_id = %request.request_id, "multiplexer.route");
		Ok(server)
	}
}

#[async_trait]
impl WorkspaceServer for WorkspaceServerMultiplexer {
	async fn compile(&self, request: &WorkspaceRequest, budget: &mut Budget) -> Result<CompileResult, ServerError> {
		self.route(request)?.compile(request, budget).await
	}

	async fn run(&self, request: &WorkspaceRequest, budget: &mut Budget) -> Result<RunResult, ServerError> {
		self.route(request)?.run(request, budget).await
	}

	async fn diagnostics(&self, request: &WorkspaceRequest, budget: &mut Budget) -> Result<DiagnosticResult, ServerError> {
		self.route(request)?.diagnostics(request, budget).await
	}

	async fn completions(&self, request: &WorkspaceRequest, budget: &mut Budget) -> Result<CompletionResult, ServerError> {
		self.route(request)?.completions(request, budget).await
	}

	async fn signature_help(
		&self,
		request: &WorkspaceRequest,
		budget: &mut Budget,
	) -> Result<SignatureHelpResult, ServerError> {
		self.route(request)?.signature_help(request, budget).await
	}
}
