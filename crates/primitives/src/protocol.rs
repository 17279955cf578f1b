//! Backend-agnostic request and result shapes. Field names are camelCase on
//! the wire.

use serde::{Deserialize, Serialize};

use crate::{BufferId, SerializableDiagnostic, Workspace};

/// A request against one workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceRequest {
	/// Workspace to compile or run.
	pub workspace: Workspace,
	/// Buffer whose coordinates results are reported in.
	#[serde(default)]
	pub active_buffer_id: BufferId,
	/// Caller correlation id, echoed back in results.
	#[serde(default)]
	pub request_id: String,
	/// Command-line arguments for `run`.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub run_args: Option<String>,
}

impl WorkspaceRequest {
	/// Creates a request with an empty request id.
	pub fn new(workspace: Workspace, active_buffer_id: impl Into<BufferId>) -> Self {
		Self {
			workspace,
			active_buffer_id: active_buffer_id.into(),
			request_id: String::new(),
			run_args: None,
		}
	}

	/// Sets the request id.
	#[must_use]
	pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
		self.request_id = request_id.into();
		self
	}

	/// Sets the run arguments.
	#[must_use]
	pub fn with_run_args(mut self, run_args: impl Into<String>) -> Self {
		self.run_args = Some(run_args.into());
		self
	}
}

/// Outcome of a compile request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileResult {
	/// True when compilation produced an assembly without errors.
	pub succeeded: bool,
	/// Diagnostics in active-buffer coordinates.
	pub diagnostics: Vec<SerializableDiagnostic>,
	/// Emitted assembly, base64 encoded.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub assembly_base64: Option<String>,
	/// Echo of the request id.
	pub request_id: String,
}

impl CompileResult {
	/// A failed result carrying `diagnostics`.
	pub fn failed(request_id: impl Into<String>, diagnostics: Vec<SerializableDiagnostic>) -> Self {
		Self {
			succeeded: false,
			diagnostics,
			assembly_base64: None,
			request_id: request_id.into(),
		}
	}
}

/// Outcome of a run request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
	/// True when the program compiled and ran to completion.
	pub succeeded: bool,
	/// Program output, one entry per line.
	pub output: Vec<String>,
	/// Unhandled exception or failure description.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub exception: Option<String>,
	/// Diagnostics in active-buffer coordinates.
	pub diagnostics: Vec<SerializableDiagnostic>,
	/// Echo of the request id.
	pub request_id: String,
}

impl RunResult {
	/// A failed result with no output.
	pub fn failed(
		request_id: impl Into<String>,
		exception: Option<String>,
		diagnostics: Vec<SerializableDiagnostic>,
	) -> Self {
		Self {
			succeeded: false,
			output: Vec::new(),
			exception,
			diagnostics,
			request_id: request_id.into(),
		}
	}
}

/// Outcome of a diagnostics request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticResult {
	/// Diagnostics in active-buffer coordinates.
	pub diagnostics: Vec<SerializableDiagnostic>,
	/// Echo of the request id.
	pub request_id: String,
}

/// One completion candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionItem {
	/// Text shown in the completion list.
	pub display_text: String,
	/// Symbol kind, such as `Method`.
	pub kind: String,
	/// Text inserted on accept, when it differs from `display_text`.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub insert_text: Option<String>,
	/// Documentation summary.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub documentation: Option<String>,
}

/// Outcome of a completion request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionResult {
	/// Candidates at the active buffer's cursor.
	pub items: Vec<CompletionItem>,
	/// Diagnostics in active-buffer coordinates.
	pub diagnostics: Vec<SerializableDiagnostic>,
	/// Echo of the request id.
	pub request_id: String,
}

/// One parameter of a signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterInfo {
	/// Parameter label, such as `int count`.
	pub label: String,
	/// Documentation for the parameter.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub documentation: Option<String>,
}

/// One overload offered by signature help.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureHelpItem {
	/// Full signature label.
	pub label: String,
	/// Documentation summary.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub documentation: Option<String>,
	/// Parameters in declaration order.
	#[serde(default)]
	pub parameters: Vec<ParameterInfo>,
}

/// Outcome of a signature help request.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureHelpResult {
	/// Candidate signatures.
	pub signatures: Vec<SignatureHelpItem>,
	/// Index of the best matching signature.
	pub active_signature: usize,
	/// Index of the parameter under the cursor.
	pub active_parameter: usize,
	/// Diagnostics in active-buffer coordinates.
	pub diagnostics: Vec<SerializableDiagnostic>,
	/// Echo of the request id.
	pub request_id: String,
}
