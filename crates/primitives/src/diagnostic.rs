use std::fmt;

use serde::{Deserialize, Serialize};

use crate::BufferId;

/// Diagnostic severity, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
	/// Not shown to users.
	Hidden,
	/// Informational message.
	Info,
	/// Warning that does not stop compilation.
	Warning,
	/// Compile error.
	Error,
}

impl Severity {
	/// Returns true for [`Severity::Error`].
	pub const fn is_error(self) -> bool {
		matches!(self, Self::Error)
	}

	/// Lowercase name used in messages.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Hidden => "hidden",
			Self::Info => "info",
			Self::Warning => "warning",
			Self::Error => "error",
		}
	}
}

impl fmt::Display for Severity {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// A diagnostic as reported by a compiler backend.
///
/// Offsets are absolute within the compiled (inlined) document at `file_path`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDiagnostic {
	/// Path of the document, `None` for diagnostics without a source location.
	#[serde(default)]
	pub file_path: Option<String>,
	/// Start byte offset.
	pub start: usize,
	/// End byte offset (exclusive).
	pub end: usize,
	/// Severity.
	pub severity: Severity,
	/// Compiler diagnostic id, such as `CS0029`.
	pub id: String,
	/// Message text.
	pub message: String,
}

impl RawDiagnostic {
	/// Creates a located diagnostic.
	pub fn new(
		file_path: impl Into<String>,
		start: usize,
		end: usize,
		severity: Severity,
		id: impl Into<String>,
		message: impl Into<String>,
	) -> Self {
		Self {
			file_path: Some(file_path.into()),
			start,
			end,
			severity,
			id: id.into(),
			message: message.into(),
		}
	}

	/// Creates a diagnostic without a source location.
	pub fn unlocated(severity: Severity, id: impl Into<String>, message: impl Into<String>) -> Self {
		Self {
			file_path: None,
			start: 0,
			end: 0,
			severity,
			id: id.into(),
			message: message.into(),
		}
	}
}

/// Caller-facing diagnostic; offsets are relative to `buffer_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializableDiagnostic {
	/// Start byte offset within the buffer.
	pub start: usize,
	/// End byte offset within the buffer (exclusive).
	pub end: usize,
	/// Display message.
	pub message: String,
	/// Severity.
	pub severity: Severity,
	/// Diagnostic id.
	pub id: String,
	/// Buffer the offsets refer to.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub buffer_id: Option<BufferId>,
}

impl SerializableDiagnostic {
	/// Creates an unlocated error diagnostic, used to report request failures.
	pub fn error(id: impl Into<String>, message: impl Into<String>) -> Self {
		Self {
			start: 0,
			end: 0,
			message: message.into(),
			severity: Severity::Error,
			id: id.into(),
			buffer_id: None,
		}
	}

	/// Returns true for error severity.
	pub fn is_error(&self) -> bool {
		self.severity.is_error()
	}
}
