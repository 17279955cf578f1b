use std::fmt;

use serde::{Deserialize, Serialize};

use crate::buffer_id::normalize_file_name;
use crate::BufferId;

/// A source file supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct File {
	/// File name, relative to the package root.
	pub name: String,
	/// Full file text.
	pub text: String,
}

impl File {
	/// Creates a file.
	pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			text: text.into(),
		}
	}

	/// Returns true if this file is the one `name` refers to.
	pub fn is_named(&self, name: &str) -> bool {
		normalize_file_name(&self.name) == normalize_file_name(name)
	}
}

/// A caller-editable fragment: one region or a whole file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Buffer {
	/// Region or file this buffer edits.
	pub id: BufferId,
	/// Buffer text.
	#[serde(alias = "text")]
	pub content: String,
	/// Cursor byte offset within `content`.
	#[serde(default)]
	pub position: usize,
}

impl Buffer {
	/// Creates a buffer with the cursor at offset zero.
	pub fn new(id: impl Into<BufferId>, content: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			content: content.into(),
			position: 0,
		}
	}

	/// Returns the buffer with the cursor moved to `position`.
	#[must_use]
	pub fn at(mut self, position: usize) -> Self {
		self.position = position;
		self
	}
}

/// Language tag used to route a workspace to its backend.
///
/// Tags are compared lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Language(String);

impl Language {
	/// C# tag.
	pub const CSHARP: &'static str = "csharp";
	/// F# tag.
	pub const FSHARP: &'static str = "fsharp";

	/// Creates a language from any tag.
	pub fn new(tag: impl AsRef<str>) -> Self {
		Self(tag.as_ref().trim().to_ascii_lowercase())
	}

	/// The C# language.
	pub fn csharp() -> Self {
		Self(Self::CSHARP.to_string())
	}

	/// The F# language.
	pub fn fsharp() -> Self {
		Self(Self::FSHARP.to_string())
	}

	/// Returns the tag.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl Default for Language {
	fn default() -> Self {
		Self::csharp()
	}
}

impl fmt::Display for Language {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<String> for Language {
	fn from(value: String) -> Self {
		Self::new(value)
	}
}

impl From<&str> for Language {
	fn from(value: &str) -> Self {
		Self::new(value)
	}
}

impl From<Language> for String {
	fn from(value: Language) -> Self {
		value.0
	}
}

fn default_workspace_type() -> String {
	"script".to_string()
}

/// The unit of work for one request: files, the caller's buffers and
/// compilation settings.
///
/// Workspaces are values. Every `with_*`/`without_*` method returns a new
/// workspace and leaves the receiver untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
	#[serde(default)]
	files: Vec<File>,
	#[serde(default)]
	buffers: Vec<Buffer>,
	#[serde(default)]
	usings: Vec<String>,
	#[serde(default = "default_workspace_type")]
	workspace_type: String,
	#[serde(default)]
	language: Language,
	#[serde(default)]
	include_instrumentation: bool,
}

impl Default for Workspace {
	fn default() -> Self {
		Self::new(default_workspace_type())
	}
}

impl Workspace {
	/// Creates an empty workspace backed by the package `workspace_type`.
	pub fn new(workspace_type: impl Into<String>) -> Self {
		Self {
			files: Vec::new(),
			buffers: Vec::new(),
			usings: Vec::new(),
			workspace_type: workspace_type.into(),
			language: Language::default(),
			include_instrumentation: false,
		}
	}

	/// Files in the workspace.
	pub fn files(&self) -> &[File] {
		&self.files
	}

	/// Caller-supplied buffers.
	pub fn buffers(&self) -> &[Buffer] {
		&self.buffers
	}

	/// Namespace imports applied to every file.
	pub fn usings(&self) -> &[String] {
		&self.usings
	}

	/// Name of the package that backs this workspace.
	pub fn workspace_type(&self) -> &str {
		&self.workspace_type
	}

	/// Language tag.
	pub fn language(&self) -> &Language {
		&self.language
	}

	/// Whether the compiler should emit instrumentation.
	pub fn include_instrumentation(&self) -> bool {
		self.include_instrumentation
	}

	/// Finds a file by (normalized) name.
	pub fn file(&self, name: &str) -> Option<&File> {
		self.files.iter().find(|file| file.is_named(name))
	}

	/// Finds a buffer by id.
	pub fn buffer(&self, id: &BufferId) -> Option<&Buffer> {
		self.buffers.iter().find(|buffer| &buffer.id == id)
	}

	/// Returns a copy with `file` added, replacing any file of the same name.
	#[must_use]
	pub fn with_file(&self, file: File) -> Self {
		let mut next = self.clone();
		match next.files.iter_mut().find(|existing| existing.is_named(&file.name)) {
			Some(existing) => *existing = file,
			None => next.files.push(file),
		}
		next
	}

	/// Returns a copy without the named file.
	#[must_use]
	pub fn without_file(&self, name: &str) -> Self {
		let mut next = self.clone();
		next.files.retain(|file| !file.is_named(name));
		next
	}

	/// Returns a copy whose files are exactly `files`.
	#[must_use]
	pub fn with_files(&self, files: Vec<File>) -> Self {
		Self {
			files,
			..self.clone()
		}
	}

	/// Returns a copy with `buffer` added, replacing any buffer with the same id.
	#[must_use]
	pub fn with_buffer(&self, buffer: Buffer) -> Self {
		let mut next = self.clone();
		match next.buffers.iter_mut().find(|existing| existing.id == buffer.id) {
			Some(existing) => *existing = buffer,
			None => next.buffers.push(buffer),
		}
		next
	}

	/// Returns a copy without the buffer `id`.
	#[must_use]
	pub fn without_buffer(&self, id: &BufferId) -> Self {
		let mut next = self.clone();
		next.buffers.retain(|buffer| &buffer.id != id);
		next
	}

	/// Returns a copy with the given namespace imports.
	#[must_use]
	pub fn with_usings<I, S>(&self, usings: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self {
			usings: usings.into_iter().map(Into::into).collect(),
			..self.clone()
		}
	}

	/// Returns a copy with the given language tag.
	#[must_use]
	pub fn with_language(&self, language: Language) -> Self {
		Self {
			language,
			..self.clone()
		}
	}

	/// Returns a copy with instrumentation toggled.
	#[must_use]
	pub fn with_instrumentation(&self, include_instrumentation: bool) -> Self {
		Self {
			include_instrumentation,
			..self.clone()
		}
	}
}
