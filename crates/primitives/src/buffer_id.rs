use std::fmt;

use serde::{Deserialize, Serialize};

/// Separator between file and region in the wire form of a [`BufferId`].
const REGION_SEPARATOR: char = '@';

/// Identifies either a whole file or a named region within one.
///
/// The file name is normalized on construction, so two ids compare equal when
/// their file and region match after normalization. On the wire a buffer id is
/// the string `file@region`, or just `file` for a whole-file buffer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct BufferId {
	file_name: String,
	region_name: Option<String>,
}

impl BufferId {
	/// Creates an id for a whole file.
	pub fn file(file_name: impl AsRef<str>) -> Self {
		Self {
			file_name: normalize_file_name(file_name.as_ref()),
			region_name: None,
		}
	}

	/// Creates an id for a named region inside a file.
	pub fn region(file_name: impl AsRef<str>, region_name: impl Into<String>) -> Self {
		let region_name = region_name.into();
		Self {
			file_name: normalize_file_name(file_name.as_ref()),
			region_name: (!region_name.is_empty()).then_some(region_name),
		}
	}

	/// Parses the wire form `file@region`.
	pub fn parse(value: &str) -> Self {
		match value.rsplit_once(REGION_SEPARATOR) {
			Some((file, region)) => Self::region(file, region.trim()),
			None => Self::file(value),
		}
	}

	/// Returns the normalized file name.
	pub fn file_name(&self) -> &str {
		&self.file_name
	}

	/// Returns the region name, if this id targets a region.
	pub fn region_name(&self) -> Option<&str> {
		self.region_name.as_deref()
	}

	/// Returns true when the id targets a region rather than a whole file.
	pub fn has_region(&self) -> bool {
		self.region_name.is_some()
	}

	/// Returns true for the empty id (no file, no region).
	pub fn is_empty(&self) -> bool {
		self.file_name.is_empty() && self.region_name.is_none()
	}

	/// Returns the whole-file id for the same file.
	pub fn without_region(&self) -> Self {
		Self {
			file_name: self.file_name.clone(),
			region_name: None,
		}
	}
}

impl fmt::Display for BufferId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match &self.region_name {
			Some(region) => write!(f, "{}{REGION_SEPARATOR}{region}", self.file_name),
			None => f.write_str(&self.file_name),
		}
	}
}

impl From<String> for BufferId {
	fn from(value: String) -> Self {
		Self::parse(&value)
	}
}

impl From<&str> for BufferId {
	fn from(value: &str) -> Self {
		Self::parse(value)
	}
}

impl From<BufferId> for String {
	fn from(value: BufferId) -> Self {
		value.to_string()
	}
}

/// Normalizes a file name for comparison: `\` becomes `/`, surrounding
/// whitespace and any leading `./` are removed.
pub fn normalize_file_name(name: &str) -> String {
	let mut normalized = name.trim().replace('\\', "/");
	while let Some(rest) = normalized.strip_prefix("./") {
		normalized = rest.to_string();
	}
	normalized
}

/// Returns true when `path` (possibly absolute) refers to `file_name`.
///
/// Compiler backends report absolute paths inside the package directory while
/// workspaces use bare names, so a path matches when it equals the name or
/// ends with `/name`.
pub fn paths_match(path: &str, file_name: &str) -> bool {
	let path = normalize_file_name(path);
	let file_name = normalize_file_name(file_name);
	if file_name.is_empty() {
		return false;
	}
	path == file_name || path.ends_with(&format!("/{file_name}"))
}
