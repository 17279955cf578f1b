use serde::{Deserialize, Serialize};

use crate::{BufferId, TextSpan};

/// A named region's span within a file.
///
/// Viewports are derived from file text by region extraction; callers never
/// supply them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewport {
	/// Region buffer id (`file@region`).
	pub buffer_id: BufferId,
	/// Span of the region content, excluding the marker lines.
	pub region: TextSpan,
	/// Name of the file holding the region.
	pub destination: String,
}

impl Viewport {
	/// Returns the region name.
	pub fn region_name(&self) -> &str {
		self.buffer_id.region_name().unwrap_or_default()
	}

	/// Returns the region content from the destination file's text.
	///
	/// Returns `None` if the span does not fit `text` or splits a character.
	pub fn content<'a>(&self, text: &'a str) -> Option<&'a str> {
		text.get(self.region.start..self.region.end())
	}
}
