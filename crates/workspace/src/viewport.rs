//! Region extraction.
//!
//! A region starts at a line whose first token is `#region <name>` (or
//! `//#region <name>` for F#) and ends at the next `#endregion` line closing it.
//! The region span covers the lines in between, excluding both marker lines.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use runpad_primitives::{BufferId, File, TextSpan, Viewport};
use tracing::debug;

use crate::{Error, Result};

static REGION_START: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"^\s*(?://\s*)?#region\s+(?P<name>\S+)").expect("region start pattern is valid")
});

static REGION_END: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"^\s*(?://\s*)?#endregion\b").expect("region end pattern is valid"));

/// Extracts the viewports of every file, in file order.
///
/// Region names must be unique within a file; the same name in different
/// files yields distinct buffer ids.
///
/// # Errors
///
/// Returns [`Error::DuplicateRegion`] when a file repeats a region name.
pub fn extract_viewports(files: &[File]) -> Result<Vec<Viewport>> {
	let mut viewports = Vec::new();
	for file in files {
		viewports.extend(extract_file_viewports(file)?);
	}
	Ok(viewports)
}

/// Extracts the viewports of one file, ordered by region start.
///
/// # Errors
///
/// Returns [`Error::DuplicateRegion`] when the file repeats a region name.
pub fn extract_file_viewports(file: &File) -> Result<Vec<Viewport>> {
	let mut seen = HashSet::new();
	let mut open: Vec<(&str, usize)> = Vec::new();
	let mut viewports = Vec::new();
	let mut offset = 0;

	for line in file.text.split_inclusive('\n') {
		let line_start = offset;
		offset += line.len();
		let content = line.trim_end_matches(['\r', '\n']);

		if let Some(name) = region_start(content) {
			if !seen.insert(name) {
				return Err(Error::DuplicateRegion {
					file: file.name.clone(),
					region: name.to_string(),
				});
			}
			open.push((name, offset));
		} else if REGION_END.is_match(content) {
			match open.pop() {
				Some((name, start)) => viewports.push(Viewport {
					buffer_id: BufferId::region(&file.name, name),
					region: TextSpan::from_bounds(start, line_start),
					destination: file.name.clone(),
				}),
				None => debug!(file = %file.name, offset = line_start, "viewport.unmatched_end"),
			}
		}
	}

	for (name, _) in open {
		debug!(file = %file.name, region = name, "viewport.unclosed_region");
	}

	viewports.sort_by_key(|viewport| viewport.region.start);
	Ok(viewports)
}

fn region_start(line: &str) -> Option<&str> {
	REGION_START
		.captures(line)
		.and_then(|captures| captures.name("name"))
		.map(|name| name.as_str())
}
