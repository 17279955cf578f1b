//! Diagnostic remapping from the inlined document to buffer coordinates.

use runpad_primitives::{BufferId, RawDiagnostic, SerializableDiagnostic, Viewport, Workspace, paths_match};
use runpad_worker::Budget;
use tracing::debug;

use crate::text::{line_at, line_column};
use crate::{PADDING, PADDING_SIZE, Result, extract_viewports};

/// Diagnostics remapped for one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappedDiagnostics {
	/// Diagnostics inside the active buffer, in its coordinates.
	pub in_active_buffer: Vec<SerializableDiagnostic>,
	/// Every raw diagnostic converted without viewport filtering.
	pub all: Vec<SerializableDiagnostic>,
}

/// Maps compiler diagnostics reported against `inlined` (the output of
/// [`crate::inline`]) back onto the `active` buffer.
///
/// Unlocated diagnostics are dropped, as are warnings outside the active
/// buffer's file. Without regions, or when `active` is a whole-file buffer,
/// the remaining diagnostics keep their offsets and only get the directory
/// prefix stripped from their message. Otherwise only diagnostics starting
/// inside the active region survive, shifted by the region start plus
/// [`PADDING_SIZE`]. The line under the shifted start must read the same in
/// the buffer as in the inlined document, or the diagnostic is dropped.
///
/// # Errors
///
/// Returns [`crate::Error::Budget`] when `budget` is already exhausted, or
/// [`crate::Error::DuplicateRegion`] for a malformed workspace.
pub fn map_diagnostics(
	inlined: &Workspace,
	active: &BufferId,
	diagnostics: &[RawDiagnostic],
	budget: &mut Budget,
) -> Result<MappedDiagnostics> {
	budget.record_entry_and_check("diagnostics.map")?;

	let viewports = extract_viewports(inlined.files())?;
	let region_mode = !viewports.is_empty() && active.has_region();

	let mut in_active_buffer = Vec::new();
	for diagnostic in diagnostics {
		let Some(path) = diagnostic.file_path.as_deref() else {
			continue;
		};
		let in_active_file = paths_match(path, active.file_name());
		if !diagnostic.severity.is_error() && !active.is_empty() && !in_active_file {
			continue;
		}

		if region_mode {
			if let Some(mapped) = map_into_region(inlined, &viewports, active, diagnostic, path) {
				in_active_buffer.push(mapped);
			}
		} else {
			let buffer_id = if in_active_file {
				active.clone()
			} else {
				BufferId::file(file_name(path))
			};
			in_active_buffer.push(SerializableDiagnostic {
				start: diagnostic.start,
				end: diagnostic.end,
				message: relativize(&diagnostic.message, path),
				severity: diagnostic.severity,
				id: diagnostic.id.clone(),
				buffer_id: Some(buffer_id),
			});
		}
	}

	let all = diagnostics.iter().map(unfiltered).collect();
	debug!(
		raw = diagnostics.len(),
		kept = in_active_buffer.len(),
		region_mode,
		active = %active,
		"diagnostics.mapped"
	);

	Ok(MappedDiagnostics { in_active_buffer, all })
}

fn map_into_region(
	inlined: &Workspace,
	viewports: &[Viewport],
	active: &BufferId,
	diagnostic: &RawDiagnostic,
	path: &str,
) -> Option<SerializableDiagnostic> {
	let viewport = viewports
		.iter()
		.filter(|viewport| &viewport.buffer_id == active)
		.find(|viewport| paths_match(path, &viewport.destination) && viewport.region.contains(diagnostic.start))?;

	let document = &inlined.file(&viewport.destination)?.text;
	let padded = viewport.content(document)?;
	let text = padded.strip_prefix(PADDING)?.strip_suffix(PADDING)?;

	let origin = viewport.region.start + PADDING_SIZE;
	let start = diagnostic.start.checked_sub(origin)?;
	let buffer_line = line_at(text, start)?;
	if line_at(document, diagnostic.start) != Some(buffer_line) {
		debug!(id = %diagnostic.id, start, "diagnostics.line_mismatch");
		return None;
	}

	let end = diagnostic.end.saturating_sub(origin).clamp(start, text.len());
	let (line, column) = line_column(text, start)?;
	Some(SerializableDiagnostic {
		start,
		end,
		message: format!(
			"({line},{column}): {} {}: {}",
			diagnostic.severity, diagnostic.id, diagnostic.message
		),
		severity: diagnostic.severity,
		id: diagnostic.id.clone(),
		buffer_id: Some(active.clone()),
	})
}

fn unfiltered(diagnostic: &RawDiagnostic) -> SerializableDiagnostic {
	let path = diagnostic.file_path.as_deref();
	SerializableDiagnostic {
		start: diagnostic.start,
		end: diagnostic.end,
		message: path.map_or_else(|| diagnostic.message.clone(), |path| relativize(&diagnostic.message, path)),
		severity: diagnostic.severity,
		id: diagnostic.id.clone(),
		buffer_id: path.map(|path| BufferId::file(file_name(path))),
	}
}

/// Strips the directory of `path` from `message`.
fn relativize(message: &str, path: &str) -> String {
	match path.rfind(['/', '\\']) {
		Some(index) if index > 0 => message.replace(&path[..=index], ""),
		_ => message.to_string(),
	}
}

fn file_name(path: &str) -> &str {
	path.rsplit(['/', '\\']).next().unwrap_or(path)
}
