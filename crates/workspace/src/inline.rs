//! Buffer inlining.

use runpad_primitives::{BufferId, File, TextSpan, Viewport, Workspace};
use tracing::debug;

use crate::{Error, Result, extract_viewports};

/// Marker placed at both ends of every injected region.
pub const PADDING: &str = "\n";

/// Byte length of [`PADDING`].
pub const PADDING_SIZE: usize = PADDING.len();

/// Produces the workspace the compiler sees for `active`.
///
/// Whole-file buffers replace (or add) their files. When `active` names a
/// region, only the file holding it is rewritten: the active region's content
/// becomes `PADDING + text + PADDING`, where `text` is the active buffer's
/// content or, without one, the original region content. Other regions of
/// that file with a buffer are injected the same way and the rest are blanked
/// to spaces of the same byte length with newlines kept. Regions enclosing the
/// active one are left as is.
///
/// Files without the active region keep their text; only regions the caller
/// supplied a buffer for are injected there. A whole-file `active` only gets
/// the whole-file buffers applied.
///
/// # Errors
///
/// - [`Error::DuplicateRegion`] if a file repeats a region name.
/// - [`Error::UnknownBuffer`] if a buffer (or `active`) names a region that no
///   file defines, or `active` names a file that does not exist.
pub fn inline(workspace: &Workspace, active: &BufferId) -> Result<Workspace> {
	let files = apply_file_buffers(workspace);

	if !active.is_empty() && !active.has_region() && !files.iter().any(|file| file.is_named(active.file_name())) {
		return Err(Error::UnknownBuffer { id: active.clone() });
	}

	let viewports = extract_viewports(&files)?;
	let region_ids = workspace
		.buffers()
		.iter()
		.map(|buffer| &buffer.id)
		.chain(std::iter::once(active))
		.filter(|id| id.has_region());
	for id in region_ids {
		if !viewports.iter().any(|viewport| &viewport.buffer_id == id) {
			return Err(Error::UnknownBuffer { id: id.clone() });
		}
	}

	if viewports.is_empty() || !active.has_region() {
		debug!(files = files.len(), regions = viewports.len(), "inline.whole_file");
		return Ok(workspace.with_files(files));
	}

	let files = files
		.into_iter()
		.map(|file| {
			let file_viewports: Vec<&Viewport> = viewports
				.iter()
				.filter(|viewport| file.is_named(&viewport.destination))
				.collect();
			if file_viewports.is_empty() {
				return file;
			}
			let holds_active = file_viewports.iter().any(|viewport| &viewport.buffer_id == active);
			inline_file(file, &file_viewports, workspace, active, holds_active)
		})
		.collect();

	Ok(workspace.with_files(files))
}

/// Translates a cursor position in the active buffer into a
/// `(file name, offset)` pair in the inlined workspace.
///
/// Positions past the end of the buffer are clamped. Returns `None` when the
/// active buffer has no counterpart in `inlined`.
pub fn locate_position(inlined: &Workspace, active: &BufferId, position: usize) -> Option<(String, usize)> {
	if !active.has_region() {
		let file = inlined.file(active.file_name())?;
		return Some((file.name.clone(), position.min(file.text.len())));
	}

	let viewports = extract_viewports(inlined.files()).ok()?;
	let viewport = viewports.into_iter().find(|viewport| &viewport.buffer_id == active)?;
	let text_len = viewport.region.length.checked_sub(2 * PADDING_SIZE)?;
	let offset = viewport.region.start + PADDING_SIZE + position.min(text_len);
	Some((viewport.destination, offset))
}

fn apply_file_buffers(workspace: &Workspace) -> Vec<File> {
	let mut files = workspace.files().to_vec();
	for buffer in workspace.buffers().iter().filter(|buffer| !buffer.id.has_region()) {
		match files.iter_mut().find(|file| file.is_named(buffer.id.file_name())) {
			Some(file) => file.text.clone_from(&buffer.content),
			None => files.push(File::new(buffer.id.file_name(), buffer.content.clone())),
		}
	}
	files
}

/// Rewrites the regions of one file. Regions without a buffer are blanked
/// only when `blank_unbuffered` is set.
fn inline_file(
	mut file: File,
	viewports: &[&Viewport],
	workspace: &Workspace,
	active: &BufferId,
	blank_unbuffered: bool,
) -> File {
	let active_span = viewports
		.iter()
		.find(|viewport| &viewport.buffer_id == active)
		.map(|viewport| viewport.region);

	let mut ordered = viewports.to_vec();
	ordered.sort_by(|a, b| a.region.start.cmp(&b.region.start).then(b.region.length.cmp(&a.region.length)));

	let mut edits: Vec<(TextSpan, String)> = Vec::new();
	for viewport in ordered {
		if edits.iter().any(|(span, _)| span.contains_span(&viewport.region)) {
			continue;
		}
		let original = viewport.content(&file.text).unwrap_or_default();
		let buffer = workspace.buffer(&viewport.buffer_id);

		let replacement = if &viewport.buffer_id == active {
			padded(buffer.map_or(original, |buffer| buffer.content.as_str()))
		} else if active_span.is_some_and(|span| viewport.region.contains_span(&span)) {
			continue;
		} else if let Some(buffer) = buffer {
			padded(&buffer.content)
		} else if blank_unbuffered {
			blank(original)
		} else {
			continue;
		};
		edits.push((viewport.region, replacement));
	}

	edits.sort_by(|a, b| b.0.start.cmp(&a.0.start));
	for (span, replacement) in edits {
		file.text.replace_range(span.start..span.end(), &replacement);
	}
	file
}

fn padded(text: &str) -> String {
	let mut out = String::with_capacity(text.len() + 2 * PADDING_SIZE);
	out.push_str(PADDING);
	out.push_str(text);
	out.push_str(PADDING);
	out
}

fn blank(text: &str) -> String {
	let mut out = String::with_capacity(text.len());
	for ch in text.chars() {
		match ch {
			'\n' | '\r' => out.push(ch),
			_ => out.extend(std::iter::repeat_n(' ', ch.len_utf8())),
		}
	}
	out
}
