/// Returns the `[start, end)` bounds of the line containing `offset`,
/// excluding the line terminator.
///
/// `offset` may equal `text.len()`. Returns `None` if `offset` is out of range
/// or not on a character boundary.
pub(crate) fn line_bounds(text: &str, offset: usize) -> Option<(usize, usize)> {
	let before = text.get(..offset)?;
	let after = text.get(offset..)?;
	let start = before.rfind('\n').map_or(0, |i| i + 1);
	let mut end = after.find('\n').map_or(text.len(), |i| offset + i);
	if end > start && text.as_bytes()[end - 1] == b'\r' {
		end -= 1;
	}
	Some((start, end))
}

/// Returns the line text containing `offset`.
pub(crate) fn line_at(text: &str, offset: usize) -> Option<&str> {
	let (start, end) = line_bounds(text, offset)?;
	text.get(start..end)
}

/// Returns the one-based `(line, column)` of `offset`. Columns count characters.
pub(crate) fn line_column(text: &str, offset: usize) -> Option<(usize, usize)> {
	let (start, _) = line_bounds(text, offset)?;
	let line = text.get(..start)?.matches('\n').count() + 1;
	let column = text.get(start..offset)?.chars().count() + 1;
	Some((line, column))
}
