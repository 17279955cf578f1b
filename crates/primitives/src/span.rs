use serde::{Deserialize, Serialize};

/// A half-open byte span `[start, start + length)` over source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TextSpan {
	/// Byte offset of the first byte in the span.
	pub start: usize,
	/// Number of bytes covered.
	pub length: usize,
}

impl TextSpan {
	/// Creates a span from a start offset and a length.
	pub const fn new(start: usize, length: usize) -> Self {
		Self { start, length }
	}

	/// Creates a span from start and end offsets. `end` is clamped to `start`.
	pub fn from_bounds(start: usize, end: usize) -> Self {
		Self::new(start, end.saturating_sub(start))
	}

	/// Exclusive end offset.
	#[inline]
	pub const fn end(&self) -> usize {
		self.start + self.length
	}

	/// Returns true for a zero-length span.
	#[inline]
	pub const fn is_empty(&self) -> bool {
		self.length == 0
	}

	/// Returns true if `offset` lies inside the span (end exclusive).
	#[inline]
	pub const fn contains(&self, offset: usize) -> bool {
		offset >= self.start && offset < self.end()
	}

	/// Returns true if `other` lies entirely inside this span.
	#[inline]
	pub const fn contains_span(&self, other: &Self) -> bool {
		other.start >= self.start && other.end() <= self.end()
	}
}
