/// Execution classes used to tag spawned work in traces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskClass {
	/// Work on a caller's request path.
	Interactive,
	/// Detached work that outlives the request that started it, such as
	/// package builds.
	Background,
	/// Blocking filesystem work executed on the blocking pool.
	IoBlocking,
}

impl TaskClass {
	pub(crate) const fn as_str(self) -> &'static str {
		match self {
			Self::Interactive => "interactive",
			Self::Background => "background",
			Self::IoBlocking => "io_blocking",
		}
	}
}
