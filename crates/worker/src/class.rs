/// Execution classes used to label spawned paths in traces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TaskClass {
	/// Short async work on the caller's runtime.
	#[default]
	Async,
	/// Blocking work executed on the runtime's blocking pool.
	Blocking,
	/// Work on a dedicated OS thread.
	Thread,
	/// One iteration of a parallel fan-out.
	Parallel,
	/// The run loop of a serialized actor.
	Actor,
}

impl TaskClass {
	pub(crate) const fn as_str(self) -> &'static str {
		match self {
			Self::Async => "async",
			Self::Blocking => "blocking",
			Self::Thread => "thread",
			Self::Parallel => "parallel",
			Self::Actor => "actor",
		}
	}
}
