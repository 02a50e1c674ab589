//! Runtime selection for spawned work.
//!
//! Spawns land on the Tokio runtime current on the calling thread. Callers
//! outside any runtime, and global actors, use a lazily built process-wide
//! runtime instead.

use std::sync::OnceLock;

use tokio::runtime::{Builder, Handle, Runtime};

/// Shape of the process-wide fallback runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
	pub(crate) worker_threads: usize,
	pub(crate) thread_name: String,
}

impl Default for RuntimeConfig {
	fn default() -> Self {
		Self {
			worker_threads: 2,
			thread_name: "linktape-worker-global".to_string(),
		}
	}
}

impl RuntimeConfig {
	/// Sets the number of worker threads.
	///
	/// # Panics
	///
	/// Panics if `threads` is zero.
	#[must_use]
	pub fn worker_threads(mut self, threads: usize) -> Self {
		assert!(threads > 0, "worker thread count must be > 0");
		self.worker_threads = threads;
		self
	}

	/// Sets the name given to the runtime's threads.
	#[must_use]
	pub fn thread_name(mut self, name: impl Into<String>) -> Self {
		self.thread_name = name.into();
		self
	}
}

static CONFIG: OnceLock<RuntimeConfig> = OnceLock::new();
static GLOBAL_RT: OnceLock<Runtime> = OnceLock::new();

/// Fixes the fallback runtime's shape.
///
/// Returns the rejected config if the runtime was already configured or
/// already started with defaults.
pub fn configure_runtime(config: RuntimeConfig) -> Result<(), RuntimeConfig> {
	if GLOBAL_RT.get().is_some() {
		return Err(config);
	}
	CONFIG.set(config)
}

fn global_runtime() -> &'static Runtime {
	GLOBAL_RT.get_or_init(|| {
		let config = CONFIG.get_or_init(RuntimeConfig::default);
		tracing::debug!(
			worker_threads = config.worker_threads,
			thread_name = %config.thread_name,
			"worker.runtime.start"
		);
		Builder::new_multi_thread()
			.enable_all()
			.worker_threads(config.worker_threads)
			.thread_name(config.thread_name.clone())
			.build()
			.expect("failed to build linktape-worker global tokio runtime")
	})
}

/// Returns the process-wide runtime's handle, starting it if needed.
pub fn global_handle() -> Handle {
	global_runtime().handle().clone()
}

/// Returns the calling thread's runtime handle, or the process-wide one.
pub fn current_handle() -> Handle {
	Handle::try_current().unwrap_or_else(|_| global_handle())
}
