use std::future::Future;

use linktape_deps::{DependencyFutureExt, Propagation};
use tokio::task::{JoinError, JoinSet};

use crate::TaskClass;
use crate::runtime::current_handle;

/// [`JoinSet`] whose tasks carry the snapshot of the path that spawned them.
///
/// Each task captures its snapshot when [`spawn`](Self::spawn) is called,
/// not when the set was created.
#[derive(Debug)]
pub struct WorkerJoinSet<T> {
	class: TaskClass,
	propagation: Propagation,
	inner: JoinSet<T>,
}

impl<T> WorkerJoinSet<T>
where
	T: Send + 'static,
{
	/// Creates an empty set whose tasks inherit the spawning snapshot.
	pub fn new(class: TaskClass) -> Self {
		Self::with_propagation(class, Propagation::Inherit)
	}

	/// Creates an empty set whose tasks start from the snapshot chosen by `propagation`.
	pub fn with_propagation(class: TaskClass, propagation: Propagation) -> Self {
		Self {
			class,
			propagation,
			inner: JoinSet::new(),
		}
	}

	/// Returns the number of tasks currently in the set.
	pub fn len(&self) -> usize {
		self.inner.len()
	}

	/// Returns `true` if the set is empty.
	pub fn is_empty(&self) -> bool {
		self.inner.is_empty()
	}

	/// Spawns a future into the set on the current runtime handle.
	pub fn spawn<F>(&mut self, fut: F)
	where
		F: Future<Output = T> + Send + 'static,
	{
		tracing::trace!(
			worker_class = self.class.as_str(),
			propagation = self.propagation.as_str(),
			pending = self.inner.len(),
			"worker.join_set.spawn"
		);
		self.inner.spawn_on(fut.propagated(self.propagation), &current_handle());
	}

	/// Waits for the next completed task.
	pub async fn join_next(&mut self) -> Option<Result<T, JoinError>> {
		self.inner.join_next().await
	}

	/// Returns one ready completion without waiting.
	pub fn try_join_next(&mut self) -> Option<Result<T, JoinError>> {
		self.inner.try_join_next()
	}

	/// Aborts every task still in the set.
	pub fn abort_all(&mut self) {
		self.inner.abort_all();
	}
}
