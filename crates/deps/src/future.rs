//! Async scoping.
//!
//! A [`Scoped`] future carries its own [`BindingSnapshot`] and installs it on
//! whichever thread polls it, for the duration of that poll only. The task
//! therefore keeps its overrides when it migrates between worker threads, and
//! a thread never observes a task's overrides between polls.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use pin_project_lite::pin_project;

use crate::error::Result;
use crate::overrides::{DependencyValues, Overrides};
use crate::scope::{configured, current, prepare};
use crate::snapshot::BindingSnapshot;

pin_project! {
	/// Future that runs its inner future under a fixed snapshot.
	///
	/// Dropping a `Scoped` before completion drops the inner future with the
	/// snapshot installed, so cleanup code in the inner future observes the
	/// same dependencies as its body.
	#[must_use = "futures do nothing unless polled"]
	pub struct Scoped<F> {
		snapshot: BindingSnapshot,
		#[pin]
		future: Option<F>,
	}

	impl<F> PinnedDrop for Scoped<F> {
		fn drop(this: Pin<&mut Self>) {
			let mut this = this.project();
			if this.future.is_some() {
				let _guard = this.snapshot.enter();
				this.future.set(None);
			}
		}
	}
}

impl<F> Scoped<F> {
	/// Wraps `future` so it always runs under `snapshot`.
	pub fn new(snapshot: BindingSnapshot, future: F) -> Self {
		Self {
			snapshot,
			future: Some(future),
		}
	}

	/// Returns the snapshot this future runs under.
	pub fn snapshot(&self) -> &BindingSnapshot {
		&self.snapshot
	}
}

impl<F: Future> Future for Scoped<F> {
	type Output = F::Output;

	fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		let mut this = self.project();
		let _guard = this.snapshot.enter();
		let Some(future) = this.future.as_mut().as_pin_mut() else {
			panic!("`Scoped` polled after completion");
		};
		let poll = future.poll(cx);
		if poll.is_ready() {
			this.future.set(None);
		}
		poll
	}
}

impl BindingSnapshot {
	/// Binds `future` to this snapshot.
	pub fn scope<F: Future>(&self, future: F) -> Scoped<F> {
		Scoped::new(self.clone(), future)
	}
}

/// Async variant of [`with_overrides`](crate::with_overrides).
///
/// The snapshot is layered over the path that first polls the returned
/// future; `operation` is invoked and awaited under it, across any number of
/// suspension points and thread migrations.
pub async fn with_overrides_async<T, Fut>(overrides: Overrides, operation: impl FnOnce() -> Fut) -> Result<T>
where
	Fut: Future<Output = T>,
{
	let snapshot = prepare(&current(), overrides)?;
	Ok(snapshot.scope(async move { operation().await }).await)
}

/// Async variant of [`with_dependencies`](crate::with_dependencies).
pub async fn with_dependencies_async<T, Fut>(configure: impl FnOnce(&mut DependencyValues), operation: impl FnOnce() -> Fut) -> Result<T>
where
	Fut: Future<Output = T>,
{
	let snapshot = configured(configure)?;
	Ok(snapshot.scope(async move { operation().await }).await)
}

/// Layers `overrides` over the calling path now and binds `future` to the result.
///
/// Unlike [`with_overrides_async`], the snapshot is captured eagerly, which
/// is what a continuation scheduled from inside a scope needs.
pub fn scoped<F: Future>(overrides: Overrides, future: F) -> Result<Scoped<F>> {
	Ok(prepare(&current(), overrides)?.scope(future))
}

#[cfg(test)]
mod tests {
	use std::time::Duration;

	use super::*;
	use crate::accessor::read;
	use crate::scope::with_overrides;

	crate::dependency_key! {
		struct Region: &'static str = "eu";
		struct Attempts: u8 = 1;
		struct Unknown: u8;
	}

	#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
	async fn override_survives_suspension_and_migration() {
		let task = tokio::spawn(with_overrides_async(Overrides::new().with::<Region>("us"), || async {
			let mut seen = Vec::new();
			for _ in 0..16 {
				tokio::task::yield_now().await;
				seen.push(read::<Region>());
			}
			seen
		}));
		let seen = task.await.unwrap().unwrap();

		assert!(seen.iter().all(|region| *region == "us"), "{seen:?}");
		assert_eq!(read::<Region>(), "eu");
	}

	#[tokio::test]
	async fn nested_async_scopes_unwind() {
		let outer = Overrides::new().with::<Attempts>(2);
		with_overrides_async(outer, || async {
			let inner = with_overrides_async(Overrides::new().with::<Attempts>(3), || async {
				tokio::task::yield_now().await;
				read::<Attempts>()
			})
			.await
			.unwrap();
			assert_eq!(inner, 3);
			assert_eq!(read::<Attempts>(), 2);
		})
		.await
		.unwrap();
		assert_eq!(read::<Attempts>(), 1);
	}

	#[tokio::test]
	async fn unscoped_task_does_not_inherit() {
		let handle = with_overrides(Overrides::new().with::<Region>("ap"), || tokio::spawn(async { read::<Region>() })).unwrap();
		assert_eq!(handle.await.unwrap(), "eu");
	}

	#[tokio::test]
	async fn eagerly_scoped_continuation_outlives_scope() {
		let continuation = with_overrides(Overrides::new().with::<Region>("sa"), || {
			current().scope(async {
				tokio::time::sleep(Duration::from_millis(5)).await;
				read::<Region>()
			})
		})
		.unwrap();

		assert_eq!(read::<Region>(), "eu", "scope already exited on this path");
		assert_eq!(tokio::spawn(continuation).await.unwrap(), "sa");
	}

	#[tokio::test]
	async fn dropping_mid_flight_leaves_thread_clean() {
		let pending = scoped(Overrides::new().with::<Attempts>(9), async {
			tokio::time::sleep(Duration::from_secs(60)).await;
		})
		.unwrap();

		let timed_out = tokio::time::timeout(Duration::from_millis(5), pending).await;
		assert!(timed_out.is_err());
		assert_eq!(read::<Attempts>(), 1);
		assert!(current().is_empty());
	}

	#[tokio::test]
	async fn drop_runs_inner_cleanup_under_snapshot() {
		struct Probe(std::sync::Arc<std::sync::Mutex<Option<u8>>>);
		impl Drop for Probe {
			fn drop(&mut self) {
				*self.0.lock().unwrap() = Some(read::<Attempts>());
			}
		}

		let seen = std::sync::Arc::new(std::sync::Mutex::new(None));
		let probe = Probe(std::sync::Arc::clone(&seen));
		let pending = scoped(Overrides::new().with::<Attempts>(5), async move {
			let _probe = probe;
			std::future::pending::<()>().await;
		})
		.unwrap();

		drop(pending);
		assert_eq!(*seen.lock().unwrap(), Some(5));
	}

	#[tokio::test]
	async fn async_configure_rejects_undeclared() {
		let result = with_dependencies_async(
			|values| {
				values.set::<Unknown>(1);
			},
			|| async { read::<Region>() },
		)
		.await;
		assert!(result.is_err());
	}

	#[tokio::test]
	async fn sibling_polled_during_scoped_yield_sees_default() {
		let sibling = tokio::spawn(async { read::<Region>() });
		let snapshot = BindingSnapshot::empty().layer(Overrides::new().with::<Region>("leaked"));

		let inside = snapshot
			.scope(async {
				// The sibling runs on this thread while this future is parked.
				tokio::task::yield_now().await;
				read::<Region>()
			})
			.await;

		assert_eq!(inside, "leaked");
		assert_eq!(sibling.await.unwrap(), "eu");
		assert!(current().is_empty());
	}

	#[tokio::test]
	async fn plain_task_unaffected_while_scope_is_suspended() {
		let (open, gate) = tokio::sync::oneshot::channel::<()>();
		let scoped_task = tokio::spawn(with_overrides_async(Overrides::new().with::<Region>("us"), || async {
			gate.await.unwrap();
			read::<Region>()
		}));
		tokio::task::yield_now().await;

		let plain = tokio::spawn(async { read::<Region>() }).await.unwrap();
		assert_eq!(plain, "eu");
		assert_eq!(read::<Region>(), "eu");

		open.send(()).unwrap();
		assert_eq!(scoped_task.await.unwrap().unwrap(), "us");
	}
}
