use std::future::Future;

use linktape_deps::{DependencyFutureExt, Propagation, bind};
use tokio::task::JoinHandle;

use crate::TaskClass;
use crate::runtime::current_handle;

/// Spawns an async task that starts from the caller's current snapshot.
pub fn spawn<F>(class: TaskClass, fut: F) -> JoinHandle<F::Output>
where
	F: Future + Send + 'static,
	F::Output: Send + 'static,
{
	spawn_with(class, Propagation::Inherit, fut)
}

/// Spawns an async task whose starting snapshot is chosen by `propagation`.
pub fn spawn_with<F>(class: TaskClass, propagation: Propagation, fut: F) -> JoinHandle<F::Output>
where
	F: Future + Send + 'static,
	F::Output: Send + 'static,
{
	tracing::trace!(worker_class = class.as_str(), propagation = propagation.as_str(), "worker.spawn");
	current_handle().spawn(fut.propagated(propagation))
}

/// Spawns blocking work that starts from the caller's current snapshot.
pub fn spawn_blocking<F, R>(class: TaskClass, f: F) -> JoinHandle<R>
where
	F: FnOnce() -> R + Send + 'static,
	R: Send + 'static,
{
	tracing::trace!(worker_class = class.as_str(), "worker.spawn_blocking");
	current_handle().spawn_blocking(bind(f))
}

/// Spawns an OS thread that starts from the caller's current snapshot.
pub fn spawn_thread<F, R>(class: TaskClass, f: F) -> std::thread::JoinHandle<R>
where
	F: FnOnce() -> R + Send + 'static,
	R: Send + 'static,
{
	tracing::trace!(worker_class = class.as_str(), "worker.spawn_thread");
	std::thread::spawn(bind(f))
}

/// Spawns a named OS thread that starts from the caller's current snapshot.
pub fn spawn_named_thread<F, R>(class: TaskClass, name: impl Into<String>, f: F) -> std::io::Result<std::thread::JoinHandle<R>>
where
	F: FnOnce() -> R + Send + 'static,
	R: Send + 'static,
{
	tracing::trace!(worker_class = class.as_str(), "worker.spawn_named_thread");
	std::thread::Builder::new().name(name.into()).spawn(bind(f))
}

#[cfg(test)]
mod tests {
	use linktape_deps::{Overrides, dependency_key, read, with_overrides, with_overrides_async};
	use tokio::sync::oneshot;

	use super::*;

	dependency_key! {
		struct Tenant: &'static str = "shared";
	}

	fn tenant(name: &'static str) -> Overrides {
		Overrides::new().with::<Tenant>(name)
	}

	#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
	async fn task_inherits_spawning_scope() {
		let task = with_overrides(tenant("acme"), || {
			spawn(TaskClass::Async, async {
				tokio::task::yield_now().await;
				read::<Tenant>()
			})
		})
		.unwrap();
		assert_eq!(task.await.unwrap(), "acme");
	}

	#[tokio::test]
	async fn isolated_task_sees_defaults() {
		let task = with_overrides(tenant("acme"), || spawn_with(TaskClass::Async, Propagation::Isolate, async { read::<Tenant>() })).unwrap();
		assert_eq!(task.await.unwrap(), "shared");
	}

	#[tokio::test]
	async fn capture_happens_at_spawn_time() {
		let (release, wait) = oneshot::channel::<()>();
		let task = with_overrides(tenant("before"), || {
			spawn(TaskClass::Async, async move {
				wait.await.unwrap();
				read::<Tenant>()
			})
		})
		.unwrap();

		// Overrides entered after the spawn belong to this path only.
		with_overrides_async(tenant("after"), || async move {
			release.send(()).unwrap();
			assert_eq!(task.await.unwrap(), "before");
			assert_eq!(read::<Tenant>(), "after");
		})
		.await
		.unwrap();
	}

	#[tokio::test]
	async fn child_overrides_stay_in_child() {
		with_overrides_async(tenant("parent"), || async {
			let child = spawn(TaskClass::Async, async {
				with_overrides_async(tenant("child"), || async { read::<Tenant>() }).await.unwrap()
			});
			assert_eq!(child.await.unwrap(), "child");
			assert_eq!(read::<Tenant>(), "parent");
		})
		.await
		.unwrap();
	}

	#[tokio::test]
	async fn blocking_work_inherits() {
		let task = with_overrides(tenant("blocking"), || spawn_blocking(TaskClass::Blocking, read::<Tenant>)).unwrap();
		assert_eq!(task.await.unwrap(), "blocking");
	}

	#[test]
	fn threads_inherit() {
		let plain = with_overrides(tenant("thread"), || spawn_thread(TaskClass::Thread, read::<Tenant>)).unwrap();
		let named = with_overrides(tenant("named"), || {
			spawn_named_thread(TaskClass::Thread, "tenant-reader", || {
				(std::thread::current().name().map(str::to_owned), read::<Tenant>())
			})
		})
		.unwrap()
		.unwrap();

		assert_eq!(plain.join().unwrap(), "thread");
		assert_eq!(named.join().unwrap(), (Some("tenant-reader".to_string()), "named"));
		assert_eq!(read::<Tenant>(), "shared");
	}

	#[test]
	fn spawn_outside_runtime_uses_fallback() {
		let task = with_overrides(tenant("fallback"), || spawn(TaskClass::Async, async { read::<Tenant>() })).unwrap();
		let value = crate::runtime::global_handle().block_on(task).unwrap();
		assert_eq!(value, "fallback");
	}
}
