//! Carrying snapshots across execution-path boundaries.
//!
//! A child path never shares its parent's slot. It either starts from a
//! frozen copy of the parent's snapshot taken when the child is created
//! ([`Propagation::Inherit`]), or from process defaults
//! ([`Propagation::Isolate`]). Overrides entered later on either side stay on
//! that side.

use std::future::Future;

use crate::future::Scoped;
use crate::scope::current;
use crate::snapshot::BindingSnapshot;

/// How a child execution path picks its starting snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Propagation {
	/// Start from the parent's snapshot as of spawn time.
	#[default]
	Inherit,
	/// Start from process defaults.
	Isolate,
}

impl Propagation {
	/// Returns the snapshot a child spawned now from the calling path starts with.
	pub fn capture(self) -> BindingSnapshot {
		match self {
			Self::Inherit => current(),
			Self::Isolate => BindingSnapshot::empty(),
		}
	}

	/// Returns the label used in trace fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Inherit => "inherit",
			Self::Isolate => "isolate",
		}
	}
}

/// Captures the calling path's snapshot and returns a closure that runs `f` under it.
///
/// The returned closure may be sent to another thread; whatever thread calls
/// it sees the captured overrides for the duration of the call.
pub fn bind<F, R>(f: F) -> impl FnOnce() -> R + Send + 'static
where
	F: FnOnce() -> R + Send + 'static,
	R: 'static,
{
	let snapshot = current();
	move || snapshot.run(f)
}

/// Binds futures to snapshots.
pub trait DependencyFutureExt: Future + Sized {
	/// Freezes the calling path's snapshot into this future.
	fn in_current_scope(self) -> Scoped<Self> {
		current().scope(self)
	}

	/// Runs this future under `snapshot`.
	fn in_snapshot(self, snapshot: BindingSnapshot) -> Scoped<Self> {
		Scoped::new(snapshot, self)
	}

	/// Runs this future against process defaults.
	fn isolated(self) -> Scoped<Self> {
		Scoped::new(BindingSnapshot::empty(), self)
	}

	/// Runs this future under the snapshot chosen by `propagation`.
	fn propagated(self, propagation: Propagation) -> Scoped<Self> {
		Scoped::new(propagation.capture(), self)
	}
}

impl<F: Future> DependencyFutureExt for F {}

#[cfg(test)]
mod tests {
	use std::sync::mpsc;
	use std::time::Duration;

	use super::*;
	use crate::accessor::read;
	use crate::overrides::Overrides;
	use crate::scope::with_overrides;

	crate::dependency_key! {
		struct Mode: &'static str = "live";
	}

	#[test]
	fn bound_closure_carries_snapshot_to_thread() {
		let job = with_overrides(Overrides::new().with::<Mode>("test"), || bind(read::<Mode>)).unwrap();
		assert_eq!(std::thread::spawn(job).join().unwrap(), "test");
	}

	#[test]
	fn capture_is_frozen_at_bind_time() {
		let (tx, rx) = mpsc::channel();
		with_overrides(Overrides::new().with::<Mode>("first"), || {
			let job = bind(read::<Mode>);
			with_overrides(Overrides::new().with::<Mode>("second"), || tx.send(job).unwrap()).unwrap();
		})
		.unwrap();

		let job = rx.recv().unwrap();
		assert_eq!(job(), "first");
		assert_eq!(read::<Mode>(), "live");
	}

	#[test]
	fn child_override_does_not_leak_to_parent() {
		with_overrides(Overrides::new().with::<Mode>("parent"), || {
			let child = bind(|| {
				with_overrides(Overrides::new().with::<Mode>("child"), read::<Mode>).unwrap()
			});
			assert_eq!(std::thread::spawn(child).join().unwrap(), "child");
			assert_eq!(read::<Mode>(), "parent");
		})
		.unwrap();
	}

	#[test]
	fn isolate_ignores_parent() {
		let snapshot = with_overrides(Overrides::new().with::<Mode>("parent"), || Propagation::Isolate.capture()).unwrap();
		assert!(snapshot.is_empty());
		assert_eq!(Propagation::default(), Propagation::Inherit);
	}

	#[tokio::test]
	async fn future_ext_binds_at_call_time() {
		let inherited = with_overrides(Overrides::new().with::<Mode>("inherited"), || {
			async {
				tokio::time::sleep(Duration::from_millis(1)).await;
				read::<Mode>()
			}
			.in_current_scope()
		})
		.unwrap();
		let isolated = with_overrides(Overrides::new().with::<Mode>("ignored"), || async { read::<Mode>() }.isolated()).unwrap();

		assert_eq!(tokio::spawn(inherited).await.unwrap(), "inherited");
		assert_eq!(tokio::spawn(isolated).await.unwrap(), "live");
	}

	#[tokio::test]
	async fn in_snapshot_uses_given_snapshot() {
		let snapshot = BindingSnapshot::empty().layer(Overrides::new().with::<Mode>("pinned"));
		let pinned = async {
			tokio::task::yield_now().await;
			read::<Mode>()
		}
		.in_snapshot(snapshot.clone());

		assert!(pinned.snapshot().ptr_eq(&snapshot));
		assert_eq!(pinned.await, "pinned");
		assert_eq!(read::<Mode>(), "live");
	}
}
