//! Per-path scope stack.
//!
//! Every OS thread owns one active snapshot slot. Entering a scope swaps a
//! new snapshot into the slot and hands back a [`ScopeGuard`] that swaps the
//! previous one back when dropped, so nested scopes unwind in LIFO order on
//! return, early exit and panic alike. Async tasks reuse the same slot through
//! [`Scoped`](crate::Scoped), which installs the task's snapshot only while
//! the task is being polled.

use std::cell::RefCell;
use std::marker::PhantomData;

use crate::error::Result;
use crate::overrides::{DependencyValues, Overrides};
use crate::snapshot::BindingSnapshot;


thread_local! {
	static ACTIVE: RefCell<BindingSnapshot> = const { RefCell::new(BindingSnapshot::empty()) };
}

/// Returns the snapshot active on the calling path.
pub fn current() -> BindingSnapshot {
	ACTIVE.with(|active| active.borrow().clone())
}

/// Restores the previously active snapshot when dropped.
///
/// Guards are bound to the thread that created them and must be dropped in
/// reverse creation order. A guard dropped out of order still restores its
/// own predecessor, but the mismatch is reported as a warning.
#[must_use = "the scope ends as soon as the guard is dropped"]
pub(crate) struct ScopeGuard {
	previous: Option<BindingSnapshot>,
	installed: BindingSnapshot,
	_not_send: PhantomData<*const ()>,
}

impl ScopeGuard {
	fn install(snapshot: BindingSnapshot) -> Self {
		let previous = ACTIVE.with(|active| active.replace(snapshot.clone()));
		tracing::trace!(depth = snapshot.depth(), "deps.scope.enter");
		Self {
			previous: Some(previous),
			installed: snapshot,
			_not_send: PhantomData,
		}
	}
}

impl Drop for ScopeGuard {
	fn drop(&mut self) {
		let Some(previous) = self.previous.take() else {
			return;
		};
		// Values released by the swap may run user drop code that reads the slot.
		let released = ACTIVE.try_with(|active| {
			let mut active = active.borrow_mut();
			if !active.ptr_eq(&self.installed) {
				tracing::warn!(
					installed_depth = self.installed.depth(),
					active_depth = active.depth(),
					"deps.scope.exit_out_of_order"
				);
			}
			tracing::trace!(depth = previous.depth(), "deps.scope.exit");
			std::mem::replace(&mut *active, previous)
		});
		drop(released);
	}
}

impl BindingSnapshot {
	/// Installs this snapshot on the calling thread until the guard is dropped.
	///
	/// The guard must not be held across an `.await`: other tasks polled on
	/// the same thread meanwhile would observe the snapshot. Async code goes
	/// through [`scope`](Self::scope) instead.
	pub(crate) fn enter(&self) -> ScopeGuard {
		ScopeGuard::install(self.clone())
	}

	/// Runs `operation` with this snapshot active on the calling path.
	pub fn run<T>(&self, operation: impl FnOnce() -> T) -> T {
		let _guard = self.enter();
		operation()
	}
}

/// Runs `operation` with `overrides` layered over the calling path's snapshot.
///
/// Every overridden key must have a default; otherwise the call fails with
/// [`DependencyError::Undeclared`](crate::DependencyError::Undeclared)
/// before `operation` runs. The previous snapshot is restored when
/// `operation` returns or unwinds. The operation's own output, including any
/// error it returns, is passed through untouched.
pub fn with_overrides<T>(overrides: Overrides, operation: impl FnOnce() -> T) -> Result<T> {
	let snapshot = prepare(&current(), overrides)?;
	Ok(snapshot.run(operation))
}

/// Closure-configured variant of [`with_overrides`].
///
/// `configure` receives a [`DependencyValues`] view whose reads already see
/// the enclosing scope, so overrides can be derived from current values.
pub fn with_dependencies<T>(configure: impl FnOnce(&mut DependencyValues), operation: impl FnOnce() -> T) -> Result<T> {
	let snapshot = configured(configure)?;
	Ok(snapshot.run(operation))
}

/// Runs `operation` against process defaults, hiding every active override.
pub fn without_overrides<T>(operation: impl FnOnce() -> T) -> T {
	BindingSnapshot::empty().run(operation)
}

pub(crate) fn prepare(base: &BindingSnapshot, overrides: Overrides) -> Result<BindingSnapshot> {
	overrides.validate()?;
	Ok(base.layer(overrides))
}

pub(crate) fn configured(configure: impl FnOnce(&mut DependencyValues)) -> Result<BindingSnapshot> {
	let mut values = DependencyValues::new(current());
	configure(&mut values);
	let (base, overrides) = values.into_parts();
	prepare(&base, overrides)
}
