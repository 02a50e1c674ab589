//! Default value registry.
//!
//! Each key owns one [`DefaultCell`], a write-once slot initialized either by
//! an explicit [`declare`] or lazily from [`DependencyKey::live_value`]. The
//! cell is the only synchronization point for a key; there is no registry-wide
//! lock.

use std::fmt;
use std::sync::OnceLock;

use crate::config::{DuplicatePolicy, config};
use crate::error::{DependencyError, Result};
use crate::key::DependencyKey;

/// Write-once storage for the default value of one key.
pub struct DefaultCell<T> {
	value: OnceLock<T>,
}

impl<T> DefaultCell<T> {
	/// Creates an empty cell.
	pub const fn new() -> Self {
		Self { value: OnceLock::new() }
	}

	/// Returns the stored default, if any.
	pub fn get(&self) -> Option<&T> {
		self.value.get()
	}
}

impl<T> Default for DefaultCell<T> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T: fmt::Debug> fmt::Debug for DefaultCell<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("DefaultCell").field("value", &self.value.get()).finish()
	}
}

/// Declares the default value of `K`.
///
/// Declaring is idempotent per key: the first default wins. Later
/// declarations are ignored, or rejected with
/// [`DependencyError::AlreadyDeclared`] under [`DuplicatePolicy::Reject`].
pub fn declare<K: DependencyKey>(value: K::Value) -> Result<()> {
	match K::default_cell().value.set(value) {
		Ok(()) => {
			tracing::trace!(key = K::NAME, "deps.declare");
			Ok(())
		}
		Err(_) => match config().on_duplicate() {
			DuplicatePolicy::Ignore => {
				tracing::trace!(key = K::NAME, "deps.declare.duplicate_ignored");
				Ok(())
			}
			DuplicatePolicy::Reject => {
				tracing::warn!(key = K::NAME, "deps.declare.duplicate_rejected");
				Err(DependencyError::AlreadyDeclared { key: K::NAME })
			}
		},
	}
}

/// Returns whether `K` has a default, either declared or available as a live value.
pub fn is_declared<K: DependencyKey>() -> bool {
	ensure_declared::<K>().is_ok()
}

/// Returns the process default of `K`, initializing it from the live value on first use.
pub fn default_value<K: DependencyKey>() -> Result<K::Value> {
	default_ref::<K>().cloned()
}

pub(crate) fn ensure_declared<K: DependencyKey>() -> Result<()> {
	default_ref::<K>().map(|_| ())
}

fn default_ref<K: DependencyKey>() -> Result<&'static K::Value> {
	let cell = &K::default_cell().value;
	if let Some(value) = cell.get() {
		return Ok(value);
	}
	match K::live_value() {
		Some(live) => Ok(cell.get_or_init(|| live)),
		None => Err(DependencyError::Undeclared { key: K::NAME }),
	}
}
