//! Override sets applied when entering a scope.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap as HashMap;

use crate::error::Result;
use crate::key::{DependencyKey, KeyId};
use crate::registry;
use crate::snapshot::BindingSnapshot;

/// One overriding value, type-erased behind its key.
#[derive(Clone)]
pub(crate) struct Binding {
	value: Arc<dyn Any + Send + Sync>,
	ensure_declared: fn() -> Result<()>,
}

impl Binding {
	fn new<K: DependencyKey>(value: K::Value) -> Self {
		Self {
			value: Arc::new(value),
			ensure_declared: registry::ensure_declared::<K>,
		}
	}

	pub(crate) fn downcast<K: DependencyKey>(&self) -> Option<&K::Value> {
		self.value.downcast_ref::<K::Value>()
	}
}

/// A set of values to install for the duration of a scope.
///
/// Setting the same key twice keeps the last value.
#[derive(Clone, Default)]
pub struct Overrides {
	pub(crate) bindings: HashMap<KeyId, Binding>,
}

impl Overrides {
	/// Creates an empty override set.
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds an override for `K`, builder style.
	#[must_use]
	pub fn with<K: DependencyKey>(mut self, value: K::Value) -> Self {
		self.set::<K>(value);
		self
	}

	/// Adds an override for `K`.
	pub fn set<K: DependencyKey>(&mut self, value: K::Value) -> &mut Self {
		self.bindings.insert(KeyId::of::<K>(), Binding::new::<K>(value));
		self
	}

	/// Removes a pending override for `K`.
	pub fn remove<K: DependencyKey>(&mut self) -> bool {
		self.bindings.remove(&KeyId::of::<K>()).is_some()
	}

	/// Returns the pending override for `K`, if any.
	pub fn get<K: DependencyKey>(&self) -> Option<&K::Value> {
		self.bindings.get(&KeyId::of::<K>()).and_then(Binding::downcast::<K>)
	}

	/// Returns whether `K` is overridden by this set.
	pub fn contains<K: DependencyKey>(&self) -> bool {
		self.bindings.contains_key(&KeyId::of::<K>())
	}

	/// Number of overridden keys.
	pub fn len(&self) -> usize {
		self.bindings.len()
	}

	/// Returns `true` if no key is overridden.
	pub fn is_empty(&self) -> bool {
		self.bindings.is_empty()
	}

	/// Iterates over the overridden keys in unspecified order.
	pub fn keys(&self) -> impl Iterator<Item = KeyId> + '_ {
		self.bindings.keys().copied()
	}

	/// Checks that every overridden key has a default.
	pub(crate) fn validate(&self) -> Result<()> {
		self.bindings.values().try_for_each(|binding| (binding.ensure_declared)())
	}
}

impl fmt::Debug for Overrides {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_set().entries(self.bindings.keys()).finish()
	}
}

/// Mutable view of the dependencies a scope will run with.
///
/// Handed to the configuration closure of
/// [`with_dependencies`](crate::with_dependencies). Reads see pending
/// overrides first, then the snapshot the scope is layered on, then defaults.
pub struct DependencyValues {
	base: BindingSnapshot,
	overrides: Overrides,
}

impl DependencyValues {
	pub(crate) fn new(base: BindingSnapshot) -> Self {
		Self {
			base,
			overrides: Overrides::new(),
		}
	}

	/// Returns the value `K` will have inside the scope.
	pub fn get<K: DependencyKey>(&self) -> Result<K::Value> {
		match self.overrides.get::<K>() {
			Some(value) => Ok(value.clone()),
			None => self.base.resolve::<K>(),
		}
	}

	/// Overrides `K` for the scope.
	pub fn set<K: DependencyKey>(&mut self, value: K::Value) -> &mut Self {
		self.overrides.set::<K>(value);
		self
	}

	/// Returns the pending override set.
	pub fn overrides(&self) -> &Overrides {
		&self.overrides
	}

	pub(crate) fn into_parts(self) -> (BindingSnapshot, Overrides) {
		(self.base, self.overrides)
	}
}

impl fmt::Debug for DependencyValues {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("DependencyValues").field("base", &self.base).field("overrides", &self.overrides).finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::DependencyError;

	crate::dependency_key! {
		struct Name: String = "anon".to_string();
		struct Count: u32 = 0;
		struct Unset: u32;
	}

	#[test]
	fn last_set_wins() {
		let overrides = Overrides::new().with::<Count>(1).with::<Count>(2);
		assert_eq!(overrides.len(), 1);
		assert_eq!(overrides.get::<Count>(), Some(&2));
	}

	#[test]
	fn remove_drops_pending_value() {
		let mut overrides = Overrides::new().with::<Name>("x".into());
		assert!(overrides.remove::<Name>());
		assert!(!overrides.remove::<Name>());
		assert!(overrides.is_empty());
	}

	#[test]
	fn validate_reports_undeclared_key() {
		let overrides = Overrides::new().with::<Count>(1).with::<Unset>(5);
		assert_eq!(overrides.validate(), Err(DependencyError::Undeclared { key: "Unset" }));
	}

	#[test]
	fn values_read_through_pending_then_base() {
		let base = BindingSnapshot::empty().layer(Overrides::new().with::<Count>(3));
		let mut values = DependencyValues::new(base);
		assert_eq!(values.get::<Count>(), Ok(3));
		assert_eq!(values.get::<Name>(), Ok("anon".to_string()));

		values.set::<Name>("set".into());
		assert_eq!(values.get::<Name>(), Ok("set".to_string()));
		assert!(values.overrides().contains::<Name>());
		assert!(!values.overrides().contains::<Count>());
	}
}
