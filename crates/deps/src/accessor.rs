//! Reading dependencies on the current path.

use std::fmt;
use std::marker::PhantomData;

use crate::error::Result;
use crate::key::DependencyKey;
use crate::scope::current;

/// Returns the value of `K` on the calling path.
///
/// # Panics
///
/// Panics if `K` has neither an override nor a declared default. That is a
/// startup configuration mistake; use [`try_read`] to observe it as an error.
pub fn read<K: DependencyKey>() -> K::Value {
	match try_read::<K>() {
		Ok(value) => value,
		Err(err) => panic!("{err}"),
	}
}

/// Returns the value of `K` on the calling path, or the configuration error.
pub fn try_read<K: DependencyKey>() -> Result<K::Value> {
	current().resolve::<K>()
}

/// Returns whether an enclosing scope on the calling path overrides `K`.
pub fn is_overridden<K: DependencyKey>() -> bool {
	current().contains::<K>()
}

/// Zero-sized handle that resolves `K` each time it is accessed.
///
/// Holding a `Dependency` does not pin a value: the same handle reads
/// different values inside and outside a scope.
pub struct Dependency<K> {
	_key: PhantomData<fn() -> K>,
}

impl<K: DependencyKey> Dependency<K> {
	/// Creates a handle for `K`.
	pub const fn new() -> Self {
		Self { _key: PhantomData }
	}

	/// Resolves the current value.
	///
	/// # Panics
	///
	/// Panics under the same conditions as [`read`].
	pub fn value(&self) -> K::Value {
		read::<K>()
	}

	/// Resolves the current value, reporting a missing default as an error.
	pub fn try_value(&self) -> Result<K::Value> {
		try_read::<K>()
	}
}

impl<K: DependencyKey> Default for Dependency<K> {
	fn default() -> Self {
		Self::new()
	}
}

impl<K> Clone for Dependency<K> {
	fn clone(&self) -> Self {
		*self
	}
}

impl<K> Copy for Dependency<K> {}

impl<K: DependencyKey> fmt::Debug for Dependency<K> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Dependency").field(&K::NAME).finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::overrides::Overrides;
	use crate::scope::with_overrides;

	crate::dependency_key! {
		struct Greeting: &'static str = "hello";
		struct Port: u16;
	}

	struct Client {
		greeting: Dependency<Greeting>,
	}

	#[test]
	fn handle_resolves_at_access_time() {
		let client = Client { greeting: Dependency::new() };
		assert_eq!(client.greeting.value(), "hello");

		let inside = with_overrides(Overrides::new().with::<Greeting>("hi"), || client.greeting.value()).unwrap();
		assert_eq!(inside, "hi");
		assert_eq!(client.greeting.value(), "hello");
	}

	#[test]
	fn is_overridden_tracks_scope() {
		assert!(!is_overridden::<Greeting>());
		with_overrides(Overrides::new().with::<Greeting>("x"), || assert!(is_overridden::<Greeting>())).unwrap();
	}

	#[test]
	fn try_read_reports_missing_default() {
		let port: Dependency<Port> = Dependency::default();
		assert!(port.try_value().is_err());
	}

	#[test]
	#[should_panic(expected = "dependency `Port` has no declared default value")]
	fn read_panics_on_missing_default() {
		let _ = read::<Port>();
	}
}
