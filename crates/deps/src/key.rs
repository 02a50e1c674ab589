//! Dependency key declarations.

use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::registry::DefaultCell;

/// A typed slot that can be read through the accessor and overridden in a scope.
///
/// Keys are zero-sized marker types, normally generated with
/// [`dependency_key!`](crate::dependency_key). The key type itself is the
/// identity of the slot, so two keys never collide even when they share a
/// value type.
pub trait DependencyKey: Send + Sync + 'static {
	/// Type of the value stored in this slot.
	type Value: Clone + Send + Sync + 'static;

	/// Human-readable key name used in diagnostics.
	const NAME: &'static str;

	/// Process-wide cell holding the declared default.
	fn default_cell() -> &'static DefaultCell<Self::Value>;

	/// Live value installed on first use when nothing was declared explicitly.
	///
	/// Keys without a live value must be passed to [`declare`](crate::declare)
	/// before they are read or overridden.
	fn live_value() -> Option<Self::Value> {
		None
	}
}

/// Untyped identity of a [`DependencyKey`].
///
/// Equality and hashing only consider the key type; the name is carried for
/// error messages and debug output.
#[derive(Clone, Copy)]
pub struct KeyId {
	type_id: TypeId,
	name: &'static str,
}

impl KeyId {
	/// Returns the identity of key `K`.
	pub fn of<K: DependencyKey>() -> Self {
		Self {
			type_id: TypeId::of::<K>(),
			name: K::NAME,
		}
	}

	/// Returns the key name.
	pub const fn name(&self) -> &'static str {
		self.name
	}
}

impl PartialEq for KeyId {
	fn eq(&self, other: &Self) -> bool {
		self.type_id == other.type_id
	}
}

impl Eq for KeyId {}

impl Hash for KeyId {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.type_id.hash(state);
	}
}

impl fmt::Debug for KeyId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name)
	}
}

impl fmt::Display for KeyId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name)
	}
}

/// Declares one or more dependency keys.
///
/// Each entry produces a zero-sized key type. An entry with `= expr` carries a
/// live value that becomes the default on first use; an entry without one must
/// be registered with [`declare`](crate::declare) first.
///
/// ```
/// linktape_deps::dependency_key! {
/// 	/// Endpoint used by the sync client.
/// 	pub struct Endpoint: String = "https://localhost".to_string();
/// 	/// Retry budget, declared at startup.
/// 	pub struct RetryBudget: u32;
/// }
///
/// linktape_deps::declare::<RetryBudget>(3).unwrap();
/// assert_eq!(linktape_deps::read::<Endpoint>(), "https://localhost");
/// assert_eq!(linktape_deps::read::<RetryBudget>(), 3);
/// ```
#[macro_export]
macro_rules! dependency_key {
	($(
		$(#[$meta:meta])*
		$vis:vis struct $name:ident : $ty:ty $(= $live:expr)?;
	)*) => {$(
		$(#[$meta])*
		#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
		$vis struct $name;

		impl $crate::DependencyKey for $name {
			type Value = $ty;

			const NAME: &'static str = stringify!($name);

			fn default_cell() -> &'static $crate::DefaultCell<$ty> {
				static CELL: $crate::DefaultCell<$ty> = $crate::DefaultCell::new();
				&CELL
			}

			$crate::__live_value!($ty $(, $live)?);
		}
	)*};
}

#[doc(hidden)]
#[macro_export]
macro_rules! __live_value {
	($ty:ty) => {};
	($ty:ty, $live:expr) => {
		fn live_value() -> ::std::option::Option<$ty> {
			::std::option::Option::Some($live)
		}
	};
}
