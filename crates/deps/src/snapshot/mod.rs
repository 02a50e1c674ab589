//! Immutable binding snapshots.
//!
//! A [`BindingSnapshot`] is the set of overrides active on one execution path
//! at one instant. Snapshots form a persistent chain of layers: entering a
//! scope pushes a new layer on top of the current snapshot without touching
//! it, so a snapshot captured by a spawned task never changes underneath it.
//!
//! # Resolution Order
//!
//! 1. The newest layer holding the key
//! 2. Older layers, towards the root
//! 3. The key's declared default

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap as HashMap;

use crate::config::config;
use crate::error::Result;
use crate::key::{DependencyKey, KeyId};
use crate::overrides::{Binding, Overrides};
use crate::registry;


struct Layer {
	bindings: HashMap<KeyId, Binding>,
	parent: Option<Arc<Layer>>,
	depth: usize,
}

impl Layer {
	fn chain(&self) -> impl Iterator<Item = &Layer> {
		std::iter::successors(Some(self), |layer| layer.parent.as_deref())
	}
}

/// Immutable mapping from keys to overriding values.
///
/// Cloning is a reference count increment. The empty snapshot resolves every
/// key to its default.
#[derive(Clone, Default)]
pub struct BindingSnapshot {
	head: Option<Arc<Layer>>,
}

impl BindingSnapshot {
	/// Returns the snapshot with no overrides.
	pub const fn empty() -> Self {
		Self { head: None }
	}

	/// Returns a new snapshot with `overrides` layered over `self`.
	///
	/// Layering an empty override set returns `self` unchanged. Chains deeper
	/// than [`EngineConfig::max_layer_depth`] are collapsed into one layer.
	///
	/// [`EngineConfig::max_layer_depth`]: crate::EngineConfig::max_layer_depth
	pub fn layer(&self, overrides: Overrides) -> Self {
		if overrides.is_empty() {
			return self.clone();
		}

		let depth = self.depth() + 1;
		let layered = Self {
			head: Some(Arc::new(Layer {
				bindings: overrides.bindings,
				parent: self.head.clone(),
				depth,
			})),
		};

		let limit = config().layer_depth_limit();
		if depth > limit {
			tracing::debug!(depth, limit, "deps.snapshot.flatten");
			return layered.flatten();
		}
		layered
	}

	/// Resolves `K` through the layers, falling back to its default.
	pub fn resolve<K: DependencyKey>(&self) -> Result<K::Value> {
		match self.lookup::<K>() {
			Some(value) => Ok(value.clone()),
			None => registry::default_value::<K>(),
		}
	}

	/// Returns the overriding value for `K`, if any layer holds one.
	pub fn lookup<K: DependencyKey>(&self) -> Option<&K::Value> {
		let key = KeyId::of::<K>();
		self.layers().find_map(|layer| layer.bindings.get(&key)).and_then(Binding::downcast::<K>)
	}

	/// Returns whether any layer overrides `K`.
	pub fn contains<K: DependencyKey>(&self) -> bool {
		let key = KeyId::of::<K>();
		self.layers().any(|layer| layer.bindings.contains_key(&key))
	}

	/// Returns `true` if no key is overridden.
	pub fn is_empty(&self) -> bool {
		self.head.is_none()
	}

	/// Number of layers in the chain.
	pub fn depth(&self) -> usize {
		self.head.as_ref().map_or(0, |layer| layer.depth)
	}

	/// Number of distinct overridden keys.
	pub fn len(&self) -> usize {
		self.keys().len()
	}

	/// Returns the distinct overridden keys, newest layer first.
	pub fn keys(&self) -> Vec<KeyId> {
		let mut keys: Vec<KeyId> = Vec::new();
		for layer in self.layers() {
			for key in layer.bindings.keys() {
				if !keys.contains(key) {
					keys.push(*key);
				}
			}
		}
		keys
	}

	/// Returns `true` if both snapshots are the same object.
	pub fn ptr_eq(&self, other: &Self) -> bool {
		match (&self.head, &other.head) {
			(Some(a), Some(b)) => Arc::ptr_eq(a, b),
			(None, None) => true,
			_ => false,
		}
	}

	/// Collapses the chain into a single layer with identical resolution.
	pub fn flatten(&self) -> Self {
		if self.depth() <= 1 {
			return self.clone();
		}

		let mut bindings = HashMap::default();
		for layer in self.layers() {
			for (key, binding) in &layer.bindings {
				bindings.entry(*key).or_insert_with(|| binding.clone());
			}
		}
		Self {
			head: Some(Arc::new(Layer {
				bindings,
				parent: None,
				depth: 1,
			})),
		}
	}

	fn layers(&self) -> impl Iterator<Item = &Layer> {
		self.head.as_deref().into_iter().flat_map(|layer| layer.chain())
	}
}

impl fmt::Debug for BindingSnapshot {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("BindingSnapshot").field("depth", &self.depth()).field("keys", &self.keys()).finish()
	}
}
