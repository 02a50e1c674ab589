//! Process-wide engine configuration.
//!
//! The configuration is fixed the first time it is read. Applications that
//! want non-default behavior call [`configure`] once during startup, before
//! any key is declared or any scope is entered.

use std::sync::OnceLock;

use crate::error::{DependencyError, Result};

static CONFIG: OnceLock<EngineConfig> = OnceLock::new();

/// Behavior when a key that already has a default is declared again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
	/// Keep the first default and treat the new declaration as a no-op.
	#[default]
	Ignore,
	/// Keep the first default and report [`DependencyError::AlreadyDeclared`].
	Reject,
}

/// Tunables for the override engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
	pub(crate) duplicate_policy: DuplicatePolicy,
	pub(crate) max_layer_depth: usize,
}

impl EngineConfig {
	/// Sets the duplicate declaration policy.
	#[must_use]
	pub fn duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
		self.duplicate_policy = policy;
		self
	}

	/// Sets the layer depth after which snapshots are flattened.
	///
	/// # Panics
	///
	/// Panics if `depth` is zero.
	#[must_use]
	pub fn max_layer_depth(mut self, depth: usize) -> Self {
		assert!(depth > 0, "max layer depth must be > 0");
		self.max_layer_depth = depth;
		self
	}

	/// Returns the duplicate declaration policy.
	pub const fn on_duplicate(&self) -> DuplicatePolicy {
		self.duplicate_policy
	}

	/// Returns the flattening threshold.
	pub const fn layer_depth_limit(&self) -> usize {
		self.max_layer_depth
	}
}

impl Default for EngineConfig {
	fn default() -> Self {
		Self {
			duplicate_policy: DuplicatePolicy::Ignore,
			max_layer_depth: 32,
		}
	}
}

/// Fixes the engine configuration for the rest of the process.
///
/// Fails with [`DependencyError::AlreadyConfigured`] if a configuration was
/// already installed or the defaults were already observed.
pub fn configure(config: EngineConfig) -> Result<()> {
	CONFIG.set(config).map_err(|_| DependencyError::AlreadyConfigured)?;
	tracing::debug!(config = ?CONFIG.get(), "deps.configure");
	Ok(())
}

/// Returns the active engine configuration, fixing the defaults on first use.
pub fn config() -> &'static EngineConfig {
	CONFIG.get_or_init(EngineConfig::default)
}
