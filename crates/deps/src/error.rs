//! Error types for dependency declaration and scoping.

use thiserror::Error;

/// Errors raised by the dependency registry and the scoping entry points.
///
/// Every variant is a configuration error: it indicates a programming mistake
/// at the call site and is reported eagerly, before any user operation runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DependencyError {
	/// A key was read or overridden before a default value was declared for it.
	#[error("dependency `{key}` has no declared default value")]
	Undeclared {
		/// Name of the offending key.
		key: &'static str,
	},

	/// A key was declared twice while [`DuplicatePolicy::Reject`] is active.
	///
	/// [`DuplicatePolicy::Reject`]: crate::DuplicatePolicy::Reject
	#[error("dependency `{key}` already has a declared default value")]
	AlreadyDeclared {
		/// Name of the offending key.
		key: &'static str,
	},

	/// [`configure`](crate::configure) was called after the engine configuration was fixed.
	#[error("engine configuration is already fixed")]
	AlreadyConfigured,
}

/// Result type for dependency operations.
pub type Result<T> = std::result::Result<T, DependencyError>;
