//! Scoped dependency overrides.
//!
//! Dependencies are typed keys with a process-wide default. Any call tree can
//! override a set of keys for its own dynamic extent; readers on that path
//! see the override, readers anywhere else keep seeing whatever their own
//! path has active.
//!
//! - **Keys** are declared with [`dependency_key!`] and, when they carry no
//!   live value, registered with [`declare`].
//! - **Snapshots** ([`BindingSnapshot`]) are immutable layered override sets.
//! - **Scopes** ([`with_overrides`], [`with_overrides_async`]) install a new
//!   layer for the duration of an operation and restore the previous one on
//!   every exit path.
//! - **Propagation** ([`Propagation`], [`bind`], [`DependencyFutureExt`])
//!   decides what a spawned thread or task starts from.
//!
//! ```
//! use linktape_deps::{Overrides, dependency_key, read, with_overrides};
//!
//! dependency_key! {
//! 	pub struct Greeting: String = "default".to_string();
//! }
//!
//! let inside = with_overrides(Overrides::new().with::<Greeting>("override".into()), read::<Greeting>).unwrap();
//! assert_eq!(inside, "override");
//! assert_eq!(read::<Greeting>(), "default");
//! ```

mod accessor;
mod config;
mod error;
mod future;
mod key;
mod overrides;
mod propagate;
mod registry;
mod scope;
mod snapshot;

pub use accessor::{Dependency, is_overridden, read, try_read};
pub use config::{DuplicatePolicy, EngineConfig, config, configure};
pub use error::{DependencyError, Result};
pub use future::{Scoped, scoped, with_dependencies_async, with_overrides_async};
pub use key::{DependencyKey, KeyId};
pub use overrides::{DependencyValues, Overrides};
pub use propagate::{DependencyFutureExt, Propagation, bind};
pub use registry::{DefaultCell, declare, default_value, is_declared};
pub use scope::{current, with_dependencies, with_overrides, without_overrides};
pub use snapshot::BindingSnapshot;
