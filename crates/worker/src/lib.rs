//! Execution paths that carry dependency scopes.
//!
//! Everything spawned through this crate starts from a snapshot chosen when
//! it is spawned: tasks, blocking work and threads inherit the spawner's
//! snapshot, parallel iterations inherit the caller's, and actors start from
//! process defaults unless told otherwise.

mod actor;
mod class;
mod join_set;
mod parallel;
mod runtime;
mod spawn;

pub use actor::{
	ActorError, ActorExitKind, ActorHandle, ActorMailboxSpec, ActorShutdownMode, ActorShutdownReport, ActorSpec, BoxFutureSend,
	GlobalActor, MainActor, main_actor, spawn_actor,
};
pub use class::TaskClass;
pub use join_set::WorkerJoinSet;
pub use linktape_deps::Propagation;
pub use parallel::{concurrent_perform, par_map};
pub use runtime::{RuntimeConfig, configure_runtime, current_handle, global_handle};
pub use spawn::{spawn, spawn_blocking, spawn_named_thread, spawn_thread, spawn_with};
