use crate::actor::ActorHandle;

/// A process-wide singleton actor.
///
/// Global actors live on the process-wide runtime and start from process
/// defaults. Implement with [`global_actor!`](crate::global_actor).
pub trait GlobalActor: Send + Sized + 'static {
	/// Returns the shared actor, spawning it on first use.
	fn shared() -> &'static ActorHandle<Self>;
}

/// Implements [`GlobalActor`] for a type, given the expression that builds its state.
///
/// ```
/// use linktape_worker::{GlobalActor, global_actor};
///
/// #[derive(Default)]
/// struct Counter(u64);
///
/// global_actor!(Counter = Counter::default());
///
/// # linktape_worker::global_handle().block_on(async {
/// let count = Counter::shared().run(|counter| { counter.0 += 1; counter.0 }).await.unwrap();
/// assert_eq!(count, 1);
/// # });
/// ```
#[macro_export]
macro_rules! global_actor {
	($actor:ty = $init:expr) => {
		impl $crate::GlobalActor for $actor {
			fn shared() -> &'static $crate::ActorHandle<Self> {
				static SHARED: ::std::sync::OnceLock<$crate::ActorHandle<$actor>> = ::std::sync::OnceLock::new();
				SHARED.get_or_init(|| $crate::spawn_actor($crate::ActorSpec::new(::std::stringify!($actor), $init).on_global_runtime()))
			}
		}
	};
}

/// The process-wide actor for work that must be serialized across the whole program.
#[derive(Debug, Default)]
pub struct MainActor;

global_actor!(MainActor = MainActor);

/// Returns the main actor.
pub fn main_actor() -> &'static ActorHandle<MainActor> {
	MainActor::shared()
}
