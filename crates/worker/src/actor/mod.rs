//! Serialized actors.
//!
//! An actor owns a state value and applies jobs to it one at a time, in
//! mailbox order, on its own execution path. That path starts from process
//! defaults unless the actor is spawned with [`Propagation::Inherit`], in
//! which case it starts from the spawner's snapshot. Jobs never see the
//! caller's overrides, and overrides a job enters end with that job.

mod global;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use linktape_deps::{DependencyFutureExt, Propagation};
use thiserror::Error;
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub use self::global::{GlobalActor, MainActor, main_actor};
use crate::TaskClass;
use crate::runtime::{current_handle, global_handle};

/// A pinned, boxed future that is required to be Send.
pub type BoxFutureSend<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

type Job<S> = Box<dyn for<'a> FnOnce(&'a mut S) -> BoxFutureSend<'a, ()> + Send>;

fn boxed<S, F>(job: F) -> Job<S>
where
	F: for<'a> FnOnce(&'a mut S) -> BoxFutureSend<'a, ()> + Send + 'static,
{
	Box::new(job)
}

/// Error returned when a job cannot be completed by an actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ActorError {
	/// The actor has stopped and no longer accepts jobs.
	#[error("actor mailbox closed")]
	Closed,
	/// The actor stopped before the job produced a result.
	#[error("actor dropped the job before replying")]
	Dropped,
}

/// Why an actor's run loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ActorExitKind {
	/// The mailbox was closed and drained.
	MailboxClosed,
	/// The actor was cancelled or shut down immediately.
	Cancelled,
	/// A job panicked.
	Panicked,
	/// The run loop was torn down by its runtime.
	Aborted,
}

/// Mailbox sizing for actors.
#[derive(Debug, Clone)]
pub struct ActorMailboxSpec {
	pub(crate) capacity: usize,
}

impl ActorMailboxSpec {
	/// Creates a mailbox spec with the given capacity.
	///
	/// # Panics
	///
	/// Panics if `capacity` is zero.
	#[must_use]
	pub fn with_capacity(capacity: usize) -> Self {
		assert!(capacity > 0, "mailbox capacity must be > 0");
		Self { capacity }
	}
}

impl Default for ActorMailboxSpec {
	fn default() -> Self {
		Self { capacity: 128 }
	}
}

/// Shutdown mode for actors.
#[derive(Debug, Clone, Copy)]
pub enum ActorShutdownMode {
	/// Cancel the running job and discard queued ones.
	Immediate,
	/// Stop accepting jobs and finish the queued ones, cancelling after `timeout`.
	Graceful { timeout: Duration },
}

/// Outcome of one [`ActorHandle::shutdown`] call.
#[derive(Debug, Clone)]
pub struct ActorShutdownReport {
	completed: bool,
	timed_out: bool,
	last_exit: Option<ActorExitKind>,
}

impl ActorShutdownReport {
	/// Returns `true` if the run loop ended before the call returned.
	pub fn completed(&self) -> bool {
		self.completed
	}

	/// Returns `true` if a graceful shutdown hit its timeout.
	pub fn timed_out(&self) -> bool {
		self.timed_out
	}

	/// Returns why the run loop ended, if it has.
	pub fn last_exit(&self) -> Option<ActorExitKind> {
		self.last_exit
	}
}

/// Configuration for one actor.
pub struct ActorSpec<S> {
	name: String,
	class: TaskClass,
	mailbox: ActorMailboxSpec,
	propagation: Propagation,
	global: bool,
	state: S,
}

impl<S> ActorSpec<S>
where
	S: Send + 'static,
{
	/// Creates a spec for an actor owning `state`, isolated from its spawner.
	pub fn new(name: impl Into<String>, state: S) -> Self {
		Self {
			name: name.into(),
			class: TaskClass::Actor,
			mailbox: ActorMailboxSpec::default(),
			propagation: Propagation::Isolate,
			global: false,
			state,
		}
	}

	/// Sets the class used to label the actor's trace events.
	#[must_use]
	pub fn class(mut self, class: TaskClass) -> Self {
		self.class = class;
		self
	}

	/// Sets the mailbox capacity.
	#[must_use]
	pub fn mailbox(mut self, mailbox: ActorMailboxSpec) -> Self {
		self.mailbox = mailbox;
		self
	}

	/// Sets where the actor's path takes its starting snapshot from.
	#[must_use]
	pub fn propagation(mut self, propagation: Propagation) -> Self {
		self.propagation = propagation;
		self
	}

	/// Runs the actor on the process-wide runtime instead of the caller's.
	#[must_use]
	pub fn on_global_runtime(mut self) -> Self {
		self.global = true;
		self
	}
}

/// Handle for one actor.
///
/// Dropping the handle cancels the actor.
pub struct ActorHandle<S> {
	name: String,
	class: TaskClass,
	tx: mpsc::Sender<Job<S>>,
	drain: CancellationToken,
	cancel: CancellationToken,
	last_exit: Arc<Mutex<Option<ActorExitKind>>>,
	monitor: Mutex<Option<JoinHandle<()>>>,
}

impl<S> Drop for ActorHandle<S> {
	fn drop(&mut self) {
		self.cancel.cancel();
	}
}

impl<S> ActorHandle<S>
where
	S: Send + 'static,
{
	/// Actor name.
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Worker class.
	pub const fn class(&self) -> TaskClass {
		self.class
	}

	/// Returns `true` once the actor no longer accepts jobs.
	pub fn is_closed(&self) -> bool {
		self.tx.is_closed()
	}

	/// Runs `job` against the actor's state and returns its result.
	///
	/// The job runs on the actor's path, after every job queued before it.
	pub async fn run<R, F>(&self, job: F) -> Result<R, ActorError>
	where
		F: FnOnce(&mut S) -> R + Send + 'static,
		R: Send + 'static,
	{
		let (reply, result) = oneshot::channel();
		self.submit(boxed::<S, _>(move |state| {
			let _ = reply.send(job(state));
			Box::pin(std::future::ready(()))
		}))
		.await?;
		result.await.map_err(|_| ActorError::Dropped)
	}

	/// Runs an async `job` against the actor's state and returns its result.
	///
	/// The actor takes no other job until the returned future completes.
	pub async fn run_async<R, F>(&self, job: F) -> Result<R, ActorError>
	where
		F: for<'a> FnOnce(&'a mut S) -> BoxFutureSend<'a, R> + Send + 'static,
		R: Send + 'static,
	{
		let (reply, result) = oneshot::channel();
		self.submit(boxed::<S, _>(move |state| {
			Box::pin(async move {
				let _ = reply.send(job(state).await);
			})
		}))
		.await?;
		result.await.map_err(|_| ActorError::Dropped)
	}

	async fn submit(&self, job: Job<S>) -> Result<(), ActorError> {
		tracing::trace!(
			actor = %self.name,
			worker_class = self.class.as_str(),
			pending = self.tx.max_capacity() - self.tx.capacity(),
			"worker.actor.job"
		);
		self.tx.send(job).await.map_err(|_| ActorError::Closed)
	}

	/// Requests cancellation. The running job is dropped at its next suspension point.
	pub fn cancel(&self) {
		self.cancel.cancel();
	}

	/// Returns why the run loop ended, if it has.
	pub async fn last_exit(&self) -> Option<ActorExitKind> {
		*self.last_exit.lock().await
	}

	/// Shuts down this actor.
	pub async fn shutdown(&self, mode: ActorShutdownMode) -> ActorShutdownReport {
		let completed = match mode {
			ActorShutdownMode::Immediate => {
				self.cancel.cancel();
				self.join(None).await
			}
			ActorShutdownMode::Graceful { timeout } => {
				self.drain.cancel();
				let completed = self.join(Some(timeout)).await;
				if !completed {
					tracing::warn!(actor = %self.name, "graceful shutdown timed out; cancelling");
					self.cancel.cancel();
				}
				completed
			}
		};
		ActorShutdownReport {
			completed,
			timed_out: !completed,
			last_exit: self.last_exit().await,
		}
	}

	async fn join(&self, timeout: Option<Duration>) -> bool {
		let mut monitor = self.monitor.lock().await;
		let Some(handle) = monitor.as_mut() else {
			return true;
		};
		let finished = match timeout {
			None => {
				let _ = handle.await;
				true
			}
			Some(timeout) => tokio::time::timeout(timeout, handle).await.is_ok(),
		};
		if finished {
			*monitor = None;
		}
		finished
	}
}

/// Spawns an actor.
///
/// The actor's starting snapshot is captured here, from the calling path,
/// according to [`ActorSpec::propagation`].
pub fn spawn_actor<S>(spec: ActorSpec<S>) -> ActorHandle<S>
where
	S: Send + 'static,
{
	let ActorSpec {
		name,
		class,
		mailbox,
		propagation,
		global,
		state,
	} = spec;

	let (tx, rx) = mpsc::channel(mailbox.capacity);
	let drain = CancellationToken::new();
	let cancel = CancellationToken::new();
	let last_exit = Arc::new(Mutex::new(None));
	let runtime = if global { global_handle() } else { current_handle() };

	tracing::trace!(
		actor = %name,
		worker_class = class.as_str(),
		propagation = propagation.as_str(),
		capacity = mailbox.capacity,
		"worker.actor.spawn"
	);

	let child = runtime.spawn(run_actor(state, rx, drain.clone(), cancel.clone()).propagated(propagation));
	let task_name = name.clone();
	let task_exit = Arc::clone(&last_exit);
	let monitor = runtime.spawn(async move {
		let kind = match child.await {
			Ok(kind) => kind,
			Err(err) if err.is_panic() => ActorExitKind::Panicked,
			Err(_) => ActorExitKind::Aborted,
		};
		*task_exit.lock().await = Some(kind);
		tracing::debug!(actor = %task_name, worker_class = class.as_str(), exit = ?kind, "worker.actor.exit");
	});

	ActorHandle {
		name,
		class,
		tx,
		drain,
		cancel,
		last_exit,
		monitor: Mutex::new(Some(monitor)),
	}
}

async fn run_actor<S>(mut state: S, mut rx: mpsc::Receiver<Job<S>>, drain: CancellationToken, cancel: CancellationToken) -> ActorExitKind {
	let mut draining = false;
	loop {
		let job = tokio::select! {
			biased;
			_ = cancel.cancelled() => return ActorExitKind::Cancelled,
			_ = drain.cancelled(), if !draining => {
				draining = true;
				rx.close();
				continue;
			}
			job = rx.recv() => match job {
				Some(job) => job,
				None => return ActorExitKind::MailboxClosed,
			},
		};

		tokio::select! {
			biased;
			_ = cancel.cancelled() => return ActorExitKind::Cancelled,
			() = job(&mut state) => {}
		}
	}
}
