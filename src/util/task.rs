//! Background execution with handles that can be waited on, polled,
//! cancelled before they start, or given completion callbacks.

use std::{
	any::Any,
	panic::{self, AssertUnwindSafe},
	sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError},
};

use crate::{McError, McResult};

pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Something that runs jobs, usually on another thread.
pub trait Executor: Send + Sync {
	fn execute(&self, job: Job);
}

impl Executor for rayon::ThreadPool {
	fn execute(&self, job: Job) {
		self.spawn(job);
	}
}

/// Runs each job on the calling thread before `execute` returns.
#[derive(Debug, Clone, Copy, Default)]
pub struct Inline;

impl Executor for Inline {
	fn execute(&self, job: Job) {
		job();
	}
}

/// Builds a rayon pool whose threads are named `{prefix}-{index}`.
pub fn thread_pool(threads: usize, prefix: &str) -> McResult<rayon::ThreadPool> {
	let prefix = prefix.to_owned();
	rayon::ThreadPoolBuilder::new()
		.num_threads(threads)
		.thread_name(move |index| format!("{prefix}-{index}"))
		.build()
		.map_err(|err| McError::Custom(format!("Failed to build thread pool: {err}")))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
	Queued,
	Running,
	Finished,
	Cancelled,
}

type Callback<T> = Box<dyn FnOnce(&McResult<T>) + Send + 'static>;

struct State<T> {
	status: Status,
	result: Option<McResult<T>>,
	callbacks: Vec<Callback<T>>,
}

struct Shared<T> {
	state: Mutex<State<T>>,
	done: Condvar,
}

impl<T> Shared<T> {
	fn lock(&self) -> MutexGuard<'_, State<T>> {
		self.state.lock().unwrap_or_else(PoisonError::into_inner)
	}

	/// Runs the callbacks and publishes the result. Callbacks run while
	/// the lock is held so that none can be registered in between.
	fn complete(&self, mut state: MutexGuard<'_, State<T>>, status: Status, result: McResult<T>) {
		for callback in state.callbacks.drain(..) {
			callback(&result);
		}
		state.status = status;
		state.result = Some(result);
		drop(state);
		self.done.notify_all();
	}
}

/// The pending result of a submitted task.
pub struct TaskHandle<T> {
	shared: Arc<Shared<T>>,
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
	if let Some(message) = payload.downcast_ref::<&str>() {
		(*message).to_owned()
	} else if let Some(message) = payload.downcast_ref::<String>() {
		message.clone()
	} else {
		String::from("unknown panic")
	}
}

/// Queues `task` on `executor`. A panic inside the task is turned into
/// [McError::TaskPanicked].
pub fn submit<T, F>(executor: &dyn Executor, task: F) -> TaskHandle<T>
where
T: Send + 'static,
F: FnOnce() -> McResult<T> + Send + 'static {
	let shared = Arc::new(Shared {
		state: Mutex::new(State {
			status: Status::Queued,
			result: None,
			callbacks: Vec::new(),
		}),
		done: Condvar::new(),
	});
	let job_shared = Arc::clone(&shared);
	executor.execute(Box::new(move || {
		{
			let mut state = job_shared.lock();
			if state.status == Status::Cancelled {
				return;
			}
			state.status = Status::Running;
		}
		let result = panic::catch_unwind(AssertUnwindSafe(task))
			.unwrap_or_else(|payload| Err(McError::TaskPanicked(panic_message(payload.as_ref()))));
		let state = job_shared.lock();
		job_shared.complete(state, Status::Finished, result);
	}));
	TaskHandle { shared }
}

impl<T> TaskHandle<T> {
	/// Blocks until the task has finished or been cancelled.
	pub fn wait(self) -> McResult<T> {
		let mut state = self.shared.lock();
		loop {
			if let Some(result) = state.result.take() {
				return result;
			}
			state = self.shared.done.wait(state).unwrap_or_else(PoisonError::into_inner);
		}
	}

	/// Takes the result if the task is done.
	pub fn try_take(&mut self) -> Option<McResult<T>> {
		self.shared.lock().result.take()
	}

	pub fn is_done(&self) -> bool {
		matches!(self.shared.lock().status, Status::Finished | Status::Cancelled)
	}

	pub fn is_cancelled(&self) -> bool {
		self.shared.lock().status == Status::Cancelled
	}

	/// Registers a callback that receives the result once the task
	/// completes. If it already has, the callback runs immediately, and
	/// gets [McError::ResultTaken] when the result was taken before.
	pub fn on_complete<F>(&self, callback: F)
	where F: FnOnce(&McResult<T>) + Send + 'static {
		let mut state = self.shared.lock();
		match (state.result.as_ref(), state.status) {
			(Some(result), _) => callback(result),
			(None, Status::Finished | Status::Cancelled) => callback(&Err(McError::ResultTaken)),
			(None, _) => state.callbacks.push(Box::new(callback)),
		}
	}

	/// Cancels the task if it has not started yet. Returns whether it
	/// was cancelled.
	pub fn cancel(&self) -> bool {
		let state = self.shared.lock();
		if state.status != Status::Queued {
			return false;
		}
		self.shared.complete(state, Status::Cancelled, Err(McError::Cancelled));
		true
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::{AtomicUsize, Ordering};
	use std::sync::mpsc;

	#[test]
	fn callbacks_after_the_result_was_taken() {
		let mut handle = submit(&Inline, || Ok(5));
		assert_eq!(handle.try_take().unwrap().unwrap(), 5);
		let (sender, receiver) = mpsc::channel();
		handle.on_complete(move |result| {
			sender.send(matches!(result, Err(McError::ResultTaken))).unwrap();
		});
		assert!(receiver.try_recv().unwrap());
		assert!(handle.try_take().is_none());
	}

	#[test]
	fn inline_runs_immediately() {
		let handle = submit(&Inline, || Ok(21 * 2));
		assert!(handle.is_done());
		assert_eq!(handle.wait().unwrap(), 42);
	}

	#[test]
	fn pool_results_and_callbacks() {
		let pool = thread_pool(2, "test-worker").unwrap();
		let calls = Arc::new(AtomicUsize::new(0));
		let handles: Vec<_> = (0..8u64).map(|n| {
			let handle = submit(&pool, move || Ok(n * n));
			let calls = Arc::clone(&calls);
			handle.on_complete(move |result| {
				assert!(result.is_ok());
				calls.fetch_add(1, Ordering::SeqCst);
			});
			handle
		}).collect();
		let results: Vec<u64> = handles.into_iter().map(|handle| handle.wait().unwrap()).collect();
		assert_eq!(results, [0, 1, 4, 9, 16, 25, 36, 49]);
		assert_eq!(calls.load(Ordering::SeqCst), 8);
	}

	#[test]
	fn panics_become_errors() {
		let handle = submit(&Inline, || -> McResult<()> { panic!("boom") });
		assert!(matches!(handle.wait(), Err(McError::TaskPanicked(message)) if message == "boom"));
	}

	#[test]
	fn queued_task_can_be_cancelled() {
		let pool = thread_pool(1, "cancel-worker").unwrap();
		let (release, gate) = mpsc::channel::<()>();
		let blocker = submit(&pool, move || {
			gate.recv().ok();
			Ok(())
		});
		let ran = Arc::new(AtomicUsize::new(0));
		let ran_in_task = Arc::clone(&ran);
		let queued = submit(&pool, move || {
			ran_in_task.fetch_add(1, Ordering::SeqCst);
			Ok(())
		});
		assert!(queued.cancel());
		assert!(!queued.cancel());
		assert!(queued.is_cancelled());
		release.send(()).unwrap();
		blocker.wait().unwrap();
		assert!(matches!(queued.wait(), Err(McError::Cancelled)));
		// Give the pool a chance to pick up the cancelled job.
		let later = submit(&pool, || Ok(()));
		later.wait().unwrap();
		assert_eq!(ran.load(Ordering::SeqCst), 0);
	}

	#[test]
	fn callback_after_completion_runs_immediately() {
		let mut handle = submit(&Inline, || Ok("done"));
		let (sender, receiver) = mpsc::channel();
		handle.on_complete(move |result| {
			sender.send(*result.as_ref().unwrap()).unwrap();
		});
		assert_eq!(receiver.try_recv().unwrap(), "done");
		assert_eq!(handle.try_take().unwrap().unwrap(), "done");
	}
}
