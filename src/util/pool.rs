use std::{
	ops::{Deref, DerefMut},
	sync::{Condvar, Mutex, MutexGuard, PoisonError},
};

use crate::{McError, McResult};

struct Slots<T> {
	idle: Vec<T>,
	/// Values created and not yet dropped.
	live: usize,
}

/// A bounded stack of reusable values, such as compression contexts.
///
/// A growable pool creates values on demand when it is empty, and keeps
/// at most `capacity` idle values once they are returned. A fixed pool
/// never has more than `capacity` values alive, so [Pool::get] waits for
/// one to come back and [Pool::try_get] fails with
/// [McError::PoolExhausted].
pub struct Pool<T> {
	slots: Mutex<Slots<T>>,
	returned: Condvar,
	factory: Box<dyn Fn() -> T + Send + Sync>,
	capacity: usize,
	growable: bool,
}

/// Exclusive access to a pooled value. The value goes back to the
/// pool when the guard is dropped.
pub struct PoolGuard<'a, T> {
	pool: &'a Pool<T>,
	item: Option<T>,
}

impl<T> Pool<T> {
	pub fn new<F: Fn() -> T + Send + Sync + 'static>(capacity: usize, factory: F) -> Self {
		Self::with_growth(capacity, true, factory)
	}

	/// A pool that never holds more than `capacity` values.
	pub fn fixed<F: Fn() -> T + Send + Sync + 'static>(capacity: usize, factory: F) -> Self {
		Self::with_growth(capacity, false, factory)
	}

	fn with_growth<F: Fn() -> T + Send + Sync + 'static>(capacity: usize, growable: bool, factory: F) -> Self {
		Self {
			slots: Mutex::new(Slots {
				idle: Vec::with_capacity(capacity),
				live: 0,
			}),
			returned: Condvar::new(),
			factory: Box::new(factory),
			capacity,
			growable,
		}
	}

	fn lock(&self) -> MutexGuard<'_, Slots<T>> {
		self.slots.lock().unwrap_or_else(PoisonError::into_inner)
	}

	fn guard(&self, item: T) -> PoolGuard<'_, T> {
		PoolGuard {
			pool: self,
			item: Some(item),
		}
	}

	/// Takes an idle value or creates one, if the pool may grow.
	fn take(&self, slots: &mut Slots<T>) -> Option<T> {
		if let Some(item) = slots.idle.pop() {
			return Some(item);
		}
		if self.growable || slots.live < self.capacity {
			slots.live += 1;
			log::trace!("pool created value {} of {}", slots.live, self.capacity);
			return Some((self.factory)());
		}
		None
	}

	/// Takes an idle value, or creates a new one. A fixed pool that has
	/// handed out all of its values blocks until one is returned.
	pub fn get(&self) -> PoolGuard<'_, T> {
		let mut slots = self.lock();
		loop {
			if let Some(item) = self.take(&mut slots) {
				return self.guard(item);
			}
			slots = self.returned.wait(slots).unwrap_or_else(PoisonError::into_inner);
		}
	}

	/// Like [Pool::get], but fails instead of waiting.
	pub fn try_get(&self) -> McResult<PoolGuard<'_, T>> {
		let item = self.take(&mut self.lock());
		match item {
			Some(item) => Ok(self.guard(item)),
			None => Err(McError::PoolExhausted(self.capacity)),
		}
	}

	/// The number of values waiting to be reused.
	pub fn idle_count(&self) -> usize {
		self.lock().idle.len()
	}

	pub fn capacity(&self) -> usize {
		self.capacity
	}

	pub fn is_growable(&self) -> bool {
		self.growable
	}

	fn give_back(&self, item: T) {
		let mut slots = self.lock();
		if slots.idle.len() < self.capacity {
			slots.idle.push(item);
		} else {
			slots.live -= 1;
		}
		drop(slots);
		self.returned.notify_one();
	}
}

impl<'a, T> Deref for PoolGuard<'a, T> {
	type Target = T;

	fn deref(&self) -> &Self::Target {
		// Only None after drop.
		self.item.as_ref().unwrap_or_else(|| unreachable!())
	}
}

impl<'a, T> DerefMut for PoolGuard<'a, T> {
	fn deref_mut(&mut self) -> &mut Self::Target {
		self.item.as_mut().unwrap_or_else(|| unreachable!())
	}
}

impl<'a, T> Drop for PoolGuard<'a, T> {
	fn drop(&mut self) {
		if let Some(item) = self.item.take() {
			self.pool.give_back(item);
		}
	}
}
