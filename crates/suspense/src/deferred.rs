//! Single-threaded settle-once values that renders can wait on.

use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::rc::Rc;

use crate::error::{Raised, RenderError};

type OnFulfilled<T> = Box<dyn FnOnce(&T)>;
type OnRejected = Box<dyn FnOnce(&RenderError)>;

enum Slot<T> {
	Pending(Vec<(OnFulfilled<T>, OnRejected)>),
	Fulfilled(Rc<T>),
	Rejected(RenderError),
}

struct Shared<T> {
	slot: RefCell<Slot<T>>,
}

impl<T> Shared<T> {
	/// Stores the outcome and hands back the callbacks that were waiting on it.
	fn settle(&self, outcome: Slot<T>) -> Option<Vec<(OnFulfilled<T>, OnRejected)>> {
		let mut slot = self.slot.borrow_mut();
		let callbacks = match &mut *slot {
			Slot::Pending(callbacks) => std::mem::take(callbacks),
			Slot::Fulfilled(_) | Slot::Rejected(_) => return None,
		};
		*slot = outcome;
		Some(callbacks)
	}

	fn then(&self, on_fulfilled: OnFulfilled<T>, on_rejected: OnRejected) {
		let settled = {
			let mut slot = self.slot.borrow_mut();
			match &mut *slot {
				Slot::Pending(callbacks) => {
					callbacks.push((on_fulfilled, on_rejected));
					return;
				}
				Slot::Fulfilled(value) => Ok(Rc::clone(value)),
				Slot::Rejected(err) => Err(err.clone()),
			}
		};
		match settled {
			Ok(value) => on_fulfilled(&value),
			Err(err) => on_rejected(&err),
		}
	}

	fn state(&self) -> DeferredState {
		match &*self.slot.borrow() {
			Slot::Pending(_) => DeferredState::Pending,
			Slot::Fulfilled(_) => DeferredState::Fulfilled,
			Slot::Rejected(_) => DeferredState::Rejected,
		}
	}
}

/// Settlement state of a [`Deferred`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferredState {
	/// Not settled yet.
	Pending,
	/// Settled with a value.
	Fulfilled,
	/// Settled with an error.
	Rejected,
}

/// Asynchronous value with two-outcome, settle-once semantics.
///
/// Handles are cheap to clone and share one underlying cell. Callbacks
/// registered with [`Deferred::then`] run exactly once, synchronously on the
/// thread that settles the value, or immediately when registered after
/// settlement. No internal borrow is held while a callback runs.
pub struct Deferred<T> {
	shared: Rc<Shared<T>>,
}

impl<T> Clone for Deferred<T> {
	fn clone(&self) -> Self {
		Self {
			shared: Rc::clone(&self.shared),
		}
	}
}

impl<T> fmt::Debug for Deferred<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Deferred").field("state", &self.shared.state()).finish()
	}
}

impl<T: 'static> Default for Deferred<T> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T: 'static> Deferred<T> {
	/// Creates an unsettled value.
	pub fn new() -> Self {
		Self {
			shared: Rc::new(Shared {
				slot: RefCell::new(Slot::Pending(Vec::new())),
			}),
		}
	}

	/// Creates a value that is already fulfilled.
	pub fn resolved(value: T) -> Self {
		let deferred = Self::new();
		deferred.resolve(value);
		deferred
	}

	/// Creates a value that is already rejected.
	pub fn rejected(err: RenderError) -> Self {
		let deferred = Self::new();
		deferred.reject(err);
		deferred
	}

	/// Drives `future` on the current tokio `LocalSet` and settles the
	/// returned value with its output.
	///
	/// # Panics
	///
	/// Panics when called outside a `LocalSet` context.
	pub fn spawn_local<F>(future: F) -> Self
	where
		F: Future<Output = Result<T, RenderError>> + 'static,
	{
		let deferred = Self::new();
		let settle = deferred.clone();
		tokio::task::spawn_local(async move {
			match future.await {
				Ok(value) => settle.resolve(value),
				Err(err) => settle.reject(err),
			};
		});
		deferred
	}

	/// Fulfills the value. Returns `false` if it was already settled.
	pub fn resolve(&self, value: T) -> bool {
		let value = Rc::new(value);
		let Some(callbacks) = self.shared.settle(Slot::Fulfilled(Rc::clone(&value))) else {
			return false;
		};
		for (on_fulfilled, _) in callbacks {
			on_fulfilled(&value);
		}
		true
	}

	/// Rejects the value. Returns `false` if it was already settled.
	pub fn reject(&self, err: RenderError) -> bool {
		let Some(callbacks) = self.shared.settle(Slot::Rejected(err.clone())) else {
			return false;
		};
		for (_, on_rejected) in callbacks {
			on_rejected(&err);
		}
		true
	}

	/// Registers one callback per outcome.
	pub fn then(&self, on_fulfilled: impl FnOnce(&T) + 'static, on_rejected: impl FnOnce(&RenderError) + 'static) {
		self.shared.then(Box::new(on_fulfilled), Box::new(on_rejected));
	}

	/// Returns the settlement state.
	pub fn state(&self) -> DeferredState {
		self.shared.state()
	}

	/// Returns true until the value settles.
	pub fn is_pending(&self) -> bool {
		self.state() == DeferredState::Pending
	}

	/// Returns the fulfilled value, if any.
	pub fn value(&self) -> Option<Rc<T>> {
		match &*self.shared.slot.borrow() {
			Slot::Fulfilled(value) => Some(Rc::clone(value)),
			Slot::Pending(_) | Slot::Rejected(_) => None,
		}
	}

	/// Returns a type-erased handle suitable for raising from a render.
	pub fn wait_signal(&self) -> WaitSignal {
		let settle: Rc<dyn Settle> = self.shared.clone();
		WaitSignal(settle)
	}
}

/// Type-erased settle registration.
///
/// This is the capability that distinguishes a wait from an ordinary error.
pub trait Settle {
	/// Registers a callback for each outcome. Exactly one of them runs.
	fn on_settle(&self, on_fulfilled: Box<dyn FnOnce()>, on_rejected: Box<dyn FnOnce()>);

	/// Returns true until the underlying value settles.
	fn is_pending(&self) -> bool;
}

impl<T: 'static> Settle for Shared<T> {
	fn on_settle(&self, on_fulfilled: Box<dyn FnOnce()>, on_rejected: Box<dyn FnOnce()>) {
		self.then(Box::new(move |_| on_fulfilled()), Box::new(move |_| on_rejected()));
	}

	fn is_pending(&self) -> bool {
		self.state() == DeferredState::Pending
	}
}

/// Handle to an unsettled value a render is waiting on.
#[derive(Clone)]
pub struct WaitSignal(Rc<dyn Settle>);

impl WaitSignal {
	/// Wraps any settle-capable value.
	pub fn new(settle: Rc<dyn Settle>) -> Self {
		Self(settle)
	}

	/// Registers a callback for each outcome.
	pub fn on_settle(&self, on_fulfilled: impl FnOnce() + 'static, on_rejected: impl FnOnce() + 'static) {
		self.0.on_settle(Box::new(on_fulfilled), Box::new(on_rejected));
	}

	/// Returns true until the underlying value settles.
	pub fn is_pending(&self) -> bool {
		self.0.is_pending()
	}

	/// Returns true when both handles refer to the same underlying value.
	pub fn same(&self, other: &WaitSignal) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}
}

impl fmt::Debug for WaitSignal {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("WaitSignal").field(&Rc::as_ptr(&self.0)).finish()
	}
}

impl<T: 'static> From<Deferred<T>> for Raised {
	fn from(deferred: Deferred<T>) -> Self {
		Self::Waiting(deferred.wait_signal())
	}
}

impl<T: 'static> From<&Deferred<T>> for Raised {
	fn from(deferred: &Deferred<T>) -> Self {
		Self::Waiting(deferred.wait_signal())
	}
}
