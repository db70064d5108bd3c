//! Suspense boundaries.
//!
//! A boundary shows fallback content while any descendant waits on an
//! unsettled value. The subtree that was live when the first wait arrived is
//! parked untouched; the boundary renders an inert copy of it in its place so
//! the reconciler can tear the copy down without unmounting the real
//! instances. When the last wait of the episode settles the parked subtree is
//! written back into the primary slot and every waiter is forced to render
//! again, most recent first.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::Value;
use smallvec::SmallVec;

use crate::component::{
	Capabilities, Component, ComponentType, Element, InstanceHandle, InstanceRef, Props, RenderContext, RenderResult,
	StateBag,
};
use crate::deferred::WaitSignal;
use crate::delegate::{Continuation, notify_ancestor};
use crate::node::NodeRef;
use crate::snapshot::{detached_clone, strip_origin};


/// State key holding whether the boundary shows its fallback.
pub const FALLBACK_KEY: &str = "fallback";

/// Identity of one registered wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WaitSlot(u64);

impl WaitSlot {
	fn next() -> Self {
		static NEXT: AtomicU64 = AtomicU64::new(0);
		Self(NEXT.fetch_add(1, Ordering::Relaxed).wrapping_add(1))
	}
}

/// Bookkeeping of a single boundary.
///
/// Invariants: `pending_count() == 0` iff nothing is parked (unless the
/// boundary node had no primary child when the episode began), and waiters
/// are only held while an episode is running.
#[derive(Default)]
pub struct BoundaryCoordinator {
	instance: RefCell<Option<InstanceHandle>>,
	pending: Cell<usize>,
	waiters: RefCell<SmallVec<[InstanceHandle; 4]>>,
	parked: RefCell<Option<NodeRef>>,
	detach_request: RefCell<Option<NodeRef>>,
}

impl BoundaryCoordinator {
	/// Creates an idle coordinator.
	pub fn new() -> Self {
		Self::default()
	}

	/// Number of outstanding waits.
	pub fn pending_count(&self) -> usize {
		self.pending.get()
	}

	/// Number of instances to force-render when the episode ends.
	pub fn waiter_count(&self) -> usize {
		self.waiters.borrow().len()
	}

	/// Returns true while the original subtree is parked offscreen.
	pub fn is_parked(&self) -> bool {
		self.parked.borrow().is_some()
	}

	/// Returns true while the next render still has to detach the subtree.
	pub fn has_detach_request(&self) -> bool {
		self.detach_request.borrow().is_some()
	}

	/// Reads the fallback flag from a boundary's state bag.
	pub fn fallback_visible(state: &StateBag) -> bool {
		state.get(FALLBACK_KEY).and_then(Value::as_bool).unwrap_or(false)
	}

	/// Binds the coordinator to the instance that owns it.
	pub fn bind(&self, instance: &InstanceHandle) {
		let mut bound = self.instance.borrow_mut();
		if !bound.as_ref().is_some_and(|held| held.same(instance)) {
			*bound = Some(instance.clone());
		}
	}

	fn node(&self) -> Option<NodeRef> {
		let handle = self.instance.borrow().clone()?;
		let instance = handle.upgrade()?;
		instance.borrow().node()
	}

	fn primary_slot(&self) -> Option<NodeRef> {
		let node = self.node()?;
		node.borrow().child(0)
	}

	/// Registers a wait raised by `waiting` somewhere below this boundary.
	///
	/// The first wait of an episode parks the live subtree and requests the
	/// fallback. The wait resolves when `signal` settles either way, or when
	/// `waiting` unmounts first; whichever comes second is ignored.
	pub fn register_wait(self: &Rc<Self>, signal: &WaitSignal, waiting: &InstanceRef) {
		let slot = WaitSlot::next();
		let waiter = InstanceHandle::from(waiting);
		{
			let mut waiters = self.waiters.borrow_mut();
			if !waiters.iter().any(|held| held.same(&waiter)) {
				waiters.push(waiter.clone());
			}
		}

		let gate = self.node().and_then(|node| notify_ancestor(&node));
		let delegated = gate.is_some();
		let gate = Cell::new(gate);

		let resolved = Rc::new(Cell::new(false));
		let on_resolved: Rc<dyn Fn()> = Rc::new({
			let coordinator = Rc::clone(self);
			let resolved = Rc::clone(&resolved);
			let waiter = waiter.clone();
			move || {
				if resolved.replace(true) {
					tracing::trace!(?slot, "wait slot already resolved");
					return;
				}
				if let Some(instance) = waiter.upgrade() {
					match instance.try_borrow_mut() {
						Ok(mut instance) => instance.release_unmount(slot),
						Err(_) => tracing::trace!(?slot, "waiter busy; interceptor pruned on its next render"),
					}
				}
				let coordinator = Rc::clone(&coordinator);
				let resume: Continuation = Box::new(move || coordinator.unsuspend());
				match gate.take() {
					Some(gate) => {
						tracing::debug!(?slot, "unsuspension held by enclosing coordinator");
						gate(resume);
					}
					None => resume(),
				}
			}
		});

		{
			let on_unmount = Rc::clone(&on_resolved);
			waiting.borrow_mut().intercept_unmount(slot, resolved, move || on_unmount());
		}

		if self.pending.get() == 0 {
			let primary = self.primary_slot();
			*self.parked.borrow_mut() = primary.clone();
			*self.detach_request.borrow_mut() = primary;
			tracing::debug!(waiter = waiter.name(), "wait episode started");
			self.set_fallback(true);
		}
		self.pending.set(self.pending.get() + 1);
		tracing::debug!(?slot, pending = self.pending.get(), delegated, waiter = waiter.name(), "wait registered");

		let on_fulfilled = Rc::clone(&on_resolved);
		signal.on_settle(move || on_fulfilled(), move || on_resolved());
	}

	/// Ends one wait; the last one of the episode restores the subtree.
	fn unsuspend(&self) {
		let Some(remaining) = self.pending.get().checked_sub(1) else {
			tracing::warn!("unsuspend without an outstanding wait");
			return;
		};
		self.pending.set(remaining);
		if remaining > 0 {
			tracing::trace!(pending = remaining, "wait resolved, episode continues");
			return;
		}

		*self.detach_request.borrow_mut() = None;
		if let Some(parked) = self.parked.take() {
			strip_origin(&parked);
			if let Some(node) = self.node() {
				let mut node = node.borrow_mut();
				if let Some(children) = node.children.as_mut() {
					put_primary(children, parked);
				}
			}
		}
		tracing::debug!(waiters = self.waiter_count(), "wait episode ended");
		self.set_fallback(false);

		// Forced renders may register fresh waits; those start a new episode.
		let waiters = std::mem::take(&mut *self.waiters.borrow_mut());
		for waiter in waiters.into_iter().rev() {
			waiter.force_update();
		}
	}

	fn take_detach_request(&self) -> Option<NodeRef> {
		self.detach_request.take()
	}

	fn set_fallback(&self, visible: bool) {
		let Some(instance) = self.instance.borrow().clone() else {
			tracing::warn!(visible, "boundary has not rendered yet; fallback state not scheduled");
			return;
		};
		let mut patch = StateBag::new();
		patch.insert(FALLBACK_KEY.to_string(), Value::Bool(visible));
		instance.set_state(patch);
	}
}

fn put_primary(children: &mut Vec<Option<NodeRef>>, node: NodeRef) {
	match children.first_mut() {
		Some(first) => *first = Some(node),
		None => children.push(Some(node)),
	}
}

thread_local! {
	static SUSPENSE_TYPE: ComponentType = ComponentType::new("Suspense", || Box::new(Suspense::new()));
}

/// Boundary component.
///
/// Renders a two-slot fragment: the primary slot holds `props.children`
/// unless the fallback is visible, the second slot holds `props.fallback`
/// only while it is.
pub struct Suspense {
	coordinator: Rc<BoundaryCoordinator>,
}

impl Default for Suspense {
	fn default() -> Self {
		Self::new()
	}
}

impl Suspense {
	/// Creates a boundary with an idle coordinator.
	pub fn new() -> Self {
		Self {
			coordinator: Rc::new(BoundaryCoordinator::new()),
		}
	}

	/// The component type shared by all boundaries on this thread.
	pub fn component_type() -> ComponentType {
		SUSPENSE_TYPE.with(Clone::clone)
	}

	/// Builds a boundary element around `children`.
	pub fn element(fallback: Element, children: impl IntoIterator<Item = Element>) -> Element {
		Element::component(
			&Self::component_type(),
			Props::new().with_fallback(fallback).with_children(children),
		)
	}

	/// Coordinator shared with descendants through [`Capabilities`].
	pub fn coordinator(&self) -> &Rc<BoundaryCoordinator> {
		&self.coordinator
	}
}

impl Component for Suspense {
	fn render(&mut self, cx: &RenderContext<'_>) -> RenderResult {
		self.coordinator.bind(cx.handle());

		if let Some(request) = self.coordinator.take_detach_request()
			&& let Some(node) = cx.node()
		{
			let has_children = node.borrow().children.is_some();
			if has_children {
				let copy = detached_clone(&request);
				if let Some(children) = node.borrow_mut().children.as_mut() {
					put_primary(children, copy);
				}
			} else {
				tracing::trace!("boundary node has no child list; detach request dropped");
			}
		}

		let props = cx.props();
		let fallback_visible = BoundaryCoordinator::fallback_visible(cx.state());
		let primary = if fallback_visible {
			Element::Fragment(Vec::new())
		} else {
			Element::Fragment(props.children.clone())
		};
		let fallback = match &props.fallback {
			Some(fallback) if fallback_visible => (**fallback).clone(),
			_ => Element::Empty,
		};
		Ok(Element::Fragment(vec![primary, fallback]))
	}

	fn capabilities(&self) -> Capabilities {
		Capabilities {
			boundary: Some(Rc::clone(&self.coordinator)),
			listener: None,
		}
	}
}
