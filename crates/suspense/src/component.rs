//! Generic component contract consumed by boundaries and lazy components.
//!
//! The reconciler owns instantiation, diffing and scheduling; this module only
//! defines the surface both sides agree on.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

use serde_json::{Map, Value};
use smallvec::SmallVec;

use crate::boundary::{BoundaryCoordinator, WaitSlot};
use crate::delegate::SuspensionListener;
use crate::error::Raised;
use crate::node::{NodeRef, WeakNodeRef};

/// Shared, mutable handle to a mounted [`ComponentInstance`].
pub type InstanceRef = Rc<RefCell<ComponentInstance>>;

/// Outcome of a single render call.
pub type RenderResult = Result<Element, Raised>;

/// Component state bag; patches are shallow-merged by key.
pub type StateBag = Map<String, Value>;

/// Description of render output, turned into [`crate::node::RenderNode`]s by
/// the reconciler.
#[derive(Debug, Clone, Default)]
pub enum Element {
	/// Renders nothing.
	#[default]
	Empty,
	/// Text leaf.
	Text(String),
	/// Host element.
	Host { tag: &'static str, children: Vec<Element> },
	/// Transparent grouping.
	Fragment(Vec<Element>),
	/// Component invocation.
	Component { ty: ComponentType, props: Props },
}

impl Element {
	/// Text leaf.
	pub fn text(text: impl Into<String>) -> Self {
		Self::Text(text.into())
	}

	/// Host element with `children`.
	pub fn host(tag: &'static str, children: impl IntoIterator<Item = Element>) -> Self {
		Self::Host {
			tag,
			children: children.into_iter().collect(),
		}
	}

	/// Transparent grouping of `children`.
	pub fn fragment(children: impl IntoIterator<Item = Element>) -> Self {
		Self::Fragment(children.into_iter().collect())
	}

	/// Invocation of `ty` with `props`.
	pub fn component(ty: &ComponentType, props: Props) -> Self {
		Self::Component { ty: ty.clone(), props }
	}
}

/// Input properties of a component.
#[derive(Debug, Clone, Default)]
pub struct Props {
	pub attrs: BTreeMap<&'static str, String>,
	pub children: Vec<Element>,
	/// Substitute content shown by a boundary during a wait episode.
	pub fallback: Option<Box<Element>>,
}

impl Props {
	/// Empty props.
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets attribute `key`.
	pub fn with_attr(mut self, key: &'static str, value: impl Into<String>) -> Self {
		self.attrs.insert(key, value.into());
		self
	}

	/// Appends child elements.
	pub fn with_children(mut self, children: impl IntoIterator<Item = Element>) -> Self {
		self.children.extend(children);
		self
	}

	/// Sets the boundary fallback content.
	pub fn with_fallback(mut self, fallback: Element) -> Self {
		self.fallback = Some(Box::new(fallback));
		self
	}

	/// Returns attribute `key`, if set.
	pub fn attr(&self, key: &str) -> Option<&str> {
		self.attrs.get(key).map(String::as_str)
	}
}

/// Optional capabilities an instance exposes to its descendants.
#[derive(Clone, Default)]
pub struct Capabilities {
	/// Present on suspense boundaries.
	pub boundary: Option<Rc<BoundaryCoordinator>>,
	/// Present on ancestors that want to hear about descendant suspensions.
	pub listener: Option<Rc<dyn SuspensionListener>>,
}

/// Everything a component sees while rendering.
pub struct RenderContext<'a> {
	props: &'a Props,
	state: &'a StateBag,
	node: Option<NodeRef>,
	handle: InstanceHandle,
}

impl<'a> RenderContext<'a> {
	/// Props passed to this render.
	pub fn props(&self) -> &'a Props {
		self.props
	}

	/// State with all queued patches applied.
	pub fn state(&self) -> &'a StateBag {
		self.state
	}

	/// The node the instance is currently bound to.
	///
	/// The reconciler must not hold a borrow of it across the render call.
	pub fn node(&self) -> Option<&NodeRef> {
		self.node.as_ref()
	}

	/// Handle of the rendering instance.
	pub fn handle(&self) -> &InstanceHandle {
		&self.handle
	}
}

/// Behaviour of a component.
pub trait Component {
	fn render(&mut self, cx: &RenderContext<'_>) -> RenderResult;

	/// Runs once when the instance leaves the tree.
	fn will_unmount(&mut self) {}

	fn capabilities(&self) -> Capabilities {
		Capabilities::default()
	}
}

struct FnComponent {
	render: Rc<dyn Fn(&Props) -> RenderResult>,
}

impl Component for FnComponent {
	fn render(&mut self, cx: &RenderContext<'_>) -> RenderResult {
		(self.render)(cx.props())
	}
}

struct ComponentDef {
	name: &'static str,
	forwarded: bool,
	construct: Box<dyn Fn() -> Box<dyn Component>>,
}

/// Identity-compared component constructor.
#[derive(Clone)]
pub struct ComponentType(Rc<ComponentDef>);

impl ComponentType {
	/// Creates a component type whose instances are built by `construct`.
	pub fn new(name: &'static str, construct: impl Fn() -> Box<dyn Component> + 'static) -> Self {
		Self(Rc::new(ComponentDef {
			name,
			forwarded: false,
			construct: Box::new(construct),
		}))
	}

	/// Creates a stateless component type from a render function.
	pub fn function(name: &'static str, render: impl Fn(&Props) -> RenderResult + 'static) -> Self {
		Self::from_fn(name, false, Rc::new(render))
	}

	/// Like [`ComponentType::function`], tagged as forwarding its props to
	/// another component.
	pub(crate) fn forwarding(name: &'static str, render: impl Fn(&Props) -> RenderResult + 'static) -> Self {
		Self::from_fn(name, true, Rc::new(render))
	}

	fn from_fn(name: &'static str, forwarded: bool, render: Rc<dyn Fn(&Props) -> RenderResult>) -> Self {
		Self(Rc::new(ComponentDef {
			name,
			forwarded,
			construct: Box::new(move || {
				Box::new(FnComponent {
					render: Rc::clone(&render),
				})
			}),
		}))
	}

	/// Display name.
	pub fn name(&self) -> &'static str {
		self.0.name
	}

	/// Returns true for transparent wrappers such as lazy components.
	pub fn is_forwarded(&self) -> bool {
		self.0.forwarded
	}

	/// Returns true when both handles refer to the same component type.
	pub fn same(&self, other: &ComponentType) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}

	/// Builds a fresh behaviour object.
	pub fn instantiate(&self) -> Box<dyn Component> {
		(self.0.construct)()
	}
}

impl PartialEq for ComponentType {
	fn eq(&self, other: &Self) -> bool {
		self.same(other)
	}
}

impl fmt::Debug for ComponentType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ComponentType")
			.field("name", &self.0.name)
			.field("forwarded", &self.0.forwarded)
			.finish()
	}
}

/// Re-render requests, implemented by the reconciler.
pub trait Scheduler {
	/// Queues an asynchronous re-render after a state update.
	fn enqueue_render(&self, instance: InstanceHandle);

	/// Re-renders the instance as soon as possible, bypassing any
	/// should-update checks.
	fn force_render(&self, instance: InstanceHandle);
}

/// Cancellation hook for one wait slot. `settled` flips once the slot has
/// resolved, after which the entry is dead weight and may be pruned.
struct UnmountInterceptor {
	slot: WaitSlot,
	settled: Rc<Cell<bool>>,
	run: Box<dyn FnOnce()>,
}

/// A component bound to a render node while mounted.
pub struct ComponentInstance {
	ty: ComponentType,
	behavior: Box<dyn Component>,
	state: StateBag,
	pending_state: Vec<StateBag>,
	node: WeakNodeRef,
	scheduler: Rc<dyn Scheduler>,
	this: Weak<RefCell<ComponentInstance>>,
	suspended: bool,
	unmounted: bool,
	unmount_interceptors: SmallVec<[UnmountInterceptor; 1]>,
}

impl ComponentInstance {
	/// Instantiates `ty` with an empty state bag.
	pub fn new(ty: &ComponentType, scheduler: Rc<dyn Scheduler>) -> InstanceRef {
		let behavior = ty.instantiate();
		Rc::new_cyclic(|this| {
			RefCell::new(Self {
				ty: ty.clone(),
				behavior,
				state: StateBag::new(),
				pending_state: Vec::new(),
				node: Weak::new(),
				scheduler,
				this: this.clone(),
				suspended: false,
				unmounted: false,
				unmount_interceptors: SmallVec::new(),
			})
		})
	}

	/// Type this instance was built from.
	pub fn component_type(&self) -> &ComponentType {
		&self.ty
	}

	/// Display name of the component type.
	pub fn name(&self) -> &'static str {
		self.ty.name()
	}

	/// Weak handle for scheduling re-renders.
	pub fn handle(&self) -> InstanceHandle {
		InstanceHandle(self.this.clone())
	}

	/// Committed state.
	pub fn state(&self) -> &StateBag {
		&self.state
	}

	/// Node the instance is bound to, if still alive.
	pub fn node(&self) -> Option<NodeRef> {
		self.node.upgrade()
	}

	/// Rebinds the instance to `node`; the reconciler calls this before each render.
	pub fn bind_node(&mut self, node: &NodeRef) {
		self.node = Rc::downgrade(node);
	}

	/// Capabilities exposed by the component behaviour.
	pub fn capabilities(&self) -> Capabilities {
		self.behavior.capabilities()
	}

	/// Returns true while the instance is parked in a detached subtree.
	pub fn is_suspended(&self) -> bool {
		self.suspended
	}

	/// Sets the transient suspended flag.
	pub fn set_suspended(&mut self, suspended: bool) {
		self.suspended = suspended;
	}

	/// Returns true once [`ComponentInstance::unmount`] ran.
	pub fn is_unmounted(&self) -> bool {
		self.unmounted
	}

	/// Number of outstanding wait slots that will be cancelled on unmount.
	pub fn unmount_interceptor_count(&self) -> usize {
		self.unmount_interceptors.len()
	}

	/// Applies queued state patches, then renders.
	pub fn render(&mut self, props: &Props) -> RenderResult {
		self.prune_settled();
		for patch in self.pending_state.drain(..) {
			self.state.extend(patch);
		}
		let cx = RenderContext {
			props,
			state: &self.state,
			node: self.node.upgrade(),
			handle: InstanceHandle(self.this.clone()),
		};
		self.behavior.render(&cx)
	}

	/// Runs `intercept` before the component's own unmount hook, unless
	/// `slot` is released or `settled` is set first.
	pub(crate) fn intercept_unmount(
		&mut self,
		slot: WaitSlot,
		settled: Rc<Cell<bool>>,
		intercept: impl FnOnce() + 'static,
	) {
		self.prune_settled();
		self.unmount_interceptors.push(UnmountInterceptor {
			slot,
			settled,
			run: Box::new(intercept),
		});
	}

	/// Drops the interceptor registered for `slot`.
	pub(crate) fn release_unmount(&mut self, slot: WaitSlot) {
		self.unmount_interceptors.retain(|held| held.slot != slot);
	}

	/// Drops interceptors whose slot resolved while the instance was busy.
	fn prune_settled(&mut self) {
		self.unmount_interceptors.retain(|held| !held.settled.get());
	}

	/// Unmounts the instance: runs each pending interceptor once, then the
	/// component's `will_unmount`. Repeated calls are no-ops.
	pub fn unmount(instance: &InstanceRef) {
		let interceptors = {
			let mut this = instance.borrow_mut();
			if this.unmounted {
				return;
			}
			this.unmounted = true;
			std::mem::take(&mut this.unmount_interceptors)
		};
		for interceptor in interceptors {
			if !interceptor.settled.get() {
				(interceptor.run)();
			}
		}
		instance.borrow_mut().behavior.will_unmount();
	}
}

/// Weak handle used to request re-renders of an instance.
#[derive(Clone)]
pub struct InstanceHandle(Weak<RefCell<ComponentInstance>>);

impl InstanceHandle {
	/// Returns the instance if it is still alive.
	pub fn upgrade(&self) -> Option<InstanceRef> {
		self.0.upgrade()
	}

	/// Display name, if the instance is still alive.
	pub fn name(&self) -> Option<&'static str> {
		Some(self.upgrade()?.borrow().name())
	}

	/// Returns true when both handles point at the same instance.
	pub fn same(&self, other: &InstanceHandle) -> bool {
		Weak::ptr_eq(&self.0, &other.0)
	}

	/// Queues `patch` and asks the scheduler for an asynchronous re-render.
	///
	/// Must not be called while the instance itself is rendering. No-op for
	/// unmounted or dropped instances.
	pub fn set_state(&self, patch: StateBag) {
		let Some(instance) = self.upgrade() else {
			return;
		};
		let scheduler = {
			let mut this = instance.borrow_mut();
			if this.unmounted {
				return;
			}
			this.pending_state.push(patch);
			Rc::clone(&this.scheduler)
		};
		scheduler.enqueue_render(self.clone());
	}

	/// Asks the scheduler for an immediate re-render. No-op for unmounted or
	/// dropped instances.
	pub fn force_update(&self) {
		let Some(instance) = self.upgrade() else {
			return;
		};
		let scheduler = {
			let this = instance.borrow();
			if this.unmounted {
				return;
			}
			Rc::clone(&this.scheduler)
		};
		scheduler.force_render(self.clone());
	}
}

impl From<&InstanceRef> for InstanceHandle {
	fn from(instance: &InstanceRef) -> Self {
		Self(Rc::downgrade(instance))
	}
}

impl fmt::Debug for InstanceHandle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("InstanceHandle").field(&self.name()).finish()
	}
}
