//! Helpers shared by unit tests.

use std::cell::RefCell;
use std::rc::Rc;

use crate::boundary::{BoundaryCoordinator, Suspense};
use crate::component::{ComponentInstance, ComponentType, Element, InstanceHandle, InstanceRef, Props, Scheduler};
use crate::node::{NodeKind, NodeRef, OriginId, RenderNode, append_child};

/// Re-render request seen by [`RecordingScheduler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Request {
	Enqueue(&'static str),
	Force(&'static str),
}

/// Scheduler that only records what it was asked to do.
#[derive(Default)]
pub(crate) struct RecordingScheduler {
	pub requests: RefCell<Vec<Request>>,
}

impl RecordingScheduler {
	pub fn forced(&self) -> Vec<&'static str> {
		self.requests
			.borrow()
			.iter()
			.filter_map(|req| match req {
				Request::Force(name) => Some(*name),
				Request::Enqueue(_) => None,
			})
			.collect()
	}
}

impl Scheduler for RecordingScheduler {
	fn enqueue_render(&self, instance: InstanceHandle) {
		self.requests.borrow_mut().push(Request::Enqueue(instance.name().unwrap_or("<dropped>")));
	}

	fn force_render(&self, instance: InstanceHandle) {
		self.requests.borrow_mut().push(Request::Force(instance.name().unwrap_or("<dropped>")));
	}
}

pub(crate) fn leaf_type(name: &'static str) -> ComponentType {
	ComponentType::function(name, move |_| Ok(Element::text(name)))
}

/// Creates a component node with a mounted instance bound to it.
pub(crate) fn mounted(ty: &ComponentType, scheduler: &Rc<RecordingScheduler>) -> (NodeRef, InstanceRef) {
	let node = RenderNode::new(NodeKind::Component(ty.clone()), Props::new()).into_ref();
	let instance = ComponentInstance::new(ty, scheduler.clone());
	instance.borrow_mut().bind_node(&node);
	node.borrow_mut().component = Some(Rc::clone(&instance));
	node.borrow_mut().origin = Some(OriginId::next());
	(node, instance)
}

/// Creates a boundary node that has rendered once, with `primary` in its
/// primary slot and an empty fallback slot.
pub(crate) fn mounted_boundary(
	scheduler: &Rc<RecordingScheduler>,
	primary: NodeRef,
) -> (NodeRef, InstanceRef, Rc<BoundaryCoordinator>) {
	let (node, instance) = mounted(&Suspense::component_type(), scheduler);
	let props = Props::new().with_fallback(Element::text("loading"));
	instance.borrow_mut().render(&props).expect("boundary renders");
	node.borrow_mut().children = Some(Vec::new());
	append_child(&node, Some(primary));
	append_child(&node, None);
	let coordinator = instance.borrow().capabilities().boundary.expect("boundary capability");
	(node, instance, coordinator)
}

pub(crate) fn fragment(children: impl IntoIterator<Item = NodeRef>) -> NodeRef {
	let node = RenderNode::new(NodeKind::Fragment, Props::new()).into_ref();
	node.borrow_mut().origin = Some(OriginId::next());
	node.borrow_mut().children = Some(Vec::new());
	for child in children {
		append_child(&node, Some(child));
	}
	node
}

pub(crate) fn host(tag: &'static str, children: impl IntoIterator<Item = NodeRef>) -> NodeRef {
	let node = RenderNode::new(NodeKind::Host(tag), Props::new()).into_ref();
	node.borrow_mut().origin = Some(OriginId::next());
	node.borrow_mut().children = Some(Vec::new());
	for child in children {
		append_child(&node, Some(child));
	}
	node
}
