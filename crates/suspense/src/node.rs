//! Render tree nodes shared between the reconciler and boundaries.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::component::{ComponentType, InstanceRef, Props};

/// Shared, mutable handle to a [`RenderNode`].
pub type NodeRef = Rc<RefCell<RenderNode>>;

/// Non-owning handle to a [`RenderNode`].
pub type WeakNodeRef = Weak<RefCell<RenderNode>>;

/// Identity of the element a node was produced from.
///
/// The diff engine uses it to recognize unchanged input; clearing it forces
/// a fresh render of the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OriginId(u64);

impl OriginId {
	/// Returns a process-unique origin ID.
	pub fn next() -> Self {
		static NEXT: AtomicU64 = AtomicU64::new(0);
		Self(NEXT.fetch_add(1, Ordering::Relaxed).wrapping_add(1))
	}

	/// Returns the raw ID.
	pub const fn get(self) -> u64 {
		self.0
	}
}

/// Opaque handle to committed host output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OutputHandle(pub u64);

/// What a node stands for in the tree.
#[derive(Clone)]
pub enum NodeKind {
	/// Text leaf.
	Text(String),
	/// Host element with a tag name.
	Host(&'static str),
	/// Transparent grouping of children.
	Fragment,
	/// Component output.
	Component(ComponentType),
}

impl fmt::Debug for NodeKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
			Self::Host(tag) => f.debug_tuple("Host").field(tag).finish(),
			Self::Fragment => f.write_str("Fragment"),
			Self::Component(ty) => f.debug_tuple("Component").field(&ty.name()).finish(),
		}
	}
}

/// One node of the render tree.
///
/// `Clone` is shallow: children and the component instance are shared
/// handles, as required by [`crate::snapshot::detached_clone`].
#[derive(Clone)]
pub struct RenderNode {
	/// What the node stands for.
	pub kind: NodeKind,
	/// Props the node was rendered with.
	pub props: Props,
	/// Structural parent.
	pub parent: WeakNodeRef,
	/// `None` when the node was created without a child list.
	pub children: Option<Vec<Option<NodeRef>>>,
	/// Instance rendering this node; `None` on inert copies.
	pub component: Option<InstanceRef>,
	/// Committed host output.
	pub output: Option<OutputHandle>,
	/// Element the node was produced from.
	pub origin: Option<OriginId>,
}

impl RenderNode {
	/// Creates a detached node with no children list, instance or output.
	pub fn new(kind: NodeKind, props: Props) -> Self {
		Self {
			kind,
			props,
			parent: Weak::new(),
			children: None,
			component: None,
			output: None,
			origin: None,
		}
	}

	/// Wraps the node in a shared handle.
	pub fn into_ref(self) -> NodeRef {
		Rc::new(RefCell::new(self))
	}

	/// Returns the structural parent, if still alive.
	pub fn parent(&self) -> Option<NodeRef> {
		self.parent.upgrade()
	}

	/// Returns the child in `index`, if present.
	pub fn child(&self, index: usize) -> Option<NodeRef> {
		self.children.as_ref()?.get(index).cloned().flatten()
	}

	/// Returns the component type when this node renders a component.
	pub fn component_type(&self) -> Option<&ComponentType> {
		match &self.kind {
			NodeKind::Component(ty) => Some(ty),
			NodeKind::Text(_) | NodeKind::Host(_) | NodeKind::Fragment => None,
		}
	}
}

impl fmt::Debug for RenderNode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RenderNode")
			.field("kind", &self.kind)
			.field("children", &self.children.as_ref().map(Vec::len))
			.field("component", &self.component.is_some())
			.field("output", &self.output)
			.field("origin", &self.origin)
			.finish()
	}
}

/// Appends `child` to `parent`'s child list and links it back to `parent`.
pub fn append_child(parent: &NodeRef, child: Option<NodeRef>) {
	if let Some(child) = &child {
		child.borrow_mut().parent = Rc::downgrade(parent);
	}
	parent.borrow_mut().children.get_or_insert_with(Vec::new).push(child);
}
