//! Structural copies of offscreen subtrees.

use crate::node::NodeRef;


/// Returns an inert structural clone of `node` and its descendants.
///
/// Every live component instance found along the way is marked suspended and
/// dropped from the clone, so reconciling the clone never touches the
/// instance; the original subtree keeps it for later reattachment. A node
/// without a child list is copied as-is.
pub fn detached_clone(node: &NodeRef) -> NodeRef {
	let mut copy = node.borrow().clone();
	if let Some(instance) = copy.component.take() {
		instance.borrow_mut().set_suspended(true);
	}
	copy.children = copy
		.children
		.map(|children| children.iter().map(|child| child.as_ref().map(detached_clone)).collect());
	copy.into_ref()
}

/// Clears the origin backlink on `node` and all of its descendants, so the
/// reconciler renders the subtree fresh instead of treating it as unchanged.
pub fn strip_origin(node: &NodeRef) {
	let children = {
		let mut node = node.borrow_mut();
		node.origin = None;
		node.children.clone().unwrap_or_default()
	};
	for child in children.iter().flatten() {
		strip_origin(child);
	}
}

/// Returns true when no node in the subtree holds a component instance.
pub fn is_inert(node: &NodeRef) -> bool {
	let node = node.borrow();
	node.component.is_none() && node.children.iter().flatten().flatten().all(is_inert)
}
