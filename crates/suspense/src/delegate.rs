//! Lets an enclosing coordinator hold back a boundary's unsuspension.
//!
//! When a boundary registers a wait it asks its structural parent whether it
//! wants to be told. A listener may return a [`ResumeGate`]; the boundary then
//! hands its final unsuspension to that gate as a [`Continuation`] once the
//! wait settles, and nothing is restored until the listener runs it. This is
//! enough for an ordering coordinator to reveal sibling boundaries in a
//! policy of its choosing without either side knowing the other's rules.

use std::rc::Rc;

use crate::node::NodeRef;

/// Completes a boundary's unsuspension when invoked.
pub type Continuation = Box<dyn FnOnce()>;

/// Receives the continuation of a settled wait and decides when to run it.
pub type ResumeGate = Box<dyn FnOnce(Continuation)>;

/// Capability of an ancestor that wants to hear about descendant suspensions.
pub trait SuspensionListener {
	/// Called with the boundary node each time a wait registers below it.
	///
	/// Returning `None` lets the boundary unsuspend as soon as the wait
	/// settles.
	fn descendant_suspended(&self, boundary: &NodeRef) -> Option<ResumeGate>;
}

/// Asks the component that owns `node`'s structural parent whether it wants
/// to gate the unsuspension of `node`.
pub fn notify_ancestor(node: &NodeRef) -> Option<ResumeGate> {
	let parent = node.borrow().parent()?;
	let instance = parent.borrow().component.clone()?;
	let listener = instance.borrow().capabilities().listener?;
	listener.descendant_suspended(node)
}

impl<F> SuspensionListener for F
where
	F: Fn(&NodeRef) -> Option<ResumeGate>,
{
	fn descendant_suspended(&self, boundary: &NodeRef) -> Option<ResumeGate> {
		self(boundary)
	}
}

/// Wraps a closure as a listener capability.
pub fn listener(f: impl Fn(&NodeRef) -> Option<ResumeGate> + 'static) -> Rc<dyn SuspensionListener> {
	Rc::new(f)
}
