//! Reconciler hook table and the interceptors that route waits to boundaries.

use std::fmt;
use std::rc::Rc;

use crate::boundary::BoundaryCoordinator;
use crate::error::Raised;
use crate::node::NodeRef;


/// Called with a raised value, the node whose render raised it and the node
/// it was diffed against.
pub type CatchErrorHook = Rc<dyn Fn(Raised, &NodeRef, Option<&NodeRef>)>;

/// Called after a node finished rendering.
pub type DiffedHook = Rc<dyn Fn(&NodeRef)>;

/// Extension points the reconciler invokes during a render pass.
///
/// Each slot holds a single hook; installing a new one wraps the previous
/// value, which the new hook is expected to call unless it handles the event
/// itself.
#[derive(Clone)]
pub struct Hooks {
	catch_error: CatchErrorHook,
	diffed: DiffedHook,
}

impl Default for Hooks {
	/// Logs uncaught errors and ignores commits.
	fn default() -> Self {
		Self::new(
			|raised, node, _| {
				let component = node.borrow().component_type().map(|ty| ty.name());
				tracing::error!(component, error = %raised.into_error(), "uncaught render error");
			},
			|_| {},
		)
	}
}

impl fmt::Debug for Hooks {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Hooks").finish_non_exhaustive()
	}
}

impl Hooks {
	/// Builds a table from a catch hook and a post-commit hook.
	pub fn new(
		catch_error: impl Fn(Raised, &NodeRef, Option<&NodeRef>) + 'static,
		diffed: impl Fn(&NodeRef) + 'static,
	) -> Self {
		Self {
			catch_error: Rc::new(catch_error),
			diffed: Rc::new(diffed),
		}
	}

	/// Invokes the catch hook.
	pub fn catch_error(&self, raised: Raised, failing: &NodeRef, prior: Option<&NodeRef>) {
		(self.catch_error)(raised, failing, prior);
	}

	/// Invokes the post-commit hook.
	pub fn diffed(&self, node: &NodeRef) {
		(self.diffed)(node);
	}

	/// Replaces the catch hook with `wrap(previous)`.
	pub fn wrap_catch_error(&mut self, wrap: impl FnOnce(CatchErrorHook) -> CatchErrorHook) {
		self.catch_error = wrap(Rc::clone(&self.catch_error));
	}

	/// Replaces the post-commit hook with `wrap(previous)`.
	pub fn wrap_diffed(&mut self, wrap: impl FnOnce(DiffedHook) -> DiffedHook) {
		self.diffed = wrap(Rc::clone(&self.diffed));
	}
}

/// Installs the suspense interceptors on top of whatever `hooks` holds.
///
/// Call once per hook table during initialization.
pub fn install(hooks: &mut Hooks) {
	hooks.wrap_catch_error(intercept_waits);
	hooks.wrap_diffed(clear_suspended);
}

/// Routes wait signals to the nearest enclosing boundary; everything else,
/// and waits with no boundary above them, goes to `prev`.
fn intercept_waits(prev: CatchErrorHook) -> CatchErrorHook {
	Rc::new(move |raised: Raised, failing: &NodeRef, prior: Option<&NodeRef>| {
		if let Some(signal) = raised.as_wait() {
			let waiting = failing.borrow().component.clone();
			match (waiting, find_boundary(failing)) {
				(Some(waiting), Some(boundary)) => {
					preserve_committed(failing, prior);
					boundary.register_wait(signal, &waiting);
					return;
				}
				(None, Some(_)) => tracing::warn!("wait raised by a node without a component instance"),
				(_, None) => tracing::debug!("no boundary encloses the waiting node"),
			}
		}
		prev(raised, failing, prior);
	})
}

/// Clears the transient suspended flag once a node has rendered.
fn clear_suspended(prev: DiffedHook) -> DiffedHook {
	Rc::new(move |node: &NodeRef| {
		let instance = node.borrow().component.clone();
		if let Some(instance) = instance {
			instance.borrow_mut().set_suspended(false);
		}
		prev(node);
	})
}

/// Walks ancestors of `node` for the first instance with the boundary
/// capability.
fn find_boundary(node: &NodeRef) -> Option<Rc<BoundaryCoordinator>> {
	let mut cursor = node.borrow().parent();
	while let Some(current) = cursor {
		let instance = current.borrow().component.clone();
		if let Some(instance) = instance {
			let boundary = instance.borrow().capabilities().boundary;
			if boundary.is_some() {
				return boundary;
			}
		}
		cursor = current.borrow().parent();
	}
	None
}

/// Carries the prior committed output over to a node that is about to be
/// retried, so nothing already on screen is lost.
fn preserve_committed(failing: &NodeRef, prior: Option<&NodeRef>) {
	let Some(prior) = prior else {
		return;
	};
	if Rc::ptr_eq(failing, prior) {
		return;
	}
	let (output, children) = {
		let prior = prior.borrow();
		(prior.output, prior.children.clone())
	};
	let mut failing = failing.borrow_mut();
	if failing.output.is_none() {
		failing.output = output;
		failing.children = children;
	}
}
