//! Minimal positional reconciler and scheduler for integration tests.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use xeno_suspense::{
	BoundaryCoordinator, ComponentInstance, ComponentType, Deferred, Element, Hooks, InstanceHandle, InstanceRef,
	NodeKind, NodeRef, OriginId, OutputHandle, Props, RenderError, RenderNode, Scheduler, append_child, install,
};

/// Records re-render requests; any request marks the tree dirty.
#[derive(Default)]
pub struct TestScheduler {
	dirty: Cell<bool>,
	forced: RefCell<Vec<&'static str>>,
}

impl Scheduler for TestScheduler {
	fn enqueue_render(&self, _instance: InstanceHandle) {
		self.dirty.set(true);
	}

	fn force_render(&self, instance: InstanceHandle) {
		self.dirty.set(true);
		self.forced.borrow_mut().push(instance.name().unwrap_or("<dropped>"));
	}
}

/// Renders one root element into a host tree, re-rendering from the root
/// whenever the scheduler was asked for work.
pub struct Harness {
	hooks: Hooks,
	scheduler: Rc<TestScheduler>,
	root: NodeRef,
	element: RefCell<Element>,
	errors: Rc<RefCell<Vec<RenderError>>>,
	history: RefCell<Vec<String>>,
	next_output: Cell<u64>,
}

impl Harness {
	pub fn new(element: Element) -> Self {
		let _ = tracing_subscriber::fmt::try_init();
		let errors = Rc::new(RefCell::new(Vec::new()));
		let sink = Rc::clone(&errors);
		let mut hooks = Hooks::new(move |raised, _, _| sink.borrow_mut().push(raised.into_error()), |_| {});
		install(&mut hooks);
		let root = RenderNode::new(NodeKind::Host("root"), Props::new()).into_ref();
		root.borrow_mut().children = Some(Vec::new());
		Self {
			hooks,
			scheduler: Rc::new(TestScheduler::default()),
			root,
			element: RefCell::new(element),
			errors,
			history: RefCell::new(Vec::new()),
			next_output: Cell::new(0),
		}
	}

	/// Runs one pass, then keeps rendering until nothing is scheduled.
	pub fn render(&self) -> String {
		self.pass();
		self.flush()
	}

	/// Renders until nothing is scheduled and returns the output.
	pub fn flush(&self) -> String {
		let mut passes = 0;
		while self.scheduler.dirty.replace(false) {
			self.pass();
			passes += 1;
			assert!(passes < 32, "render loop did not settle");
		}
		self.output()
	}

	/// Re-renders from the root as if an ancestor updated.
	pub fn rerender(&self) -> String {
		self.scheduler.dirty.set(true);
		self.flush()
	}

	pub fn set_root(&self, element: Element) {
		*self.element.borrow_mut() = element;
	}

	pub fn output(&self) -> String {
		let mut out = String::new();
		for child in self.root.borrow().children.iter().flatten().flatten() {
			serialize(child, &mut out);
		}
		out
	}

	/// Output after every pass, with consecutive duplicates removed.
	pub fn history(&self) -> Vec<String> {
		let mut history = self.history.borrow().clone();
		history.dedup();
		history
	}

	pub fn errors(&self) -> Vec<RenderError> {
		self.errors.borrow().clone()
	}

	pub fn forced(&self) -> Vec<&'static str> {
		self.scheduler.forced.borrow().clone()
	}

	/// First mounted instance named `name` in the live tree.
	pub fn instance(&self, name: &str) -> Option<InstanceRef> {
		find_instance(&self.root, name)
	}

	/// Coordinator of the first boundary in the live tree.
	pub fn boundary(&self) -> Rc<BoundaryCoordinator> {
		self.instance("Suspense")
			.and_then(|instance| instance.borrow().capabilities().boundary)
			.expect("a mounted boundary")
	}

	fn pass(&self) {
		let element = self.element.borrow().clone();
		self.reconcile_children(&self.root, vec![element]);
		let output = self.output();
		self.history.borrow_mut().push(output);
	}

	fn reconcile_children(&self, parent: &NodeRef, elements: Vec<Element>) {
		let old = parent.borrow_mut().children.replace(Vec::new()).unwrap_or_default();
		let count = elements.len();
		for (index, element) in elements.into_iter().enumerate() {
			let prior = old.get(index).cloned().flatten();
			self.diff(parent, element, prior);
		}
		for leftover in old.iter().skip(count).flatten() {
			unmount_tree(leftover);
		}
	}

	fn diff(&self, parent: &NodeRef, element: Element, prior: Option<NodeRef>) {
		match element {
			Element::Empty => {
				if let Some(prior) = prior {
					unmount_tree(&prior);
				}
				append_child(parent, None);
			}
			Element::Text(text) => {
				if let Some(prior) = prior {
					unmount_tree(&prior);
				}
				let mut node = RenderNode::new(NodeKind::Text(text), Props::new());
				node.output = Some(self.next_output());
				append_child(parent, Some(node.into_ref()));
			}
			Element::Host { tag, children } => self.diff_container(parent, NodeKind::Host(tag), children, prior),
			Element::Fragment(children) => self.diff_container(parent, NodeKind::Fragment, children, prior),
			Element::Component { ty, props } => self.diff_component(parent, ty, props, prior),
		}
	}

	fn diff_container(&self, parent: &NodeRef, kind: NodeKind, children: Vec<Element>, prior: Option<NodeRef>) {
		let mut node = RenderNode::new(kind.clone(), Props::new());
		let reusable = prior.filter(|prior| same_container(&prior.borrow().kind, &kind));
		match reusable {
			Some(prior) => {
				let prior = prior.borrow();
				node.children = prior.children.clone();
				node.output = prior.output;
			}
			None => {
				node.output = matches!(kind, NodeKind::Host(_)).then(|| self.next_output());
			}
		}
		node.origin = Some(OriginId::next());
		let node = node.into_ref();
		append_child(parent, Some(node.clone()));
		self.reconcile_children(&node, children);
		self.hooks.diffed(&node);
	}

	fn diff_component(&self, parent: &NodeRef, ty: ComponentType, props: Props, prior: Option<NodeRef>) {
		let reusable = prior.as_ref().and_then(|prior| {
			let prior = prior.borrow();
			match (&prior.kind, &prior.component) {
				(NodeKind::Component(old), Some(instance)) if old.same(&ty) => {
					Some((Rc::clone(instance), prior.children.clone()))
				}
				_ => None,
			}
		});
		let (instance, children) = match reusable {
			Some(reused) => reused,
			None => {
				if let Some(prior) = &prior {
					unmount_tree(prior);
				}
				(ComponentInstance::new(&ty, self.scheduler.clone()), None)
			}
		};

		let mut node = RenderNode::new(NodeKind::Component(ty), props.clone());
		node.children = children;
		node.component = Some(Rc::clone(&instance));
		node.origin = Some(OriginId::next());
		let node = node.into_ref();
		append_child(parent, Some(node.clone()));
		instance.borrow_mut().bind_node(&node);

		let rendered = instance.borrow_mut().render(&props);
		match rendered {
			Ok(element) => {
				let items = match element {
					Element::Fragment(items) => items,
					other => vec![other],
				};
				self.reconcile_children(&node, items);
				self.hooks.diffed(&node);
			}
			Err(raised) => self.hooks.catch_error(raised, &node, prior.as_ref()),
		}
	}

	fn next_output(&self) -> OutputHandle {
		let next = self.next_output.get() + 1;
		self.next_output.set(next);
		OutputHandle(next)
	}
}

fn same_container(a: &NodeKind, b: &NodeKind) -> bool {
	match (a, b) {
		(NodeKind::Host(a), NodeKind::Host(b)) => a == b,
		(NodeKind::Fragment, NodeKind::Fragment) => true,
		_ => false,
	}
}

fn unmount_tree(node: &NodeRef) {
	let (instance, children) = {
		let node = node.borrow();
		(node.component.clone(), node.children.clone().unwrap_or_default())
	};
	if let Some(instance) = instance {
		ComponentInstance::unmount(&instance);
	}
	for child in children.iter().flatten() {
		unmount_tree(child);
	}
}

fn serialize(node: &NodeRef, out: &mut String) {
	let node = node.borrow();
	match &node.kind {
		NodeKind::Text(text) => out.push_str(text),
		NodeKind::Host(tag) => {
			out.push_str(&format!("<{tag}>"));
			for child in node.children.iter().flatten().flatten() {
				serialize(child, out);
			}
			out.push_str(&format!("</{tag}>"));
		}
		NodeKind::Fragment | NodeKind::Component(_) => {
			for child in node.children.iter().flatten().flatten() {
				serialize(child, out);
			}
		}
	}
}

fn find_instance(node: &NodeRef, name: &str) -> Option<InstanceRef> {
	let node = node.borrow();
	if let Some(instance) = &node.component
		&& instance.borrow().name() == name
	{
		return Some(Rc::clone(instance));
	}
	node.children.iter().flatten().flatten().find_map(|child| find_instance(child, name))
}

/// Component that waits on `deferred` and renders `<span>{name}</span>`
/// once it has settled.
pub fn waiting(name: &'static str, deferred: &Deferred<()>) -> ComponentType {
	let deferred = deferred.clone();
	ComponentType::function(name, move |_| {
		if deferred.is_pending() {
			return Err(deferred.wait_signal().into());
		}
		Ok(Element::host("span", [Element::text(name)]))
	})
}

/// Component rendering `<span>{name}</span>`.
pub fn label(name: &'static str) -> ComponentType {
	ComponentType::function(name, move |_| Ok(Element::host("span", [Element::text(name)])))
}

pub fn el(ty: &ComponentType) -> Element {
	Element::component(ty, Props::new())
}
