//! Components whose implementation is loaded asynchronously on first use.

use std::cell::RefCell;
use std::rc::Rc;

use crate::component::{ComponentType, Element, Props, RenderResult};
use crate::deferred::Deferred;
use crate::error::{Raised, RenderError};

/// Display name of every lazy component type.
pub const LAZY_NAME: &str = "Lazy";

/// Module-shaped loader output whose `default` export is the component.
#[derive(Debug, Clone)]
pub struct LazyModule {
	/// Component the module exports.
	pub default: ComponentType,
}

impl From<LazyModule> for ComponentType {
	fn from(module: LazyModule) -> Self {
		module.default
	}
}

struct LazyState<M> {
	loader: Box<dyn Fn() -> Deferred<M>>,
	pending: RefCell<Option<Deferred<M>>>,
	outcome: RefCell<Option<Result<ComponentType, RenderError>>>,
}

impl<M> LazyState<M>
where
	M: Clone + Into<ComponentType> + 'static,
{
	/// Starts the loader on first use; later calls share the same value.
	fn load(self: &Rc<Self>) -> Deferred<M> {
		if let Some(pending) = self.pending.borrow().as_ref() {
			return pending.clone();
		}

		let pending = (self.loader)();
		*self.pending.borrow_mut() = Some(pending.clone());
		tracing::debug!("lazy component load started");

		let (on_loaded, on_failed) = (Rc::downgrade(self), Rc::downgrade(self));
		pending.then(
			move |module: &M| {
				if let Some(state) = on_loaded.upgrade() {
					*state.outcome.borrow_mut() = Some(Ok(module.clone().into()));
				}
			},
			move |err: &RenderError| {
				if let Some(state) = on_failed.upgrade() {
					tracing::debug!(%err, "lazy component load failed");
					*state.outcome.borrow_mut() = Some(Err(err.clone()));
				}
			},
		);
		pending
	}

	fn render(self: &Rc<Self>, props: &Props) -> RenderResult {
		let pending = self.load();
		let outcome = self.outcome.borrow().clone();
		match outcome {
			Some(Ok(ty)) => Ok(Element::component(&ty, props.clone())),
			Some(Err(err)) => Err(Raised::Failed(err)),
			None => Err(pending.into()),
		}
	}
}

/// Builds a component that renders whatever `loader` eventually yields.
///
/// The loader runs once, on the first render of any instance of the returned
/// type. Until it settles every render raises the pending value as a wait;
/// afterwards renders either forward their props to the loaded component or
/// raise the load error as an ordinary failure.
pub fn make_lazy<M, F>(loader: F) -> ComponentType
where
	F: Fn() -> Deferred<M> + 'static,
	M: Clone + Into<ComponentType> + 'static,
{
	let state = Rc::new(LazyState {
		loader: Box::new(loader),
		pending: RefCell::new(None),
		outcome: RefCell::new(None),
	});
	ComponentType::forwarding(LAZY_NAME, move |props| state.render(props))
}
