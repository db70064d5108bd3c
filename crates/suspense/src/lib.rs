//! Suspense boundaries for the virtual tree.
//!
//! Any descendant of a [`Suspense`] boundary may raise [`Raised::Waiting`]
//! from its render to say it cannot produce output until a [`Deferred`]
//! value settles. The boundary then shows its fallback while keeping the
//! original subtree parked, and restores it once every outstanding wait has
//! settled. [`make_lazy`] builds components that wait on their own code.
//!
//! The reconciler stays external: it owns a [`Hooks`] table, calls
//! [`install`] once during initialization, and drives renders through the
//! [`Component`] contract.

/// Suspense boundary component and its coordinator.
pub mod boundary;
/// Generic component contract: types, instances, props and scheduling.
pub mod component;
/// Settle-once values renders can wait on.
pub mod deferred;
/// Ancestor notification for gating unsuspension.
pub mod delegate;
/// Rendering errors and raised values.
pub mod error;
/// Reconciler hook table and suspense interceptors.
pub mod hooks;
/// Lazily loaded components.
pub mod lazy;
/// Render tree nodes.
pub mod node;
/// Inert subtree copies and origin cleanup.
pub mod snapshot;

#[cfg(test)]
mod test_support;

pub use boundary::{BoundaryCoordinator, FALLBACK_KEY, Suspense, WaitSlot};
pub use component::{
	Capabilities, Component, ComponentInstance, ComponentType, Element, InstanceHandle, InstanceRef, Props,
	RenderContext, RenderResult, Scheduler, StateBag,
};
pub use deferred::{Deferred, DeferredState, Settle, WaitSignal};
pub use delegate::{Continuation, ResumeGate, SuspensionListener, listener, notify_ancestor};
pub use error::{Raised, RenderError};
pub use hooks::{CatchErrorHook, DiffedHook, Hooks, install};
pub use lazy::{LAZY_NAME, LazyModule, make_lazy};
pub use node::{NodeKind, NodeRef, OriginId, OutputHandle, RenderNode, WeakNodeRef, append_child};
pub use snapshot::{detached_clone, is_inert, strip_origin};
