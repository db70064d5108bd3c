//! Error and raised-value types for component rendering.

use thiserror::Error;

use crate::deferred::WaitSignal;

/// Ordinary rendering failures.
///
/// Cloneable so a captured failure (for example a rejected lazy load) can be
/// raised again on every subsequent render.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
	/// A component reported a failure from its render function.
	#[error("{component} failed to render: {message}")]
	Component {
		/// Display name of the failing component.
		component: &'static str,
		/// Failure description.
		message: String,
	},

	/// A lazy component loader rejected.
	#[error("lazy component failed to load: {0}")]
	LoadFailed(String),

	/// A wait signal reached the ordinary error path because no boundary
	/// encloses the waiting node.
	#[error("wait signal raised outside any suspense boundary")]
	UncaughtWait,
}

impl RenderError {
	/// Shorthand for [`RenderError::Component`].
	pub fn component(component: &'static str, message: impl Into<String>) -> Self {
		Self::Component {
			component,
			message: message.into(),
		}
	}
}

/// Value raised by a render that could not produce output.
///
/// `Waiting` asks the nearest boundary to show fallback content until the
/// signal settles; `Failed` takes the reconciler's ordinary error path.
#[derive(Debug, Clone)]
pub enum Raised {
	/// Rendering is blocked on an unsettled asynchronous value.
	Waiting(WaitSignal),
	/// Rendering failed.
	Failed(RenderError),
}

impl Raised {
	/// Returns the wait signal if this is a `Waiting` value.
	pub fn as_wait(&self) -> Option<&WaitSignal> {
		match self {
			Self::Waiting(signal) => Some(signal),
			Self::Failed(_) => None,
		}
	}

	/// Converts into an ordinary error, mapping an uncaught wait to
	/// [`RenderError::UncaughtWait`].
	pub fn into_error(self) -> RenderError {
		match self {
			Self::Waiting(_) => RenderError::UncaughtWait,
			Self::Failed(err) => err,
		}
	}
}

impl From<RenderError> for Raised {
	fn from(err: RenderError) -> Self {
		Self::Failed(err)
	}
}

impl From<WaitSignal> for Raised {
	fn from(signal: WaitSignal) -> Self {
		Self::Waiting(signal)
	}
}
