//! The dispatch contract shared by every pipeline stage.

use crate::error::{DispatchError, LifecycleError};
use composable_lifecycle_core::{Action, ServiceError, Value};
use futures::FutureExt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

/// Something actions can be dispatched to: a store, a pipeline, a decorated
/// dispatcher, a recording sink in tests.
///
/// Dispatch is synchronous. Stages that start asynchronous work return a
/// [`LifecycleHandle`] instead of blocking.
pub trait Dispatch: Send + Sync {
    /// Dispatch one action
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError`] if a stage cannot accept the action.
    fn dispatch(&self, action: Action) -> Result<Dispatched, DispatchError>;
}

impl<T> Dispatch for Arc<T>
where
    T: Dispatch + ?Sized,
{
    fn dispatch(&self, action: Action) -> Result<Dispatched, DispatchError> {
        (**self).dispatch(action)
    }
}

/// Adapter turning a closure into a [`Dispatch`].
///
/// ```
/// use composable_lifecycle_runtime::{dispatch_fn, Dispatch, Dispatched};
/// use composable_lifecycle_core::Action;
///
/// let echo = dispatch_fn(|action| Ok(Dispatched::Action(action)));
/// let result = echo.dispatch(Action::of_type("PING")).unwrap();
/// assert_eq!(result.action().map(Action::action_type), Some("PING"));
/// ```
pub struct DispatchFn<F>(F);

/// Wrap a closure as a [`Dispatch`]
pub const fn dispatch_fn<F>(f: F) -> DispatchFn<F>
where
    F: Fn(Action) -> Result<Dispatched, DispatchError> + Send + Sync,
{
    DispatchFn(f)
}

impl<F> Dispatch for DispatchFn<F>
where
    F: Fn(Action) -> Result<Dispatched, DispatchError> + Send + Sync,
{
    fn dispatch(&self, action: Action) -> Result<Dispatched, DispatchError> {
        (self.0)(action)
    }
}

/// What a dispatch call returns.
pub enum Dispatched {
    /// The action reached a terminal stage (stores echo the action back),
    /// or was forwarded synchronously
    Action(Action),
    /// An asynchronous lifecycle was started
    Lifecycle(LifecycleHandle),
}

impl Dispatched {
    /// The echoed action, if no lifecycle was started
    #[must_use]
    pub const fn action(&self) -> Option<&Action> {
        match self {
            Self::Action(action) => Some(action),
            Self::Lifecycle(_) => None,
        }
    }

    /// Consume into the echoed action
    #[must_use]
    pub fn into_action(self) -> Option<Action> {
        match self {
            Self::Action(action) => Some(action),
            Self::Lifecycle(_) => None,
        }
    }

    /// Consume into the lifecycle handle
    #[must_use]
    pub fn into_lifecycle(self) -> Option<LifecycleHandle> {
        match self {
            Self::Action(_) => None,
            Self::Lifecycle(handle) => Some(handle),
        }
    }

    /// Whether a lifecycle was started
    #[must_use]
    pub const fn is_lifecycle(&self) -> bool {
        matches!(self, Self::Lifecycle(_))
    }
}

impl std::fmt::Debug for Dispatched {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Action(action) => f.debug_tuple("Dispatched::Action").field(action).finish(),
            Self::Lifecycle(handle) => f.debug_tuple("Dispatched::Lifecycle").field(handle).finish(),
        }
    }
}

/// Completion of a started lifecycle.
///
/// Resolves to the raw response of the operation, or to
/// [`LifecycleError::Rejected`] with the same error the failed action
/// carried. The succeeded/failed action is dispatched before the handle
/// resolves, and is dispatched whether or not the handle is awaited.
pub struct LifecycleHandle {
    action_type: String,
    receiver: oneshot::Receiver<Result<Value, ServiceError>>,
}

impl LifecycleHandle {
    pub(crate) const fn new(
        action_type: String,
        receiver: oneshot::Receiver<Result<Value, ServiceError>>,
    ) -> Self {
        Self {
            action_type,
            receiver,
        }
    }

    /// Type of the intent action that started the lifecycle
    #[must_use]
    pub fn action_type(&self) -> &str {
        &self.action_type
    }
}

impl Future for LifecycleHandle {
    type Output = Result<Value, LifecycleError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.receiver.poll_unpin(cx).map(|received| match received {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(error)) => Err(LifecycleError::Rejected(error)),
            Err(_) => Err(LifecycleError::Aborted),
        })
    }
}

impl std::fmt::Debug for LifecycleHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleHandle")
            .field("action_type", &self.action_type)
            .finish_non_exhaustive()
    }
}
