//! Pending operations.
//!
//! A pending operation is the asynchronous unit of work an intent action
//! resolves to. It can be handed to the dispatch pipeline in three shapes:
//!
//! - **Implicit**: the payload is the future itself
//! - **Explicit**: the payload wraps the future together with optimistic `data`
//! - **Deferred**: the payload is a zero-argument callable producing the future
//!
//! Whatever the shape, an operation is consumed exactly once. Actions stay
//! `Clone` because the operation lives in a shared take-once cell: clones of
//! an action point at the same cell, and whoever takes it first owns it.

use crate::action::Payload;
use crate::error::ServiceError;
use futures::future::BoxFuture;
use serde_json::Value;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

/// Future produced by a service method.
pub type ServiceFuture = BoxFuture<'static, Result<Value, ServiceError>>;

/// Zero-argument callable producing an [`Operation`].
pub type Thunk = Box<dyn FnOnce() -> Operation + Send>;

/// What a service method returns, and what the `promise` slot of an explicit
/// wrapper holds.
pub enum Operation {
    /// An asynchronous computation
    Future(ServiceFuture),
    /// A callable that produces the operation when invoked
    Thunk(Thunk),
    /// A plain value, available synchronously
    Ready(Value),
}

impl Operation {
    /// Box a future as an operation
    pub fn future<F>(future: F) -> Self
    where
        F: Future<Output = Result<Value, ServiceError>> + Send + 'static,
    {
        Self::Future(Box::pin(future))
    }

    /// Box a callable as an operation
    pub fn thunk<F>(thunk: F) -> Self
    where
        F: FnOnce() -> Self + Send + 'static,
    {
        Self::Thunk(Box::new(thunk))
    }

    /// Whether this operation is a future (a "promise")
    #[must_use]
    pub const fn is_future(&self) -> bool {
        matches!(self, Self::Future(_))
    }
}

impl std::fmt::Debug for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Future(_) => write!(f, "Operation::Future(<future>)"),
            Self::Thunk(_) => write!(f, "Operation::Thunk(<fn>)"),
            Self::Ready(value) => f.debug_tuple("Operation::Ready").field(value).finish(),
        }
    }
}

/// The three shapes a pending payload can take.
pub enum PendingKind {
    /// The payload is the future
    Future(ServiceFuture),
    /// `{ promise, data }`
    Wrapped {
        /// The operation itself
        promise: Operation,
        /// Data forwarded with the requested action (optimistic updates)
        data: Option<Value>,
    },
    /// The payload is a callable producing the operation
    Thunk(Thunk),
}

impl std::fmt::Debug for PendingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Future(_) => write!(f, "PendingKind::Future(<future>)"),
            Self::Wrapped { promise, data } => f
                .debug_struct("PendingKind::Wrapped")
                .field("promise", promise)
                .field("data", data)
                .finish(),
            Self::Thunk(_) => write!(f, "PendingKind::Thunk(<fn>)"),
        }
    }
}

/// Outcome of starting a pending operation.
pub enum Started {
    /// A future is in flight; `data` goes out with the requested action
    InFlight {
        /// The operation to await
        future: ServiceFuture,
        /// Payload for the requested action
        data: Option<Value>,
    },
    /// A callable returned something that is not a future: forward it as the
    /// payload without any lifecycle
    Immediate(Payload),
    /// Neither a future nor a callable: forward the action unchanged
    Inert(PendingKind),
}

impl std::fmt::Debug for Started {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InFlight { data, .. } => f
                .debug_struct("Started::InFlight")
                .field("data", data)
                .finish_non_exhaustive(),
            Self::Immediate(payload) => f.debug_tuple("Started::Immediate").field(payload).finish(),
            Self::Inert(kind) => f.debug_tuple("Started::Inert").field(kind).finish(),
        }
    }
}

impl PendingKind {
    /// Classify the payload and, for callables, invoke them.
    ///
    /// Priority: implicit future, then a future in the wrapper's `promise`
    /// slot, then a callable (the wrapper's `promise` slot if present,
    /// otherwise the payload itself).
    #[must_use]
    pub fn start(self) -> Started {
        match self {
            Self::Future(future) => Started::InFlight { future, data: None },
            Self::Wrapped {
                promise: Operation::Future(future),
                data,
            } => Started::InFlight { future, data },
            Self::Wrapped {
                promise: Operation::Thunk(thunk),
                data,
            } => from_call(thunk(), data),
            Self::Thunk(thunk) => from_call(thunk(), None),
            inert @ Self::Wrapped {
                promise: Operation::Ready(_),
                ..
            } => Started::Inert(inert),
        }
    }
}

fn from_call(result: Operation, data: Option<Value>) -> Started {
    match result {
        Operation::Future(future) => Started::InFlight { future, data },
        Operation::Ready(value) => Started::Immediate(Payload::Data(value)),
        Operation::Thunk(thunk) => {
            Started::Immediate(Payload::Pending(PendingOperation::new(PendingKind::Thunk(thunk))))
        },
    }
}

/// Take-once cell holding a [`PendingKind`].
#[derive(Clone)]
pub struct PendingOperation {
    cell: Arc<Mutex<Option<PendingKind>>>,
}

impl PendingOperation {
    /// Wrap an already-classified kind
    #[must_use]
    pub fn new(kind: PendingKind) -> Self {
        Self {
            cell: Arc::new(Mutex::new(Some(kind))),
        }
    }

    /// Implicit shape: the payload is the future
    pub fn future<F>(future: F) -> Self
    where
        F: Future<Output = Result<Value, ServiceError>> + Send + 'static,
    {
        Self::new(PendingKind::Future(Box::pin(future)))
    }

    /// Explicit shape: `{ promise, data }`
    #[must_use]
    pub fn wrapped(promise: Operation, data: Option<Value>) -> Self {
        Self::new(PendingKind::Wrapped { promise, data })
    }

    /// Deferred shape: a callable producing the operation
    pub fn thunk<F>(thunk: F) -> Self
    where
        F: FnOnce() -> Operation + Send + 'static,
    {
        Self::new(PendingKind::Thunk(Box::new(thunk)))
    }

    /// Take the operation out. Returns `None` once it has been consumed.
    #[must_use]
    pub fn take(&self) -> Option<PendingKind> {
        self.cell
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Whether the operation has already been taken
    #[must_use]
    pub fn is_consumed(&self) -> bool {
        self.cell
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}

impl PartialEq for PendingOperation {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.cell, &other.cell)
    }
}

impl std::fmt::Debug for PendingOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_consumed() {
            write!(f, "PendingOperation(<consumed>)")
        } else {
            write!(f, "PendingOperation(<pending>)")
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_take_consumes_once() {
        let pending = PendingOperation::future(async { Ok(json!(1)) });
        let clone = pending.clone();

        assert!(!pending.is_consumed());
        assert!(clone.take().is_some());
        assert!(pending.is_consumed());
        assert!(pending.take().is_none());
        assert_eq!(pending, clone);
    }

    #[test]
    fn test_implicit_future_has_no_data() {
        let started = PendingKind::Future(Box::pin(async { Ok(json!(1)) })).start();
        match started {
            Started::InFlight { future, data } => {
                assert_eq!(data, None);
                assert_eq!(tokio_test::block_on(future), Ok(json!(1)));
            },
            other => panic!("expected in-flight, got {other:?}"),
        }
    }

    #[test]
    fn test_explicit_wrapper_carries_data() {
        let kind = PendingKind::Wrapped {
            promise: Operation::future(async { Ok(json!("done")) }),
            data: Some(json!({ "id": 3 })),
        };
        match kind.start() {
            Started::InFlight { data, .. } => assert_eq!(data, Some(json!({ "id": 3 }))),
            other => panic!("expected in-flight, got {other:?}"),
        }
    }

    #[test]
    fn test_thunk_returning_future_starts_it() {
        let kind = PendingKind::Wrapped {
            promise: Operation::thunk(|| Operation::future(async { Ok(json!(2)) })),
            data: Some(json!("optimistic")),
        };
        match kind.start() {
            Started::InFlight { data, future } => {
                assert_eq!(data, Some(json!("optimistic")));
                assert_eq!(tokio_test::block_on(future), Ok(json!(2)));
            },
            other => panic!("expected in-flight, got {other:?}"),
        }
    }

    #[test]
    fn test_thunk_returning_value_short_circuits() {
        let kind = PendingKind::Thunk(Box::new(|| Operation::Ready(json!(42))));
        match kind.start() {
            Started::Immediate(payload) => assert_eq!(payload, Payload::Data(json!(42))),
            other => panic!("expected immediate, got {other:?}"),
        }
    }

    #[test]
    fn test_ready_wrapper_is_inert() {
        let kind = PendingKind::Wrapped {
            promise: Operation::Ready(json!(7)),
            data: None,
        };
        assert!(matches!(kind.start(), Started::Inert(_)));
    }
}
