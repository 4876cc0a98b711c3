//! # Composable Lifecycle Runtime
//!
//! Runtime pieces that turn one dispatched intent into a full asynchronous
//! lifecycle.
//!
//! ## Core Components
//!
//! - **Pipeline**: a linear chain of [`Middleware`] ending in a terminal sink
//! - **Promise middleware**: resolves `*_AUTO` intents against a service
//!   registry and emits `*_REQ`, then `*_OK` or `*_ERR`
//! - **Action creators**: named accessors that synthesize and cache
//!   dispatching functions (`fetchTest` → `FETCH_TEST_AUTO`)
//! - **Store**: a terminal sink folding actions into state and broadcasting
//!   them to subscribers
//!
//! ## Flow
//!
//! ```text
//! creator("fetchTest").call([true])
//!     │
//!     ▼ FETCH_TEST_AUTO
//! Pipeline ─► PromiseMiddleware ─► TestService.fetchTest(true)
//!                 │
//!                 ├─► next(FETCH_TEST_REQ)            (synchronously)
//!                 │
//!                 └─► spawned settlement
//!                         ├─► dispatch(FETCH_TEST_OK)  (fulfilled)
//!                         └─► dispatch(FETCH_TEST_ERR) (rejected)
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use composable_lifecycle_runtime::{ActionCreatorFactory, Pipeline, PromiseMiddleware, Store};
//!
//! let store = Store::new(AppState::default(), AppReducer);
//! let pipeline = Pipeline::builder(store.clone())
//!     .layer(PromiseMiddleware::with_services(services))
//!     .build();
//!
//! let factory = ActionCreatorFactory::new();
//! let actions = factory.wrap(Arc::new(pipeline));
//!
//! let handle = actions.creator("fetchTest").call([json!(true)])?;
//! let response = handle.into_lifecycle().unwrap().await?;
//! ```

/// Dispatch trait, dispatch results and lifecycle handles
pub mod dispatch;

/// Middleware pipeline
pub mod pipeline;

/// Promise resolution middleware
pub mod promise;

/// Lazy action creators
pub mod creators;

/// Terminal store sink
pub mod store;

/// Environment-driven settings
pub mod config;

/// Metrics descriptions and exporter
pub mod metrics;

/// Error types for the dispatch runtime
pub mod error {
    use composable_lifecycle_core::ServiceError;
    use thiserror::Error;

    /// Errors returned synchronously by a dispatch call
    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum DispatchError {
        /// A lifecycle had to be started outside of a tokio runtime
        ///
        /// Settlement runs on a spawned task, so intents must be dispatched
        /// from within a runtime. Nothing has been called or dispatched when
        /// this is returned.
        #[error("No async runtime available to settle `{0}`")]
        NoRuntime(String),

        /// A pipeline stage refused the action
        #[error("Dispatch stage failed: {0}")]
        Stage(String),
    }

    /// Errors surfaced by awaiting a [`crate::dispatch::LifecycleHandle`]
    #[derive(Error, Debug, Clone, PartialEq)]
    pub enum LifecycleError {
        /// The operation was rejected
        ///
        /// The same error has already been dispatched as the payload of the
        /// failed action.
        #[error("Operation rejected: {0}")]
        Rejected(ServiceError),

        /// The settlement task ended without reporting (it panicked, or the
        /// runtime shut down)
        #[error("Lifecycle settlement aborted")]
        Aborted,
    }
}

// Re-export for convenience
pub use config::{ConfigError, LifecycleSettings};
pub use creators::{ActionCreator, ActionCreatorFactory, ActionDispatcher};
pub use dispatch::{Dispatch, DispatchFn, Dispatched, LifecycleHandle, dispatch_fn};
pub use error::{DispatchError, LifecycleError};
pub use pipeline::{Middleware, Next, Pipeline, PipelineBuilder};
pub use promise::{PromiseMiddleware, PromiseMiddlewareConfig, unwrap_response};
pub use store::Store;
