//! Linear dispatch pipeline.
//!
//! A [`Pipeline`] is an ordered list of [`Middleware`] in front of a terminal
//! sink (usually a [`Store`](crate::store::Store)). Each middleware receives
//! the action and a [`Next`] handle, and decides whether to forward it,
//! replace it, or dispatch new actions through the whole pipeline.
//!
//! ```text
//! dispatch(action)
//!     │
//!     ▼
//! layer 0 ──next.forward──► layer 1 ──next.forward──► ... ──► sink
//!     │
//!     └── next.dispatcher().dispatch(derived)   (re-enters at layer 0)
//! ```

use crate::dispatch::{Dispatch, Dispatched};
use crate::error::DispatchError;
use composable_lifecycle_core::Action;
use std::sync::Arc;

/// One stage of the dispatch pipeline.
///
/// # Example
///
/// ```
/// use composable_lifecycle_core::Action;
/// use composable_lifecycle_runtime::{Dispatched, DispatchError, Middleware, Next};
///
/// /// Drops every action whose type starts with `DEBUG_`
/// struct DropDebug;
///
/// impl Middleware for DropDebug {
///     fn handle(&self, action: Action, next: Next<'_>) -> Result<Dispatched, DispatchError> {
///         if action.action_type().starts_with("DEBUG_") {
///             return Ok(Dispatched::Action(action));
///         }
///         next.forward(action)
///     }
/// }
/// ```
pub trait Middleware: Send + Sync {
    /// Handle an action on its way to the sink
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError`] if this stage (or a later one) refuses the
    /// action.
    fn handle(&self, action: Action, next: Next<'_>) -> Result<Dispatched, DispatchError>;
}

struct Inner {
    layers: Vec<Arc<dyn Middleware>>,
    sink: Arc<dyn Dispatch>,
}

/// Middleware chain ending in a terminal sink.
///
/// Cheap to clone; clones share the same stages.
#[derive(Clone)]
pub struct Pipeline {
    inner: Arc<Inner>,
}

impl Pipeline {
    /// Start building a pipeline that ends in `sink`
    #[must_use]
    pub fn builder(sink: impl Dispatch + 'static) -> PipelineBuilder {
        PipelineBuilder {
            layers: Vec::new(),
            sink: Arc::new(sink),
        }
    }

    /// Number of middleware stages
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.layers.len()
    }

    /// Whether the pipeline has no middleware (dispatch goes straight to the sink)
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.layers.is_empty()
    }

    fn run(&self, index: usize, action: Action) -> Result<Dispatched, DispatchError> {
        match self.inner.layers.get(index) {
            Some(layer) => layer.handle(
                action,
                Next {
                    pipeline: self,
                    index: index + 1,
                },
            ),
            None => self.inner.sink.dispatch(action),
        }
    }
}

impl Dispatch for Pipeline {
    fn dispatch(&self, action: Action) -> Result<Dispatched, DispatchError> {
        self.run(0, action)
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("layers", &self.len())
            .finish_non_exhaustive()
    }
}

/// Builder for [`Pipeline`]. Layers run in the order they are added.
pub struct PipelineBuilder {
    layers: Vec<Arc<dyn Middleware>>,
    sink: Arc<dyn Dispatch>,
}

impl PipelineBuilder {
    /// Append a middleware stage
    #[must_use]
    pub fn layer(mut self, middleware: impl Middleware + 'static) -> Self {
        self.layers.push(Arc::new(middleware));
        self
    }

    /// Append an already shared middleware stage
    #[must_use]
    pub fn layer_arc(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.layers.push(middleware);
        self
    }

    /// Freeze the pipeline
    #[must_use]
    pub fn build(self) -> Pipeline {
        Pipeline {
            inner: Arc::new(Inner {
                layers: self.layers,
                sink: self.sink,
            }),
        }
    }
}

/// Handle a middleware uses to continue the chain.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    pipeline: &'a Pipeline,
    index: usize,
}

impl Next<'_> {
    /// Pass the action to the next stage
    ///
    /// # Errors
    ///
    /// Propagates the error of whichever later stage refused the action.
    pub fn forward(self, action: Action) -> Result<Dispatched, DispatchError> {
        self.pipeline.run(self.index, action)
    }

    /// The enclosing pipeline, for dispatching new actions from the top
    #[must_use]
    pub fn dispatcher(self) -> Pipeline {
        self.pipeline.clone()
    }
}

impl std::fmt::Debug for Next<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Next").field("index", &self.index).finish()
    }
}
