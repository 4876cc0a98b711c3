//! Terminal store sink.
//!
//! The store sits at the end of a [`Pipeline`](crate::pipeline::Pipeline):
//! every action that reaches it is folded into state by the reducer and
//! then broadcast to observers. Dispatching to the store echoes the action
//! back as [`Dispatched::Action`].

use crate::dispatch::{Dispatch, Dispatched};
use crate::error::DispatchError;
use composable_lifecycle_core::{Action, Reducer};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::broadcast;

/// Default capacity of the action broadcast channel
pub const DEFAULT_BROADCAST_CAPACITY: usize = 16;

/// The Store - holds state and applies the reducer
///
/// # Type Parameters
///
/// - `S`: State type
/// - `R`: Reducer implementation
///
/// # Example
///
/// ```
/// use composable_lifecycle_core::{Action, Reducer};
/// use composable_lifecycle_runtime::{Dispatch, Store};
///
/// #[derive(Default)]
/// struct Counter {
///     seen: usize,
/// }
///
/// struct CountActions;
///
/// impl Reducer for CountActions {
///     type State = Counter;
///
///     fn reduce(&self, state: &mut Counter, _action: &Action) {
///         state.seen += 1;
///     }
/// }
///
/// let store = Store::new(Counter::default(), CountActions);
/// store.dispatch(Action::of_type("PING")).unwrap();
/// assert_eq!(store.state(|s| s.seen), 1);
/// ```
pub struct Store<S, R> {
    state: Arc<RwLock<S>>,
    reducer: Arc<R>,
    /// Every action that reached the store, in reduction order.
    action_broadcast: broadcast::Sender<Action>,
}

impl<S, R> Store<S, R>
where
    R: Reducer<State = S>,
{
    /// Create a new store with initial state and reducer
    ///
    /// Action broadcast capacity is [`DEFAULT_BROADCAST_CAPACITY`]; lagging
    /// subscribers miss the oldest actions.
    #[must_use]
    pub fn new(initial_state: S, reducer: R) -> Self {
        Self::with_broadcast_capacity(initial_state, reducer, DEFAULT_BROADCAST_CAPACITY)
    }

    /// Create a new store with a custom broadcast capacity
    #[must_use]
    pub fn with_broadcast_capacity(initial_state: S, reducer: R, capacity: usize) -> Self {
        let (action_broadcast, _) = broadcast::channel(capacity.max(1));

        Self {
            state: Arc::new(RwLock::new(initial_state)),
            reducer: Arc::new(reducer),
            action_broadcast,
        }
    }

    /// Read current state via a closure
    pub fn state<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&S) -> T,
    {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        f(&state)
    }

    /// Subscribe to every action reaching the store
    ///
    /// Only actions reduced after the call are received.
    #[must_use]
    pub fn subscribe_actions(&self) -> broadcast::Receiver<Action> {
        self.action_broadcast.subscribe()
    }
}

impl<S, R> Clone for Store<S, R> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            reducer: Arc::clone(&self.reducer),
            action_broadcast: self.action_broadcast.clone(),
        }
    }
}

impl<S, R> Dispatch for Store<S, R>
where
    S: Send + Sync,
    R: Reducer<State = S> + Send + Sync,
{
    #[tracing::instrument(skip_all, name = "store_dispatch", fields(action_type = %action.action_type()))]
    fn dispatch(&self, action: Action) -> Result<Dispatched, DispatchError> {
        {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            self.reducer.reduce(&mut state, &action);
        }

        if self.action_broadcast.send(action.clone()).is_err() {
            tracing::trace!("No action subscribers");
        }

        Ok(Dispatched::Action(action))
    }
}

impl<S, R> std::fmt::Debug for Store<S, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("subscribers", &self.action_broadcast.receiver_count())
            .finish_non_exhaustive()
    }
}
