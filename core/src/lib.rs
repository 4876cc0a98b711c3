//! # Composable Lifecycle Core
//!
//! Core types for dispatching asynchronous work through an action store.
//!
//! A caller dispatches a single intent action (`FETCH_TEST_AUTO`). The
//! runtime resolves it to a service call and emits the lifecycle around it:
//!
//! ```text
//! FETCH_TEST_AUTO ──► FETCH_TEST_REQ ──► FETCH_TEST_OK   (fulfilled)
//!                                    └─► FETCH_TEST_ERR  (rejected)
//! ```
//!
//! This crate holds the pieces that do not need an async runtime:
//!
//! - **Action**: Flux Standard Action with a typed payload ([`action`])
//! - **Codec**: `VERB_SERVICE_METHOD..._SUFFIX` parsing and naming ([`codec`], [`case`])
//! - **Suffixes**: lifecycle phase markers ([`suffix`])
//! - **Services**: the registry intent actions resolve against ([`service`])
//! - **Pending operations**: the three payload shapes of async work ([`pending`])
//! - **Reducer**: how a store folds actions into state ([`reducer`])
//!
//! The dispatch pipeline, the lifecycle middleware and the action creators
//! live in `composable-lifecycle-runtime`.

pub mod action;
pub mod case;
pub mod codec;
pub mod error;
pub mod pending;
pub mod service;
pub mod suffix;
pub mod verbs;

/// Reducer module - how the terminal store folds actions into state
///
/// Reducers here never produce effects: asynchronous work is expressed as
/// pending payloads and handled by middleware before actions reach the store.
pub mod reducer {
    use super::action::Action;

    /// The Reducer trait
    ///
    /// # Example
    ///
    /// ```
    /// use composable_lifecycle_core::{action::Action, reducer::Reducer};
    ///
    /// #[derive(Default)]
    /// struct Flags {
    ///     loading: bool,
    /// }
    ///
    /// struct FlagsReducer;
    ///
    /// impl Reducer for FlagsReducer {
    ///     type State = Flags;
    ///
    ///     fn reduce(&self, state: &mut Flags, action: &Action) {
    ///         match action.action_type() {
    ///             "FETCH_TEST_REQ" => state.loading = true,
    ///             "FETCH_TEST_OK" | "FETCH_TEST_ERR" => state.loading = false,
    ///             _ => {},
    ///         }
    ///     }
    /// }
    ///
    /// let mut flags = Flags::default();
    /// FlagsReducer.reduce(&mut flags, &Action::of_type("FETCH_TEST_REQ"));
    /// assert!(flags.loading);
    /// ```
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// Fold one action into state
        fn reduce(&self, state: &mut Self::State, action: &Action);
    }
}

// Re-export commonly used types
pub use action::{Action, Payload, UNKNOWN_ACTION_TYPE, make_action};
pub use codec::{ActionName, ActionNameParser, parse};
pub use error::{ParseError, ServiceError, SuffixError};
pub use pending::{Operation, PendingKind, PendingOperation, ServiceFuture, Started};
pub use reducer::Reducer;
pub use serde_json::{Value, json};
pub use service::{Resolution, Service, ServiceMethod, ServiceRegistry, resolve};
pub use suffix::{Phase, Suffixes};
