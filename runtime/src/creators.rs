//! Lazy action creators.
//!
//! An [`ActionDispatcher`] decorates a dispatch target with named creators.
//! Asking for a creator by name synthesizes it on first access and caches it
//! for the lifetime of the dispatcher:
//!
//! ```text
//! creator("fetchTest")            ──► type FETCH_TEST_AUTO
//! creator("fetchTest").call([])   ──► { type }                      (no payload)
//! creator("fetchTest").call([x])  ──► { type, payload: x }
//! creator("fetchTest").call([a,b])──► { type, payload: [a, b] }
//! ```
//!
//! Everything else dispatched through the decorator goes straight to the
//! target.

use crate::dispatch::{Dispatch, Dispatched};
use crate::error::DispatchError;
use crate::metrics::CREATORS_SYNTHESIZED_TOTAL;
use composable_lifecycle_core::case::upper_snake_case;
use composable_lifecycle_core::{Action, Payload, Phase, Suffixes, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

/// A synthesized function dispatching one intent type.
pub struct ActionCreator {
    name: String,
    action_type: String,
    target: Arc<dyn Dispatch>,
}

impl ActionCreator {
    /// Name the creator was requested under (`fetchTest`)
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Type of the actions it dispatches (`FETCH_TEST_AUTO`)
    #[must_use]
    pub fn action_type(&self) -> &str {
        &self.action_type
    }

    /// Build the action for a call without dispatching it
    ///
    /// No arguments means no payload; a single argument is the payload
    /// itself; more become an array in call order.
    #[must_use]
    pub fn action<I>(&self, args: I) -> Action
    where
        I: IntoIterator<Item = Value>,
    {
        let mut args: Vec<Value> = args.into_iter().collect();
        let payload = match args.len() {
            0 => None,
            1 => args.pop().map(Payload::Data),
            _ => Some(Payload::Data(Value::Array(args))),
        };
        Action::new(self.action_type.clone(), payload, None)
    }

    /// Dispatch an intent built from `args`
    ///
    /// # Errors
    ///
    /// Propagates the target's [`DispatchError`].
    pub fn call<I>(&self, args: I) -> Result<Dispatched, DispatchError>
    where
        I: IntoIterator<Item = Value>,
    {
        self.target.dispatch(self.action(args))
    }
}

impl std::fmt::Debug for ActionCreator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionCreator")
            .field("name", &self.name)
            .field("action_type", &self.action_type)
            .finish_non_exhaustive()
    }
}

/// Dispatch target decorated with cached action creators.
///
/// # Example
///
/// ```
/// use composable_lifecycle_core::json;
/// use composable_lifecycle_runtime::{dispatch_fn, ActionDispatcher, Dispatched};
/// use std::sync::Arc;
///
/// let actions = ActionDispatcher::new(Arc::new(dispatch_fn(|action| Ok(Dispatched::Action(action)))));
///
/// let fetch = actions.creator("fetchTest");
/// assert_eq!(fetch.action_type(), "FETCH_TEST_AUTO");
/// assert!(Arc::ptr_eq(&fetch, &actions.creator("fetchTest")));
///
/// let sent = fetch.call([json!(true)]).unwrap().into_action().unwrap();
/// assert_eq!(sent.data(), Some(&json!(true)));
/// ```
pub struct ActionDispatcher {
    target: Arc<dyn Dispatch>,
    suffixes: Suffixes,
    creators: RwLock<HashMap<String, Arc<ActionCreator>>>,
}

impl ActionDispatcher {
    /// Decorate `target`, using the default intent suffix
    #[must_use]
    pub fn new(target: Arc<dyn Dispatch>) -> Self {
        Self::with_suffixes(target, Suffixes::default())
    }

    /// Decorate `target`, using the intent suffix from `suffixes`
    #[must_use]
    pub fn with_suffixes(target: Arc<dyn Dispatch>, suffixes: Suffixes) -> Self {
        Self {
            target,
            suffixes,
            creators: RwLock::new(HashMap::new()),
        }
    }

    /// Get or create the creator for `name`
    ///
    /// The same `Arc` is returned for the same name every time.
    pub fn creator(&self, name: &str) -> Arc<ActionCreator> {
        if let Some(creator) = self
            .creators
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
        {
            return Arc::clone(creator);
        }

        let mut creators = self.creators.write().unwrap_or_else(PoisonError::into_inner);
        let creator = creators.entry(name.to_string()).or_insert_with(|| {
            let action_type = format!("{}{}", upper_snake_case(name), self.suffixes.get(Phase::Auto));
            tracing::debug!(name, action_type, "Synthesized action creator");
            metrics::counter!(CREATORS_SYNTHESIZED_TOTAL).increment(1);
            Arc::new(ActionCreator {
                name: name.to_string(),
                action_type,
                target: Arc::clone(&self.target),
            })
        });
        Arc::clone(creator)
    }

    /// Whether a creator for `name` has been synthesized
    #[must_use]
    pub fn has_creator(&self, name: &str) -> bool {
        self.creators
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Names of the synthesized creators, sorted
    #[must_use]
    pub fn creator_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .creators
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// The decorated target
    #[must_use]
    pub const fn target(&self) -> &Arc<dyn Dispatch> {
        &self.target
    }
}

impl Dispatch for ActionDispatcher {
    fn dispatch(&self, action: Action) -> Result<Dispatched, DispatchError> {
        self.target.dispatch(action)
    }
}

impl std::fmt::Debug for ActionDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionDispatcher")
            .field("suffixes", &self.suffixes)
            .field("creators", &self.creator_names())
            .finish_non_exhaustive()
    }
}

/// Wraps each dispatch target at most once.
///
/// Targets are keyed by identity (the `Arc` allocation). Wrapping the same
/// target twice, or wrapping a dispatcher this factory produced, returns the
/// existing decorator. Registered targets are kept alive by the factory.
#[derive(Default)]
pub struct ActionCreatorFactory {
    suffixes: Suffixes,
    wrapped: Mutex<HashMap<usize, Arc<ActionDispatcher>>>,
}

impl ActionCreatorFactory {
    /// Factory using the default intent suffix
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Factory whose dispatchers use `suffixes`
    #[must_use]
    pub fn with_suffixes(suffixes: Suffixes) -> Self {
        Self {
            suffixes,
            wrapped: Mutex::default(),
        }
    }

    /// Decorate `target`, or return its existing decorator
    pub fn wrap(&self, target: Arc<dyn Dispatch>) -> Arc<ActionDispatcher> {
        let key = identity(&target);
        let mut wrapped = self.wrapped.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = wrapped.get(&key) {
            return Arc::clone(existing);
        }

        let dispatcher = Arc::new(ActionDispatcher::with_suffixes(target, self.suffixes.clone()));
        wrapped.insert(key, Arc::clone(&dispatcher));
        wrapped.insert(identity(&dispatcher), Arc::clone(&dispatcher));
        tracing::debug!(targets = wrapped.len(), "Wrapped dispatch target");
        dispatcher
    }

    /// Register an existing dispatcher, or return the one already registered
    /// under the same identity
    pub fn wrap_dispatcher(&self, dispatcher: Arc<ActionDispatcher>) -> Arc<ActionDispatcher> {
        let mut wrapped = self.wrapped.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(wrapped.entry(identity(&dispatcher)).or_insert(dispatcher))
    }

    /// Number of registered identities (targets and their decorators)
    #[must_use]
    pub fn len(&self) -> usize {
        self.wrapped.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether nothing has been wrapped yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for ActionCreatorFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionCreatorFactory")
            .field("suffixes", &self.suffixes)
            .field("registered", &self.len())
            .finish()
    }
}

fn identity<T: ?Sized>(target: &Arc<T>) -> usize {
    Arc::as_ptr(target).cast::<()>().addr()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::dispatch::dispatch_fn;
    use composable_lifecycle_core::json;
    use proptest::prelude::*;

    fn echo() -> Arc<dyn Dispatch> {
        Arc::new(dispatch_fn(|action| Ok(Dispatched::Action(action))))
    }

    fn sent(result: Result<Dispatched, DispatchError>) -> Action {
        result.unwrap().into_action().unwrap()
    }

    #[test]
    fn test_creator_type_from_name() {
        let actions = ActionDispatcher::new(echo());
        assert_eq!(actions.creator("fetchTest").action_type(), "FETCH_TEST_AUTO");
        assert_eq!(
            actions.creator("fetchAuthRecoveryLink").action_type(),
            "FETCH_AUTH_RECOVERY_LINK_AUTO"
        );
    }

    #[test]
    fn test_payload_rules() {
        let actions = ActionDispatcher::new(echo());
        let fetch = actions.creator("fetchTest");

        let none = sent(fetch.call([]));
        assert!(none.payload().is_none());

        let one = sent(fetch.call([json!("x")]));
        assert_eq!(one.data(), Some(&json!("x")));

        let one_array = sent(fetch.call([json!([1, 2])]));
        assert_eq!(one_array.data(), Some(&json!([1, 2])));

        let many = sent(fetch.call([json!(1), json!("b"), json!(null)]));
        assert_eq!(many.data(), Some(&json!([1, "b", null])));
    }

    #[test]
    fn test_creator_is_cached() {
        let actions = ActionDispatcher::new(echo());
        assert!(!actions.has_creator("fetchTest"));

        let first = actions.creator("fetchTest");
        let second = actions.creator("fetchTest");

        assert!(Arc::ptr_eq(&first, &second));
        assert!(actions.has_creator("fetchTest"));
        assert_eq!(actions.creator_names(), ["fetchTest"]);
    }

    #[test]
    fn test_custom_intent_suffix() {
        let suffixes = Suffixes::new("_INTENT", "", "", "").unwrap();
        let actions = ActionDispatcher::with_suffixes(echo(), suffixes);
        assert_eq!(actions.creator("listKits").action_type(), "LIST_KITS_INTENT");
    }

    #[test]
    fn test_dispatch_passes_through() {
        let actions = ActionDispatcher::new(echo());
        let action = sent(actions.dispatch(Action::with_data("SET_FLAG", json!(true))));
        assert_eq!(action, Action::with_data("SET_FLAG", json!(true)));
        assert!(actions.creator_names().is_empty());
    }

    #[test]
    fn test_factory_wraps_once_per_target() {
        let factory = ActionCreatorFactory::new();
        let target = echo();
        let other = echo();

        let first = factory.wrap(Arc::clone(&target));
        let again = factory.wrap(Arc::clone(&target));
        let different = factory.wrap(other);

        assert!(Arc::ptr_eq(&first, &again));
        assert!(!Arc::ptr_eq(&first, &different));
    }

    #[test]
    fn test_factory_returns_wrapped_instance_unchanged() {
        let factory = ActionCreatorFactory::new();
        let dispatcher = factory.wrap(echo());

        let as_target: Arc<dyn Dispatch> = dispatcher.clone();
        assert!(Arc::ptr_eq(&factory.wrap(as_target), &dispatcher));
        assert!(Arc::ptr_eq(&factory.wrap_dispatcher(Arc::clone(&dispatcher)), &dispatcher));
    }

    proptest! {
        #[test]
        fn prop_creator_is_reference_stable(name in "[a-z]{1,8}([A-Z][a-z]{1,8}){0,3}") {
            let actions = ActionDispatcher::new(echo());
            prop_assert!(Arc::ptr_eq(&actions.creator(&name), &actions.creator(&name)));
        }

        #[test]
        fn prop_multi_argument_payload_preserves_order(args in proptest::collection::vec(any::<i64>(), 2..6)) {
            let actions = ActionDispatcher::new(echo());
            let values: Vec<Value> = args.iter().map(|n| json!(n)).collect();
            let action = sent(actions.creator("saveItems").call(values.clone()));
            prop_assert_eq!(action.data(), Some(&Value::Array(values)));
        }
    }
}
