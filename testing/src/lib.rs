//! # Composable Lifecycle Testing
//!
//! Testing utilities for the composable lifecycle dispatch runtime.
//!
//! This crate provides:
//! - A recording sink that captures every dispatched action
//! - Mock services with canned responses and call recording
//! - Tracing setup and assertion helpers
//! - Property-based testing strategies for action names
//!
//! ## Example
//!
//! ```ignore
//! use composable_lifecycle_testing::{MockServices, RecordingSink, assert_action_types};
//!
//! #[tokio::test]
//! async fn test_fetch_lifecycle() {
//!     let services = MockServices::new().resolves("TestService", "fetchTest", json!({ "data": 7 }));
//!     let sink = RecordingSink::new();
//!     let pipeline = Pipeline::builder(sink.clone())
//!         .layer(PromiseMiddleware::with_services(services.registry()))
//!         .build();
//!
//!     let handle = pipeline.dispatch(Action::with_data("FETCH_TEST_AUTO", json!(true)))?;
//!     handle.into_lifecycle().unwrap().await?;
//!
//!     assert_action_types(&sink.actions(), &["FETCH_TEST_REQ", "FETCH_TEST_OK"]);
//! }
//! ```

/// Mock dispatch targets and services.
pub mod mocks {
    use composable_lifecycle_core::{Action, Service, ServiceError, ServiceRegistry, Value};
    use composable_lifecycle_runtime::{Dispatch, DispatchError, Dispatched};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex, PoisonError};
    use std::time::Duration;
    use tokio::sync::Notify;

    /// Terminal sink recording every action it receives
    ///
    /// Clones share the same record.
    ///
    /// # Example
    ///
    /// ```
    /// use composable_lifecycle_core::Action;
    /// use composable_lifecycle_runtime::Dispatch;
    /// use composable_lifecycle_testing::mocks::RecordingSink;
    ///
    /// let sink = RecordingSink::new();
    /// sink.dispatch(Action::of_type("PING")).unwrap();
    /// assert_eq!(sink.action_types(), ["PING"]);
    /// ```
    #[derive(Clone, Default)]
    pub struct RecordingSink {
        actions: Arc<Mutex<Vec<Action>>>,
        notify: Arc<Notify>,
    }

    impl RecordingSink {
        /// Create an empty sink
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Snapshot of the recorded actions, in arrival order
        #[must_use]
        pub fn actions(&self) -> Vec<Action> {
            self.actions.lock().unwrap_or_else(PoisonError::into_inner).clone()
        }

        /// Types of the recorded actions, in arrival order
        #[must_use]
        pub fn action_types(&self) -> Vec<String> {
            self.actions
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .iter()
                .map(|action| action.action_type().to_string())
                .collect()
        }

        /// Number of recorded actions
        #[must_use]
        pub fn len(&self) -> usize {
            self.actions.lock().unwrap_or_else(PoisonError::into_inner).len()
        }

        /// Whether nothing has been recorded
        #[must_use]
        pub fn is_empty(&self) -> bool {
            self.len() == 0
        }

        /// Forget everything recorded so far
        pub fn clear(&self) {
            self.actions.lock().unwrap_or_else(PoisonError::into_inner).clear();
        }

        /// Wait until at least `count` actions were recorded
        ///
        /// Returns `false` if `timeout` elapsed first.
        pub async fn wait_for(&self, count: usize, timeout: Duration) -> bool {
            tokio::time::timeout(timeout, async {
                loop {
                    let notified = self.notify.notified();
                    if self.len() >= count {
                        return;
                    }
                    notified.await;
                }
            })
            .await
            .is_ok()
        }
    }

    impl Dispatch for RecordingSink {
        fn dispatch(&self, action: Action) -> Result<Dispatched, DispatchError> {
            self.actions
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(action.clone());
            self.notify.notify_waiters();
            Ok(Dispatched::Action(action))
        }
    }

    impl std::fmt::Debug for RecordingSink {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("RecordingSink")
                .field("actions", &self.action_types())
                .finish()
        }
    }

    /// One recorded service call
    #[derive(Debug, Clone, PartialEq)]
    pub struct Call {
        /// Service name (`TestService`)
        pub service: String,
        /// Method name (`fetchTest`)
        pub method: String,
        /// Arguments the method received
        pub args: Vec<Value>,
    }

    /// Builder for a registry of canned services that records every call
    ///
    /// # Example
    ///
    /// ```
    /// use composable_lifecycle_core::{json, resolve};
    /// use composable_lifecycle_testing::mocks::MockServices;
    ///
    /// let mocks = MockServices::new().resolves("TestService", "fetchTest", json!({ "data": 7 }));
    /// let registry = mocks.registry();
    ///
    /// assert!(resolve("FETCH", "TEST", "TEST", &registry).is_hit());
    /// ```
    #[derive(Clone, Default)]
    pub struct MockServices {
        services: HashMap<String, Service>,
        calls: Arc<Mutex<Vec<Call>>>,
    }

    impl MockServices {
        /// No services
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// `service.method` resolves with `response`
        #[must_use]
        pub fn resolves(self, service: &str, method: &str, response: Value) -> Self {
            self.register(service, method, move |_| {
                let response = response.clone();
                async move { Ok(response) }
            })
        }

        /// `service.method` rejects with `error`
        #[must_use]
        pub fn rejects(self, service: &str, method: &str, error: ServiceError) -> Self {
            self.register(service, method, move |_| {
                let error = error.clone();
                async move { Err(error) }
            })
        }

        /// `service.method` resolves with `response` after `delay`
        #[must_use]
        pub fn delayed(self, service: &str, method: &str, response: Value, delay: Duration) -> Self {
            self.register(service, method, move |_| {
                let response = response.clone();
                async move {
                    tokio::time::sleep(delay).await;
                    Ok(response)
                }
            })
        }

        /// `service.method` resolves with its arguments: nothing becomes
        /// `null`, one argument itself, several an array
        #[must_use]
        pub fn echoes(self, service: &str, method: &str) -> Self {
            self.register(service, method, |mut args: Vec<Value>| async move {
                Ok(match args.len() {
                    0 => Value::Null,
                    1 => args.pop().unwrap_or(Value::Null),
                    _ => Value::Array(args),
                })
            })
        }

        /// `service.method` answers synchronously with `value`
        #[must_use]
        pub fn sync(mut self, service: &str, method: &str, value: Value) -> Self {
            let calls = Arc::clone(&self.calls);
            let (service_name, method_name) = (service.to_string(), method.to_string());
            let entry = self.services.remove(service).unwrap_or_default();
            let entry = entry.sync_method(method, move |args| {
                record(&calls, &service_name, &method_name, &args);
                value.clone()
            });
            self.services.insert(service.to_string(), entry);
            self
        }

        fn register<F, Fut>(mut self, service: &str, method: &str, respond: F) -> Self
        where
            F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
            Fut: std::future::Future<Output = Result<Value, ServiceError>> + Send + 'static,
        {
            let calls = Arc::clone(&self.calls);
            let (service_name, method_name) = (service.to_string(), method.to_string());
            let entry = self.services.remove(service).unwrap_or_default();
            let entry = entry.method(method, move |args| {
                record(&calls, &service_name, &method_name, &args);
                respond(args)
            });
            self.services.insert(service.to_string(), entry);
            self
        }

        /// Freeze into a registry; calls keep being recorded here
        #[must_use]
        pub fn registry(&self) -> ServiceRegistry {
            self.services
                .iter()
                .fold(ServiceRegistry::builder(), |builder, (name, service)| {
                    builder.service(name.clone(), service.clone())
                })
                .build()
        }

        /// Every call made so far, in call order
        #[must_use]
        pub fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
        }
    }

    impl std::fmt::Debug for MockServices {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("MockServices")
                .field("services", &self.services)
                .field("calls", &self.calls())
                .finish()
        }
    }

    fn record(calls: &Mutex<Vec<Call>>, service: &str, method: &str, args: &[Value]) {
        calls.lock().unwrap_or_else(PoisonError::into_inner).push(Call {
            service: service.to_string(),
            method: method.to_string(),
            args: args.to_vec(),
        });
    }
}

/// Test helpers and utilities.
pub mod helpers {
    use composable_lifecycle_core::{Action, Value};
    use composable_lifecycle_runtime::{LifecycleError, LifecycleHandle};
    use tracing_subscriber::EnvFilter;

    /// Install a test-friendly tracing subscriber
    ///
    /// Honors `RUST_LOG`; output goes through the test harness capture.
    /// Safe to call from every test.
    pub fn init_test_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    /// Assert the recorded actions have exactly these types, in order
    #[track_caller]
    pub fn assert_action_types(actions: &[Action], expected: &[&str]) {
        let actual: Vec<&str> = actions.iter().map(Action::action_type).collect();
        assert_eq!(actual, expected, "unexpected action sequence");
    }

    /// Await several lifecycles concurrently
    pub async fn settle_all<I>(handles: I) -> Vec<Result<Value, LifecycleError>>
    where
        I: IntoIterator<Item = LifecycleHandle>,
    {
        futures::future::join_all(handles).await
    }
}

/// Property-based testing utilities using proptest.
pub mod properties {
    use proptest::prelude::*;

    /// An upper-case word (`FETCH`, `AUTH`)
    pub fn segment() -> impl Strategy<Value = String> {
        "[A-Z][A-Z0-9]{0,7}"
    }

    /// A well-formed `VERB_SERVICE_METHOD..._SUFFIX` type with 3 to 6 segments
    pub fn action_type(suffix: &'static str) -> impl Strategy<Value = String> {
        proptest::collection::vec(segment(), 2..6).prop_map(move |segments| {
            format!("{}{suffix}", segments.join("_"))
        })
    }

    /// A camelCase creator name (`fetchAuthRecoveryLink`)
    pub fn creator_name() -> impl Strategy<Value = String> {
        ("[a-z]{2,8}", proptest::collection::vec("[A-Z][a-z]{1,8}", 0..4))
            .prop_map(|(head, tail)| format!("{head}{}", tail.concat()))
    }
}

// Re-export commonly used items
pub use helpers::{assert_action_types, init_test_tracing, settle_all};
pub use mocks::{Call, MockServices, RecordingSink};
