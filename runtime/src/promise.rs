//! Promise resolution middleware.
//!
//! Turns one intent action into a requested/succeeded/failed lifecycle:
//!
//! 1. An action whose type ends in the intent suffix (`FETCH_TEST_AUTO`) is
//!    resolved against the service registry. The method is called with the
//!    payload and the result becomes `{ promise, data: payload }`. A miss
//!    forwards the action with a `null` payload and nothing else happens.
//! 2. The pending operation is classified: implicit future, explicit
//!    `{ promise, data }` wrapper, or callable. Callables are invoked; a
//!    non-future result short-circuits into a plain forward.
//! 3. The requested action (`FETCH_TEST_REQ`) goes to the next stage before
//!    anything is awaited, carrying `data` and the intent's meta.
//! 4. Settlement runs on a spawned task and dispatches `FETCH_TEST_OK` with
//!    the unwrapped response, or `FETCH_TEST_ERR` with the error, through the
//!    whole pipeline. The returned [`LifecycleHandle`] resolves to the raw
//!    response or the rejection.
//!
//! Actions that are neither intents nor carry a pending payload pass
//! through untouched.

use crate::dispatch::{Dispatch, Dispatched, LifecycleHandle};
use crate::error::DispatchError;
use crate::metrics::{ACTIONS_TOTAL, PASSTHROUGH_TOTAL, RESOLUTION_MISS_TOTAL, SETTLE_DURATION_SECONDS};
use crate::pipeline::{Middleware, Next};
use composable_lifecycle_core::codec::default_parser;
use composable_lifecycle_core::{
    Action, ActionNameParser, Payload, PendingKind, PendingOperation, Phase, Resolution,
    ServiceRegistry, Started, Suffixes, Value,
};
use std::time::Instant;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tracing::Instrument;

/// Configuration for [`PromiseMiddleware`].
///
/// Every field has a default: the `_AUTO`/`_REQ`/`_OK`/`_ERR` suffixes, the
/// standard `VERB_SERVICE_METHOD..._SUFFIX` parser, an empty registry, and
/// diagnostics on in debug builds.
#[derive(Clone)]
pub struct PromiseMiddlewareConfig {
    suffixes: Suffixes,
    services: ServiceRegistry,
    parser: ActionNameParser,
    diagnostics: bool,
}

impl Default for PromiseMiddlewareConfig {
    fn default() -> Self {
        Self {
            suffixes: Suffixes::default(),
            services: ServiceRegistry::empty(),
            parser: default_parser(),
            diagnostics: cfg!(debug_assertions),
        }
    }
}

impl PromiseMiddlewareConfig {
    /// Use custom lifecycle suffixes
    #[must_use]
    pub fn with_suffixes(mut self, suffixes: Suffixes) -> Self {
        self.suffixes = suffixes;
        self
    }

    /// Resolve intents against `services`
    #[must_use]
    pub fn with_services(mut self, services: ServiceRegistry) -> Self {
        self.services = services;
        self
    }

    /// Replace the action name parser
    #[must_use]
    pub fn with_parser(mut self, parser: ActionNameParser) -> Self {
        self.parser = parser;
        self
    }

    /// Log resolution hits and misses
    #[must_use]
    pub const fn with_diagnostics(mut self, diagnostics: bool) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Configured suffixes
    #[must_use]
    pub const fn suffixes(&self) -> &Suffixes {
        &self.suffixes
    }

    /// Configured registry
    #[must_use]
    pub const fn services(&self) -> &ServiceRegistry {
        &self.services
    }

    /// Whether resolution diagnostics are logged
    #[must_use]
    pub const fn diagnostics(&self) -> bool {
        self.diagnostics
    }
}

impl std::fmt::Debug for PromiseMiddlewareConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromiseMiddlewareConfig")
            .field("suffixes", &self.suffixes)
            .field("services", &self.services.service_names())
            .field("diagnostics", &self.diagnostics)
            .finish_non_exhaustive()
    }
}

/// Middleware driving the asynchronous action lifecycle.
///
/// # Example
///
/// ```
/// use composable_lifecycle_core::{json, Action, Service, ServiceRegistry};
/// use composable_lifecycle_runtime::{dispatch_fn, Dispatch, Dispatched, Pipeline, PromiseMiddleware};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let services = ServiceRegistry::builder()
///     .service("TestService", Service::new().method("fetchTest", |_| async { Ok(json!({ "data": 7 })) }))
///     .build();
///
/// let pipeline = Pipeline::builder(dispatch_fn(|action| Ok(Dispatched::Action(action))))
///     .layer(PromiseMiddleware::with_services(services))
///     .build();
///
/// let lifecycle = pipeline
///     .dispatch(Action::with_data("FETCH_TEST_AUTO", json!(true)))
///     .unwrap()
///     .into_lifecycle()
///     .unwrap();
///
/// assert_eq!(lifecycle.await, Ok(json!({ "data": 7 })));
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct PromiseMiddleware {
    config: PromiseMiddlewareConfig,
}

impl PromiseMiddleware {
    /// Create the middleware
    #[must_use]
    pub const fn new(config: PromiseMiddlewareConfig) -> Self {
        Self { config }
    }

    /// Default configuration with a service registry
    #[must_use]
    pub fn with_services(services: ServiceRegistry) -> Self {
        Self::new(PromiseMiddlewareConfig::default().with_services(services))
    }

    /// The middleware configuration
    #[must_use]
    pub const fn config(&self) -> &PromiseMiddlewareConfig {
        &self.config
    }

    /// Resolve an intent, keeping only hits
    fn resolve(&self, action: &Action) -> Option<Resolution> {
        let name = match (self.config.parser)(action.action_type()) {
            Ok(name) => name,
            Err(error) => {
                metrics::counter!(RESOLUTION_MISS_TOTAL).increment(1);
                if self.config.diagnostics {
                    tracing::warn!(action_type = action.action_type(), %error, "Could not parse intent action type");
                }
                return None;
            },
        };

        let resolution = self.config.services.resolve(&name);
        self.log_resolution(&resolution);
        resolution.is_hit().then_some(resolution)
    }

    fn log_resolution(&self, resolution: &Resolution) {
        if !resolution.is_hit() {
            metrics::counter!(RESOLUTION_MISS_TOTAL).increment(1);
        }
        if !self.config.diagnostics {
            return;
        }

        let service = resolution.service_name();
        let method = resolution.method_name();
        if resolution.is_hit() {
            tracing::debug!(service, method, "Calling {service}.{method}");
        } else if resolution.service_found() {
            tracing::warn!(service, method, "Could not find method {service}.{method}");
        } else {
            tracing::warn!(
                service,
                method,
                "Could not find service {service} (singular or plural). Is it registered?"
            );
        }
    }

    fn run_lifecycle(
        &self,
        action: Action,
        kind: PendingKind,
        runtime: &Handle,
        next: Next<'_>,
    ) -> Result<Dispatched, DispatchError> {
        let (future, data) = match kind.start() {
            Started::InFlight { future, data } => (future, data),
            Started::Immediate(payload) => {
                tracing::trace!(action_type = action.action_type(), "Callable returned a plain value, forwarding");
                return next.forward(action.replace_payload(Some(payload)));
            },
            Started::Inert(kind) => {
                tracing::trace!(action_type = action.action_type(), "No operation to await, forwarding");
                let pending = PendingOperation::new(kind);
                return next.forward(action.replace_payload(Some(Payload::Pending(pending))));
            },
        };

        let (action_type, _, meta) = action.into_parts();
        let suffixes = &self.config.suffixes;
        let ok_type = suffixes.replace(&action_type, Phase::Succeeded);
        let err_type = suffixes.replace(&action_type, Phase::Failed);

        let requested = Action::new(
            suffixes.replace(&action_type, Phase::Requested),
            data.map(Payload::Data),
            meta.clone(),
        );
        tracing::debug!(action_type = requested.action_type(), "Lifecycle requested");
        metrics::counter!(ACTIONS_TOTAL, "phase" => Phase::Requested.label()).increment(1);
        next.forward(requested)?;

        let dispatcher = next.dispatcher();
        let (sender, receiver) = oneshot::channel();
        let span = tracing::debug_span!("settle", action_type = %action_type);

        runtime.spawn(
            async move {
                let started = Instant::now();
                let outcome = future.await;
                metrics::histogram!(SETTLE_DURATION_SECONDS).record(started.elapsed().as_secs_f64());

                let settled = match &outcome {
                    Ok(response) => {
                        metrics::counter!(ACTIONS_TOTAL, "phase" => Phase::Succeeded.label()).increment(1);
                        let payload = Payload::Data(unwrap_response(response));
                        Action::new(ok_type, Some(payload), meta)
                    },
                    Err(error) => {
                        metrics::counter!(ACTIONS_TOTAL, "phase" => Phase::Failed.label()).increment(1);
                        Action::with_error(err_type, error.clone())
                    },
                };

                tracing::debug!(action_type = settled.action_type(), "Lifecycle settled");
                if let Err(error) = dispatcher.dispatch(settled) {
                    tracing::warn!(%error, "Failed to dispatch settled action");
                }

                if sender.send(outcome).is_err() {
                    tracing::trace!("Lifecycle handle dropped before settlement");
                }
            }
            .instrument(span),
        );

        Ok(Dispatched::Lifecycle(LifecycleHandle::new(action_type, receiver)))
    }
}

impl Middleware for PromiseMiddleware {
    #[tracing::instrument(skip_all, name = "promise_middleware", fields(action_type = %action.action_type()))]
    fn handle(&self, action: Action, next: Next<'_>) -> Result<Dispatched, DispatchError> {
        if self.config.suffixes.is_auto(action.action_type()) {
            metrics::counter!(ACTIONS_TOTAL, "phase" => Phase::Auto.label()).increment(1);
            let Some(resolution) = self.resolve(&action) else {
                return next.forward(action.replace_payload(Some(Payload::Data(Value::Null))));
            };

            let runtime = current_runtime(&action)?;
            let data = action.data().cloned();
            return match resolution.invoke(data.as_ref()) {
                Some(promise) => {
                    self.run_lifecycle(action, PendingKind::Wrapped { promise, data }, &runtime, next)
                },
                None => next.forward(action.replace_payload(Some(Payload::Data(Value::Null)))),
            };
        }

        let pending = action
            .payload()
            .and_then(Payload::as_pending)
            .filter(|pending| !pending.is_consumed());
        let Some(pending) = pending else {
            return pass_through(action, next);
        };

        let runtime = current_runtime(&action)?;
        match pending.take() {
            Some(kind) => self.run_lifecycle(action, kind, &runtime, next),
            None => pass_through(action, next),
        }
    }
}

/// Settlement needs a runtime; check before anything is called or started
fn current_runtime(action: &Action) -> Result<Handle, DispatchError> {
    Handle::try_current().map_err(|_| DispatchError::NoRuntime(action.action_type().to_string()))
}

fn pass_through(action: Action, next: Next<'_>) -> Result<Dispatched, DispatchError> {
    metrics::counter!(PASSTHROUGH_TOTAL).increment(1);
    tracing::trace!("Passing through");
    next.forward(action)
}

/// Derive the succeeded payload from a raw response.
///
/// - falsy (`null`, `false`, `0`, `""`): as-is
/// - an object with a `data` field: that field
/// - an array whose first element has a `data` field: every element's
///   `data` (`null` where missing)
/// - anything else: the raw response
///
/// ```
/// use composable_lifecycle_runtime::unwrap_response;
/// use serde_json::json;
///
/// assert_eq!(unwrap_response(&json!({ "data": 7 })), json!(7));
/// assert_eq!(unwrap_response(&json!([{ "data": 1 }, { "data": 2 }])), json!([1, 2]));
/// assert_eq!(unwrap_response(&json!("plain")), json!("plain"));
/// ```
#[must_use]
pub fn unwrap_response(response: &Value) -> Value {
    if is_falsy(response) {
        return response.clone();
    }

    match response {
        Value::Object(fields) if fields.contains_key("data") => {
            fields.get("data").cloned().unwrap_or(Value::Null)
        },
        Value::Array(items) if items.first().is_some_and(has_data) => Value::Array(
            items
                .iter()
                .map(|item| item.get("data").cloned().unwrap_or(Value::Null))
                .collect(),
        ),
        _ => response.clone(),
    }
}

fn has_data(value: &Value) -> bool {
    !is_falsy(value) && value.as_object().is_some_and(|fields| fields.contains_key("data"))
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(flag) => !flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n.abs() < f64::EPSILON),
        Value::String(text) => text.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::dispatch::dispatch_fn;
    use crate::pipeline::Pipeline;
    use composable_lifecycle_core::{Operation, Service, ServiceError, json};
    use std::sync::{Arc, Mutex};

    type Log = Arc<Mutex<Vec<Action>>>;

    fn pipeline(services: ServiceRegistry, log: &Log) -> Pipeline {
        let log = Arc::clone(log);
        Pipeline::builder(dispatch_fn(move |action: Action| {
            log.lock().unwrap().push(action.clone());
            Ok(Dispatched::Action(action))
        }))
        .layer(PromiseMiddleware::with_services(services))
        .build()
    }

    fn types(log: &Log) -> Vec<String> {
        log.lock()
            .unwrap()
            .iter()
            .map(|action| action.action_type().to_string())
            .collect()
    }

    #[test]
    fn test_unwrap_response() {
        assert_eq!(unwrap_response(&Value::Null), Value::Null);
        assert_eq!(unwrap_response(&json!(0)), json!(0));
        assert_eq!(unwrap_response(&json!(false)), json!(false));
        assert_eq!(unwrap_response(&json!({ "data": null })), Value::Null);
        assert_eq!(unwrap_response(&json!({ "id": 1 })), json!({ "id": 1 }));
        assert_eq!(
            unwrap_response(&json!([{ "data": 1 }, { "other": 2 }])),
            json!([1, null])
        );
        assert_eq!(unwrap_response(&json!([1, 2])), json!([1, 2]));
        assert_eq!(unwrap_response(&json!([])), json!([]));
    }

    #[test]
    fn test_passthrough_without_runtime() {
        let log = Log::default();
        let pipeline = pipeline(ServiceRegistry::empty(), &log);

        let result = pipeline
            .dispatch(Action::with_data("SET_FLAG", json!(true)))
            .unwrap();

        assert_eq!(result.into_action(), Some(Action::with_data("SET_FLAG", json!(true))));
        assert_eq!(types(&log), ["SET_FLAG"]);
    }

    #[test]
    fn test_resolution_miss_forwards_null_payload() {
        let log = Log::default();
        let pipeline = pipeline(ServiceRegistry::empty(), &log);

        pipeline
            .dispatch(Action::with_data("FETCH_FOO_AUTO", json!(true)).with_meta(json!("m")))
            .unwrap();

        let log = log.lock().unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].action_type(), "FETCH_FOO_AUTO");
        assert_eq!(log[0].data(), Some(&Value::Null));
        assert_eq!(log[0].meta(), Some(&json!("m")));
    }

    #[test]
    fn test_unparseable_intent_is_a_miss() {
        let log = Log::default();
        let pipeline = pipeline(ServiceRegistry::empty(), &log);

        pipeline.dispatch(Action::of_type("X_AUTO")).unwrap();
        assert_eq!(log.lock().unwrap()[0].data(), Some(&Value::Null));
    }

    #[tokio::test]
    async fn test_sync_method_forwards_wrapper_unchanged() {
        let log = Log::default();
        let services = ServiceRegistry::builder()
            .service("TestService", Service::new().sync_method("countTest", |args| json!(args.len())))
            .build();
        let pipeline = pipeline(services, &log);

        pipeline
            .dispatch(Action::with_data("COUNT_TEST_AUTO", json!([1, 2])))
            .unwrap();

        let log = log.lock().unwrap();
        assert_eq!(log.len(), 1);
        match log[0].payload().and_then(Payload::as_pending).and_then(PendingOperation::take) {
            Some(PendingKind::Wrapped {
                promise: Operation::Ready(count),
                data,
            }) => {
                assert_eq!(count, json!(2));
                assert_eq!(data, Some(json!([1, 2])));
            },
            other => panic!("expected a ready wrapper, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_callable_returning_value_short_circuits() {
        let log = Log::default();
        let pipeline = pipeline(ServiceRegistry::empty(), &log);

        let pending = PendingOperation::thunk(|| Operation::Ready(json!("now")));
        let result = pipeline.dispatch(Action::pending("LOAD", pending)).unwrap();

        assert!(!result.is_lifecycle());
        assert_eq!(*log.lock().unwrap(), [Action::with_data("LOAD", json!("now"))]);
    }

    #[test]
    fn test_lifecycle_requires_runtime() {
        let log = Log::default();
        let pipeline = pipeline(ServiceRegistry::empty(), &log);

        let pending = PendingOperation::future(async { Ok(json!(1)) });
        let error = pipeline.dispatch(Action::pending("LOAD", pending)).unwrap_err();

        assert_eq!(error, DispatchError::NoRuntime("LOAD".to_string()));
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_thunk_is_not_run_without_runtime() {
        let log = Log::default();
        let pipeline = pipeline(ServiceRegistry::empty(), &log);
        let ran = Arc::new(Mutex::new(false));

        let flag = Arc::clone(&ran);
        let pending = PendingOperation::thunk(move || {
            *flag.lock().unwrap() = true;
            Operation::Ready(json!("now"))
        });
        let error = pipeline.dispatch(Action::pending("LOAD", pending.clone())).unwrap_err();

        assert_eq!(error, DispatchError::NoRuntime("LOAD".to_string()));
        assert!(!*ran.lock().unwrap());
        assert!(!pending.is_consumed());
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_sync_method_not_called_without_runtime() {
        let log = Log::default();
        let called = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&called);
        let services = ServiceRegistry::builder()
            .service(
                "TestService",
                Service::new().sync_method("countTest", move |args| {
                    *counter.lock().unwrap() += 1;
                    json!(args.len())
                }),
            )
            .build();
        let pipeline = pipeline(services, &log);

        let error = pipeline.dispatch(Action::of_type("COUNT_TEST_AUTO")).unwrap_err();

        assert_eq!(error, DispatchError::NoRuntime("COUNT_TEST_AUTO".to_string()));
        assert_eq!(*called.lock().unwrap(), 0);
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_explicit_wrapper_lifecycle() {
        let log = Log::default();
        let pipeline = pipeline(ServiceRegistry::empty(), &log);

        let pending = PendingOperation::wrapped(
            Operation::future(async { Ok(json!([{ "data": "a" }, { "data": "b" }])) }),
            Some(json!("optimistic")),
        );
        let action = Action::pending("SAVE_ITEM", pending).with_meta(json!({ "page": 1 }));

        let handle = pipeline.dispatch(action).unwrap().into_lifecycle().unwrap();
        assert_eq!(types(&log), ["SAVE_ITEM_REQ"]);
        assert_eq!(log.lock().unwrap()[0].data(), Some(&json!("optimistic")));

        let response = handle.await.unwrap();
        assert_eq!(response, json!([{ "data": "a" }, { "data": "b" }]));

        let log = log.lock().unwrap();
        assert_eq!(log[1].action_type(), "SAVE_ITEM_OK");
        assert_eq!(log[1].data(), Some(&json!(["a", "b"])));
        assert_eq!(log[1].meta(), Some(&json!({ "page": 1 })));
    }

    #[tokio::test]
    async fn test_rejection_carries_no_meta() {
        let log = Log::default();
        let pipeline = pipeline(ServiceRegistry::empty(), &log);

        let pending = PendingOperation::future(async { Err(ServiceError::new("boom")) });
        let action = Action::pending("SAVE_ITEM", pending).with_meta(json!(1));

        let handle = pipeline.dispatch(action).unwrap().into_lifecycle().unwrap();
        assert!(handle.await.is_err());

        let log = log.lock().unwrap();
        assert_eq!(log[0], Action::new("SAVE_ITEM_REQ", None, Some(json!(1))));
        assert_eq!(log[1], Action::with_error("SAVE_ITEM_ERR", ServiceError::new("boom")));
    }

    #[tokio::test]
    async fn test_consumed_pending_passes_through() {
        let log = Log::default();
        let pipeline = pipeline(ServiceRegistry::empty(), &log);

        let pending = PendingOperation::future(async { Ok(json!(1)) });
        let _ = pending.take();

        let result = pipeline.dispatch(Action::pending("LOAD", pending)).unwrap();
        assert!(!result.is_lifecycle());
        assert_eq!(types(&log), ["LOAD"]);
    }
}
