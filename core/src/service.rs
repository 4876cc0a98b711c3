//! Service registry and action name resolution.
//!
//! The registry is a two-level lookup: service name → [`Service`], then
//! method name → [`ServiceMethod`]. It is built once at application start
//! and is read-only afterwards; clones share the same maps.

use crate::codec::{ActionName, method_name, service_candidates};
use crate::error::ServiceError;
use crate::pending::Operation;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

/// A service method: positional arguments in, operation out.
pub type ServiceMethod = Arc<dyn Fn(Vec<Value>) -> Operation + Send + Sync>;

/// A named collection of service methods.
///
/// # Example
///
/// ```
/// use composable_lifecycle_core::service::Service;
/// use serde_json::json;
///
/// let service = Service::new()
///     .method("fetchTest", |_args| async { Ok(json!({ "data": 7 })) })
///     .sync_method("countTest", |args| json!(args.len()));
///
/// assert_eq!(service.method_names(), ["countTest", "fetchTest"]);
/// ```
#[derive(Clone, Default)]
pub struct Service {
    methods: HashMap<String, ServiceMethod>,
}

impl Service {
    /// Create a service with no methods
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an asynchronous method
    #[must_use]
    pub fn method<F, Fut>(self, name: impl Into<String>, method: F) -> Self
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ServiceError>> + Send + 'static,
    {
        self.raw_method(name, Arc::new(move |args| Operation::future(method(args))))
    }

    /// Register a method that answers synchronously
    #[must_use]
    pub fn sync_method<F>(self, name: impl Into<String>, method: F) -> Self
    where
        F: Fn(Vec<Value>) -> Value + Send + Sync + 'static,
    {
        self.raw_method(name, Arc::new(move |args| Operation::Ready(method(args))))
    }

    /// Register a method returning any [`Operation`]
    #[must_use]
    pub fn raw_method(mut self, name: impl Into<String>, method: ServiceMethod) -> Self {
        self.methods.insert(name.into(), method);
        self
    }

    /// Look up a method by name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ServiceMethod> {
        self.methods.get(name)
    }

    /// Registered method names, sorted
    #[must_use]
    pub fn method_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.methods.keys().cloned().collect();
        names.sort();
        names
    }
}

impl std::fmt::Debug for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Service")
            .field("methods", &self.method_names())
            .finish()
    }
}

/// Read-only registry of services, keyed by service name.
#[derive(Clone, Default, Debug)]
pub struct ServiceRegistry {
    services: Arc<HashMap<String, Service>>,
}

impl ServiceRegistry {
    /// Start building a registry
    #[must_use]
    pub fn builder() -> ServiceRegistryBuilder {
        ServiceRegistryBuilder::default()
    }

    /// A registry with no services
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Look up a service by name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Service> {
        self.services.get(name)
    }

    /// Registered service names, sorted
    #[must_use]
    pub fn service_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.services.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of registered services
    #[must_use]
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// Whether no services are registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Resolve an action name to a service method. See [`resolve`].
    #[must_use]
    pub fn resolve(&self, name: &ActionName) -> Resolution {
        resolve(&name.verb, &name.service, &name.method, self)
    }
}

/// Builder for [`ServiceRegistry`].
#[derive(Default, Debug)]
pub struct ServiceRegistryBuilder {
    services: HashMap<String, Service>,
}

impl ServiceRegistryBuilder {
    /// Register a service under `name` (e.g. `"AuthService"`)
    #[must_use]
    pub fn service(mut self, name: impl Into<String>, service: Service) -> Self {
        self.services.insert(name.into(), service);
        self
    }

    /// Freeze the registry
    #[must_use]
    pub fn build(self) -> ServiceRegistry {
        ServiceRegistry {
            services: Arc::new(self.services),
        }
    }
}

/// Result of resolving an action name against a registry.
///
/// The names are kept even on a miss, for diagnostics.
#[derive(Clone)]
pub struct Resolution {
    method: Option<ServiceMethod>,
    service_name: String,
    method_name: String,
    service_found: bool,
}

impl Resolution {
    /// Whether a method was found
    #[must_use]
    pub const fn is_hit(&self) -> bool {
        self.method.is_some()
    }

    /// Whether the service was found (the method may still be missing)
    #[must_use]
    pub const fn service_found(&self) -> bool {
        self.service_found
    }

    /// The resolved method
    #[must_use]
    pub const fn method(&self) -> Option<&ServiceMethod> {
        self.method.as_ref()
    }

    /// Service name that was hit, or the last one tried
    #[must_use]
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Method name looked up on the service
    #[must_use]
    pub fn method_name(&self) -> &str {
        &self.method_name
    }

    /// Call the resolved method with `payload` spread into arguments.
    ///
    /// Returns `None` on a miss, without calling anything.
    #[must_use]
    pub fn invoke(&self, payload: Option<&Value>) -> Option<Operation> {
        self.method
            .as_ref()
            .map(|method| method(arguments(payload)))
    }
}

impl std::fmt::Debug for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolution")
            .field("hit", &self.is_hit())
            .field("service_name", &self.service_name)
            .field("method_name", &self.method_name)
            .field("service_found", &self.service_found)
            .finish()
    }
}

/// Spread a payload into positional arguments.
///
/// An array becomes its elements, any other value a single argument, and an
/// absent payload no arguments at all.
#[must_use]
pub fn arguments(payload: Option<&Value>) -> Vec<Value> {
    match payload {
        Some(Value::Array(items)) => items.clone(),
        Some(value) => vec![value.clone()],
        None => Vec::new(),
    }
}

/// Resolve a verb, service key and method key against a registry.
///
/// Probes `{Pascal(service)}Service`, then `{Pascal(service)}sService`; on
/// the first hit looks up `camel(verb) + Pascal(method)`. Pure: nothing is
/// invoked and nothing is logged.
///
/// # Example
///
/// ```
/// use composable_lifecycle_core::service::{resolve, Service, ServiceRegistry};
/// use serde_json::json;
///
/// let registry = ServiceRegistry::builder()
///     .service("TestService", Service::new().sync_method("fetchTest", |_| json!(1)))
///     .build();
///
/// let hit = resolve("FETCH", "TEST", "TEST", &registry);
/// assert!(hit.is_hit());
/// assert_eq!(hit.service_name(), "TestService");
/// assert_eq!(hit.method_name(), "fetchTest");
///
/// let miss = resolve("FETCH", "FOO", "FOO", &registry);
/// assert!(!miss.is_hit());
/// assert_eq!(miss.service_name(), "FoosService");
/// ```
#[must_use]
pub fn resolve(verb: &str, service_key: &str, method_key: &str, registry: &ServiceRegistry) -> Resolution {
    let method_name = method_name(verb, method_key);
    let [singular, plural] = service_candidates(service_key);

    let found = registry
        .get(&singular)
        .map(|service| (singular.clone(), service))
        .or_else(|| registry.get(&plural).map(|service| (plural.clone(), service)));

    match found {
        Some((service_name, service)) => Resolution {
            method: service.get(&method_name).cloned(),
            service_name,
            method_name,
            service_found: true,
        },
        None => Resolution {
            method: None,
            service_name: plural,
            method_name,
            service_found: false,
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::codec::parse;
    use serde_json::json;
    use std::sync::Mutex;

    type Calls = Arc<Mutex<Vec<(&'static str, Vec<Value>)>>>;

    fn identity(name: &'static str, calls: &Calls) -> impl Fn(Vec<Value>) -> Value + Send + Sync + 'static {
        let calls = Arc::clone(calls);
        move |args: Vec<Value>| {
            calls.lock().unwrap().push((name, args.clone()));
            if args.len() > 1 {
                Value::Array(args)
            } else {
                args.into_iter().next().unwrap_or(Value::Null)
            }
        }
    }

    fn registry(calls: &Calls) -> ServiceRegistry {
        ServiceRegistry::builder()
            .service(
                "TestService",
                Service::new()
                    .sync_method("fetchTest", identity("fetchTest", calls))
                    .sync_method("fetchTestSomethingElse", identity("fetchTestSomethingElse", calls)),
            )
            .build()
    }

    fn ready(operation: Option<Operation>) -> Option<Value> {
        match operation {
            Some(Operation::Ready(value)) => Some(value),
            _ => None,
        }
    }

    #[test]
    fn test_matches_names_to_services_and_methods() {
        let calls = Calls::default();
        let registry = registry(&calls);

        let result = registry
            .resolve(&parse("FETCH_TEST_AUTO").unwrap())
            .invoke(Some(&json!(true)));
        assert_eq!(ready(result), Some(json!(true)));
        assert_eq!(*calls.lock().unwrap(), [("fetchTest", vec![json!(true)])]);

        let result = registry
            .resolve(&parse("FETCH_TEST_SOMETHING_ELSE_AUTO").unwrap())
            .invoke(Some(&json!(42)));
        assert_eq!(ready(result), Some(json!(42)));
        assert_eq!(calls.lock().unwrap()[1], ("fetchTestSomethingElse", vec![json!(42)]));
    }

    #[test]
    fn test_miss_returns_none_without_calling() {
        let calls = Calls::default();
        let registry = registry(&calls);

        let unknown_service = registry.resolve(&parse("FETCH_FOO_AUTO").unwrap());
        assert!(!unknown_service.is_hit());
        assert!(!unknown_service.service_found());
        assert!(unknown_service.invoke(Some(&json!(true))).is_none());

        let unknown_method = registry.resolve(&parse("FETCH_TEST_FOO_AUTO").unwrap());
        assert!(!unknown_method.is_hit());
        assert!(unknown_method.service_found());
        assert_eq!(unknown_method.method_name(), "fetchTestFoo");
        assert!(unknown_method.invoke(Some(&json!(true))).is_none());

        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_spreads_array_payloads() {
        let calls = Calls::default();
        let registry = registry(&calls);
        let payload = json!([1, 2, 3, 4]);

        let _ = registry
            .resolve(&parse("FETCH_TEST_AUTO").unwrap())
            .invoke(Some(&payload));
        let _ = registry
            .resolve(&parse("FETCH_TEST_SOMETHING_ELSE_AUTO").unwrap())
            .invoke(Some(&payload));

        let calls = calls.lock().unwrap();
        let spread = vec![json!(1), json!(2), json!(3), json!(4)];
        assert_eq!(calls[0], ("fetchTest", spread.clone()));
        assert_eq!(calls[1], ("fetchTestSomethingElse", spread));
    }

    #[test]
    fn test_plural_fallback() {
        let registry = ServiceRegistry::builder()
            .service("KitsService", Service::new().sync_method("listKit", |_| json!([])))
            .build();

        let resolution = resolve("LIST", "KIT", "KIT", &registry);
        assert!(resolution.is_hit());
        assert_eq!(resolution.service_name(), "KitsService");
    }

    #[test]
    fn test_singular_wins_over_plural() {
        let registry = ServiceRegistry::builder()
            .service("KitService", Service::new().sync_method("listKit", |_| json!("singular")))
            .service("KitsService", Service::new().sync_method("listKit", |_| json!("plural")))
            .build();

        let resolution = resolve("LIST", "KIT", "KIT", &registry);
        assert_eq!(resolution.service_name(), "KitService");
        assert_eq!(ready(resolution.invoke(None)), Some(json!("singular")));
    }

    #[test]
    fn test_arguments() {
        assert!(arguments(None).is_empty());
        assert_eq!(arguments(Some(&json!("a"))), [json!("a")]);
        assert_eq!(arguments(Some(&Value::Null)), [Value::Null]);
        assert_eq!(arguments(Some(&json!(["a", "b"]))), [json!("a"), json!("b")]);
    }
}
