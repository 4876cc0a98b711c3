//! Actions and the action factory.
//!
//! Actions follow the Flux Standard Action shape:
//!
//! ```text
//! { type: string, payload?: any, meta?: any, error?: true }
//! ```
//!
//! `payload` and `meta` are optional and "absent" is different from `null`.
//! `error` is set if and only if the payload is an error. Fields are private
//! so that invariant cannot be broken after construction.

use crate::error::ServiceError;
use crate::pending::PendingOperation;
use serde::ser::{Error as _, SerializeMap};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Type given to actions built without one.
pub const UNKNOWN_ACTION_TYPE: &str = "UNKNOWN";

/// Action payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Plain data
    Data(Value),
    /// An error; actions carrying it are flagged with `error: true`
    Error(ServiceError),
    /// An asynchronous operation for the lifecycle middleware to run
    Pending(PendingOperation),
}

impl Payload {
    /// Whether this payload is an error
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// The plain data, if any
    #[must_use]
    pub const fn as_data(&self) -> Option<&Value> {
        match self {
            Self::Data(value) => Some(value),
            _ => None,
        }
    }

    /// The error, if any
    #[must_use]
    pub const fn as_error(&self) -> Option<&ServiceError> {
        match self {
            Self::Error(error) => Some(error),
            _ => None,
        }
    }

    /// The pending operation, if any
    #[must_use]
    pub const fn as_pending(&self) -> Option<&PendingOperation> {
        match self {
            Self::Pending(pending) => Some(pending),
            _ => None,
        }
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Self::Data(value)
    }
}

impl From<ServiceError> for Payload {
    fn from(error: ServiceError) -> Self {
        Self::Error(error)
    }
}

impl From<PendingOperation> for Payload {
    fn from(pending: PendingOperation) -> Self {
        Self::Pending(pending)
    }
}

impl Serialize for Payload {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Data(value) => value.serialize(serializer),
            Self::Error(error) => error.serialize(serializer),
            Self::Pending(_) => Err(S::Error::custom(
                "a pending operation cannot be serialized",
            )),
        }
    }
}

/// A dispatchable action.
///
/// # Example
///
/// ```
/// use composable_lifecycle_core::action::{Action, Payload};
/// use composable_lifecycle_core::ServiceError;
/// use serde_json::json;
///
/// let action = Action::with_data("SET_FLAG", json!(true));
/// assert_eq!(action.action_type(), "SET_FLAG");
/// assert!(!action.is_error());
///
/// let failed = Action::with_error("FETCH_TEST_ERR", ServiceError::new("boom"));
/// assert!(failed.is_error());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    action_type: String,
    payload: Option<Payload>,
    meta: Option<Value>,
    error: bool,
}

impl Action {
    /// Build an action, flagging it as an error if the payload is one
    #[must_use]
    pub fn new(action_type: impl Into<String>, payload: Option<Payload>, meta: Option<Value>) -> Self {
        let error = payload.as_ref().is_some_and(Payload::is_error);
        Self {
            action_type: action_type.into(),
            payload,
            meta,
            error,
        }
    }

    /// `{ type: "UNKNOWN" }`
    #[must_use]
    pub fn unknown() -> Self {
        Self::new(UNKNOWN_ACTION_TYPE, None, None)
    }

    /// An action with no payload and no meta
    #[must_use]
    pub fn of_type(action_type: impl Into<String>) -> Self {
        Self::new(action_type, None, None)
    }

    /// An action carrying plain data
    #[must_use]
    pub fn with_data(action_type: impl Into<String>, data: Value) -> Self {
        Self::new(action_type, Some(Payload::Data(data)), None)
    }

    /// An error action
    #[must_use]
    pub fn with_error(action_type: impl Into<String>, error: ServiceError) -> Self {
        Self::new(action_type, Some(Payload::Error(error)), None)
    }

    /// An action carrying a pending operation
    #[must_use]
    pub fn pending(action_type: impl Into<String>, pending: PendingOperation) -> Self {
        Self::new(action_type, Some(Payload::Pending(pending)), None)
    }

    /// Attach meta
    #[must_use]
    pub fn with_meta(mut self, meta: Value) -> Self {
        self.meta = Some(meta);
        self
    }

    /// Same type and meta, different payload
    #[must_use]
    pub fn replace_payload(self, payload: Option<Payload>) -> Self {
        Self::new(self.action_type, payload, self.meta)
    }

    /// The action type
    #[must_use]
    pub fn action_type(&self) -> &str {
        &self.action_type
    }

    /// The payload, if present
    #[must_use]
    pub const fn payload(&self) -> Option<&Payload> {
        self.payload.as_ref()
    }

    /// The payload's plain data, if the payload is plain data
    #[must_use]
    pub fn data(&self) -> Option<&Value> {
        self.payload.as_ref().and_then(Payload::as_data)
    }

    /// The meta, if present
    #[must_use]
    pub const fn meta(&self) -> Option<&Value> {
        self.meta.as_ref()
    }

    /// Whether the payload is an error
    #[must_use]
    pub const fn is_error(&self) -> bool {
        self.error
    }

    /// Split into type, payload and meta
    #[must_use]
    pub fn into_parts(self) -> (String, Option<Payload>, Option<Value>) {
        (self.action_type, self.payload, self.meta)
    }
}

impl Default for Action {
    fn default() -> Self {
        Self::unknown()
    }
}

/// Build an action from optional parts.
///
/// A missing type becomes [`UNKNOWN_ACTION_TYPE`]; a missing payload or meta
/// is left out entirely.
#[must_use]
pub fn make_action(action_type: Option<&str>, payload: Option<Payload>, meta: Option<Value>) -> Action {
    Action::new(action_type.unwrap_or(UNKNOWN_ACTION_TYPE), payload, meta)
}

impl Serialize for Action {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let len = 1
            + usize::from(self.payload.is_some())
            + usize::from(self.meta.is_some())
            + usize::from(self.error);
        let mut map = serializer.serialize_map(Some(len))?;
        map.serialize_entry("type", &self.action_type)?;
        if let Some(payload) = &self.payload {
            map.serialize_entry("payload", payload)?;
        }
        if let Some(meta) = &self.meta {
            map.serialize_entry("meta", meta)?;
        }
        if self.error {
            map.serialize_entry("error", &true)?;
        }
        map.end()
    }
}

#[allow(clippy::unnecessary_wraps)]
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl<'de> Deserialize<'de> for Action {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Wire {
            #[serde(rename = "type")]
            action_type: String,
            #[serde(default, deserialize_with = "present")]
            payload: Option<Value>,
            #[serde(default, deserialize_with = "present")]
            meta: Option<Value>,
            #[serde(default)]
            error: bool,
        }

        let wire = Wire::deserialize(deserializer)?;
        let payload = wire.payload.map(|value| {
            if wire.error {
                serde_json::from_value::<ServiceError>(value.clone())
                    .map_or(Payload::Data(value), Payload::Error)
            } else {
                Payload::Data(value)
            }
        });

        Ok(Self::new(wire.action_type, payload, wire.meta))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_make_action_defaults() {
        let action = make_action(None, None, None);
        assert_eq!(action.action_type(), UNKNOWN_ACTION_TYPE);
        assert!(action.payload().is_none());
        assert!(action.meta().is_none());
        assert!(!action.is_error());
        assert_eq!(serde_json::to_value(&action).unwrap(), json!({ "type": "UNKNOWN" }));
    }

    #[test]
    fn test_make_action_optional_parts() {
        let a = make_action(Some("A"), None, None);
        assert_eq!(serde_json::to_value(&a).unwrap(), json!({ "type": "A" }));

        let a = make_action(Some("A"), Some(json!(true).into()), None);
        assert_eq!(serde_json::to_value(&a).unwrap(), json!({ "type": "A", "payload": true }));

        let a = make_action(Some("A"), Some(json!(true).into()), Some(json!(true)));
        assert_eq!(
            serde_json::to_value(&a).unwrap(),
            json!({ "type": "A", "payload": true, "meta": true })
        );

        let a = make_action(None, Some(json!(true).into()), Some(json!(true)));
        assert_eq!(
            serde_json::to_value(&a).unwrap(),
            json!({ "type": "UNKNOWN", "payload": true, "meta": true })
        );

        let a = make_action(Some("A"), None, Some(json!(true)));
        assert_eq!(serde_json::to_value(&a).unwrap(), json!({ "type": "A", "meta": true }));
    }

    #[test]
    fn test_null_payload_is_not_absent() {
        let action = Action::with_data("A", Value::Null);
        assert_eq!(action.data(), Some(&Value::Null));
        assert_eq!(
            serde_json::to_value(&action).unwrap(),
            json!({ "type": "A", "payload": null })
        );
    }

    #[test]
    fn test_error_payload_sets_flag() {
        let error = ServiceError::new("Test Error");
        let action = make_action(Some("A"), Some(error.clone().into()), None);

        assert!(action.is_error());
        assert_eq!(action.payload(), Some(&Payload::Error(error)));
        assert_eq!(
            serde_json::to_value(&action).unwrap(),
            json!({ "type": "A", "payload": { "message": "Test Error" }, "error": true })
        );
    }

    #[test]
    fn test_replace_payload_recomputes_flag() {
        let failed = Action::with_error("A", ServiceError::new("boom")).with_meta(json!(1));
        let replaced = failed.replace_payload(Some(json!(2).into()));

        assert!(!replaced.is_error());
        assert_eq!(replaced.meta(), Some(&json!(1)));
        assert_eq!(replaced.data(), Some(&json!(2)));
    }

    #[test]
    fn test_pending_payload_refuses_to_serialize() {
        let action = Action::pending("FETCH_TEST", PendingOperation::future(async { Ok(Value::Null) }));
        assert!(serde_json::to_value(&action).is_err());
    }

    #[test]
    fn test_deserialize_wire_shape() {
        let action: Action =
            serde_json::from_value(json!({ "type": "A", "payload": null, "meta": { "page": 2 } }))
                .unwrap();
        assert_eq!(action.data(), Some(&Value::Null));
        assert_eq!(action.meta(), Some(&json!({ "page": 2 })));

        let failed: Action = serde_json::from_value(
            json!({ "type": "A_ERR", "payload": { "message": "boom" }, "error": true }),
        )
        .unwrap();
        assert!(failed.is_error());
        assert_eq!(failed, Action::with_error("A_ERR", ServiceError::new("boom")));

        let bare: Action = serde_json::from_value(json!({ "type": "A" })).unwrap();
        assert!(bare.payload().is_none());
    }
}
