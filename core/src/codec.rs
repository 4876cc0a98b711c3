//! Action name codec.
//!
//! Action types follow the `VERB_SERVICE_METHOD..._SUFFIX` convention. The
//! codec splits a type into its four parts and maps those parts onto the
//! names a service registry is searched with:
//!
//! ```text
//! FETCH_AUTH_RECOVERY_LINK_AUTO
//!   verb    = FETCH
//!   service = AUTH                  → AuthService, then AuthsService
//!   method  = AUTH_RECOVERY_LINK    → fetchAuthRecoveryLink
//!   suffix  = AUTO
//! ```
//!
//! The service key is only the first segment after the verb, while the
//! method key keeps the whole tail, so method names that repeat the service
//! name (`fetchAuthRecoveryLink` on `AuthService`) resolve naturally.
//!
//! Pluralization is a single trailing-`s` fallback. Irregular plurals and
//! multi-word service names are not inferred.

use crate::case::{camel_case, pascal_case};
use crate::error::ParseError;
use crate::suffix::DELIMITER;
use std::sync::Arc;

/// An action type split into its naming parts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ActionName {
    /// First segment (`FETCH`)
    pub verb: String,
    /// Second segment (`AUTH`)
    pub service: String,
    /// Every segment between the verb and the suffix (`AUTH_RECOVERY_LINK`)
    pub method: String,
    /// Last segment, without the delimiter (`AUTO`)
    pub suffix: String,
}

impl ActionName {
    /// Service names tried in the registry, singular first.
    #[must_use]
    pub fn service_candidates(&self) -> [String; 2] {
        service_candidates(&self.service)
    }

    /// Method name looked up on the resolved service.
    #[must_use]
    pub fn method_name(&self) -> String {
        method_name(&self.verb, &self.method)
    }
}

impl std::fmt::Display for ActionName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{verb}{DELIMITER}{method}{DELIMITER}{suffix}",
            verb = self.verb,
            method = self.method,
            suffix = self.suffix
        )
    }
}

/// Pluggable parser turning an action type into an [`ActionName`].
pub type ActionNameParser = Arc<dyn Fn(&str) -> Result<ActionName, ParseError> + Send + Sync>;

/// The default parser, [`parse`], as an [`ActionNameParser`].
#[must_use]
pub fn default_parser() -> ActionNameParser {
    Arc::new(parse)
}

/// Split an action type into verb, service key, method key and suffix.
///
/// # Errors
///
/// Returns [`ParseError`] when the type has fewer than three segments or
/// contains an empty segment.
///
/// # Example
///
/// ```
/// use composable_lifecycle_core::codec::parse;
///
/// let name = parse("FETCH_AUTH_RECOVERY_LINK_REQ").unwrap();
/// assert_eq!(name.verb, "FETCH");
/// assert_eq!(name.service, "AUTH");
/// assert_eq!(name.method, "AUTH_RECOVERY_LINK");
/// assert_eq!(name.suffix, "REQ");
/// ```
pub fn parse(action_type: &str) -> Result<ActionName, ParseError> {
    let mut segments: Vec<&str> = action_type.split(DELIMITER).collect();

    if segments.iter().any(|segment| segment.is_empty()) {
        return Err(ParseError::EmptySegment(action_type.to_string()));
    }
    if segments.len() < 3 {
        return Err(ParseError::TooFewSegments(action_type.to_string()));
    }

    let suffix = segments.pop().unwrap_or_default();
    let verb = segments.remove(0);
    let service = segments.first().copied().unwrap_or_default();
    let delimiter = DELIMITER.to_string();

    Ok(ActionName {
        verb: verb.to_string(),
        service: service.to_string(),
        method: segments.join(delimiter.as_str()),
        suffix: suffix.to_string(),
    })
}

/// Registry names for a service key: `{Base}Service`, then `{Base}sService`.
#[must_use]
pub fn service_candidates(service_key: &str) -> [String; 2] {
    let base = pascal_case(service_key);
    [format!("{base}Service"), format!("{base}sService")]
}

/// Method name for a verb and method key: `camel(verb) + Pascal(method)`.
#[must_use]
pub fn method_name(verb: &str, method_key: &str) -> String {
    format!("{}{}", camel_case(verb), pascal_case(method_key))
}
