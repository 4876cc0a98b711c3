//! Lifecycle suffixes.
//!
//! Every lifecycle-aware action type ends in exactly one suffix marking its
//! phase: the intent (`_AUTO`), then the derived `_REQ`, `_OK` and `_ERR`
//! actions emitted around the asynchronous operation.

use crate::error::SuffixError;
use serde::{Deserialize, Serialize};

/// Separator between action type segments.
pub const DELIMITER: char = '_';

/// Default suffix for intent actions.
pub const DEFAULT_SUFFIX_AUTO: &str = "_AUTO";

/// Default suffix for requested actions.
pub const DEFAULT_SUFFIX_REQ: &str = "_REQ";

/// Default suffix for succeeded actions.
pub const DEFAULT_SUFFIX_OK: &str = "_OK";

/// Default suffix for failed actions.
pub const DEFAULT_SUFFIX_ERR: &str = "_ERR";

/// Phase of an asynchronous action lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Intent dispatched by the caller
    Auto,
    /// Operation started, not yet settled
    Requested,
    /// Operation fulfilled
    Succeeded,
    /// Operation rejected
    Failed,
}

impl Phase {
    /// All phases in lifecycle order
    pub const ALL: [Self; 4] = [Self::Auto, Self::Requested, Self::Succeeded, Self::Failed];

    /// Short label used in logs and metric labels
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Requested => "req",
            Self::Succeeded => "ok",
            Self::Failed => "err",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// The four configured lifecycle suffixes.
///
/// # Example
///
/// ```
/// use composable_lifecycle_core::suffix::{Phase, Suffixes};
///
/// let suffixes = Suffixes::default();
/// assert_eq!(suffixes.replace("FETCH_TEST_AUTO", Phase::Requested), "FETCH_TEST_REQ");
/// assert_eq!(suffixes.phase_of("FETCH_TEST_OK"), Some(Phase::Succeeded));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Suffixes {
    auto: String,
    req: String,
    ok: String,
    err: String,
}

impl Suffixes {
    /// Build a validated suffix set.
    ///
    /// Empty strings fall back to the defaults, so callers can override a
    /// single phase and leave the rest unset.
    ///
    /// # Errors
    ///
    /// Returns [`SuffixError`] if a suffix does not start with [`DELIMITER`],
    /// is only the delimiter, is shared by two phases, or ends with the
    /// suffix of another phase (`_DONE_AUTO` next to `_AUTO`).
    pub fn new(auto: &str, req: &str, ok: &str, err: &str) -> Result<Self, SuffixError> {
        let suffixes = Self {
            auto: or_default(auto, DEFAULT_SUFFIX_AUTO),
            req: or_default(req, DEFAULT_SUFFIX_REQ),
            ok: or_default(ok, DEFAULT_SUFFIX_OK),
            err: or_default(err, DEFAULT_SUFFIX_ERR),
        };

        for phase in Phase::ALL {
            let suffix = suffixes.get(phase);
            if !suffix.starts_with(DELIMITER) {
                return Err(SuffixError::MissingDelimiter(suffix.to_string()));
            }
            if suffix.len() == DELIMITER.len_utf8() {
                return Err(SuffixError::Empty(suffix.to_string()));
            }
            if Phase::ALL
                .iter()
                .filter(|other| suffixes.get(**other) == suffix)
                .count()
                > 1
            {
                return Err(SuffixError::Duplicate(suffix.to_string()));
            }
            if let Some(shadowed) = Phase::ALL
                .iter()
                .map(|other| suffixes.get(*other))
                .find(|other| *other != suffix && suffix.ends_with(*other))
            {
                return Err(SuffixError::Overlapping {
                    suffix: suffix.to_string(),
                    shadowed: shadowed.to_string(),
                });
            }
        }

        Ok(suffixes)
    }

    /// Suffix configured for `phase`
    #[must_use]
    pub fn get(&self, phase: Phase) -> &str {
        match phase {
            Phase::Auto => &self.auto,
            Phase::Requested => &self.req,
            Phase::Succeeded => &self.ok,
            Phase::Failed => &self.err,
        }
    }

    /// Whether `action_type` is an intent that should start a lifecycle
    #[must_use]
    pub fn is_auto(&self, action_type: &str) -> bool {
        action_type.ends_with(self.auto.as_str())
    }

    /// Phase whose suffix ends `action_type`, checked in lifecycle order
    #[must_use]
    pub fn phase_of(&self, action_type: &str) -> Option<Phase> {
        Phase::ALL
            .into_iter()
            .find(|phase| action_type.ends_with(self.get(*phase)))
    }

    /// Swap the lifecycle suffix of `action_type` for the one of `phase`.
    ///
    /// A type without any configured suffix gets the new suffix appended.
    #[must_use]
    pub fn replace(&self, action_type: &str, phase: Phase) -> String {
        let stem = self
            .phase_of(action_type)
            .and_then(|current| action_type.strip_suffix(self.get(current)))
            .unwrap_or(action_type);

        format!("{stem}{}", self.get(phase))
    }
}

impl Default for Suffixes {
    fn default() -> Self {
        Self {
            auto: DEFAULT_SUFFIX_AUTO.to_string(),
            req: DEFAULT_SUFFIX_REQ.to_string(),
            ok: DEFAULT_SUFFIX_OK.to_string(),
            err: DEFAULT_SUFFIX_ERR.to_string(),
        }
    }
}

impl<'de> Deserialize<'de> for Suffixes {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            #[serde(default)]
            auto: String,
            #[serde(default)]
            req: String,
            #[serde(default)]
            ok: String,
            #[serde(default)]
            err: String,
        }

        let raw = Raw::deserialize(deserializer)?;
        Self::new(&raw.auto, &raw.req, &raw.ok, &raw.err).map_err(serde::de::Error::custom)
    }
}

fn or_default(value: &str, default: &str) -> String {
    if value.is_empty() {
        default.to_string()
    } else {
        value.to_string()
    }
}
