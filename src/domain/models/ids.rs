//! Opaque identifier newtypes used throughout the execution core.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::errors::CoreError;

/// Names a task kind, e.g. `"NAVER"`. Non-empty opaque string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(value: impl Into<String>) -> Result<Self, CoreError> {
        let value = value.into();
        if value.is_empty() {
            return Err(CoreError::InvalidInput("task id must not be empty".into()));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Names a command within a task kind. May end with the wildcard suffix
/// `*`, in which case [`CommandId::matches`] treats it as a prefix pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommandId(String);

impl CommandId {
    pub fn new(value: impl Into<String>) -> Result<Self, CoreError> {
        let value = value.into();
        if value.is_empty() {
            return Err(CoreError::InvalidInput(
                "command id must not be empty".into(),
            ));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `self` is treated as the registered pattern; `target` is a concrete
    /// command id from a submission. `"*"` matches everything, `"P*"`
    /// matches any target with prefix `P` whose length is at least
    /// `len(P)`, and a pattern without a trailing `*` requires exact
    /// equality.
    pub fn matches(&self, target: &CommandId) -> bool {
        match self.0.strip_suffix('*') {
            Some(prefix) => target.0.len() >= prefix.len() && target.0.starts_with(prefix),
            None => self.0 == target.0,
        }
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque id of a notification channel. Non-blank when present.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NotifierId(String);

impl NotifierId {
    pub fn new(value: impl Into<String>) -> Result<Self, CoreError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(CoreError::InvalidInput(
                "notifier id must not be blank".into(),
            ));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NotifierId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque instance identifier, unique across the process lifetime and
/// monotonically ordered under `(length, lexicographic)` comparison — see
/// [`crate::infrastructure::id_generator::IdGenerator`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstanceId(String);

impl InstanceId {
    /// Only the generator should call this; kept `pub(crate)` so instance
    /// ids can't be fabricated by callers and accidentally violate the
    /// ordering invariant.
    pub(crate) fn from_raw(value: String) -> Self {
        Self(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for InstanceId {
    type Err = std::convert::Infallible;

    /// Round-trips an id previously obtained from [`InstanceId::as_str`] or
    /// its `Display` impl, e.g. one extracted from a notification message.
    /// Does not validate the fixed-width encoding — the ordering contract
    /// only matters for ids the generator itself produced.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl PartialOrd for InstanceId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for InstanceId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .len()
            .cmp(&other.0.len())
            .then_with(|| self.0.cmp(&other.0))
    }
}
