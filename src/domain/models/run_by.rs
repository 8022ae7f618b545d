//! Provenance of a submission.

use serde::{Deserialize, Serialize};

use crate::domain::errors::CoreError;

/// Who asked for this run. `User` opts into verbose "no-change" reports;
/// `Scheduler` suppresses them. `Unknown` is a reserved, always-invalid
/// zero value so a default-constructed `SubmitRequest` fails validation
/// instead of silently behaving like `Scheduler`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunBy {
    Unknown,
    User,
    Scheduler,
}

impl Default for RunBy {
    fn default() -> Self {
        Self::Unknown
    }
}

impl RunBy {
    pub fn validate(self) -> Result<(), CoreError> {
        match self {
            Self::Unknown => Err(CoreError::InvalidInput(
                "run_by must be User or Scheduler".into(),
            )),
            Self::User | Self::Scheduler => Ok(()),
        }
    }

    /// Whether a no-change result should still produce a verbose report.
    pub fn wants_verbose_report(self) -> bool {
        matches!(self, Self::User)
    }
}
