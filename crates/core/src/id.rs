//! Strongly-typed identifiers used across the analysis core.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Identifier of a server-side analysis job.
///
/// Job ids are minted by the remote analysis service and treated as opaque
/// strings here. An id is valid if it is non-empty after trimming.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Wrap an id received from the remote service.
    pub fn new(id: impl Into<String>) -> Result<Self, DomainError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(DomainError::invalid_id("JobId: empty"));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for JobId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for JobId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl From<JobId> for String {
    fn from(value: JobId) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_opaque_service_ids() {
        let id = JobId::new("analysis-7f3a").unwrap();
        assert_eq!(id.as_str(), "analysis-7f3a");
        assert_eq!(id.to_string(), "analysis-7f3a");
    }

    #[test]
    fn rejects_empty_and_blank_ids() {
        assert!(JobId::new("").is_err());
        assert!(JobId::new("   ").is_err());
        assert!("  ".parse::<JobId>().is_err());
    }

    #[test]
    fn serde_is_transparent() {
        let id = JobId::new("j1").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"j1\"");
        let back: JobId = serde_json::from_str("\"j1\"").unwrap();
        assert_eq!(back, id);
    }
}
