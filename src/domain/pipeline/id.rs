//! Pipeline identifier

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// Caller-chosen positive integer naming one pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct PipelineId(u64);

impl PipelineId {
    pub fn new(value: u64) -> Result<Self, DomainError> {
        if value == 0 {
            return Err(DomainError::invalid_input(
                "pipeline id must be a positive integer",
            ));
        }

        Ok(Self(value))
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for PipelineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PipelineId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();

        if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DomainError::invalid_input(format!(
                "'{}' is not a valid pipeline id",
                s
            )));
        }

        let value = trimmed.parse::<u64>().map_err(|_| {
            DomainError::invalid_input(format!("'{}' is out of range for a pipeline id", s))
        })?;

        Self::new(value)
    }
}

impl TryFrom<u64> for PipelineId {
    type Error = DomainError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PipelineId> for u64 {
    fn from(id: PipelineId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_id() {
        let id: PipelineId = "42".parse().unwrap();
        assert_eq!(id.value(), 42);
        assert_eq!(id.to_string(), "42");
    }

    #[test]
    fn test_parse_trims_whitespace() {
        let id: PipelineId = " 7 ".parse().unwrap();
        assert_eq!(id.value(), 7);
    }

    #[test]
    fn test_rejects_zero_negative_and_text() {
        for raw in ["0", "-1", "abc", "", "1.5", "+3", "99999999999999999999999"] {
            let result = raw.parse::<PipelineId>();
            assert!(
                matches!(result, Err(DomainError::InvalidInput { .. })),
                "expected {raw:?} to be rejected"
            );
        }
    }

    #[test]
    fn test_serde_round_trip_as_number() {
        let id = PipelineId::new(5).unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "5");

        let err = serde_json::from_str::<PipelineId>("0");
        assert!(err.is_err());
    }
}
