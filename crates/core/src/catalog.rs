//! Catalog-level constants and enums for artifacts.

use crate::error::CoreError;

/// Treatment status of a cataloged artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactStatus {
    Pending,
    Processing,
    Completed,
}

/// All valid status strings.
const VALID_STATUSES: &[&str] = &["pending", "processing", "completed"];

impl ArtifactStatus {
    /// Database/status-field string value.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
        }
    }

    /// Parse a status from its string value.
    pub fn from_name(name: &str) -> Result<Self, CoreError> {
        match name {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            other => Err(CoreError::Validation(format!(
                "Invalid status '{other}'. Must be one of: {}",
                VALID_STATUSES.join(", ")
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trip() {
        for status in [
            ArtifactStatus::Pending,
            ArtifactStatus::Processing,
            ArtifactStatus::Completed,
        ] {
            assert_eq!(ArtifactStatus::from_name(status.as_str()).unwrap(), status);
        }
    }

    #[test]
    fn invalid_status_rejected() {
        assert!(ArtifactStatus::from_name("archived").is_err());
        assert!(ArtifactStatus::from_name("").is_err());
    }
}
