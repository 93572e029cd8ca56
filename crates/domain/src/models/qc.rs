//! Quality-control inspection records and requests.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;
use validator::Validate;

use super::journey::{ErrorSummary, JourneyResponse};

/// Result submitted by an inspector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QcResult {
    Passed,
    Failed,
}

impl QcResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            QcResult::Passed => "passed",
            QcResult::Failed => "failed",
        }
    }
}

impl fmt::Display for QcResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for QcResult {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "passed" => Ok(QcResult::Passed),
            "failed" => Ok(QcResult::Failed),
            _ => Err(format!("Invalid QC result: {}", s)),
        }
    }
}

/// One QC submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QcInspection {
    pub id: i64,
    pub journey_id: Uuid,
    /// 1-based attempt number for this unit.
    pub attempt: i32,
    pub result: QcResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    pub photos: Vec<String>,
    pub inspected_by: Uuid,
    pub created_at: DateTime<Utc>,
}

/// QC submission payload.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct QcSubmitRequest {
    pub barcode: String,

    pub result: QcResult,

    #[validate(length(max = 2000, message = "failure_reason must be at most 2000 characters"))]
    pub failure_reason: Option<String>,

    #[serde(default)]
    #[validate(custom(function = "shared::validation::validate_photo_refs"))]
    pub photos: Vec<String>,

    /// Ready-zone bin to move a passed unit into; auto-selected when absent.
    pub target_bin_id: Option<Uuid>,
}

impl QcSubmitRequest {
    /// Trimmed failure reason, `None` when blank.
    pub fn reason(&self) -> Option<&str> {
        self.failure_reason
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
    }
}

/// Result of a QC submission.
#[derive(Debug, Clone, Serialize)]
pub struct QcSubmitResponse {
    pub journey: JourneyResponse,
    pub inspection: QcInspection,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bin_warning: Option<ErrorSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(result: QcResult, reason: Option<&str>) -> QcSubmitRequest {
        QcSubmitRequest {
            barcode: "BIKE-001".to_string(),
            result,
            failure_reason: reason.map(String::from),
            photos: vec![],
            target_bin_id: None,
        }
    }

    #[test]
    fn test_blank_reason_is_absent() {
        assert_eq!(request(QcResult::Failed, None).reason(), None);
        assert_eq!(request(QcResult::Failed, Some("   ")).reason(), None);
        assert_eq!(
            request(QcResult::Failed, Some(" Brake rub ")).reason(),
            Some("Brake rub")
        );
    }

    #[test]
    fn test_photo_refs_validated() {
        let mut r = request(QcResult::Passed, None);
        assert!(r.validate().is_ok());
        r.photos = vec![String::new()];
        assert!(r.validate().is_err());
    }

    #[test]
    fn test_result_parse() {
        assert_eq!("failed".parse::<QcResult>(), Ok(QcResult::Failed));
        assert!("none".parse::<QcResult>().is_err());
    }
}
