//! The claim record and its processing state machine.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Processing state of a claim.
///
/// Transitions are monotonic within a single pipeline run:
/// `Queued -> Processing -> Completed | Failed`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ClaimStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl ClaimStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimStatus::Queued => "queued",
            ClaimStatus::Processing => "processing",
            ClaimStatus::Completed => "completed",
            ClaimStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "queued" => Some(ClaimStatus::Queued),
            "processing" => Some(ClaimStatus::Processing),
            "completed" => Some(ClaimStatus::Completed),
            "failed" => Some(ClaimStatus::Failed),
            _ => None,
        }
    }

    /// Terminal states receive no further automatic transition.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ClaimStatus::Completed | ClaimStatus::Failed)
    }
}

impl std::fmt::Display for ClaimStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Machine-derived (or user-corrected) structured fields.
///
/// Overwritten wholesale on each successful run, never merged
/// field-by-field.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClaimFields {
    /// Claimant name taken from the first labeled line.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// First date-like substring, parsed month/day/year.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    /// Largest labeled monetary value in the document.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    /// Currency symbol co-occurring with the winning amount.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
}

impl ClaimFields {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.date.is_none()
            && self.amount.is_none()
            && self.currency.is_none()
    }
}

/// The durable record tracking a submitted document's processing state
/// and extracted data.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claim {
    /// Opaque unique identifier, assigned at creation.
    pub id: String,
    /// Identifier of the submitting user, used for notification routing.
    pub owner_id: String,
    /// Retrievable reference (URL or path) to the source binary.
    pub document_ref: String,
    pub status: ClaimStatus,
    /// Full OCR output. Empty until a run completes.
    #[serde(default)]
    pub extracted_text: String,
    #[serde(default)]
    pub fields: ClaimFields,
    /// User-supplied overrides. Never written by the pipeline.
    #[serde(default)]
    pub corrected_fields: ClaimFields,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Claim {
    /// Creates a freshly admitted claim in the `Queued` state.
    pub fn new(id: &str, owner_id: &str, document_ref: &str) -> Self {
        let now = Utc::now();
        Self {
            id: id.to_string(),
            owner_id: owner_id.to_string(),
            document_ref: document_ref.to_string(),
            status: ClaimStatus::Queued,
            extracted_text: String::new(),
            fields: ClaimFields::default(),
            corrected_fields: ClaimFields::default(),
            created_at: now,
            updated_at: now,
        }
    }
}
