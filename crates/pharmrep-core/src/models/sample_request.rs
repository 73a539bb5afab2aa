//! Sample request models.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a sample request. Owned by the server; the client only reads it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SampleRequestStatus {
    /// Submitted, awaiting a manager decision
    Pending,
    Approved,
    Rejected,
    /// Samples handed over to the doctor
    Delivered,
}

impl SampleRequestStatus {
    /// Terminal states never transition again.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SampleRequestStatus::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SampleRequestStatus::Pending => "pending",
            SampleRequestStatus::Approved => "approved",
            SampleRequestStatus::Rejected => "rejected",
            SampleRequestStatus::Delivered => "delivered",
        }
    }
}

/// Reference to a related record, carrying the display name the list view needs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecordRef {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// A request for product samples on behalf of a doctor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SampleRequest {
    pub id: String,
    /// Date the rep filed the request
    pub request_date: String,
    /// Expected delivery date
    #[serde(default)]
    pub delivery_date: Option<String>,
    pub product: RecordRef,
    pub doctor: RecordRef,
    pub quantity: u32,
    pub status: SampleRequestStatus,
    #[serde(default)]
    pub notes: Option<String>,
}

impl SampleRequest {
    /// Check if the request still awaits a decision.
    pub fn is_open(&self) -> bool {
        !self.status.is_terminal()
    }
}
