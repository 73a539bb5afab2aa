//! Sales-rep scoped records: users, rep resources, doctor search, marketing activities.

use serde::{Deserialize, Serialize};

use super::catalog::{Doctor, Pharmacy, Product};

/// A user account as returned by `GET /users/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub team: Option<String>,
    #[serde(default)]
    pub area: Option<String>,
}

impl User {
    /// Name to greet the user with.
    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .or(self.username.as_deref())
            .unwrap_or(&self.id)
    }
}

/// Aggregate counters shown on the rep dashboard.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct RepStats {
    pub total_products: u32,
    pub total_pharmacies: u32,
    pub total_visits: u32,
    pub total_sample_requests: u32,
}

/// Everything a medical rep needs to work offline for a day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RepResources {
    pub user: User,
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub pharmacies: Vec<Pharmacy>,
    #[serde(default)]
    pub stats: RepStats,
}

/// Totals reported alongside a doctor search.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct DoctorSearchStatistics {
    pub total_doctors: u32,
    pub total_visits: u32,
}

/// A past visit to one of the found doctors.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DoctorVisit {
    #[serde(default)]
    pub id: Option<String>,
    pub doctor_id: String,
    pub visit_date: String,
    #[serde(default)]
    pub rep_name: Option<String>,
    #[serde(default)]
    pub products: Vec<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Payload of a doctor search response.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DoctorSearchResult {
    #[serde(default)]
    pub found_doctors: Vec<Doctor>,
    #[serde(default)]
    pub search_query: String,
    #[serde(default)]
    pub statistics: DoctorSearchStatistics,
    #[serde(default)]
    pub visits: Vec<DoctorVisit>,
}

impl DoctorSearchResult {
    /// Visits for one doctor, most recent first (ISO dates sort lexically).
    pub fn visits_for(&self, doctor_id: &str) -> Vec<&DoctorVisit> {
        let mut visits: Vec<&DoctorVisit> = self
            .visits
            .iter()
            .filter(|v| v.doctor_id == doctor_id)
            .collect();
        visits.sort_by(|a, b| b.visit_date.cmp(&a.visit_date));
        visits
    }
}

/// Bilingual marketing activity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MarketingActivity {
    pub english: String,
    pub arabic: String,
    pub is_active: bool,
}
