//! PharmRep Core Library
//!
//! Offline-capable client core for a pharmaceutical sales-rep CRM.
//!
//! # Architecture
//!
//! ```text
//!                    Host UI (Swift / Kotlin via UniFFI)
//!                                   │
//!                            PharmRepCore
//!                                   │
//!        ┌──────────────┬───────────┼────────────┬──────────────────┐
//!        ▼              ▼           ▼            ▼                  ▼
//!   VisitStore      RepStore   Diagnostics   Sample requests   Doctor search
//!  (draft + lines)              Board/Runner
//!        │              │           │            │                  │
//!        └──────┬───────┴───────────┴────────────┴──────────────────┘
//!               │                              │
//!        SQLite (catalog,               ApiClient → HttpTransport
//!        local storage)                         (reqwest::blocking)
//! ```
//!
//! # Core Principle
//!
//! **Derived totals are recomputed, never patched.** Every visit-store
//! mutation rescans the collection lines for `collected_amount`.
//!
//! # Modules
//!
//! - [`api`]: Typed REST client over a pluggable transport
//! - [`config`]: Constants and API configuration
//! - [`db`]: SQLite persistence with FTS5 catalog search
//! - [`diagnostics`]: Ordered connectivity probes
//! - [`models`]: Domain types (Product, VisitFormData, SampleRequest, etc.)
//! - [`store`]: Visit draft and rep resource stores

pub mod api;
pub mod config;
pub mod db;
pub mod diagnostics;
pub mod logging;
pub mod models;
pub mod store;

// Re-export commonly used types
pub use api::{ApiClient, ApiError, HttpTransport, MockTransport};
pub use config::ApiConfig;
pub use db::Database;
pub use diagnostics::{DiagnosticsBoard, DiagnosticsRunner};
pub use models::{
    CollectionProduct, DiagnosticTestResult, Doctor, OrderProduct, Pharmacy, Product,
    SampleRequest, SampleRequestStatus, TestStatus, VisitFormData,
};
pub use store::{RepStore, VisitStore};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use models::{MarketingActivity, ReceiptInfo};

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum PharmRepError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Busy: {0}")]
    Busy(String),
}

impl From<db::DbError> for PharmRepError {
    fn from(e: db::DbError) -> Self {
        PharmRepError::DatabaseError(e.to_string())
    }
}

impl From<api::ApiError> for PharmRepError {
    fn from(e: api::ApiError) -> Self {
        match e {
            api::ApiError::Transport(t) => PharmRepError::NetworkError(t.to_string()),
            api::ApiError::NotFound(what) => PharmRepError::NotFound(what),
            api::ApiError::Decode(e) => PharmRepError::SerializationError(e.to_string()),
            other => PharmRepError::ServerError(other.to_string()),
        }
    }
}

impl From<store::StoreError> for PharmRepError {
    fn from(e: store::StoreError) -> Self {
        match e {
            store::StoreError::Api(e) => e.into(),
            store::StoreError::Database(e) => e.into(),
            other => PharmRepError::InvalidInput(other.to_string()),
        }
    }
}

impl From<diagnostics::DiagnosticsError> for PharmRepError {
    fn from(e: diagnostics::DiagnosticsError) -> Self {
        match e {
            diagnostics::DiagnosticsError::AlreadyRunning => PharmRepError::Busy(e.to_string()),
            other => PharmRepError::DatabaseError(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for PharmRepError {
    fn from(e: serde_json::Error) -> Self {
        PharmRepError::SerializationError(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for PharmRepError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        PharmRepError::DatabaseError(format!("Lock poisoned: {}", e))
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Install the tracing subscriber. Later calls are no-ops.
#[uniffi::export]
pub fn init_logging() {
    logging::init();
}

/// Open or create a database at the given path.
///
/// `base_url` overrides the configured API URL when given.
#[uniffi::export]
pub fn open_database(
    path: String,
    base_url: Option<String>,
) -> Result<Arc<PharmRepCore>, PharmRepError> {
    let db = Database::open(&path)?;
    let config = resolve_config(base_url);
    let transport = api::ReqwestTransport::new(&config).map_err(api::ApiError::from)?;
    Ok(Arc::new(PharmRepCore::with_transport(db, config, Arc::new(transport))?))
}

/// Create an in-memory database (for testing).
#[uniffi::export]
pub fn open_database_in_memory(
    base_url: Option<String>,
) -> Result<Arc<PharmRepCore>, PharmRepError> {
    let db = Database::open_in_memory()?;
    let config = resolve_config(base_url);
    let transport = api::ReqwestTransport::new(&config).map_err(api::ApiError::from)?;
    Ok(Arc::new(PharmRepCore::with_transport(db, config, Arc::new(transport))?))
}

fn resolve_config(base_url: Option<String>) -> ApiConfig {
    let config = ApiConfig::from_env();
    match base_url.filter(|url| !url.trim().is_empty()) {
        Some(url) => ApiConfig {
            base_url: ApiConfig::new(&url).base_url,
            ..config
        },
        None => config,
    }
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe core wrapper for FFI.
#[derive(uniffi::Object)]
pub struct PharmRepCore {
    db: Arc<Mutex<Database>>,
    config: ApiConfig,
    transport: Arc<dyn HttpTransport>,
    visit: Mutex<VisitStore>,
    rep: Mutex<RepStore>,
    diagnostics: DiagnosticsBoard,
    catalog_loading: AtomicBool,
    submitting: AtomicBool,
}

/// Clears a busy flag on scope exit.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl PharmRepCore {
    /// Build a core over an explicit transport. The visit store is restored
    /// from the persisted catalog.
    pub fn with_transport(
        db: Database,
        config: ApiConfig,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self, PharmRepError> {
        let visit = VisitStore::restore(&db)?;
        tracing::info!(base_url = %config.base_url, "PharmRep core ready");
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            config,
            transport,
            visit: Mutex::new(visit),
            rep: Mutex::new(RepStore::new()),
            diagnostics: DiagnosticsBoard::new(),
            catalog_loading: AtomicBool::new(false),
            submitting: AtomicBool::new(false),
        })
    }

    /// API client carrying the stored auth token.
    fn client(&self) -> Result<ApiClient, PharmRepError> {
        let token = self.db.lock()?.get_auth_token()?;
        Ok(ApiClient::new(self.config.clone(), Arc::clone(&self.transport)).with_token(token))
    }

    fn claim<'a>(flag: &'a AtomicBool, what: &str) -> Result<BusyGuard<'a>, PharmRepError> {
        if flag.swap(true, Ordering::AcqRel) {
            return Err(PharmRepError::Busy(format!("{} already in progress", what)));
        }
        Ok(BusyGuard(flag))
    }

    fn persist_catalog(&self, visit: &VisitStore) -> Result<(), PharmRepError> {
        let db = self.db.lock()?;
        visit.persist(&db)?;
        Ok(())
    }
}

#[uniffi::export]
impl PharmRepCore {
    // =========================================================================
    // Session
    // =========================================================================

    /// Store the bearer token used for every API call.
    pub fn set_auth_token(&self, token: String) -> Result<(), PharmRepError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(PharmRepError::InvalidInput("Token cannot be empty".into()));
        }
        self.db.lock()?.set_auth_token(token)?;
        Ok(())
    }

    pub fn clear_auth_token(&self) -> Result<(), PharmRepError> {
        self.db.lock()?.clear_auth_token()?;
        Ok(())
    }

    pub fn has_auth_token(&self) -> Result<bool, PharmRepError> {
        Ok(self.db.lock()?.get_auth_token()?.is_some())
    }

    /// Base URL the core talks to.
    pub fn api_base_url(&self) -> String {
        self.config.base_url.clone()
    }

    // =========================================================================
    // Catalog Operations
    // =========================================================================

    /// Fetch the product catalog and rebuild the visit lines.
    ///
    /// The visit lock is released while the request runs.
    pub fn load_catalog(&self) -> Result<FfiVisitDraft, PharmRepError> {
        let _busy = Self::claim(&self.catalog_loading, "Catalog load")?;
        let client = self.client()?;

        self.visit.lock()?.begin_catalog_load();
        let fetched = client.list_products();

        let mut visit = self.visit.lock()?;
        let draft = visit.finish_catalog_load(fetched)?;
        self.persist_catalog(&visit)?;
        Ok(draft.as_ref().into())
    }

    /// Fetch everything a rep needs and adopt its products and pharmacies.
    pub fn load_rep_resources(&self, rep_id: String) -> Result<FfiRepSummary, PharmRepError> {
        let _busy = Self::claim(&self.catalog_loading, "Catalog load")?;
        let client = self.client()?;

        self.rep.lock()?.begin_load();
        let fetched = client.get_rep_resources(&rep_id);
        let resources = self.rep.lock()?.finish_load(&rep_id, fetched)?.clone();

        let mut visit = self.visit.lock()?;
        visit.set_catalog(resources.products.clone());
        visit.set_pharmacies(resources.pharmacies.clone());
        self.persist_catalog(&visit)?;

        Ok(FfiRepSummary {
            user_id: resources.user.id.clone(),
            display_name: resources.user.display_name().to_string(),
            product_count: resources.products.len() as u32,
            pharmacy_count: resources.pharmacies.len() as u32,
            total_visits: resources.stats.total_visits,
            total_sample_requests: resources.stats.total_sample_requests,
        })
    }

    /// Search the local catalog by name, code or brand.
    pub fn search_products(&self, query: String, limit: u32) -> Result<Vec<FfiProduct>, PharmRepError> {
        let db = self.db.lock()?;
        let products = db.search_products(&query, limit as usize)?;
        Ok(products.into_iter().map(|p| p.into()).collect())
    }

    pub fn list_products(&self) -> Result<Vec<FfiProduct>, PharmRepError> {
        let visit = self.visit.lock()?;
        Ok(visit.products().iter().cloned().map(|p| p.into()).collect())
    }

    pub fn list_pharmacies(&self) -> Result<Vec<FfiPharmacy>, PharmRepError> {
        let visit = self.visit.lock()?;
        Ok(visit.pharmacies().iter().cloned().map(|p| p.into()).collect())
    }

    /// Timestamp of the last catalog write, if any.
    pub fn catalog_last_sync(&self) -> Result<Option<String>, PharmRepError> {
        Ok(self.db.lock()?.catalog_last_sync()?)
    }

    // =========================================================================
    // Visit Draft Operations
    // =========================================================================

    pub fn visit_draft(&self) -> Result<FfiVisitDraft, PharmRepError> {
        let visit = self.visit.lock()?;
        Ok(visit.draft().as_ref().into())
    }

    /// Set quantity and selection of one order line.
    pub fn update_order_line(
        &self,
        product_id: String,
        quantity: u32,
        selected: bool,
    ) -> Result<FfiVisitDraft, PharmRepError> {
        let mut visit = self.visit.lock()?;
        let draft = visit.update_order_line(&product_id, quantity, selected);
        Ok(draft.as_ref().into())
    }

    /// Set quantity and selection of one collection line.
    pub fn update_collection_line(
        &self,
        product_id: String,
        quantity: u32,
        selected: bool,
    ) -> Result<FfiVisitDraft, PharmRepError> {
        let mut visit = self.visit.lock()?;
        let draft = visit.update_collection_line(&product_id, quantity, selected);
        Ok(draft.as_ref().into())
    }

    pub fn set_visit_date(&self, date: String) -> Result<FfiVisitDraft, PharmRepError> {
        let mut visit = self.visit.lock()?;
        let draft = visit.set_visit_date(&date)?;
        Ok(draft.as_ref().into())
    }

    pub fn set_visit_pharmacy(
        &self,
        pharmacy_id: Option<String>,
    ) -> Result<FfiVisitDraft, PharmRepError> {
        let mut visit = self.visit.lock()?;
        let draft = visit.set_pharmacy(pharmacy_id.as_deref())?;
        Ok(draft.as_ref().into())
    }

    pub fn set_visit_receipt(
        &self,
        receipt_number: Option<String>,
        receipt_image: Option<String>,
    ) -> Result<FfiVisitDraft, PharmRepError> {
        let mut visit = self.visit.lock()?;
        let draft = visit.set_receipt(ReceiptInfo {
            receipt_number,
            receipt_image,
        });
        Ok(draft.as_ref().into())
    }

    pub fn set_visit_notes(&self, notes: String) -> Result<FfiVisitDraft, PharmRepError> {
        let mut visit = self.visit.lock()?;
        let draft = visit.set_notes(&notes);
        Ok(draft.as_ref().into())
    }

    pub fn reset_visit_draft(&self) -> Result<FfiVisitDraft, PharmRepError> {
        let mut visit = self.visit.lock()?;
        let draft = visit.reset_draft();
        Ok(draft.as_ref().into())
    }

    /// Submit the draft. Returns the server-assigned visit ID, if any.
    ///
    /// The visit lock is released while the request runs.
    pub fn submit_visit(&self) -> Result<Option<String>, PharmRepError> {
        let _busy = Self::claim(&self.submitting, "Visit submission")?;
        let client = self.client()?;

        let submission = self.visit.lock()?.begin_submit()?;
        let sent = client.submit_visit(&submission);
        let created = self.visit.lock()?.finish_submit(sent)?;
        Ok(created.id)
    }

    /// True while a catalog fetch or visit submission is in flight.
    pub fn visit_loading(&self) -> Result<bool, PharmRepError> {
        Ok(self.visit.lock()?.is_loading())
    }

    /// Message of the last failed catalog fetch or submission.
    pub fn visit_error(&self) -> Result<Option<String>, PharmRepError> {
        Ok(self.visit.lock()?.error().map(str::to_string))
    }

    // =========================================================================
    // Remote Records
    // =========================================================================

    pub fn list_sample_requests(&self) -> Result<Vec<FfiSampleRequest>, PharmRepError> {
        let client = self.client()?;
        let requests = client.list_sample_requests()?;
        Ok(requests.into_iter().map(|r| r.into()).collect())
    }

    pub fn get_sample_request(&self, id: String) -> Result<FfiSampleRequest, PharmRepError> {
        let client = self.client()?;
        Ok(client.get_sample_request(&id)?.into())
    }

    /// Raw doctor search.
    pub fn search_doctors(&self, query: String) -> Result<FfiDoctorSearch, PharmRepError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(PharmRepError::InvalidInput("Search query cannot be empty".into()));
        }
        let client = self.client()?;
        let result = client.search_doctors(query)?;

        let doctors = result
            .found_doctors
            .iter()
            .map(|doctor| FfiDoctor {
                id: doctor.id.clone(),
                name: doctor.name.clone(),
                label: doctor.display_label(),
                specialty: doctor.specialty.clone(),
                organization: doctor.organization.clone(),
                city: doctor.city.clone(),
                visit_count: result.visits_for(&doctor.id).len() as u32,
                last_visit_date: result
                    .visits_for(&doctor.id)
                    .first()
                    .map(|v| v.visit_date.clone()),
            })
            .collect();

        Ok(FfiDoctorSearch {
            query: result.search_query.clone(),
            doctors,
            total_doctors: result.statistics.total_doctors,
            total_visits: result.statistics.total_visits,
        })
    }

    /// Publish a bilingual marketing activity. Returns the new record ID, if any.
    pub fn create_marketing_activity(
        &self,
        english: String,
        arabic: String,
        is_active: bool,
    ) -> Result<Option<String>, PharmRepError> {
        if english.trim().is_empty() || arabic.trim().is_empty() {
            return Err(PharmRepError::InvalidInput(
                "Both English and Arabic text are required".into(),
            ));
        }
        let client = self.client()?;
        let created = client.create_marketing_activity(&MarketingActivity {
            english,
            arabic,
            is_active,
        })?;
        Ok(created.id)
    }

    // =========================================================================
    // Diagnostics
    // =========================================================================

    /// Run every probe and return the final list. Rejected while a run is in flight.
    pub fn run_diagnostics(
        &self,
        subject_id: Option<String>,
    ) -> Result<Vec<FfiDiagnosticResult>, PharmRepError> {
        let client = self.client()?;
        let runner = DiagnosticsRunner::new(&client);
        let results = self.diagnostics.run(&runner, subject_id.as_deref())?;
        results.iter().map(FfiDiagnosticResult::try_from).collect()
    }

    /// Latest published list; a prefix of the final list while running.
    pub fn diagnostics_snapshot(&self) -> Result<Vec<FfiDiagnosticResult>, PharmRepError> {
        self.diagnostics
            .snapshot()
            .iter()
            .map(FfiDiagnosticResult::try_from)
            .collect()
    }

    pub fn diagnostics_running(&self) -> bool {
        self.diagnostics.is_running()
    }

    /// Status counts and a plain-text report for the latest published list.
    pub fn diagnostics_summary(&self) -> FfiDiagnosticsSummary {
        let results = self.diagnostics.snapshot();
        let summary = diagnostics::DiagnosticsSummary::from_results(&results);
        FfiDiagnosticsSummary {
            success: summary.success as u32,
            warning: summary.warning as u32,
            error: summary.error as u32,
            pending: summary.pending as u32,
            all_passed: summary.all_passed(),
            report: diagnostics::format_report(&results),
        }
    }
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe product.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiProduct {
    pub id: String,
    pub name: String,
    pub code: String,
    pub price: f64,
    pub product_type: Option<String>,
    pub brand: Option<String>,
    pub company: Option<String>,
    pub team: Option<String>,
    pub messages: Vec<String>,
}

impl From<Product> for FfiProduct {
    fn from(product: Product) -> Self {
        Self {
            id: product.id,
            name: product.name,
            code: product.code,
            price: product.price,
            product_type: product.product_type,
            brand: product.brand,
            company: product.company,
            team: product.team,
            messages: product.messages,
        }
    }
}

/// FFI-safe pharmacy.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPharmacy {
    pub id: String,
    pub name: String,
    pub area: Option<String>,
    pub city: Option<String>,
}

impl From<Pharmacy> for FfiPharmacy {
    fn from(pharmacy: Pharmacy) -> Self {
        Self {
            id: pharmacy.id,
            name: pharmacy.name,
            area: pharmacy.area,
            city: pharmacy.city,
        }
    }
}

/// FFI-safe order line.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiOrderLine {
    pub product_id: String,
    pub product_name: String,
    pub unit_price: f64,
    pub quantity: u32,
    pub selected: bool,
}

impl From<&OrderProduct> for FfiOrderLine {
    fn from(line: &OrderProduct) -> Self {
        Self {
            product_id: line.product.id.clone(),
            product_name: line.product.name.clone(),
            unit_price: line.product.price,
            quantity: line.quantity,
            selected: line.selected,
        }
    }
}

/// FFI-safe collection line.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiCollectionLine {
    pub product_id: String,
    pub product_name: String,
    pub unit_price: f64,
    pub quantity: u32,
    pub selected: bool,
    pub total_price: f64,
}

impl From<&CollectionProduct> for FfiCollectionLine {
    fn from(line: &CollectionProduct) -> Self {
        Self {
            product_id: line.product.id.clone(),
            product_name: line.product.name.clone(),
            unit_price: line.product.price,
            quantity: line.quantity,
            selected: line.selected,
            total_price: line.total_price,
        }
    }
}

/// FFI-safe visit draft snapshot.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiVisitDraft {
    pub draft_id: String,
    pub visit_date: String,
    pub pharmacy_id: Option<String>,
    pub order_lines: Vec<FfiOrderLine>,
    pub collection_lines: Vec<FfiCollectionLine>,
    pub collected_amount: f64,
    pub receipt_number: Option<String>,
    pub receipt_image: Option<String>,
    pub notes: String,
}

impl From<&VisitFormData> for FfiVisitDraft {
    fn from(draft: &VisitFormData) -> Self {
        Self {
            draft_id: draft.draft_id.clone(),
            visit_date: draft.visit_date.clone(),
            pharmacy_id: draft.pharmacy_id.clone(),
            order_lines: draft.order_products.iter().map(|l| l.into()).collect(),
            collection_lines: draft.collection_products.iter().map(|l| l.into()).collect(),
            collected_amount: draft.collected_amount,
            receipt_number: draft.receipt.receipt_number.clone(),
            receipt_image: draft.receipt.receipt_image.clone(),
            notes: draft.notes.clone(),
        }
    }
}

/// FFI-safe sample request.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiSampleRequest {
    pub id: String,
    pub request_date: String,
    pub delivery_date: Option<String>,
    pub product_id: String,
    pub product_name: Option<String>,
    pub doctor_id: String,
    pub doctor_name: Option<String>,
    pub quantity: u32,
    pub status: String,
    pub is_open: bool,
    pub notes: Option<String>,
}

impl From<SampleRequest> for FfiSampleRequest {
    fn from(request: SampleRequest) -> Self {
        Self {
            is_open: request.is_open(),
            status: request.status.as_str().to_string(),
            id: request.id,
            request_date: request.request_date,
            delivery_date: request.delivery_date,
            product_id: request.product.id,
            product_name: request.product.name,
            doctor_id: request.doctor.id,
            doctor_name: request.doctor.name,
            quantity: request.quantity,
            notes: request.notes,
        }
    }
}

/// FFI-safe doctor row.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiDoctor {
    pub id: String,
    pub name: String,
    pub label: String,
    pub specialty: Option<String>,
    pub organization: Option<String>,
    pub city: Option<String>,
    pub visit_count: u32,
    pub last_visit_date: Option<String>,
}

/// FFI-safe doctor search result.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiDoctorSearch {
    pub query: String,
    pub doctors: Vec<FfiDoctor>,
    pub total_doctors: u32,
    pub total_visits: u32,
}

/// FFI-safe rep resource summary.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiRepSummary {
    pub user_id: String,
    pub display_name: String,
    pub product_count: u32,
    pub pharmacy_count: u32,
    pub total_visits: u32,
    pub total_sample_requests: u32,
}

/// FFI-safe diagnostic row. `details_json` is the serialized details payload.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiDiagnosticResult {
    pub name: String,
    pub status: String,
    pub message: String,
    pub details_json: Option<String>,
}

impl TryFrom<&DiagnosticTestResult> for FfiDiagnosticResult {
    type Error = PharmRepError;

    fn try_from(result: &DiagnosticTestResult) -> Result<Self, Self::Error> {
        Ok(Self {
            name: result.name.clone(),
            status: result.status.as_str().to_string(),
            message: result.message.clone(),
            details_json: result
                .details
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?,
        })
    }
}

/// FFI-safe status counts for a diagnostics list.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiDiagnosticsSummary {
    pub success: u32,
    pub warning: u32,
    pub error: u32,
    pub pending: u32,
    pub all_passed: bool,
    pub report: String,
}
