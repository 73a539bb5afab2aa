//! Visit line-item store: catalog plus one in-progress visit draft.

use std::collections::HashSet;
use std::sync::Arc;

use super::{StoreError, StoreResult};
use crate::api::{ApiResult, CreatedRecord};
use crate::db::Database;
use crate::models::{Pharmacy, Product, ReceiptInfo, VisitFormData, VisitSubmission};

/// Holds the catalog and the visit draft.
///
/// After every mutation each collection line's `total_price` equals
/// `quantity × price` and `collected_amount` equals the sum over selected
/// collection lines. Both are recomputed, never patched.
///
/// Network calls happen outside the store. Remote operations are split into
/// a `begin_*` step that flags `loading` and a `finish_*` step that applies
/// the response, so the owner can release its lock while the request runs.
pub struct VisitStore {
    products: Vec<Product>,
    pharmacies: Vec<Pharmacy>,
    draft: Arc<VisitFormData>,
    loading: bool,
    error: Option<String>,
}

impl Default for VisitStore {
    fn default() -> Self {
        Self::new()
    }
}

impl VisitStore {
    /// Empty catalog, empty draft.
    pub fn new() -> Self {
        Self {
            products: Vec::new(),
            pharmacies: Vec::new(),
            draft: Arc::new(VisitFormData::new(&[])),
            loading: false,
            error: None,
        }
    }

    /// Rebuild from the persisted catalog. The draft always starts fresh.
    pub fn restore(db: &Database) -> StoreResult<Self> {
        let products = db.list_products()?;
        let pharmacies = db.list_pharmacies()?;
        tracing::debug!(
            products = products.len(),
            pharmacies = pharmacies.len(),
            "Restored visit catalog"
        );
        Ok(Self {
            draft: Arc::new(VisitFormData::new(&products)),
            products,
            pharmacies,
            loading: false,
            error: None,
        })
    }

    /// Persist the catalog only.
    pub fn persist(&self, db: &Database) -> StoreResult<()> {
        db.replace_products(&self.products)?;
        db.replace_pharmacies(&self.pharmacies)?;
        Ok(())
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Current draft snapshot.
    pub fn draft(&self) -> Arc<VisitFormData> {
        Arc::clone(&self.draft)
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn pharmacies(&self) -> &[Pharmacy] {
        &self.pharmacies
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    /// Replace the product catalog and rebuild every line from scratch.
    ///
    /// In-progress quantities and selections are discarded. Duplicate product
    /// IDs keep their first occurrence.
    pub fn set_catalog(&mut self, mut products: Vec<Product>) -> Arc<VisitFormData> {
        let mut seen = HashSet::new();
        let before = products.len();
        products.retain(|p| seen.insert(p.id.clone()));
        if products.len() < before {
            tracing::warn!(dropped = before - products.len(), "Duplicate product IDs in catalog");
        }
        self.products = products;
        let draft = Arc::make_mut(&mut self.draft);
        let fresh = VisitFormData::new(&self.products);
        draft.order_products = fresh.order_products;
        draft.collection_products = fresh.collection_products;
        draft.recompute_collected_amount();
        tracing::debug!(products = self.products.len(), "Visit catalog replaced");
        self.draft()
    }

    /// Replace the pharmacy list. Clears the draft's pharmacy if it disappeared.
    pub fn set_pharmacies(&mut self, pharmacies: Vec<Pharmacy>) -> Arc<VisitFormData> {
        self.pharmacies = pharmacies;
        let still_known = match &self.draft.pharmacy_id {
            Some(id) => self.pharmacies.iter().any(|p| &p.id == id),
            None => true,
        };
        if !still_known {
            Arc::make_mut(&mut self.draft).pharmacy_id = None;
        }
        self.draft()
    }

    /// Mark a catalog fetch as in flight.
    pub fn begin_catalog_load(&mut self) {
        self.loading = true;
        self.error = None;
    }

    /// Apply a catalog fetch. A failure keeps the current catalog and is
    /// recorded in `error`; nothing is retried.
    pub fn finish_catalog_load(
        &mut self,
        fetched: ApiResult<Vec<Product>>,
    ) -> StoreResult<Arc<VisitFormData>> {
        self.loading = false;
        match fetched {
            Ok(products) => {
                tracing::info!(count = products.len(), "Loaded product catalog");
                Ok(self.set_catalog(products))
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load product catalog");
                self.error = Some(e.to_string());
                Err(e.into())
            }
        }
    }

    // =========================================================================
    // Lines
    // =========================================================================

    /// Replace one order line by product ID. No-op if the ID is unknown.
    pub fn update_order_line(
        &mut self,
        product_id: &str,
        quantity: u32,
        selected: bool,
    ) -> Arc<VisitFormData> {
        let position = self
            .draft
            .order_products
            .iter()
            .position(|l| l.product_id() == product_id);

        if let Some(index) = position {
            let line = &mut Arc::make_mut(&mut self.draft).order_products[index];
            line.quantity = quantity;
            line.selected = selected;
        }
        self.draft()
    }

    /// Replace one collection line by product ID and recompute the collected amount.
    /// No-op if the ID is unknown.
    pub fn update_collection_line(
        &mut self,
        product_id: &str,
        quantity: u32,
        selected: bool,
    ) -> Arc<VisitFormData> {
        let position = self
            .draft
            .collection_products
            .iter()
            .position(|l| l.product_id() == product_id);

        if let Some(index) = position {
            let draft = Arc::make_mut(&mut self.draft);
            draft.collection_products[index].apply(quantity, selected);
            // Full scan: catalogs are tens to low hundreds of products
            draft.recompute_collected_amount();
        }
        self.draft()
    }

    // =========================================================================
    // Fields
    // =========================================================================

    /// Set the visit date (YYYY-MM-DD).
    pub fn set_visit_date(&mut self, date: &str) -> StoreResult<Arc<VisitFormData>> {
        let parsed = chrono::NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
            .map_err(|_| StoreError::InvalidDate(date.to_string()))?;
        Arc::make_mut(&mut self.draft).visit_date = parsed.to_string();
        Ok(self.draft())
    }

    /// Select a pharmacy from the catalog, or clear the selection.
    pub fn set_pharmacy(&mut self, pharmacy_id: Option<&str>) -> StoreResult<Arc<VisitFormData>> {
        if let Some(id) = pharmacy_id {
            if !self.pharmacies.iter().any(|p| p.id == id) {
                return Err(StoreError::UnknownPharmacy(id.to_string()));
            }
        }
        Arc::make_mut(&mut self.draft).pharmacy_id = pharmacy_id.map(str::to_string);
        Ok(self.draft())
    }

    pub fn set_receipt(&mut self, receipt: ReceiptInfo) -> Arc<VisitFormData> {
        Arc::make_mut(&mut self.draft).receipt = receipt;
        self.draft()
    }

    pub fn set_notes(&mut self, notes: &str) -> Arc<VisitFormData> {
        Arc::make_mut(&mut self.draft).notes = notes.to_string();
        self.draft()
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Restore the draft to empty defaults, keeping the catalog.
    pub fn reset_draft(&mut self) -> Arc<VisitFormData> {
        self.draft = Arc::new(VisitFormData::new(&self.products));
        self.error = None;
        self.draft()
    }

    /// Validate the draft and mark a submission as in flight.
    pub fn begin_submit(&mut self) -> StoreResult<VisitSubmission> {
        let submission = self.draft.to_submission().map_err(StoreError::Validation)?;
        self.loading = true;
        self.error = None;
        Ok(submission)
    }

    /// Apply the server's answer to a submission. The draft resets only on success.
    pub fn finish_submit(&mut self, sent: ApiResult<CreatedRecord>) -> StoreResult<CreatedRecord> {
        self.loading = false;
        match sent {
            Ok(created) => {
                tracing::info!(id = ?created.id, "Visit submitted");
                self.reset_draft();
                Ok(created)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Visit submission failed");
                self.error = Some(e.to_string());
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Vec<Product> {
        vec![Product::new("P1", "Panadol", 10.0), Product::new("P2", "Brufen", 5.0)]
    }

    fn store() -> VisitStore {
        let mut store = VisitStore::new();
        store.set_catalog(catalog());
        store
    }

    #[test]
    fn test_set_catalog_builds_fresh_lines() {
        let store = store();
        let draft = store.draft();
        assert_eq!(draft.order_products.len(), 2);
        assert_eq!(draft.collection_products.len(), 2);
        assert!(draft.order_products.iter().all(|l| l.quantity == 0 && !l.selected));
        assert!(draft
            .collection_products
            .iter()
            .all(|l| l.quantity == 0 && !l.selected && l.total_price == 0.0));
    }

    #[test]
    fn test_set_catalog_discards_edits() {
        let mut store = store();
        store.update_order_line("P1", 4, true);
        store.update_collection_line("P2", 3, true);
        store.set_notes("keep me");

        let draft = store.set_catalog(catalog());
        assert_eq!(draft.order_products[0].quantity, 0);
        assert_eq!(draft.collected_amount, 0.0);
        assert_eq!(draft.notes, "keep me");
    }

    #[test]
    fn test_collection_scenario() {
        let mut store = store();

        let draft = store.update_collection_line("P1", 3, true);
        assert_eq!(draft.collected_amount, 30.0);

        let draft = store.update_collection_line("P2", 2, true);
        assert_eq!(draft.collected_amount, 40.0);

        let draft = store.update_collection_line("P1", 3, false);
        assert_eq!(draft.collected_amount, 10.0);
        assert_eq!(draft.collection_products[0].total_price, 30.0);
    }

    #[test]
    fn test_order_line_update_leaves_collection_alone() {
        let mut store = store();
        let draft = store.update_order_line("P2", 7, true);
        assert_eq!(draft.order_products[1].quantity, 7);
        assert!(draft.order_products[1].selected);
        assert!(draft.collection_products.iter().all(|l| l.quantity == 0));
    }

    #[test]
    fn test_unknown_product_is_noop() {
        let mut store = store();
        let before = store.draft();
        let after = store.update_order_line("nope", 1, true);
        assert_eq!(*before, *after);
        let after = store.update_collection_line("nope", 1, true);
        assert_eq!(*before, *after);
    }

    #[test]
    fn test_snapshots_are_immutable() {
        let mut store = store();
        let snapshot = store.draft();
        store.update_collection_line("P1", 1, true);
        assert_eq!(snapshot.collected_amount, 0.0);
        assert_eq!(store.draft().collected_amount, 10.0);
    }

    #[test]
    fn test_reset_draft_keeps_catalog() {
        let mut store = store();
        store.update_order_line("P1", 2, true);
        store.update_collection_line("P2", 2, true);
        let old_id = store.draft().draft_id.clone();

        let draft = store.reset_draft();
        assert_eq!(store.products().len(), 2);
        assert!(draft.order_products.iter().all(|l| l.quantity == 0 && !l.selected));
        assert_eq!(draft.collected_amount, 0.0);
        assert_ne!(draft.draft_id, old_id);
    }

    #[test]
    fn test_set_pharmacy_validates() {
        let mut store = store();
        store.set_pharmacies(vec![Pharmacy::new("ph-1", "El Ezaby")]);

        assert!(store.set_pharmacy(Some("ph-1")).is_ok());
        assert!(matches!(
            store.set_pharmacy(Some("ph-2")),
            Err(StoreError::UnknownPharmacy(_))
        ));
        assert_eq!(store.draft().pharmacy_id.as_deref(), Some("ph-1"));

        // Pharmacy vanishes from the catalog
        let draft = store.set_pharmacies(vec![]);
        assert!(draft.pharmacy_id.is_none());
    }

    #[test]
    fn test_set_visit_date() {
        let mut store = store();
        assert_eq!(
            store.set_visit_date("2024-05-02").unwrap().visit_date,
            "2024-05-02"
        );
        assert!(matches!(
            store.set_visit_date("02/05/2024"),
            Err(StoreError::InvalidDate(_))
        ));
    }

    #[test]
    fn test_duplicate_ids_keep_first() {
        let mut store = VisitStore::new();
        let draft = store.set_catalog(vec![
            Product::new("P1", "Panadol", 10.0),
            Product::new("P1", "Panadol Extra", 12.0),
            Product::new("P2", "Brufen", 5.0),
        ]);
        assert_eq!(store.products().len(), 2);
        assert_eq!(draft.collection_products.len(), 2);
        assert_eq!(draft.collection_products[0].product.name, "Panadol");

        let draft = store.update_collection_line("P1", 2, true);
        assert_eq!(draft.collected_amount, 20.0);
    }

    #[test]
    fn test_catalog_load_flags_loading_until_applied() {
        let mut store = store();
        store.begin_catalog_load();
        assert!(store.is_loading());
        // Draft stays readable and editable mid-flight
        assert_eq!(store.update_collection_line("P1", 1, true).collected_amount, 10.0);

        let draft = store
            .finish_catalog_load(Ok(vec![Product::new("P9", "Concor", 42.0)]))
            .unwrap();
        assert!(!store.is_loading());
        assert_eq!(draft.collection_products.len(), 1);
        assert_eq!(draft.collected_amount, 0.0);
    }

    #[test]
    fn test_failed_catalog_load_records_error() {
        let mut store = store();
        store.begin_catalog_load();
        let result = store.finish_catalog_load(Err(crate::api::ApiError::Application(
            "Catalog locked".into(),
        )));
        assert!(matches!(result, Err(StoreError::Api(_))));
        assert!(!store.is_loading());
        assert_eq!(store.products().len(), 2);
        assert!(store.error().unwrap().contains("Catalog locked"));
    }

    #[test]
    fn test_begin_submit_validates_before_flagging() {
        let mut store = store();
        assert!(matches!(store.begin_submit(), Err(StoreError::Validation(_))));
        assert!(!store.is_loading());
    }

    #[test]
    fn test_persist_and_restore_catalog_only() {
        let db = Database::open_in_memory().unwrap();
        let mut store = store();
        store.set_pharmacies(vec![Pharmacy::new("ph-1", "El Ezaby")]);
        store.set_pharmacy(Some("ph-1")).unwrap();
        store.update_collection_line("P1", 5, true);
        store.persist(&db).unwrap();

        let restored = VisitStore::restore(&db).unwrap();
        assert_eq!(restored.products(), store.products());
        assert_eq!(restored.pharmacies().len(), 1);

        let draft = restored.draft();
        assert!(draft.pharmacy_id.is_none());
        assert_eq!(draft.collected_amount, 0.0);
        assert!(!restored.is_loading());
        assert!(restored.error().is_none());
    }
}
