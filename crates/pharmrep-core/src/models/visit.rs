//! Pharmacy visit draft models.

use serde::{Deserialize, Serialize};

use super::catalog::Product;

/// An order line in a visit draft, derived from one catalog product.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderProduct {
    pub product: Product,
    pub quantity: u32,
    pub selected: bool,
}

impl OrderProduct {
    /// Fresh line for a product: nothing ordered.
    pub fn from_product(product: &Product) -> Self {
        Self {
            product: product.clone(),
            quantity: 0,
            selected: false,
        }
    }

    pub fn product_id(&self) -> &str {
        &self.product.id
    }
}

/// A collection line in a visit draft. `total_price` is always `quantity × price`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CollectionProduct {
    pub product: Product,
    pub quantity: u32,
    pub selected: bool,
    pub total_price: f64,
}

impl CollectionProduct {
    /// Fresh line for a product: nothing collected.
    pub fn from_product(product: &Product) -> Self {
        Self {
            product: product.clone(),
            quantity: 0,
            selected: false,
            total_price: 0.0,
        }
    }

    pub fn product_id(&self) -> &str {
        &self.product.id
    }

    /// Set quantity and selection, recomputing the line total.
    pub fn apply(&mut self, quantity: u32, selected: bool) {
        self.quantity = quantity;
        self.selected = selected;
        self.total_price = self.product.price_for(quantity);
    }
}

/// Receipt details captured when money is collected.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptInfo {
    pub receipt_number: Option<String>,
    /// Host-side reference to the scanned receipt (URI or file path)
    pub receipt_image: Option<String>,
}

impl ReceiptInfo {
    pub fn is_empty(&self) -> bool {
        self.receipt_number.is_none() && self.receipt_image.is_none()
    }
}

/// The in-progress visit form. Client-only until submitted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VisitFormData {
    /// Local draft ID, regenerated on every reset
    pub draft_id: String,
    /// Visit date (YYYY-MM-DD)
    pub visit_date: String,
    /// Selected pharmacy ID
    pub pharmacy_id: Option<String>,
    pub order_products: Vec<OrderProduct>,
    pub collection_products: Vec<CollectionProduct>,
    /// Sum of `total_price` over selected collection lines
    pub collected_amount: f64,
    pub receipt: ReceiptInfo,
    pub notes: String,
}

impl VisitFormData {
    /// Create an empty draft with one order and one collection line per product.
    pub fn new(products: &[Product]) -> Self {
        Self {
            draft_id: uuid::Uuid::new_v4().to_string(),
            visit_date: chrono::Utc::now().date_naive().to_string(),
            pharmacy_id: None,
            order_products: products.iter().map(OrderProduct::from_product).collect(),
            collection_products: products
                .iter()
                .map(CollectionProduct::from_product)
                .collect(),
            collected_amount: 0.0,
            receipt: ReceiptInfo::default(),
            notes: String::new(),
        }
    }

    /// Sum of line totals over selected collection lines.
    pub fn selected_collection_total(&self) -> f64 {
        self.collection_products
            .iter()
            .filter(|line| line.selected)
            .map(|line| line.total_price)
            .sum()
    }

    /// Recompute `collected_amount` from scratch.
    pub fn recompute_collected_amount(&mut self) {
        self.collected_amount = self.selected_collection_total();
    }

    pub fn selected_order_count(&self) -> usize {
        self.order_products.iter().filter(|l| l.selected).count()
    }

    pub fn selected_collection_count(&self) -> usize {
        self.collection_products.iter().filter(|l| l.selected).count()
    }

    /// Check the draft is ready to submit.
    pub fn validate(&self) -> Result<(), String> {
        if self.pharmacy_id.as_deref().map_or(true, str::is_empty) {
            return Err("A pharmacy must be selected".into());
        }
        if self.selected_order_count() == 0 && self.selected_collection_count() == 0 {
            return Err("Select at least one order or collection line".into());
        }
        if self.collected_amount < 0.0 {
            return Err(format!(
                "Collected amount cannot be negative: {}",
                self.collected_amount
            ));
        }
        Ok(())
    }

    /// Build the submission body: only selected lines with a positive quantity.
    pub fn to_submission(&self) -> Result<VisitSubmission, String> {
        self.validate()?;

        let order_lines = self
            .order_products
            .iter()
            .filter(|l| l.selected && l.quantity > 0)
            .map(|l| SubmissionLine {
                product_id: l.product.id.clone(),
                quantity: l.quantity,
                total_price: None,
            })
            .collect();

        let collection_lines = self
            .collection_products
            .iter()
            .filter(|l| l.selected && l.quantity > 0)
            .map(|l| SubmissionLine {
                product_id: l.product.id.clone(),
                quantity: l.quantity,
                total_price: Some(l.total_price),
            })
            .collect();

        Ok(VisitSubmission {
            visit_date: self.visit_date.clone(),
            pharmacy_id: self.pharmacy_id.clone().unwrap_or_default(),
            order_lines,
            collection_lines,
            collected_amount: self.collected_amount,
            receipt: self.receipt.clone(),
            notes: self.notes.clone(),
        })
    }
}

/// One submitted line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionLine {
    pub product_id: String,
    pub quantity: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_price: Option<f64>,
}

/// Visit body sent to the backend once the rep confirms the form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VisitSubmission {
    pub visit_date: String,
    pub pharmacy_id: String,
    pub order_lines: Vec<SubmissionLine>,
    pub collection_lines: Vec<SubmissionLine>,
    pub collected_amount: f64,
    pub receipt: ReceiptInfo,
    pub notes: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Vec<Product> {
        vec![Product::new("P1", "Panadol", 10.0), Product::new("P2", "Brufen", 5.0)]
    }

    #[test]
    fn test_new_draft_is_empty() {
        let draft = VisitFormData::new(&catalog());
        assert_eq!(draft.order_products.len(), 2);
        assert_eq!(draft.collection_products.len(), 2);
        assert!(draft.order_products.iter().all(|l| l.quantity == 0 && !l.selected));
        assert!(draft
            .collection_products
            .iter()
            .all(|l| l.quantity == 0 && !l.selected && l.total_price == 0.0));
        assert_eq!(draft.collected_amount, 0.0);
        assert_eq!(draft.draft_id.len(), 36);
        assert_eq!(draft.visit_date.len(), 10);
    }

    #[test]
    fn test_collection_line_apply() {
        let mut line = CollectionProduct::from_product(&Product::new("P1", "Panadol", 2.5));
        line.apply(4, true);
        assert_eq!(line.total_price, 10.0);

        // Deselecting keeps the line total; it just stops counting
        line.apply(4, false);
        assert_eq!(line.total_price, 10.0);
        assert!(!line.selected);
    }

    #[test]
    fn test_validate_requires_pharmacy_and_lines() {
        let mut draft = VisitFormData::new(&catalog());
        assert!(draft.validate().is_err());

        draft.pharmacy_id = Some("ph-1".into());
        assert!(draft.validate().is_err());

        draft.order_products[0].quantity = 2;
        draft.order_products[0].selected = true;
        assert!(draft.validate().is_ok());
    }

    #[test]
    fn test_submission_skips_unselected_and_zero_lines() {
        let mut draft = VisitFormData::new(&catalog());
        draft.pharmacy_id = Some("ph-1".into());
        draft.order_products[0].selected = true; // quantity 0: dropped
        draft.order_products[1].quantity = 3;
        draft.order_products[1].selected = true;
        draft.collection_products[0].apply(2, true);
        draft.collection_products[1].apply(5, false);
        draft.recompute_collected_amount();

        let submission = draft.to_submission().unwrap();
        assert_eq!(submission.order_lines.len(), 1);
        assert_eq!(submission.order_lines[0].product_id, "P2");
        assert_eq!(submission.collection_lines.len(), 1);
        assert_eq!(submission.collection_lines[0].total_price, Some(20.0));
        assert_eq!(submission.collected_amount, 20.0);

        let json = serde_json::to_value(&submission).unwrap();
        assert_eq!(json["pharmacyId"], "ph-1");
        assert!(json["orderLines"][0].get("totalPrice").is_none());
    }
}
