//! Catalog models: products, pharmacies and doctors as the remote API returns them.

use serde::{Deserialize, Serialize};

/// A product in the company catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Server identifier
    pub id: String,
    /// Commercial product name
    pub name: String,
    /// Internal product code
    #[serde(default)]
    pub code: String,
    /// Unit price
    #[serde(default)]
    pub price: f64,
    /// Product type (e.g., "tablet", "syrup")
    #[serde(default)]
    pub product_type: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    /// Sales team the product belongs to
    #[serde(default)]
    pub team: Option<String>,
    /// Free-text annotations attached by marketing
    #[serde(default)]
    pub messages: Vec<String>,
}

impl Product {
    /// Create a product with required fields.
    pub fn new(id: impl Into<String>, name: impl Into<String>, price: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            code: String::new(),
            price,
            product_type: None,
            brand: None,
            company: None,
            team: None,
            messages: Vec::new(),
        }
    }

    /// Price for a given quantity.
    pub fn price_for(&self, quantity: u32) -> f64 {
        f64::from(quantity) * self.price
    }
}

/// Body accepted by the product create/update endpoints.
///
/// The backend expects upper-case column names for everything except `messages`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductPayload {
    #[serde(rename = "CODE")]
    pub code: String,
    #[serde(rename = "PRODUCT")]
    pub product: String,
    #[serde(rename = "PRODUCT_TYPE")]
    pub product_type: String,
    #[serde(rename = "BRAND")]
    pub brand: String,
    #[serde(rename = "TEAM")]
    pub team: String,
    #[serde(rename = "COMPANY")]
    pub company: String,
    pub messages: Vec<String>,
}

impl From<&Product> for ProductPayload {
    fn from(product: &Product) -> Self {
        Self {
            code: product.code.clone(),
            product: product.name.clone(),
            product_type: product.product_type.clone().unwrap_or_default(),
            brand: product.brand.clone().unwrap_or_default(),
            team: product.team.clone().unwrap_or_default(),
            company: product.company.clone().unwrap_or_default(),
            messages: product.messages.clone(),
        }
    }
}

/// A pharmacy a rep can visit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Pharmacy {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub area: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
}

impl Pharmacy {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            area: None,
            city: None,
        }
    }
}

/// Doctor reference record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Doctor {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub specialty: Option<String>,
    /// Hospital or clinic
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub area: Option<String>,
}

impl Doctor {
    /// Short label for lists: "name (specialty, city)".
    pub fn display_label(&self) -> String {
        let extras: Vec<&str> = [self.specialty.as_deref(), self.city.as_deref()]
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .collect();
        if extras.is_empty() {
            self.name.clone()
        } else {
            format!("{} ({})", self.name, extras.join(", "))
        }
    }
}
