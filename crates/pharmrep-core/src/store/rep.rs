//! Medical-rep resource store: the last rep-scoped response, mirrored as-is.

use super::StoreResult;
use crate::api::ApiResult;
use crate::models::{Pharmacy, Product, RepResources, RepStats, User};

#[derive(Default)]
pub struct RepStore {
    resources: Option<RepResources>,
    loading: bool,
    error: Option<String>,
}

impl RepStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a resource fetch as in flight.
    pub fn begin_load(&mut self) {
        self.loading = true;
        self.error = None;
    }

    /// Apply a resource fetch. On failure the previous data stays and the
    /// error message is recorded.
    pub fn finish_load(
        &mut self,
        rep_id: &str,
        fetched: ApiResult<RepResources>,
    ) -> StoreResult<&RepResources> {
        self.loading = false;
        match fetched {
            Ok(resources) => {
                tracing::info!(
                    rep = rep_id,
                    products = resources.products.len(),
                    pharmacies = resources.pharmacies.len(),
                    "Loaded rep resources"
                );
                Ok(&*self.resources.insert(resources))
            }
            Err(e) => {
                tracing::warn!(rep = rep_id, error = %e, "Failed to load rep resources");
                self.error = Some(e.to_string());
                Err(e.into())
            }
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn resources(&self) -> Option<&RepResources> {
        self.resources.as_ref()
    }

    pub fn user(&self) -> Option<&User> {
        self.resources.as_ref().map(|r| &r.user)
    }

    pub fn products(&self) -> &[Product] {
        self.resources
            .as_ref()
            .map(|r| r.products.as_slice())
            .unwrap_or(&[])
    }

    pub fn pharmacies(&self) -> &[Pharmacy] {
        self.resources
            .as_ref()
            .map(|r| r.pharmacies.as_slice())
            .unwrap_or(&[])
    }

    pub fn stats(&self) -> RepStats {
        self.resources
            .as_ref()
            .map(|r| r.stats.clone())
            .unwrap_or_default()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}
