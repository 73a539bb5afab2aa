//! Client-side state containers.
//!
//! Each store owns its state and changes it only through named operations.
//! [`VisitStore`] hands out immutable `Arc` snapshots of the visit draft.

mod rep;
mod visit;

pub use rep::*;
pub use visit::*;

use thiserror::Error;

use crate::api::ApiError;
use crate::db::DbError;

/// Store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Invalid visit: {0}")]
    Validation(String),

    #[error("Unknown pharmacy: {0}")]
    UnknownPharmacy(String),

    #[error("Invalid visit date: {0}")]
    InvalidDate(String),
}

pub type StoreResult<T> = Result<T, StoreError>;
