//! Domain models for the pharmrep client core.

mod catalog;
mod diagnostics;
mod rep;
mod sample_request;
mod visit;

pub use catalog::*;
pub use diagnostics::*;
pub use rep::*;
pub use sample_request::*;
pub use visit::*;
