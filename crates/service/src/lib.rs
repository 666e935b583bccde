//! Service layer providing the meter reading business operations on top of models.
//! - Separates business logic from data access and from the HTTP surface.
//! - Reuses validation and entity definitions in `models` crate.
//! - Provides clear error types and documented interfaces.

pub mod errors;
pub mod measure;
pub mod runtime;
pub mod storage;
pub mod vision;
#[cfg(test)]
pub mod test_support;
