//! Meter readings: three-layer architecture (domain, repository, service).
//!
//! Upload, confirmation and listing of readings live here, independent of the
//! web framework. Requests enter as untyped JSON and leave `validation` as
//! typed inputs before any business rule runs.

pub mod domain;
pub mod repo;
pub mod repository;
pub mod service;
pub mod validation;

pub use service::{MeasureService, MeasureSettings};
