//! `lectio-core` — shared domain primitives for the analysis core.
//!
//! This crate contains **pure domain** types (no runtime or transport
//! concerns): analysis job identity, the remote status model, and the
//! domain error model.

pub mod error;
pub mod id;
pub mod status;

pub use error::{DomainError, DomainResult};
pub use id::JobId;
pub use status::{AnalysisStatus, StatusReport};
