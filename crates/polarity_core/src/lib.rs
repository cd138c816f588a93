//! Tensor record store for plant-cell polarity review.
//! This crate is the single source of truth for record invariants, edit
//! history, and the snapshot/audit-log formats.

pub mod codec;
pub mod logging;
pub mod model;
pub mod service;
pub mod store;

pub use codec::audit::{apply_audit_log, read_audit_log, write_audit_log, write_entries};
pub use codec::snapshot::{read_raw_tensors, write_raw_tensors};
pub use codec::{CodecError, CodecResult};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::detection::Detection;
pub use model::entry::{AuditAction, AuditEntry};
pub use model::tensor::{CellId, CreationType, FieldValue, Point, Tensor, TensorField, TensorId};
pub use service::review_session::{
    replace_file, ReviewSession, SessionConfig, SessionError, SessionResult,
};
pub use store::command::{Command, Mutation};
pub use store::tensor_store::{HistoryStep, TensorStore};
pub use store::{StoreError, StoreResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
