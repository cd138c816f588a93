//! Tensor record model shared by the store and its codecs.
//!
//! # Responsibility
//! - Define the annotation record and its mutable-field vocabulary.
//! - Define the audit entry that describes one applied mutation.
//! - Define the detection input handed over by segmentation.
//!
//! # Invariants
//! - Every record is identified by a `TensorId` unique within its store.
//! - Records are never hard-deleted except when undoing a manual creation.

pub mod detection;
pub mod entry;
pub mod tensor;
