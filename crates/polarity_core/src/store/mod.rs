//! In-memory tensor store with linear undo/redo history.
//!
//! # Responsibility
//! - Own every tensor record of one review and expose keyed access.
//! - Wrap manual edits as reversible commands on a linear history.
//!
//! # Invariants
//! - Records exist in exactly one store; nothing outside mutates them.
//! - Operations on unknown ids fail with `NotFound` instead of no-op.
//! - A command that fails to apply leaves records and history untouched.

use crate::model::tensor::TensorId;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod command;
pub mod tensor_store;

pub type StoreResult<T> = Result<T, StoreError>;

/// Semantic store failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Operation referenced an id absent from the store.
    NotFound(TensorId),
    /// Creation reused an id already present in the store.
    DuplicateId(TensorId),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "tensor not found: {id}"),
            Self::DuplicateId(id) => write!(f, "tensor id already in use: {id}"),
        }
    }
}

impl Error for StoreError {}
