//! Audit entry describing one applied mutation.
//!
//! Entries are produced by the store when a mutation is applied and consumed
//! by audit replay. The wire shape lives in `codec::audit`.

use crate::model::tensor::{FieldValue, Tensor, TensorId};

/// Audit `action` discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    Create,
    Update,
    Delete,
}

impl AuditAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "create" => Some(Self::Create),
            "update" => Some(Self::Update),
            "delete" => Some(Self::Delete),
            _ => None,
        }
    }
}

/// Structured description of what one mutation changed.
#[derive(Debug, Clone, PartialEq)]
pub enum AuditEntry {
    /// A record was inserted; carries the full record.
    Create(Tensor),
    /// One mutable field of an existing record was set.
    Update {
        target_id: TensorId,
        value: FieldValue,
    },
    /// A record was removed (only ever the undo of a manual creation).
    Delete { target_id: TensorId },
}

impl AuditEntry {
    pub fn target_id(&self) -> TensorId {
        match self {
            Self::Create(tensor) => tensor.id(),
            Self::Update { target_id, .. } | Self::Delete { target_id } => *target_id,
        }
    }

    pub fn action(&self) -> AuditAction {
        match self {
            Self::Create(_) => AuditAction::Create,
            Self::Update { .. } => AuditAction::Update,
            Self::Delete { .. } => AuditAction::Delete,
        }
    }
}
