//! Reversible store mutations.
//!
//! A `Command` pairs a forward `Mutation` with the inverse the store computed
//! when the command was issued. The command itself knows nothing about what
//! undoing means; it only applies the mutation it was handed.

use crate::model::entry::AuditEntry;
use crate::model::tensor::{FieldValue, Tensor, TensorId};
use crate::store::{StoreError, StoreResult};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

pub(crate) type TensorMap = BTreeMap<TensorId, Tensor>;

/// Closed set of record-level state changes.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    /// Insert a record. Fails with `DuplicateId` when the id is taken.
    CreateRecord(Tensor),
    /// Remove a record. Fails with `NotFound` when absent.
    DeleteRecord(TensorId),
    /// Set one mutable field. Fails with `NotFound` when absent.
    SetField { id: TensorId, value: FieldValue },
}

impl Mutation {
    /// Applies this mutation and describes what changed.
    ///
    /// This is the only code path that inserts, removes or edits records.
    pub(crate) fn apply(&self, records: &mut TensorMap) -> StoreResult<AuditEntry> {
        match self {
            Self::CreateRecord(tensor) => match records.entry(tensor.id()) {
                Entry::Occupied(_) => Err(StoreError::DuplicateId(tensor.id())),
                Entry::Vacant(slot) => {
                    slot.insert(tensor.clone());
                    Ok(AuditEntry::Create(tensor.clone()))
                }
            },
            Self::DeleteRecord(id) => records
                .remove(id)
                .map(|_| AuditEntry::Delete { target_id: *id })
                .ok_or(StoreError::NotFound(*id)),
            Self::SetField { id, value } => records
                .get_mut(id)
                .map(|tensor| tensor.update(*value))
                .ok_or(StoreError::NotFound(*id)),
        }
    }
}

impl From<&AuditEntry> for Mutation {
    fn from(entry: &AuditEntry) -> Self {
        match entry {
            AuditEntry::Create(tensor) => Self::CreateRecord(tensor.clone()),
            AuditEntry::Update { target_id, value } => Self::SetField {
                id: *target_id,
                value: *value,
            },
            AuditEntry::Delete { target_id } => Self::DeleteRecord(*target_id),
        }
    }
}

/// One issued edit with its inverse, captured at issue time.
#[derive(Debug, Clone)]
pub struct Command {
    forward: Mutation,
    inverse: Mutation,
    entry: Option<AuditEntry>,
}

impl Command {
    pub fn new(forward: Mutation, inverse: Mutation) -> Self {
        Self {
            forward,
            inverse,
            entry: None,
        }
    }

    pub fn forward(&self) -> &Mutation {
        &self.forward
    }

    pub fn inverse(&self) -> &Mutation {
        &self.inverse
    }

    /// Entry captured by the most recent `execute`, if any.
    pub fn entry(&self) -> Option<&AuditEntry> {
        self.entry.as_ref()
    }

    /// Applies the forward mutation and records its entry.
    ///
    /// Not idempotent: executing twice applies twice. The store executes each
    /// command once per issue or redo.
    pub(crate) fn execute(&mut self, records: &mut TensorMap) -> StoreResult<&AuditEntry> {
        let entry = self.forward.apply(records)?;
        Ok(&*self.entry.insert(entry))
    }

    /// Applies the inverse mutation and returns the entry it produced.
    pub(crate) fn undo(&self, records: &mut TensorMap) -> StoreResult<AuditEntry> {
        self.inverse.apply(records)
    }
}

#[cfg(test)]
mod tests {
    use super::{Command, Mutation, TensorMap};
    use crate::model::entry::AuditEntry;
    use crate::model::tensor::{CreationType, FieldValue, Point, Tensor};
    use crate::store::StoreError;

    fn manual(id: u64) -> Tensor {
        Tensor::new(
            id,
            2,
            Point::new(3.0, 4.0),
            Point::new(5.0, 6.0),
            CreationType::Manual,
        )
    }

    #[test]
    fn create_command_undoes_by_delete() {
        let mut records = TensorMap::new();
        let mut command = Command::new(
            Mutation::CreateRecord(manual(6)),
            Mutation::DeleteRecord(6),
        );

        let entry = command.execute(&mut records).unwrap().clone();
        assert_eq!(entry, AuditEntry::Create(manual(6)));
        assert_eq!(command.entry(), Some(&entry));
        assert!(records.contains_key(&6));

        let inverse = command.undo(&mut records).unwrap();
        assert_eq!(inverse, AuditEntry::Delete { target_id: 6 });
        assert!(records.is_empty());
    }

    #[test]
    fn create_rejects_taken_id_without_touching_records() {
        let mut records = TensorMap::new();
        records.insert(6, manual(6));

        let err = Mutation::CreateRecord(manual(6))
            .apply(&mut records)
            .unwrap_err();
        assert_eq!(err, StoreError::DuplicateId(6));
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn set_field_on_missing_record_is_not_found() {
        let mut records = TensorMap::new();
        let err = Mutation::SetField {
            id: 9,
            value: FieldValue::Active(false),
        }
        .apply(&mut records)
        .unwrap_err();
        assert_eq!(err, StoreError::NotFound(9));
    }

    #[test]
    fn entries_convert_back_into_equivalent_mutations() {
        let entry = AuditEntry::Update {
            target_id: 3,
            value: FieldValue::Marker(Point::new(1.0, 2.0)),
        };
        assert_eq!(
            Mutation::from(&entry),
            Mutation::SetField {
                id: 3,
                value: FieldValue::Marker(Point::new(1.0, 2.0)),
            }
        );
        assert_eq!(
            Mutation::from(&AuditEntry::Delete { target_id: 4 }),
            Mutation::DeleteRecord(4)
        );
    }
}
