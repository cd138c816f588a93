//! Tensor store and its undo/redo history.
//!
//! # Responsibility
//! - Keep the id-keyed record set for one review.
//! - Issue manual edits as commands and move a cursor over their history.
//!
//! # Invariants
//! - `cursor <= 0` and `cursor.unsigned_abs() <= history.len()`.
//! - The first `history.len() - |cursor|` commands are applied, the rest undone.
//! - Issuing a command while `cursor != 0` discards the undone tail first.

use crate::model::detection::Detection;
use crate::model::entry::AuditEntry;
use crate::model::tensor::{CellId, CreationType, FieldValue, Point, Tensor, TensorId};
use crate::store::command::{Command, Mutation, TensorMap};
use crate::store::{StoreError, StoreResult};
use log::{debug, warn};
use std::collections::BTreeSet;

/// Result of a successful `undo` or `redo`.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryStep {
    /// Cursor after the step; `0` means every command is applied.
    pub cursor: isize,
    /// Entry the step produced: the inverse entry for undo, the re-derived
    /// forward entry for redo.
    pub entry: AuditEntry,
}

/// Id-keyed tensor collection with linear command history.
#[derive(Debug, Default, Clone)]
pub struct TensorStore {
    records: TensorMap,
    history: Vec<Command>,
    cursor: isize,
}

impl TensorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a baseline store from segmentation output.
    ///
    /// Ids are assigned `1..=n` in input order. Nothing is pushed to history.
    pub fn from_detections<I>(detections: I) -> Self
    where
        I: IntoIterator<Item = Detection>,
    {
        let records = detections
            .into_iter()
            .zip(1..)
            .map(|(detection, id)| {
                let tensor = Tensor::new(
                    id,
                    detection.cell_id,
                    detection.centroid,
                    detection.marker,
                    CreationType::Automated,
                );
                (id, tensor)
            })
            .collect::<TensorMap>();
        debug!(
            "event=store_bootstrap module=store status=ok tensors={}",
            records.len()
        );
        Self {
            records,
            ..Self::default()
        }
    }

    /// Inserts a record with an explicit id, outside of history.
    ///
    /// Intended for bulk baseline construction only.
    ///
    /// # Errors
    /// - `DuplicateId` when `id` is already present.
    pub fn create(
        &mut self,
        id: TensorId,
        cell_id: CellId,
        centroid: Point,
        marker: Point,
        creation_type: CreationType,
    ) -> StoreResult<()> {
        let tensor = Tensor::new(id, cell_id, centroid, marker, creation_type);
        Mutation::CreateRecord(tensor).apply(&mut self.records)?;
        Ok(())
    }

    /// Adds a manual tensor as an undoable command and returns its id.
    ///
    /// The id is one past the largest live id, or `1` for an empty store.
    pub fn add(
        &mut self,
        cell_id: CellId,
        centroid: Point,
        marker: Point,
    ) -> StoreResult<TensorId> {
        let id = self.next_id();
        let tensor = Tensor::new(id, cell_id, centroid, marker, CreationType::Manual);
        self.run_command(Command::new(
            Mutation::CreateRecord(tensor),
            Mutation::DeleteRecord(id),
        ))?;
        Ok(id)
    }

    /// Marks a tensor inactive.
    ///
    /// # Errors
    /// - `NotFound` when `id` is absent.
    pub fn deactivate(&mut self, id: TensorId) -> StoreResult<()> {
        self.set_field(id, FieldValue::Active(false))
    }

    /// Moves the centroid of a tensor.
    ///
    /// # Errors
    /// - `NotFound` when `id` is absent.
    pub fn update_centroid(&mut self, id: TensorId, position: Point) -> StoreResult<()> {
        self.set_field(id, FieldValue::Centroid(position))
    }

    /// Moves the marker of a tensor.
    ///
    /// # Errors
    /// - `NotFound` when `id` is absent.
    pub fn update_marker(&mut self, id: TensorId, position: Point) -> StoreResult<()> {
        self.set_field(id, FieldValue::Marker(position))
    }

    /// Reverts the most recently applied command.
    ///
    /// Returns `Ok(None)` when there is nothing left to undo.
    pub fn undo(&mut self) -> StoreResult<Option<HistoryStep>> {
        let Some(index) = self.applied_len().checked_sub(1) else {
            return Ok(None);
        };
        let entry = self.history[index].undo(&mut self.records)?;
        self.cursor -= 1;
        debug!(
            "event=store_undo module=store status=ok action={} target_id={} cursor={}",
            entry.action().as_str(),
            entry.target_id(),
            self.cursor
        );
        Ok(Some(HistoryStep {
            cursor: self.cursor,
            entry,
        }))
    }

    /// Re-executes the oldest undone command.
    ///
    /// Returns `Ok(None)` when the cursor is already at the head.
    pub fn redo(&mut self) -> StoreResult<Option<HistoryStep>> {
        if self.cursor == 0 {
            return Ok(None);
        }
        let index = self.applied_len();
        let entry = self.history[index].execute(&mut self.records)?.clone();
        self.cursor += 1;
        debug!(
            "event=store_redo module=store status=ok action={} target_id={} cursor={}",
            entry.action().as_str(),
            entry.target_id(),
            self.cursor
        );
        Ok(Some(HistoryStep {
            cursor: self.cursor,
            entry,
        }))
    }

    pub fn get(&self, id: TensorId) -> Option<&Tensor> {
        self.records.get(&id)
    }

    pub fn contains(&self, id: TensorId) -> bool {
        self.records.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Sorted ids of every live tensor.
    pub fn identifiers(&self) -> Vec<TensorId> {
        self.records.keys().copied().collect()
    }

    /// Live tensors in id order.
    pub fn tensors(&self) -> impl Iterator<Item = &Tensor> {
        self.records.values()
    }

    /// Sorted, deduplicated cell ids referenced by live tensors.
    pub fn cell_identifiers(&self) -> Vec<CellId> {
        self.records
            .values()
            .map(Tensor::cell_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Tensors attached to one cell, in id order.
    pub fn cell_tensors(&self, cell_id: CellId) -> Vec<&Tensor> {
        self.records
            .values()
            .filter(|tensor| tensor.cell_id() == cell_id)
            .collect()
    }

    /// Current history cursor (`0` at head, `-n` after n undos).
    pub fn cursor(&self) -> isize {
        self.cursor
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn can_undo(&self) -> bool {
        self.applied_len() > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor != 0
    }

    /// Entries of applied commands, in execution order.
    ///
    /// Undone commands beyond the cursor are excluded.
    pub fn applied_entries(&self) -> impl Iterator<Item = &AuditEntry> {
        self.history[..self.applied_len()]
            .iter()
            .filter_map(Command::entry)
    }

    /// Entry of the most recently applied command, if any.
    pub fn last_entry(&self) -> Option<&AuditEntry> {
        self.applied_len()
            .checked_sub(1)
            .and_then(|index| self.history[index].entry())
    }

    /// Applies a logged entry directly to the records, bypassing history.
    pub(crate) fn apply_entry(&mut self, entry: &AuditEntry) -> StoreResult<()> {
        Mutation::from(entry).apply(&mut self.records)?;
        Ok(())
    }

    fn set_field(&mut self, id: TensorId, value: FieldValue) -> StoreResult<()> {
        let previous = self.require(id)?.get(value.field());
        self.run_command(Command::new(
            Mutation::SetField { id, value },
            Mutation::SetField {
                id,
                value: previous,
            },
        ))
    }

    fn run_command(&mut self, mut command: Command) -> StoreResult<()> {
        let entry = command.execute(&mut self.records)?;
        debug!(
            "event=store_command module=store status=ok action={} target_id={}",
            entry.action().as_str(),
            entry.target_id()
        );

        if self.cursor != 0 {
            let applied = self.applied_len();
            self.history.truncate(applied);
            self.cursor = 0;
        }
        self.history.push(command);
        Ok(())
    }

    fn require(&self, id: TensorId) -> StoreResult<&Tensor> {
        self.records.get(&id).ok_or_else(|| {
            warn!("event=store_command module=store status=error error_code=not_found target_id={id}");
            StoreError::NotFound(id)
        })
    }

    fn next_id(&self) -> TensorId {
        self.records.keys().next_back().map_or(1, |max| max + 1)
    }

    fn applied_len(&self) -> usize {
        self.history.len() - self.cursor.unsigned_abs()
    }
}

/// Stores are equal when their record sets are equal; history is ignored.
impl PartialEq for TensorStore {
    fn eq(&self, other: &Self) -> bool {
        self.records == other.records
    }
}
