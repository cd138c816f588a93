//! Tensor domain model.
//!
//! # Responsibility
//! - Define the annotation record pairing a cell centroid with a marker.
//! - Provide the single-field update primitive used by store mutations.
//!
//! # Invariants
//! - `id` is stable for the record lifetime and unique among live records of
//!   one store; an id freed by undoing an `add` may be handed out again.
//! - `creation_type` is fixed at construction; no setter exists.
//! - Mutable fields change only through `Tensor::update`, which is crate-private
//!   so every change flows through a store mutation and yields an audit entry.

use crate::model::entry::AuditEntry;
use serde::{Deserialize, Serialize};

/// Identifier of one tensor inside a store.
pub type TensorId = u64;

/// Identifier of the segmented cell region a tensor belongs to.
///
/// Informational only: the store never resolves it.
pub type CellId = u64;

/// 2D image position as `(row, col)`.
///
/// Serialized as a two-element JSON array `[row, col]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Point {
    pub row: f64,
    pub col: f64,
}

impl Point {
    pub const fn new(row: f64, col: f64) -> Self {
        Self { row, col }
    }
}

impl From<[f64; 2]> for Point {
    fn from(value: [f64; 2]) -> Self {
        Self::new(value[0], value[1])
    }
}

impl From<Point> for [f64; 2] {
    fn from(value: Point) -> Self {
        [value.row, value.col]
    }
}

impl From<(f64, f64)> for Point {
    fn from(value: (f64, f64)) -> Self {
        Self::new(value.0, value.1)
    }
}

/// How a tensor came into existence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreationType {
    /// Derived from segmentation output; part of the baseline snapshot.
    Automated,
    /// Added by a reviewer; exists only in the audit log.
    Manual,
}

impl CreationType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Automated => "automated",
            Self::Manual => "manual",
        }
    }
}

/// Names of the mutable tensor fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TensorField {
    CellId,
    Centroid,
    Marker,
    Active,
}

impl TensorField {
    /// Wire name used by the audit log `field` key.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CellId => "cell_id",
            Self::Centroid => "centroid",
            Self::Marker => "marker",
            Self::Active => "active",
        }
    }

    /// Parses a wire name. Returns `None` for immutable or unknown fields.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "cell_id" => Some(Self::CellId),
            "centroid" => Some(Self::Centroid),
            "marker" => Some(Self::Marker),
            "active" => Some(Self::Active),
            _ => None,
        }
    }
}

/// New value for exactly one mutable field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    CellId(CellId),
    Centroid(Point),
    Marker(Point),
    Active(bool),
}

impl FieldValue {
    pub fn field(&self) -> TensorField {
        match self {
            Self::CellId(_) => TensorField::CellId,
            Self::Centroid(_) => TensorField::Centroid,
            Self::Marker(_) => TensorField::Marker,
            Self::Active(_) => TensorField::Active,
        }
    }
}

/// One centroid-to-marker annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tensor {
    id: TensorId,
    cell_id: CellId,
    centroid: Point,
    marker: Point,
    creation_type: CreationType,
    #[serde(default = "default_active")]
    active: bool,
}

fn default_active() -> bool {
    true
}

impl Tensor {
    /// Creates an active tensor.
    pub fn new(
        id: TensorId,
        cell_id: CellId,
        centroid: Point,
        marker: Point,
        creation_type: CreationType,
    ) -> Self {
        Self {
            id,
            cell_id,
            centroid,
            marker,
            creation_type,
            active: true,
        }
    }

    pub fn id(&self) -> TensorId {
        self.id
    }

    pub fn cell_id(&self) -> CellId {
        self.cell_id
    }

    pub fn centroid(&self) -> Point {
        self.centroid
    }

    pub fn marker(&self) -> Point {
        self.marker
    }

    pub fn creation_type(&self) -> CreationType {
        self.creation_type
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Returns the current value of `field`.
    ///
    /// Used to capture the prior value when building an inverse mutation.
    pub fn get(&self, field: TensorField) -> FieldValue {
        match field {
            TensorField::CellId => FieldValue::CellId(self.cell_id),
            TensorField::Centroid => FieldValue::Centroid(self.centroid),
            TensorField::Marker => FieldValue::Marker(self.marker),
            TensorField::Active => FieldValue::Active(self.active),
        }
    }

    /// Sets exactly one field and describes the change.
    ///
    /// Never rejects a value: range checks against image bounds belong to the
    /// caller that produced the position.
    pub(crate) fn update(&mut self, value: FieldValue) -> AuditEntry {
        match value {
            FieldValue::CellId(cell_id) => self.cell_id = cell_id,
            FieldValue::Centroid(point) => self.centroid = point,
            FieldValue::Marker(point) => self.marker = point,
            FieldValue::Active(active) => self.active = active,
        }
        AuditEntry::Update {
            target_id: self.id,
            value,
        }
    }
}
