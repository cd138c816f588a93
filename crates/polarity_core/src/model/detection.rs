//! Segmentation hand-over type.

use crate::model::tensor::{CellId, Point};

/// One marker-to-cell pairing found by segmentation.
///
/// The segmentation pipeline resolves which cell region a marker sits in and
/// the region centroid; the store turns each detection into an automated
/// tensor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub cell_id: CellId,
    pub centroid: Point,
    pub marker: Point,
}

impl Detection {
    pub fn new(cell_id: CellId, centroid: impl Into<Point>, marker: impl Into<Point>) -> Self {
        Self {
            cell_id,
            centroid: centroid.into(),
            marker: marker.into(),
        }
    }
}
