use serde::Serialize;

use super::geometry::{Cell, GridGeometry, Position};

/// Result of an empty-slot search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Slot {
    pub cell: Cell,
    pub position: Position,
    /// Every cell was taken and the first anchor was returned anyway.
    pub fallback: bool,
}

/// Whether an item stored at `stored` sits on `anchor`.
///
/// Each axis is checked independently against one icon size. Positions
/// written off-grid through the item API can slip between two anchors and
/// defeat this test; placement is a convenience, not a guarantee.
pub fn occupies(geometry: &GridGeometry, stored: Position, anchor: Position) -> bool {
    (stored.x - anchor.x).abs() < geometry.item_width
        && (stored.y - anchor.y).abs() < geometry.item_height
}

pub fn is_occupied<'a, I>(geometry: &GridGeometry, anchor: Position, occupied: I) -> bool
where
    I: IntoIterator<Item = &'a Position>,
{
    occupied.into_iter().any(|stored| occupies(geometry, *stored, anchor))
}

/// First cell, in row-major order, whose anchor no stored position occupies.
/// A full grid falls back to the row 0 / column 0 anchor.
pub fn find_empty_slot(geometry: &GridGeometry, occupied: &[Position]) -> Slot {
    for cell in geometry.cells() {
        let anchor = geometry.anchor(cell);
        if !is_occupied(geometry, anchor, occupied) {
            return Slot {
                cell,
                position: anchor,
                fallback: false,
            };
        }
    }

    tracing::debug!(
        "grid full ({} cells, {} items); falling back to first cell",
        geometry.cell_count(),
        occupied.len()
    );

    let cell = Cell::new(0, 0);
    Slot {
        cell,
        position: geometry.anchor(cell),
        fallback: true,
    }
}
