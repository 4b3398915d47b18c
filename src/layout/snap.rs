use serde::Serialize;

use super::geometry::{sanitize_coordinate, Cell, GridGeometry, Position};

/// A pointer position resolved to its grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Snapped {
    pub cell: Cell,
    pub position: Position,
}

/// Nearest cell to a raw pointer position, clamped to the grid. Never fails.
pub fn nearest_cell(geometry: &GridGeometry, point: Position) -> Cell {
    let x = sanitize_coordinate(point.x);
    let y = sanitize_coordinate(point.y);

    let col = ((x - geometry.padding) / geometry.cell_width).round();
    let row = ((y - geometry.padding) / geometry.cell_height).round();

    Cell::new(
        col.clamp(0.0, (geometry.columns - 1) as f64) as u32,
        row.clamp(0.0, (geometry.rows - 1) as f64) as u32,
    )
}

/// Snap `point` to the centered icon position of its nearest cell.
pub fn snap(geometry: &GridGeometry, point: Position) -> Snapped {
    let cell = nearest_cell(geometry, point);
    Snapped {
        cell,
        position: geometry.anchor(cell),
    }
}

pub fn snap_position(geometry: &GridGeometry, point: Position) -> Position {
    snap(geometry, point).position
}
