use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::GridConfig;

/// Pixel coordinates inside the fridge interior, top-left origin.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Legacy stores write `(0,0)` for "never placed".
    pub fn is_unset_sentinel(&self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }

    pub fn offset_from(&self, other: Position) -> Position {
        Position::new(self.x - other.x, self.y - other.y)
    }
}

/// Column/row index of one grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cell {
    pub col: u32,
    pub row: u32,
}

impl Cell {
    pub const fn new(col: u32, row: u32) -> Self {
        Self { col, row }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum GeometryError {
    #[error("{field} must be a positive finite number, got {value}")]
    InvalidDimension { field: &'static str, value: f64 },

    #[error("grid must have at least one {0}")]
    EmptyGrid(&'static str),

    #[error("padding {padding} leaves no room inside a {extent}px interior")]
    PaddingTooLarge { padding: f64, extent: f64 },

    #[error("cell {axis} {cell:.2}px is smaller than the {item}px item icon")]
    CellSmallerThanItem { axis: &'static str, cell: f64, item: f64 },
}

/// Grid derived from the fridge interior constants.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridGeometry {
    pub interior_width: f64,
    pub interior_height: f64,
    pub padding: f64,
    pub columns: u32,
    pub rows: u32,
    pub item_width: f64,
    pub item_height: f64,
    pub cell_width: f64,
    pub cell_height: f64,
}

impl GridGeometry {
    pub fn new(config: &GridConfig) -> Result<Self, GeometryError> {
        Self::validate(config)?;
        Ok(Self::derive(config))
    }

    fn derive(config: &GridConfig) -> Self {
        let cell_width = (config.interior_width - 2.0 * config.padding) / config.columns as f64;
        let cell_height = (config.interior_height - 2.0 * config.padding) / config.rows as f64;

        Self {
            interior_width: config.interior_width,
            interior_height: config.interior_height,
            padding: config.padding,
            columns: config.columns,
            rows: config.rows,
            item_width: config.item_width,
            item_height: config.item_height,
            cell_width,
            cell_height,
        }
    }

    fn validate(config: &GridConfig) -> Result<(), GeometryError> {
        let positive = [
            ("interior_width", config.interior_width),
            ("interior_height", config.interior_height),
            ("item_width", config.item_width),
            ("item_height", config.item_height),
        ];
        for (field, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(GeometryError::InvalidDimension { field, value });
            }
        }
        if !config.padding.is_finite() || config.padding < 0.0 {
            return Err(GeometryError::InvalidDimension { field: "padding", value: config.padding });
        }

        if config.columns == 0 {
            return Err(GeometryError::EmptyGrid("column"));
        }
        if config.rows == 0 {
            return Err(GeometryError::EmptyGrid("row"));
        }

        for extent in [config.interior_width, config.interior_height] {
            if 2.0 * config.padding >= extent {
                return Err(GeometryError::PaddingTooLarge { padding: config.padding, extent });
            }
        }

        let derived = Self::derive(config);
        if derived.cell_width < config.item_width {
            return Err(GeometryError::CellSmallerThanItem {
                axis: "width",
                cell: derived.cell_width,
                item: config.item_width,
            });
        }
        if derived.cell_height < config.item_height {
            return Err(GeometryError::CellSmallerThanItem {
                axis: "height",
                cell: derived.cell_height,
                item: config.item_height,
            });
        }

        Ok(())
    }

    pub fn cell_count(&self) -> usize {
        self.columns as usize * self.rows as usize
    }

    /// Cell-centered icon position for `cell`, rounded to whole pixels.
    /// Indices past the last column/row are clamped.
    pub fn anchor(&self, cell: Cell) -> Position {
        let col = cell.col.min(self.columns - 1) as f64;
        let row = cell.row.min(self.rows - 1) as f64;

        Position::new(
            (self.padding + col * self.cell_width + (self.cell_width - self.item_width) / 2.0).round(),
            (self.padding + row * self.cell_height + (self.cell_height - self.item_height) / 2.0).round(),
        )
    }

    /// All cells in row-major order: row outer, column inner, both ascending.
    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        (0..self.rows).flat_map(move |row| (0..self.columns).map(move |col| Cell::new(col, row)))
    }

    /// Keep a free-moving icon fully inside the interior.
    pub fn clamp_to_container(&self, position: Position) -> Position {
        let max_x = (self.interior_width - self.item_width).max(0.0);
        let max_y = (self.interior_height - self.item_height).max(0.0);

        Position::new(
            sanitize_coordinate(position.x).clamp(0.0, max_x),
            sanitize_coordinate(position.y).clamp(0.0, max_y),
        )
    }
}

impl Default for GridGeometry {
    fn default() -> Self {
        Self::derive(&GridConfig::default())
    }
}

pub(crate) fn sanitize_coordinate(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else if value == f64::INFINITY {
        f64::MAX
    } else if value == f64::NEG_INFINITY {
        f64::MIN
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_derives_cell_size() {
        let geometry = GridGeometry::default();
        assert!((geometry.cell_width - 660.0 / 7.0).abs() < 1e-9);
        assert_eq!(geometry.cell_height, 110.0);
        assert_eq!(geometry.cell_count(), 28);
        assert_eq!(GridGeometry::new(&GridConfig::default()).unwrap(), geometry);
    }

    #[test]
    fn anchor_centers_icon_in_cell() {
        let geometry = GridGeometry::default();
        // 20 + (94.2857 - 64) / 2 = 35.14 -> 35; 20 + (110 - 64) / 2 = 43
        assert_eq!(geometry.anchor(Cell::new(0, 0)), Position::new(35.0, 43.0));
        // 20 + 6 * 94.2857 + 15.14 = 600.86 -> 601; 20 + 3 * 110 + 23 = 373
        assert_eq!(geometry.anchor(Cell::new(6, 3)), Position::new(601.0, 373.0));
        assert_eq!(geometry.anchor(Cell::new(40, 9)), geometry.anchor(Cell::new(6, 3)));
    }

    #[test]
    fn cells_are_row_major() {
        let geometry = GridGeometry::default();
        let cells: Vec<Cell> = geometry.cells().take(9).collect();
        assert_eq!(cells[0], Cell::new(0, 0));
        assert_eq!(cells[6], Cell::new(6, 0));
        assert_eq!(cells[7], Cell::new(0, 1));
        assert_eq!(cells[8], Cell::new(1, 1));
        assert_eq!(geometry.cells().count(), 28);
    }

    #[test]
    fn rejects_cells_smaller_than_icon() {
        let config = GridConfig { columns: 12, ..GridConfig::default() };
        assert!(matches!(
            GridGeometry::new(&config),
            Err(GeometryError::CellSmallerThanItem { axis: "width", .. })
        ));
    }

    #[test]
    fn rejects_degenerate_tables() {
        let no_rows = GridConfig { rows: 0, ..GridConfig::default() };
        assert_eq!(GridGeometry::new(&no_rows), Err(GeometryError::EmptyGrid("row")));

        let fat_padding = GridConfig { padding: 240.0, ..GridConfig::default() };
        assert!(matches!(GridGeometry::new(&fat_padding), Err(GeometryError::PaddingTooLarge { .. })));

        let nan_width = GridConfig { interior_width: f64::NAN, ..GridConfig::default() };
        assert!(matches!(
            GridGeometry::new(&nan_width),
            Err(GeometryError::InvalidDimension { field: "interior_width", .. })
        ));
    }

    #[test]
    fn clamp_keeps_icon_inside() {
        let geometry = GridGeometry::default();
        assert_eq!(geometry.clamp_to_container(Position::new(-50.0, 900.0)), Position::new(0.0, 416.0));
        assert_eq!(geometry.clamp_to_container(Position::new(100.5, 200.0)), Position::new(100.5, 200.0));
        assert_eq!(geometry.clamp_to_container(Position::new(f64::NAN, f64::INFINITY)), Position::new(0.0, 416.0));
    }
}
