//! Spatial grid placement: geometry, snapping, empty-slot search and the
//! drag session that ties them to a fridge's items.

pub mod board;
pub mod drag;
pub mod geometry;
pub mod slot;
pub mod snap;

pub use board::{AutoPlaced, BoardError, FridgeBoard};
pub use drag::{DragController, DragError, DragSession, DragState, Dropped};
pub use geometry::{Cell, GeometryError, GridGeometry, Position};
pub use slot::{find_empty_slot, is_occupied, occupies, Slot};
pub use snap::{nearest_cell, snap, snap_position, Snapped};
