//! Drag session state machine.
//!
//! `Idle -> Dragging -> Persisting -> Idle`. The controller is an owned value
//! handed to pointer handlers by `&mut`, so only one session can be open at a
//! time: a pointer-down while another item is dragging (or its drop has not
//! yet been handed to the position writer) is rejected, not queued. There is
//! no cancel path; a drag ends only on pointer release.

use serde::Serialize;
use thiserror::Error;

use super::geometry::{Cell, GridGeometry, Position};
use super::snap::snap;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DragError {
    #[error("item {active} is already being dragged")]
    SessionActive { active: String },

    #[error("drop of item {0} has not been handed off yet")]
    PersistPending(String),

    #[error("no drag in progress")]
    NotDragging,

    #[error("no drop is waiting to be persisted")]
    NothingToPersist,
}

/// Interaction state of an open drag.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DragSession {
    pub item_id: String,
    /// Stored position of the item when the pointer went down.
    pub origin: Position,
    /// Pointer position relative to the item's top-left corner.
    pub offset: Position,
    /// Free (unsnapped) position that tracks the pointer.
    pub live: Position,
}

/// A finished drag: the item and the cell it snapped into.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dropped {
    pub item_id: String,
    pub from: Position,
    pub cell: Cell,
    pub position: Position,
}

impl Dropped {
    pub fn moved(&self) -> bool {
        self.from != self.position
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum DragState {
    Idle,
    Dragging(DragSession),
    Persisting(Dropped),
}

#[derive(Debug, Clone)]
pub struct DragController {
    geometry: GridGeometry,
    state: DragState,
}

impl DragController {
    pub fn new(geometry: GridGeometry) -> Self {
        Self {
            geometry,
            state: DragState::Idle,
        }
    }

    pub fn geometry(&self) -> &GridGeometry {
        &self.geometry
    }

    pub fn state(&self) -> &DragState {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, DragState::Idle)
    }

    pub fn active_item(&self) -> Option<&str> {
        match &self.state {
            DragState::Idle => None,
            DragState::Dragging(session) => Some(&session.item_id),
            DragState::Persisting(dropped) => Some(&dropped.item_id),
        }
    }

    /// Idle -> Dragging. Captures the pointer offset from the item's stored position.
    pub fn pointer_down(
        &mut self,
        item_id: impl Into<String>,
        item_position: Position,
        pointer: Position,
    ) -> Result<DragSession, DragError> {
        match &self.state {
            DragState::Idle => {}
            DragState::Dragging(session) => {
                return Err(DragError::SessionActive {
                    active: session.item_id.clone(),
                })
            }
            DragState::Persisting(dropped) => {
                return Err(DragError::PersistPending(dropped.item_id.clone()))
            }
        }

        let session = DragSession {
            item_id: item_id.into(),
            origin: item_position,
            offset: pointer.offset_from(item_position),
            live: item_position,
        };
        tracing::trace!("drag start: item={} offset={:?}", session.item_id, session.offset);

        self.state = DragState::Dragging(session.clone());
        Ok(session)
    }

    /// Track the pointer. The live position is clamped to the interior but not snapped.
    pub fn pointer_move(&mut self, pointer: Position) -> Result<Position, DragError> {
        let DragState::Dragging(session) = &mut self.state else {
            return Err(DragError::NotDragging);
        };

        session.live = self.geometry.clamp_to_container(pointer.offset_from(session.offset));
        Ok(session.live)
    }

    /// Dragging -> Persisting. Snaps the live position to the nearest cell.
    pub fn pointer_up(&mut self) -> Result<Dropped, DragError> {
        let DragState::Dragging(session) = &self.state else {
            return Err(DragError::NotDragging);
        };

        let snapped = snap(&self.geometry, session.live);
        let dropped = Dropped {
            item_id: session.item_id.clone(),
            from: session.origin,
            cell: snapped.cell,
            position: snapped.position,
        };
        tracing::debug!(
            "drag end: item={} cell=({}, {}) position=({}, {})",
            dropped.item_id,
            dropped.cell.col,
            dropped.cell.row,
            dropped.position.x,
            dropped.position.y
        );

        self.state = DragState::Persisting(dropped.clone());
        Ok(dropped)
    }

    /// Persisting -> Idle, once the drop has been handed to the position writer.
    pub fn persist_dispatched(&mut self) -> Result<Dropped, DragError> {
        match std::mem::replace(&mut self.state, DragState::Idle) {
            DragState::Persisting(dropped) => Ok(dropped),
            other => {
                self.state = other;
                Err(DragError::NothingToPersist)
            }
        }
    }
}
