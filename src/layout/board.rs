use serde::Serialize;
use thiserror::Error;

use crate::inventory::Item;
use crate::persist::PositionWriter;
use crate::store::{ItemSource, StoreError};

use super::drag::{DragController, DragError, DragSession, DragState, Dropped};
use super::geometry::{GridGeometry, Position};
use super::slot::{find_empty_slot, Slot};

#[derive(Debug, Error)]
pub enum BoardError {
    #[error("item {0} is not on this board")]
    UnknownItem(String),

    #[error("item {0} has no position yet")]
    Unplaced(String),

    #[error(transparent)]
    Drag(#[from] DragError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// An item that was given a position because it had none.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AutoPlaced {
    pub item_id: String,
    pub slot: Slot,
}

/// In-memory view of one fridge: its items, the grid and the drag controller.
///
/// Position changes are applied here first and then queued on the
/// [`PositionWriter`]; a write that ultimately fails leaves this view ahead
/// of the store until the next load.
pub struct FridgeBoard {
    fridge_id: String,
    items: Vec<Item>,
    drag: DragController,
    writer: PositionWriter,
}

impl FridgeBoard {
    /// Build a board from already-fetched items and place any that have no position.
    ///
    /// Positions the writer has not finished saving win over the listed ones,
    /// so a move still in flight keeps its cell.
    pub fn new(
        fridge_id: impl Into<String>,
        mut items: Vec<Item>,
        geometry: GridGeometry,
        writer: PositionWriter,
    ) -> (Self, Vec<AutoPlaced>) {
        for item in &mut items {
            if let Some(position) = writer.pending_position(&item.id) {
                item.position = Some(position);
            }
        }

        let mut board = Self {
            fridge_id: fridge_id.into(),
            items,
            drag: DragController::new(geometry),
            writer,
        };
        let placed = board.arrange_unplaced();
        (board, placed)
    }

    pub async fn load(
        source: &dyn ItemSource,
        fridge_id: &str,
        geometry: GridGeometry,
        writer: PositionWriter,
    ) -> Result<(Self, Vec<AutoPlaced>), BoardError> {
        let items = source.list_items(fridge_id).await?;
        let (board, placed) = Self::new(fridge_id, items, geometry, writer);

        tracing::info!(
            "loaded fridge {}: {} items, {} auto-placed",
            board.fridge_id,
            board.items.len(),
            placed.len()
        );
        Ok((board, placed))
    }

    pub fn fridge_id(&self) -> &str {
        &self.fridge_id
    }

    pub fn geometry(&self) -> &GridGeometry {
        self.drag.geometry()
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn item(&self, item_id: &str) -> Option<&Item> {
        self.items.iter().find(|item| item.id == item_id)
    }

    pub fn drag_state(&self) -> &DragState {
        self.drag.state()
    }

    pub fn occupied_positions(&self) -> Vec<Position> {
        self.items.iter().filter_map(|item| item.position).collect()
    }

    /// Where a newly created item would go.
    pub fn place_new_item(&self) -> Slot {
        find_empty_slot(self.geometry(), &self.occupied_positions())
    }

    /// Add an item to the board, placing it first if it has no position.
    pub fn add_item(&mut self, mut item: Item) -> Option<AutoPlaced> {
        let placed = if item.position.is_none() {
            let slot = self.place_new_item();
            item.position = Some(slot.position);
            self.writer.enqueue(item.id.clone(), slot.position);
            Some(AutoPlaced {
                item_id: item.id.clone(),
                slot,
            })
        } else {
            None
        };

        self.items.push(item);
        placed
    }

    /// Give every unplaced item the first empty cell, in list order. Each
    /// placement sees the ones before it.
    fn arrange_unplaced(&mut self) -> Vec<AutoPlaced> {
        let mut occupied = self.occupied_positions();
        let mut placed = Vec::new();

        for index in 0..self.items.len() {
            if self.items[index].position.is_some() {
                continue;
            }

            let slot = find_empty_slot(self.drag.geometry(), &occupied);
            let item = &mut self.items[index];
            item.position = Some(slot.position);
            occupied.push(slot.position);

            self.writer.enqueue(item.id.clone(), slot.position);
            placed.push(AutoPlaced {
                item_id: item.id.clone(),
                slot,
            });
        }

        placed
    }

    pub fn pointer_down(&mut self, item_id: &str, pointer: Position) -> Result<DragSession, BoardError> {
        let item = self
            .item(item_id)
            .ok_or_else(|| BoardError::UnknownItem(item_id.to_string()))?;
        let position = item
            .position
            .ok_or_else(|| BoardError::Unplaced(item_id.to_string()))?;

        Ok(self.drag.pointer_down(item_id, position, pointer)?)
    }

    pub fn pointer_move(&mut self, pointer: Position) -> Result<Position, BoardError> {
        Ok(self.drag.pointer_move(pointer)?)
    }

    /// Snap the dragged item, update it in place, queue the write and return to idle.
    pub fn pointer_up(&mut self) -> Result<Dropped, BoardError> {
        let dropped = self.drag.pointer_up()?;

        if let Some(item) = self.items.iter_mut().find(|item| item.id == dropped.item_id) {
            item.position = Some(dropped.position);
        }
        self.writer.enqueue(dropped.item_id.clone(), dropped.position);

        Ok(self.drag.persist_dispatched()?)
    }

    /// Pointer-down, one move, pointer-up: the whole drag of `item_id` so that
    /// its top-left corner follows the pointer to `target`.
    pub fn drag_to(&mut self, item_id: &str, target: Position) -> Result<Dropped, BoardError> {
        let item = self
            .item(item_id)
            .ok_or_else(|| BoardError::UnknownItem(item_id.to_string()))?;
        let origin = item
            .position
            .ok_or_else(|| BoardError::Unplaced(item_id.to_string()))?;

        self.pointer_down(item_id, origin)?;
        self.pointer_move(target)?;
        self.pointer_up()
    }
}
