use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::inventory::Item;
use crate::layout::{find_empty_slot, snap, AutoPlaced, Cell, Dropped, GridGeometry, Position, Slot, Snapped};

use super::response::{ApiResponse, ApiResult};
use super::AppState;

#[derive(Debug, Serialize)]
pub struct CellAnchor {
    pub cell: Cell,
    pub position: Position,
}

#[derive(Debug, Serialize)]
pub struct GridView {
    pub geometry: GridGeometry,
    pub cells: Vec<CellAnchor>,
}

#[derive(Debug, Deserialize)]
pub struct SlotRequest {
    #[serde(default)]
    pub occupied: Vec<Position>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutView {
    pub fridge_id: String,
    pub items: Vec<Item>,
    pub auto_placed: Vec<AutoPlaced>,
}

/// GET /api/layout/grid
pub async fn grid(State(state): State<AppState>) -> ApiResult<GridView> {
    let geometry = state.geometry.clone();
    let cells = geometry
        .cells()
        .map(|cell| CellAnchor {
            cell,
            position: geometry.anchor(cell),
        })
        .collect();

    Ok(ApiResponse::success(GridView { geometry, cells }))
}

/// POST /api/layout/snap
pub async fn snap_point(
    State(state): State<AppState>,
    payload: Result<Json<Position>, JsonRejection>,
) -> ApiResult<Snapped> {
    let Json(point) = payload?;
    Ok(ApiResponse::success(snap(&state.geometry, point)))
}

/// POST /api/layout/slot
pub async fn empty_slot(
    State(state): State<AppState>,
    payload: Result<Json<SlotRequest>, JsonRejection>,
) -> ApiResult<Slot> {
    let Json(request) = payload?;
    Ok(ApiResponse::success(find_empty_slot(&state.geometry, &request.occupied)))
}

/// GET /api/fridges/:fridge_id/layout
pub async fn fridge_layout(State(state): State<AppState>, Path(fridge_id): Path<String>) -> ApiResult<LayoutView> {
    let (board, auto_placed) = state.load_board(&fridge_id).await?;

    Ok(ApiResponse::success(LayoutView {
        fridge_id,
        items: board.items().to_vec(),
        auto_placed,
    }))
}

/// PUT /api/fridges/:fridge_id/items/:item_id/position
///
/// The body is where the item's top-left corner was released. The item is
/// dragged there, snapped, and the write is queued; the store catches up later.
pub async fn move_item(
    State(state): State<AppState>,
    Path((fridge_id, item_id)): Path<(String, String)>,
    payload: Result<Json<Position>, JsonRejection>,
) -> ApiResult<Dropped> {
    let Json(target) = payload?;
    if !target.x.is_finite() || !target.y.is_finite() {
        return Err(ApiError::invalid_field("position", "coordinates must be finite"));
    }

    let (mut board, _) = state.load_board(&fridge_id).await?;
    let dropped = board.drag_to(&item_id, target)?;

    tracing::info!(
        "item {} in fridge {} moved to cell ({}, {})",
        item_id,
        fridge_id,
        dropped.cell.col,
        dropped.cell.row
    );
    Ok(ApiResponse::accepted(dropped))
}
