//! Collaborators the placement engine talks to: an item listing on the way in
//! and a position update on the way out. The item API behind them (CRUD,
//! auth, uploads) is opaque to this crate.

pub mod http;
pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

use crate::inventory::{ExpiringItems, Item};
use crate::layout::Position;

pub use http::HttpItemStore;
pub use memory::MemoryItemStore;

#[derive(Debug, Error, Clone)]
pub enum StoreError {
    #[error("item {0} not found")]
    NotFound(String),

    #[error("item API rejected credentials: {0}")]
    Unauthorized(String),

    #[error("item API returned {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("item API unreachable: {0}")]
    Transport(String),

    #[error("unexpected item API payload: {0}")]
    Decode(String),
}

impl StoreError {
    /// Whether retrying the same request could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Transport(_) => true,
            StoreError::Rejected { status, .. } => *status >= 500 || *status == 429,
            StoreError::NotFound(_) | StoreError::Unauthorized(_) | StoreError::Decode(_) => false,
        }
    }
}

/// Item listing used to compute occupancy and the initial layout.
#[async_trait]
pub trait ItemSource: Send + Sync {
    async fn list_items(&self, fridge_id: &str) -> Result<Vec<Item>, StoreError>;

    /// Items expiring within `days`, plus those already expired.
    async fn expiring_items(&self, days: i64) -> Result<ExpiringItems, StoreError>;
}

/// Position update for a single item, keyed by its id.
#[async_trait]
pub trait ItemSink: Send + Sync {
    async fn update_position(&self, item_id: &str, position: Position) -> Result<(), StoreError>;
}
