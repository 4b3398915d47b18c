pub mod commands;
pub mod demo;
pub mod utils;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::config::{self, AppConfig};
use crate::layout::GridGeometry;
use crate::persist::{PositionWriter, RetryPolicy};
use crate::store::{HttpItemStore, ItemSink, ItemSource, MemoryItemStore};

#[derive(Parser)]
#[command(name = "fridge")]
#[command(about = "Fridge CLI - grid placement and layout for the virtual fridge")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[arg(long, global = true, help = "Use an in-memory store seeded with demo items")]
    pub offline: bool,

    #[arg(long, global = true, value_name = "URL", help = "Item API base URL (overrides ITEM_API_URL)")]
    pub api: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Show the grid geometry and every cell anchor")]
    Grid,

    #[command(about = "Snap a free position to the nearest cell", allow_negative_numbers = true)]
    Snap {
        #[arg(help = "X coordinate of the icon's top-left corner")]
        x: f64,
        #[arg(help = "Y coordinate of the icon's top-left corner")]
        y: f64,
    },

    #[command(about = "Find the first empty cell given occupied positions")]
    Slot {
        #[arg(long, value_name = "X,Y", value_parser = commands::placement::parse_point, num_args = 1.., help = "Stored item positions")]
        occupied: Vec<crate::layout::Position>,
    },

    #[command(about = "Load fridge layouts, placing items that have no position")]
    Layout {
        #[arg(required = true, help = "Fridge id(s)")]
        fridge_ids: Vec<String>,
    },

    #[command(about = "Drag an item to a position and wait for the write", allow_negative_numbers = true)]
    Move {
        #[arg(help = "Fridge id")]
        fridge_id: String,
        #[arg(help = "Item id")]
        item_id: String,
        #[arg(help = "X coordinate where the icon is released")]
        x: f64,
        #[arg(help = "Y coordinate where the icon is released")]
        y: f64,
    },

    #[command(about = "List items expiring soon and items already expired")]
    Expiring {
        #[arg(long, default_value_t = crate::inventory::expiry::DEFAULT_EXPIRING_WINDOW_DAYS, help = "Window in days (0 means the default)")]
        days: i64,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

/// Everything a command needs: output format, grid, and the item store.
pub struct CliContext {
    pub output: OutputFormat,
    pub geometry: GridGeometry,
    pub source: Arc<dyn ItemSource>,
    pub sink: Arc<dyn ItemSink>,
    pub policy: RetryPolicy,
}

impl CliContext {
    pub fn build(cli: &Cli, config: &AppConfig) -> anyhow::Result<Self> {
        let geometry = GridGeometry::new(&config.grid)?;

        let source: Arc<dyn ItemSource>;
        let sink: Arc<dyn ItemSink>;
        if cli.offline {
            let store = Arc::new(MemoryItemStore::with_items(demo::demo_items(&geometry)));
            source = store.clone();
            sink = store;
        } else {
            let mut api = config.item_api.clone();
            if let Some(url) = &cli.api {
                api.base_url = url.clone();
            }
            let store = Arc::new(HttpItemStore::new(&api)?);
            source = store.clone();
            sink = store;
        }

        Ok(Self {
            output: OutputFormat::from_cli(cli),
            geometry,
            source,
            sink,
            policy: RetryPolicy::from_config(&config.persistence),
        })
    }

    pub fn writer(&self) -> PositionWriter {
        PositionWriter::new(self.sink.clone(), self.policy.clone())
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let ctx = CliContext::build(&cli, config::config())?;

    match cli.command {
        Commands::Grid => commands::placement::grid(&ctx),
        Commands::Snap { x, y } => commands::placement::snap(&ctx, x, y),
        Commands::Slot { occupied } => commands::placement::slot(&ctx, &occupied),
        Commands::Layout { fridge_ids } => commands::fridge::layout(&ctx, &fridge_ids).await,
        Commands::Move {
            fridge_id,
            item_id,
            x,
            y,
        } => commands::fridge::move_item(&ctx, &fridge_id, &item_id, x, y).await,
        Commands::Expiring { days } => commands::expiring::handle(&ctx, days).await,
    }
}
