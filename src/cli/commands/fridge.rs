use std::time::Duration;

use anyhow::anyhow;
use chrono::Utc;
use futures::future::join_all;
use serde_json::json;
use tokio::sync::broadcast::{error::TryRecvError, Receiver};

use crate::cli::utils::{format_cell, format_position, output_error, output_success};
use crate::cli::{CliContext, OutputFormat};
use crate::inventory::{ExpirationStatus, Item};
use crate::layout::{nearest_cell, FridgeBoard, GridGeometry, Position};
use crate::persist::{PersistOutcome, PersistReport, PositionWriter};

/// Upper bound on how long a command waits for queued writes before exiting.
const WRITE_FLUSH_TIMEOUT: Duration = Duration::from_secs(60);

pub async fn layout(ctx: &CliContext, fridge_ids: &[String]) -> anyhow::Result<()> {
    let writer = ctx.writer();
    let mut reports = writer.subscribe();

    let loads = fridge_ids
        .iter()
        .map(|fridge_id| FridgeBoard::load(ctx.source.as_ref(), fridge_id, ctx.geometry.clone(), writer.clone()));
    let results = join_all(loads).await;

    let mut boards = Vec::new();
    let mut failed = 0;
    for (fridge_id, result) in fridge_ids.iter().zip(results) {
        match result {
            Ok(loaded) => boards.push(loaded),
            Err(e) => {
                failed += 1;
                output_error(&ctx.output, &format!("fridge {}: {}", fridge_id, e), Some("LOAD_FAILED"))?;
            }
        }
    }

    let writes = wait_for_writes(&writer, &mut reports).await;

    match ctx.output {
        OutputFormat::Json => {
            let fridges: Vec<_> = boards
                .iter()
                .map(|(board, placed)| {
                    json!({
                        "fridgeId": board.fridge_id(),
                        "items": board.items(),
                        "autoPlaced": placed,
                    })
                })
                .collect();
            output_success(
                &ctx.output,
                &format!("Loaded {} fridge(s)", boards.len()),
                Some(json!({ "fridges": fridges, "writes": writes })),
            )?;
        }
        OutputFormat::Text => {
            for (board, placed) in &boards {
                println!(
                    "Fridge {}: {} item(s), {} auto-placed",
                    board.fridge_id(),
                    board.items().len(),
                    placed.len()
                );
                for item in board.items() {
                    println!("  {}", describe_item(board.geometry(), item));
                }
            }
            print_failed_writes(&writes);
        }
    }

    if failed > 0 {
        return Err(anyhow!("{} of {} fridge(s) failed to load", failed, fridge_ids.len()));
    }
    Ok(())
}

pub async fn move_item(ctx: &CliContext, fridge_id: &str, item_id: &str, x: f64, y: f64) -> anyhow::Result<()> {
    let writer = ctx.writer();
    let mut reports = writer.subscribe();

    let (mut board, _) = FridgeBoard::load(ctx.source.as_ref(), fridge_id, ctx.geometry.clone(), writer.clone()).await?;
    let dropped = board.drag_to(item_id, Position::new(x, y))?;

    let writes = wait_for_writes(&writer, &mut reports).await;
    let outcome = writes
        .iter()
        .rev()
        .find(|report| report.item_id == item_id)
        .map(|report| report.outcome.clone());

    match outcome {
        Some(PersistOutcome::Saved { attempts }) => {
            let name = board.item(item_id).map(|item| item.name.as_str()).unwrap_or(item_id);
            output_success(
                &ctx.output,
                &format!(
                    "Moved {} to {} at {} ({} attempt(s))",
                    name,
                    format_cell(dropped.cell),
                    format_position(dropped.position),
                    attempts
                ),
                Some(json!({ "dropped": dropped, "writes": writes })),
            )
        }
        Some(PersistOutcome::Failed { attempts, error }) => Err(anyhow!(
            "position write for item {} failed after {} attempt(s): {}",
            item_id,
            attempts,
            error
        )),
        Some(PersistOutcome::Superseded { .. }) | None => Err(anyhow!(
            "position write for item {} did not finish within {:?}",
            item_id,
            WRITE_FLUSH_TIMEOUT
        )),
    }
}

/// Flush the writer and collect every report published since `reports` subscribed.
async fn wait_for_writes(writer: &PositionWriter, reports: &mut Receiver<PersistReport>) -> Vec<PersistReport> {
    if !writer.flush_timeout(WRITE_FLUSH_TIMEOUT).await {
        tracing::warn!("{} position write(s) still pending", writer.in_flight());
    }

    let mut collected = Vec::new();
    loop {
        match reports.try_recv() {
            Ok(report) => collected.push(report),
            Err(TryRecvError::Lagged(skipped)) => {
                tracing::warn!("missed {} write report(s)", skipped);
            }
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
        }
    }
    collected
}

fn print_failed_writes(writes: &[PersistReport]) {
    for report in writes {
        if let PersistOutcome::Failed { attempts, error } = &report.outcome {
            eprintln!(
                "Warning: could not save position of item {} after {} attempt(s): {}",
                report.item_id, attempts, error
            );
        }
    }
}

fn describe_item(geometry: &GridGeometry, item: &Item) -> String {
    let placement = match item.position {
        Some(position) => format!("{} {}", format_cell(nearest_cell(geometry, position)), format_position(position)),
        None => "unplaced".to_string(),
    };

    let expiry = item
        .expiration_date
        .map(|date| {
            let status = ExpirationStatus::classify(date, Utc::now());
            format!(" [{:?}: {}]", status.freshness, status.label())
        })
        .unwrap_or_default();

    format!(
        "{} {} ({}{} {}) {}{}",
        item.category.icon(),
        item.name,
        item.quantity,
        item.unit,
        item.category.label(),
        placement,
        expiry
    )
}
