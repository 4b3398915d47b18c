mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use fridge_layout::inventory::Item;
use fridge_layout::layout::{Cell, FridgeBoard, GridGeometry, Position};
use fridge_layout::persist::{PersistOutcome, PersistReport, PositionWriter};
use fridge_layout::store::{MemoryItemStore, StoreError};
use tokio::sync::broadcast::Receiver;

use common::fast_policy;

fn store_with(ids: &[&str]) -> Arc<MemoryItemStore> {
    let geometry = GridGeometry::default();
    let items = ids
        .iter()
        .enumerate()
        .map(|(i, id)| Item::new(*id, *id, "f").with_position(geometry.anchor(Cell::new(i as u32, 0))))
        .collect();
    Arc::new(MemoryItemStore::with_items(items))
}

async fn next_report(reports: &mut Receiver<PersistReport>) -> Result<PersistReport> {
    Ok(tokio::time::timeout(Duration::from_secs(5), reports.recv()).await??)
}

#[tokio::test]
async fn transient_failures_are_retried_until_saved() -> Result<()> {
    let store = store_with(&["a"]);
    store.fail_next_updates(2, StoreError::Transport("connection reset".into())).await;

    let writer = PositionWriter::new(store.clone(), fast_policy(3));
    let mut reports = writer.subscribe();

    let target = Position::new(224.0, 153.0);
    writer.enqueue("a", target);

    let report = next_report(&mut reports).await?;
    assert_eq!(report.item_id, "a");
    assert_eq!(report.outcome, PersistOutcome::Saved { attempts: 3 });
    assert_eq!(store.item("a").await.map(|i| i.position), Some(Some(target)));
    Ok(())
}

#[tokio::test]
async fn server_errors_count_as_transient() -> Result<()> {
    let store = store_with(&["a"]);
    store
        .fail_next_updates(
            1,
            StoreError::Rejected {
                status: 503,
                message: "maintenance".into(),
            },
        )
        .await;

    let writer = PositionWriter::new(store.clone(), fast_policy(2));
    let mut reports = writer.subscribe();
    writer.enqueue("a", Position::new(129.0, 153.0));

    assert_eq!(next_report(&mut reports).await?.outcome, PersistOutcome::Saved { attempts: 2 });
    Ok(())
}

#[tokio::test]
async fn retries_stop_at_the_attempt_budget() -> Result<()> {
    let store = store_with(&["a"]);
    let before = store.item("a").await.and_then(|i| i.position);
    store.fail_next_updates(10, StoreError::Transport("timed out".into())).await;

    let writer = PositionWriter::new(store.clone(), fast_policy(4));
    let mut reports = writer.subscribe();
    writer.enqueue("a", Position::new(601.0, 373.0));

    let report = next_report(&mut reports).await?;
    match report.outcome {
        PersistOutcome::Failed { attempts, error } => {
            assert_eq!(attempts, 4);
            assert!(error.contains("timed out"), "{}", error);
        }
        other => panic!("expected failure, got {:?}", other),
    }
    assert_eq!(store.item("a").await.and_then(|i| i.position), before);
    assert!(store.writes().await.is_empty());
    Ok(())
}

#[tokio::test]
async fn permanent_failures_are_not_retried() -> Result<()> {
    let store = store_with(&[]);
    let writer = PositionWriter::new(store.clone(), fast_policy(5));
    let mut reports = writer.subscribe();

    writer.enqueue("missing", Position::new(35.0, 43.0));

    let report = next_report(&mut reports).await?;
    assert!(matches!(report.outcome, PersistOutcome::Failed { attempts: 1, .. }));
    Ok(())
}

#[tokio::test]
async fn only_the_latest_queued_position_is_sent() -> Result<()> {
    let store = store_with(&["a"]);
    let writer = PositionWriter::new(store.clone(), fast_policy(3));

    // Nothing runs until we yield, so the three positions collapse into one write.
    writer.enqueue("a", Position::new(35.0, 43.0));
    writer.enqueue("a", Position::new(129.0, 43.0));
    writer.enqueue("a", Position::new(224.0, 43.0));
    writer.flush().await;

    assert_eq!(store.writes().await, vec![("a".to_string(), Position::new(224.0, 43.0))]);
    Ok(())
}

#[tokio::test]
async fn positions_queued_during_a_write_collapse_behind_it() -> Result<()> {
    let store = store_with(&["a"]);
    store.set_update_delay(Some(Duration::from_millis(40))).await;
    let writer = PositionWriter::new(store.clone(), fast_policy(3));

    let first = Position::new(35.0, 153.0);
    let last = Position::new(318.0, 263.0);

    writer.enqueue("a", first);
    tokio::time::sleep(Duration::from_millis(10)).await;
    writer.enqueue("a", Position::new(129.0, 153.0));
    writer.enqueue("a", last);
    writer.flush().await;

    let writes: Vec<Position> = store.writes().await.into_iter().map(|(_, p)| p).collect();
    assert_eq!(writes, vec![first, last]);
    assert_eq!(store.item("a").await.and_then(|i| i.position), Some(last));
    Ok(())
}

#[tokio::test]
async fn a_newer_position_supersedes_a_retrying_one() -> Result<()> {
    let store = store_with(&["a"]);
    store.fail_next_updates(1, StoreError::Transport("connection reset".into())).await;

    let mut policy = fast_policy(5);
    policy.initial_backoff = Duration::from_millis(100);
    policy.max_backoff = Duration::from_millis(100);
    let writer = PositionWriter::new(store.clone(), policy);
    let mut reports = writer.subscribe();

    writer.enqueue("a", Position::new(35.0, 43.0));
    tokio::time::sleep(Duration::from_millis(20)).await;
    let newer = Position::new(412.0, 263.0);
    writer.enqueue("a", newer);

    let first = next_report(&mut reports).await?;
    assert_eq!(first.outcome, PersistOutcome::Superseded { attempts: 1 });
    let second = next_report(&mut reports).await?;
    assert_eq!(second.position, newer);
    assert_eq!(second.outcome, PersistOutcome::Saved { attempts: 1 });
    Ok(())
}

#[tokio::test]
async fn different_items_are_written_concurrently() -> Result<()> {
    let ids = ["a", "b", "c", "d", "e"];
    let store = store_with(&ids);
    store.set_update_delay(Some(Duration::from_millis(100))).await;
    let writer = PositionWriter::new(store.clone(), fast_policy(3));

    let started = Instant::now();
    for (row, id) in ids.iter().enumerate() {
        writer.enqueue(*id, Position::new(35.0, 43.0 + 110.0 * (row % 4) as f64));
    }
    assert_eq!(writer.in_flight(), ids.len());

    assert!(writer.flush_timeout(Duration::from_secs(5)).await);
    assert!(started.elapsed() < Duration::from_millis(400), "took {:?}", started.elapsed());
    assert_eq!(store.writes().await.len(), ids.len());
    assert_eq!(writer.in_flight(), 0);
    Ok(())
}

#[tokio::test]
async fn a_failed_write_leaves_the_board_ahead_of_the_store() -> Result<()> {
    let geometry = GridGeometry::default();
    let store = store_with(&["a"]);
    let stored = store.item("a").await.and_then(|i| i.position);

    let writer = PositionWriter::new(store.clone(), fast_policy(2));
    let mut reports = writer.subscribe();
    let (mut board, placed) = FridgeBoard::load(store.as_ref(), "f", geometry, writer.clone()).await?;
    assert!(placed.is_empty());

    store.fail_next_updates(2, StoreError::Transport("offline".into())).await;
    let dropped = board.drag_to("a", Position::new(420.0, 270.0))?;

    let report = next_report(&mut reports).await?;
    assert!(matches!(report.outcome, PersistOutcome::Failed { attempts: 2, .. }));

    // No rollback: the board keeps the dropped position.
    assert_eq!(board.item("a").and_then(|i| i.position), Some(dropped.position));
    assert_eq!(store.item("a").await.and_then(|i| i.position), stored);
    Ok(())
}

#[tokio::test]
async fn pending_positions_are_visible_until_the_queue_drains() -> Result<()> {
    let store = store_with(&["a"]);
    store.set_update_delay(Some(Duration::from_millis(40))).await;
    let writer = PositionWriter::new(store.clone(), fast_policy(3));

    let first = Position::new(129.0, 43.0);
    let last = Position::new(224.0, 153.0);
    assert_eq!(writer.pending_position("a"), None);

    writer.enqueue("a", first);
    assert_eq!(writer.pending_position("a"), Some(first));

    // In flight, then replaced by a newer queued position.
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(writer.pending_position("a"), Some(first));
    writer.enqueue("a", last);
    assert_eq!(writer.pending_position("a"), Some(last));

    writer.flush().await;
    assert_eq!(writer.pending_position("a"), None);
    Ok(())
}

#[tokio::test]
async fn failed_writes_stop_being_pending() -> Result<()> {
    let store = store_with(&[]);
    let writer = PositionWriter::new(store.clone(), fast_policy(2));

    writer.enqueue("missing", Position::new(35.0, 43.0));
    writer.flush().await;
    assert_eq!(writer.pending_position("missing"), None);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn flush_waits_for_writes_queued_from_other_threads() -> Result<()> {
    let ids: Vec<String> = (0..32).map(|i| format!("item-{}", i)).collect();
    let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
    let store = store_with(&refs);
    let writer = PositionWriter::new(store.clone(), fast_policy(3));

    let tasks: Vec<_> = ids
        .iter()
        .cloned()
        .map(|id| {
            let writer = writer.clone();
            tokio::spawn(async move {
                writer.enqueue(id.clone(), Position::new(318.0, 263.0));
                writer.flush().await;
                // Our own write cannot still be pending once flush returns.
                writer.pending_position(&id)
            })
        })
        .collect();

    for task in tasks {
        assert_eq!(task.await?, None);
    }
    assert_eq!(store.writes().await.len(), ids.len());
    assert_eq!(writer.in_flight(), 0);
    Ok(())
}
