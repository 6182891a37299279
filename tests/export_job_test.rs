//! Integration tests for export jobs
//!
//! These tests drive jobs end to end against the in-memory store and check
//! the ledger after every batch:
//! - the worked 10th-to-8th scenario
//! - `exported + errors <= total` at every observed point
//! - re-running a completed range writes no duplicate rows
//! - the cursor never moves forward
//! - pause and resume across runs

mod common;

use common::{date, driver, seed_day, settings};
use leadsync::adapters::memory::InMemoryStore;
use leadsync::core::control::{JobCommand, JobController};
use leadsync::core::export::{StepOutcome, SHUTDOWN_REASON};
use leadsync::core::state::job::JobStatus;
use leadsync::core::state::JobLedger;
use leadsync::domain::event::EventStatus;
use leadsync::domain::RawLead;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::watch;

#[tokio::test]
async fn test_walk_back_completes_on_reaching_end_date() {
    let store = Arc::new(InMemoryStore::new());
    seed_day(&store, date(2024, 1, 10), 1, 50).await;
    seed_day(&store, date(2024, 1, 8), 500, 5).await;

    let (_tx, rx) = watch::channel(false);
    let driver = driver(&store, settings(100, date(2020, 1, 1)), rx);
    let ledger = JobLedger::new(store.clone());

    let job = ledger
        .create(date(2024, 1, 10), Some(date(2024, 1, 8)))
        .await
        .unwrap();
    ledger
        .transition(job.id, JobStatus::Running, None)
        .await
        .unwrap();

    // 50 rows on the 10th: a short page, so the day is done
    assert!(matches!(driver.step(job.id).await.unwrap(), StepOutcome::Continue(_)));
    let row = ledger.load(job.id).await.unwrap();
    assert_eq!(row.exported_leads, 50);
    assert_eq!(row.processing_date, date(2024, 1, 9));
    assert_eq!(row.status, JobStatus::Running);

    // Empty 9th: the cursor lands on the end date and the job is done
    let StepOutcome::Finished { batch, job: finished } = driver.step(job.id).await.unwrap() else {
        panic!("expected the second batch to finish the job");
    };
    assert_eq!(batch.rows, 0);
    assert_eq!(finished.status, JobStatus::Completed);
    assert_eq!(finished.processing_date, date(2024, 1, 8));
    assert_eq!(finished.last_completed_date, Some(date(2024, 1, 9)));
    assert_eq!(finished.total_leads, 50);
    assert!(finished.completed_at.is_some());

    // A further step is a no-op on the completed job
    assert!(matches!(driver.step(job.id).await.unwrap(), StepOutcome::Stopped(_)));
    assert_eq!(store.fetch_calls().await, 2);

    assert_eq!(store.lead_count().await, 50);
    let events = store.events().await;
    assert_eq!(events.len(), 50);
    assert!(events.iter().all(|e| e.job_id == Some(job.id)));
}

#[tokio::test]
async fn test_run_reports_summary() {
    let store = Arc::new(InMemoryStore::new());
    seed_day(&store, date(2024, 1, 10), 1, 50).await;
    seed_day(&store, date(2024, 1, 9), 100, 7).await;

    let (_tx, rx) = watch::channel(false);
    let driver = driver(&store, settings(20, date(2020, 1, 1)), rx);
    let ledger = JobLedger::new(store.clone());
    let job = ledger
        .create(date(2024, 1, 10), Some(date(2024, 1, 8)))
        .await
        .unwrap();

    let summary = driver.run(job.id).await.unwrap();

    // 20 + 20 + 10 on the 10th, then 7 on the 9th
    assert_eq!(summary.final_status, JobStatus::Completed);
    assert_eq!(summary.batches, 4);
    assert_eq!(summary.total_leads, 57);
    assert_eq!(summary.exported_leads, 57);
    assert!(summary.is_successful());
}

#[tokio::test]
async fn test_counts_invariant_with_record_failures() {
    let store = Arc::new(InMemoryStore::new());
    seed_day(&store, date(2024, 2, 1), 1, 12).await;
    let noon = chrono::TimeZone::from_utc_datetime(
        &chrono::Utc,
        &date(2024, 2, 1).and_hms_opt(12, 0, 0).unwrap(),
    );
    // No usable id: a mapping failure
    store
        .seed_lead(noon, RawLead::from_value(json!({"id": "abc", "name": "x"})))
        .await;
    store.fail_upsert_for(3).await;
    store.fail_upsert_for(7).await;

    let (_tx, rx) = watch::channel(false);
    let driver = driver(&store, settings(5, date(2020, 1, 1)), rx);
    let ledger = JobLedger::new(store.clone());
    let job = ledger
        .create(date(2024, 2, 1), Some(date(2024, 2, 1)))
        .await
        .unwrap();
    ledger
        .transition(job.id, JobStatus::Running, None)
        .await
        .unwrap();

    loop {
        let outcome = driver.step(job.id).await.unwrap();
        let row = ledger.load(job.id).await.unwrap();
        assert!(row.exported_leads + row.error_leads <= row.total_leads);
        if !matches!(outcome, StepOutcome::Continue(_)) {
            break;
        }
    }

    let row = ledger.load(job.id).await.unwrap();
    assert_eq!(row.status, JobStatus::Completed);
    assert_eq!(row.total_leads, 13);
    assert_eq!(row.error_leads, 3);
    assert_eq!(row.exported_leads, 10);

    let errors = store
        .events()
        .await
        .into_iter()
        .filter(|e| e.status == EventStatus::Error)
        .count();
    assert_eq!(errors, 3);
}

#[tokio::test]
async fn test_rerun_is_idempotent() {
    let store = Arc::new(InMemoryStore::new());
    seed_day(&store, date(2024, 1, 10), 1, 30).await;
    seed_day(&store, date(2024, 1, 9), 31, 30).await;

    let (_tx, rx) = watch::channel(false);
    let driver = driver(&store, settings(25, date(2020, 1, 1)), rx);
    let ledger = JobLedger::new(store.clone());

    let first = ledger
        .create(date(2024, 1, 10), Some(date(2024, 1, 8)))
        .await
        .unwrap();
    let first_summary = driver.run(first.id).await.unwrap();
    assert_eq!(store.lead_count().await, 60);

    let second = ledger
        .create(date(2024, 1, 10), Some(date(2024, 1, 8)))
        .await
        .unwrap();
    let second_summary = driver.run(second.id).await.unwrap();

    assert_eq!(store.lead_count().await, 60);
    assert_eq!(second_summary.exported_leads, first_summary.exported_leads);
    assert_eq!(
        ledger.load(second.id).await.unwrap().status,
        JobStatus::Completed
    );
}

#[tokio::test]
async fn test_cursor_never_moves_forward() {
    let store = Arc::new(InMemoryStore::new());
    for (offset, day) in (4..=9).rev().enumerate() {
        seed_day(&store, date(2024, 3, day), offset as i64 * 100 + 1, (day as i64 % 4) * 3).await;
    }

    let (_tx, rx) = watch::channel(false);
    let driver = driver(&store, settings(4, date(2020, 1, 1)), rx);
    let ledger = JobLedger::new(store.clone());
    let job = ledger
        .create(date(2024, 3, 9), Some(date(2024, 3, 4)))
        .await
        .unwrap();
    ledger
        .transition(job.id, JobStatus::Running, None)
        .await
        .unwrap();

    let mut previous = (date(2024, 3, 9), 0_i64);
    loop {
        let outcome = driver.step(job.id).await.unwrap();
        let row = ledger.load(job.id).await.unwrap();
        let current = (row.processing_date, row.processing_offset);

        assert!(current.0 <= previous.0, "cursor moved forward: {current:?} after {previous:?}");
        if current.0 == previous.0 {
            assert!(current.1 >= previous.1);
        }
        assert!(row.processing_date >= date(2024, 3, 4));
        previous = current;

        if !matches!(outcome, StepOutcome::Continue(_)) {
            break;
        }
    }
    assert_eq!(previous.0, date(2024, 3, 4));
}

#[tokio::test]
async fn test_pause_and_resume_continue_from_cursor() {
    let store = Arc::new(InMemoryStore::new());
    seed_day(&store, date(2024, 1, 10), 1, 10).await;
    seed_day(&store, date(2024, 1, 9), 11, 10).await;

    let (_tx, rx) = watch::channel(false);
    let driver = driver(&store, settings(4, date(2020, 1, 1)), rx);
    let ledger = JobLedger::new(store.clone());
    let controller = JobController::new(ledger.clone());

    let created = controller
        .apply(JobCommand::Create {
            start_date: date(2024, 1, 10),
            end_date: Some(date(2024, 1, 8)),
        })
        .await
        .unwrap();
    let job_id = created.job.id;
    ledger
        .transition(job_id, JobStatus::Running, None)
        .await
        .unwrap();

    driver.step(job_id).await.unwrap();
    controller
        .apply(JobCommand::Pause {
            job_id,
            reason: Some("maintenance".to_string()),
        })
        .await
        .unwrap();

    // The next iteration sees the pause and reads nothing
    let calls_before = store.fetch_calls().await;
    assert!(matches!(driver.step(job_id).await.unwrap(), StepOutcome::Stopped(_)));
    assert_eq!(store.fetch_calls().await, calls_before);

    let paused = ledger.load(job_id).await.unwrap();
    assert_eq!(paused.status, JobStatus::Paused);
    assert_eq!(paused.processing_offset, 4);

    controller
        .apply(JobCommand::Resume { job_id })
        .await
        .unwrap();
    let summary = driver.run(job_id).await.unwrap();

    assert_eq!(summary.final_status, JobStatus::Completed);
    assert_eq!(summary.total_leads, 16);
    let row = ledger.load(job_id).await.unwrap();
    assert_eq!(row.total_leads, 20);
    assert_eq!(store.lead_count().await, 20);
}

#[tokio::test]
async fn test_shutdown_pauses_running_job() {
    let store = Arc::new(InMemoryStore::new());
    seed_day(&store, date(2024, 1, 10), 1, 10).await;

    let (tx, rx) = watch::channel(false);
    let driver = driver(&store, settings(4, date(2020, 1, 1)), rx);
    let ledger = JobLedger::new(store.clone());
    let job = ledger.create(date(2024, 1, 10), None).await.unwrap();

    tx.send(true).unwrap();
    let summary = driver.run(job.id).await.unwrap();

    assert_eq!(summary.final_status, JobStatus::Paused);
    assert_eq!(summary.reason.as_deref(), Some(SHUTDOWN_REASON));
    assert_eq!(summary.batches, 0);
    assert_eq!(
        ledger.load(job.id).await.unwrap().pause_reason.as_deref(),
        Some(SHUTDOWN_REASON)
    );
}

#[tokio::test]
async fn test_dry_run_writes_nothing() {
    use leadsync::core::export::{BatchProcessor, ExportDriver};

    let store = Arc::new(InMemoryStore::new());
    seed_day(&store, date(2024, 1, 10), 1, 8).await;

    let (_tx, rx) = watch::channel(false);
    let driver = ExportDriver::new(
        JobLedger::new(store.clone()),
        store.clone(),
        BatchProcessor::new(store.clone(), store.clone(), true),
        settings(100, date(2020, 1, 1)),
        rx,
    );
    let ledger = JobLedger::new(store.clone());
    let job = ledger
        .create(date(2024, 1, 10), Some(date(2024, 1, 10)))
        .await
        .unwrap();

    let summary = driver.run(job.id).await.unwrap();

    assert_eq!(summary.exported_leads, 8);
    assert_eq!(store.lead_count().await, 0);
}
