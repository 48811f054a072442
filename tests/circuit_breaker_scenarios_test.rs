//! End-to-end breaker behavior through the decorated record repositories

mod common;

use common::*;
use records_core::constants::circuits;
use records_core::repository::{
    InMemoryRecordRepository, RecordCommandRepository, RecordQueryRepository,
};
use records_core::resilience::{BreakerError, CircuitState};
use records_core::{ErrorKind, RepositoryError};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_healthy_store_never_opens_the_circuit() {
    let store = Arc::new(ScriptedRecordRepository::new());
    let executor = executor_with(&[circuits::INSERT_RECORD], tripping_settings(Duration::from_secs(5)));
    let commands = decorate_commands(Arc::clone(&store), &executor);

    for i in 0..100 {
        commands
            .insert_record(new_record(&format!("rec-{i}")))
            .await
            .unwrap();
    }

    let metrics = executor
        .manager()
        .get_component_metrics(circuits::INSERT_RECORD)
        .unwrap();
    assert_eq!(metrics.current_state, CircuitState::Closed);
    assert_eq!(metrics.totals.success_count, 100);
    assert_eq!(store.len(), 100);
}

#[tokio::test]
async fn test_forced_trip_refuses_without_calling_the_store() {
    // Four good calls, then six failures: the window reaches 50% at the eighth call
    let store = Arc::new(ScriptedRecordRepository::new().fail_on(&[5, 6, 7, 8, 9, 10]));
    let executor = executor_with(&[circuits::INSERT_RECORD], tripping_settings(Duration::from_secs(30)));
    let commands = decorate_commands(Arc::clone(&store), &executor);

    for i in 0..10 {
        let _ = commands.insert_record(new_record(&format!("rec-{i}"))).await;
    }

    let breaker = executor.manager().get_circuit_breaker(circuits::INSERT_RECORD);
    assert_eq!(breaker.state(), CircuitState::Open);

    let reached_store = store.call_count();
    let eleventh = commands.insert_record(new_record("rec-eleven")).await;

    match eleventh {
        Err(RepositoryError::CircuitBreaker(BreakerError::CircuitOpen { circuit })) => {
            assert_eq!(circuit, circuits::INSERT_RECORD)
        }
        other => panic!("expected open circuit, got {other:?}"),
    }
    assert_eq!(store.call_count(), reached_store);
    assert!(store.call_count() < 11);
}

#[tokio::test]
async fn test_domain_errors_keep_their_kind_through_the_breaker() {
    let store = Arc::new(InMemoryRecordRepository::new(10));
    let executor = executor_with(&circuits::ALL, relaxed_settings());
    let commands = decorate_commands(Arc::clone(&store), &executor);
    let queries = decorate_queries(store, &executor);

    commands.insert_record(new_record("rec-1")).await.unwrap();

    let duplicate = commands.insert_record(new_record("rec-1")).await.unwrap_err();
    assert_eq!(duplicate.kind(), ErrorKind::DuplicateRecord);

    let missing = queries.select_record_by_id("nope").await.unwrap_err();
    assert_eq!(missing.kind(), ErrorKind::MissingRecord);
    assert!(missing.kind().is_domain());
}

#[tokio::test]
async fn test_slow_store_times_out_with_breaker_kind() {
    let store = Arc::new(ScriptedRecordRepository::new().with_delay(Duration::from_millis(300)));
    let executor = executor_with(
        &[circuits::SELECT_RECORD_BY_ID],
        records_core::CircuitSettings {
            timeout: Duration::from_millis(50),
            ..relaxed_settings()
        },
    );
    let queries = decorate_queries(store, &executor);

    let error = queries.select_record_by_id("rec-1").await.unwrap_err();

    assert_eq!(error.kind(), ErrorKind::CircuitBreaker);
    assert_eq!(error.kind().http_status(), 503);
    assert!(matches!(
        error,
        RepositoryError::CircuitBreaker(BreakerError::Timeout { .. })
    ));
}

#[tokio::test]
async fn test_successful_probe_closes_the_circuit() {
    let store = Arc::new(ScriptedRecordRepository::new().fail_on(&[1, 2, 3, 4, 5]));
    let executor = executor_with(&[circuits::INSERT_RECORD], tripping_settings(Duration::from_millis(100)));
    let commands = decorate_commands(Arc::clone(&store), &executor);

    for i in 0..5 {
        assert!(commands
            .insert_record(new_record(&format!("rec-{i}")))
            .await
            .is_err());
    }
    let breaker = executor.manager().get_circuit_breaker(circuits::INSERT_RECORD);
    assert_eq!(breaker.state(), CircuitState::Open);

    tokio::time::sleep(Duration::from_millis(150)).await;

    commands.insert_record(new_record("probe")).await.unwrap();
    assert_eq!(breaker.state(), CircuitState::Closed);

    commands.insert_record(new_record("after-probe")).await.unwrap();
    assert_eq!(store.call_count(), 7);
}

#[tokio::test]
async fn test_failed_probe_reopens_and_restarts_the_sleep_window() {
    let store = Arc::new(ScriptedRecordRepository::new().fail_on(&[1, 2, 3, 4, 5, 6]));
    let executor = executor_with(&[circuits::INSERT_RECORD], tripping_settings(Duration::from_millis(100)));
    let commands = decorate_commands(Arc::clone(&store), &executor);

    for i in 0..5 {
        let _ = commands.insert_record(new_record(&format!("rec-{i}"))).await;
    }
    tokio::time::sleep(Duration::from_millis(150)).await;

    let probe = commands.insert_record(new_record("probe")).await.unwrap_err();
    assert_eq!(probe.kind(), ErrorKind::DatabaseError);

    let breaker = executor.manager().get_circuit_breaker(circuits::INSERT_RECORD);
    assert_eq!(breaker.state(), CircuitState::Open);

    let refused = commands.insert_record(new_record("too-soon")).await.unwrap_err();
    assert!(refused.is_circuit_breaker());
    assert_eq!(store.call_count(), 6);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_calls_each_receive_one_outcome() {
    let store = Arc::new(
        ScriptedRecordRepository::new()
            .with_delay(Duration::from_millis(5))
            .fail_on(&[3, 9, 27]),
    );
    let executor = executor_with(&[circuits::INSERT_RECORD], relaxed_settings());
    let commands = Arc::new(decorate_commands(Arc::clone(&store), &executor));

    let mut handles = Vec::new();
    for i in 0..64 {
        let commands = Arc::clone(&commands);
        handles.push(tokio::spawn(async move {
            commands.insert_record(new_record(&format!("rec-{i}"))).await
        }));
    }

    let mut successes = 0;
    let mut failures = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(error) => {
                assert_eq!(error.kind(), ErrorKind::DatabaseError);
                failures += 1;
            }
        }
    }

    assert_eq!(successes + failures, 64);
    assert_eq!(failures, 3);

    let metrics = executor
        .manager()
        .get_component_metrics(circuits::INSERT_RECORD)
        .unwrap();
    assert_eq!(metrics.total_calls(), 64);
    assert_eq!(metrics.in_flight, 0);
}

#[tokio::test]
async fn test_circuits_are_isolated_per_operation() {
    let store = Arc::new(InMemoryRecordRepository::new(10));
    let executor = executor_with(&circuits::ALL, relaxed_settings());
    let commands = decorate_commands(Arc::clone(&store), &executor);
    let queries = decorate_queries(Arc::clone(&store), &executor);

    commands.insert_record(new_record("rec-1")).await.unwrap();
    executor
        .manager()
        .get_circuit_breaker(circuits::SELECT_RECORDS)
        .force_open();

    assert!(queries.select_records(None).await.unwrap_err().is_circuit_breaker());
    assert_eq!(queries.select_record_by_id("rec-1").await.unwrap().id, "rec-1");
    commands.delete_record("rec-1").await.unwrap();
}
