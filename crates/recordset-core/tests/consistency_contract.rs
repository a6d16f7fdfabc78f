//! Contract Test: Eventual Consistency
//!
//! The control plane accepts writes before it serves them. Every wait must
//! end: on success, on its deadline, or on cancellation, and a failed wait
//! must tell the host what was last seen.
//!
//! Constraints verified:
//! - Create and update wait out visibility and PENDING lag
//! - Waits are bounded by the per-resource timeout
//! - Cancellation interrupts a wait promptly
//! - Per-field updates report exactly which fields were committed
//!
//! If this test fails, applies could hang or report false success.

mod common;

use std::time::{Duration, Instant};

use common::*;
use recordset_core::{
    Error, MemoryControlPlane, OperationContext, RecordField, RecordStatus, ResourceTimeouts,
};
use tokio::sync::watch;

fn short_timeouts(timeout: Duration) -> OperationContext {
    OperationContext::new().with_timeouts(ResourceTimeouts::all(timeout))
}

#[tokio::test]
async fn create_waits_for_visibility_and_active() {
    let control_plane = MemoryControlPlane::new()
        .with_visibility_lag(3)
        .with_pending_reads(2);
    let reconciler = reconciler(&control_plane);

    let (_, created) = reconciler
        .create(&basic_spec(), &OperationContext::new())
        .await
        .expect("create succeeds once visible");

    assert_eq!(created.status, RecordStatus::Active);
    assert!(control_plane.get_calls() >= 6);
}

#[tokio::test]
async fn create_timeout_reports_last_observed() {
    let control_plane = MemoryControlPlane::new().with_pending_reads(usize::MAX);
    let reconciler = reconciler(&control_plane);

    let result = reconciler
        .create(&basic_spec(), &short_timeouts(Duration::from_millis(60)))
        .await;

    match result {
        Err(Error::CreateTimeout { zone_id, record_id, timeout, last_observed }) => {
            assert_eq!(zone_id, ZONE_ID);
            assert!(!record_id.is_empty());
            assert_eq!(timeout, Duration::from_millis(60));
            let last = last_observed.expect("a PENDING record set was seen");
            assert_eq!(last.status, RecordStatus::Pending);
        }
        other => panic!("expected CreateTimeout, got {:?}", other),
    }
}

#[tokio::test]
async fn create_timeout_when_never_visible() {
    let control_plane = MemoryControlPlane::new().with_visibility_lag(usize::MAX);
    let reconciler = reconciler(&control_plane);

    let err = reconciler
        .create(&basic_spec(), &short_timeouts(Duration::from_millis(40)))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::CreateTimeout { .. }));
    assert!(err.last_observed().is_none());
}

#[tokio::test]
async fn cancellation_stops_create_wait() {
    let control_plane = MemoryControlPlane::new().with_pending_reads(usize::MAX);
    let reconciler = reconciler(&control_plane);
    let (tx, rx) = watch::channel(false);
    let ctx = OperationContext::new().with_cancellation(rx);

    let started = Instant::now();
    let spec = basic_spec();
    let (result, _) = tokio::join!(reconciler.create(&spec, &ctx), async {
        tokio::time::sleep(Duration::from_millis(30)).await;
        tx.send(true).expect("receiver alive");
    });

    match result {
        Err(Error::Cancelled {
            operation,
            zone_id,
            record_id,
            last_observed,
        }) => {
            assert_eq!(operation, "create");
            assert_eq!(zone_id.as_deref(), Some(ZONE_ID));
            assert!(record_id.is_some());
            assert!(last_observed.is_some());
        }
        other => panic!("expected Cancelled, got {:?}", other),
    }
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn update_waits_for_pending_to_clear() {
    let control_plane = MemoryControlPlane::new().with_pending_reads(3);
    let reconciler = reconciler(&control_plane);
    let ctx = OperationContext::new();

    let (id, _) = reconciler.create(&basic_spec(), &ctx).await.unwrap();
    let updated = reconciler
        .update(&id.to_string(), &updated_spec(), &ctx)
        .await
        .unwrap();

    assert_eq!(updated.status, RecordStatus::Active);
    assert_eq!(updated.ttl, Some(6000));
}

#[tokio::test]
async fn per_field_updates_run_in_order() {
    let client = RecordingClient::new(MemoryControlPlane::new().with_partial_update(false));
    let reconciler = recording_reconciler(&client);
    let ctx = OperationContext::new();

    let (id, _) = reconciler.create(&basic_spec(), &ctx).await.unwrap();
    reconciler
        .update(&id.to_string(), &updated_spec(), &ctx)
        .await
        .unwrap();

    assert_eq!(
        client.mutating_calls(),
        vec!["create", "update:records", "update:ttl", "update:description"]
    );
}

#[tokio::test]
async fn per_field_failure_reports_committed_fields() {
    let client = RecordingClient::new(MemoryControlPlane::new().with_partial_update(false));
    let reconciler = recording_reconciler(&client);
    let ctx = OperationContext::new();

    let (id, _) = reconciler.create(&basic_spec(), &ctx).await.unwrap();
    client
        .control_plane()
        .fail_next_update_of(RecordField::Ttl, Error::rate_limited("slow down"))
        .await;

    match reconciler.update(&id.to_string(), &updated_spec(), &ctx).await {
        Err(Error::PartialUpdateFailure { committed, failed, source, .. }) => {
            assert_eq!(committed, vec![RecordField::Records]);
            assert_eq!(failed, RecordField::Ttl);
            assert!(matches!(*source, Error::RateLimited(_)));
        }
        other => panic!("expected PartialUpdateFailure, got {:?}", other),
    }

    // Description was never attempted, records stuck
    assert_eq!(
        client.mutating_calls(),
        vec!["create", "update:records", "update:ttl"]
    );
    let stored = client
        .control_plane()
        .peek(id.zone_id(), id.record_id())
        .await
        .unwrap();
    assert_eq!(stored.records, vec!["10.1.0.1"]);
    assert_eq!(stored.ttl, Some(3000));
}

#[tokio::test]
async fn ttl_is_reported_as_served() {
    let control_plane = MemoryControlPlane::new().with_ttl_granularity(60);
    let reconciler = reconciler(&control_plane);
    let ctx = OperationContext::new();

    let (id, _) = reconciler.create(&basic_spec(), &ctx).await.unwrap();
    let updated = reconciler
        .update(&id.to_string(), &basic_spec().with_ttl(61), &ctx)
        .await
        .unwrap();

    assert_eq!(updated.ttl, Some(120));
}

#[tokio::test]
async fn delete_waits_out_deletion_lag() {
    let control_plane = MemoryControlPlane::new().with_deletion_lag(3);
    let reconciler = reconciler(&control_plane);
    let ctx = OperationContext::new();

    let (id, _) = reconciler.create(&basic_spec(), &ctx).await.unwrap();
    reconciler.delete(&id.to_string(), &ctx).await.unwrap();

    assert!(control_plane.is_empty().await);
}

#[tokio::test]
async fn delete_timeout_reports_last_observed() {
    let control_plane = MemoryControlPlane::new().with_deletion_lag(usize::MAX);
    let reconciler = reconciler(&control_plane);

    let (id, _) = reconciler
        .create(&basic_spec(), &OperationContext::new())
        .await
        .unwrap();

    let ctx = OperationContext::new().with_timeouts(ResourceTimeouts {
        delete: Some(Duration::from_millis(50)),
        ..Default::default()
    });

    match reconciler.delete(&id.to_string(), &ctx).await {
        Err(Error::OperationTimeout {
            operation,
            zone_id,
            record_id,
            last_observed,
            ..
        }) => {
            assert_eq!(operation, "delete");
            assert_eq!(zone_id.as_deref(), Some(id.zone_id()));
            assert_eq!(record_id.as_deref(), Some(id.record_id()));
            assert_eq!(last_observed.unwrap().id, id.record_id());
        }
        other => panic!("expected OperationTimeout, got {:?}", other),
    }
}
