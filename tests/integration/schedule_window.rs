//! Registration and cancellation against the in-memory alarm service.

use crate::helpers::{Harness, at, day_one, sample_day};
use chrono::Duration;
use waqt::config::LeadOffsets;
use waqt::platform::AlarmService;
use waqt::scheduler::{ScheduleManager, StateStore, alarm_id};
use waqt::{BoundaryKind, SchedulingFault};

fn manager(h: &Harness) -> ScheduleManager {
    ScheduleManager::new(
        h.alarms.clone(),
        h.permission.clone(),
        h.clock.clone(),
        StateStore::new(h.store.clone()),
    )
}

#[tokio::test]
async fn extend_then_cancel_leaves_nothing_pending() {
    let h = Harness::new(at(day_one(), 0, 0), 11);
    let manager = manager(&h);
    let days: Vec<_> = day_one().iter_days().take(11).map(sample_day).collect();

    let report = manager
        .extend_schedule(&days, &LeadOffsets::default())
        .await
        .unwrap();
    assert_eq!(report.scheduled, 88);

    let last = day_one() + Duration::days(10);
    let cancelled = manager.cancel_range(day_one(), last).await.unwrap();
    assert_eq!(cancelled.cancelled, 88);
    assert!(cancelled.faults.is_empty());

    for date in day_one().iter_days().take(11) {
        for kind in BoundaryKind::ALL {
            let pending = h
                .alarms
                .lookup_pending_alarm(alarm_id(date, kind))
                .await
                .unwrap();
            assert!(!pending, "{date} {kind} still pending");
        }
    }
}

#[tokio::test]
async fn same_input_twice_keeps_distinct_registrations_constant() {
    let h = Harness::new(at(day_one(), 0, 0), 3);
    let manager = manager(&h);
    let days: Vec<_> = day_one().iter_days().take(3).map(sample_day).collect();
    let leads = LeadOffsets::default().with(BoundaryKind::DawnStart, 20);

    manager.extend_schedule(&days, &leads).await.unwrap();
    let first = h.alarms.snapshot();
    manager.extend_schedule(&days, &leads).await.unwrap();

    assert_eq!(h.alarms.len(), 24);
    assert_eq!(h.alarms.snapshot(), first);
    assert_eq!(h.alarms.register_calls(), 48);
}

#[tokio::test]
async fn payload_carries_boundary_time_not_trigger() {
    let h = Harness::new(at(day_one(), 0, 0), 1);
    let manager = manager(&h);
    let leads = LeadOffsets::default().with(BoundaryKind::Sunset, 10);

    manager
        .extend_schedule(&[sample_day(day_one())], &leads)
        .await
        .unwrap();

    let alarm = h.alarms.get(alarm_id(day_one(), BoundaryKind::Sunset)).unwrap();
    assert_eq!(alarm.at, at(day_one(), 18, 10));
    assert_eq!(alarm.payload.boundary_time, "18:20");
    assert_eq!(alarm.payload.boundary_kind(), Some(BoundaryKind::Sunset));
}

#[tokio::test]
async fn denied_permission_is_reported_once_not_per_item() {
    let h = Harness::new(at(day_one(), 0, 0), 5);
    h.permission.set_granted(false);
    let manager = manager(&h);
    let days: Vec<_> = day_one().iter_days().take(5).map(sample_day).collect();

    let err = manager
        .extend_schedule(&days, &LeadOffsets::default())
        .await
        .unwrap_err();
    assert!(matches!(err, SchedulingFault::PermissionDenied));
    assert!(h.alarms.is_empty());
}

#[tokio::test]
async fn disabled_kinds_are_still_cancelled() {
    let h = Harness::new(at(day_one(), 0, 0), 1);
    manager(&h)
        .extend_schedule(&[sample_day(day_one())], &LeadOffsets::default())
        .await
        .unwrap();

    let restricted = manager(&h).with_enabled_kinds(vec![BoundaryKind::Midday]);
    let report = restricted.cancel_range(day_one(), day_one()).await.unwrap();
    assert_eq!(report.cancelled, 8);
}
