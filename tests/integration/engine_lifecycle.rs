//! The engine worker and heartbeat ticker end to end.

use crate::helpers::{Harness, at, day_one};
use chrono::Duration;
use std::time::Duration as StdDuration;
use waqt::{Engine, EngineConfig, RecoveryOutcome, RecoveryTrigger, SchedulingFault};

#[tokio::test]
async fn engine_recovers_and_keeps_heartbeat_updated() {
    let h = Harness::new(at(day_one(), 5, 0), 40);
    let mut config = EngineConfig::default();
    config.heartbeat.interval_secs = 1;
    let engine = Engine::start(&h.platform(), &config).unwrap();
    let handle = engine.handle();

    let outcome = handle.recover(RecoveryTrigger::DeviceReboot).await.unwrap();
    assert!(matches!(outcome, RecoveryOutcome::Renewed(_)));

    let status = handle.heartbeat().await.unwrap();
    assert_eq!(status.title, "Sunrise in 01:01");
    assert_eq!(h.surface.last().unwrap(), status);

    engine.shutdown().await;
}

#[tokio::test]
async fn data_refresh_replaces_changed_times() {
    let h = Harness::new(at(day_one(), 3, 0), 40);
    let engine = Engine::start(&h.platform(), &EngineConfig::default()).unwrap();
    let handle = engine.handle();
    handle.recover(RecoveryTrigger::DeviceReboot).await.unwrap();

    let tomorrow = day_one() + Duration::days(1);
    let mut changed = crate::helpers::sample_day(tomorrow);
    changed.times[5] = Some(crate::helpers::hm(18, 31));
    h.calendar.insert(changed);

    let report = handle.data_refreshed().await.unwrap();
    assert_eq!(report.scheduled, 240);
    let sunset = h
        .alarms
        .get(waqt::scheduler::alarm_id(tomorrow, waqt::BoundaryKind::Sunset))
        .unwrap();
    assert_eq!(sunset.at, at(tomorrow, 18, 31));
    assert_eq!(h.alarms.len(), 240);

    engine.shutdown().await;
}

#[tokio::test]
async fn stopped_engine_rejects_work() {
    let h = Harness::new(at(day_one(), 3, 0), 1);
    let engine = Engine::start(&h.platform(), &EngineConfig::default()).unwrap();
    let handle = engine.handle();

    tokio::time::timeout(StdDuration::from_secs(2), engine.shutdown())
        .await
        .unwrap();

    let err = handle
        .recover(RecoveryTrigger::ProcessRestart)
        .await
        .unwrap_err();
    assert!(matches!(err, SchedulingFault::EngineStopped));
}
