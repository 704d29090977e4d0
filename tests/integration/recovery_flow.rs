//! Recovery across reboots, restarts and locked storage.

use crate::helpers::{Harness, at, day_one};
use chrono::Duration;
use waqt::scheduler::renewal::RenewalDecision;
use waqt::scheduler::{RecoveryCoordinator, StateStore};
use waqt::{EngineConfig, RecoveryOutcome, RecoveryTrigger};

#[tokio::test]
async fn double_reboot_recovery_matches_a_single_one() {
    let h = Harness::new(at(day_one(), 3, 0), 40);
    let coordinator = RecoveryCoordinator::new(&h.platform(), &EngineConfig::default());

    coordinator.recover(RecoveryTrigger::DeviceReboot).await.unwrap();
    let once = h.alarms.snapshot();
    coordinator.recover(RecoveryTrigger::DeviceReboot).await.unwrap();

    assert_eq!(once.len(), 240);
    assert_eq!(h.alarms.snapshot(), once);
}

#[tokio::test]
async fn reboot_restores_alarms_the_platform_dropped() {
    let h = Harness::new(at(day_one(), 3, 0), 40);
    let coordinator = RecoveryCoordinator::new(&h.platform(), &EngineConfig::default());
    coordinator.recover(RecoveryTrigger::ProcessRestart).await.unwrap();
    let before = h.alarms.snapshot();

    h.alarms.clear();
    h.clock.advance(Duration::minutes(5));
    coordinator.recover(RecoveryTrigger::DeviceReboot).await.unwrap();
    assert_eq!(h.alarms.snapshot(), before);
}

#[tokio::test]
async fn restarted_process_reads_the_horizon_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");

    let first = Harness::with_state_file(at(day_one(), 3, 0), 40, &path);
    RecoveryCoordinator::new(&first.platform(), &EngineConfig::default())
        .recover(RecoveryTrigger::ProcessRestart)
        .await
        .unwrap();

    // A day later, a new process with a fresh store handle.
    let second = Harness::with_state_file(at(day_one() + Duration::days(1), 3, 0), 40, &path);
    let outcome = RecoveryCoordinator::new(&second.platform(), &EngineConfig::default())
        .recover(RecoveryTrigger::ProcessRestart)
        .await
        .unwrap();
    assert_eq!(outcome, RecoveryOutcome::Skipped(RenewalDecision::HorizonHealthy));
    assert_eq!(
        StateStore::new(second.store.clone())
            .load_renewal()
            .unwrap()
            .last_scheduled_date,
        Some(day_one() + Duration::days(29))
    );
}

#[tokio::test]
async fn deferred_work_survives_a_process_restart_and_runs_once() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");

    let locked = Harness::with_state_file(at(day_one(), 3, 0), 40, &path);
    locked.surface.set_locked(true);
    let outcome = RecoveryCoordinator::new(&locked.platform(), &EngineConfig::default())
        .recover(RecoveryTrigger::DeviceReboot)
        .await
        .unwrap();
    assert_eq!(outcome, RecoveryOutcome::Deferred);

    let unlocked = Harness::with_state_file(at(day_one(), 3, 5), 40, &path);
    let coordinator = RecoveryCoordinator::new(&unlocked.platform(), &EngineConfig::default());
    let outcome = coordinator
        .recover(RecoveryTrigger::PermissionRestored)
        .await
        .unwrap();
    assert!(matches!(outcome, RecoveryOutcome::Renewed(_)));
    assert_eq!(unlocked.alarms.len(), 240);

    let calls = unlocked.alarms.register_calls();
    let outcome = coordinator
        .recover(RecoveryTrigger::ProcessRestart)
        .await
        .unwrap();
    assert_eq!(outcome, RecoveryOutcome::Skipped(RenewalDecision::Throttled));
    assert_eq!(unlocked.alarms.register_calls(), calls);
}

#[tokio::test]
async fn shorter_configured_horizon_is_honoured() {
    let h = Harness::new(at(day_one(), 3, 0), 40);
    let mut config = EngineConfig::default();
    config.renewal.horizon_days = 7;
    config.renewal.lead_days = 2;

    RecoveryCoordinator::new(&h.platform(), &config)
        .recover(RecoveryTrigger::DeviceReboot)
        .await
        .unwrap();
    assert_eq!(h.alarms.len(), 56);
}
