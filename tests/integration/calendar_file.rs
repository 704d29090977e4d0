//! Scheduling from a calendar file on disk.

use crate::helpers::{Harness, at, day_one, sample_day};
use chrono::Duration;
use std::sync::Arc;
use waqt::calendar::CalendarFile;
use waqt::scheduler::RecoveryCoordinator;
use waqt::{EngineConfig, RecoveryOutcome, RecoveryTrigger};

#[tokio::test]
async fn gaps_in_the_file_become_date_level_faults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("calendar.json");
    let days: Vec<_> = day_one()
        .iter_days()
        .take(30)
        .filter(|d| *d != day_one() + Duration::days(3))
        .map(sample_day)
        .collect();
    CalendarFile::save(&path, &days).unwrap();

    let h = Harness::new(at(day_one(), 3, 0), 0);
    let mut platform = h.platform();
    platform.calendar = Arc::new(CalendarFile::load(&path).unwrap());

    let outcome = RecoveryCoordinator::new(&platform, &EngineConfig::default())
        .recover(RecoveryTrigger::DeviceReboot)
        .await
        .unwrap();
    let RecoveryOutcome::Renewed(report) = outcome else {
        panic!("expected a renewal, got {outcome:?}");
    };
    assert_eq!(report.scheduled, 29 * 8);
    assert_eq!(report.faults.len(), 1);
    assert!(report.faults[0].kind.is_none());
    assert_eq!(report.faults[0].date, day_one() + Duration::days(3));
}
