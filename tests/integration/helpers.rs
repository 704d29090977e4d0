//! Shared helpers for integration tests.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::path::Path;
use std::sync::Arc;
use waqt::platform::KeyValueStore;
use waqt::platform::memory::{
    ManualClock, MemoryAlarmService, MemoryCalendar, RecordingSurface, SwitchPermission,
};
use waqt::store::{JsonFileStore, MemoryStore};
use waqt::{DayBoundaries, Platform};

pub(crate) fn hm(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).expect("valid time")
}

/// The reference day used throughout: 04:00 .. 21:10.
pub(crate) fn sample_day(date: NaiveDate) -> DayBoundaries {
    DayBoundaries::complete(
        date,
        [
            hm(4, 0),
            hm(4, 40),
            hm(6, 0),
            hm(12, 30),
            hm(15, 45),
            hm(18, 20),
            hm(19, 50),
            hm(21, 10),
        ],
    )
}

pub(crate) fn day_one() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 19).expect("valid date")
}

pub(crate) fn at(date: NaiveDate, h: u32, m: u32) -> NaiveDateTime {
    date.and_time(hm(h, m))
}

/// In-memory collaborators plus handles to inspect them.
pub(crate) struct Harness {
    pub alarms: Arc<MemoryAlarmService>,
    pub permission: Arc<SwitchPermission>,
    pub surface: Arc<RecordingSurface>,
    pub calendar: Arc<MemoryCalendar>,
    pub clock: Arc<ManualClock>,
    pub store: Arc<dyn KeyValueStore>,
}

impl Harness {
    /// Calendar covering `days` days from [`day_one`], clock at `now`.
    pub(crate) fn new(now: NaiveDateTime, days: usize) -> Self {
        Self::with_store(now, days, Arc::new(MemoryStore::new()))
    }

    /// Same as [`new`](Self::new) with state kept in a JSON file.
    pub(crate) fn with_state_file(now: NaiveDateTime, days: usize, path: &Path) -> Self {
        let store = JsonFileStore::open(path).expect("open state file");
        Self::with_store(now, days, Arc::new(store))
    }

    fn with_store(now: NaiveDateTime, days: usize, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            alarms: Arc::new(MemoryAlarmService::new()),
            permission: Arc::new(SwitchPermission::granted()),
            surface: Arc::new(RecordingSurface::new()),
            calendar: Arc::new(MemoryCalendar::from_days(
                day_one().iter_days().take(days).map(sample_day),
            )),
            clock: Arc::new(ManualClock::new(now)),
            store,
        }
    }

    pub(crate) fn platform(&self) -> Platform {
        Platform {
            alarms: self.alarms.clone(),
            permission: self.permission.clone(),
            surface: self.surface.clone(),
            store: self.store.clone(),
            calendar: self.calendar.clone(),
            clock: self.clock.clone(),
        }
    }
}
