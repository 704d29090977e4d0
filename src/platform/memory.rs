//! In-process collaborator implementations.
//!
//! Nothing here touches the OS. They back the unit and integration tests and
//! the `waqt-host` dry-run binary, and they expose enough inspection hooks to
//! assert on what the engine asked the platform to do.

use super::{
    AlarmPayload, AlarmService, CalendarProvider, CancelOutcome, Clock, HeartbeatSurface,
    PermissionOracle,
};
use crate::error::PlatformError;
use crate::heartbeat::HeartbeatStatus;
use crate::period::DayBoundaries;
use crate::scheduler::identity::AlarmId;
use async_trait::async_trait;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tracing::debug;

/// An alarm as held by [`MemoryAlarmService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredAlarm {
    pub at: NaiveDateTime,
    pub payload: AlarmPayload,
}

/// Which [`AlarmService`] call an injected fault applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlarmCall {
    Register,
    Lookup,
    Cancel,
}

/// Alarm registry keyed by id; re-registering an id replaces it.
#[derive(Debug, Default)]
pub struct MemoryAlarmService {
    alarms: Mutex<BTreeMap<AlarmId, RegisteredAlarm>>,
    failing: Mutex<HashSet<(AlarmCall, AlarmId)>>,
    hanging: Mutex<HashSet<(AlarmCall, AlarmId)>>,
    register_calls: AtomicUsize,
    cancel_calls: AtomicUsize,
}

impl MemoryAlarmService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make registrations for `id` fail with [`PlatformError::Rejected`].
    pub fn fail_on(&self, id: AlarmId) {
        self.fail_call(AlarmCall::Register, id);
    }

    /// Make registrations for `id` never complete.
    pub fn hang_on(&self, id: AlarmId) {
        self.hang_call(AlarmCall::Register, id);
    }

    /// Make `call` for `id` fail with [`PlatformError::Rejected`].
    pub fn fail_call(&self, call: AlarmCall, id: AlarmId) {
        self.failing
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert((call, id));
    }

    /// Make `call` for `id` never complete.
    pub fn hang_call(&self, call: AlarmCall, id: AlarmId) {
        self.hanging
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert((call, id));
    }

    /// Clear injected failures and hangs.
    pub fn heal(&self) {
        self.failing.lock().unwrap_or_else(|e| e.into_inner()).clear();
        self.hanging.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }

    pub fn len(&self) -> usize {
        self.alarms.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, id: AlarmId) -> Option<RegisteredAlarm> {
        self.alarms
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&id)
            .cloned()
    }

    /// Snapshot of every pending alarm, ordered by id.
    pub fn snapshot(&self) -> BTreeMap<AlarmId, RegisteredAlarm> {
        self.alarms.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Drop every alarm, as a device reboot does.
    pub fn clear(&self) {
        self.alarms.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }

    pub fn register_calls(&self) -> usize {
        self.register_calls.load(Ordering::SeqCst)
    }

    pub fn cancel_calls(&self) -> usize {
        self.cancel_calls.load(Ordering::SeqCst)
    }

    async fn injected(&self, call: AlarmCall, id: AlarmId) -> Result<(), PlatformError> {
        let hangs = self
            .hanging
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&(call, id));
        if hangs {
            std::future::pending::<()>().await;
        }

        let fails = self
            .failing
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&(call, id));
        if fails {
            return Err(PlatformError::Rejected(format!("{call:?} of alarm {id} refused")));
        }
        Ok(())
    }
}

#[async_trait]
impl AlarmService for MemoryAlarmService {
    async fn register_exact_alarm(
        &self,
        id: AlarmId,
        at: NaiveDateTime,
        payload: &AlarmPayload,
    ) -> Result<(), PlatformError> {
        self.register_calls.fetch_add(1, Ordering::SeqCst);
        self.injected(AlarmCall::Register, id).await?;

        debug!(%id, %at, kind = %payload.kind, "registered alarm");
        self.alarms.lock().unwrap_or_else(|e| e.into_inner()).insert(
            id,
            RegisteredAlarm {
                at,
                payload: payload.clone(),
            },
        );
        Ok(())
    }

    async fn cancel_alarm(&self, id: AlarmId) -> Result<CancelOutcome, PlatformError> {
        self.cancel_calls.fetch_add(1, Ordering::SeqCst);
        self.injected(AlarmCall::Cancel, id).await?;
        let removed = self
            .alarms
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&id);
        Ok(match removed {
            Some(_) => CancelOutcome::Cancelled,
            None => CancelOutcome::Absent,
        })
    }

    async fn lookup_pending_alarm(&self, id: AlarmId) -> Result<bool, PlatformError> {
        self.injected(AlarmCall::Lookup, id).await?;
        Ok(self
            .alarms
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(&id))
    }
}

/// Permission oracle with a switchable answer.
#[derive(Debug)]
pub struct SwitchPermission {
    granted: AtomicBool,
    reachable: AtomicBool,
}

impl SwitchPermission {
    pub fn granted() -> Self {
        Self {
            granted: AtomicBool::new(true),
            reachable: AtomicBool::new(true),
        }
    }

    pub fn denied() -> Self {
        Self {
            granted: AtomicBool::new(false),
            reachable: AtomicBool::new(true),
        }
    }

    pub fn set_granted(&self, granted: bool) {
        self.granted.store(granted, Ordering::SeqCst);
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }
}

impl PermissionOracle for SwitchPermission {
    fn can_schedule_exact_alarms(&self) -> Result<bool, PlatformError> {
        if !self.reachable.load(Ordering::SeqCst) {
            return Err(PlatformError::Unavailable("permission oracle".to_owned()));
        }
        Ok(self.granted.load(Ordering::SeqCst))
    }
}

/// Heartbeat surface that records everything it is asked to show.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    shown: Mutex<Vec<(u32, HeartbeatStatus)>>,
    locked: AtomicBool,
    activations: AtomicUsize,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate user storage still being locked after boot.
    pub fn set_locked(&self, locked: bool) {
        self.locked.store(locked, Ordering::SeqCst);
    }

    pub fn activations(&self) -> usize {
        self.activations.load(Ordering::SeqCst)
    }

    pub fn shown(&self) -> Vec<(u32, HeartbeatStatus)> {
        self.shown.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn last(&self) -> Option<HeartbeatStatus> {
        self.shown
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .last()
            .map(|(_, status)| status.clone())
    }
}

#[async_trait]
impl HeartbeatSurface for RecordingSurface {
    async fn activate(&self) -> Result<(), PlatformError> {
        if self.locked.load(Ordering::SeqCst) {
            return Err(PlatformError::StorageLocked);
        }
        self.activations.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn show(
        &self,
        notification_id: u32,
        status: &HeartbeatStatus,
    ) -> Result<(), PlatformError> {
        if self.locked.load(Ordering::SeqCst) {
            return Err(PlatformError::StorageLocked);
        }
        debug!(notification_id, title = %status.title, "heartbeat shown");
        self.shown
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((notification_id, status.clone()));
        Ok(())
    }
}

/// Calendar backed by a map of days.
#[derive(Debug, Default)]
pub struct MemoryCalendar {
    days: Mutex<BTreeMap<NaiveDate, DayBoundaries>>,
    offline: AtomicBool,
}

impl MemoryCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_days(days: impl IntoIterator<Item = DayBoundaries>) -> Self {
        let calendar = Self::new();
        for day in days {
            calendar.insert(day);
        }
        calendar
    }

    pub fn insert(&self, day: DayBoundaries) {
        self.days
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(day.date, day);
    }

    pub fn remove(&self, date: NaiveDate) {
        self.days
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&date);
    }

    /// Simulate the data source being unreachable: every lookup errors.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }
}

#[async_trait]
impl CalendarProvider for MemoryCalendar {
    async fn day(&self, date: NaiveDate) -> Result<Option<DayBoundaries>, PlatformError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(PlatformError::Unavailable(format!("calendar lookup for {date}")));
        }
        Ok(self
            .days
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&date)
            .cloned())
    }
}

/// Manually driven clock.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<NaiveDateTime>,
}

impl ManualClock {
    pub fn new(now: NaiveDateTime) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: NaiveDateTime) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut guard = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *guard += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> NaiveDateTime {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}
