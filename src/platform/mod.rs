//! Collaborator interfaces consumed by the engine.
//!
//! The engine owns no OS integration. Hosts implement these traits on top of
//! the device alarm manager, the notification API, device-protected storage
//! and whatever source supplies prayer times. [`memory`] provides in-process
//! implementations used by tests and by the `waqt-host` binary.

pub mod memory;

use crate::error::PlatformError;
use crate::heartbeat::HeartbeatStatus;
use crate::period::{AlertChannel, BoundaryKind, DayBoundaries};
use crate::scheduler::identity::AlarmId;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Data handed to the platform with each alarm and returned when it fires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmPayload {
    /// Machine label of the boundary kind.
    pub kind: String,
    /// Boundary time of day as `HH:MM` (not the lead-adjusted trigger).
    pub boundary_time: String,
    pub channel: AlertChannel,
    pub lead_minutes: u32,
}

impl AlarmPayload {
    /// Kind encoded in the payload, if the label is known.
    pub fn boundary_kind(&self) -> Option<BoundaryKind> {
        BoundaryKind::from_label(&self.kind)
    }
}

/// Result of a cancellation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    Cancelled,
    /// Nothing was registered under that id.
    Absent,
}

/// Exact, power-management-exempt wake events.
///
/// Calls may block on the OS; implementations should keep them off
/// interactive threads.
#[async_trait]
pub trait AlarmService: Send + Sync {
    /// Register or replace the alarm with this id.
    async fn register_exact_alarm(
        &self,
        id: AlarmId,
        at: NaiveDateTime,
        payload: &AlarmPayload,
    ) -> Result<(), PlatformError>;

    async fn cancel_alarm(&self, id: AlarmId) -> Result<CancelOutcome, PlatformError>;

    /// Check for a pending registration without creating one.
    async fn lookup_pending_alarm(&self, id: AlarmId) -> Result<bool, PlatformError>;
}

/// Answers whether exact alarms may currently be scheduled.
pub trait PermissionOracle: Send + Sync {
    /// `Err` means the oracle itself could not be reached.
    fn can_schedule_exact_alarms(&self) -> Result<bool, PlatformError>;
}

/// The persistent status notification.
#[async_trait]
pub trait HeartbeatSurface: Send + Sync {
    /// Bring the surface up. Fails with [`PlatformError::StorageLocked`]
    /// while user storage has not been unlocked after boot.
    async fn activate(&self) -> Result<(), PlatformError>;

    /// Display or replace the status under a stable identifier.
    async fn show(&self, notification_id: u32, status: &HeartbeatStatus)
    -> Result<(), PlatformError>;
}

/// Durable string key-value facts that survive process death.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, PlatformError>;
    fn set(&self, key: &str, value: &str) -> Result<(), PlatformError>;
    fn remove(&self, key: &str) -> Result<(), PlatformError>;
}

/// Source of daily boundary data.
#[async_trait]
pub trait CalendarProvider: Send + Sync {
    /// `Ok(None)` when no data exists for the date; the engine skips it.
    async fn day(&self, date: NaiveDate) -> Result<Option<DayBoundaries>, PlatformError>;
}

/// Local wall-clock time source.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// Device clock in local time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }
}

/// Every collaborator the engine needs, shared behind `Arc`s.
#[derive(Clone)]
pub struct Platform {
    pub alarms: Arc<dyn AlarmService>,
    pub permission: Arc<dyn PermissionOracle>,
    pub surface: Arc<dyn HeartbeatSurface>,
    pub store: Arc<dyn KeyValueStore>,
    pub calendar: Arc<dyn CalendarProvider>,
    pub clock: Arc<dyn Clock>,
}
