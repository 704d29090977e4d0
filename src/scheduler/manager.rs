//! Platform alarm registration and cancellation.
//!
//! [`ScheduleManager`] turns [`DayBoundaries`] into exact platform alarms and
//! removes them again. Every registration is keyed by
//! [`alarm_id`](crate::scheduler::identity::alarm_id), so re-running a pass
//! replaces alarms instead of duplicating them and cancellation never needs a
//! stored index.
//!
//! A failing item never aborts a batch: data faults, refused registrations
//! and timeouts are collected in the returned report. Only a denied or
//! unreachable permission oracle and store failures abort the call.

use crate::config::LeadOffsets;
use crate::error::{ItemFault, Result, SchedulingFault};
use crate::period::{BoundaryKind, DayBoundaries};
use crate::platform::{AlarmPayload, AlarmService, CancelOutcome, Clock, PermissionOracle};
use crate::scheduler::identity::{AlarmId, AlarmKey};
use crate::scheduler::state::StateStore;
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Default per-item platform call timeout.
pub const DEFAULT_REGISTRATION_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(2);

/// One alarm the manager intends to register.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledAlarm {
    pub key: AlarmKey,
    /// Boundary time of day before the lead offset is applied.
    pub boundary: NaiveTime,
    /// Moment the platform should fire.
    pub trigger: NaiveDateTime,
    pub lead_minutes: u32,
    /// Human-readable description for logs and listings.
    pub label: String,
}

impl ScheduledAlarm {
    pub fn id(&self) -> AlarmId {
        self.key.id()
    }

    pub fn payload(&self) -> AlarmPayload {
        AlarmPayload {
            kind: self.key.kind.label().to_owned(),
            boundary_time: self.boundary.format("%H:%M").to_string(),
            channel: self.key.kind.alert_channel(),
            lead_minutes: self.lead_minutes,
        }
    }
}

/// Alarms derived from one day, plus the boundaries that had to be dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DayPlan {
    pub alarms: Vec<ScheduledAlarm>,
    pub faults: Vec<ItemFault>,
}

/// Compute the alarms for `day` without touching the platform.
///
/// Missing or out-of-order boundaries become data faults; kinds not in
/// `enabled` are silently left out.
pub fn plan_day(day: &DayBoundaries, leads: &LeadOffsets, enabled: &[BoundaryKind]) -> DayPlan {
    let check = day.check();
    let faults = check
        .faults
        .iter()
        .map(|fault| ItemFault::data(day.date, Some(fault.kind()), fault.to_string()))
        .collect();

    let alarms = BoundaryKind::ALL
        .into_iter()
        .filter(|kind| enabled.contains(kind))
        .filter_map(|kind| {
            let boundary = check.usable[kind.index()]?;
            let lead_minutes = leads.minutes(kind);
            let trigger =
                day.date.and_time(boundary) - Duration::minutes(i64::from(lead_minutes));
            let label = if lead_minutes == 0 {
                format!("{kind} {}", boundary.format("%H:%M"))
            } else {
                format!("{kind} {} (-{lead_minutes}m)", boundary.format("%H:%M"))
            };
            Some(ScheduledAlarm {
                key: AlarmKey::new(day.date, kind),
                boundary,
                trigger,
                lead_minutes,
                label,
            })
        })
        .collect();

    DayPlan { alarms, faults }
}

/// Summary of an [`extend_schedule`](ScheduleManager::extend_schedule) pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduleReport {
    /// Alarms registered (or replaced) on the platform.
    pub scheduled: usize,
    /// Alarms whose trigger had already passed.
    pub skipped_past: usize,
    /// Earlier registrations withdrawn because their boundary is no longer
    /// usable or their kind was disabled.
    pub withdrawn: usize,
    pub faults: Vec<ItemFault>,
    /// Latest date with at least one registered alarm.
    pub last_date: Option<NaiveDate>,
}

/// Summary of a [`cancel_range`](ScheduleManager::cancel_range) pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CancelReport {
    pub cancelled: usize,
    /// Ids with no pending registration.
    pub absent: usize,
    pub faults: Vec<ItemFault>,
}

/// Registers and cancels platform alarms for ranges of days.
pub struct ScheduleManager {
    alarms: Arc<dyn AlarmService>,
    permission: Arc<dyn PermissionOracle>,
    clock: Arc<dyn Clock>,
    state: StateStore,
    enabled_kinds: Vec<BoundaryKind>,
    item_timeout: std::time::Duration,
}

impl ScheduleManager {
    pub fn new(
        alarms: Arc<dyn AlarmService>,
        permission: Arc<dyn PermissionOracle>,
        clock: Arc<dyn Clock>,
        state: StateStore,
    ) -> Self {
        Self {
            alarms,
            permission,
            clock,
            state,
            enabled_kinds: BoundaryKind::ALL.to_vec(),
            item_timeout: DEFAULT_REGISTRATION_TIMEOUT,
        }
    }

    /// Restrict which kinds get alarms.
    pub fn with_enabled_kinds(mut self, kinds: Vec<BoundaryKind>) -> Self {
        self.enabled_kinds = kinds;
        self
    }

    /// Override the per-item platform call timeout.
    pub fn with_item_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.item_timeout = timeout;
        self
    }

    pub fn state(&self) -> &StateStore {
        &self.state
    }

    fn check_permission(&self) -> Result<()> {
        match self.permission.can_schedule_exact_alarms() {
            Ok(true) => Ok(()),
            Ok(false) => Err(SchedulingFault::PermissionDenied),
            Err(e) => Err(SchedulingFault::OracleUnavailable(e.to_string())),
        }
    }

    /// Register alarms for every usable boundary of `days`.
    ///
    /// Idempotent: the same input yields the same platform alarm set. Kinds
    /// a day no longer plans (dropped boundary, disabled kind) have any
    /// earlier registration withdrawn. On success the last scheduled date is
    /// recorded durably.
    pub async fn extend_schedule(
        &self,
        days: &[DayBoundaries],
        leads: &LeadOffsets,
    ) -> Result<ScheduleReport> {
        self.check_permission()?;

        let now = self.clock.now();
        let mut report = ScheduleReport::default();

        for day in days {
            let plan = plan_day(day, leads, &self.enabled_kinds);
            for fault in &plan.faults {
                warn!("data integrity fault: {fault}");
            }
            report.faults.extend(plan.faults);

            for kind in BoundaryKind::ALL {
                if plan.alarms.iter().any(|a| a.key.kind == kind) {
                    continue;
                }
                match self.cancel_one(AlarmKey::new(day.date, kind)).await {
                    Ok(CancelOutcome::Cancelled) => {
                        debug!(date = %day.date, %kind, "withdrew stale alarm");
                        report.withdrawn += 1;
                    }
                    Ok(CancelOutcome::Absent) => {}
                    Err(fault) => {
                        warn!("{fault}");
                        report.faults.push(fault);
                    }
                }
            }

            for alarm in plan.alarms {
                if alarm.trigger <= now {
                    report.skipped_past += 1;
                    continue;
                }

                let id = alarm.id();
                let payload = alarm.payload();
                let registration = tokio::time::timeout(
                    self.item_timeout,
                    self.alarms.register_exact_alarm(id, alarm.trigger, &payload),
                )
                .await;

                match registration {
                    Ok(Ok(())) => {
                        debug!(%id, trigger = %alarm.trigger, "scheduled {}", alarm.label);
                        report.scheduled += 1;
                        report.last_date = report.last_date.max(Some(alarm.key.date));
                    }
                    Ok(Err(e)) => {
                        let fault = ItemFault::registration(alarm.key.date, alarm.key.kind, e.to_string());
                        warn!("{fault}");
                        report.faults.push(fault);
                    }
                    Err(_) => {
                        let fault = ItemFault::timeout(alarm.key.date, alarm.key.kind);
                        warn!("{fault}");
                        report.faults.push(fault);
                    }
                }
            }
        }

        if let Some(last) = report.last_date {
            self.state.record_scheduled_through(last)?;
        }

        info!(
            scheduled = report.scheduled,
            skipped_past = report.skipped_past,
            withdrawn = report.withdrawn,
            faults = report.faults.len(),
            last_date = ?report.last_date,
            "schedule extended"
        );
        Ok(report)
    }

    /// Cancel every kind's alarm for each date in `[from, to]`.
    ///
    /// Absent registrations are expected and not faults. If the recorded
    /// horizon end is on or after `from` it is pulled back to `from - 1`, so
    /// it never claims coverage across a cancelled date. This happens even
    /// when some items in the range failed: an earlier horizon end only
    /// brings the next renewal forward, and that pass replaces or withdraws
    /// whatever survived.
    pub async fn cancel_range(&self, from: NaiveDate, to: NaiveDate) -> Result<CancelReport> {
        let mut report = CancelReport::default();

        for date in from.iter_days().take_while(|d| *d <= to) {
            for kind in BoundaryKind::ALL {
                let key = AlarmKey::new(date, kind);
                match self.cancel_one(key).await {
                    Ok(CancelOutcome::Cancelled) => report.cancelled += 1,
                    Ok(CancelOutcome::Absent) => report.absent += 1,
                    Err(fault) => {
                        warn!("{fault}");
                        report.faults.push(fault);
                    }
                }
            }
        }

        let renewal = self.state.load_renewal()?;
        if let Some(last) = renewal.last_scheduled_date {
            if from <= to && from <= last {
                match from.pred_opt() {
                    Some(before) => self.state.record_scheduled_through(before)?,
                    None => self.state.clear_scheduled_through()?,
                }
            }
        }

        info!(
            %from,
            %to,
            cancelled = report.cancelled,
            absent = report.absent,
            faults = report.faults.len(),
            "alarm range cancelled"
        );
        Ok(report)
    }

    async fn cancel_one(&self, key: AlarmKey) -> std::result::Result<CancelOutcome, ItemFault> {
        let id = key.id();
        let platform_fault = |e: crate::error::PlatformError| {
            ItemFault::registration(key.date, key.kind, e.to_string())
        };

        let pending = tokio::time::timeout(self.item_timeout, self.alarms.lookup_pending_alarm(id))
            .await
            .map_err(|_| ItemFault::timeout(key.date, key.kind))?
            .map_err(platform_fault)?;
        if !pending {
            return Ok(CancelOutcome::Absent);
        }

        tokio::time::timeout(self.item_timeout, self.alarms.cancel_alarm(id))
            .await
            .map_err(|_| ItemFault::timeout(key.date, key.kind))?
            .map_err(platform_fault)
    }
}
