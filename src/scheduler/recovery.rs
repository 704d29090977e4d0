//! Restoring the alarm horizon after lifecycle events.
//!
//! [`RecoveryCoordinator`] also drives ordinary renewal: the heartbeat tick
//! asks it to [`renew_if_due`](RecoveryCoordinator::renew_if_due), recovery
//! triggers that invalidate the platform registry force a full
//! [`reschedule`](RecoveryCoordinator::reschedule).

use crate::config::{EngineConfig, LeadOffsets};
use crate::error::{ItemFault, PlatformError, Result};
use crate::heartbeat::{self, HeartbeatStatus, PhraseBook};
use crate::period::DayBoundaries;
use crate::platform::{CalendarProvider, Clock, HeartbeatSurface, Platform};
use crate::scheduler::identity::ALARM_ID_SCHEME_VERSION;
use crate::scheduler::manager::{CancelReport, ScheduleManager, ScheduleReport};
use crate::scheduler::renewal::{RenewalDecision, RenewalPolicy};
use crate::scheduler::state::StateStore;
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Lifecycle event that prompts recovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryTrigger {
    ProcessRestart,
    DeviceReboot,
    ClockOrTimezoneChanged,
    /// Exact-alarm permission granted again, or user storage unlocked.
    PermissionRestored,
}

impl RecoveryTrigger {
    /// Whether the trigger means existing registrations can't be trusted.
    pub fn bypasses_throttle(self) -> bool {
        !matches!(self, Self::ProcessRestart)
    }
}

impl std::fmt::Display for RecoveryTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::ProcessRestart => "process_restart",
            Self::DeviceReboot => "device_reboot",
            Self::ClockOrTimezoneChanged => "clock_or_timezone_changed",
            Self::PermissionRestored => "permission_restored",
        };
        f.write_str(name)
    }
}

/// What a recovery or renewal pass did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryOutcome {
    /// The surface could not come up yet; a pending flag was stored.
    Deferred,
    /// The policy declined to act.
    Skipped(RenewalDecision),
    /// The horizon was (re)scheduled.
    Renewed(ScheduleReport),
}

/// Owns the schedule manager and everything needed to rebuild the horizon.
pub struct RecoveryCoordinator {
    manager: ScheduleManager,
    state: StateStore,
    calendar: Arc<dyn CalendarProvider>,
    surface: Arc<dyn HeartbeatSurface>,
    clock: Arc<dyn Clock>,
    policy: RenewalPolicy,
    leads: LeadOffsets,
    show_full_day: bool,
    notification_id: u32,
    phrases: PhraseBook,
}

impl RecoveryCoordinator {
    pub fn new(platform: &Platform, config: &EngineConfig) -> Self {
        let state = StateStore::new(platform.store.clone());
        let manager = ScheduleManager::new(
            platform.alarms.clone(),
            platform.permission.clone(),
            platform.clock.clone(),
            state.clone(),
        )
        .with_enabled_kinds(config.alarms.enabled_kinds.clone())
        .with_item_timeout(std::time::Duration::from_millis(
            config.alarms.registration_timeout_ms,
        ));

        Self {
            manager,
            state,
            calendar: platform.calendar.clone(),
            surface: platform.surface.clone(),
            clock: platform.clock.clone(),
            policy: RenewalPolicy::from_config(&config.renewal),
            leads: config.alarms.lead_offsets,
            show_full_day: config.heartbeat.show_full_day,
            notification_id: config.heartbeat.notification_id,
            phrases: PhraseBook::default(),
        }
    }

    /// Use host-supplied display strings.
    pub fn with_phrases(mut self, phrases: PhraseBook) -> Self {
        self.phrases = phrases;
        self
    }

    pub fn manager(&self) -> &ScheduleManager {
        &self.manager
    }

    pub fn policy(&self) -> &RenewalPolicy {
        &self.policy
    }

    /// Re-establish the horizon after `trigger`.
    ///
    /// If the heartbeat surface reports locked storage the work is deferred
    /// behind a durable flag. The next recovery that gets past activation
    /// forces a full reschedule and clears the flag once it succeeds.
    pub async fn recover(&self, trigger: RecoveryTrigger) -> Result<RecoveryOutcome> {
        info!(%trigger, "recovery started");

        match self.surface.activate().await {
            Ok(()) => {}
            Err(PlatformError::StorageLocked) => {
                self.state.set_pending_restart(true)?;
                info!(%trigger, "user storage locked, recovery deferred");
                return Ok(RecoveryOutcome::Deferred);
            }
            Err(e) => warn!(%trigger, "heartbeat surface activation failed: {e}"),
        }

        let pending = self.state.pending_restart()?;
        let scheme = self.state.alarm_scheme()?;
        let scheme_changed = scheme.is_some_and(|v| v != ALARM_ID_SCHEME_VERSION);
        if scheme_changed {
            warn!(
                stored = ?scheme,
                current = ALARM_ID_SCHEME_VERSION,
                "alarm id scheme changed, rescheduling full horizon"
            );
        }

        let result = if trigger.bypasses_throttle() || pending || scheme_changed {
            self.reschedule().await.map(RecoveryOutcome::Renewed)
        } else {
            self.renew_if_due().await
        };
        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) => {
                self.refresh_heartbeat().await;
                return Err(e);
            }
        };

        if pending {
            self.state.set_pending_restart(false)?;
            info!(%trigger, "deferred recovery completed");
        }
        if scheme != Some(ALARM_ID_SCHEME_VERSION) {
            self.state.set_alarm_scheme(ALARM_ID_SCHEME_VERSION)?;
        }
        if !matches!(outcome, RecoveryOutcome::Renewed(_)) {
            self.refresh_heartbeat().await;
        }
        Ok(outcome)
    }

    /// Extend the horizon if the renewal policy says so.
    pub async fn renew_if_due(&self) -> Result<RecoveryOutcome> {
        let now = self.clock.now();
        let state = self.state.load_renewal()?;
        let decision = self.policy.decide(&state, now);
        if !decision.should_renew() {
            debug!(?decision, last_scheduled = ?state.last_scheduled_date, "renewal not due");
            return Ok(RecoveryOutcome::Skipped(decision));
        }
        Ok(RecoveryOutcome::Renewed(self.reschedule().await?))
    }

    /// Schedule the full horizon starting today, regardless of the throttle.
    ///
    /// Dates the calendar has no data for are skipped with a data fault and
    /// any alarms left on them from earlier data are cancelled. Dates whose
    /// lookup failed are skipped too, but their registrations are kept: the
    /// provider said nothing about them.
    pub async fn reschedule(&self) -> Result<ScheduleReport> {
        let now = self.clock.now();
        let (from, to) = self.policy.window(now.date());
        self.state.record_renewal_attempt(now)?;

        let window = self.fetch_window(from, to).await;
        let mut report = self.manager.extend_schedule(&window.days, &self.leads).await?;

        // Cancelling also pulls the recorded horizon back before the gap.
        for date in &window.missing {
            let stale = self.manager.cancel_range(*date, *date).await?;
            if stale.cancelled > 0 {
                info!(%date, cancelled = stale.cancelled, "cancelled alarms for date without data");
            }
            report.faults.extend(stale.faults);
        }

        let mut faults: Vec<ItemFault> = window
            .missing
            .into_iter()
            .map(|date| ItemFault::data(date, None, "no calendar data"))
            .chain(
                window
                    .unavailable
                    .into_iter()
                    .map(|(date, reason)| ItemFault::data(date, None, reason)),
            )
            .collect();
        faults.sort_by_key(|f| f.date);
        faults.append(&mut report.faults);
        report.faults = faults;

        self.refresh_heartbeat().await;
        Ok(report)
    }

    /// Cancel every alarm in `[from, to]`.
    pub async fn cancel_range(&self, from: NaiveDate, to: NaiveDate) -> Result<CancelReport> {
        self.manager.cancel_range(from, to).await
    }

    /// Compose the heartbeat for now without displaying it.
    pub async fn heartbeat_status(&self) -> HeartbeatStatus {
        let now = self.clock.now();
        match self.calendar.day(now.date()).await {
            Ok(Some(day)) => {
                heartbeat::compose(now.time(), &day, self.show_full_day, &self.phrases)
            }
            Ok(None) => heartbeat::compose_without_data(&self.phrases),
            Err(e) => {
                warn!(date = %now.date(), "calendar lookup failed: {e}");
                heartbeat::compose_without_data(&self.phrases)
            }
        }
    }

    /// Compose and display the heartbeat. Surface failures are logged.
    pub async fn refresh_heartbeat(&self) -> HeartbeatStatus {
        let status = self.heartbeat_status().await;
        if let Err(e) = self.surface.show(self.notification_id, &status).await {
            warn!("heartbeat update failed: {e}");
        }
        status
    }

    async fn fetch_window(&self, from: NaiveDate, to: NaiveDate) -> CalendarWindow {
        let mut window = CalendarWindow::default();
        for date in from.iter_days().take_while(|d| *d <= to) {
            match self.calendar.day(date).await {
                Ok(Some(day)) => window.days.push(day),
                Ok(None) => {
                    warn!(%date, "no calendar data, skipping date");
                    window.missing.push(date);
                }
                Err(e) => {
                    warn!(%date, "calendar lookup failed, keeping existing alarms: {e}");
                    window.unavailable.push((date, format!("calendar unavailable: {e}")));
                }
            }
        }
        window
    }
}

/// Calendar lookups for one renewal window.
#[derive(Debug, Default)]
struct CalendarWindow {
    days: Vec<DayBoundaries>,
    /// The provider has no data for these dates.
    missing: Vec<NaiveDate>,
    /// The lookup itself failed; nothing is known about these dates.
    unavailable: Vec<(NaiveDate, String)>,
}
