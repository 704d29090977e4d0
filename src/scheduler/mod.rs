//! Alarm scheduling and horizon renewal.
//!
//! Leaf-first: [`identity`] maps `(date, kind)` to platform ids, [`manager`]
//! registers and cancels alarms, [`renewal`] decides when to extend the
//! horizon, [`recovery`] rebuilds it after lifecycle events and [`runner`]
//! serializes all of it behind one background worker.

pub mod identity;
pub mod manager;
pub mod recovery;
pub mod renewal;
pub mod runner;
pub mod state;

pub use identity::{ALARM_ID_SCHEME_VERSION, AlarmId, AlarmKey, alarm_id};
pub use manager::{CancelReport, ScheduleManager, ScheduleReport, ScheduledAlarm};
pub use recovery::{RecoveryCoordinator, RecoveryOutcome, RecoveryTrigger};
pub use renewal::{RenewalDecision, RenewalPolicy};
pub use runner::{Engine, EngineHandle};
pub use state::{RenewalState, StateStore};
