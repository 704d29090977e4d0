//! Waqt: prayer-time alarm scheduling and renewal engine.
//!
//! This crate turns daily prayer-time boundaries into a rolling set of
//! exact platform alarms and keeps that set valid across reboots, clock
//! changes and process restarts.
//!
//! # Architecture
//!
//! - **Period model** ([`period`]): the eight daily boundaries, the nine
//!   periods between them and "which period is active now"
//! - **Scheduling** ([`scheduler`]): deterministic alarm ids, registration
//!   and cancellation, throttled horizon renewal and lifecycle recovery
//! - **Heartbeat** ([`heartbeat`]): the persistent status notification text
//! - **Platform** ([`platform`]): collaborator traits the host implements,
//!   plus in-memory doubles
//!
//! All scheduling work runs on one background worker started by
//! [`Engine::start`].

pub mod calendar;
pub mod config;
pub mod error;
pub mod heartbeat;
pub mod period;
pub mod platform;
pub mod scheduler;
pub mod store;
pub mod waqt_dirs;

pub use config::EngineConfig;
pub use error::{ItemFault, PlatformError, Result, SchedulingFault};
pub use heartbeat::{HeartbeatStatus, PhraseBook};
pub use period::{BoundaryKind, DayBoundaries, PeriodSnapshot, classify};
pub use platform::Platform;
pub use scheduler::{Engine, EngineHandle, RecoveryOutcome, RecoveryTrigger};
