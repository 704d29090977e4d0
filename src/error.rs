//! Error types for the alarm engine.
//!
//! Call-level failures abort an operation and surface as [`SchedulingFault`].
//! Per-item failures inside a batch never abort it; they are collected as
//! [`ItemFault`] values in the returned report.

use crate::period::BoundaryKind;
use chrono::NaiveDate;

/// Call-level error for scheduling, cancellation and recovery.
#[derive(Debug, thiserror::Error)]
pub enum SchedulingFault {
    /// The platform refuses exact-alarm scheduling.
    #[error("exact alarm permission denied")]
    PermissionDenied,

    /// The permission oracle itself could not be consulted.
    #[error("permission oracle unavailable: {0}")]
    OracleUnavailable(String),

    /// Durable key-value store failure.
    #[error("store error: {0}")]
    Store(String),

    /// Calendar data provider failure that is not a per-date miss.
    #[error("calendar error: {0}")]
    Calendar(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// The engine worker has stopped and no longer accepts requests.
    #[error("engine stopped")]
    EngineStopped,

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error returned by platform collaborators.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlatformError {
    /// The service is not reachable right now.
    #[error("platform service unavailable: {0}")]
    Unavailable(String),

    /// The platform rejected the request.
    #[error("platform rejected request: {0}")]
    Rejected(String),

    /// User storage is still locked after boot.
    #[error("user storage locked")]
    StorageLocked,

    /// Anything else.
    #[error("{0}")]
    Other(String),
}

/// What went wrong with a single `(date, kind)` item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FaultKind {
    /// Boundary missing or out of order for that day.
    Data(String),
    /// Registration or cancellation refused for a transient reason.
    Registration(String),
    /// Platform call did not complete within the per-item timeout.
    Timeout,
}

/// A per-item fault recorded while walking a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFault {
    pub date: NaiveDate,
    /// `None` when the whole date was affected (e.g. no calendar data).
    pub kind: Option<BoundaryKind>,
    pub fault: FaultKind,
}

impl ItemFault {
    pub fn data(date: NaiveDate, kind: Option<BoundaryKind>, reason: impl Into<String>) -> Self {
        Self {
            date,
            kind,
            fault: FaultKind::Data(reason.into()),
        }
    }

    pub fn registration(date: NaiveDate, kind: BoundaryKind, reason: impl Into<String>) -> Self {
        Self {
            date,
            kind: Some(kind),
            fault: FaultKind::Registration(reason.into()),
        }
    }

    pub fn timeout(date: NaiveDate, kind: BoundaryKind) -> Self {
        Self {
            date,
            kind: Some(kind),
            fault: FaultKind::Timeout,
        }
    }

    /// Returns `true` for data-integrity faults.
    pub fn is_data(&self) -> bool {
        matches!(self.fault, FaultKind::Data(_))
    }
}

impl std::fmt::Display for ItemFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = self.kind.map_or("*", BoundaryKind::label);
        match &self.fault {
            FaultKind::Data(reason) => write!(f, "{} {kind}: data fault: {reason}", self.date),
            FaultKind::Registration(reason) => {
                write!(f, "{} {kind}: registration fault: {reason}", self.date)
            }
            FaultKind::Timeout => write!(f, "{} {kind}: platform call timed out", self.date),
        }
    }
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, SchedulingFault>;
