//! Deterministic alarm identity.
//!
//! Platform alarms are looked up and cancelled by an integer id that is
//! recomputed from `(date, kind)`, so no id index is ever persisted.
//!
//! # Id contract (scheme version 1)
//!
//! ```text
//! id = KIND_BASE[kind] + ordinal(date)      ordinal in 1..=366
//!
//! dawn_start   1001..=1366      afternoon    5001..=5366
//! dawn_end     2001..=2366      sunset       6001..=6366
//! sunrise      3001..=3366      night_start  7001..=7366
//! midday       4001..=4366      night_end    8001..=8366
//! ```
//!
//! Ranges never overlap between kinds, and within one kind the ordinal is
//! unique for any window shorter than a year, so ids are collision-free over
//! every horizon the engine schedules. Changing a base orphans every alarm
//! registered under the old scheme: bump [`ALARM_ID_SCHEME_VERSION`] and treat
//! it as a migration.

use crate::period::{BOUNDARY_COUNT, BoundaryKind};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Version of the id layout documented above.
pub const ALARM_ID_SCHEME_VERSION: u32 = 1;

/// Spacing between kind bases.
pub const KIND_BASE_STRIDE: u32 = 1000;

/// Longest window, in days, over which ids are guaranteed distinct.
pub const MAX_COLLISION_FREE_DAYS: u32 = 365;

const KIND_BASE: [u32; BOUNDARY_COUNT] = [1000, 2000, 3000, 4000, 5000, 6000, 7000, 8000];

/// Platform-level alarm identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AlarmId(pub u32);

impl std::fmt::Display for AlarmId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Logical identity of one alarm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AlarmKey {
    pub date: NaiveDate,
    pub kind: BoundaryKind,
}

impl AlarmKey {
    pub fn new(date: NaiveDate, kind: BoundaryKind) -> Self {
        Self { date, kind }
    }

    pub fn id(&self) -> AlarmId {
        alarm_id(self.date, self.kind)
    }
}

/// Compute the platform id for `(date, kind)`.
pub fn alarm_id(date: NaiveDate, kind: BoundaryKind) -> AlarmId {
    AlarmId(KIND_BASE[kind.index()] + date.ordinal())
}

/// Inverse lookup of the kind encoded in an id, if it is a valid id.
pub fn kind_of(id: AlarmId) -> Option<BoundaryKind> {
    let base_slot = id.0 / KIND_BASE_STRIDE;
    let ordinal = id.0 % KIND_BASE_STRIDE;
    if !(1..=366).contains(&ordinal) {
        return None;
    }
    let kind = BoundaryKind::from_index(usize::try_from(base_slot).ok()?.checked_sub(1)?)?;
    (KIND_BASE[kind.index()] == base_slot * KIND_BASE_STRIDE).then_some(kind)
}
