//! Daily boundary model and period classification.
//!
//! A day is delimited by eight ordered [`BoundaryKind`] instants. They split
//! the day into nine half-open periods:
//!
//! ```text
//!   (-inf,B0) [B0,B1) [B1,B2) [B2,B3) [B3,B4) [B4,B5) [B5,B6) [B6,B7) [B7,+inf)
//!   index 8   0       1       2       3       4       5       6       7
//! ```
//!
//! Period indices follow the last boundary passed, so `[B_i, B_{i+1})` has
//! index `i`. The pre-dawn stretch before `B0` is the tail of the previous
//! night and takes index 8. The final period `[B7, +inf)` has no upper bound
//! and reports time elapsed since `B7` instead of time remaining.
//!
//! Everything here is pure and thread-safe.

use chrono::{Duration, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// Number of boundaries in a day.
pub const BOUNDARY_COUNT: usize = 8;

/// Index reported for the period before the first boundary.
pub const PRE_DAWN_INDEX: usize = 8;

/// One prayer-time boundary of a calendar day, in chronological order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryKind {
    /// Start of dawn twilight.
    DawnStart,
    /// End of dawn twilight.
    DawnEnd,
    Sunrise,
    Midday,
    Afternoon,
    Sunset,
    NightStart,
    NightEnd,
}

/// How an alarm for a boundary should be delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertChannel {
    /// Full call to prayer.
    Call,
    /// Short reminder tone.
    Reminder,
}

const LABELS: [&str; BOUNDARY_COUNT] = [
    "dawn_start",
    "dawn_end",
    "sunrise",
    "midday",
    "afternoon",
    "sunset",
    "night_start",
    "night_end",
];

const CHANNELS: [AlertChannel; BOUNDARY_COUNT] = [
    AlertChannel::Call,
    AlertChannel::Reminder,
    AlertChannel::Reminder,
    AlertChannel::Call,
    AlertChannel::Call,
    AlertChannel::Call,
    AlertChannel::Call,
    AlertChannel::Reminder,
];

impl BoundaryKind {
    /// All kinds in chronological order.
    pub const ALL: [BoundaryKind; BOUNDARY_COUNT] = [
        Self::DawnStart,
        Self::DawnEnd,
        Self::Sunrise,
        Self::Midday,
        Self::Afternoon,
        Self::Sunset,
        Self::NightStart,
        Self::NightEnd,
    ];

    /// Position of this kind within the day (0..=7).
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Kind at a given position, if in range.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Stable machine label, carried in alarm payloads.
    pub fn label(self) -> &'static str {
        LABELS[self.index()]
    }

    /// Parse a machine label produced by [`label`](Self::label).
    pub fn from_label(label: &str) -> Option<Self> {
        LABELS
            .iter()
            .position(|l| *l == label)
            .and_then(Self::from_index)
    }

    /// Delivery channel for alarms of this kind.
    pub fn alert_channel(self) -> AlertChannel {
        CHANNELS[self.index()]
    }
}

impl std::fmt::Display for BoundaryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Why a day's boundaries cannot be used as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PeriodFault {
    /// No time supplied for this boundary.
    #[error("boundary {0} is missing")]
    Missing(BoundaryKind),

    /// Boundary falls before an earlier boundary of the same day.
    #[error("boundary {kind} at {at} precedes earlier boundary at {previous}")]
    NonMonotonic {
        kind: BoundaryKind,
        at: NaiveTime,
        previous: NaiveTime,
    },
}

impl PeriodFault {
    /// The boundary the fault refers to.
    pub fn kind(&self) -> BoundaryKind {
        match self {
            Self::Missing(kind) | Self::NonMonotonic { kind, .. } => *kind,
        }
    }
}

/// One calendar date with its eight boundary times.
///
/// Owned by the calendar provider; the engine only borrows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayBoundaries {
    pub date: NaiveDate,
    pub times: [Option<NaiveTime>; BOUNDARY_COUNT],
}

/// Per-boundary usability of a day, as seen by the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundaryCheck {
    /// Times that may be scheduled; `None` for missing or unreachable ones.
    pub usable: [Option<NaiveTime>; BOUNDARY_COUNT],
    /// One entry per boundary that was dropped.
    pub faults: Vec<PeriodFault>,
}

impl DayBoundaries {
    pub fn new(date: NaiveDate, times: [Option<NaiveTime>; BOUNDARY_COUNT]) -> Self {
        Self { date, times }
    }

    /// Build a fully populated day.
    pub fn complete(date: NaiveDate, times: [NaiveTime; BOUNDARY_COUNT]) -> Self {
        Self {
            date,
            times: times.map(Some),
        }
    }

    /// Time for one boundary, if supplied.
    pub fn time(&self, kind: BoundaryKind) -> Option<NaiveTime> {
        self.times[kind.index()]
    }

    /// Strict check used by classification: every boundary present and the
    /// sequence non-decreasing.
    pub fn validate(&self) -> Result<[NaiveTime; BOUNDARY_COUNT], PeriodFault> {
        let mut out = [NaiveTime::MIN; BOUNDARY_COUNT];
        for kind in BoundaryKind::ALL {
            let at = self.time(kind).ok_or(PeriodFault::Missing(kind))?;
            if let Some(previous) = kind.index().checked_sub(1).map(|i| out[i]) {
                if at < previous {
                    return Err(PeriodFault::NonMonotonic { kind, at, previous });
                }
            }
            out[kind.index()] = at;
        }
        Ok(out)
    }

    /// Lenient check used by scheduling.
    ///
    /// A boundary earlier than any usable boundary before it is unreachable
    /// for the day and dropped; the rest of the day stays usable.
    pub fn check(&self) -> BoundaryCheck {
        let mut usable = [None; BOUNDARY_COUNT];
        let mut faults = Vec::new();
        let mut latest: Option<NaiveTime> = None;

        for kind in BoundaryKind::ALL {
            let Some(at) = self.time(kind) else {
                faults.push(PeriodFault::Missing(kind));
                continue;
            };
            match latest {
                Some(previous) if at < previous => {
                    faults.push(PeriodFault::NonMonotonic { kind, at, previous });
                }
                _ => {
                    usable[kind.index()] = Some(at);
                    latest = Some(at);
                }
            }
        }

        BoundaryCheck { usable, faults }
    }
}

/// Time relation between "now" and the active period's edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Countdown {
    /// Time left until the next boundary.
    Until {
        next: BoundaryKind,
        remaining: Duration,
    },
    /// Time since the last boundary of the day; only for the final period.
    Since {
        last: BoundaryKind,
        elapsed: Duration,
    },
}

impl Countdown {
    /// The magnitude regardless of direction.
    pub fn duration(&self) -> Duration {
        match self {
            Self::Until { remaining, .. } => *remaining,
            Self::Since { elapsed, .. } => *elapsed,
        }
    }

    pub fn is_elapsed(&self) -> bool {
        matches!(self, Self::Since { .. })
    }
}

/// Active period at a moment of the day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodSnapshot {
    /// Period index in `0..=8`, see the module docs.
    pub index: usize,
    pub countdown: Countdown,
}

impl PeriodSnapshot {
    /// Boundary that opened the active period, `None` before dawn.
    pub fn last_passed(&self) -> Option<BoundaryKind> {
        if self.index == PRE_DAWN_INDEX {
            None
        } else {
            BoundaryKind::from_index(self.index)
        }
    }
}

/// Find the period containing `now` and the distance to its edge.
///
/// Returns a [`PeriodFault`] when the day's boundaries are incomplete or out
/// of order; callers should report it and carry on.
pub fn classify(now: NaiveTime, day: &DayBoundaries) -> Result<PeriodSnapshot, PeriodFault> {
    let times = day.validate()?;
    let passed = times.iter().take_while(|at| **at <= now).count();

    let snapshot = match passed {
        0 => PeriodSnapshot {
            index: PRE_DAWN_INDEX,
            countdown: Countdown::Until {
                next: BoundaryKind::DawnStart,
                remaining: times[0] - now,
            },
        },
        BOUNDARY_COUNT => PeriodSnapshot {
            index: BOUNDARY_COUNT - 1,
            countdown: Countdown::Since {
                last: BoundaryKind::NightEnd,
                elapsed: now - times[BOUNDARY_COUNT - 1],
            },
        },
        n => PeriodSnapshot {
            index: n - 1,
            countdown: Countdown::Until {
                next: BoundaryKind::ALL[n],
                remaining: times[n] - now,
            },
        },
    };
    Ok(snapshot)
}

#[cfg(test)]
pub(crate) mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    pub(crate) fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).expect("valid time")
    }

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

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 4, 12).unwrap()
    }

    #[test]
    fn five_am_is_period_one_with_an_hour_to_sunrise() {
        let snap = classify(hm(5, 0), &sample_day(date())).unwrap();
        assert_eq!(snap.index, 1);
        assert_eq!(
            snap.countdown,
            Countdown::Until {
                next: BoundaryKind::Sunrise,
                remaining: Duration::hours(1),
            }
        );
        assert_eq!(snap.last_passed(), Some(BoundaryKind::DawnEnd));
    }

    #[test]
    fn before_first_boundary_is_pre_dawn() {
        let snap = classify(hm(2, 30), &sample_day(date())).unwrap();
        assert_eq!(snap.index, PRE_DAWN_INDEX);
        assert_eq!(snap.countdown.duration(), Duration::minutes(90));
        assert!(snap.last_passed().is_none());
    }

    #[test]
    fn boundary_instant_opens_its_period() {
        let snap = classify(hm(12, 30), &sample_day(date())).unwrap();
        assert_eq!(snap.index, 3);
        assert_eq!(snap.countdown.duration(), Duration::minutes(195));
    }

    #[test]
    fn after_last_boundary_reports_elapsed() {
        let snap = classify(hm(23, 0), &sample_day(date())).unwrap();
        assert_eq!(snap.index, 7);
        assert!(snap.countdown.is_elapsed());
        assert_eq!(snap.countdown.duration(), Duration::minutes(110));
    }

    #[test]
    fn out_of_order_boundaries_are_a_data_fault_for_any_time() {
        let mut day = sample_day(date());
        day.times[BoundaryKind::Midday.index()] = Some(hm(5, 30));

        for h in 0..24 {
            let err = classify(hm(h, 15), &day).unwrap_err();
            assert_eq!(err.kind(), BoundaryKind::Midday);
            assert!(matches!(err, PeriodFault::NonMonotonic { .. }));
        }
    }

    #[test]
    fn missing_boundary_is_a_data_fault() {
        let mut day = sample_day(date());
        day.times[BoundaryKind::Sunset.index()] = None;
        assert_eq!(
            classify(hm(10, 0), &day).unwrap_err(),
            PeriodFault::Missing(BoundaryKind::Sunset)
        );
    }

    #[test]
    fn equal_adjacent_boundaries_are_accepted() {
        let mut day = sample_day(date());
        day.times[BoundaryKind::DawnEnd.index()] = Some(hm(4, 0));
        let snap = classify(hm(4, 0), &day).unwrap();
        assert_eq!(snap.index, 1);
    }

    #[test]
    fn lenient_check_drops_only_the_offending_boundary() {
        let mut day = sample_day(date());
        day.times[BoundaryKind::Midday.index()] = Some(hm(5, 30));
        day.times[BoundaryKind::NightEnd.index()] = None;

        let check = day.check();
        assert!(check.usable[BoundaryKind::Midday.index()].is_none());
        assert!(check.usable[BoundaryKind::NightEnd.index()].is_none());
        assert_eq!(check.usable[BoundaryKind::Afternoon.index()], Some(hm(15, 45)));
        assert_eq!(check.faults.len(), 2);
    }

    #[test]
    fn labels_round_trip_and_channels_are_tabled() {
        for kind in BoundaryKind::ALL {
            assert_eq!(BoundaryKind::from_label(kind.label()), Some(kind));
        }
        assert_eq!(BoundaryKind::Sunrise.alert_channel(), AlertChannel::Reminder);
        assert_eq!(BoundaryKind::Sunset.alert_channel(), AlertChannel::Call);
        assert!(BoundaryKind::from_label("noon").is_none());
    }
}
