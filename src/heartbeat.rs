//! Status notification text.
//!
//! [`compose`] turns a classification of "now" into the title and optional
//! body of the persistent heartbeat notification. It never talks to a
//! surface; the engine hands the result to a
//! [`HeartbeatSurface`](crate::platform::HeartbeatSurface).

use crate::period::{BOUNDARY_COUNT, BoundaryKind, Countdown, DayBoundaries, classify};
use chrono::{Duration, NaiveTime};
use tracing::warn;

/// Placeholder replaced by the `HH:MM` duration in period phrases.
pub const TIME_PLACEHOLDER: &str = "{time}";

/// What the heartbeat surface should display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeartbeatStatus {
    pub title: String,
    /// Full day listing, present only when requested.
    pub body: Option<String>,
}

/// Display strings used by [`compose`].
///
/// Hosts substitute translated phrases; the engine only fills in times.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhraseBook {
    /// One phrase per period index (`0..=8`), each containing
    /// [`TIME_PLACEHOLDER`].
    pub periods: [String; BOUNDARY_COUNT + 1],
    /// Display name per boundary, used in the body listing.
    pub names: [String; BOUNDARY_COUNT],
    /// Title when the day's data cannot be classified.
    pub data_fault: String,
    /// Title when no data exists for today.
    pub no_data: String,
}

impl Default for PhraseBook {
    fn default() -> Self {
        Self {
            periods: [
                "Dawn ends in {time}",
                "Sunrise in {time}",
                "Midday in {time}",
                "Afternoon in {time}",
                "Sunset in {time}",
                "Nightfall in {time}",
                "Night ends in {time}",
                "Night ended {time} ago",
                "Dawn in {time}",
            ]
            .map(str::to_owned),
            names: [
                "Dawn", "Dawn end", "Sunrise", "Midday", "Afternoon", "Sunset", "Nightfall",
                "Night end",
            ]
            .map(str::to_owned),
            data_fault: "Prayer times need checking".to_owned(),
            no_data: "No prayer times for today".to_owned(),
        }
    }
}

impl PhraseBook {
    fn name(&self, kind: BoundaryKind) -> &str {
        &self.names[kind.index()]
    }
}

/// Build the heartbeat for `now` on `day`.
///
/// Malformed days produce the data-fault title instead of a countdown.
pub fn compose(
    now: NaiveTime,
    day: &DayBoundaries,
    show_full_day: bool,
    phrases: &PhraseBook,
) -> HeartbeatStatus {
    let title = match classify(now, day) {
        Ok(snapshot) => {
            let time = match snapshot.countdown {
                Countdown::Until { remaining, .. } => format_remaining(remaining),
                Countdown::Since { elapsed, .. } => format_hhmm(elapsed),
            };
            phrases.periods[snapshot.index].replace(TIME_PLACEHOLDER, &time)
        }
        Err(fault) => {
            warn!(date = %day.date, "cannot classify heartbeat: {fault}");
            phrases.data_fault.clone()
        }
    };

    HeartbeatStatus {
        title,
        body: show_full_day.then(|| day_listing(day, phrases)),
    }
}

/// Heartbeat shown when the calendar has nothing for today.
pub fn compose_without_data(phrases: &PhraseBook) -> HeartbeatStatus {
    HeartbeatStatus {
        title: phrases.no_data.clone(),
        body: None,
    }
}

/// One `Name HH:MM` line per boundary; missing times render as `--:--`.
pub fn day_listing(day: &DayBoundaries, phrases: &PhraseBook) -> String {
    BoundaryKind::ALL
        .into_iter()
        .map(|kind| {
            let at = day
                .time(kind)
                .map_or_else(|| "--:--".to_owned(), |t| t.format("%H:%M").to_string());
            format!("{} {at}", phrases.name(kind))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Remaining time, bumped by a minute before truncation so a running
/// countdown never shows `00:00`.
pub fn format_remaining(remaining: Duration) -> String {
    format_hhmm(remaining + Duration::minutes(1))
}

/// Whole hours and minutes as `HH:MM`, truncating seconds.
pub fn format_hhmm(duration: Duration) -> String {
    let minutes = duration.num_minutes().max(0);
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}
