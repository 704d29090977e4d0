//! JSON calendar file provider.
//!
//! The file is a list of days, each with exactly eight `HH:MM` strings in
//! boundary order. `null` marks a boundary the source could not supply:
//!
//! ```json
//! [
//!   { "date": "2026-10-19",
//!     "times": ["04:00", "04:40", "06:00", "12:30", "15:45", "18:20", "19:50", null] }
//! ]
//! ```

use crate::error::{PlatformError, Result, SchedulingFault};
use crate::period::{BOUNDARY_COUNT, BoundaryKind, DayBoundaries};
use crate::platform::CalendarProvider;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::{info, warn};

const TIME_FORMAT: &str = "%H:%M";

#[derive(Debug, Serialize, Deserialize)]
struct CalendarEntry {
    date: NaiveDate,
    times: Vec<Option<String>>,
}

impl CalendarEntry {
    fn from_day(day: &DayBoundaries) -> Self {
        Self {
            date: day.date,
            times: day
                .times
                .iter()
                .map(|t| t.map(|t| t.format(TIME_FORMAT).to_string()))
                .collect(),
        }
    }

    fn into_day(self) -> Option<DayBoundaries> {
        if self.times.len() != BOUNDARY_COUNT {
            warn!(
                date = %self.date,
                count = self.times.len(),
                "calendar entry must have {BOUNDARY_COUNT} times, skipping"
            );
            return None;
        }

        let mut times = [None; BOUNDARY_COUNT];
        for (kind, raw) in BoundaryKind::ALL.into_iter().zip(&self.times) {
            times[kind.index()] = raw.as_deref().and_then(|raw| {
                let parsed = NaiveTime::parse_from_str(raw.trim(), TIME_FORMAT).ok();
                if parsed.is_none() {
                    warn!(date = %self.date, %kind, "unparseable time {raw:?}, treating as missing");
                }
                parsed
            });
        }
        Some(DayBoundaries::new(self.date, times))
    }
}

/// Calendar days read from a JSON file, reloadable in place.
#[derive(Debug)]
pub struct CalendarFile {
    path: PathBuf,
    days: RwLock<BTreeMap<NaiveDate, DayBoundaries>>,
}

impl CalendarFile {
    /// Read the file at `path`.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or is not a JSON list of entries.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let days = read_days(&path)?;
        info!(path = %path.display(), days = days.len(), "calendar loaded");
        Ok(Self {
            path,
            days: RwLock::new(days),
        })
    }

    /// Re-read the file, keeping the old data if that fails.
    pub fn reload(&self) -> Result<usize> {
        let days = read_days(&self.path)?;
        let count = days.len();
        *self.days.write().unwrap_or_else(|e| e.into_inner()) = days;
        info!(path = %self.path.display(), days = count, "calendar reloaded");
        Ok(count)
    }

    /// Write `days` to `path` in the format [`load`](Self::load) reads.
    pub fn save(path: &Path, days: &[DayBoundaries]) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let entries: Vec<CalendarEntry> = days.iter().map(CalendarEntry::from_day).collect();
        let json = serde_json::to_string_pretty(&entries)
            .map_err(|e| SchedulingFault::Calendar(e.to_string()))?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.days.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// First and last date covered, if any.
    pub fn span(&self) -> Option<(NaiveDate, NaiveDate)> {
        let days = self.days.read().unwrap_or_else(|e| e.into_inner());
        Some((*days.keys().next()?, *days.keys().next_back()?))
    }

    pub fn get(&self, date: NaiveDate) -> Option<DayBoundaries> {
        self.days
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&date)
            .cloned()
    }
}

#[async_trait]
impl CalendarProvider for CalendarFile {
    async fn day(&self, date: NaiveDate) -> std::result::Result<Option<DayBoundaries>, PlatformError> {
        Ok(self.get(date))
    }
}

fn read_days(path: &Path) -> Result<BTreeMap<NaiveDate, DayBoundaries>> {
    let raw = std::fs::read_to_string(path)?;
    let entries: Vec<CalendarEntry> = serde_json::from_str(&raw)
        .map_err(|e| SchedulingFault::Calendar(format!("{}: {e}", path.display())))?;

    let mut days = BTreeMap::new();
    for day in entries.into_iter().filter_map(CalendarEntry::into_day) {
        if days.insert(day.date, day).is_some() {
            warn!(path = %path.display(), "duplicate calendar date, keeping the last entry");
        }
    }
    Ok(days)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::period::tests::{hm, sample_day};

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
    }

    #[tokio::test]
    async fn save_then_load_serves_days() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calendar.json");
        let mut second = sample_day(date(20));
        second.times[7] = None;
        CalendarFile::save(&path, &[sample_day(date(19)), second.clone()]).unwrap();

        let calendar = CalendarFile::load(&path).unwrap();
        assert_eq!(calendar.len(), 2);
        assert_eq!(calendar.span(), Some((date(19), date(20))));
        assert_eq!(calendar.day(date(20)).await.unwrap(), Some(second));
        assert_eq!(calendar.day(date(21)).await.unwrap(), None);
    }

    #[test]
    fn bad_entries_are_skipped_or_marked_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calendar.json");
        std::fs::write(
            &path,
            r#"[
  {"date": "2026-10-19", "times": ["04:00", "04:40"]},
  {"date": "2026-10-20", "times": ["04:00", "04:40", "six", "12:30", "15:45", "18:20", "19:50", "21:10"]}
]"#,
        )
        .unwrap();

        let calendar = CalendarFile::load(&path).unwrap();
        assert!(calendar.get(date(19)).is_none());
        let day = calendar.get(date(20)).unwrap();
        assert_eq!(day.time(BoundaryKind::Sunrise), None);
        assert_eq!(day.time(BoundaryKind::Midday), Some(hm(12, 30)));
    }

    #[test]
    fn malformed_json_is_a_calendar_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calendar.json");
        std::fs::write(&path, "{ not a list").unwrap();
        assert!(matches!(
            CalendarFile::load(&path),
            Err(SchedulingFault::Calendar(_))
        ));
    }

    #[test]
    fn failed_reload_keeps_previous_days() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calendar.json");
        CalendarFile::save(&path, &[sample_day(date(19))]).unwrap();
        let calendar = CalendarFile::load(&path).unwrap();

        std::fs::write(&path, "[").unwrap();
        assert!(calendar.reload().is_err());
        assert_eq!(calendar.len(), 1);

        CalendarFile::save(&path, &[sample_day(date(19)), sample_day(date(20))]).unwrap();
        assert_eq!(calendar.reload().unwrap(), 2);
    }
}
