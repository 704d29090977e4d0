//! Classification and alarm identity properties.

use crate::helpers::{day_one, hm, sample_day};
use chrono::{Duration, NaiveDate, NaiveTime};
use std::collections::HashSet;
use waqt::period::{Countdown, PRE_DAWN_INDEX};
use waqt::scheduler::alarm_id;
use waqt::{BoundaryKind, classify};

#[test]
fn five_am_is_in_period_one_with_an_hour_to_sunrise() {
    let snapshot = classify(hm(5, 0), &sample_day(day_one())).unwrap();
    assert_eq!(snapshot.index, 1);
    assert_eq!(
        snapshot.countdown,
        Countdown::Until {
            next: BoundaryKind::Sunrise,
            remaining: Duration::hours(1),
        }
    );
}

#[test]
fn every_minute_of_the_day_classifies_without_negative_durations() {
    let day = sample_day(day_one());
    for minute in 0..24 * 60 {
        let now = NaiveTime::MIN + Duration::minutes(minute);
        let snapshot = classify(now, &day).unwrap();
        assert!(snapshot.index <= PRE_DAWN_INDEX);
        assert!(snapshot.countdown.duration() >= Duration::zero());
    }
}

#[test]
fn midday_before_sunrise_is_a_data_fault_at_any_time() {
    let mut day = sample_day(day_one());
    day.times[BoundaryKind::Midday.index()] = Some(hm(5, 45));
    for minute in (0..24 * 60).step_by(7) {
        let now = NaiveTime::MIN + Duration::minutes(minute);
        assert!(classify(now, &day).is_err(), "classified at {now}");
    }
}

#[test]
fn ids_are_stable_and_unique_over_a_ninety_day_window() {
    let start = NaiveDate::from_ymd_opt(2027, 11, 15).unwrap();
    let mut seen = HashSet::new();
    for date in start.iter_days().take(90) {
        for kind in BoundaryKind::ALL {
            let id = alarm_id(date, kind);
            assert_eq!(id, alarm_id(date, kind));
            assert!(seen.insert(id), "collision at {date} {kind}");
        }
    }
    assert_eq!(seen.len(), 720);
}
