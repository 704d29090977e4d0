//! Durable renewal facts.
//!
//! The engine keeps almost no state of its own. What must survive a process
//! restart lives behind [`StateStore`], a typed view over the host's
//! key-value store.

use crate::error::{Result, SchedulingFault};
use crate::platform::KeyValueStore;
use chrono::{NaiveDate, NaiveDateTime};
use std::sync::Arc;
use tracing::warn;

pub const KEY_LAST_SCHEDULED_DATE: &str = "last_scheduled_date";
pub const KEY_LAST_RENEWAL_ATTEMPT: &str = "last_renewal_attempt";
pub const KEY_PENDING_RESTART: &str = "pending_restart";
pub const KEY_ALARM_ID_SCHEME: &str = "alarm_id_scheme";

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Input to the renewal decision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenewalState {
    /// Last date for which alarms are known to exist.
    pub last_scheduled_date: Option<NaiveDate>,
    /// When a renewal was last decided and carried out.
    pub last_renewal_attempt: Option<NaiveDateTime>,
}

/// Typed access to the engine's durable keys.
#[derive(Clone)]
pub struct StateStore {
    kv: Arc<dyn KeyValueStore>,
}

impl StateStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    pub fn load_renewal(&self) -> Result<RenewalState> {
        Ok(RenewalState {
            last_scheduled_date: self
                .get(KEY_LAST_SCHEDULED_DATE)?
                .and_then(|raw| parse_or_warn(KEY_LAST_SCHEDULED_DATE, &raw, |s| {
                    NaiveDate::parse_from_str(s, DATE_FORMAT).ok()
                })),
            last_renewal_attempt: self
                .get(KEY_LAST_RENEWAL_ATTEMPT)?
                .and_then(|raw| parse_or_warn(KEY_LAST_RENEWAL_ATTEMPT, &raw, |s| {
                    NaiveDateTime::parse_from_str(s, DATETIME_FORMAT).ok()
                })),
        })
    }

    pub fn record_scheduled_through(&self, date: NaiveDate) -> Result<()> {
        self.set(
            KEY_LAST_SCHEDULED_DATE,
            &date.format(DATE_FORMAT).to_string(),
        )
    }

    pub fn clear_scheduled_through(&self) -> Result<()> {
        self.kv
            .remove(KEY_LAST_SCHEDULED_DATE)
            .map_err(|e| SchedulingFault::Store(e.to_string()))
    }

    pub fn record_renewal_attempt(&self, at: NaiveDateTime) -> Result<()> {
        self.set(
            KEY_LAST_RENEWAL_ATTEMPT,
            &at.format(DATETIME_FORMAT).to_string(),
        )
    }

    pub fn pending_restart(&self) -> Result<bool> {
        Ok(self.get(KEY_PENDING_RESTART)?.is_some_and(|v| v == "1"))
    }

    pub fn set_pending_restart(&self, pending: bool) -> Result<()> {
        if pending {
            self.set(KEY_PENDING_RESTART, "1")
        } else {
            self.kv
                .remove(KEY_PENDING_RESTART)
                .map_err(|e| SchedulingFault::Store(e.to_string()))
        }
    }

    /// Id scheme the current platform alarms were registered under.
    pub fn alarm_scheme(&self) -> Result<Option<u32>> {
        Ok(self
            .get(KEY_ALARM_ID_SCHEME)?
            .and_then(|raw| parse_or_warn(KEY_ALARM_ID_SCHEME, &raw, |s| s.parse().ok())))
    }

    pub fn set_alarm_scheme(&self, version: u32) -> Result<()> {
        self.set(KEY_ALARM_ID_SCHEME, &version.to_string())
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        self.kv
            .get(key)
            .map_err(|e| SchedulingFault::Store(format!("cannot read {key}: {e}")))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.kv
            .set(key, value)
            .map_err(|e| SchedulingFault::Store(format!("cannot write {key}: {e}")))
    }
}

fn parse_or_warn<T>(key: &str, raw: &str, parse: impl FnOnce(&str) -> Option<T>) -> Option<T> {
    let parsed = parse(raw.trim());
    if parsed.is_none() {
        warn!("ignoring malformed stored value for {key}: {raw:?}");
    }
    parsed
}
