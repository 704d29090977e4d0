//! Configuration types for the alarm engine.

use crate::period::BoundaryKind;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Longest forward window the engine will schedule, in days.
pub const MAX_HORIZON_DAYS: u32 = 90;

/// Largest accepted lead offset, in minutes.
pub const MAX_LEAD_MINUTES: u32 = 180;

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Horizon renewal policy.
    pub renewal: RenewalConfig,
    /// Per-alarm settings.
    pub alarms: AlarmConfig,
    /// Status notification settings.
    pub heartbeat: HeartbeatConfig,
}

/// Renewal throttle and horizon.
///
/// The defaults are product-tuned values, not derived ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenewalConfig {
    /// Minimum time between two renewals, in seconds.
    pub min_interval_secs: u64,
    /// Renew once today is within this many days of the horizon end.
    pub lead_days: u32,
    /// Days scheduled by each renewal, starting today.
    pub horizon_days: u32,
}

impl Default for RenewalConfig {
    fn default() -> Self {
        Self {
            min_interval_secs: 6 * 3600,
            lead_days: 3,
            horizon_days: 30,
        }
    }
}

/// Minutes each kind's alarm fires ahead of its boundary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeadOffsets {
    pub dawn_start: u32,
    pub dawn_end: u32,
    pub sunrise: u32,
    pub midday: u32,
    pub afternoon: u32,
    pub sunset: u32,
    pub night_start: u32,
    pub night_end: u32,
}

impl LeadOffsets {
    pub fn minutes(&self, kind: BoundaryKind) -> u32 {
        match kind {
            BoundaryKind::DawnStart => self.dawn_start,
            BoundaryKind::DawnEnd => self.dawn_end,
            BoundaryKind::Sunrise => self.sunrise,
            BoundaryKind::Midday => self.midday,
            BoundaryKind::Afternoon => self.afternoon,
            BoundaryKind::Sunset => self.sunset,
            BoundaryKind::NightStart => self.night_start,
            BoundaryKind::NightEnd => self.night_end,
        }
    }

    pub fn set(&mut self, kind: BoundaryKind, minutes: u32) {
        let slot = match kind {
            BoundaryKind::DawnStart => &mut self.dawn_start,
            BoundaryKind::DawnEnd => &mut self.dawn_end,
            BoundaryKind::Sunrise => &mut self.sunrise,
            BoundaryKind::Midday => &mut self.midday,
            BoundaryKind::Afternoon => &mut self.afternoon,
            BoundaryKind::Sunset => &mut self.sunset,
            BoundaryKind::NightStart => &mut self.night_start,
            BoundaryKind::NightEnd => &mut self.night_end,
        };
        *slot = minutes;
    }

    /// Builder form of [`set`](Self::set).
    pub fn with(mut self, kind: BoundaryKind, minutes: u32) -> Self {
        self.set(kind, minutes);
        self
    }
}

/// Alarm registration settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlarmConfig {
    pub lead_offsets: LeadOffsets,
    /// Per-registration timeout in milliseconds.
    pub registration_timeout_ms: u64,
    /// Kinds that get an alarm. Cancellation always covers every kind.
    pub enabled_kinds: Vec<BoundaryKind>,
}

impl Default for AlarmConfig {
    fn default() -> Self {
        Self {
            lead_offsets: LeadOffsets::default(),
            registration_timeout_ms: 2000,
            enabled_kinds: BoundaryKind::ALL.to_vec(),
        }
    }
}

impl AlarmConfig {
    pub fn is_enabled(&self, kind: BoundaryKind) -> bool {
        self.enabled_kinds.contains(&kind)
    }
}

/// Status notification settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeartbeatConfig {
    /// Seconds between heartbeat ticks.
    pub interval_secs: u64,
    /// List all eight boundary times in the notification body.
    pub show_full_day: bool,
    /// Stable identifier the surface replaces on each update.
    pub notification_id: u32,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval_secs: 60,
            show_full_day: false,
            notification_id: 1,
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file, falling back to defaults for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or fails validation.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| crate::error::SchedulingFault::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &std::path::Path) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::SchedulingFault::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path (`config_dir()/config.toml`).
    pub fn default_config_path() -> PathBuf {
        crate::waqt_dirs::config_file()
    }

    /// Reject values the engine cannot honour.
    pub fn validate(&self) -> crate::error::Result<()> {
        let fail = |msg: String| Err(crate::error::SchedulingFault::Config(msg));

        let horizon = self.renewal.horizon_days;
        if horizon == 0 || horizon > MAX_HORIZON_DAYS {
            return fail(format!(
                "renewal.horizon_days must be in 1..={MAX_HORIZON_DAYS}, got {horizon}"
            ));
        }
        if self.renewal.lead_days >= horizon {
            return fail(format!(
                "renewal.lead_days ({}) must be below horizon_days ({horizon})",
                self.renewal.lead_days
            ));
        }
        for kind in BoundaryKind::ALL {
            let minutes = self.alarms.lead_offsets.minutes(kind);
            if minutes > MAX_LEAD_MINUTES {
                return fail(format!(
                    "alarms.lead_offsets.{kind} must be at most {MAX_LEAD_MINUTES}, got {minutes}"
                ));
            }
        }
        if self.alarms.registration_timeout_ms == 0 {
            return fail("alarms.registration_timeout_ms must be positive".to_owned());
        }
        if self.heartbeat.interval_secs == 0 {
            return fail("heartbeat.interval_secs must be positive".to_owned());
        }
        Ok(())
    }
}
