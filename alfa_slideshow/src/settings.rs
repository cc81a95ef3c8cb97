//! ALFA Slideshow - Session Settings
//!
//! Enumerated presentation options. Values are decoded leniently: anything
//! outside the allowed set falls back to the option's default.

use std::path::Path;
use std::time::Duration;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{SessionError, SessionResult};

/// Default deletion swipe velocity (logical px/s)
pub const DEFAULT_SWIPE_VELOCITY: f32 = 800.0;

/// Raw setting as found in a settings file
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RawChoice {
    Number(u64),
    Text(String),
    Other(serde_json::Value),
}

impl RawChoice {
    fn as_u64(&self) -> Option<u64> {
        match self {
            RawChoice::Number(n) => Some(*n),
            RawChoice::Text(s) => s.trim().parse().ok(),
            RawChoice::Other(_) => None,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// AUTO-ADVANCE INTERVAL
// ═══════════════════════════════════════════════════════════════════════════════

/// Auto-advance period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "RawChoice", into = "u64")]
pub enum AdvanceInterval {
    Three,
    #[default]
    Five,
    Ten,
    Thirty,
}

impl AdvanceInterval {
    pub const ALL: [AdvanceInterval; 4] = [Self::Three, Self::Five, Self::Ten, Self::Thirty];

    pub fn from_seconds(seconds: u64) -> Option<Self> {
        match seconds {
            3 => Some(Self::Three),
            5 => Some(Self::Five),
            10 => Some(Self::Ten),
            30 => Some(Self::Thirty),
            _ => None,
        }
    }

    pub fn seconds(&self) -> u64 {
        match self {
            Self::Three => 3,
            Self::Five => 5,
            Self::Ten => 10,
            Self::Thirty => 30,
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.seconds())
    }
}

impl From<RawChoice> for AdvanceInterval {
    fn from(raw: RawChoice) -> Self {
        raw.as_u64().and_then(Self::from_seconds).unwrap_or_else(|| {
            log::warn!("Invalid auto-advance interval {:?}, using default", raw);
            Self::default()
        })
    }
}

impl From<AdvanceInterval> for u64 {
    fn from(interval: AdvanceInterval) -> Self {
        interval.seconds()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// AUTO-LOCK DELAY
// ═══════════════════════════════════════════════════════════════════════════════

/// One-shot auto-lock delay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "RawChoice", into = "u64")]
pub enum AutoLockDelay {
    One,
    Two,
    #[default]
    Five,
    Ten,
    Fifteen,
}

impl AutoLockDelay {
    pub const ALL: [AutoLockDelay; 5] = [Self::One, Self::Two, Self::Five, Self::Ten, Self::Fifteen];

    pub fn from_minutes(minutes: u64) -> Option<Self> {
        match minutes {
            1 => Some(Self::One),
            2 => Some(Self::Two),
            5 => Some(Self::Five),
            10 => Some(Self::Ten),
            15 => Some(Self::Fifteen),
            _ => None,
        }
    }

    pub fn minutes(&self) -> u64 {
        match self {
            Self::One => 1,
            Self::Two => 2,
            Self::Five => 5,
            Self::Ten => 10,
            Self::Fifteen => 15,
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.minutes() * 60)
    }
}

impl From<RawChoice> for AutoLockDelay {
    fn from(raw: RawChoice) -> Self {
        raw.as_u64().and_then(Self::from_minutes).unwrap_or_else(|| {
            log::warn!("Invalid auto-lock delay {:?}, using default", raw);
            Self::default()
        })
    }
}

impl From<AutoLockDelay> for u64 {
    fn from(delay: AutoLockDelay) -> Self {
        delay.minutes()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SESSION CONFIG
// ═══════════════════════════════════════════════════════════════════════════════

/// Presentation settings consumed by a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SessionConfig {
    /// Advance to the next item periodically
    #[serde(deserialize_with = "flag_off")]
    pub auto_advance_enabled: bool,
    /// Auto-advance period
    #[serde(rename = "autoAdvanceIntervalSeconds")]
    pub advance_interval: AdvanceInterval,
    /// Lock the device after a fixed delay
    #[serde(deserialize_with = "flag_off")]
    pub auto_lock_enabled: bool,
    /// Auto-lock delay
    #[serde(rename = "autoLockMinutes")]
    pub auto_lock_delay: AutoLockDelay,
    /// Ask before removing an item
    #[serde(deserialize_with = "flag_on")]
    pub confirm_removal: bool,
    /// Vertical swipe removes the current item
    #[serde(deserialize_with = "flag_on")]
    pub swipe_to_delete_enabled: bool,
    /// Minimum swipe velocity recognized as a removal gesture
    #[serde(deserialize_with = "velocity")]
    pub swipe_velocity_threshold: f32,
    /// Pinch zoom on images
    #[serde(deserialize_with = "flag_on")]
    pub pinch_zoom_enabled: bool,
    /// Show "k / n" counter
    #[serde(deserialize_with = "flag_on")]
    pub show_counter: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            auto_advance_enabled: false,
            advance_interval: AdvanceInterval::default(),
            auto_lock_enabled: false,
            auto_lock_delay: AutoLockDelay::default(),
            confirm_removal: true,
            swipe_to_delete_enabled: true,
            swipe_velocity_threshold: DEFAULT_SWIPE_VELOCITY,
            pinch_zoom_enabled: true,
            show_counter: true,
        }
    }
}

impl SessionConfig {
    /// Load settings, falling back to defaults when missing or unreadable
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Ignoring settings at {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Load settings strictly
    pub fn load(path: &Path) -> SessionResult<Self> {
        let data = std::fs::read(path)?;
        serde_json::from_slice(&data).map_err(|e| SessionError::SettingsError(e.to_string()))
    }

    /// Swipe threshold actually applied: finite and positive, else the default
    pub fn swipe_velocity(&self) -> f32 {
        valid_velocity(self.swipe_velocity_threshold as f64).unwrap_or(DEFAULT_SWIPE_VELOCITY)
    }

    /// Save settings to disk
    pub fn save(&self, path: &Path) -> SessionResult<()> {
        let data = serde_json::to_vec_pretty(self)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, data)?;
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// FIELD DECODING
// ═══════════════════════════════════════════════════════════════════════════════

fn valid_velocity(value: f64) -> Option<f32> {
    let value = value as f32;
    (value.is_finite() && value > 0.0).then_some(value)
}

/// Boolean field; anything but a JSON bool keeps `default`
fn flag<'de, D: Deserializer<'de>>(deserializer: D, default: bool) -> Result<bool, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Bool(value) => Ok(value),
        other => {
            log::warn!("Invalid flag {}, using {}", other, default);
            Ok(default)
        }
    }
}

fn flag_on<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    flag(deserializer, true)
}

fn flag_off<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    flag(deserializer, false)
}

fn velocity<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f32, D::Error> {
    let raw = Value::deserialize(deserializer)?;
    match raw.as_f64().and_then(valid_velocity) {
        Some(value) => Ok(value),
        None => {
            log::warn!("Invalid swipe velocity threshold {}, using default", raw);
            Ok(DEFAULT_SWIPE_VELOCITY)
        }
    }
}
