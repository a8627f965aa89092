//! Severity classification of a vitals reading.
//!
//! [`classify`] maps heart rate, oxygen saturation and body temperature onto
//! a [`Tier`]. The thresholds are fixed: the dashboard colour coding and the
//! stored alert history both depend on them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Heart rate (bpm) above which a reading is critical.
pub const CRITICAL_HEART_RATE: i32 = 120;

/// Oxygen saturation (%) below which a reading is critical.
pub const CRITICAL_OXYGEN: i32 = 90;

/// Body temperature (°C) above which a reading is critical.
pub const CRITICAL_TEMPERATURE: f32 = 38.0;

/// Heart rate (bpm) above which a reading is at least a warning.
pub const WARNING_HEART_RATE: i32 = 100;

/// Oxygen saturation (%) below which a reading is at least a warning.
pub const WARNING_OXYGEN: i32 = 95;

/// Severity tier of a vitals reading, ordered `Normal < Warning < Critical`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Tier {
    #[default]
    Normal,
    Warning,
    Critical,
}

impl Tier {
    /// Storage and wire representation (`"Normal"`, `"Warning"`, `"Critical"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Normal => "Normal",
            Tier::Warning => "Warning",
            Tier::Critical => "Critical",
        }
    }

    /// Whether this tier should raise an alert.
    pub fn is_abnormal(&self) -> bool {
        !matches!(self, Tier::Normal)
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Normal" => Ok(Tier::Normal),
            "Warning" => Ok(Tier::Warning),
            "Critical" => Ok(Tier::Critical),
            other => Err(CoreError::Validation(format!("Unknown severity tier '{other}'"))),
        }
    }
}

/// Classify a reading. Critical conditions are checked before warning ones.
pub fn classify(heart_rate: i32, oxygen: i32, temperature: f32) -> Tier {
    if heart_rate > CRITICAL_HEART_RATE
        || oxygen < CRITICAL_OXYGEN
        || temperature > CRITICAL_TEMPERATURE
    {
        return Tier::Critical;
    }

    if heart_rate > WARNING_HEART_RATE || oxygen < WARNING_OXYGEN {
        return Tier::Warning;
    }

    Tier::Normal
}
