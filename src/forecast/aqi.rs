use std::fmt;

use serde::{Deserialize, Serialize};

/// EPA PM2.5 health category. Upper bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AqiCategory {
    Good,
    Moderate,
    UnhealthyForSensitiveGroups,
    Unhealthy,
    VeryUnhealthy,
    Hazardous,
}

impl AqiCategory {
    pub fn from_pm25(pm25: f64) -> Self {
        match pm25 {
            v if v <= 12.0 => AqiCategory::Good,
            v if v <= 35.4 => AqiCategory::Moderate,
            v if v <= 55.4 => AqiCategory::UnhealthyForSensitiveGroups,
            v if v <= 150.4 => AqiCategory::Unhealthy,
            v if v <= 250.4 => AqiCategory::VeryUnhealthy,
            _ => AqiCategory::Hazardous,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AqiCategory::Good => "Good",
            AqiCategory::Moderate => "Moderate",
            AqiCategory::UnhealthyForSensitiveGroups => "Unhealthy for Sensitive Groups",
            AqiCategory::Unhealthy => "Unhealthy",
            AqiCategory::VeryUnhealthy => "Very Unhealthy",
            AqiCategory::Hazardous => "Hazardous",
        }
    }

    /// Standard EPA display color as RGB.
    pub fn color(&self) -> (u8, u8, u8) {
        match self {
            AqiCategory::Good => (0x00, 0xe4, 0x00),
            AqiCategory::Moderate => (0xff, 0xff, 0x00),
            AqiCategory::UnhealthyForSensitiveGroups => (0xff, 0x7e, 0x00),
            AqiCategory::Unhealthy => (0xff, 0x00, 0x00),
            AqiCategory::VeryUnhealthy => (0x8f, 0x3f, 0x97),
            AqiCategory::Hazardous => (0x7e, 0x00, 0x23),
        }
    }

    /// Lower and upper PM2.5 bounds of the category.
    pub fn range(&self) -> (f64, f64) {
        match self {
            AqiCategory::Good => (0.0, 12.0),
            AqiCategory::Moderate => (12.0, 35.4),
            AqiCategory::UnhealthyForSensitiveGroups => (35.4, 55.4),
            AqiCategory::Unhealthy => (55.4, 150.4),
            AqiCategory::VeryUnhealthy => (150.4, 250.4),
            AqiCategory::Hazardous => (250.4, f64::INFINITY),
        }
    }

    pub const ALL: [AqiCategory; 6] = [
        AqiCategory::Good,
        AqiCategory::Moderate,
        AqiCategory::UnhealthyForSensitiveGroups,
        AqiCategory::Unhealthy,
        AqiCategory::VeryUnhealthy,
        AqiCategory::Hazardous,
    ];
}

impl fmt::Display for AqiCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
