//! Sign colors and urgency classification.
//!
//! Alpha-protocol signs switch color mid-line with a control sequence:
//! `0x1C` followed by a color code, or `0x1C Z RRGGBB` for full RGB.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Control character that introduces a color change.
pub const COLOR_ESCAPE: char = '\x1c';

/// Default accent color for in-progress events.
pub const BRAND_ORANGE: SignColor = SignColor::Rgb(0xE4, 0x70, 0x1E);

/// A color the sign can switch to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SignColor {
    Red,
    Green,
    Amber,
    Orange,
    Yellow,
    Rgb(u8, u8, u8),
}

impl SignColor {
    /// The in-band control sequence selecting this color.
    pub fn control_code(&self) -> String {
        match self {
            Self::Red => format!("{}1", COLOR_ESCAPE),
            Self::Green => format!("{}2", COLOR_ESCAPE),
            Self::Amber => format!("{}3", COLOR_ESCAPE),
            Self::Orange => format!("{}7", COLOR_ESCAPE),
            Self::Yellow => format!("{}8", COLOR_ESCAPE),
            Self::Rgb(r, g, b) => format!("{}Z{:02X}{:02X}{:02X}", COLOR_ESCAPE, r, g, b),
        }
    }
}

impl fmt::Display for SignColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Red => write!(f, "red"),
            Self::Green => write!(f, "green"),
            Self::Amber => write!(f, "amber"),
            Self::Orange => write!(f, "orange"),
            Self::Yellow => write!(f, "yellow"),
            Self::Rgb(r, g, b) => write!(f, "{:02X}{:02X}{:02X}", r, g, b),
        }
    }
}

impl FromStr for SignColor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "red" => Ok(Self::Red),
            "green" => Ok(Self::Green),
            "amber" => Ok(Self::Amber),
            "orange" => Ok(Self::Orange),
            "yellow" => Ok(Self::Yellow),
            other => {
                let hex = other.strip_prefix('#').unwrap_or(other);
                if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
                    return Err(format!("invalid sign color: {}", s));
                }
                let channel = |i: usize| {
                    u8::from_str_radix(&hex[i..i + 2], 16)
                        .map_err(|e| format!("invalid sign color {}: {}", s, e))
                };
                Ok(Self::Rgb(channel(0)?, channel(2)?, channel(4)?))
            }
        }
    }
}

impl TryFrom<String> for SignColor {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SignColor> for String {
    fn from(color: SignColor) -> Self {
        color.to_string()
    }
}

/// Three-level urgency attached to rendered text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Low,
    Medium,
    High,
}

impl Urgency {
    /// More than this many seconds away is low urgency.
    pub const LOW_ABOVE_SECS: i64 = 3600;
    /// More than this many seconds away (and not low) is medium urgency.
    pub const MEDIUM_ABOVE_SECS: i64 = 1200;

    pub fn from_seconds(seconds: i64) -> Self {
        if seconds > Self::LOW_ABOVE_SECS {
            Self::Low
        } else if seconds > Self::MEDIUM_ABOVE_SECS {
            Self::Medium
        } else {
            Self::High
        }
    }

    pub fn color(&self) -> SignColor {
        match self {
            Self::Low => SignColor::Green,
            Self::Medium => SignColor::Yellow,
            Self::High => SignColor::Red,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}
