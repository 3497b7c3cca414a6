use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Audio bitrates indexed by quality level (level 1 is index 0)
const BITRATE_LADDER: [&str; 10] = [
    "8k", "16k", "24k", "32k", "40k", "48k", "64k", "80k", "96k", "112k",
];

/// Output quality level, 1 (smallest file) to 10 (best sound)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Quality(u8);

impl Quality {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 10;
    /// Recommended level, 24k
    pub const DEFAULT: Quality = Quality(3);

    pub fn new(level: u8) -> Result<Self, AppError> {
        if (Self::MIN..=Self::MAX).contains(&level) {
            Ok(Self(level))
        } else {
            Err(AppError::InvalidQuality(level))
        }
    }

    pub fn level(self) -> u8 {
        self.0
    }

    /// Bitrate string handed to the encoder's `-b:a` flag
    pub fn bitrate(self) -> &'static str {
        BITRATE_LADDER[usize::from(self.0 - Self::MIN)]
    }

    pub fn increase(self) -> Self {
        Self((self.0 + 1).min(Self::MAX))
    }

    pub fn decrease(self) -> Self {
        Self(self.0.saturating_sub(1).max(Self::MIN))
    }

    pub fn is_default(self) -> bool {
        self == Self::DEFAULT
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<u8> for Quality {
    type Error = AppError;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        Self::new(level)
    }
}

impl From<Quality> for u8 {
    fn from(quality: Quality) -> Self {
        quality.0
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.0, self.bitrate())
    }
}
