#![forbid(unsafe_code)]

use serde::Serialize;
use std::str::FromStr;
use time::UtcOffset;

/// What closing a territory does with its responsible member.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClosePolicy {
    /// Clear the responsible member: the next round starts from `Unassigned`.
    #[default]
    Release,
    /// Keep the responsible member; a later `release` hands the territory back.
    Keep,
}

impl ClosePolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Release => "release",
            Self::Keep => "keep",
        }
    }

    pub fn releases_responsible(self) -> bool {
        matches!(self, Self::Release)
    }
}

impl FromStr for ClosePolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "release" => Ok(Self::Release),
            "keep" => Ok(Self::Keep),
            other => Err(format!(
                "unknown close policy {other:?} (expected release or keep)"
            )),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ServiceConfig {
    pub close_policy: ClosePolicy,
    /// Offset used to turn report calendar dates into instants and back.
    pub report_offset: UtcOffset,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            close_policy: ClosePolicy::default(),
            report_offset: UtcOffset::UTC,
        }
    }
}
