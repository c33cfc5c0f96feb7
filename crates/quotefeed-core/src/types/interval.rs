//! Candle interval definitions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Bar interval for candles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Interval {
    /// 1 minute bars
    #[serde(rename = "1m")]
    Minute1,
    /// 5 minute bars
    #[serde(rename = "5m")]
    Minute5,
    /// 15 minute bars
    #[serde(rename = "15m")]
    Minute15,
    /// 30 minute bars
    #[serde(rename = "30m")]
    Minute30,
    /// 1 hour bars
    #[serde(rename = "1h")]
    Hour1,
    /// Daily bars
    #[serde(rename = "1d")]
    #[default]
    Daily,
    /// Weekly bars
    #[serde(rename = "1w")]
    Weekly,
    /// Monthly bars
    #[serde(rename = "1M")]
    Monthly,
}

impl Interval {
    /// Get the duration of the interval in seconds.
    pub fn as_secs(&self) -> u64 {
        match self {
            Interval::Minute1 => 60,
            Interval::Minute5 => 300,
            Interval::Minute15 => 900,
            Interval::Minute30 => 1800,
            Interval::Hour1 => 3600,
            Interval::Daily => 86400,
            Interval::Weekly => 604800,
            Interval::Monthly => 2592000, // Approximate (30 days)
        }
    }

    /// Get the duration of the interval in milliseconds.
    pub fn as_millis(&self) -> i64 {
        self.as_secs() as i64 * 1000
    }

    /// Resolution code understood by the upstream candle endpoint.
    pub fn provider_resolution(&self) -> &'static str {
        match self {
            Interval::Minute1 => "1",
            Interval::Minute5 => "5",
            Interval::Minute15 => "15",
            Interval::Minute30 => "30",
            Interval::Hour1 => "60",
            Interval::Daily => "D",
            Interval::Weekly => "W",
            Interval::Monthly => "M",
        }
    }

    /// Round a millisecond timestamp down to the start of its bar.
    ///
    /// Range boundaries built from "now" are aligned so that repeated
    /// requests inside one bar share a cache key.
    pub fn align_down(&self, timestamp_ms: i64) -> i64 {
        let step = self.as_millis();
        timestamp_ms - timestamp_ms.rem_euclid(step)
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Interval::Minute1 => "1m",
            Interval::Minute5 => "5m",
            Interval::Minute15 => "15m",
            Interval::Minute30 => "30m",
            Interval::Hour1 => "1h",
            Interval::Daily => "1d",
            Interval::Weekly => "1w",
            Interval::Monthly => "1M",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for Interval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // "1M" (month) must be checked before lowercasing collides it with "1m".
        if s == "1M" {
            return Ok(Interval::Monthly);
        }
        match s.to_lowercase().as_str() {
            "1m" | "1min" | "minute" | "1" => Ok(Interval::Minute1),
            "5m" | "5min" | "5" => Ok(Interval::Minute5),
            "15m" | "15min" | "15" => Ok(Interval::Minute15),
            "30m" | "30min" | "30" => Ok(Interval::Minute30),
            "1h" | "1hour" | "hour" | "60" => Ok(Interval::Hour1),
            "1d" | "day" | "daily" | "d" => Ok(Interval::Daily),
            "1w" | "week" | "weekly" | "w" => Ok(Interval::Weekly),
            "month" | "monthly" => Ok(Interval::Monthly),
            _ => Err(format!("Invalid interval: {}", s)),
        }
    }
}
