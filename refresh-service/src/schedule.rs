// Trigger Schedule
// Declarative mirror of the host scheduler's trigger, kept in the config
// file so the trigger is inspectable and testable independent of a run.

use std::time::Duration;

use chrono::{DateTime, NaiveTime, TimeZone, Timelike};
use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// When the host scheduler is expected to fire the runner.
///
/// The runner never fires itself; this model only computes and renders
/// trigger times so the registration can be checked against intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Schedule {
    /// Once per day at a fixed local time
    Daily {
        #[serde(with = "clock_time")]
        at: NaiveTime,
    },
    /// On a fixed interval ("30m", "6h", "24h")
    Every {
        #[serde(with = "interval_str")]
        interval: Duration,
    },
}

impl Schedule {
    /// Compute the first trigger time strictly after `after`.
    pub fn next_after<Tz: TimeZone>(&self, after: &DateTime<Tz>) -> DateTime<Tz> {
        match self {
            Schedule::Daily { at } => {
                let mut date = after.date_naive();
                if after.time() >= *at {
                    date = date.succ_opt().unwrap_or(date);
                }
                // A local time can be unrepresentable across a DST gap;
                // advance to the next day that has one.
                for _ in 0..3 {
                    if let Some(next) = after
                        .timezone()
                        .from_local_datetime(&date.and_time(*at))
                        .earliest()
                    {
                        return next;
                    }
                    date = date.succ_opt().unwrap_or(date);
                }
                after.clone() + chrono::Duration::days(1)
            }
            Schedule::Every { interval } => {
                let step = chrono::Duration::from_std(*interval)
                    .unwrap_or_else(|_| chrono::Duration::days(1));
                after.clone() + step
            }
        }
    }

    /// Render as a five-field cron expression for registration with the
    /// host scheduler. Returns `None` when the schedule does not map onto
    /// a single cron line (e.g. a 90-minute interval).
    pub fn to_cron_expr(&self) -> Option<String> {
        match self {
            // Cron has no seconds field; refuse rather than round
            Schedule::Daily { at } if at.second() != 0 => None,
            Schedule::Daily { at } => Some(format!("{} {} * * *", at.minute(), at.hour())),
            Schedule::Every { interval } => {
                let secs = interval.as_secs();
                if secs == 0 || secs % 60 != 0 {
                    return None;
                }
                let minutes = secs / 60;
                if minutes < 60 {
                    if 60 % minutes == 0 {
                        return Some(format!("*/{} * * * *", minutes));
                    }
                    return None;
                }
                if minutes % 60 != 0 {
                    return None;
                }
                let hours = minutes / 60;
                if hours <= 24 && 24 % hours == 0 {
                    if hours == 24 {
                        return Some("0 0 * * *".to_string());
                    }
                    return Some(format!("0 */{} * * *", hours));
                }
                None
            }
        }
    }

    /// Human-readable summary for CLI output
    pub fn describe(&self) -> String {
        match self {
            Schedule::Daily { at } => format!("daily at {}", format_clock_time(*at)),
            Schedule::Every { interval } => format!("every {}", format_duration(*interval)),
        }
    }
}

/// Parse an interval string: an integer followed by `s`, `m`, `h`, or `d`.
pub fn parse_duration(s: &str) -> Result<Duration, ConfigError> {
    let s = s.trim();
    let invalid = || ConfigError::InvalidDuration(s.to_string());
    // strip_suffix keeps this safe for arbitrary (multi-byte) input
    let (value, multiplier) = if let Some(v) = s.strip_suffix('s') {
        (v, 1)
    } else if let Some(v) = s.strip_suffix('m') {
        (v, 60)
    } else if let Some(v) = s.strip_suffix('h') {
        (v, 3600)
    } else if let Some(v) = s.strip_suffix('d') {
        (v, 86_400)
    } else {
        return Err(invalid());
    };
    let value: u64 = value.parse().map_err(|_| invalid())?;
    if value == 0 {
        return Err(invalid());
    }
    Ok(Duration::from_secs(value * multiplier))
}

/// Format a duration using the largest unit that divides it exactly.
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs >= 86_400 && secs % 86_400 == 0 {
        format!("{}d", secs / 86_400)
    } else if secs >= 3600 && secs % 3600 == 0 {
        format!("{}h", secs / 3600)
    } else if secs >= 60 && secs % 60 == 0 {
        format!("{}m", secs / 60)
    } else {
        format!("{}s", secs)
    }
}

/// Format a clock time as "HH:MM", keeping seconds only when non-zero.
fn format_clock_time(t: NaiveTime) -> String {
    if t.second() == 0 {
        t.format("%H:%M").to_string()
    } else {
        t.format("%H:%M:%S").to_string()
    }
}

/// Serde adapter for `NaiveTime` as "HH:MM" (seconds accepted and kept)
mod clock_time {
    use chrono::NaiveTime;
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(t: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_clock_time(*t))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let s = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&s, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(&s, "%H:%M:%S"))
            .map_err(|_| {
                serde::de::Error::custom(format!("invalid time '{}': expected HH:MM", s))
            })
    }
}

/// Serde adapter for `Duration` as an interval string
mod interval_str {
    use std::time::Duration;

    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_duration(*d))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let s = String::deserialize(deserializer)?;
        super::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}
