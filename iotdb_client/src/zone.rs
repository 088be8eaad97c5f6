//! Session time zones as fixed offsets from UTC.

use std::{fmt::Display, str::FromStr};

use chrono::FixedOffset;

use crate::Error;

/// A session time zone, given as a fixed offset from UTC
///
/// Accepts the forms the store's clients use, e.g. `UTC`, `Z`, `UTC+8`, `UTC-05:30`, `+08:00`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoneId(FixedOffset);

impl ZoneId {
    pub fn offset(&self) -> FixedOffset {
        self.0
    }
}

impl Default for ZoneId {
    fn default() -> Self {
        Self(FixedOffset::east_opt(8 * 3600).expect("UTC+8 is a valid offset"))
    }
}

impl Display for ZoneId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let secs = self.0.local_minus_utc();
        let sign = if secs < 0 { '-' } else { '+' };
        let secs = secs.unsigned_abs();
        let (hours, minutes) = (secs / 3600, (secs % 3600) / 60);
        if minutes == 0 {
            write!(f, "UTC{sign}{hours}")
        } else {
            write!(f, "UTC{sign}{hours}:{minutes:02}")
        }
    }
}

impl FromStr for ZoneId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidZoneId(s.to_owned());
        let trimmed = s.trim();
        let rest = trimmed
            .strip_prefix("UTC")
            .or_else(|| trimmed.strip_prefix("GMT"))
            .unwrap_or(trimmed);

        if rest.is_empty() || rest == "Z" {
            return FixedOffset::east_opt(0).map(Self).ok_or_else(invalid);
        }

        let (sign, body) = if let Some(body) = rest.strip_prefix('+') {
            (1, body)
        } else if let Some(body) = rest.strip_prefix('-') {
            (-1, body)
        } else {
            return Err(invalid());
        };
        let (hours, minutes) = match body.split_once(':') {
            Some((h, m)) => (h, m),
            None if body.len() == 4 && body.bytes().all(|b| b.is_ascii_digit()) => body.split_at(2),
            None => (body, "0"),
        };
        let hours: i32 = hours.parse().map_err(|_| invalid())?;
        let minutes: i32 = minutes.parse().map_err(|_| invalid())?;
        if !(0..=14).contains(&hours) || !(0..60).contains(&minutes) {
            return Err(invalid());
        }

        FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
            .map(Self)
            .ok_or_else(invalid)
    }
}
