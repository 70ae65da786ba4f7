//! ISO-8601 durations as used by the ARM Service Bus resources
//! (`PT45S`, `P7D`, `P10675199DT2H48M5.4775807S`).

use std::time::Duration;

use super::errors::ManagementApiError;

const SECS_PER_MINUTE: u64 = 60;
const SECS_PER_HOUR: u64 = 60 * SECS_PER_MINUTE;
const SECS_PER_DAY: u64 = 24 * SECS_PER_HOUR;

/// Renders a duration with days, hours, minutes and seconds, omitting zero
/// components. Sub-second precision is kept to 7 digits (100ns ticks).
pub fn format(duration: Duration) -> String {
    let total = duration.as_secs();
    let days = total / SECS_PER_DAY;
    let hours = (total % SECS_PER_DAY) / SECS_PER_HOUR;
    let minutes = (total % SECS_PER_HOUR) / SECS_PER_MINUTE;
    let seconds = total % SECS_PER_MINUTE;
    let ticks = duration.subsec_nanos() / 100;

    let mut out = String::from("P");
    if days > 0 {
        out.push_str(&format!("{days}D"));
    }

    let has_time = hours > 0 || minutes > 0 || seconds > 0 || ticks > 0;
    if has_time || days == 0 {
        out.push('T');
    }
    if hours > 0 {
        out.push_str(&format!("{hours}H"));
    }
    if minutes > 0 {
        out.push_str(&format!("{minutes}M"));
    }
    if ticks > 0 {
        let fraction = format!("{ticks:07}");
        out.push_str(&format!("{seconds}.{}S", fraction.trim_end_matches('0')));
    } else if seconds > 0 || (!has_time && days == 0) {
        out.push_str(&format!("{seconds}S"));
    }
    out
}

/// Parses `P[nW][nD][T[nH][nM][n[.f]S]]`. Years and months are rejected
/// because they have no fixed length.
pub fn parse(text: &str) -> Result<Duration, ManagementApiError> {
    let invalid = || ManagementApiError::InvalidDuration(text.to_string());

    let rest = text.trim().strip_prefix('P').ok_or_else(invalid)?;
    if rest.is_empty() {
        return Err(invalid());
    }

    let (date_part, time_part) = match rest.split_once('T') {
        Some((date, time)) => {
            if time.is_empty() {
                return Err(invalid());
            }
            (date, Some(time))
        }
        None => (rest, None),
    };

    let mut total = Duration::ZERO;
    for (value, unit) in components(date_part).ok_or_else(invalid)? {
        let whole: u64 = value.parse().map_err(|_| invalid())?;
        let secs = match unit {
            'W' => whole * 7 * SECS_PER_DAY,
            'D' => whole * SECS_PER_DAY,
            _ => return Err(invalid()),
        };
        total += Duration::from_secs(secs);
    }

    if let Some(time_part) = time_part {
        for (value, unit) in components(time_part).ok_or_else(invalid)? {
            match unit {
                'H' => {
                    let whole: u64 = value.parse().map_err(|_| invalid())?;
                    total += Duration::from_secs(whole * SECS_PER_HOUR);
                }
                'M' => {
                    let whole: u64 = value.parse().map_err(|_| invalid())?;
                    total += Duration::from_secs(whole * SECS_PER_MINUTE);
                }
                'S' => total += parse_seconds(value).ok_or_else(invalid)?,
                _ => return Err(invalid()),
            }
        }
    }

    Ok(total)
}

fn components(text: &str) -> Option<Vec<(&str, char)>> {
    let mut out = Vec::new();
    let mut start = 0;
    for (idx, ch) in text.char_indices() {
        if ch.is_ascii_alphabetic() {
            let value = &text[start..idx];
            if value.is_empty() {
                return None;
            }
            out.push((value, ch));
            start = idx + ch.len_utf8();
        }
    }
    if start != text.len() {
        return None;
    }
    Some(out)
}

fn parse_seconds(value: &str) -> Option<Duration> {
    let (whole, fraction) = match value.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (value, ""),
    };
    let secs: u64 = whole.parse().ok()?;
    if !fraction.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let digits: String = fraction.chars().chain(std::iter::repeat('0')).take(9).collect();
    let nanos: u32 = digits.parse().ok()?;
    Some(Duration::new(secs, nanos))
}

/// Serde adapter for optional ISO-8601 duration fields.
pub mod option {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(duration) => serializer.serialize_str(&super::format(*duration)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<String>::deserialize(deserializer)?
            .map(|text| super::parse(&text).map_err(serde::de::Error::custom))
            .transpose()
    }
}
