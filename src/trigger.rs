use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

use crate::error::LoaderError;
use crate::models::{Credentials, RaceDate};

/// JST is nine hours ahead of UTC all year.
const JST_OFFSET_HOURS: i64 = 9;

/// Outer message as delivered by the scheduler queue. Fields other than
/// `data` and `debug` (such as `@type` or `attributes`) are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    pub data: String,
    #[serde(default)]
    pub debug: bool,
}

#[derive(Deserialize)]
struct Payload {
    account: String,
    password: String,
    mode: String,
    #[serde(default)]
    start_date: Option<String>,
    #[serde(default)]
    end_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunMode {
    /// Finalised results of the past week.
    Confirmed,
    /// Advance data for the coming race day.
    Previous,
    Manual {
        start: RaceDate,
        end: Option<RaceDate>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trigger {
    pub credentials: Credentials,
    pub mode: RunMode,
    pub debug: bool,
}

/// Inclusive range of dates to process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: RaceDate,
    pub end: RaceDate,
}

impl DateRange {
    /// Every date from `start` through `end`; empty when `end < start`.
    pub fn days(&self) -> Result<Vec<RaceDate>, LoaderError> {
        let mut days = Vec::new();
        let mut current = self.start;
        while current <= self.end {
            days.push(current);
            current = current.add_days(1)?;
        }
        Ok(days)
    }
}

impl RunMode {
    pub fn date_range(&self, today: RaceDate) -> Result<DateRange, LoaderError> {
        match self {
            Self::Confirmed => Ok(DateRange {
                start: today.add_days(-7)?,
                end: today.add_days(-1)?,
            }),
            Self::Previous => Ok(DateRange {
                start: today.add_days(1)?,
                end: today.add_days(2)?,
            }),
            Self::Manual { start, end } => Ok(DateRange {
                start: *start,
                end: match end {
                    Some(end) => *end,
                    None => start.add_days(1)?,
                },
            }),
        }
    }
}

pub fn decode_envelope(raw: &str) -> Result<Trigger, LoaderError> {
    let envelope = serde_json::from_str::<Envelope>(raw)
        .map_err(|error| LoaderError::Decode(format!("invalid trigger envelope: {error}")))?;
    let (credentials, mode) = decode_payload(&envelope.data)?;
    Ok(Trigger {
        credentials,
        mode,
        debug: envelope.debug,
    })
}

/// Decodes the base64 JSON payload carried in the envelope's `data` field.
pub fn decode_payload(data: &str) -> Result<(Credentials, RunMode), LoaderError> {
    let bytes = STANDARD.decode(data.trim())?;
    let payload = serde_json::from_slice::<Payload>(&bytes)
        .map_err(|error| LoaderError::Decode(format!("invalid trigger payload: {error}")))?;

    let mode = match payload.mode.as_str() {
        "confirmed" => RunMode::Confirmed,
        "previous" => RunMode::Previous,
        _ => {
            let start = non_blank(payload.start_date).ok_or_else(|| {
                LoaderError::Decode(format!(
                    "mode '{}' is a manual run and requires start_date",
                    payload.mode
                ))
            })?;
            RunMode::Manual {
                start: RaceDate::parse_iso(&start)?,
                end: non_blank(payload.end_date)
                    .map(|end| RaceDate::parse_iso(&end))
                    .transpose()?,
            }
        }
    };

    Ok((Credentials::new(payload.account, payload.password), mode))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

/// The calendar date in Japan at `now`; race days follow the JST calendar.
#[must_use]
pub fn today_in_japan(now: DateTime<Utc>) -> RaceDate {
    let japan_now = now + Duration::hours(JST_OFFSET_HOURS);
    RaceDate::new(japan_now.date_naive())
}
