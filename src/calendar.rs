use std::collections::BTreeSet;

use regex::Regex;
use tracing::{debug, info};
use url::Url;

use crate::error::LoaderError;
use crate::http_client::HttpClient;
use crate::models::{Credentials, EVENT_INDEX_PATH, RaceDate};

pub fn event_index_url(base_url: &str) -> Result<Url, LoaderError> {
    let base = Url::parse(base_url)?;
    Ok(base.join(EVENT_INDEX_PATH)?)
}

pub fn fetch_event_dates<C: HttpClient>(
    client: &C,
    base_url: &str,
    credentials: &Credentials,
) -> Result<BTreeSet<String>, LoaderError> {
    let url = event_index_url(base_url)?;
    let response = client.get(url.as_str(), credentials)?;
    debug!(status = response.status, %url, "fetched event index");
    if !response.is_success() {
        return Err(LoaderError::Upstream(format!(
            "failed to fetch event index: status {}",
            response.status
        )));
    }

    let html = String::from_utf8_lossy(&response.body);
    extract_event_dates(&html)
}

/// Collects `YYMMDD` keys from the anchors of the second `<ul>` on the page.
///
/// Anchor text looks like `KAB261011.zip`; characters 3..9 of the text, as
/// written, are the date. Anything that does not fit is skipped rather than
/// reported. Lists are matched without nesting, so a `<ul>` inside the first
/// list ends it early and shifts which list counts as second.
pub fn extract_event_dates(html: &str) -> Result<BTreeSet<String>, LoaderError> {
    let list_re = Regex::new(r"(?is)<ul\b[^>]*>(?P<body>.*?)</ul>")
        .map_err(|error| LoaderError::Internal(error.to_string()))?;
    let anchor_re = Regex::new(r"(?is)<a\b[^>]*>(?P<text>.*?)</a>")
        .map_err(|error| LoaderError::Internal(error.to_string()))?;

    let Some(list) = list_re
        .captures_iter(html)
        .nth(1)
        .and_then(|capture| capture.name("body"))
    else {
        return Ok(BTreeSet::new());
    };

    let mut dates = BTreeSet::new();
    for capture in anchor_re.captures_iter(list.as_str()) {
        let raw_text = capture
            .name("text")
            .map(|value| value.as_str())
            .unwrap_or_default();
        let text = strip_html_tags(raw_text);
        let key = text.chars().skip(3).take(6).collect::<String>();
        if key.chars().count() == 6 {
            dates.insert(key);
        }
    }

    Ok(dates)
}

fn strip_html_tags(input: &str) -> String {
    let tags_re = Regex::new(r"(?is)<[^>]+>").expect("hardcoded HTML tags regex is valid");
    tags_re.replace_all(input, "").to_string()
}

/// Event dates published on the members index, loaded once per run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventCalendar {
    dates: BTreeSet<String>,
}

impl EventCalendar {
    pub fn load<C: HttpClient>(
        client: &C,
        base_url: &str,
        credentials: &Credentials,
    ) -> Result<Self, LoaderError> {
        let dates = fetch_event_dates(client, base_url, credentials)?;
        info!(count = dates.len(), "loaded event dates");
        Ok(Self { dates })
    }

    pub fn from_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            dates: keys.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn dates(&self) -> &BTreeSet<String> {
        &self.dates
    }

    /// Non-event days are routine; they are logged, never reported as errors.
    #[must_use]
    pub fn is_event_date(&self, date: RaceDate) -> bool {
        let key = date.yymmdd();
        if self.dates.contains(&key) {
            true
        } else {
            info!(date = %key, "not an event date, skipping");
            false
        }
    }
}
