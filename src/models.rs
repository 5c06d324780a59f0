use std::fmt::{self, Debug, Display, Formatter};
use std::path::Path;

use chrono::{Datelike, Duration, NaiveDate};

use crate::error::LoaderError;

pub const DEFAULT_BASE_URL: &str = "http://www.jrdb.com";
pub const DEFAULT_BUCKET: &str = "ca5-jrdb";
pub const DEFAULT_LAYOUT_DIR: &str = "metadata";
pub const EVENT_INDEX_PATH: &str = "member/datazip/Kab/index.html";
pub const ARCHIVE_ROOT_PATH: &str = "member/datazip";
pub const UPLOAD_ROOT: &str = "raw";

/// Archives fetched for every event date, in processing order.
pub const ZIP_TYPES: [&str; 4] = ["sed", "kza", "cza", "kta"];

/// File types with a published fixed-width layout.
pub const LAYOUT_FILE_TYPES: [&str; 3] = ["sed", "srb", "kta"];

/// Master-data archives whose directory does not follow the capitalised code.
const IRREGULAR_DIRS: [(&str, &str); 2] = [("cza", "Cs"), ("kza", "Ks")];

/// A race-calendar date.
///
/// The `YYMMDD` key and the ISO form are both formatted from the single
/// stored date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RaceDate(NaiveDate);

impl RaceDate {
    #[must_use]
    pub const fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    pub fn from_ymd(year: i32, month: u32, day: u32) -> Result<Self, LoaderError> {
        NaiveDate::from_ymd_opt(year, month, day)
            .map(Self)
            .ok_or_else(|| LoaderError::Validation(format!("invalid date {year}-{month}-{day}")))
    }

    pub fn parse_iso(value: &str) -> Result<Self, LoaderError> {
        let date = NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|error| {
            LoaderError::Validation(format!("invalid date '{value}', expected YYYY-MM-DD: {error}"))
        })?;
        Ok(Self(date))
    }

    #[must_use]
    pub const fn date(self) -> NaiveDate {
        self.0
    }

    #[must_use]
    pub fn year(self) -> i32 {
        self.0.year()
    }

    #[must_use]
    pub fn yymmdd(self) -> String {
        self.0.format("%y%m%d").to_string()
    }

    #[must_use]
    pub fn iso(self) -> String {
        self.0.format("%Y-%m-%d").to_string()
    }

    pub fn add_days(self, days: i64) -> Result<Self, LoaderError> {
        self.0
            .checked_add_signed(Duration::days(days))
            .map(Self)
            .ok_or_else(|| LoaderError::Validation(format!("date {self} {days:+} days is out of range")))
    }
}

impl Display for RaceDate {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.iso())
    }
}

impl From<NaiveDate> for RaceDate {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub account: String,
    pub password: String,
}

impl Credentials {
    #[must_use]
    pub fn new(account: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            password: password.into(),
        }
    }
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("account", &self.account)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// File type of an extracted member: the leading run of non-digit
/// characters of its name, lowercased (`SED261011.txt` is `sed`).
#[must_use]
pub fn file_type_of(file_name: &str) -> String {
    file_name
        .chars()
        .take_while(|ch| !ch.is_ascii_digit())
        .collect::<String>()
        .to_lowercase()
}

/// First path segment of an archive type on the members site.
#[must_use]
pub fn remote_dir_name(zip_type: &str) -> String {
    if let Some((_, dir)) = IRREGULAR_DIRS.iter().find(|(code, _)| *code == zip_type) {
        return (*dir).to_string();
    }

    let mut chars = zip_type.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `SED261011.txt` becomes `SED261011.csv`; a name without extension gets one.
#[must_use]
pub fn csv_file_name(file_name: &str) -> String {
    Path::new(file_name)
        .with_extension("csv")
        .to_string_lossy()
        .into_owned()
}

#[must_use]
pub fn upload_object_name(date: RaceDate, zip_type: &str, file_type: &str, file_name: &str) -> String {
    format!(
        "{UPLOAD_ROOT}/dt={}/zip_type={zip_type}/file_type={file_type}/{file_name}",
        date.iso()
    )
}
