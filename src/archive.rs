//! Download and extraction of the per-type daily archives.
//!
//! Archive URLs follow
//! `<base>/member/datazip/<Dir>/<year>/<TYPE><yymmdd>.zip`, where `<Dir>` is
//! the capitalised type code except for the two master-data archives.

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use url::Url;
use zip::ZipArchive;

use crate::calendar::EventCalendar;
use crate::error::LoaderError;
use crate::http_client::HttpClient;
use crate::models::{ARCHIVE_ROOT_PATH, Credentials, RaceDate, remote_dir_name};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Not an event date; nothing was requested.
    Skipped,
    /// Extracted member files, sorted by path.
    Fetched(Vec<PathBuf>),
}

pub struct ArchiveFetcher<C> {
    client: C,
    base_url: String,
    credentials: Credentials,
    calendar: EventCalendar,
}

impl<C: HttpClient> ArchiveFetcher<C> {
    pub fn new(
        client: C,
        base_url: impl Into<String>,
        credentials: Credentials,
        calendar: EventCalendar,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            credentials,
            calendar,
        }
    }

    #[must_use]
    pub fn calendar(&self) -> &EventCalendar {
        &self.calendar
    }

    pub fn archive_url(&self, zip_type: &str, date: RaceDate) -> Result<Url, LoaderError> {
        let base = Url::parse(&self.base_url)?;
        let path = format!(
            "{ARCHIVE_ROOT_PATH}/{}/{}/{}{}.zip",
            remote_dir_name(zip_type),
            date.year(),
            zip_type.to_uppercase(),
            date.yymmdd()
        );
        Ok(base.join(&path)?)
    }

    pub fn fetch_and_extract(
        &self,
        zip_type: &str,
        date: RaceDate,
        dest_dir: &Path,
    ) -> Result<FetchOutcome, LoaderError> {
        if !self.calendar.is_event_date(date) {
            return Ok(FetchOutcome::Skipped);
        }

        let url = self.archive_url(zip_type, date)?;
        info!(%url, "downloading archive");
        let response = self.client.get(url.as_str(), &self.credentials)?;
        if response.status != 200 {
            return Err(LoaderError::Upstream(format!(
                "archive download failed: status {}, url={url}",
                response.status
            )));
        }

        let files = extract_archive(&response.body, dest_dir)?;
        debug!(count = files.len(), dest = %dest_dir.display(), "archive extracted");
        Ok(FetchOutcome::Fetched(files))
    }
}

/// Validates `bytes` as a ZIP container and extracts every member into
/// `dest_dir`, returning the extracted files.
pub fn extract_archive(bytes: &[u8], dest_dir: &Path) -> Result<Vec<PathBuf>, LoaderError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|error| LoaderError::Archive(format!("file format is not valid: {error}")))?;

    let mut files = Vec::with_capacity(archive.len());
    for index in 0..archive.len() {
        let entry = archive.by_index(index)?;
        if entry.is_dir() {
            continue;
        }
        let Some(name) = entry.enclosed_name() else {
            return Err(LoaderError::Archive(format!(
                "member '{}' escapes the extraction directory",
                entry.name()
            )));
        };
        files.push(dest_dir.join(name));
    }

    fs::create_dir_all(dest_dir)?;
    archive.extract(dest_dir)?;
    files.sort();
    Ok(files)
}
