use std::fs;
use std::path::Path;

use jrdb_fwf_to_csv::{ConvertOptions, Layout, convert_file};
use tempfile::TempDir;
use tracing::{debug, error, info, warn};

use crate::archive::{ArchiveFetcher, FetchOutcome};
use crate::error::LoaderError;
use crate::http_client::HttpClient;
use crate::layouts::LayoutCatalog;
use crate::models::{RaceDate, csv_file_name, file_type_of, upload_object_name};
use crate::storage::ObjectStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    Uploaded {
        object_name: String,
        bytes: u64,
        rows: usize,
        truncated_rows: usize,
    },
    /// No layout is known for the file type.
    Skipped { file_name: String, file_type: String },
    Failed { file_name: String, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchReport {
    /// No archive was available for the date.
    Skipped,
    Processed(Vec<FileOutcome>),
}

impl DispatchReport {
    #[must_use]
    pub fn files(&self) -> &[FileOutcome] {
        match self {
            Self::Skipped => &[],
            Self::Processed(files) => files,
        }
    }

    #[must_use]
    pub fn uploaded(&self) -> usize {
        self.count(|outcome| matches!(outcome, FileOutcome::Uploaded { .. }))
    }

    #[must_use]
    pub fn skipped(&self) -> usize {
        self.count(|outcome| matches!(outcome, FileOutcome::Skipped { .. }))
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(|outcome| matches!(outcome, FileOutcome::Failed { .. }))
    }

    fn count(&self, predicate: impl Fn(&FileOutcome) -> bool) -> usize {
        self.files().iter().filter(|outcome| predicate(outcome)).count()
    }
}

pub struct UploadDispatcher<C, S> {
    fetcher: ArchiveFetcher<C>,
    layouts: LayoutCatalog,
    store: S,
    options: ConvertOptions,
}

impl<C, S> UploadDispatcher<C, S>
where
    C: HttpClient,
    S: ObjectStore,
{
    pub fn new(
        fetcher: ArchiveFetcher<C>,
        layouts: LayoutCatalog,
        store: S,
        options: ConvertOptions,
    ) -> Self {
        Self {
            fetcher,
            layouts,
            store,
            options,
        }
    }

    #[must_use]
    pub fn fetcher(&self) -> &ArchiveFetcher<C> {
        &self.fetcher
    }

    /// Fetches, converts and uploads one archive type for one date.
    ///
    /// Fetch and extraction errors are returned; a failure on a single member
    /// file is recorded in the report and the remaining files still run. The
    /// scratch directory is removed when this returns, whatever the outcome.
    pub fn process_zip_type(&self, zip_type: &str, date: RaceDate) -> Result<DispatchReport, LoaderError> {
        let scratch = TempDir::new()?;
        let extract_dir = scratch.path().join("extracted");
        let converted_dir = scratch.path().join("converted");

        let files = match self.fetcher.fetch_and_extract(zip_type, date, &extract_dir)? {
            FetchOutcome::Skipped => return Ok(DispatchReport::Skipped),
            FetchOutcome::Fetched(files) => files,
        };
        fs::create_dir_all(&converted_dir)?;

        let outcomes = files
            .iter()
            .map(|source| self.process_file(zip_type, date, source, &converted_dir))
            .collect();
        Ok(DispatchReport::Processed(outcomes))
    }

    fn process_file(&self, zip_type: &str, date: RaceDate, source: &Path, converted_dir: &Path) -> FileOutcome {
        let file_name = source
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let file_type = file_type_of(&file_name);
        debug!(file = %file_name, file_type = %file_type, "dispatching extracted file");

        let Some(layout) = self.layouts.get(&file_type) else {
            info!(file = %file_name, file_type = %file_type, "no layout for file type, skipping");
            return FileOutcome::Skipped {
                file_name,
                file_type,
            };
        };

        match self.convert_and_upload(zip_type, date, source, &file_name, &file_type, layout, converted_dir) {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(
                    date = %date,
                    zip_type,
                    file = %file_name,
                    error = %err,
                    "failed to convert or upload file"
                );
                FileOutcome::Failed {
                    file_name,
                    message: err.to_string(),
                }
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn convert_and_upload(
        &self,
        zip_type: &str,
        date: RaceDate,
        source: &Path,
        file_name: &str,
        file_type: &str,
        layout: &Layout,
        converted_dir: &Path,
    ) -> Result<FileOutcome, LoaderError> {
        let csv_name = csv_file_name(file_name);
        let converted = converted_dir.join(&csv_name);
        let report = convert_file(source, &converted, layout, &self.options)?;
        if report.truncated_rows > 0 {
            warn!(
                file = file_name,
                truncated = report.truncated_rows,
                rows = report.row_count,
                "some rows were shorter than the layout"
            );
        }

        let object_name = upload_object_name(date, zip_type, file_type, &csv_name);
        let bytes = self.store.put_file(&object_name, &converted)?;
        info!(object = %object_name, bytes, rows = report.row_count, "file uploaded");

        Ok(FileOutcome::Uploaded {
            object_name,
            bytes,
            rows: report.row_count,
            truncated_rows: report.truncated_rows,
        })
    }
}
