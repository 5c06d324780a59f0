use jrdb_fwf_to_csv::ConvertOptions;
use tracing::{error, info};

use crate::archive::ArchiveFetcher;
use crate::calendar::EventCalendar;
use crate::config::LoaderConfig;
use crate::dispatch::{DispatchReport, UploadDispatcher};
use crate::error::LoaderError;
use crate::http_client::HttpClient;
use crate::layouts::LayoutCatalog;
use crate::models::{RaceDate, ZIP_TYPES};
use crate::storage::ObjectStore;
use crate::trigger::{DateRange, Trigger};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunResult {
    NotEventDate,
    /// The fetcher found nothing to download.
    Skipped,
    Completed {
        uploaded: usize,
        skipped: usize,
        failed: usize,
    },
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub date: RaceDate,
    /// `None` for dates that were never attempted.
    pub zip_type: Option<String>,
    pub result: RunResult,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub event_dates: usize,
    pub completed: usize,
    pub failed: usize,
    pub files_uploaded: usize,
    pub files_failed: usize,
}

impl RunSummary {
    #[must_use]
    pub fn from_outcomes(outcomes: &[RunOutcome]) -> Self {
        let mut summary = Self::default();
        let mut last_event_date = None;
        for outcome in outcomes {
            if outcome.zip_type.is_some() && last_event_date != Some(outcome.date) {
                summary.event_dates += 1;
                last_event_date = Some(outcome.date);
            }
            match &outcome.result {
                RunResult::Completed {
                    uploaded, failed, ..
                } => {
                    summary.completed += 1;
                    summary.files_uploaded += uploaded;
                    summary.files_failed += failed;
                }
                RunResult::Failed(_) => summary.failed += 1,
                RunResult::NotEventDate | RunResult::Skipped => {}
            }
        }
        summary
    }
}

/// Runs every zip type for every event date in `range`.
///
/// A failing (date, zip type) pair is logged and recorded; it never stops the
/// pairs after it.
pub fn run_range<C, S>(
    dispatcher: &UploadDispatcher<C, S>,
    range: DateRange,
    zip_types: &[&str],
) -> Result<Vec<RunOutcome>, LoaderError>
where
    C: HttpClient,
    S: ObjectStore,
{
    let mut outcomes = Vec::new();
    for date in range.days()? {
        if !dispatcher.fetcher().calendar().is_event_date(date) {
            outcomes.push(RunOutcome {
                date,
                zip_type: None,
                result: RunResult::NotEventDate,
            });
            continue;
        }

        info!(date = %date, "start download");
        for zip_type in zip_types {
            let result = match dispatcher.process_zip_type(zip_type, date) {
                Ok(DispatchReport::Skipped) => RunResult::Skipped,
                Ok(report) => RunResult::Completed {
                    uploaded: report.uploaded(),
                    skipped: report.skipped(),
                    failed: report.failed(),
                },
                Err(err) => {
                    error!(date = %date, zip_type, error = %err, "zip type failed");
                    RunResult::Failed(err.to_string())
                }
            };
            outcomes.push(RunOutcome {
                date,
                zip_type: Some((*zip_type).to_string()),
                result,
            });
        }
    }
    Ok(outcomes)
}

/// Handles one decoded trigger: loads the event calendar, resolves the date
/// range from `today`, and processes the configured zip types.
pub fn run_trigger<C, S>(
    trigger: &Trigger,
    config: &LoaderConfig,
    client: C,
    store: S,
    layouts: LayoutCatalog,
    today: RaceDate,
) -> Result<Vec<RunOutcome>, LoaderError>
where
    C: HttpClient,
    S: ObjectStore,
{
    let range = trigger.mode.date_range(today)?;
    info!(start_date = %range.start, end_date = %range.end, mode = ?trigger.mode, "resolved date range");
    info!(file_types = ?layouts.file_types().collect::<Vec<_>>(), "layouts ready");

    let calendar = EventCalendar::load(&client, &config.base_url, &trigger.credentials)?;
    let fetcher = ArchiveFetcher::new(client, config.base_url.clone(), trigger.credentials.clone(), calendar);
    let dispatcher = UploadDispatcher::new(fetcher, layouts, store, ConvertOptions::default());

    let outcomes = run_range(&dispatcher, range, &ZIP_TYPES)?;
    let summary = RunSummary::from_outcomes(&outcomes);
    info!(
        event_dates = summary.event_dates,
        completed = summary.completed,
        failed = summary.failed,
        files_uploaded = summary.files_uploaded,
        files_failed = summary.files_failed,
        "run finished"
    );
    Ok(outcomes)
}
