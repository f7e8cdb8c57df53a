//! Per-source orchestration loop.
//!
//! For every release scheduled today: skip if already logged, fetch and
//! freshness-validate the series, render and publish, then record the post.
//! Failures are contained per indicator; nothing here aborts a source run.

use chrono::NaiveDate;
use tracing::{error, info, warn};

use crate::domain::catalog::Catalog;
use crate::domain::series::FetchOutcome;
use crate::domain::source::SourceId;
use crate::ports::calendar_port::CalendarPort;
use crate::ports::post_log_port::PostLogStore;
use crate::ports::publisher_port::PublisherPort;
use crate::ports::render_port::RendererPort;
use crate::ports::series_port::SeriesPort;

/// Counters for one source run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RunSummary {
    pub source: Option<SourceId>,
    pub processed_count: usize,
    pub error_count: usize,
    pub already_posted_count: usize,
    pub no_data_count: usize,
}

impl RunSummary {
    fn new(source: SourceId) -> Self {
        Self {
            source: Some(source),
            ..Self::default()
        }
    }
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = self.source.map(|s| s.display_name()).unwrap_or("?");
        write!(
            f,
            "{name} scheduler: processed {} new indicators, \
             {} errors encountered, \
             {} indicators already posted, \
             {} indicators without fresh data.",
            self.processed_count, self.error_count, self.already_posted_count, self.no_data_count
        )
    }
}

/// The collaborators for one source, bundled for the umbrella runner.
pub struct SourceRun<'a> {
    pub source: SourceId,
    pub catalog: &'a Catalog,
    pub calendar: &'a dyn CalendarPort,
    pub series: &'a dyn SeriesPort,
    pub renderer: &'a dyn RendererPort,
    pub publisher: &'a dyn PublisherPort,
}

/// Process one source for `today` and return its summary.
pub fn run_source(
    run: &SourceRun<'_>,
    log: &mut dyn PostLogStore,
    today: NaiveDate,
) -> RunSummary {
    let source = run.source;
    let mut summary = RunSummary::new(source);
    info!(source = source.as_str(), "starting source run");

    let releases = match run.calendar.releases_for(run.catalog, today) {
        Ok(releases) => releases,
        Err(e) => {
            warn!(source = source.as_str(), error = %e, "calendar unavailable");
            return summary;
        }
    };
    if releases.is_empty() {
        info!(source = source.as_str(), "no releases scheduled for today");
        return summary;
    }
    info!(
        source = source.as_str(),
        count = releases.len(),
        "releases scheduled for today"
    );

    for release in &releases {
        let indicator = release.indicator.as_str();
        if log.already_posted(source, indicator) {
            info!(source = source.as_str(), indicator, "already posted");
            summary.already_posted_count += 1;
            continue;
        }
        // The calendar join guarantees a definition exists; a miss here means
        // the adapter produced a name the catalog does not know.
        let Some(definition) = run.catalog.by_name(indicator) else {
            warn!(source = source.as_str(), indicator, "release without catalog entry");
            continue;
        };

        info!(source = source.as_str(), indicator, reference = %release.reference, "fetching series");
        match run.series.fetch(definition, release.reference) {
            Err(e) => {
                error!(source = source.as_str(), indicator, error = %e, "series fetch failed");
                summary.error_count += 1;
            }
            Ok(FetchOutcome::NoData) => {
                warn!(source = source.as_str(), indicator, "no data returned");
                summary.no_data_count += 1;
            }
            Ok(FetchOutcome::Stale { latest, expected }) => {
                warn!(
                    source = source.as_str(),
                    indicator,
                    latest = %latest,
                    expected = %expected,
                    "data not yet updated at the source"
                );
                summary.no_data_count += 1;
            }
            Ok(FetchOutcome::Fresh(series)) => {
                let published = run
                    .renderer
                    .prepare(definition, &series)
                    .and_then(|post| run.publisher.publish(&post));
                match published {
                    Ok(()) => {
                        info!(source = source.as_str(), indicator, "post published");
                        if let Err(e) = log.record(source, indicator) {
                            // The post went out; the next period will not
                            // re-check this entry, but this run might.
                            error!(source = source.as_str(), indicator, error = %e, "failed to record post");
                        }
                        summary.processed_count += 1;
                    }
                    Err(e) => {
                        error!(source = source.as_str(), indicator, error = %e, "publish failed");
                        summary.error_count += 1;
                    }
                }
            }
        }
    }

    summary
}

/// Run every source sequentially and concatenate the summary lines.
pub fn run_all(
    runs: &[SourceRun<'_>],
    logs: &mut [&mut dyn PostLogStore],
    today: NaiveDate,
) -> String {
    let mut lines = Vec::with_capacity(runs.len());
    for (run, log) in runs.iter().zip(logs.iter_mut()) {
        lines.push(run_source(run, &mut **log, today).to_string());
    }
    lines.join("\n")
}
