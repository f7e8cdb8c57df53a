//! Shared mocks and builders for the scheduler integration tests.

use std::cell::RefCell;
use std::collections::HashMap;

use chrono::NaiveDate;
use macropost::domain::catalog::{Catalog, ChartTemplate, IndicatorDefinition, TextTemplate};
use macropost::domain::error::MacropostError;
use macropost::domain::schedule::ScheduledRelease;
use macropost::domain::series::{FetchOutcome, ObservationSeries};
use macropost::domain::source::SourceId;
use macropost::ports::calendar_port::CalendarPort;
use macropost::ports::post_log_port::PostLogStore;
use macropost::ports::publisher_port::{PreparedPost, PublisherPort};
use macropost::ports::series_port::SeriesPort;

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn definition(name: &str) -> IndicatorDefinition {
    IndicatorDefinition {
        name: name.to_string(),
        title: name.to_uppercase(),
        series_codes: vec!["433".to_string()],
        columns: vec!["MoM".to_string()],
        multiplier: 1.0,
        raw: false,
        chart: ChartTemplate::Line,
        text: TextTemplate::Percent,
        subtitle: None,
    }
}

pub fn catalog(source: SourceId, names: &[&str]) -> Catalog {
    Catalog::new(source, names.iter().map(|n| definition(n)).collect())
}

/// A one-column series ending at `last`, long enough to chart.
pub fn fresh_series(name: &str, last: NaiveDate) -> ObservationSeries {
    ObservationSeries {
        name: name.to_string(),
        columns: vec!["MoM".to_string()],
        rows: vec![
            (last.pred_opt().unwrap(), vec![0.3]),
            (last, vec![0.5]),
        ],
    }
}

pub struct MockCalendar {
    pub releases: Vec<ScheduledRelease>,
    pub fail: bool,
}

impl MockCalendar {
    pub fn with_releases(names: &[&str], reference: NaiveDate) -> Self {
        Self {
            releases: names
                .iter()
                .map(|n| ScheduledRelease {
                    indicator: n.to_string(),
                    reference,
                    time: None,
                })
                .collect(),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            releases: Vec::new(),
            fail: true,
        }
    }
}

impl CalendarPort for MockCalendar {
    fn releases_for(
        &self,
        _catalog: &Catalog,
        _today: NaiveDate,
    ) -> Result<Vec<ScheduledRelease>, MacropostError> {
        if self.fail {
            return Err(MacropostError::CalendarUnavailable {
                source_name: "mock".to_string(),
                reason: "connection refused".to_string(),
            });
        }
        Ok(self.releases.clone())
    }
}

#[derive(Default)]
pub struct MockSeries {
    pub outcomes: HashMap<String, FetchOutcome>,
    pub errors: Vec<String>,
    pub fetched: RefCell<Vec<String>>,
}

impl MockSeries {
    pub fn with_outcome(mut self, name: &str, outcome: FetchOutcome) -> Self {
        self.outcomes.insert(name.to_string(), outcome);
        self
    }

    pub fn with_error(mut self, name: &str) -> Self {
        self.errors.push(name.to_string());
        self
    }

    pub fn fetch_count(&self, name: &str) -> usize {
        self.fetched.borrow().iter().filter(|n| *n == name).count()
    }
}

impl SeriesPort for MockSeries {
    fn fetch(
        &self,
        definition: &IndicatorDefinition,
        _reference: NaiveDate,
    ) -> Result<FetchOutcome, MacropostError> {
        self.fetched.borrow_mut().push(definition.name.clone());
        if self.errors.contains(&definition.name) {
            return Err(MacropostError::SeriesFetch {
                indicator: definition.name.clone(),
                reason: "boom".to_string(),
            });
        }
        self.outcomes
            .get(&definition.name)
            .cloned()
            .ok_or_else(|| MacropostError::SeriesFetch {
                indicator: definition.name.clone(),
                reason: "no outcome configured".to_string(),
            })
    }
}

/// In-memory log store; `record` can be made to fail.
#[derive(Default)]
pub struct MemoryLog {
    pub entries: Vec<(SourceId, String)>,
    pub fail_record: bool,
}

impl PostLogStore for MemoryLog {
    fn already_posted(&self, source: SourceId, indicator: &str) -> bool {
        self.entries
            .iter()
            .any(|(s, i)| *s == source && i == indicator)
    }

    fn record(&mut self, source: SourceId, indicator: &str) -> Result<(), MacropostError> {
        if self.fail_record {
            return Err(MacropostError::LogStore {
                reason: "disk full".to_string(),
            });
        }
        self.entries.push((source, indicator.to_string()));
        Ok(())
    }
}

#[derive(Default)]
pub struct MockPublisher {
    pub published: RefCell<Vec<PreparedPost>>,
    pub fail: bool,
}

impl MockPublisher {
    pub fn failing() -> Self {
        Self {
            published: RefCell::new(Vec::new()),
            fail: true,
        }
    }

    pub fn count(&self) -> usize {
        self.published.borrow().len()
    }
}

impl PublisherPort for MockPublisher {
    fn publish(&self, post: &PreparedPost) -> Result<(), MacropostError> {
        if self.fail {
            return Err(MacropostError::Publish {
                indicator: post.indicator.clone(),
                reason: "gateway timeout".to_string(),
            });
        }
        self.published.borrow_mut().push(post.clone());
        Ok(())
    }
}
