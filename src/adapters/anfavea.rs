//! ANFAVEA: vehicle production, export and licensing figures.
//!
//! The homepage shows the date of the latest monthly press release; the data
//! itself ships as an XLSX workbook linked from the spreadsheet-editions page.

use std::io::Cursor;

use calamine::{DataType, Reader, Xlsx};
use chrono::{Datelike, NaiveDate};
use tracing::info;

use crate::adapters::html::{links, tag_blocks};
use crate::adapters::http::HttpClient;
use crate::domain::catalog::{Catalog, IndicatorDefinition};
use crate::domain::dates::{first_of_month, parse_day_first, previous_month};
use crate::domain::error::MacropostError;
use crate::domain::schedule::ScheduledRelease;
use crate::domain::series::{FetchOutcome, ObservationSeries};
use crate::ports::calendar_port::CalendarPort;
use crate::ports::series_port::SeriesPort;

const HOME_URL: &str = "https://anfavea.com.br/site/";
const EDITIONS_URL: &str = "https://anfavea.com.br/site/edicoes-em-excel/";

/// Header rows above the data in the history worksheet.
const HEADER_ROWS: usize = 5;

pub struct AnfaveaCalendar<'a> {
    http: &'a HttpClient,
    url: String,
}

impl<'a> AnfaveaCalendar<'a> {
    pub fn new(http: &'a HttpClient) -> Self {
        Self {
            http,
            url: HOME_URL.to_string(),
        }
    }

    pub fn with_url(http: &'a HttpClient, url: &str) -> Self {
        Self {
            http,
            url: url.to_string(),
        }
    }

    /// The first dated `<h4>` on the homepage is the latest release date.
    fn release_date(html: &str) -> Option<NaiveDate> {
        tag_blocks(html, "h4")
            .iter()
            .find_map(|h| parse_day_first(h))
    }
}

impl CalendarPort for AnfaveaCalendar<'_> {
    fn releases_for(
        &self,
        catalog: &Catalog,
        today: NaiveDate,
    ) -> Result<Vec<ScheduledRelease>, MacropostError> {
        let html = self
            .http
            .get_text(&self.url)
            .map_err(|e| MacropostError::CalendarUnavailable {
                source_name: "anfavea".to_string(),
                reason: e.to_string(),
            })?;
        let Some(latest) = Self::release_date(&html) else {
            return Err(MacropostError::CalendarParse {
                source_name: "anfavea".to_string(),
                reason: "no dated headline found on homepage".to_string(),
            });
        };
        if latest != today {
            info!(%latest, %today, "no ANFAVEA release for today");
            return Ok(Vec::new());
        }
        // The release always covers the previous calendar month.
        let reference = previous_month(today);
        Ok(catalog
            .definitions()
            .iter()
            .map(|def| ScheduledRelease {
                indicator: def.name.clone(),
                reference,
                time: None,
            })
            .collect())
    }
}

pub struct AnfaveaSeries<'a> {
    http: &'a HttpClient,
    editions_url: String,
}

impl<'a> AnfaveaSeries<'a> {
    pub fn new(http: &'a HttpClient) -> Self {
        Self {
            http,
            editions_url: EDITIONS_URL.to_string(),
        }
    }

    pub fn with_editions_url(http: &'a HttpClient, url: &str) -> Self {
        Self {
            http,
            editions_url: url.to_string(),
        }
    }

    /// Link to the all-segments history workbook on the editions page.
    fn workbook_href(html: &str) -> Option<String> {
        links(html)
            .into_iter()
            .find(|(text, href)| {
                text.to_lowercase().contains("total)") && href.to_lowercase().contains(".xlsx")
            })
            .map(|(_, href)| href)
    }

    fn parse_workbook(
        bytes: &[u8],
        definition: &IndicatorDefinition,
    ) -> Result<ObservationSeries, MacropostError> {
        let cursor = Cursor::new(bytes.to_vec());
        let mut workbook = Xlsx::new(cursor).map_err(|e| MacropostError::SeriesFetch {
            indicator: definition.name.clone(),
            reason: format!("workbook open: {e}"),
        })?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| MacropostError::SeriesFetch {
                indicator: definition.name.clone(),
                reason: "workbook has no sheets".to_string(),
            })?
            .map_err(|e| MacropostError::SeriesFetch {
                indicator: definition.name.clone(),
                reason: format!("worksheet read: {e}"),
            })?;

        let width = definition.columns.len();
        let mut rows = Vec::new();
        for row in range.rows().skip(HEADER_ROWS) {
            let Some(date) = row.first().and_then(|c| c.as_datetime()).map(|dt| dt.date())
            else {
                continue;
            };
            // Months are keyed by their first day regardless of how the
            // spreadsheet stamps them.
            let Some(month) = first_of_month(date.year(), date.month()) else {
                continue;
            };
            let values: Vec<f64> = row
                .get(1..=width)
                .unwrap_or_default()
                .iter()
                .filter_map(|c| c.as_f64())
                .collect();
            if values.len() == width {
                rows.push((month, values));
            }
        }
        rows.sort_by_key(|(d, _)| *d);
        rows.dedup_by_key(|(d, _)| *d);

        Ok(ObservationSeries {
            name: definition.name.clone(),
            columns: definition.columns.clone(),
            rows,
        })
    }
}

impl SeriesPort for AnfaveaSeries<'_> {
    fn fetch(
        &self,
        definition: &IndicatorDefinition,
        reference: NaiveDate,
    ) -> Result<FetchOutcome, MacropostError> {
        let page = self
            .http
            .get_text(&self.editions_url)
            .map_err(|e| MacropostError::SeriesFetch {
                indicator: definition.name.clone(),
                reason: e.to_string(),
            })?;
        let Some(href) = Self::workbook_href(&page) else {
            return Err(MacropostError::SeriesFetch {
                indicator: definition.name.clone(),
                reason: "history workbook link not found".to_string(),
            });
        };
        let url = absolute_url(&self.editions_url, &href);
        let bytes = self
            .http
            .get_bytes(&url)
            .map_err(|e| MacropostError::SeriesFetch {
                indicator: definition.name.clone(),
                reason: e.to_string(),
            })?;

        let mut series = Self::parse_workbook(&bytes, definition)?;
        series.scale(definition.multiplier);
        // Some editions already carry a provisional row for the month in
        // progress; keep it out of the freshness gate.
        series.drop_month_in_progress(reference);
        Ok(series.into_outcome(reference))
    }
}

fn absolute_url(base: &str, href: &str) -> String {
    match reqwest::Url::parse(base).and_then(|b| b.join(href)) {
        Ok(url) => url.to_string(),
        Err(_) => href.to_string(),
    }
}
