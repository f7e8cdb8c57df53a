//! IBGE: release calendar page and SIDRA values API.

use chrono::{NaiveDate, NaiveTime};
use serde_json::Value;
use tracing::{info, warn};

use crate::adapters::html::{class_blocks, strip_tags};
use crate::adapters::http::HttpClient;
use crate::domain::catalog::{Catalog, IndicatorDefinition};
use crate::domain::dates::{parse_day_first, parse_reference_period};
use crate::domain::error::MacropostError;
use crate::domain::schedule::{releases_for_today, CalendarRow, JoinMode, ScheduledRelease};
use crate::domain::series::{FetchOutcome, ObservationSeries, RawSeries};
use crate::ports::calendar_port::CalendarPort;
use crate::ports::series_port::SeriesPort;

const CALENDAR_URL: &str = "https://www.ibge.gov.br/calendario-de-divulgacoes-novoportal.html";
const SIDRA_URL: &str = "https://apisidra.ibge.gov.br/values";

pub struct IbgeCalendar<'a> {
    http: &'a HttpClient,
    url: String,
}

impl<'a> IbgeCalendar<'a> {
    pub fn new(http: &'a HttpClient) -> Self {
        Self {
            http,
            url: CALENDAR_URL.to_string(),
        }
    }

    pub fn with_url(http: &'a HttpClient, url: &str) -> Self {
        Self {
            http,
            url: url.to_string(),
        }
    }

    fn parse_rows(html: &str) -> Vec<CalendarRow> {
        let Some(listing) = class_blocks(html, "agenda--lista").into_iter().next() else {
            return Vec::new();
        };
        let titles = class_blocks(&listing, "agenda--lista__evento");
        let dates = class_blocks(&listing, "agenda--lista__data");
        let metadata = class_blocks(&listing, "metadados--agenda");

        let mut rows = Vec::new();
        for ((title, date), meta) in titles.iter().zip(&dates).zip(&metadata) {
            let title = strip_tags(title);
            let date_text = strip_tags(date);
            let Some(release_date) = parse_day_first(&date_text) else {
                warn!(title, date_text, "calendar entry without a parseable date");
                continue;
            };
            let meta_text = strip_tags(meta);
            rows.push(CalendarRow {
                title,
                release_date,
                reference: parse_reference_period(&meta_text),
                time: parse_time(&date_text),
            });
        }
        rows
    }
}

impl CalendarPort for IbgeCalendar<'_> {
    fn releases_for(
        &self,
        catalog: &Catalog,
        today: NaiveDate,
    ) -> Result<Vec<ScheduledRelease>, MacropostError> {
        let html = self
            .http
            .get_text(&self.url)
            .map_err(|e| MacropostError::CalendarUnavailable {
                source_name: "ibge".to_string(),
                reason: e.to_string(),
            })?;
        let rows = Self::parse_rows(&html);
        if rows.is_empty() {
            return Err(MacropostError::CalendarParse {
                source_name: "ibge".to_string(),
                reason: "no calendar entries found in page".to_string(),
            });
        }
        let releases = releases_for_today(&rows, catalog, JoinMode::CalendarLeads, today);
        info!(count = releases.len(), "IBGE releases predicted for today");
        Ok(releases)
    }
}

/// First "HH:MM" occurrence in a piece of calendar text.
fn parse_time(text: &str) -> Option<NaiveTime> {
    let bytes = text.as_bytes();
    for (i, window) in bytes.windows(5).enumerate() {
        if window[2] == b':'
            && window[..2].iter().all(u8::is_ascii_digit)
            && window[3..].iter().all(u8::is_ascii_digit)
        {
            let candidate = &text[i..i + 5];
            if let Ok(time) = NaiveTime::parse_from_str(candidate, "%H:%M") {
                return Some(time);
            }
        }
    }
    None
}

pub struct SidraSeries<'a> {
    http: &'a HttpClient,
    base_url: String,
}

impl<'a> SidraSeries<'a> {
    pub fn new(http: &'a HttpClient) -> Self {
        Self {
            http,
            base_url: SIDRA_URL.to_string(),
        }
    }

    pub fn with_base_url(http: &'a HttpClient, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.to_string(),
        }
    }

    /// A code is a `table/variable` pair, optionally followed by classifier
    /// segments: `"1737/63"`, `"7060/63/c315/7169"`.
    fn values_url(&self, code: &str) -> Result<String, MacropostError> {
        let mut parts = code.split('/');
        let (Some(table), Some(variable)) = (parts.next(), parts.next()) else {
            return Err(MacropostError::SeriesFetch {
                indicator: String::new(),
                reason: format!("SIDRA code '{code}' needs a table and a variable"),
            });
        };
        let mut url = format!("{}/t/{table}/n1/all/v/{variable}/p/all", self.base_url);
        for segment in parts {
            url.push('/');
            url.push_str(segment);
        }
        Ok(url)
    }

    fn fetch_rows(&self, indicator: &str, code: &str) -> Result<Vec<Value>, MacropostError> {
        self.values_url(code)
            .and_then(|url| self.http.get_json(&url))
            .map_err(|e| MacropostError::SeriesFetch {
                indicator: indicator.to_string(),
                reason: e.to_string(),
            })
    }

    fn parse_rows(rows: &[Value], columns: &[String]) -> Vec<RawSeries> {
        // Row zero carries the column descriptions, not data.
        let data = rows.get(1..).unwrap_or_default();
        let mut raws = Vec::with_capacity(columns.len());
        for label in columns {
            let mut points = Vec::new();
            for row in data {
                let group = row.get("D2N").and_then(Value::as_str).unwrap_or_default();
                if group != label.as_str() && columns.len() > 1 {
                    continue;
                }
                let Some(date) = row
                    .get("D3C")
                    .and_then(Value::as_str)
                    .and_then(parse_period_code)
                else {
                    continue;
                };
                let Some(value) = row
                    .get("V")
                    .and_then(Value::as_str)
                    .and_then(|v| v.parse::<f64>().ok())
                else {
                    continue; // suppressed or not-yet-available cells ("...", "-")
                };
                points.push((date, value));
            }
            raws.push(RawSeries {
                code: label.clone(),
                points,
            });
        }
        raws
    }
}

impl SeriesPort for SidraSeries<'_> {
    fn fetch(
        &self,
        definition: &IndicatorDefinition,
        reference: NaiveDate,
    ) -> Result<FetchOutcome, MacropostError> {
        // A single code with several columns pivots one response by group
        // name; otherwise each code feeds one column.
        let raws = match definition.series_codes.as_slice() {
            [code] if definition.columns.len() > 1 => {
                let rows = self.fetch_rows(&definition.name, code)?;
                Self::parse_rows(&rows, &definition.columns)
            }
            codes => {
                let mut raws = Vec::with_capacity(codes.len());
                for (code, column) in codes.iter().zip(&definition.columns) {
                    let rows = self.fetch_rows(&definition.name, code)?;
                    raws.extend(Self::parse_rows(&rows, std::slice::from_ref(column)));
                }
                raws
            }
        };
        let mut series = ObservationSeries::align(&definition.name, &raws, &definition.columns);
        series.scale(definition.multiplier);
        if definition.raw {
            series.derive_raw_columns();
        }
        Ok(series.into_outcome(reference))
    }
}

/// SIDRA period codes are `yyyymm`.
fn parse_period_code(code: &str) -> Option<NaiveDate> {
    if code.len() != 6 || !code.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year: i32 = code[..4].parse().ok()?;
    let month: u32 = code[4..].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, 1)
}
