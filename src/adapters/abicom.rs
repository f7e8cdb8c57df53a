//! Abicom: import-parity price (PPI) gap posts.
//!
//! There is no release calendar; the PPI category page shows a card per
//! published day, and a post is due whenever the newest card is dated today.
//! The gap values themselves live in per-day pages, one URL per business day.

use std::path::PathBuf;

use chrono::{Datelike, NaiveDate};
use tracing::{debug, info, warn};

use crate::adapters::html::{class_blocks, strip_tags};
use crate::adapters::http::HttpClient;
use crate::domain::catalog::{Catalog, IndicatorDefinition};
use crate::domain::dates::parse_day_first;
use crate::domain::error::MacropostError;
use crate::domain::schedule::ScheduledRelease;
use crate::domain::series::{FetchOutcome, ObservationSeries, RawSeries};
use crate::ports::calendar_port::CalendarPort;
use crate::ports::series_port::SeriesPort;

const BASE_URL: &str = "https://abicom.com.br";

pub struct AbicomCalendar<'a> {
    http: &'a HttpClient,
    base_url: String,
}

impl<'a> AbicomCalendar<'a> {
    pub fn new(http: &'a HttpClient) -> Self {
        Self::with_base_url(http, BASE_URL)
    }

    pub fn with_base_url(http: &'a HttpClient, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.to_string(),
        }
    }

    /// Date of the newest PPI card, e.g. "PPI - 07/05/2024".
    fn latest_card_date(html: &str) -> Option<NaiveDate> {
        class_blocks(html, "card-title")
            .iter()
            .find_map(|title| parse_day_first(&strip_tags(title)))
    }
}

impl CalendarPort for AbicomCalendar<'_> {
    fn releases_for(
        &self,
        catalog: &Catalog,
        today: NaiveDate,
    ) -> Result<Vec<ScheduledRelease>, MacropostError> {
        let url = format!("{}/categoria/ppi/", self.base_url);
        let html = self
            .http
            .get_text(&url)
            .map_err(|e| MacropostError::CalendarUnavailable {
                source_name: "abicom".to_string(),
                reason: e.to_string(),
            })?;
        let Some(latest) = Self::latest_card_date(&html) else {
            return Err(MacropostError::CalendarParse {
                source_name: "abicom".to_string(),
                reason: "no dated PPI card found".to_string(),
            });
        };
        if latest != today {
            info!(%latest, %today, "no PPI publication for today yet");
            return Ok(Vec::new());
        }
        Ok(catalog
            .definitions()
            .iter()
            .map(|def| ScheduledRelease {
                indicator: def.name.clone(),
                reference: today,
                time: None,
            })
            .collect())
    }
}

pub struct AbicomSeries<'a> {
    http: &'a HttpClient,
    base_url: String,
    /// Optional CSV history so charts can reach further back than the pages
    /// still online.
    cache_path: Option<PathBuf>,
}

impl<'a> AbicomSeries<'a> {
    pub fn new(http: &'a HttpClient, cache_path: Option<PathBuf>) -> Self {
        Self::with_base_url(http, BASE_URL, cache_path)
    }

    pub fn with_base_url(
        http: &'a HttpClient,
        base_url: &str,
        cache_path: Option<PathBuf>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.to_string(),
            cache_path,
        }
    }

    /// The daily pages quote both fuels in one sentence each; diesel comes
    /// first, gasoline last.
    fn parse_gaps(html: &str) -> Option<(f64, f64)> {
        let body = class_blocks(html, "blog-content")
            .into_iter()
            .next()
            .map(|b| strip_tags(&b))
            .unwrap_or_else(|| strip_tags(html));
        let gaps = signed_percents(&body);
        match gaps.as_slice() {
            [] => None,
            [only] => Some((*only, *only)),
            [first, .., last] => Some((*first, *last)),
        }
    }

    fn fetch_day(&self, date: NaiveDate) -> Option<(f64, f64)> {
        let url = format!(
            "{}/ppi/ppi-{:02}-{:02}-{}/",
            self.base_url,
            date.day(),
            date.month(),
            date.year()
        );
        match self.http.get_text(&url) {
            Ok(html) => Self::parse_gaps(&html),
            Err(e) => {
                // Holidays and weekends simply have no page.
                debug!(%date, error = %e, "no PPI page for day");
                None
            }
        }
    }

    /// One cache file per fuel, derived from the configured path:
    /// `abicom-ppi.csv` becomes `abicom-ppi-diesel.csv`.
    fn column_path(&self, column: &str) -> Option<PathBuf> {
        let path = self.cache_path.as_ref()?;
        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("ppi");
        let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("csv");
        Some(path.with_file_name(format!("{stem}-{column}.{ext}")))
    }

    fn load_cache(&self, column: &str) -> Vec<(NaiveDate, f64)> {
        let Some(path) = self.column_path(column) else {
            return Vec::new();
        };
        let Ok(mut reader) = csv::Reader::from_path(&path) else {
            return Vec::new();
        };
        let headers = match reader.headers() {
            Ok(h) => h.clone(),
            Err(_) => return Vec::new(),
        };
        let Some(col_idx) = headers.iter().position(|h| h == column) else {
            return Vec::new();
        };
        let mut points = Vec::new();
        for record in reader.records().flatten() {
            let Some(date) = record
                .get(0)
                .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
            else {
                continue;
            };
            let Some(value) = record.get(col_idx).and_then(|v| v.parse::<f64>().ok()) else {
                continue;
            };
            points.push((date, value));
        }
        points
    }

    fn store_cache(&self, column: &str, points: &[(NaiveDate, f64)]) -> Result<(), MacropostError> {
        let Some(path) = self.column_path(column) else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut writer = csv::Writer::from_path(&path).map_err(|e| MacropostError::LogStore {
            reason: format!("PPI cache {}: {e}", path.display()),
        })?;
        writer
            .write_record(["date", column])
            .map_err(|e| MacropostError::LogStore {
                reason: e.to_string(),
            })?;
        for (date, value) in points {
            writer
                .write_record([date.format("%Y-%m-%d").to_string(), value.to_string()])
                .map_err(|e| MacropostError::LogStore {
                    reason: e.to_string(),
                })?;
        }
        writer.flush()?;
        Ok(())
    }
}

impl SeriesPort for AbicomSeries<'_> {
    fn fetch(
        &self,
        definition: &IndicatorDefinition,
        reference: NaiveDate,
    ) -> Result<FetchOutcome, MacropostError> {
        // Column choice: "diesel" takes the first quoted gap, anything else
        // the last.
        let wants_diesel = definition.name.to_lowercase().contains("diesel");
        let mut points = self.load_cache(&definition.name);

        // Crawl the last few business days to fill gaps since the cache was
        // last written.
        let mut day = reference;
        for _ in 0..7 {
            if matches!(day.weekday(), chrono::Weekday::Sat | chrono::Weekday::Sun) {
                day = day.pred_opt().unwrap_or(day);
                continue;
            }
            if !points.iter().any(|(d, _)| *d == day) {
                if let Some((diesel, gasoline)) = self.fetch_day(day) {
                    points.push((day, if wants_diesel { diesel } else { gasoline }));
                }
            }
            day = day.pred_opt().unwrap_or(day);
        }
        points.sort_by_key(|(d, _)| *d);
        points.dedup_by_key(|(d, _)| *d);

        if let Err(e) = self.store_cache(&definition.name, &points) {
            warn!(indicator = definition.name, error = %e, "failed to persist PPI cache");
        }

        let raw = RawSeries {
            code: definition.name.clone(),
            points,
        };
        let mut series =
            ObservationSeries::align(&definition.name, &[raw], &definition.columns);
        series.scale(definition.multiplier);
        Ok(series.into_outcome(reference))
    }
}

/// All signed percentages in a text, in order: "-14%", "+3%", "0%".
fn signed_percents(text: &str) -> Vec<f64> {
    let bytes = text.as_bytes();
    let mut out = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if !bytes[i].is_ascii_digit() {
            i += 1;
            continue;
        }
        let start = i;
        while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b',' || bytes[i] == b'.')
        {
            i += 1;
        }
        if bytes.get(i) != Some(&b'%') {
            continue;
        }
        let sign = match bytes[..start].iter().rev().find(|b| !b.is_ascii_whitespace()) {
            Some(b'-') => -1.0,
            _ => 1.0,
        };
        let number = text[start..i].replace(',', ".");
        if let Ok(value) = number.parse::<f64>() {
            out.push(sign * value);
        }
        i += 1;
    }
    out
}
