//! SSP-SP: monthly robbery totals for the state and the capital.
//!
//! There is no release calendar; the series is polled daily and the freshness
//! gate only lets a post through once the previous month's figures land. The
//! monthly post log then keeps it to one post per month.

use chrono::{Datelike, NaiveDate};
use serde_json::Value;
use tracing::debug;

use crate::adapters::http::HttpClient;
use crate::domain::catalog::{Catalog, IndicatorDefinition};
use crate::domain::dates::{first_of_month, month_number, previous_month};
use crate::domain::error::MacropostError;
use crate::domain::schedule::ScheduledRelease;
use crate::domain::series::{FetchOutcome, ObservationSeries, RawSeries};
use crate::ports::calendar_port::CalendarPort;
use crate::ports::series_port::SeriesPort;

const DATA_URL: &str =
    "https://www.ssp.sp.gov.br/v1/OcorrenciasMensais/RecuperaDadosMensaisAgrupados";

/// Crime-group parameters for the two geographic scopes.
const SCOPES: [(&str, &str); 2] = [("ESTADO", "0"), ("REGIÃO", "1")];

const MONTH_FIELDS: [&str; 12] = [
    "janeiro",
    "fevereiro",
    "março",
    "abril",
    "maio",
    "junho",
    "julho",
    "agosto",
    "setembro",
    "outubro",
    "novembro",
    "dezembro",
];

/// Publication has no announced date, so every day is a candidate; staleness
/// of the series itself decides whether anything gets posted.
pub struct SspCalendar;

impl CalendarPort for SspCalendar {
    fn releases_for(
        &self,
        catalog: &Catalog,
        today: NaiveDate,
    ) -> Result<Vec<ScheduledRelease>, MacropostError> {
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

pub struct SspSeries<'a> {
    http: &'a HttpClient,
    base_url: String,
}

impl<'a> SspSeries<'a> {
    pub fn new(http: &'a HttpClient) -> Self {
        Self {
            http,
            base_url: DATA_URL.to_string(),
        }
    }

    pub fn with_base_url(http: &'a HttpClient, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.to_string(),
        }
    }

    fn fetch_scope(
        &self,
        year: i32,
        scope: (&str, &str),
        offense: &str,
    ) -> Result<Vec<(NaiveDate, f64)>, MacropostError> {
        let url = reqwest::Url::parse_with_params(
            &self.base_url,
            &[
                ("ano", year.to_string().as_str()),
                ("grupoDelito", "6"),
                ("tipoGrupo", scope.0),
                ("idGrupo", scope.1),
            ],
        )
        .map_err(|e| MacropostError::SeriesFetch {
            indicator: offense.to_string(),
            reason: e.to_string(),
        })?;
        let body: Value = self.http.get_json(url.as_str())?;
        Ok(pivot_year(&body, year, offense))
    }
}

impl SeriesPort for SspSeries<'_> {
    fn fetch(
        &self,
        definition: &IndicatorDefinition,
        reference: NaiveDate,
    ) -> Result<FetchOutcome, MacropostError> {
        let Some(offense) = definition.series_codes.first() else {
            return Err(MacropostError::SeriesFetch {
                indicator: definition.name.clone(),
                reason: "no offense name configured".to_string(),
            });
        };

        let mut raws: Vec<RawSeries> = definition
            .columns
            .iter()
            .map(|c| RawSeries {
                code: c.clone(),
                points: Vec::new(),
            })
            .collect();
        for year in reference.year() - 2..=reference.year() {
            for (raw, scope) in raws.iter_mut().zip(SCOPES) {
                let points = self.fetch_scope(year, scope, offense).map_err(|e| {
                    MacropostError::SeriesFetch {
                        indicator: definition.name.clone(),
                        reason: e.to_string(),
                    }
                })?;
                debug!(year, scope = scope.0, count = points.len(), "SSP year fetched");
                raw.points.extend(points);
            }
        }

        let mut series = ObservationSeries::align(&definition.name, &raws, &definition.columns);
        series.scale(definition.multiplier);
        // The month in progress already shows partial counts; keep it out of
        // the freshness gate.
        series.drop_month_in_progress(reference);
        Ok(series.into_outcome(reference))
    }
}

/// Pull the named offense's monthly totals out of one year's response. Months
/// that have not happened yet come back as zero and are dropped.
fn pivot_year(body: &Value, year: i32, offense: &str) -> Vec<(NaiveDate, f64)> {
    let mut points = Vec::new();
    let groups = body
        .get("data")
        .and_then(Value::as_array)
        .map(|a| a.as_slice())
        .unwrap_or_default();
    for group in groups {
        let rows = group
            .get("listaDados")
            .and_then(Value::as_array)
            .map(|a| a.as_slice())
            .unwrap_or_default();
        for row in rows {
            let name = row
                .get("delito")
                .and_then(|d| d.get("delito"))
                .and_then(Value::as_str)
                .unwrap_or_default();
            if name.trim() != offense {
                continue;
            }
            for field in MONTH_FIELDS {
                let Some(value) = row.get(field).and_then(Value::as_f64) else {
                    continue;
                };
                if value == 0.0 {
                    continue;
                }
                let Some(month) = month_number(field) else {
                    continue;
                };
                if let Some(date) = first_of_month(year, month) {
                    points.push((date, value));
                }
            }
        }
    }
    points
}
