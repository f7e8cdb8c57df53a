//! Banco Central do Brasil: agenda API calendar and SGS series.

use chrono::{Datelike, NaiveDate};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::adapters::html::strip_tags;
use crate::adapters::http::HttpClient;
use crate::domain::catalog::{Catalog, IndicatorDefinition};
use crate::domain::dates::parse_reference_period;
use crate::domain::error::MacropostError;
use crate::domain::schedule::{
    releases_for_today, synthesize_derived, CalendarRow, DerivedEventRule, JoinMode,
    ScheduledRelease,
};
use crate::domain::series::{FetchOutcome, ObservationSeries, RawSeries};
use crate::ports::calendar_port::CalendarPort;
use crate::ports::series_port::SeriesPort;

const AGENDA_URL: &str = "https://www.bcb.gov.br/api/servico/sitebcb/agendas";
const SGS_URL: &str = "https://api.bcb.gov.br/dados/serie";

/// Agenda lists the calendar exposes; one request per list.
const TRACKED_LISTS: [&str; 16] = [
    "Boletim Regional",
    "Eventos no Banco Central",
    "Estatísticas do Valores a Receber",
    "Focus",
    "Indicadores",
    "Informações ao Banco Central",
    "Notas para a imprensa",
    "Ranking de Reclamações",
    "Relatório de Economia Bancária",
    "Relatório de Inflação",
    "Reuniões do CMN e COMOC",
    "Reuniões do Comef",
    "Reuniões do Copom",
    "Reuniões do Coremec",
    "Reuniões do GRC",
    "Índice de atividade econômica (IBC-Br)",
];

#[derive(Debug, Deserialize)]
struct AgendaResponse {
    conteudo: Option<Vec<AgendaEvent>>,
}

#[derive(Debug, Deserialize)]
struct AgendaEvent {
    evento: String,
    #[serde(rename = "dataEvento")]
    data_evento: String,
    /// HTML snippet naming the reference period ("dados de março de 2024").
    descricao: Option<String>,
}

pub struct BcbCalendar<'a> {
    http: &'a HttpClient,
    base_url: String,
}

impl<'a> BcbCalendar<'a> {
    pub fn new(http: &'a HttpClient) -> Self {
        Self {
            http,
            base_url: AGENDA_URL.to_string(),
        }
    }

    pub fn with_base_url(http: &'a HttpClient, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.to_string(),
        }
    }

    /// The released external-sector statistics imply capital-flow data three
    /// business days later.
    fn derived_rules() -> Vec<DerivedEventRule> {
        vec![DerivedEventRule {
            trigger_title: "Estatísticas do setor externo".to_string(),
            derived_title: "Fluxo Cambial".to_string(),
            business_days: 3,
        }]
    }

    fn fetch_rows(&self, today: NaiveDate) -> Result<Vec<CalendarRow>, MacropostError> {
        let window_start = format!("{}-{:02}-01", today.year(), today.month());
        let window_end = format!("{}-12-31", today.year());
        let mut rows = Vec::new();

        for list in TRACKED_LISTS {
            let url = reqwest::Url::parse_with_params(
                &self.base_url,
                &[
                    ("lista", list),
                    ("inicioAgenda", &format!("'{window_start}'")),
                    ("fimAgenda", &format!("'{window_end}'")),
                ],
            )
            .map_err(|e| MacropostError::CalendarParse {
                source_name: "bcb".to_string(),
                reason: e.to_string(),
            })?;

            let response: AgendaResponse = self.http.get_json(url.as_str())?;
            let events = response.conteudo.unwrap_or_default();
            debug!(list, count = events.len(), "agenda events");
            for event in events {
                let Some(release_date) = parse_iso_date(&event.data_evento) else {
                    warn!(list, raw = event.data_evento, "unparseable event date");
                    continue;
                };
                let reference = event
                    .descricao
                    .as_deref()
                    .map(strip_tags)
                    .as_deref()
                    .and_then(parse_reference_period);
                rows.push(CalendarRow {
                    title: event.evento.trim().to_string(),
                    release_date,
                    reference,
                    time: None,
                });
            }
        }

        Ok(rows)
    }
}

impl CalendarPort for BcbCalendar<'_> {
    fn releases_for(
        &self,
        catalog: &Catalog,
        today: NaiveDate,
    ) -> Result<Vec<ScheduledRelease>, MacropostError> {
        let mut rows = self.fetch_rows(today).map_err(|e| {
            MacropostError::CalendarUnavailable {
                source_name: "bcb".to_string(),
                reason: e.to_string(),
            }
        })?;
        synthesize_derived(&mut rows, &Self::derived_rules());
        let releases = releases_for_today(&rows, catalog, JoinMode::CalendarLeads, today);
        info!(count = releases.len(), "BCB releases predicted for today");
        Ok(releases)
    }
}

fn parse_iso_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.get(..10)?, "%Y-%m-%d").ok()
}

#[derive(Debug, Deserialize)]
struct SgsObservation {
    data: String,
    valor: String,
}

pub struct SgsSeries<'a> {
    http: &'a HttpClient,
    base_url: String,
}

impl<'a> SgsSeries<'a> {
    pub fn new(http: &'a HttpClient) -> Self {
        Self {
            http,
            base_url: SGS_URL.to_string(),
        }
    }

    pub fn with_base_url(http: &'a HttpClient, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.to_string(),
        }
    }

    fn fetch_raw(&self, code: &str) -> Result<RawSeries, MacropostError> {
        let url = format!("{}/bcdata.sgs.{code}/dados?formato=json", self.base_url);
        let observations: Vec<SgsObservation> = self.http.get_json(&url)?;
        let mut points = Vec::with_capacity(observations.len());
        for obs in observations {
            let Ok(date) = NaiveDate::parse_from_str(&obs.data, "%d/%m/%Y") else {
                continue;
            };
            let Ok(value) = obs.valor.trim().parse::<f64>() else {
                continue; // unavailable periods come through as empty strings
            };
            points.push((date, value));
        }
        Ok(RawSeries {
            code: code.to_string(),
            points,
        })
    }
}

impl SeriesPort for SgsSeries<'_> {
    fn fetch(
        &self,
        definition: &IndicatorDefinition,
        reference: NaiveDate,
    ) -> Result<FetchOutcome, MacropostError> {
        let mut raws = Vec::with_capacity(definition.series_codes.len());
        for code in &definition.series_codes {
            let raw = self
                .fetch_raw(code)
                .map_err(|e| MacropostError::SeriesFetch {
                    indicator: definition.name.clone(),
                    reason: e.to_string(),
                })?;
            raws.push(raw);
        }

        let mut series =
            ObservationSeries::align(&definition.name, &raws, &definition.columns);
        series.scale(definition.multiplier);
        if definition.raw {
            series.derive_raw_columns();
        }
        Ok(series.into_outcome(reference))
    }
}
