//! FGV IBRE: release calendar page and the data portal series table.

use chrono::{NaiveDate, NaiveTime};
use tracing::{info, warn};

use crate::adapters::html::{class_blocks, strip_tags, tag_blocks};
use crate::adapters::http::HttpClient;
use crate::domain::catalog::{Catalog, IndicatorDefinition};
use crate::domain::dates::{month_number, parse_day_first, parse_reference_period};
use crate::domain::error::MacropostError;
use crate::domain::schedule::{releases_for_today, CalendarRow, JoinMode, ScheduledRelease};
use crate::domain::series::{FetchOutcome, ObservationSeries, RawSeries};
use crate::ports::calendar_port::CalendarPort;
use crate::ports::series_port::SeriesPort;

const CALENDAR_URL: &str = "https://portalibre.fgv.br/calendario-de-divulgacao";

pub struct FgvCalendar<'a> {
    http: &'a HttpClient,
    url: String,
}

impl<'a> FgvCalendar<'a> {
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
        let Some(listing) = class_blocks(html, "calendario").into_iter().next() else {
            return Vec::new();
        };
        let titles = class_blocks(&listing, "views-field-title");
        let dates = class_blocks(&listing, "views-field-field-divulgacao-data");
        let times = class_blocks(&listing, "views-field-field-divulgacao-horario");

        let mut rows = Vec::new();
        for (i, (title, date)) in titles.iter().zip(&dates).enumerate() {
            // Titles carry the reference period inline: "IPC-S Março/2024".
            let full_title = strip_tags(title);
            let reference = parse_reference_period(&full_title);
            let date_text = strip_tags(date);
            let Some(release_date) = parse_day_first(&date_text) else {
                warn!(title = full_title, date_text, "calendar entry without a parseable date");
                continue;
            };
            let time = times
                .get(i)
                .map(|t| strip_tags(t))
                .and_then(|t| NaiveTime::parse_from_str(t.trim(), "%H:%M").ok());
            rows.push(CalendarRow {
                title: strip_reference_token(&full_title),
                release_date,
                reference,
                time,
            });
        }
        rows
    }
}

impl CalendarPort for FgvCalendar<'_> {
    fn releases_for(
        &self,
        catalog: &Catalog,
        today: NaiveDate,
    ) -> Result<Vec<ScheduledRelease>, MacropostError> {
        let html = self
            .http
            .get_text(&self.url)
            .map_err(|e| MacropostError::CalendarUnavailable {
                source_name: "fgv".to_string(),
                reason: e.to_string(),
            })?;
        let rows = Self::parse_rows(&html);
        if rows.is_empty() {
            return Err(MacropostError::CalendarParse {
                source_name: "fgv".to_string(),
                reason: "no calendar entries found in page".to_string(),
            });
        }
        // Every catalog indicator is considered; the calendar only supplies
        // the date match.
        let releases = releases_for_today(&rows, catalog, JoinMode::CatalogLeads, today);
        info!(count = releases.len(), "FGV releases predicted for today");
        Ok(releases)
    }
}

/// Drop the "Mês/AAAA" token a calendar title embeds, e.g.
/// "IPC-S Março/2024" becomes "IPC-S".
fn strip_reference_token(title: &str) -> String {
    let kept: Vec<&str> = title
        .split_whitespace()
        .filter(|word| !is_reference_token(word))
        .collect();
    kept.join(" ").trim_end_matches([' ', '-']).to_string()
}

fn is_reference_token(word: &str) -> bool {
    let Some((name, year)) = word.split_once('/') else {
        return false;
    };
    month_number(name).is_some() && year.len() == 4 && year.bytes().all(|b| b.is_ascii_digit())
}

pub struct FgvSeries<'a> {
    http: &'a HttpClient,
    base_url: String,
}

impl<'a> FgvSeries<'a> {
    /// `base_url` points at the data portal's series-export endpoint; the
    /// requested codes are appended as a query parameter.
    pub fn new(http: &'a HttpClient, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.to_string(),
        }
    }

    /// The export page renders one table: a date column followed by one
    /// column per requested code, pt-BR decimal commas throughout.
    fn parse_table(html: &str, codes: &[String]) -> Vec<RawSeries> {
        let mut raws: Vec<RawSeries> = codes
            .iter()
            .map(|code| RawSeries {
                code: code.clone(),
                points: Vec::new(),
            })
            .collect();

        let Some(table) = tag_blocks(html, "table").into_iter().next() else {
            return raws;
        };
        for row in tag_blocks(&table, "tr") {
            let cells: Vec<String> = tag_blocks(&row, "td")
                .iter()
                .map(|c| strip_tags(c))
                .collect();
            if cells.len() < 2 {
                continue; // header rows use <th>
            }
            let Some(date) = parse_day_first(&cells[0]).or_else(|| parse_reference_period(&cells[0]))
            else {
                continue;
            };
            for (raw, cell) in raws.iter_mut().zip(&cells[1..]) {
                if let Some(value) = parse_decimal_comma(cell) {
                    raw.points.push((date, value));
                }
            }
        }
        raws
    }
}

impl SeriesPort for FgvSeries<'_> {
    fn fetch(
        &self,
        definition: &IndicatorDefinition,
        reference: NaiveDate,
    ) -> Result<FetchOutcome, MacropostError> {
        let url = reqwest::Url::parse_with_params(
            &self.base_url,
            &[("series", definition.series_codes.join(",").as_str())],
        )
        .map_err(|e| MacropostError::SeriesFetch {
            indicator: definition.name.clone(),
            reason: e.to_string(),
        })?;
        let html = self
            .http
            .get_text(url.as_str())
            .map_err(|e| MacropostError::SeriesFetch {
                indicator: definition.name.clone(),
                reason: e.to_string(),
            })?;

        let raws = Self::parse_table(&html, &definition.series_codes);
        let mut series = ObservationSeries::align(&definition.name, &raws, &definition.columns);
        series.scale(definition.multiplier);
        if definition.raw {
            series.derive_raw_columns();
        }
        Ok(series.into_outcome(reference))
    }
}

fn parse_decimal_comma(text: &str) -> Option<f64> {
    let cleaned = text.trim().replace('.', "").replace(',', ".");
    if cleaned.is_empty() || cleaned == "-" {
        return None;
    }
    cleaned.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_token_is_stripped_from_titles() {
        assert_eq!(strip_reference_token("IPC-S Mar\u{e7}o/2024"), "IPC-S");
        assert_eq!(strip_reference_token("IGP-M - Abril/2023"), "IGP-M");
        assert_eq!(strip_reference_token("Monitor do PIB"), "Monitor do PIB");
    }

    #[test]
    fn calendar_rows_pick_up_reference_and_time() {
        let html = concat!(
            "<div class=\"view calendario\"><table><tr>",
            "<td class=\"views-field views-field-title\">IPC-S Mar\u{e7}o/2024</td>",
            "<td class=\"views-field views-field-field-divulgacao-data\">08/04/2024</td>",
            "<td class=\"views-field views-field-field-divulgacao-horario\">08:00</td>",
            "</tr></table></div>",
        );
        let rows = FgvCalendar::parse_rows(html);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].title, "IPC-S");
        assert_eq!(rows[0].release_date, NaiveDate::from_ymd_opt(2024, 4, 8).unwrap());
        assert_eq!(rows[0].reference, NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(rows[0].time, NaiveTime::from_hms_opt(8, 0, 0));
    }

    #[test]
    fn series_table_parses_comma_decimals() {
        let html = concat!(
            "<table><tr><th>Data</th><th>IPC-S</th></tr>",
            "<tr><td>02/2024</td><td>0,54</td></tr>",
            "<tr><td>03/2024</td><td>-0,12</td></tr>",
            "<tr><td>04/2024</td><td>-</td></tr>",
            "</table>",
        );
        let raws = FgvSeries::parse_table(html, &["1000000".to_string()]);
        assert_eq!(raws[0].points.len(), 2);
        assert_eq!(raws[0].points[0], (NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(), 0.54));
        assert_eq!(raws[0].points[1].1, -0.12);
    }
}
