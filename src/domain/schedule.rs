//! Release-calendar reconciliation.
//!
//! Raw calendar rows are joined against the catalog, optionally extended with
//! derived follow-on events, then filtered to the rows releasing today.

use chrono::{NaiveDate, NaiveTime};

use crate::domain::catalog::Catalog;
use crate::domain::dates::add_business_days;

/// One row as extracted from a source's release calendar, before the catalog
/// join.
#[derive(Debug, Clone)]
pub struct CalendarRow {
    pub title: String,
    pub release_date: NaiveDate,
    /// Reference period the release describes, when the calendar exposes it.
    pub reference: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
}

/// One (indicator, expected reference date) pair scheduled for today.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledRelease {
    /// Catalog indicator name (post-log key).
    pub indicator: String,
    pub reference: NaiveDate,
    pub time: Option<NaiveTime>,
}

/// Join direction for the calendar/catalog merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinMode {
    /// Keep calendar rows with a catalog match; drop the rest.
    CalendarLeads,
    /// Keep one row per catalog entry that found a calendar match. Used where
    /// every tracked indicator is expected to appear in the calendar.
    CatalogLeads,
}

/// A calendar event that implies a follow-on event a fixed number of
/// business days later.
#[derive(Debug, Clone)]
pub struct DerivedEventRule {
    pub trigger_title: String,
    pub derived_title: String,
    pub business_days: u32,
}

/// Synthesize derived rows and merge them into `rows`, sorted by release date.
///
/// The derived row's reference is the trigger's release date: the follow-on
/// data describes the period the trigger published.
pub fn synthesize_derived(rows: &mut Vec<CalendarRow>, rules: &[DerivedEventRule]) {
    let mut derived = Vec::new();
    for rule in rules {
        for row in rows.iter().filter(|r| r.title == rule.trigger_title) {
            derived.push(CalendarRow {
                title: rule.derived_title.clone(),
                release_date: add_business_days(row.release_date, rule.business_days),
                reference: Some(row.release_date),
                time: None,
            });
        }
    }
    rows.extend(derived);
    rows.sort_by_key(|r| r.release_date);
}

/// Join calendar rows with the catalog and keep only today's releases.
///
/// Rows without a catalog match (or catalog entries without a calendar match,
/// in [`JoinMode::CatalogLeads`]) are silently dropped. Rows without a usable
/// reference period are dropped as well.
pub fn releases_for_today(
    rows: &[CalendarRow],
    catalog: &Catalog,
    mode: JoinMode,
    today: NaiveDate,
) -> Vec<ScheduledRelease> {
    let todays = rows.iter().filter(|r| r.release_date == today);
    match mode {
        JoinMode::CalendarLeads => todays
            .filter_map(|row| {
                let def = catalog.by_title(&row.title)?;
                Some(ScheduledRelease {
                    indicator: def.name.clone(),
                    reference: row.reference?,
                    time: row.time,
                })
            })
            .collect(),
        JoinMode::CatalogLeads => {
            let todays: Vec<&CalendarRow> = todays.collect();
            catalog
                .definitions()
                .iter()
                .filter_map(|def| {
                    let row = todays.iter().find(|r| r.title.trim() == def.title)?;
                    Some(ScheduledRelease {
                        indicator: def.name.clone(),
                        reference: row.reference?,
                        time: row.time,
                    })
                })
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::{ChartTemplate, IndicatorDefinition, TextTemplate};
    use crate::domain::source::SourceId;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn def(name: &str, title: &str) -> IndicatorDefinition {
        IndicatorDefinition {
            name: name.to_string(),
            title: title.to_string(),
            series_codes: vec!["1".to_string()],
            columns: vec!["MoM".to_string()],
            multiplier: 1.0,
            raw: false,
            chart: ChartTemplate::Line,
            text: TextTemplate::Percent,
            subtitle: None,
        }
    }

    fn row(title: &str, release: NaiveDate, reference: Option<NaiveDate>) -> CalendarRow {
        CalendarRow {
            title: title.to_string(),
            release_date: release,
            reference,
            time: None,
        }
    }

    #[test]
    fn filters_to_today_and_catalog_matches() {
        let catalog = Catalog::new(
            SourceId::Ibge,
            vec![def("IPCA", "IPCA"), def("PNAD", "PNAD Contínua")],
        );
        let today = d(2024, 4, 10);
        let reference = Some(d(2024, 3, 1));
        let rows = vec![
            row("IPCA", today, reference),
            row("PNAD Contínua", today, reference),
            row("IPCA", d(2024, 4, 11), reference),
            row("Censo", today, reference),
        ];

        let releases = releases_for_today(&rows, &catalog, JoinMode::CalendarLeads, today);
        assert_eq!(releases.len(), 2);
        assert!(releases.iter().any(|r| r.indicator == "IPCA"));
        assert!(releases.iter().any(|r| r.indicator == "PNAD"));
    }

    #[test]
    fn rows_without_reference_are_dropped() {
        let catalog = Catalog::new(SourceId::Ibge, vec![def("IPCA", "IPCA")]);
        let today = d(2024, 4, 10);
        let rows = vec![row("IPCA", today, None)];
        assert!(releases_for_today(&rows, &catalog, JoinMode::CalendarLeads, today).is_empty());
    }

    #[test]
    fn catalog_leads_keeps_one_row_per_definition() {
        let catalog = Catalog::new(
            SourceId::Fgv,
            vec![def("IGP-M", "IGP-M"), def("IPC-S", "IPC-S")],
        );
        let today = d(2024, 4, 10);
        let reference = Some(d(2024, 3, 1));
        // Duplicate calendar rows for IGP-M; nothing for IPC-S.
        let rows = vec![
            row("IGP-M", today, reference),
            row("IGP-M", today, reference),
        ];

        let releases = releases_for_today(&rows, &catalog, JoinMode::CatalogLeads, today);
        assert_eq!(releases.len(), 1);
        assert_eq!(releases[0].indicator, "IGP-M");
    }

    #[test]
    fn derived_rows_are_synthesized_and_sorted() {
        let trigger_date = d(2024, 3, 7); // Thursday
        let mut rows = vec![
            row("Estatísticas do setor externo", trigger_date, Some(d(2024, 2, 1))),
            row("Focus", d(2024, 3, 25), None),
        ];
        let rules = vec![DerivedEventRule {
            trigger_title: "Estatísticas do setor externo".to_string(),
            derived_title: "Fluxo Cambial".to_string(),
            business_days: 3,
        }];

        synthesize_derived(&mut rows, &rules);

        assert_eq!(rows.len(), 3);
        let derived = rows.iter().find(|r| r.title == "Fluxo Cambial").unwrap();
        assert_eq!(derived.release_date, d(2024, 3, 12));
        assert_eq!(derived.reference, Some(trigger_date));
        let dates: Vec<NaiveDate> = rows.iter().map(|r| r.release_date).collect();
        let mut sorted = dates.clone();
        sorted.sort();
        assert_eq!(dates, sorted);
    }

    #[test]
    fn derived_rows_participate_in_today_filter() {
        let catalog = Catalog::new(SourceId::Bcb, vec![def("Fluxo Cambial", "Fluxo Cambial")]);
        let trigger_date = d(2024, 3, 7);
        let mut rows = vec![row(
            "Estatísticas do setor externo",
            trigger_date,
            Some(d(2024, 2, 1)),
        )];
        synthesize_derived(
            &mut rows,
            &[DerivedEventRule {
                trigger_title: "Estatísticas do setor externo".to_string(),
                derived_title: "Fluxo Cambial".to_string(),
                business_days: 3,
            }],
        );

        let releases =
            releases_for_today(&rows, &catalog, JoinMode::CalendarLeads, d(2024, 3, 12));
        assert_eq!(releases.len(), 1);
        assert_eq!(releases[0].indicator, "Fluxo Cambial");
        assert_eq!(releases[0].reference, trigger_date);
    }
}
