//! Post text composition, one strategy per catalog template.

use crate::domain::catalog::{IndicatorDefinition, TextTemplate};
use crate::domain::series::{accumulated_12m_change, pct_change, ObservationSeries};
use crate::domain::source::SourceId;

pub fn compose(
    source: SourceId,
    definition: &IndicatorDefinition,
    series: &ObservationSeries,
) -> String {
    let body = match definition.text {
        TextTemplate::Percent => percent(definition, series),
        TextTemplate::Fiscal => fiscal(definition, series),
        TextTemplate::Ranked => ranked(definition, series),
        TextTemplate::FuelGap => fuel_gap(definition, series),
        TextTemplate::Vehicles => vehicles(series),
        TextTemplate::Crime => crime(series),
    };
    format!("{body}\n\nFonte: {}", attribution(source))
}

fn attribution(source: SourceId) -> &'static str {
    match source {
        SourceId::Fgv => "FGV IBRE",
        SourceId::Ibge => "IBGE",
        SourceId::Bcb => "Banco Central do Brasil",
        SourceId::Abicom => "Abicom",
        SourceId::Anfavea => "ANFAVEA",
        SourceId::Ssp => "SSP-SP",
    }
}

/// Decimal comma, fixed precision: "0,52".
fn fmt(value: f64, decimals: usize) -> String {
    format!("{value:.decimals$}").replace('.', ",")
}

fn month_year(series: &ObservationSeries) -> String {
    series
        .last_date()
        .map(|d| d.format("%m/%Y").to_string())
        .unwrap_or_default()
}

/// One line per percentage column: alta, queda or estabilidade.
fn percent(definition: &IndicatorDefinition, series: &ObservationSeries) -> String {
    let mut text = format!("\u{1f4ca} {}, refer\u{ea}ncia {}:\n", definition.title, month_year(series));
    let last = series.last_values().unwrap_or_default();
    for (label, value) in series.columns.iter().zip(last) {
        text.push('\n');
        text.push_str(&change_line(*value, percent_scope(label), 2));
    }
    text
}

fn percent_scope(label: &str) -> String {
    match label {
        "MoM" => "no m\u{ea}s".to_string(),
        "YoY" => "acumulada em 12 meses".to_string(),
        other => other.to_string(),
    }
}

fn change_line(value: f64, scope: String, decimals: usize) -> String {
    if value > 0.0 {
        format!("\u{1f4c8} Alta de {}% {scope}.", fmt(value, decimals))
    } else if value < 0.0 {
        format!("\u{1f4c9} Queda de {}% {scope}.", fmt(value.abs(), decimals))
    } else {
        format!("Estabilidade ({}%) {scope}.", fmt(0.0, decimals))
    }
}

/// Monetary results quoted in billions; inputs arrive in millions of BRL.
fn fiscal(definition: &IndicatorDefinition, series: &ObservationSeries) -> String {
    let mut text = format!("\u{1f4b0} {}, refer\u{ea}ncia {}:\n", definition.title, month_year(series));
    let last = series.last_values().unwrap_or_default();
    for (label, value) in series.columns.iter().zip(last) {
        let scope = match label.as_str() {
            "MoM" => "no m\u{ea}s",
            "YoY" => "acumulado em 12 meses",
            other => other,
        };
        text.push_str(&format!("\n# R$ {} bi {scope}.", fmt(value / 1000.0, 2)));
    }
    text
}

/// Columns hold percent changes; rank the latest ones, biggest first.
fn ranked(definition: &IndicatorDefinition, series: &ObservationSeries) -> String {
    let last = series.last_values().unwrap_or_default();
    let mut changes: Vec<(&str, f64)> = series
        .columns
        .iter()
        .map(String::as_str)
        .zip(last.iter().copied())
        .collect();
    changes.sort_by(|a, b| b.1.total_cmp(&a.1));

    let mut text = format!("\u{1f4ca} {}, refer\u{ea}ncia {}:\n", definition.title, month_year(series));
    for (label, change) in changes {
        text.push('\n');
        text.push_str(&change_line(change, format!("em {label}"), 2));
    }
    text
}

fn fuel_gap(definition: &IndicatorDefinition, series: &ObservationSeries) -> String {
    let value = series.last_values().and_then(|v| v.first().copied());
    let date = series
        .last_date()
        .map(|d| d.format("%d/%m/%Y").to_string())
        .unwrap_or_default();
    match value {
        Some(v) => format!(
            "\u{26fd} {} em {date}: {}{}% em rela\u{e7}\u{e3}o ao PPI.",
            definition.title,
            if v > 0.0 { "+" } else { "" },
            fmt(v, 0)
        ),
        None => format!("\u{26fd} {}: sem dados.", definition.title),
    }
}

/// Licensing and industry groups, each with monthly and 12-month changes
/// computed from the level columns.
fn vehicles(series: &ObservationSeries) -> String {
    let groups: [(&str, &[&str]); 2] = [
        (
            "\u{1f697} Licenciamentos",
            &["Licenciamento Total", "Licenciamento Nacionais", "Licenciamento Importados"],
        ),
        ("\u{1f3ed} Ind\u{fa}stria", &["Produ\u{e7}\u{e3}o", "Exporta\u{e7}\u{e3}o"]),
    ];

    let mut text = format!(
        "\u{1f698} Resultados ANFAVEA, refer\u{ea}ncia {}:\n",
        month_year(series)
    );
    for (heading, members) in groups {
        text.push_str(&format!("\n{heading}:\n"));
        for &member in members {
            let Some(idx) = series.columns.iter().position(|c| c == member) else {
                continue;
            };
            let short = member
                .strip_prefix("Licenciamento ")
                .unwrap_or(member);
            text.push_str(&format!("# {short}: {}\n", level_changes(series, idx)));
        }
    }
    text.trim_end().to_string()
}

/// State and capital robbery counts with the same change pair.
fn crime(series: &ObservationSeries) -> String {
    let mut text = format!(
        "\u{1f6a8} Roubos em S\u{e3}o Paulo, refer\u{ea}ncia {}:\n",
        month_year(series)
    );
    let last = series.last_values().unwrap_or_default();
    for (idx, (label, count)) in series.columns.iter().zip(last).enumerate() {
        text.push_str(&format!(
            "\n# {label}: {} ocorr\u{ea}ncias. {}",
            fmt_thousands(*count),
            level_changes(series, idx)
        ));
    }
    text
}

/// "alta de 1,2% no mês; queda de 3,4% em 12 meses" for a level column.
fn level_changes(series: &ObservationSeries, idx: usize) -> String {
    let levels = series.column(idx);
    let last = levels.len().saturating_sub(1);
    let mom = pct_change(&levels, last);
    let yoy = accumulated_12m_change(&levels, last);
    let mut parts = Vec::new();
    if let Some(v) = mom {
        parts.push(format!("{} de {}% no m\u{ea}s", direction(v), fmt(v.abs(), 1)));
    }
    if let Some(v) = yoy {
        parts.push(format!("{} de {}% em 12 meses", direction(v), fmt(v.abs(), 1)));
    }
    if parts.is_empty() {
        "sem base de compara\u{e7}\u{e3}o".to_string()
    } else {
        format!("{}.", parts.join("; "))
    }
}

fn direction(value: f64) -> &'static str {
    if value < 0.0 {
        "queda"
    } else {
        "alta"
    }
}

fn fmt_thousands(value: f64) -> String {
    let whole = value.round() as i64;
    let digits = whole.abs().to_string();
    let mut grouped = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }
    if whole < 0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}
