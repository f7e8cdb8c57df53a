//! SVG chart rendering for posts.

use crate::domain::catalog::{ChartTemplate, IndicatorDefinition};
use crate::domain::series::ObservationSeries;

const WIDTH: f64 = 900.0;
const HEIGHT: f64 = 500.0;
const PADDING: f64 = 70.0;

/// Stroke colors cycled across columns in multi-line charts.
const PALETTE: [&str; 6] = ["#1f6feb", "#d1242f", "#1a7f37", "#9a6700", "#8250df", "#57606a"];

/// Observations shown in bar charts.
const BAR_WINDOW: usize = 25;

pub fn render(definition: &IndicatorDefinition, series: &ObservationSeries) -> String {
    let body = match definition.chart {
        ChartTemplate::Line => line_chart(series, 0),
        ChartTemplate::MultiLine => multi_line_chart(series),
        ChartTemplate::Bar => bar_chart(series, 0),
    };
    let subtitle = definition
        .subtitle
        .as_deref()
        .map(|s| {
            format!(
                r##"<text x="{:.0}" y="52" font-size="14" fill="#57606a">{}</text>"##,
                PADDING,
                escape(s)
            )
        })
        .unwrap_or_default();

    format!(
        r##"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH:.0}" height="{HEIGHT:.0}" viewBox="0 0 {WIDTH:.0} {HEIGHT:.0}">
<rect width="{WIDTH:.0}" height="{HEIGHT:.0}" fill="white"/>
<text x="{:.0}" y="32" font-size="20" font-weight="bold" fill="#1f2328">{}</text>
{subtitle}{body}</svg>
"##,
        PADDING,
        escape(&definition.title),
    )
}

struct Scale {
    min: f64,
    span: f64,
    step_x: f64,
}

impl Scale {
    fn fit(values: &[f64], count: usize) -> Self {
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let span = if max > min { max - min } else { 1.0 };
        let step_x = if count > 1 {
            (WIDTH - 2.0 * PADDING) / (count - 1) as f64
        } else {
            0.0
        };
        Self { min, span, step_x }
    }

    fn x(&self, idx: usize) -> f64 {
        PADDING + idx as f64 * self.step_x
    }

    fn y(&self, value: f64) -> f64 {
        HEIGHT - PADDING - (value - self.min) / self.span * (HEIGHT - 2.0 * PADDING)
    }
}

fn line_chart(series: &ObservationSeries, col: usize) -> String {
    let values = series.column(col);
    if values.is_empty() {
        return String::new();
    }
    let scale = Scale::fit(&values, values.len());
    let mut svg = frame(series, &scale);
    svg.push_str(&polyline(&values, &scale, PALETTE[0]));
    if let Some(last) = values.last() {
        svg.push_str(&format!(
            r#"<circle cx="{:.1}" cy="{:.1}" r="4" fill="{}"/>
<text x="{:.1}" y="{:.1}" font-size="13" fill="{}">{:.2}</text>
"#,
            scale.x(values.len() - 1),
            scale.y(*last),
            PALETTE[0],
            scale.x(values.len() - 1) - 40.0,
            scale.y(*last) - 10.0,
            PALETTE[0],
            last,
        ));
    }
    svg
}

fn multi_line_chart(series: &ObservationSeries) -> String {
    let all: Vec<f64> = series.rows.iter().flat_map(|(_, v)| v.iter().copied()).collect();
    if all.is_empty() {
        return String::new();
    }
    let scale = Scale::fit(&all, series.rows.len());
    let mut svg = frame(series, &scale);
    for (idx, label) in series.columns.iter().enumerate() {
        let color = PALETTE[idx % PALETTE.len()];
        svg.push_str(&polyline(&series.column(idx), &scale, color));
        svg.push_str(&format!(
            r#"<text x="{:.0}" y="{:.0}" font-size="13" fill="{color}">{}</text>
"#,
            PADDING + 110.0 * idx as f64,
            HEIGHT - 20.0,
            escape(label),
        ));
    }
    svg
}

fn bar_chart(series: &ObservationSeries, col: usize) -> String {
    let values = series.column(col);
    let start = values.len().saturating_sub(BAR_WINDOW);
    let values = &values[start..];
    if values.is_empty() {
        return String::new();
    }
    // Bars hang from zero when values go negative.
    let mut bounds = values.to_vec();
    bounds.push(0.0);
    let scale = Scale::fit(&bounds, values.len());
    let bar_width = ((WIDTH - 2.0 * PADDING) / values.len() as f64 * 0.7).max(1.0);

    let window = ObservationSeries {
        name: series.name.clone(),
        columns: series.columns.clone(),
        rows: series.rows[series.rows.len() - values.len()..].to_vec(),
    };
    let mut svg = frame(&window, &scale);
    let zero_y = scale.y(0.0);
    for (idx, value) in values.iter().enumerate() {
        let y = scale.y(*value);
        let (top, height) = if *value >= 0.0 {
            (y, zero_y - y)
        } else {
            (zero_y, y - zero_y)
        };
        let color = if *value >= 0.0 { PALETTE[0] } else { PALETTE[1] };
        svg.push_str(&format!(
            r#"<rect x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="{color}"/>
"#,
            scale.x(idx) - bar_width / 2.0,
            top,
            bar_width,
            height.max(0.5),
        ));
    }
    svg
}

/// Axis frame, horizontal gridlines with value labels, first/last date labels.
fn frame(series: &ObservationSeries, scale: &Scale) -> String {
    let mut svg = format!(
        r##"<rect x="{PADDING:.0}" y="{PADDING:.0}" width="{:.0}" height="{:.0}" fill="none" stroke="#d0d7de"/>
"##,
        WIDTH - 2.0 * PADDING,
        HEIGHT - 2.0 * PADDING,
    );
    for step in 0..=4 {
        let value = scale.min + scale.span * step as f64 / 4.0;
        let y = scale.y(value);
        svg.push_str(&format!(
            r##"<line x1="{PADDING:.0}" y1="{y:.1}" x2="{:.0}" y2="{y:.1}" stroke="#d0d7de" stroke-dasharray="3 4"/>
<text x="{:.0}" y="{:.1}" font-size="12" fill="#57606a" text-anchor="end">{value:.1}</text>
"##,
            WIDTH - PADDING,
            PADDING - 8.0,
            y + 4.0,
        ));
    }
    if let (Some((first, _)), Some((last, _))) = (series.rows.first(), series.rows.last()) {
        svg.push_str(&format!(
            r##"<text x="{PADDING:.0}" y="{:.0}" font-size="12" fill="#57606a">{}</text>
<text x="{:.0}" y="{:.0}" font-size="12" fill="#57606a" text-anchor="end">{}</text>
"##,
            HEIGHT - PADDING + 20.0,
            first.format("%m/%Y"),
            WIDTH - PADDING,
            HEIGHT - PADDING + 20.0,
            last.format("%m/%Y"),
        ));
    }
    svg
}

fn polyline(values: &[f64], scale: &Scale, color: &str) -> String {
    let points: Vec<String> = values
        .iter()
        .enumerate()
        .map(|(i, v)| format!("{:.1},{:.1}", scale.x(i), scale.y(*v)))
        .collect();
    format!(
        r#"<polyline points="{}" fill="none" stroke="{color}" stroke-width="2"/>
"#,
        points.join(" ")
    )
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::TextTemplate;
    use chrono::NaiveDate;

    fn definition(chart: ChartTemplate) -> IndicatorDefinition {
        IndicatorDefinition {
            name: "ipca".to_string(),
            title: "IPCA".to_string(),
            series_codes: vec!["433".to_string()],
            columns: vec!["MoM".to_string()],
            multiplier: 1.0,
            raw: false,
            chart,
            text: TextTemplate::Percent,
            subtitle: Some("Varia\u{e7}\u{e3}o mensal".to_string()),
        }
    }

    fn series(values: &[f64]) -> ObservationSeries {
        ObservationSeries {
            name: "ipca".to_string(),
            columns: vec!["MoM".to_string()],
            rows: values
                .iter()
                .enumerate()
                .map(|(i, &v)| {
                    (
                        NaiveDate::from_ymd_opt(2024, 1 + i as u32, 1).unwrap(),
                        vec![v],
                    )
                })
                .collect(),
        }
    }

    #[test]
    fn line_chart_is_valid_svg_with_title() {
        let svg = render(&definition(ChartTemplate::Line), &series(&[0.1, 0.5, -0.2]));
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("IPCA"));
        assert!(svg.contains("Varia\u{e7}\u{e3}o mensal"));
        assert!(svg.contains("<polyline"));
        assert!(svg.trim_end().ends_with("</svg>"));
    }

    #[test]
    fn frame_colors_come_through_quoted() {
        let svg = render(&definition(ChartTemplate::Line), &series(&[0.1, 0.5]));
        assert!(svg.contains(r##"stroke="#d0d7de""##));
        assert!(svg.contains(r##"fill="#57606a""##));
        assert!(svg.contains(r##"fill="#1f2328""##));
    }

    #[test]
    fn bar_chart_colors_negatives_differently() {
        let svg = render(&definition(ChartTemplate::Bar), &series(&[0.4, -0.3]));
        assert!(svg.contains(PALETTE[0]));
        assert!(svg.contains(PALETTE[1]));
    }

    #[test]
    fn empty_series_still_renders_a_document() {
        let svg = render(&definition(ChartTemplate::Line), &series(&[]));
        assert!(svg.starts_with("<svg"));
        assert!(svg.trim_end().ends_with("</svg>"));
    }
}
