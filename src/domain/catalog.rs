//! Curated indicator metadata.
//!
//! One JSON catalog file per source maps an indicator title (the calendar
//! join key) to its fetch parameters and template selectors. Loaded once per
//! run; read-only afterwards.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::error::MacropostError;
use crate::domain::source::SourceId;

/// Chart strategy selector. Closed set; dispatch is an exhaustive match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartTemplate {
    Line,
    MultiLine,
    Bar,
}

/// Tweet text strategy selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextTemplate {
    /// Alta/queda lines, one per column, values already in percent.
    Percent,
    /// Level values reported in R$ BI.
    Fiscal,
    /// Per-column month-over-month change, sorted descending.
    Ranked,
    /// Fuel price-gap summary (Abicom).
    FuelGap,
    /// Vehicle production/licensing summary (ANFAVEA).
    Vehicles,
    /// State/capital robbery summary (SSP).
    Crime,
}

/// Static metadata for one tracked indicator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorDefinition {
    /// Post-log key and chart/file label.
    pub name: String,
    /// Title as it appears in the source's release calendar (join key).
    pub title: String,
    /// Upstream series codes, one per column.
    pub series_codes: Vec<String>,
    /// Column labels, aligned with `series_codes`.
    pub columns: Vec<String>,
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
    /// When set, the upstream series are levels and MoM/YoY columns must be
    /// derived from them.
    #[serde(default)]
    pub raw: bool,
    pub chart: ChartTemplate,
    pub text: TextTemplate,
    /// Optional chart subtitle.
    #[serde(default)]
    pub subtitle: Option<String>,
}

fn default_multiplier() -> f64 {
    1.0
}

impl IndicatorDefinition {
    /// Shape check: every column needs a value source. Either each column has
    /// its own series code, or a single code feeds all columns (pivoted
    /// responses, workbooks).
    fn validate(&self) -> Result<(), String> {
        if self.columns.is_empty() {
            return Err(format!("indicator '{}' has no columns", self.name));
        }
        if self.series_codes.is_empty() {
            return Err(format!("indicator '{}' has no series codes", self.name));
        }
        if self.series_codes.len() != 1 && self.series_codes.len() != self.columns.len() {
            return Err(format!(
                "indicator '{}' has {} series codes for {} columns",
                self.name,
                self.series_codes.len(),
                self.columns.len()
            ));
        }
        Ok(())
    }
}

/// All indicator definitions for one source.
#[derive(Debug, Clone)]
pub struct Catalog {
    pub source: SourceId,
    defs: Vec<IndicatorDefinition>,
}

impl Catalog {
    pub fn new(source: SourceId, defs: Vec<IndicatorDefinition>) -> Self {
        Self { source, defs }
    }

    /// Load `<dir>/<source>.json`.
    pub fn load(dir: &Path, source: SourceId) -> Result<Self, MacropostError> {
        let path = dir.join(format!("{}.json", source.as_str()));
        let content =
            std::fs::read_to_string(&path).map_err(|e| MacropostError::CatalogLoad {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        let defs: Vec<IndicatorDefinition> =
            serde_json::from_str(&content).map_err(|e| MacropostError::CatalogLoad {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        for def in &defs {
            def.validate().map_err(|reason| MacropostError::CatalogLoad {
                path: path.display().to_string(),
                reason,
            })?;
        }
        Ok(Self { source, defs })
    }

    pub fn definitions(&self) -> &[IndicatorDefinition] {
        &self.defs
    }

    /// Look up a definition by its calendar title.
    pub fn by_title(&self, title: &str) -> Option<&IndicatorDefinition> {
        self.defs.iter().find(|d| d.title == title.trim())
    }

    pub fn by_name(&self, name: &str) -> Option<&IndicatorDefinition> {
        self.defs.iter().find(|d| d.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn sample_def(name: &str, title: &str) -> IndicatorDefinition {
        IndicatorDefinition {
            name: name.to_string(),
            title: title.to_string(),
            series_codes: vec!["433".to_string()],
            columns: vec!["MoM".to_string()],
            multiplier: 1.0,
            raw: false,
            chart: ChartTemplate::Line,
            text: TextTemplate::Percent,
            subtitle: None,
        }
    }

    #[test]
    fn lookup_by_title_trims_whitespace() {
        let catalog = Catalog::new(SourceId::Bcb, vec![sample_def("ipca", "IPCA")]);
        assert!(catalog.by_title(" IPCA ").is_some());
        assert!(catalog.by_title("IGP-M").is_none());
    }

    #[test]
    fn load_parses_json_catalog() {
        let dir = TempDir::new().unwrap();
        let mut file = std::fs::File::create(dir.path().join("bcb.json")).unwrap();
        write!(
            file,
            r#"[{{
                "name": "IBC-Br",
                "title": "Índice de atividade econômica (IBC-Br)",
                "series_codes": ["24363"],
                "columns": ["MoM"],
                "chart": "line",
                "text": "percent"
            }}]"#
        )
        .unwrap();

        let catalog = Catalog::load(dir.path(), SourceId::Bcb).unwrap();
        let def = catalog.by_name("IBC-Br").unwrap();
        assert_eq!(def.multiplier, 1.0);
        assert!(!def.raw);
        assert_eq!(def.chart, ChartTemplate::Line);
        assert_eq!(def.text, TextTemplate::Percent);
    }

    #[test]
    fn load_rejects_code_column_mismatch() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("bcb.json"),
            r#"[{
                "name": "fiscal",
                "title": "Estatísticas fiscais",
                "series_codes": ["5793", "5796"],
                "columns": ["MoM", "YoY", "extra"],
                "chart": "bar",
                "text": "fiscal"
            }]"#,
        )
        .unwrap();

        let result = Catalog::load(dir.path(), SourceId::Bcb);
        assert!(matches!(result, Err(MacropostError::CatalogLoad { .. })));
    }

    #[test]
    fn load_accepts_single_code_feeding_many_columns() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("ssp.json"),
            r#"[{
                "name": "roubos",
                "title": "Roubos",
                "series_codes": ["TOTAL DE ROUBO - OUTROS (1)"],
                "columns": ["Estado", "Capital"],
                "chart": "multiline",
                "text": "crime"
            }]"#,
        )
        .unwrap();

        assert!(Catalog::load(dir.path(), SourceId::Ssp).is_ok());
    }

    #[test]
    fn load_missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let result = Catalog::load(dir.path(), SourceId::Fgv);
        assert!(matches!(result, Err(MacropostError::CatalogLoad { .. })));
    }
}
