//! Data source identity.

use serde::{Deserialize, Serialize};

/// How often a source's post log rolls over to a new object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogPeriod {
    /// A fresh log object per calendar day.
    Daily,
    /// The union of every daily log object in the current month.
    Monthly,
}

/// The closed set of upstream data sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SourceId {
    Fgv,
    Ibge,
    Bcb,
    Abicom,
    Anfavea,
    Ssp,
}

impl SourceId {
    pub const ALL: [SourceId; 6] = [
        SourceId::Fgv,
        SourceId::Ibge,
        SourceId::Bcb,
        SourceId::Abicom,
        SourceId::Anfavea,
        SourceId::Ssp,
    ];

    /// Stable lowercase name used as the post-log key and catalog file name.
    pub fn as_str(self) -> &'static str {
        match self {
            SourceId::Fgv => "fgv",
            SourceId::Ibge => "ibge",
            SourceId::Bcb => "bcb",
            SourceId::Abicom => "abicom",
            SourceId::Anfavea => "anfavea",
            SourceId::Ssp => "ssp",
        }
    }

    /// Human-readable label for summaries.
    pub fn display_name(self) -> &'static str {
        match self {
            SourceId::Fgv => "FGV",
            SourceId::Ibge => "IBGE",
            SourceId::Bcb => "BCB",
            SourceId::Abicom => "ABICOM PPI",
            SourceId::Anfavea => "ANFAVEA",
            SourceId::Ssp => "SSP",
        }
    }

    /// SSP posts at most once per month; everything else once per day.
    pub fn log_period(self) -> LogPeriod {
        match self {
            SourceId::Ssp => LogPeriod::Monthly,
            _ => LogPeriod::Daily,
        }
    }
}

impl std::fmt::Display for SourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_stable() {
        assert_eq!(SourceId::Bcb.as_str(), "bcb");
        assert_eq!(SourceId::Abicom.as_str(), "abicom");
    }

    #[test]
    fn only_ssp_is_monthly() {
        for source in SourceId::ALL {
            let expected = if source == SourceId::Ssp {
                LogPeriod::Monthly
            } else {
                LogPeriod::Daily
            };
            assert_eq!(source.log_period(), expected);
        }
    }
}
