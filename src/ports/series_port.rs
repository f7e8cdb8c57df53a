//! Time-series access port trait.

use chrono::NaiveDate;

use crate::domain::catalog::IndicatorDefinition;
use crate::domain::error::MacropostError;
use crate::domain::series::FetchOutcome;

pub trait SeriesPort {
    /// Fetch the authoritative series for one indicator and validate its
    /// latest observation against the expected reference date.
    ///
    /// A failure fetching any individual upstream series aborts the whole
    /// fetch; no partial data is returned.
    fn fetch(
        &self,
        definition: &IndicatorDefinition,
        reference: NaiveDate,
    ) -> Result<FetchOutcome, MacropostError>;
}
