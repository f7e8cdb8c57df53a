//! Release-calendar access port trait.

use chrono::NaiveDate;

use crate::domain::catalog::Catalog;
use crate::domain::error::MacropostError;
use crate::domain::schedule::ScheduledRelease;

pub trait CalendarPort {
    /// Releases scheduled for `today` whose indicator is recognized in the
    /// catalog. An error here means the calendar could not be read; the
    /// orchestration loop treats it as zero releases for the source.
    fn releases_for(
        &self,
        catalog: &Catalog,
        today: NaiveDate,
    ) -> Result<Vec<ScheduledRelease>, MacropostError>;
}
