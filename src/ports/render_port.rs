//! Post-rendering port trait.

use crate::domain::catalog::IndicatorDefinition;
use crate::domain::error::MacropostError;
use crate::domain::series::ObservationSeries;
use crate::ports::publisher_port::PreparedPost;

pub trait RendererPort {
    /// Turn a fresh series into post text and a chart.
    fn prepare(
        &self,
        definition: &IndicatorDefinition,
        series: &ObservationSeries,
    ) -> Result<PreparedPost, MacropostError>;
}
