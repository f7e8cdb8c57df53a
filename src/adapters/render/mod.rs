//! Turns a fresh series into post text and a chart.

mod chart;
mod text;

use crate::domain::catalog::IndicatorDefinition;
use crate::domain::error::MacropostError;
use crate::domain::series::ObservationSeries;
use crate::domain::source::SourceId;
use crate::ports::publisher_port::PreparedPost;
use crate::ports::render_port::RendererPort;

pub struct Renderer {
    source: SourceId,
}

impl Renderer {
    pub fn new(source: SourceId) -> Self {
        Self { source }
    }
}

impl RendererPort for Renderer {
    fn prepare(
        &self,
        definition: &IndicatorDefinition,
        series: &ObservationSeries,
    ) -> Result<PreparedPost, MacropostError> {
        if series.rows.is_empty() {
            return Err(MacropostError::Publish {
                indicator: definition.name.clone(),
                reason: "nothing to render: series is empty".to_string(),
            });
        }
        Ok(PreparedPost {
            indicator: definition.name.clone(),
            text: text::compose(self.source, definition, series),
            chart_svg: chart::render(definition, series),
        })
    }
}
