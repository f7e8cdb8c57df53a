//! Publishing port trait.

use crate::domain::error::MacropostError;

/// A fully rendered post, ready for the social-media side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedPost {
    pub indicator: String,
    pub text: String,
    pub chart_svg: String,
}

pub trait PublisherPort {
    /// Any non-error return is treated as a successful post.
    fn publish(&self, post: &PreparedPost) -> Result<(), MacropostError>;
}
