//! Port traits: the seams between the domain and its collaborators.

pub mod calendar_port;
pub mod config_port;
pub mod post_log_port;
pub mod publisher_port;
pub mod render_port;
pub mod series_port;
