//! Core domain types and logic.

pub mod catalog;
pub mod dates;
pub mod error;
pub mod post_log;
pub mod run;
pub mod schedule;
pub mod series;
pub mod source;
