//! Post-log store port trait.

use crate::domain::error::MacropostError;
use crate::domain::source::SourceId;

/// Append-only record of what has already been posted in the current period.
///
/// Implementations load the period's entries once at construction and persist
/// the full updated set on every `record` (read-modify-write of the whole log
/// object; concurrent writers on the same period can lose updates).
pub trait PostLogStore {
    fn already_posted(&self, source: SourceId, indicator: &str) -> bool;

    /// Append a new entry and persist immediately.
    fn record(&mut self, source: SourceId, indicator: &str) -> Result<(), MacropostError>;
}
