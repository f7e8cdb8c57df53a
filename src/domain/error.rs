//! Domain error types.

/// Top-level error type for macropost.
#[derive(Debug, thiserror::Error)]
pub enum MacropostError {
    #[error("HTTP request to {url} failed: {reason}")]
    Http { url: String, reason: String },

    // The field cannot be called `source`: thiserror reserves that name for
    // the error chain.
    #[error("calendar unavailable for {source_name}: {reason}")]
    CalendarUnavailable { source_name: String, reason: String },

    #[error("calendar parse error for {source_name}: {reason}")]
    CalendarParse { source_name: String, reason: String },

    #[error("series fetch failed for {indicator}: {reason}")]
    SeriesFetch { indicator: String, reason: String },

    #[error("publish failed for {indicator}: {reason}")]
    Publish { indicator: String, reason: String },

    #[error("catalog load error for {path}: {reason}")]
    CatalogLoad { path: String, reason: String },

    #[error("post log error: {reason}")]
    LogStore { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&MacropostError> for std::process::ExitCode {
    fn from(err: &MacropostError) -> Self {
        let code: u8 = match err {
            MacropostError::Io(_) => 1,
            MacropostError::ConfigParse { .. } | MacropostError::ConfigMissing { .. } => 2,
            MacropostError::CatalogLoad { .. } => 3,
            MacropostError::LogStore { .. } => 4,
            MacropostError::Http { .. }
            | MacropostError::CalendarUnavailable { .. }
            | MacropostError::CalendarParse { .. }
            | MacropostError::SeriesFetch { .. }
            | MacropostError::Publish { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calendar_errors_carry_the_source_name_in_the_message() {
        let err = MacropostError::CalendarUnavailable {
            source_name: "bcb".to_string(),
            reason: "timeout".to_string(),
        };
        assert_eq!(err.to_string(), "calendar unavailable for bcb: timeout");
        // These variants hold plain strings, not a wrapped error.
        assert!(std::error::Error::source(&err).is_none());
    }
}
