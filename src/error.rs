//! Error types for the statement reconstruction pipeline.
//!
//! Per the propagation policy in spec §7, the pipeline never surfaces
//! content-level defects (an unparseable date, a misaligned row, an
//! unrecognized unit) as an `Err` — those degrade to `None` cells or an
//! empty statement. Only the two document-level failure kinds below ever
//! reach a caller.

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can terminate processing of an entire document.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The input bytes could not be parsed as a PDF at all.
    #[error("failed to open PDF: {0}")]
    PdfOpenError(String),

    /// `KeyPagesFilter` could not find all three canonical statement
    /// titles anywhere in the document.
    #[error("document does not contain all three canonical statements")]
    NoKeyPages,

    /// IO error while reading PDF bytes.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A configuration resource (taxonomy or units table) failed to parse.
    #[error("invalid configuration resource: {0}")]
    InvalidConfig(String),

    /// A regex in a configuration resource failed to compile.
    #[error("invalid regex in configuration: {0}")]
    Regex(#[from] regex::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pdf_open_error_message_contains_reason() {
        let err = Error::PdfOpenError("bad header".to_string());
        let msg = format!("{err}");
        assert!(msg.contains("bad header"));
    }

    #[test]
    fn no_key_pages_has_fixed_message() {
        let err = Error::NoKeyPages;
        assert!(format!("{err}").contains("canonical statements"));
    }

    #[test]
    fn error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Error>();
    }
}
