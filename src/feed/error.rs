use thiserror::Error;

/// Errors that abort normalization of a single feed.
///
/// None of these are fatal to a run: the coordinator logs the offending feed
/// and carries on with the rest.
#[derive(Debug, Error)]
pub enum FeedError {
    /// The bytes are not XML, or no root element could be read.
    #[error("Malformed document: {0}")]
    MalformedDocument(String),
    /// The root element is neither `<rss>` nor `<feed>`.
    #[error("Unknown feed root element: {0}")]
    UnknownFormat(String),
    /// The root was recognized but the body could not be decoded.
    #[error("Failed to decode {format} document: {message}")]
    Decode {
        format: &'static str,
        message: String,
    },
}

impl FeedError {
    pub(crate) fn decode(format: &'static str, err: impl std::fmt::Display) -> Self {
        FeedError::Decode {
            format,
            message: err.to_string(),
        }
    }
}
