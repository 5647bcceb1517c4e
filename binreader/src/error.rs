//! Error type for the binary stream reader.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ReaderError>;

/// Errors the binary stream reader can produce. Kept separate from the
/// domain-level parser error taxonomy in `mapcore::error` — decoders convert
/// these into their own variants with `#[source]`/`#[from]`.
#[derive(Debug, Error)]
pub enum ReaderError {
    #[error("unexpected end of stream: needed {needed} bytes, read {read}")]
    UnexpectedEof { needed: usize, read: usize },

    #[error("seek past end of stream to offset {offset}")]
    BadSeek { offset: u64, #[source] source: std::io::Error },

    #[error("io error")]
    Io(#[source] std::io::Error),

    #[error("invalid UTF-8 in newline-terminated string")]
    InvalidUtf8(#[source] std::string::FromUtf8Error),
}

impl From<std::io::Error> for ReaderError {
    fn from(err: std::io::Error) -> Self {
        ReaderError::Io(err)
    }
}
