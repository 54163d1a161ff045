use thiserror::Error;

pub type Result<T> = std::result::Result<T, ScanError>;

/// Errors that end a scan.
///
/// End of stream is not an error: byte pulls report it as `Ok(None)`.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The byte source failed (socket closed with error, read timeout, ...)
    #[error("byte source failed: {0}")]
    Io(#[from] std::io::Error),

    /// A chunk size line was shorter than one hex digit plus CR
    #[error("chunk size line too short ({len} bytes)")]
    ChunkSizeLineTooShort { len: usize },

    /// A chunk size line did not start with a hexadecimal number
    #[error("malformed chunk size line {line:?}")]
    MalformedChunkSize { line: String },

    /// The stream ended before a chunk was complete
    #[error("stream ended inside a chunk, {remaining} bytes missing")]
    TruncatedChunk { remaining: u64 },

    /// The server did not answer with status 200
    #[error("unexpected HTTP status line {line:?}")]
    HttpStatus { line: String },

    /// A header line could not be interpreted
    #[error("malformed HTTP header line {line:?}")]
    MalformedHeader { line: String },

    /// The server announced an empty body
    #[error("server announced an empty body")]
    EmptyBody,

    /// A path specification violates the segment bounds
    #[error("invalid path specification: {0}")]
    InvalidPath(String),
}

impl ScanError {
    /// True for errors caused by broken HTTP body framing.
    pub fn is_framing(&self) -> bool {
        matches!(
            self,
            ScanError::ChunkSizeLineTooShort { .. }
                | ScanError::MalformedChunkSize { .. }
                | ScanError::TruncatedChunk { .. }
        )
    }

    /// True when the byte source itself failed.
    pub fn is_source(&self) -> bool {
        matches!(self, ScanError::Io(_))
    }
}
