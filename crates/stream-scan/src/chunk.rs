/// HTTP body de-framing
///
/// Strips `Transfer-Encoding: chunked` framing (or enforces `Content-Length`)
/// so the stages above see one flat byte stream.
use crate::types::BodyFraming;
use didlscan_core::{ByteSource, Result, ScanError};
use tracing::{debug, trace, warn};

/// Longest chunk size line we keep (hex digits plus optional extensions)
const MAX_CHUNK_LINE: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Identity { remaining: Option<u64> },
    Chunked { remaining_in_chunk: u64 },
    Finished,
}

/// Removes HTTP body framing from a byte source
#[derive(Debug)]
pub struct ChunkDecoder<S> {
    source: S,
    mode: Mode,
}

impl<S: ByteSource> ChunkDecoder<S> {
    pub fn new(source: S, framing: BodyFraming) -> Self {
        let mode = match framing {
            BodyFraming::Chunked => Mode::Chunked {
                remaining_in_chunk: 0,
            },
            BodyFraming::Length(n) => Mode::Identity { remaining: Some(n) },
            BodyFraming::UntilClose => Mode::Identity { remaining: None },
        };
        Self { source, mode }
    }

    /// Decoder over a chunked body
    pub fn chunked(source: S) -> Self {
        Self::new(source, BodyFraming::Chunked)
    }

    /// Pass-through decoder, for bodies that are not chunked
    pub fn passthrough(source: S) -> Self {
        Self::new(source, BodyFraming::UntilClose)
    }

    /// True once the terminating zero-size chunk (or the announced length) was reached
    pub fn is_finished(&self) -> bool {
        self.mode == Mode::Finished
    }

    pub fn into_inner(self) -> S {
        self.source
    }

    /// Reads one chunk size line and returns the announced size
    fn read_chunk_size(&mut self) -> Result<u64> {
        let mut line = [0u8; MAX_CHUNK_LINE];
        let mut kept = 0;
        let mut len = 0;

        while let Some(byte) = self.source.next_byte()? {
            if byte == b'\n' {
                break;
            }
            if kept < MAX_CHUNK_LINE {
                line[kept] = byte;
                kept += 1;
            }
            len += 1;
        }

        // at least one digit plus '\r'
        if len < 2 {
            return Err(ScanError::ChunkSizeLineTooShort { len });
        }

        let line = &line[..kept];
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        let digits = line
            .iter()
            .take_while(|b| b.is_ascii_hexdigit())
            .count();
        let malformed = || ScanError::MalformedChunkSize {
            line: String::from_utf8_lossy(line).into_owned(),
        };

        if digits == 0 {
            return Err(malformed());
        }
        // digits are ASCII, from_utf8 cannot fail
        let hex = std::str::from_utf8(&line[..digits]).map_err(|_| malformed())?;
        u64::from_str_radix(hex, 16).map_err(|_| malformed())
    }
}

impl<S: ByteSource> ByteSource for ChunkDecoder<S> {
    fn next_byte(&mut self) -> Result<Option<u8>> {
        match self.mode {
            Mode::Finished => Ok(None),
            Mode::Identity { remaining: None } => self.source.next_byte(),
            Mode::Identity {
                remaining: Some(0),
            } => {
                self.mode = Mode::Finished;
                Ok(None)
            }
            Mode::Identity {
                remaining: Some(n),
            } => match self.source.next_byte()? {
                Some(byte) => {
                    self.mode = Mode::Identity {
                        remaining: Some(n - 1),
                    };
                    Ok(Some(byte))
                }
                None => {
                    warn!("body ended {} bytes short of announced length", n);
                    self.mode = Mode::Finished;
                    Ok(None)
                }
            },
            Mode::Chunked { remaining_in_chunk } => {
                let mut remaining = remaining_in_chunk;
                if remaining == 0 {
                    remaining = self.read_chunk_size()?;
                    debug!("announced chunk size: {:#x} ({})", remaining, remaining);
                    if remaining == 0 {
                        // final chunk, trailers are left unread
                        self.mode = Mode::Finished;
                        return Ok(None);
                    }
                }

                let byte = self
                    .source
                    .next_byte()?
                    .ok_or(ScanError::TruncatedChunk { remaining })?;
                remaining -= 1;

                if remaining == 0 {
                    // CRLF trailing each chunk
                    for missing in [2, 1] {
                        if self.source.next_byte()?.is_none() {
                            return Err(ScanError::TruncatedChunk { remaining: missing });
                        }
                    }
                    trace!("end of chunk");
                }

                self.mode = Mode::Chunked {
                    remaining_in_chunk: remaining,
                };
                Ok(Some(byte))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::slice_source;

    fn decode_all<S: ByteSource>(decoder: &mut ChunkDecoder<S>) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        while let Some(byte) = decoder.next_byte()? {
            out.push(byte);
        }
        Ok(out)
    }

    #[test]
    fn test_single_chunk() {
        let mut decoder = ChunkDecoder::chunked(slice_source(b"4\r\nWiki\r\n0\r\n\r\n"));
        assert_eq!(decode_all(&mut decoder).unwrap(), b"Wiki");
        assert!(decoder.is_finished());
        // stays at end of stream
        assert_eq!(decoder.next_byte().unwrap(), None);
    }

    #[test]
    fn test_multiple_chunks_with_extension() {
        let input = b"4\r\nWiki\r\n5;name=value\r\npedia\r\nE\r\n in\r\n\r\nchunks.\r\n0\r\n\r\n";
        let mut decoder = ChunkDecoder::chunked(slice_source(input));
        assert_eq!(
            decode_all(&mut decoder).unwrap(),
            b"Wikipedia in\r\n\r\nchunks.".to_vec()
        );
    }

    #[test]
    fn test_uppercase_and_lowercase_hex() {
        let input = b"a\r\n0123456789\r\nA\r\nabcdefghij\r\n0\r\n\r\n";
        let mut decoder = ChunkDecoder::chunked(slice_source(input));
        assert_eq!(decode_all(&mut decoder).unwrap().len(), 20);
    }

    #[test]
    fn test_malformed_size_line() {
        let mut decoder = ChunkDecoder::chunked(slice_source(b"zz\r\nWiki\r\n"));
        let err = decoder.next_byte().unwrap_err();
        assert!(matches!(err, ScanError::MalformedChunkSize { ref line } if line == "zz"));
        assert!(err.is_framing());
    }

    #[test]
    fn test_too_short_size_line() {
        let mut decoder = ChunkDecoder::chunked(slice_source(b"\r\nWiki"));
        assert!(matches!(
            decoder.next_byte(),
            Err(ScanError::ChunkSizeLineTooShort { len: 1 })
        ));

        let mut empty = ChunkDecoder::chunked(slice_source(b""));
        assert!(matches!(
            empty.next_byte(),
            Err(ScanError::ChunkSizeLineTooShort { len: 0 })
        ));
    }

    #[test]
    fn test_truncated_chunk() {
        let mut decoder = ChunkDecoder::chunked(slice_source(b"8\r\nWiki"));
        let err = decode_all(&mut decoder).unwrap_err();
        assert!(matches!(err, ScanError::TruncatedChunk { remaining: 4 }));
    }

    #[test]
    fn test_missing_chunk_terminator() {
        let mut decoder = ChunkDecoder::chunked(slice_source(b"4\r\nWiki"));
        let err = decode_all(&mut decoder).unwrap_err();
        assert!(matches!(err, ScanError::TruncatedChunk { remaining: 2 }));
    }

    #[test]
    fn test_passthrough() {
        let mut decoder = ChunkDecoder::passthrough(slice_source(b"4\r\nWiki"));
        assert_eq!(decode_all(&mut decoder).unwrap(), b"4\r\nWiki");
    }

    #[test]
    fn test_content_length_bounds_body() {
        let mut decoder = ChunkDecoder::new(slice_source(b"<a/>trailing"), BodyFraming::Length(4));
        assert_eq!(decode_all(&mut decoder).unwrap(), b"<a/>");
        assert!(decoder.is_finished());
    }

    #[test]
    fn test_content_length_short_body_ends_cleanly() {
        let mut decoder = ChunkDecoder::new(slice_source(b"<a/>"), BodyFraming::Length(10));
        assert_eq!(decode_all(&mut decoder).unwrap(), b"<a/>");
    }
}
