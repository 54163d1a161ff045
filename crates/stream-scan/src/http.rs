/// HTTP response head parsing
///
/// Consumes the status line and headers of a server reply and decides how the
/// body that follows is framed.
use crate::types::BodyFraming;
use didlscan_core::{ByteSource, Result, ScanError};
use std::io::{Error as IoError, ErrorKind};
use tracing::{debug, trace};

/// Bytes kept per header line, the rest of a longer line is discarded
pub const MAX_HEADER_LINE: usize = 1024;

/// Reads one CRLF/LF terminated line. `None` when the stream ended before any byte.
fn read_line<S: ByteSource + ?Sized>(source: &mut S) -> Result<Option<String>> {
    let mut line = Vec::with_capacity(128);
    let mut seen_any = false;

    loop {
        match source.next_byte()? {
            None if !seen_any => return Ok(None),
            None | Some(b'\n') => break,
            Some(byte) => {
                seen_any = true;
                if line.len() < MAX_HEADER_LINE {
                    line.push(byte);
                }
            }
        }
    }

    if line.last() == Some(&b'\r') {
        line.pop();
    }
    Ok(Some(String::from_utf8_lossy(&line).into_owned()))
}

fn status_is_ok(line: &str) -> bool {
    let mut parts = line.split_whitespace();
    matches!(
        (parts.next(), parts.next()),
        (Some(version), Some("200")) if version.starts_with("HTTP/")
    )
}

/// Reads the response head and returns the framing of the body.
///
/// `Transfer-Encoding: chunked` wins over `Content-Length`. An announced length
/// of zero is [`ScanError::EmptyBody`].
pub fn read_response_head<S: ByteSource + ?Sized>(source: &mut S) -> Result<BodyFraming> {
    let status = read_line(source)?.unwrap_or_default();
    if !status_is_ok(&status) {
        return Err(ScanError::HttpStatus { line: status });
    }
    debug!("status: {}", status);

    let mut chunked = false;
    let mut content_length = None;

    loop {
        let line = read_line(source)?.ok_or_else(|| {
            IoError::new(ErrorKind::UnexpectedEof, "stream ended inside the response head")
        })?;
        if line.is_empty() {
            break;
        }
        trace!("header: {}", line);

        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| ScanError::MalformedHeader { line: line.clone() })?;
        let value = value.trim();

        if name.trim().eq_ignore_ascii_case("transfer-encoding") {
            chunked |= value.to_ascii_lowercase().contains("chunked");
        } else if name.trim().eq_ignore_ascii_case("content-length") {
            let length = value
                .parse::<u64>()
                .map_err(|_| ScanError::MalformedHeader { line: line.clone() })?;
            content_length = Some(length);
        }
    }

    let framing = match (chunked, content_length) {
        (true, _) => BodyFraming::Chunked,
        (false, Some(0)) => return Err(ScanError::EmptyBody),
        (false, Some(n)) => BodyFraming::Length(n),
        (false, None) => BodyFraming::UntilClose,
    };
    debug!("body framing: {:?}", framing);
    Ok(framing)
}
