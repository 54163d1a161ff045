use didlscan_core::{ByteSource, Result};
use std::io::{BufRead, ErrorKind};

/// Adapts any buffered reader (socket, file, byte slice) to [`ByteSource`]
#[derive(Debug)]
pub struct ReaderSource<R> {
    inner: R,
}

impl<R: BufRead> ReaderSource<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: BufRead> ByteSource for ReaderSource<R> {
    fn next_byte(&mut self) -> Result<Option<u8>> {
        loop {
            match self.inner.fill_buf() {
                Ok([]) => return Ok(None),
                Ok(buf) => {
                    let byte = buf[0];
                    self.inner.consume(1);
                    return Ok(Some(byte));
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }
}

/// Source over an in-memory byte slice
pub fn slice_source(bytes: &[u8]) -> ReaderSource<&[u8]> {
    ReaderSource::new(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn test_reads_all_bytes_then_none() {
        let mut src = slice_source(b"ab");
        assert_eq!(src.next_byte().unwrap(), Some(b'a'));
        assert_eq!(src.next_byte().unwrap(), Some(b'b'));
        assert_eq!(src.next_byte().unwrap(), None);
        assert_eq!(src.next_byte().unwrap(), None);
    }

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(ErrorKind::ConnectionReset, "reset"))
        }
    }

    #[test]
    fn test_io_error_is_source_error() {
        let mut src = ReaderSource::new(std::io::BufReader::new(FailingReader));
        let err = src.next_byte().unwrap_err();
        assert!(err.is_source());
    }
}
