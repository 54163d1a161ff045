use crate::error::Result;
use crate::models::DidlRecord;

/// Pull-based producer of raw bytes (socket reader, decoder stage, ...)
///
/// Every stage of the scan pipeline is itself a `ByteSource`, so stages stack:
/// a socket feeds the chunk decoder, which feeds the entity unescaper.
pub trait ByteSource {
    /// Next byte, `Ok(None)` once the stream is exhausted
    fn next_byte(&mut self) -> Result<Option<u8>>;
}

impl<S: ByteSource + ?Sized> ByteSource for &mut S {
    fn next_byte(&mut self) -> Result<Option<u8>> {
        (**self).next_byte()
    }
}

impl<S: ByteSource + ?Sized> ByteSource for Box<S> {
    fn next_byte(&mut self) -> Result<Option<u8>> {
        (**self).next_byte()
    }
}

/// Consumer of extracted records
pub trait RecordCollector {
    /// Append a record; records are never modified afterwards
    fn collect(&mut self, record: DidlRecord);

    /// Called with the `NumberReturned` value the server advertised
    fn announce(&mut self, _number_returned: u32) {}

    /// Called for every element that was skipped
    fn reject(&mut self) {}
}

impl RecordCollector for Vec<DidlRecord> {
    fn collect(&mut self, record: DidlRecord) {
        self.push(record);
    }
}
