/// Replacement of the escaped sequences that would hide markup from the path matcher
///
/// ContentDirectory servers return the DIDL-Lite document escaped inside the SOAP
/// `<Result>` element. Unescaping `&lt;`, `&gt;` and friends in-stream lets the
/// matcher see that document as ordinary nested elements.
///
/// This is a greedy, table-driven, single-character replacement. It is not XML
/// entity decoding: numeric references and other named entities pass through as
/// literal text.
use didlscan_core::{ByteSource, Result};
use tracing::trace;

/// Escaped sequences and their replacement, in lookup order
pub const ENTITY_TABLE: [(&[u8], u8); 6] = [
    (b"&lt;", b'<'),
    (b"&gt;", b'>'),
    (b"&quot;", b'"'),
    (b"&amp;amp;", b'&'),
    (b"&amp;apos;", b'\''),
    // a double quote would end the enclosing attribute value
    (b"&amp;quot;", b'\''),
];

const fn longest_entity() -> usize {
    let mut longest = 0;
    let mut i = 0;
    while i < ENTITY_TABLE.len() {
        if ENTITY_TABLE[i].0.len() > longest {
            longest = ENTITY_TABLE[i].0.len();
        }
        i += 1;
    }
    longest
}

/// Capacity of the collection buffer, the longest table entry
pub const MAX_ENTITY_LEN: usize = longest_entity();

const _: () = assert!(MAX_ENTITY_LEN <= 14, "entity buffer exceeds its memory bound");

/// Bytes collected since the last `&`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct EntityBuffer {
    bytes: [u8; MAX_ENTITY_LEN],
    len: usize,
}

impl EntityBuffer {
    fn starting_with_amp() -> Self {
        let mut bytes = [0; MAX_ENTITY_LEN];
        bytes[0] = b'&';
        Self { bytes, len: 1 }
    }

    fn as_slice(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    /// Table entry that still begins with the collected bytes
    fn candidate(&self) -> Option<(&'static [u8], u8)> {
        ENTITY_TABLE
            .iter()
            .copied()
            .find(|(seq, _)| seq.starts_with(self.as_slice()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Passthrough,
    Collecting(EntityBuffer),
    Replaying { buffer: EntityBuffer, offset: usize },
}

/// Pull-through filter replacing the sequences of [`ENTITY_TABLE`]
#[derive(Debug)]
pub struct EntityUnescaper<S> {
    source: S,
    state: State,
}

impl<S: ByteSource> EntityUnescaper<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            state: State::Passthrough,
        }
    }

    pub fn into_inner(self) -> S {
        self.source
    }

    fn replay(&mut self, buffer: EntityBuffer) -> Option<u8> {
        trace!(
            "no replacement for {:?}, passing through",
            String::from_utf8_lossy(buffer.as_slice())
        );
        self.state = if buffer.len > 1 {
            State::Replaying { buffer, offset: 1 }
        } else {
            State::Passthrough
        };
        Some(b'&')
    }
}

impl<S: ByteSource> ByteSource for EntityUnescaper<S> {
    fn next_byte(&mut self) -> Result<Option<u8>> {
        loop {
            match self.state {
                State::Replaying { buffer, offset } => {
                    let byte = buffer.bytes[offset];
                    self.state = if offset + 1 < buffer.len {
                        State::Replaying {
                            buffer,
                            offset: offset + 1,
                        }
                    } else {
                        State::Passthrough
                    };
                    return Ok(Some(byte));
                }
                State::Passthrough => match self.source.next_byte()? {
                    Some(b'&') => self.state = State::Collecting(EntityBuffer::starting_with_amp()),
                    other => return Ok(other),
                },
                State::Collecting(mut buffer) => {
                    let Some(byte) = self.source.next_byte()? else {
                        // stream ended inside a candidate sequence
                        return Ok(self.replay(buffer));
                    };
                    buffer.bytes[buffer.len] = byte;
                    buffer.len += 1;

                    match buffer.candidate() {
                        None => return Ok(self.replay(buffer)),
                        Some((seq, with)) if seq.len() == buffer.len => {
                            self.state = State::Passthrough;
                            return Ok(Some(with));
                        }
                        Some(_) => self.state = State::Collecting(buffer),
                    }
                }
            }
        }
    }
}
