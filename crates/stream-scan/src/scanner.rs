/// Browse, Search and capability reply scanning
///
/// Wires the byte pipeline (response head, de-framing, entity replacement) to
/// the path matchers and hands completed elements to the record extractor.
use crate::chunk::ChunkDecoder;
use crate::didl::RecordExtractor;
use crate::entity::EntityUnescaper;
use crate::http::read_response_head;
use crate::paths::{MatcherSet, PathKey};
use crate::types::{Capability, ExtractPolicy, ResponseKind};
use crate::xpath::{CaptureMode, CapturedValue};
use didlscan_core::{ByteSource, DidlRecord, RecordCollector, Result};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Reply body with framing removed and escaped markup restored
pub type BodyStream<S> = EntityUnescaper<ChunkDecoder<S>>;

/// Read the response head from `source` and stack the body stages on top of it
pub fn open_body<S: ByteSource>(mut source: S) -> Result<BodyStream<S>> {
    let framing = read_response_head(&mut source)?;
    Ok(EntityUnescaper::new(ChunkDecoder::new(source, framing)))
}

/// Counters of one response scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanStats {
    pub containers: usize,
    pub items: usize,
    pub rejected: usize,
    /// `NumberReturned` as advertised by the server
    pub number_returned: Option<u32>,
}

impl ScanStats {
    pub fn found(&self) -> usize {
        self.containers + self.items
    }
}

/// Extracts records from a Browse or Search reply body
#[derive(Debug, Clone)]
pub struct ResponseScanner<'a> {
    kind: ResponseKind,
    extractor: RecordExtractor<'a>,
    containers: MatcherSet,
    items: MatcherSet,
    number_returned: MatcherSet,
    stats: ScanStats,
}

impl<'a> ResponseScanner<'a> {
    /// `expected_parent` is the object id that was browsed; `None` for searches
    /// and whenever the parent check is not wanted.
    pub fn new(kind: ResponseKind, expected_parent: Option<&'a str>, policy: ExtractPolicy) -> Self {
        Self {
            kind,
            extractor: RecordExtractor::new(expected_parent, policy),
            containers: MatcherSet::new(PathKey::container(kind)),
            items: MatcherSet::new(PathKey::item(kind)),
            number_returned: MatcherSet::new(PathKey::number_returned(kind)),
            stats: ScanStats::default(),
        }
    }

    pub fn kind(&self) -> ResponseKind {
        self.kind
    }

    pub fn stats(&self) -> ScanStats {
        self.stats
    }

    fn extract<C: RecordCollector + ?Sized>(&mut self, captured: CapturedValue, container: bool, collector: &mut C) {
        let record = if container {
            self.extractor.container(&captured).map(DidlRecord::Container)
        } else {
            self.extractor.item(&captured).map(DidlRecord::Item)
        };

        match record {
            Ok(record) => {
                if record.is_container() {
                    self.stats.containers += 1;
                } else {
                    self.stats.items += 1;
                }
                collector.collect(record);
            }
            Err(rejection) => {
                info!(
                    "{} skipped: {}",
                    if container { "container" } else { "item" },
                    rejection
                );
                debug!("rejected attributes: {}", captured.attributes);
                self.stats.rejected += 1;
                collector.reject();
            }
        }
    }

    /// Feed one body byte. Returns true once `NumberReturned` was read, which
    /// follows `Result` in every reply, so scanning can stop there.
    pub fn feed<C: RecordCollector + ?Sized>(&mut self, byte: u8, collector: &mut C) -> bool {
        if let Some(captured) = self.containers.capture(byte, CaptureMode::SUBTREE_AND_ATTRIBUTES) {
            self.extract(captured, true, collector);
        }
        if let Some(captured) = self.items.capture(byte, CaptureMode::SUBTREE_AND_ATTRIBUTES) {
            self.extract(captured, false, collector);
        }
        let Some(value) = self.number_returned.capture(byte, CaptureMode::CONTENT) else {
            return false;
        };

        match value.content.parse::<u32>() {
            Ok(announced) => {
                debug!("announced number of elements: {}", announced);
                self.stats.number_returned = Some(announced);
                collector.announce(announced);
            }
            Err(_) => warn!("unparsable NumberReturned {:?}", value.content),
        }
        // the element list is over, later bytes belong to the trailer
        self.containers.finish();
        self.items.finish();
        self.number_returned.finish();
        true
    }

    /// Scan a body until `NumberReturned` or end of stream.
    ///
    /// Framing and source errors end the scan; records collected before the
    /// error stay in `collector`.
    pub fn scan<S, C>(&mut self, source: &mut S, collector: &mut C) -> Result<ScanStats>
    where
        S: ByteSource + ?Sized,
        C: RecordCollector + ?Sized,
    {
        while let Some(byte) = source.next_byte()? {
            if self.feed(byte, collector) {
                break;
            }
        }

        let stats = self.stats;
        match stats.number_returned {
            None => warn!("reply ended without NumberReturned"),
            Some(0) => info!("no elements announced"),
            Some(announced) if announced as usize != stats.found() => warn!(
                "elements announced {} != found {} (empty items or vital attributes missing)",
                announced,
                stats.found()
            ),
            Some(_) => {}
        }
        info!("found {} containers and {} items", stats.containers, stats.items);
        Ok(stats)
    }
}

/// Split a comma separated capability list, dropping empty entries
pub fn split_capabilities(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|cap| !cap.is_empty())
        .map(String::from)
        .collect()
}

/// Read `SearchCaps` or `SortCaps` from a capabilities reply body
pub fn scan_capabilities<S: ByteSource + ?Sized>(source: &mut S, capability: Capability) -> Result<Vec<String>> {
    let mut set = MatcherSet::new(PathKey::capability(capability));
    match set.capture_from(source, CaptureMode::CONTENT)? {
        Some(value) => {
            let caps = split_capabilities(&value.content);
            debug!("{:?} capabilities: {:?}", capability, caps);
            Ok(caps)
        }
        None => {
            warn!("reply holds no {:?} capability list", capability);
            Ok(Vec::new())
        }
    }
}
