/// Registry of the tag paths scanned in ContentDirectory replies
///
/// Servers disagree on namespace prefixes for the same element
/// (`s:Envelope` vs `SOAP-ENV:Envelope`, `u:BrowseResponse` vs `m:BrowseResponse`),
/// so every logical target maps to an ordered list of variants.
use crate::types::{Capability, ResponseKind};
use crate::xpath::{CaptureMode, CapturedValue, PathMatcher, PathSpec};
use didlscan_core::{ByteSource, Result};

/// The three envelope spellings seen in the wild for one response element
macro_rules! soap_paths {
    ($response:literal, $($tail:literal),+) => {
        &[
            PathSpec::anchored(&["s:Envelope", "s:Body", concat!("u:", $response), $($tail),+]),
            PathSpec::anchored(&["SOAP-ENV:Envelope", "SOAP-ENV:Body", concat!("m:", $response), $($tail),+]),
            PathSpec::anchored(&["SOAP-ENV:Envelope", "SOAP-ENV:Body", concat!("u:", $response), $($tail),+]),
        ]
    };
}

static FRIENDLY_NAME: &[PathSpec<'static>] = &[PathSpec::anchored(&["root", "device", "friendlyName"])];
static SERVICE_TYPE: &[PathSpec<'static>] =
    &[PathSpec::anchored(&["root", "device", "serviceList", "service", "serviceType"])];
static CONTROL_URL: &[PathSpec<'static>] =
    &[PathSpec::anchored(&["root", "device", "serviceList", "service", "controlURL"])];

static BROWSE_CONTAINER: &[PathSpec<'static>] = soap_paths!("BrowseResponse", "Result", "DIDL-Lite", "container");
static BROWSE_ITEM: &[PathSpec<'static>] = soap_paths!("BrowseResponse", "Result", "DIDL-Lite", "item");
static BROWSE_NUMBER_RETURNED: &[PathSpec<'static>] = soap_paths!("BrowseResponse", "NumberReturned");
static SEARCH_CONTAINER: &[PathSpec<'static>] = soap_paths!("SearchResponse", "Result", "DIDL-Lite", "container");
static SEARCH_ITEM: &[PathSpec<'static>] = soap_paths!("SearchResponse", "Result", "DIDL-Lite", "item");
static SEARCH_NUMBER_RETURNED: &[PathSpec<'static>] = soap_paths!("SearchResponse", "NumberReturned");
static SEARCH_CAPS: &[PathSpec<'static>] = soap_paths!("GetSearchCapabilitiesResponse", "SearchCaps");
static SORT_CAPS: &[PathSpec<'static>] = soap_paths!("GetSortCapabilitiesResponse", "SortCaps");

static TITLE: &[PathSpec<'static>] = &[PathSpec::floating(&["dc:title"])];
static ALBUM: &[PathSpec<'static>] = &[PathSpec::floating(&["upnp:album"])];
static ARTIST: &[PathSpec<'static>] = &[PathSpec::floating(&["upnp:artist"])];
static GENRE: &[PathSpec<'static>] = &[PathSpec::floating(&["upnp:genre"])];
static UPNP_CLASS: &[PathSpec<'static>] = &[PathSpec::floating(&["upnp:class"])];
static RESOURCE: &[PathSpec<'static>] = &[PathSpec::floating(&["res"])];

/// Semantic name of a scanned element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathKey {
    FriendlyName,
    ServiceType,
    ControlUrl,
    BrowseContainer,
    BrowseItem,
    BrowseNumberReturned,
    SearchContainer,
    SearchItem,
    SearchNumberReturned,
    SearchCaps,
    SortCaps,
    Title,
    Album,
    Artist,
    Genre,
    UpnpClass,
    Resource,
}

impl PathKey {
    /// Known spellings of this path, tried in order
    pub fn variants(&self) -> &'static [PathSpec<'static>] {
        match self {
            PathKey::FriendlyName => FRIENDLY_NAME,
            PathKey::ServiceType => SERVICE_TYPE,
            PathKey::ControlUrl => CONTROL_URL,
            PathKey::BrowseContainer => BROWSE_CONTAINER,
            PathKey::BrowseItem => BROWSE_ITEM,
            PathKey::BrowseNumberReturned => BROWSE_NUMBER_RETURNED,
            PathKey::SearchContainer => SEARCH_CONTAINER,
            PathKey::SearchItem => SEARCH_ITEM,
            PathKey::SearchNumberReturned => SEARCH_NUMBER_RETURNED,
            PathKey::SearchCaps => SEARCH_CAPS,
            PathKey::SortCaps => SORT_CAPS,
            PathKey::Title => TITLE,
            PathKey::Album => ALBUM,
            PathKey::Artist => ARTIST,
            PathKey::Genre => GENRE,
            PathKey::UpnpClass => UPNP_CLASS,
            PathKey::Resource => RESOURCE,
        }
    }

    /// The single spelling of a path that has no namespace variants
    pub fn primary(&self) -> PathSpec<'static> {
        self.variants()[0]
    }

    pub fn all() -> &'static [PathKey] {
        &[
            PathKey::FriendlyName,
            PathKey::ServiceType,
            PathKey::ControlUrl,
            PathKey::BrowseContainer,
            PathKey::BrowseItem,
            PathKey::BrowseNumberReturned,
            PathKey::SearchContainer,
            PathKey::SearchItem,
            PathKey::SearchNumberReturned,
            PathKey::SearchCaps,
            PathKey::SortCaps,
            PathKey::Title,
            PathKey::Album,
            PathKey::Artist,
            PathKey::Genre,
            PathKey::UpnpClass,
            PathKey::Resource,
        ]
    }

    pub fn container(kind: ResponseKind) -> Self {
        match kind {
            ResponseKind::Browse => PathKey::BrowseContainer,
            ResponseKind::Search => PathKey::SearchContainer,
        }
    }

    pub fn item(kind: ResponseKind) -> Self {
        match kind {
            ResponseKind::Browse => PathKey::BrowseItem,
            ResponseKind::Search => PathKey::SearchItem,
        }
    }

    pub fn number_returned(kind: ResponseKind) -> Self {
        match kind {
            ResponseKind::Browse => PathKey::BrowseNumberReturned,
            ResponseKind::Search => PathKey::SearchNumberReturned,
        }
    }

    pub fn capability(capability: Capability) -> Self {
        match capability {
            Capability::Search => PathKey::SearchCaps,
            Capability::Sort => PathKey::SortCaps,
        }
    }
}

/// One matcher per variant of a [`PathKey`], all fed the same stream
#[derive(Debug, Clone)]
pub struct MatcherSet {
    key: PathKey,
    matchers: Vec<PathMatcher<'static>>,
}

impl MatcherSet {
    pub fn new(key: PathKey) -> Self {
        Self {
            key,
            matchers: key.variants().iter().copied().map(PathMatcher::new).collect(),
        }
    }

    pub fn key(&self) -> PathKey {
        self.key
    }

    /// Feed `byte` to every variant and return the first completed capture.
    ///
    /// Every matcher sees every byte so their nesting counters stay in step.
    pub fn capture(&mut self, byte: u8, mode: CaptureMode) -> Option<CapturedValue> {
        let mut found = None;
        for matcher in &mut self.matchers {
            let value = matcher.capture(byte, mode);
            if found.is_none() {
                found = value;
            }
        }
        found
    }

    /// Pull from `source` until one variant completes a capture or the stream ends
    pub fn capture_from<S: ByteSource + ?Sized>(
        &mut self,
        source: &mut S,
        mode: CaptureMode,
    ) -> Result<Option<CapturedValue>> {
        while let Some(byte) = source.next_byte()? {
            if let Some(value) = self.capture(byte, mode) {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }

    pub fn reset(&mut self) {
        self.matchers.iter_mut().for_each(PathMatcher::reset);
    }

    /// Stop every variant until the next [`reset`](Self::reset)
    pub fn finish(&mut self) {
        self.matchers.iter_mut().for_each(PathMatcher::finish);
    }
}
