pub mod chunk;
pub mod description;
pub mod didl;
pub mod entity;
pub mod http;
pub mod paths;
pub mod scanner;
pub mod source;
pub mod types;
pub mod xpath;

pub use chunk::ChunkDecoder;
pub use description::{resolve_url, scan_description, CONTENT_DIRECTORY_SERVICE, UNNAMED_SERVER};
pub use didl::{parse_resource_uri, scan_attribute, RecordExtractor, Rejection};
pub use entity::{EntityUnescaper, ENTITY_TABLE, MAX_ENTITY_LEN};
pub use http::read_response_head;
pub use paths::{MatcherSet, PathKey};
pub use scanner::{open_body, scan_capabilities, split_capabilities, BodyStream, ResponseScanner, ScanStats};
pub use source::{slice_source, ReaderSource};
pub use types::*;
pub use xpath::{CaptureMode, CaptureTarget, CapturedValue, ParserState, PathMatcher, PathSpec, MAX_PATH_SEGMENTS};
