/// Streaming tag-path matching ("micro-XPath")
///
/// Only literal, ordered tag-name paths are supported. There is no namespace
/// resolution and no validation; the matcher counts nesting and compares names.
pub mod matcher;
pub mod path;
pub mod state;

pub use matcher::{CaptureMode, CaptureTarget, CapturedValue, PathMatcher};
pub use path::{PathSpec, MAX_PATH_SEGMENTS};
pub use state::{CharClass, ParserState};
