use super::path::PathSpec;
use super::state::{transition, CharClass, Effect, ParserState};
use didlscan_core::{ByteSource, Result};
use tracing::trace;

/// What is collected once the path is fully matched
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaptureTarget {
    /// Text of the matched element; markup of nested elements is skipped
    Content,
    /// Everything between the matched start and end tag, verbatim
    Subtree,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CaptureMode {
    pub target: CaptureTarget,
    /// Also collect the attribute text of the matched element
    pub attributes: bool,
}

impl CaptureMode {
    pub const CONTENT: Self = Self {
        target: CaptureTarget::Content,
        attributes: false,
    };
    pub const CONTENT_AND_ATTRIBUTES: Self = Self {
        target: CaptureTarget::Content,
        attributes: true,
    };
    pub const SUBTREE_AND_ATTRIBUTES: Self = Self {
        target: CaptureTarget::Subtree,
        attributes: true,
    };
}

/// Text captured for one matched element
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CapturedValue {
    /// Trimmed element text or subtree
    pub content: String,
    /// Raw attribute text, tabs and line breaks folded to spaces
    pub attributes: String,
}

/// Per-character path matching state machine ("micro-XPath").
///
/// Tracks tag nesting without building a tree and reports when the stream
/// position lies inside the element named by its [`PathSpec`]. Several matchers
/// can be fed the same stream; each owns its state.
#[derive(Debug, Clone)]
pub struct PathMatcher<'p> {
    spec: PathSpec<'p>,
    state: ParserState,
    /// Nesting depth from the document root
    tag_level: usize,
    /// Depth at which a floating path first matched
    sub_level: usize,
    /// Leading segments matched so far
    match_level: usize,
    /// Characters of the current tag name that agree with the expected segment
    match_count: usize,
    /// Scan offset inside the current tag or text run
    position: usize,
    /// Floating path waiting for its first match
    anchor_pending: bool,
    anchor_fixed: bool,
    /// Current character lies inside a subtree capture
    tree_flag: bool,
    open_quote: Option<u8>,
    /// The last character closed the fully matched element
    closed_full_match: bool,
    content: Vec<u8>,
    attributes: Vec<u8>,
}

impl<'p> PathMatcher<'p> {
    pub fn new(spec: PathSpec<'p>) -> Self {
        Self {
            spec,
            state: ParserState::Uninitiated,
            tag_level: 0,
            sub_level: 0,
            match_level: 0,
            match_count: 0,
            position: 0,
            anchor_pending: !spec.is_anchored(),
            anchor_fixed: false,
            tree_flag: false,
            open_quote: None,
            closed_full_match: false,
            content: Vec::new(),
            attributes: Vec::new(),
        }
    }

    /// Forget everything seen so far, keeping the path
    pub fn reset(&mut self) {
        let spec = self.spec;
        let mut content = std::mem::take(&mut self.content);
        let mut attributes = std::mem::take(&mut self.attributes);
        content.clear();
        attributes.clear();

        *self = Self {
            content,
            attributes,
            ..Self::new(spec)
        };
    }

    /// Install a new path mid-scan.
    ///
    /// Match progress survives for the leading segments both paths share,
    /// as far as they were already matched. Deeper progress is dropped.
    pub fn retarget(&mut self, spec: PathSpec<'p>) {
        let preserved = spec.common_prefix(&self.spec, self.match_level);
        trace!(
            "retarget {} -> {}, keeping {} of {} matched segments",
            self.spec,
            spec,
            preserved,
            self.match_level
        );

        self.match_level = preserved;
        self.match_count = 0;
        if !self.anchor_fixed {
            self.anchor_pending = !spec.is_anchored() && preserved == 0;
        }
        self.spec = spec;
    }

    /// Stop reacting to input until the next [`reset`](Self::reset)
    pub fn finish(&mut self) {
        self.state = ParserState::Complete;
    }

    pub fn spec(&self) -> PathSpec<'p> {
        self.spec
    }

    pub fn state(&self) -> ParserState {
        self.state
    }

    pub fn tag_level(&self) -> usize {
        self.tag_level
    }

    pub fn sub_level(&self) -> usize {
        self.sub_level
    }

    pub fn match_level(&self) -> usize {
        self.match_level
    }

    /// True while every segment of the path is matched
    pub fn is_matched(&self) -> bool {
        self.match_level == self.spec.len()
    }

    /// Depth relative to the anchor of a floating path
    fn depth(&self) -> i64 {
        self.tag_level as i64 - self.sub_level as i64
    }

    fn at_match_depth(&self) -> bool {
        self.depth() == self.match_level as i64
    }

    /// Process one character; returns true when the path is fully matched afterwards
    pub fn feed(&mut self, byte: u8) -> bool {
        self.closed_full_match = false;

        let mut class = CharClass::of(byte);
        if class == CharClass::Quote && self.state.in_attribute_value() && self.open_quote != Some(byte) {
            // the other quote character is plain text inside a value
            class = CharClass::Other;
        }

        let (next, effect) = transition(self.state, class);
        self.state = next;

        match effect {
            Effect::None => {}
            Effect::TagBoundary => self.tag_boundary(),
            Effect::NameChar => {
                self.compare_name_char(byte);
                self.position += 1;
            }
            Effect::NameComplete => {
                self.complete_tag_name();
                self.position = 0;
            }
            Effect::StartTagClosed { name_pending } | Effect::SelfClosing { name_pending } => {
                if name_pending {
                    self.complete_tag_name();
                }
                self.tag_level += 1;
                self.tag_boundary();
            }
            Effect::EndTagClosed => {
                if self.match_level > 0 && self.at_match_depth() {
                    self.closed_full_match = self.is_matched();
                    self.match_level -= 1;
                }
                self.tag_level = self.tag_level.saturating_sub(1);
                self.leave_tag();
            }
            Effect::MarkupClosed => self.leave_tag(),
            Effect::Advance => self.position += 1,
            Effect::ToggleValue => {
                self.open_quote = self.state.in_attribute_value().then_some(byte);
                self.position += 2;
            }
        }

        self.is_matched()
    }

    /// Feed a character and collect text as selected by `mode`.
    ///
    /// Returns the captured value when the matched element closes: content
    /// captures complete at the `>` of its end tag, subtree captures at the `/`.
    pub fn capture(&mut self, byte: u8, mode: CaptureMode) -> Option<CapturedValue> {
        let before_state = self.state;
        let before_full = self.is_matched();
        let before_level = self.match_level as i64;
        let before_depth = self.depth();

        let matched = self.feed(byte);
        let depth = self.depth();

        let done = match mode.target {
            CaptureTarget::Content => {
                if matched && self.state == ParserState::ElementContent && self.position > 0 {
                    self.content.push(byte);
                }
                self.closed_full_match
            }
            CaptureTarget::Subtree => {
                // inside the element, not counting the name of its own end tag
                self.tree_flag = before_full
                    && before_depth >= before_level
                    && !(before_state == ParserState::EndTag && before_depth == before_level);
                if self.tree_flag {
                    self.content.push(byte);
                }
                matched
                    && before_state != ParserState::EndTag
                    && self.state == ParserState::EndTag
                    && self.at_match_depth()
            }
        };

        if mode.attributes
            && matched
            && self.match_level > 0
            && depth == self.match_level as i64 - 1
            && matches!(self.state, ParserState::Attributes | ParserState::AttributeValue)
            && self.position > 0
        {
            self.attributes.push(match byte {
                b'\t' | b'\r' | b'\n' => b' ',
                b => b,
            });
        }

        if !matched && self.at_match_depth() && self.state == ParserState::StartTag && self.position == 0 {
            // a fresh candidate element starts here
            self.content.clear();
            self.attributes.clear();
        }

        done.then(|| self.take_captured(mode.target))
    }

    /// Pull from `source` until the next capture completes or the stream ends
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

    fn tag_boundary(&mut self) {
        self.position = 0;
        self.match_count = 0;
    }

    fn leave_tag(&mut self) {
        if self.tag_level == 0 {
            self.state = ParserState::Root;
        }
        self.tag_boundary();
    }

    fn compare_name_char(&mut self, byte: u8) {
        let Some(segment) = self.spec.segment(self.match_level) else {
            return;
        };
        if self.match_count == self.position && segment.as_bytes().get(self.position) == Some(&byte) {
            self.match_count += 1;
        }
    }

    /// A tag name ended; advance the match level if it equals the expected segment
    fn complete_tag_name(&mut self) {
        let full_name = self
            .spec
            .segment(self.match_level)
            .is_some_and(|seg| self.match_count == self.position && self.match_count == seg.len());

        if full_name && (self.anchor_pending || self.at_match_depth()) {
            if self.anchor_pending {
                self.sub_level = self.tag_level;
                self.anchor_pending = false;
                self.anchor_fixed = true;
            }
            self.match_level += 1;
            trace!(
                "{} matched {}/{} at depth {}",
                self.spec,
                self.match_level,
                self.spec.len(),
                self.tag_level
            );
        }
        self.match_count = 0;
    }

    fn take_captured(&mut self, target: CaptureTarget) -> CapturedValue {
        let mut content = std::mem::take(&mut self.content);
        if target == CaptureTarget::Subtree && content.ends_with(b"</") {
            content.truncate(content.len() - 2);
        }
        let attributes = std::mem::take(&mut self.attributes);

        CapturedValue {
            content: String::from_utf8_lossy(&content).trim().to_string(),
            attributes: String::from_utf8_lossy(&attributes).into_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static A_B: PathSpec<'static> = PathSpec::anchored(&["a", "b"]);
    static TITLE: PathSpec<'static> = PathSpec::floating(&["title"]);
    static CONTAINER: PathSpec<'static> = PathSpec::floating(&["container"]);

    /// Every completed capture together with the index of the completing byte
    fn captures(matcher: &mut PathMatcher<'_>, input: &[u8], mode: CaptureMode) -> Vec<(usize, CapturedValue)> {
        input
            .iter()
            .enumerate()
            .filter_map(|(i, &b)| matcher.capture(b, mode).map(|v| (i, v)))
            .collect()
    }

    fn contents(matcher: &mut PathMatcher<'_>, input: &[u8]) -> Vec<String> {
        captures(matcher, input, CaptureMode::CONTENT)
            .into_iter()
            .map(|(_, v)| v.content)
            .collect()
    }

    #[test]
    fn test_content_fires_at_end_tag_close() {
        let input = b"<a><b>X</b></a>";
        let mut matcher = PathMatcher::new(A_B);
        let found = captures(&mut matcher, input, CaptureMode::CONTENT);

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].1.content, "X");
        // the '>' of "</b>"
        assert_eq!(found[0].0, 10);
        assert_eq!(matcher.tag_level(), 0);
        assert_eq!(matcher.state(), ParserState::Root);
    }

    #[test]
    fn test_content_is_trimmed() {
        let mut matcher = PathMatcher::new(A_B);
        assert_eq!(contents(&mut matcher, b"<a>\n  <b>\n   X Y \n </b>\n</a>"), vec!["X Y"]);
    }

    #[test]
    fn test_segment_is_not_a_prefix_match() {
        let mut matcher = PathMatcher::new(A_B);
        let input = b"<a><bb>X</bb></a>";
        let mut ever_matched = false;
        for &b in input.iter() {
            ever_matched |= matcher.feed(b);
        }
        assert!(!ever_matched);

        matcher.reset();
        assert!(contents(&mut matcher, input).is_empty());
        matcher.reset();
        assert!(contents(&mut matcher, b"<a><ab>X</ab></a>").is_empty());
    }

    #[test]
    fn test_anchored_path_starts_at_root() {
        let mut matcher = PathMatcher::new(A_B);
        assert!(contents(&mut matcher, b"<x><a><b>X</b></a></x>").is_empty());
    }

    #[test]
    fn test_segments_match_in_order_at_increasing_depth() {
        let mut matcher = PathMatcher::new(A_B);
        // <b> as a sibling of <a> is not inside it
        assert!(contents(&mut matcher, b"<a></a><b>X</b>").is_empty());

        matcher.reset();
        // <b> nested one level too deep
        assert!(contents(&mut matcher, b"<a><c><b>X</b></c></a>").is_empty());
    }

    #[test]
    fn test_nested_markup_is_skipped_in_content() {
        let mut matcher = PathMatcher::new(A_B);
        assert_eq!(contents(&mut matcher, b"<a><b>X <i>y</i></b></a>"), vec!["X y"]);
    }

    #[test]
    fn test_bare_gt_is_kept_in_content() {
        let mut matcher = PathMatcher::new(A_B);
        assert_eq!(
            contents(&mut matcher, b"<a><b>A > B</b><b>x>1</b></a>"),
            vec!["A > B", "x>1"]
        );
    }

    #[test]
    fn test_bare_gt_in_attribute_value() {
        let mut matcher = PathMatcher::new(PathSpec::floating(&["res"]));
        let found = captures(
            &mut matcher,
            b"<res note=\"a > b\" size=\"1\">u</res>",
            CaptureMode::CONTENT_AND_ATTRIBUTES,
        );
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].1.content, "u");
        assert_eq!(found[0].1.attributes, "note=\"a > b\" size=\"1\"");
    }

    #[test]
    fn test_repeated_elements() {
        let mut matcher = PathMatcher::new(A_B);
        assert_eq!(
            contents(&mut matcher, b"<a><b>1</b><c>skip</c><b>2</b></a>"),
            vec!["1", "2"]
        );
    }

    #[test]
    fn test_prolog_comment_and_attributes_are_tolerated() {
        let mut matcher = PathMatcher::new(A_B);
        let input = b"<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<!-- note -->\n<a x=\"it's\" y='say \"hi\"'><b\tz=\"1\">X</b></a>";
        assert_eq!(contents(&mut matcher, input), vec!["X"]);
    }

    #[test]
    fn test_floating_path_fixes_sub_level() {
        let mut matcher = PathMatcher::new(TITLE);
        let input = b"<r><s><title>T</title></s></r>";
        let mut sub_level_at_match = None;
        let mut found = Vec::new();
        for &b in input.iter() {
            if let Some(v) = matcher.capture(b, CaptureMode::CONTENT) {
                found.push(v.content);
            }
            if matcher.is_matched() && sub_level_at_match.is_none() {
                sub_level_at_match = Some(matcher.sub_level());
            }
        }
        assert_eq!(found, vec!["T"]);
        assert_eq!(sub_level_at_match, Some(2));
        assert_eq!(matcher.sub_level(), 2);
        assert_eq!(matcher.tag_level(), 0);
    }

    #[test]
    fn test_reinstalling_floating_path_keeps_levels() {
        let mut matcher = PathMatcher::new(TITLE);
        let input = b"<r><title>A</title><title>B</title></r>";
        let first_close = b"<r><title>A</title>".len();

        let mut found = contents(&mut matcher, &input[..first_close]);
        assert_eq!(matcher.tag_level(), 1);

        matcher.retarget(TITLE);
        assert_eq!(matcher.tag_level(), 1);
        assert_eq!(matcher.match_level(), 0);

        found.extend(contents(&mut matcher, &input[first_close..]));
        assert_eq!(found, vec!["A", "B"]);
        assert_eq!(matcher.tag_level(), 0);
        assert_eq!(matcher.sub_level(), 1);
    }

    #[test]
    fn test_subtree_with_attributes() {
        let input = br#"<container id="5" parentID="0" childCount="2" searchable="1"><dc:title>Music</dc:title></container>"#;
        let mut matcher = PathMatcher::new(CONTAINER);
        let found = captures(&mut matcher, input, CaptureMode::SUBTREE_AND_ATTRIBUTES);

        assert_eq!(found.len(), 1);
        let (at, value) = &found[0];
        assert_eq!(value.content, "<dc:title>Music</dc:title>");
        assert_eq!(value.attributes, r#"id="5" parentID="0" childCount="2" searchable="1""#);
        // the '/' of "</container>"
        assert_eq!(*at, input.len() - "container>".len() - 1);
    }

    #[test]
    fn test_subtree_of_self_closing_element() {
        let mut matcher = PathMatcher::new(CONTAINER);
        let found = captures(
            &mut matcher,
            b"<r><container id=\"1\"/><container id=\"2\"></container></r>",
            CaptureMode::SUBTREE_AND_ATTRIBUTES,
        );
        let values: Vec<_> = found.into_iter().map(|(_, v)| v).collect();
        assert_eq!(values.len(), 2);
        assert_eq!(values[0].content, "");
        assert_eq!(values[0].attributes, "id=\"1\"");
        assert_eq!(values[1].attributes, "id=\"2\"");
    }

    #[test]
    fn test_attribute_whitespace_is_folded() {
        let mut matcher = PathMatcher::new(PathSpec::floating(&["res"]));
        let found = captures(
            &mut matcher,
            b"<res\tsize=\"10\"\r\n\tduration=\"0:03\">http://h/x</res>",
            CaptureMode::CONTENT_AND_ATTRIBUTES,
        );
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].1.content, "http://h/x");
        assert_eq!(found[0].1.attributes, "size=\"10\"   duration=\"0:03\"");
    }

    #[test]
    fn test_reset_is_idempotent() {
        let input = b"<a><b>one</b><b>two</b></a>";
        let mut matcher = PathMatcher::new(A_B);
        let first = contents(&mut matcher, input);
        matcher.reset();
        let second = contents(&mut matcher, input);
        assert_eq!(first, vec!["one", "two"]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_retarget_keeps_shared_prefix() {
        static NAME: PathSpec<'static> = PathSpec::anchored(&["root", "device", "friendlyName"]);
        static SERVICE: PathSpec<'static> =
            PathSpec::anchored(&["root", "device", "serviceList", "service", "serviceType"]);

        let input = b"<root><device><friendlyName>NAS</friendlyName><serviceList><service><serviceType>cd</serviceType></service></serviceList></device></root>";
        let mut matcher = PathMatcher::new(NAME);
        let name_end = b"<root><device><friendlyName>NAS</friendlyName>".len();

        assert_eq!(contents(&mut matcher, &input[..name_end]), vec!["NAS"]);
        assert_eq!(matcher.match_level(), 2);

        matcher.retarget(SERVICE);
        assert_eq!(matcher.match_level(), 2);
        assert_eq!(contents(&mut matcher, &input[name_end..]), vec!["cd"]);
    }

    #[test]
    fn test_retarget_drops_unshared_progress() {
        let other = PathSpec::anchored(&["a", "c"]);
        let mut matcher = PathMatcher::new(A_B);
        for &b in b"<a><b>".iter() {
            matcher.feed(b);
        }
        assert_eq!(matcher.match_level(), 2);

        matcher.retarget(other);
        assert_eq!(matcher.match_level(), 1);
    }

    #[test]
    fn test_finish_ignores_input() {
        let mut matcher = PathMatcher::new(A_B);
        matcher.finish();
        assert!(contents(&mut matcher, b"<a><b>X</b></a>").is_empty());
        assert_eq!(matcher.state(), ParserState::Complete);
    }
}
