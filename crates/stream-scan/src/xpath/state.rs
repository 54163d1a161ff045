//! Parser states and the per-character transition table of the path matcher

/// Where in the markup the last character was seen
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ParserState {
    /// Nothing seen yet; everything before the first `<` is skipped
    #[default]
    Uninitiated,
    /// Between top level elements
    Root,
    /// Right after `<`
    StartTag,
    StartTagName,
    /// `<?`
    PrologTag,
    PrologTagName,
    /// Closing `?` of a prolog, waiting for `>`
    PrologEnd,
    PrologAttributes,
    PrologAttributeValue,
    Attributes,
    AttributeValue,
    ElementContent,
    /// `<!`, runs until the next `>`
    Comment,
    /// `</` or a self-closing `/`
    EndTag,
    /// Scan finished, input is ignored
    Complete,
}

impl ParserState {
    pub fn in_attribute_value(self) -> bool {
        matches!(
            self,
            ParserState::AttributeValue | ParserState::PrologAttributeValue
        )
    }
}

/// Input character classes the transition table distinguishes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CharClass {
    Lt,
    Gt,
    Question,
    Bang,
    Quote,
    Slash,
    Whitespace,
    Other,
}

impl CharClass {
    pub fn of(byte: u8) -> Self {
        match byte {
            b'<' => CharClass::Lt,
            b'>' => CharClass::Gt,
            b'?' => CharClass::Question,
            b'!' => CharClass::Bang,
            b'"' | b'\'' => CharClass::Quote,
            b'/' => CharClass::Slash,
            b' ' | b'\t' | b'\r' | b'\n' => CharClass::Whitespace,
            _ => CharClass::Other,
        }
    }
}

/// Bookkeeping the matcher performs alongside a state change
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Effect {
    None,
    /// Reset scan position and match count
    TagBoundary,
    /// Compare the character against the expected segment, then advance
    NameChar,
    /// Tag name ended by whitespace
    NameComplete,
    /// `>` of a start tag; `name_pending` when no whitespace ended the name
    StartTagClosed { name_pending: bool },
    /// `/` of a self-closing tag, the element opens and closes at once
    SelfClosing { name_pending: bool },
    /// `>` of an end tag
    EndTagClosed,
    /// `>` leaving a prolog or comment
    MarkupClosed,
    Advance,
    /// Quote opening or closing a value
    ToggleValue,
}

/// Pure transition function over `(state, class)`
pub fn transition(state: ParserState, class: CharClass) -> (ParserState, Effect) {
    use CharClass::*;
    use ParserState::*;

    match (state, class) {
        (Complete, _) => (Complete, Effect::None),
        (Uninitiated, Lt) => (StartTag, Effect::TagBoundary),
        (Uninitiated, _) => (Uninitiated, Effect::None),

        (Root | ElementContent, Lt) => (StartTag, Effect::TagBoundary),
        (s, Lt) => (s, Effect::TagBoundary),

        (StartTagName, Gt) => (ElementContent, Effect::StartTagClosed { name_pending: true }),
        (Attributes, Gt) => (ElementContent, Effect::StartTagClosed { name_pending: false }),
        (EndTag, Gt) => (ElementContent, Effect::EndTagClosed),
        (PrologEnd | Comment, Gt) => (ElementContent, Effect::MarkupClosed),
        // a bare '>' is legal in text and quoted values
        (s @ (ElementContent | AttributeValue | PrologAttributeValue), Gt) => (s, Effect::Advance),
        (s, Gt) => (s, Effect::TagBoundary),

        (StartTag, Question) => (PrologTag, Effect::None),
        (PrologTagName | PrologAttributes, Question) => (PrologEnd, Effect::None),
        (StartTag, Bang) => (Comment, Effect::None),
        (s @ (ElementContent | Attributes | AttributeValue | PrologAttributeValue), Question | Bang) => {
            (s, Effect::Advance)
        }
        (s, Question | Bang) => (s, Effect::None),

        (Attributes, Quote) => (AttributeValue, Effect::ToggleValue),
        (AttributeValue, Quote) => (Attributes, Effect::ToggleValue),
        (PrologAttributes, Quote) => (PrologAttributeValue, Effect::ToggleValue),
        (PrologAttributeValue, Quote) => (PrologAttributes, Effect::ToggleValue),
        (s, Quote) => (s, Effect::Advance),

        (StartTag, Slash) => (EndTag, Effect::None),
        (StartTagName, Slash) => (EndTag, Effect::SelfClosing { name_pending: true }),
        (Attributes, Slash) => (EndTag, Effect::SelfClosing { name_pending: false }),
        (s @ (ElementContent | AttributeValue | PrologAttributeValue), Slash) => (s, Effect::Advance),
        (s, Slash) => (s, Effect::None),

        (StartTagName, Whitespace) => (Attributes, Effect::NameComplete),
        (PrologTagName, Whitespace) => (PrologAttributes, Effect::None),
        (s @ (Attributes | AttributeValue | PrologAttributes | PrologAttributeValue), Whitespace) => {
            (s, Effect::Advance)
        }
        // leading whitespace of element text is not counted
        (s, Whitespace) => (s, Effect::None),

        (StartTag | StartTagName, Other) => (StartTagName, Effect::NameChar),
        (PrologTag, Other) => (PrologTagName, Effect::Advance),
        (s, Other) => (s, Effect::Advance),
    }
}
