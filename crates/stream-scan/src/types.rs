use serde::{Deserialize, Serialize};

/// How the HTTP body of a server reply is delimited
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BodyFraming {
    /// `Transfer-Encoding: chunked`
    Chunked,
    /// `Content-Length: n`
    Length(u64),
    /// Neither header present, body ends when the connection closes
    UntilClose,
}

/// What to do when an element's `parentID` differs from the browsed object id
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParentIdPolicy {
    /// Keep the element and log a warning
    #[default]
    Warn,
    /// Skip the element
    Strict,
}

/// Acceptance rules applied while turning captured elements into records
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractPolicy {
    pub parent_id: ParentIdPolicy,
    /// Keep items whose `<res>` reports `size="0"`
    pub keep_empty_items: bool,
}

impl ExtractPolicy {
    pub fn strict() -> Self {
        Self {
            parent_id: ParentIdPolicy::Strict,
            ..Default::default()
        }
    }
}

/// Which ContentDirectory action a response belongs to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseKind {
    Browse,
    Search,
}

/// Capability list that can be queried from a ContentDirectory
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    Search,
    Sort,
}
