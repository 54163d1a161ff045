use didlscan_core::{Result, ScanError};
use std::fmt;

/// Most segments a path may have
pub const MAX_PATH_SEGMENTS: usize = 10;

const fn check_segments(segments: &[&str]) {
    assert!(!segments.is_empty(), "path needs at least one segment");
    assert!(
        segments.len() <= MAX_PATH_SEGMENTS,
        "path exceeds MAX_PATH_SEGMENTS"
    );
    let mut i = 0;
    while i < segments.len() {
        assert!(!segments[i].is_empty(), "empty path segment");
        i += 1;
    }
}

/// Ordered literal tag names a matcher looks for.
///
/// Anchored paths must start at the document root. Floating paths start at
/// whatever depth the first segment is found, which is how a region that was
/// already located (a captured `<item>` subtree) is searched.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PathSpec<'p> {
    segments: &'p [&'p str],
    anchored: bool,
}

impl<'p> PathSpec<'p> {
    /// Path rooted at the document element. Bounds are checked at compile time
    /// when used in a `static`.
    pub const fn anchored(segments: &'p [&'p str]) -> Self {
        check_segments(segments);
        Self {
            segments,
            anchored: true,
        }
    }

    /// Path that may start at any depth
    pub const fn floating(segments: &'p [&'p str]) -> Self {
        check_segments(segments);
        Self {
            segments,
            anchored: false,
        }
    }

    /// Runtime-checked constructor for paths built from user input
    pub fn try_new(segments: &'p [&'p str], anchored: bool) -> Result<Self> {
        if segments.is_empty() || segments.len() > MAX_PATH_SEGMENTS {
            return Err(ScanError::InvalidPath(format!(
                "{} segments, expected 1..={}",
                segments.len(),
                MAX_PATH_SEGMENTS
            )));
        }
        if let Some(i) = segments.iter().position(|s| s.is_empty()) {
            return Err(ScanError::InvalidPath(format!("segment {} is empty", i)));
        }
        Ok(Self { segments, anchored })
    }

    pub fn segments(&self) -> &'p [&'p str] {
        self.segments
    }

    pub fn segment(&self, level: usize) -> Option<&'p str> {
        self.segments.get(level).copied()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Always false, a path has at least one segment
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn is_anchored(&self) -> bool {
        self.anchored
    }

    /// Number of leading segments both paths share, capped at `limit`
    pub fn common_prefix(&self, other: &PathSpec<'_>, limit: usize) -> usize {
        self.segments
            .iter()
            .zip(other.segments.iter())
            .take(limit)
            .take_while(|(a, b)| a == b)
            .count()
    }
}

impl fmt::Display for PathSpec<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.anchored {
            write!(f, "/")?;
        } else {
            write!(f, "//")?;
        }
        write!(f, "{}", self.segments.join("/"))
    }
}

impl fmt::Debug for PathSpec<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PathSpec({})", self)
    }
}
