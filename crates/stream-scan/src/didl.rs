/// DIDL-Lite element extraction
///
/// Turns the captured subtree and attribute text of one `<container>` or
/// `<item>` into a typed record, or rejects the element when vital data is
/// missing. Rejections only ever affect the single element.
use crate::paths::PathKey;
use crate::types::{ExtractPolicy, ParentIdPolicy};
use crate::xpath::{CaptureMode, CapturedValue, PathMatcher};
use didlscan_core::{ContainerRecord, DownloadAddress, FileType, ItemRecord, ResourceUri, UriScheme};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Why an element did not become a record
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("attribute {0:?} missing")]
    MissingAttribute(&'static str),

    #[error("parent id {found:?} does not match requested {expected:?}")]
    ParentMismatch { expected: String, found: String },

    #[error("title missing or empty")]
    MissingTitle,

    #[error("resource uri missing or empty")]
    MissingResource,

    #[error("invalid resource uri {0:?}")]
    InvalidResourceUri(String),

    #[error("item {id:?} reports size 0")]
    EmptyItem { id: String },
}

/// Value of attribute `name` in captured attribute text.
///
/// Literal search for `name=` followed by a quoted value; the value ends at the
/// next occurrence of the opening quote. Empty values count as missing.
pub fn scan_attribute<'a>(attributes: &'a str, name: &str) -> Option<&'a str> {
    let mut from = 0;
    while let Some(found) = attributes[from..].find(name) {
        let start = from + found;
        let end = start + name.len();
        from = end;

        let at_boundary = attributes[..start]
            .chars()
            .next_back()
            .map_or(true, |c| c.is_ascii_whitespace());
        if !at_boundary {
            continue;
        }

        let Some(rest) = attributes[end..].strip_prefix('=') else {
            continue;
        };
        let Some(quote) = rest.chars().next().filter(|c| *c == '"' || *c == '\'') else {
            continue;
        };
        let value = &rest[1..];
        return value
            .find(quote)
            .map(|close| &value[..close])
            .filter(|v| !v.is_empty());
    }
    None
}

/// Split an absolute `http(s)://host[:port]/path` URI into download address and path.
///
/// Anything else is kept verbatim as the path.
pub fn parse_resource_uri(uri: &str) -> Result<ResourceUri, Rejection> {
    if uri.is_empty() {
        return Err(Rejection::MissingResource);
    }

    let invalid = || Rejection::InvalidResourceUri(uri.to_string());
    let (rest, scheme) = if let Some(rest) = uri.strip_prefix("http://") {
        (rest, UriScheme::Http)
    } else if let Some(rest) = uri.strip_prefix("https://") {
        (rest, UriScheme::Https)
    } else {
        return Ok(ResourceUri {
            download: None,
            path: uri.to_string(),
        });
    };

    let (authority, path) = rest.split_once('/').ok_or_else(invalid)?;
    let (host, port) = match authority.rsplit_once(':') {
        // "]" means the colon belongs to a bracketed IPv6 host
        Some((host, port)) if !port.contains(']') => (host, port.parse::<u16>().map_err(|_| invalid())?),
        _ => (authority, scheme.default_port()),
    };

    if host.is_empty() || path.is_empty() {
        return Err(invalid());
    }

    Ok(ResourceUri {
        download: Some(DownloadAddress {
            scheme,
            host: host.to_string(),
            port,
        }),
        path: path.to_string(),
    })
}

/// First captured value for each field, scanning `subtree` once
fn first_values<const N: usize>(subtree: &str, fields: [(PathKey, CaptureMode); N]) -> [Option<CapturedValue>; N] {
    let mut matchers = fields.map(|(key, mode)| (PathMatcher::new(key.primary()), mode));
    let mut values: [Option<CapturedValue>; N] = std::array::from_fn(|_| None);

    for &byte in subtree.as_bytes() {
        for ((matcher, mode), value) in matchers.iter_mut().zip(values.iter_mut()) {
            if value.is_none() {
                *value = matcher.capture(byte, *mode);
            }
        }
        if values.iter().all(Option::is_some) {
            break;
        }
    }
    values
}

fn non_empty(value: Option<CapturedValue>) -> Option<String> {
    value.map(|v| v.content).filter(|s| !s.is_empty())
}

/// Builds records from captured `<container>` and `<item>` elements
#[derive(Debug, Clone)]
pub struct RecordExtractor<'a> {
    /// Object id the request was made for; `None` skips the parent check
    expected_parent: Option<&'a str>,
    policy: ExtractPolicy,
}

impl<'a> RecordExtractor<'a> {
    pub fn new(expected_parent: Option<&'a str>, policy: ExtractPolicy) -> Self {
        Self {
            expected_parent,
            policy,
        }
    }

    pub fn policy(&self) -> &ExtractPolicy {
        &self.policy
    }

    fn required<'v>(attributes: &'v str, name: &'static str) -> Result<&'v str, Rejection> {
        scan_attribute(attributes, name).ok_or(Rejection::MissingAttribute(name))
    }

    /// Case-insensitive containment, as servers decorate parent ids
    fn check_parent(&self, id: &str, found: &str) -> Result<(), Rejection> {
        let Some(expected) = self.expected_parent else {
            return Ok(());
        };
        if found.to_lowercase().contains(&expected.to_lowercase()) {
            return Ok(());
        }

        match self.policy.parent_id {
            ParentIdPolicy::Strict => Err(Rejection::ParentMismatch {
                expected: expected.to_string(),
                found: found.to_string(),
            }),
            ParentIdPolicy::Warn => {
                warn!(
                    "element {:?}: parent id {:?} != requested {:?}, keeping it",
                    id, found, expected
                );
                Ok(())
            }
        }
    }

    pub fn container(&self, captured: &CapturedValue) -> Result<ContainerRecord, Rejection> {
        let attributes = captured.attributes.as_str();
        let id = Self::required(attributes, "id")?;
        let parent_id = Self::required(attributes, "parentID")?;
        self.check_parent(id, parent_id)?;

        let child_count = match scan_attribute(attributes, "childCount") {
            None => None,
            Some(raw) => match raw.parse::<u64>() {
                Ok(count) => {
                    if count == 0 {
                        info!("container {:?} reports childCount=0", id);
                    }
                    Some(count)
                }
                Err(_) => {
                    debug!("container {:?}: unparsable childCount {:?}", id, raw);
                    None
                }
            },
        };

        let searchable = match scan_attribute(attributes, "searchable") {
            None => {
                info!("container {:?} has no searchable attribute, assuming true", id);
                true
            }
            Some(raw) => matches!(raw, "1" | "true"),
        };

        let [title] = first_values(&captured.content, [(PathKey::Title, CaptureMode::CONTENT)]);
        let title = non_empty(title).ok_or(Rejection::MissingTitle)?;

        debug!("container {:?} ({:?}, childCount {:?})", title, id, child_count);
        Ok(ContainerRecord {
            id: id.to_string(),
            parent_id: parent_id.to_string(),
            child_count,
            searchable,
            title,
        })
    }

    pub fn item(&self, captured: &CapturedValue) -> Result<ItemRecord, Rejection> {
        let attributes = captured.attributes.as_str();
        let id = Self::required(attributes, "id")?;
        let parent_id = Self::required(attributes, "parentID")?;
        self.check_parent(id, parent_id)?;

        let [title, album, artist, genre, class, res] = first_values(
            &captured.content,
            [
                (PathKey::Title, CaptureMode::CONTENT),
                (PathKey::Album, CaptureMode::CONTENT),
                (PathKey::Artist, CaptureMode::CONTENT),
                (PathKey::Genre, CaptureMode::CONTENT),
                (PathKey::UpnpClass, CaptureMode::CONTENT),
                (PathKey::Resource, CaptureMode::CONTENT_AND_ATTRIBUTES),
            ],
        );

        let title = non_empty(title).ok_or(Rejection::MissingTitle)?;
        let res = res.ok_or(Rejection::MissingResource)?;
        let resource = parse_resource_uri(&res.content)?;

        let size = scan_attribute(&res.attributes, "size").and_then(|raw| {
            let parsed = raw.parse::<u64>().ok();
            if parsed.is_none() {
                debug!("item {:?}: unparsable size {:?}", id, raw);
            }
            parsed
        });
        if size == Some(0) && !self.policy.keep_empty_items {
            return Err(Rejection::EmptyItem { id: id.to_string() });
        }

        let bitrate = scan_number(&res.attributes, "bitrate", id);
        let sample_frequency = scan_number(&res.attributes, "sampleFrequency", id);

        let upnp_class = non_empty(class);
        let file_type = upnp_class
            .as_deref()
            .map(FileType::from_upnp_class)
            .unwrap_or_default();

        debug!(
            "item {:?} ({:?}, {}, size {:?})",
            title,
            id,
            file_type.as_str(),
            size
        );
        Ok(ItemRecord {
            id: id.to_string(),
            parent_id: parent_id.to_string(),
            title,
            album: non_empty(album),
            artist: non_empty(artist),
            genre: non_empty(genre),
            upnp_class,
            file_type,
            resource,
            size,
            bitrate,
            sample_frequency,
        })
    }
}

/// Optional numeric `<res>` attribute; zero is kept but logged
fn scan_number(attributes: &str, name: &'static str, id: &str) -> Option<u32> {
    let value = scan_attribute(attributes, name)?.parse::<u32>().ok()?;
    if value == 0 {
        warn!("item {:?} reports {}=0", id, name);
    }
    Some(value)
}
