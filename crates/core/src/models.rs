use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Media kind of an item, derived from its `upnp:class`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    #[default]
    Other,
    Audio,
    Image,
    Video,
}

impl FileType {
    /// Classify a UPnP class string (e.g. `object.item.audioItem.musicTrack`).
    ///
    /// Ordered containment tests, first match wins: audio, image, video.
    pub fn from_upnp_class(class: &str) -> Self {
        if class.contains("audioItem") {
            FileType::Audio
        } else if class.contains("imageItem") {
            FileType::Image
        } else if class.contains("videoItem") {
            FileType::Video
        } else {
            FileType::Other
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Other => "other",
            FileType::Audio => "audio",
            FileType::Image => "image",
            FileType::Video => "video",
        }
    }
}

/// Error type for invalid file type strings
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseFileTypeError;

impl std::fmt::Display for ParseFileTypeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid file type value")
    }
}

impl std::error::Error for ParseFileTypeError {}

impl FromStr for FileType {
    type Err = ParseFileTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "other" => Ok(FileType::Other),
            "audio" => Ok(FileType::Audio),
            "image" | "picture" => Ok(FileType::Image),
            "video" => Ok(FileType::Video),
            _ => Err(ParseFileTypeError),
        }
    }
}

/// Scheme of an absolute resource URI
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UriScheme {
    #[default]
    Http,
    Https,
}

impl UriScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            UriScheme::Http => "http",
            UriScheme::Https => "https",
        }
    }

    /// Port implied when the authority names none
    pub fn default_port(&self) -> u16 {
        match self {
            UriScheme::Http => 80,
            UriScheme::Https => 443,
        }
    }
}

/// Scheme, host and port a resource is downloaded from.
///
/// May differ from the address of the server's control endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadAddress {
    #[serde(default)]
    pub scheme: UriScheme,
    pub host: String,
    pub port: u16,
}

/// Location of an item's resource, split into download address and path
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceUri {
    /// Present when the server sent an absolute `http(s)://host[:port]/...` URI
    pub download: Option<DownloadAddress>,
    /// Path without the leading slash, or the raw URI when it was not absolute
    pub path: String,
}

impl ResourceUri {
    /// Reassemble an absolute URL, if the download address is known.
    ///
    /// The port is left out when it is the scheme's default.
    pub fn url(&self) -> Option<String> {
        self.download.as_ref().map(|d| {
            if d.port == d.scheme.default_port() {
                format!("{}://{}/{}", d.scheme.as_str(), d.host, self.path)
            } else {
                format!("{}://{}:{}/{}", d.scheme.as_str(), d.host, d.port, self.path)
            }
        })
    }
}

/// A `<container>` element (directory)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerRecord {
    pub id: String,
    pub parent_id: String,
    /// `None` when the server did not provide `childCount` (e.g. Kodi)
    pub child_count: Option<u64>,
    /// Defaults to true when the server omits the attribute
    pub searchable: bool,
    pub title: String,
}

/// An `<item>` element (file or stream)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub id: String,
    pub parent_id: String,
    pub title: String,
    pub album: Option<String>,
    pub artist: Option<String>,
    pub genre: Option<String>,
    pub upnp_class: Option<String>,
    pub file_type: FileType,
    pub resource: ResourceUri,
    /// `None` when the `<res>` element carries no `size` attribute
    pub size: Option<u64>,
    pub bitrate: Option<u32>,
    pub sample_frequency: Option<u32>,
}

impl ItemRecord {
    /// True when the server did not report a size for this item
    pub fn size_missing(&self) -> bool {
        self.size.is_none()
    }
}

/// One entry of a browse or search result
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DidlRecord {
    Container(ContainerRecord),
    Item(ItemRecord),
}

impl DidlRecord {
    pub fn id(&self) -> &str {
        match self {
            DidlRecord::Container(c) => &c.id,
            DidlRecord::Item(i) => &i.id,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            DidlRecord::Container(c) => &c.title,
            DidlRecord::Item(i) => &i.title,
        }
    }

    pub fn is_container(&self) -> bool {
        matches!(self, DidlRecord::Container(_))
    }
}

/// Vital information about a media server, taken from its device description
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerDescription {
    pub friendly_name: String,
    /// URL the description was fetched from
    pub location: String,
    /// ContentDirectory control URL, resolved against `location`
    pub control_url: String,
}
