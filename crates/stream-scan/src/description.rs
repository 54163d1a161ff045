/// UPnP device description scanning
///
/// Finds the friendly name and the ContentDirectory control URL of a media
/// server by retargeting one matcher over the description stream.
use crate::paths::PathKey;
use crate::xpath::{CaptureMode, PathMatcher};
use didlscan_core::{ByteSource, Result, ServerDescription};
use tracing::{debug, info, warn};

/// Service type a media server must offer to be browsable
pub const CONTENT_DIRECTORY_SERVICE: &str = "urn:schemas-upnp-org:service:ContentDirectory:1";

/// Name used when a server's description has no usable `friendlyName`
pub const UNNAMED_SERVER: &str = "Server name not provided";

/// Scan a device description fetched from `location`.
///
/// Returns `None` when the device offers no ContentDirectory service.
pub fn scan_description<S: ByteSource + ?Sized>(
    source: &mut S,
    location: &str,
) -> Result<Option<ServerDescription>> {
    let mut matcher = PathMatcher::new(PathKey::FriendlyName.primary());

    // friendlyName precedes serviceList in every description
    let friendly_name = match matcher.capture_from(source, CaptureMode::CONTENT)? {
        Some(value) if !value.content.is_empty() => value.content,
        Some(_) => {
            warn!("{}: empty friendlyName", location);
            UNNAMED_SERVER.to_string()
        }
        None => {
            warn!("{}: no friendlyName", location);
            return Ok(None);
        }
    };
    debug!("{}: friendlyName {:?}", location, friendly_name);

    matcher.retarget(PathKey::ServiceType.primary());
    loop {
        match matcher.capture_from(source, CaptureMode::CONTENT)? {
            Some(value) if value.content.contains(CONTENT_DIRECTORY_SERVICE) => break,
            Some(value) => debug!("{}: skipping service {:?}", location, value.content),
            None => {
                info!("{:?} offers no ContentDirectory service", friendly_name);
                return Ok(None);
            }
        }
    }

    matcher.retarget(PathKey::ControlUrl.primary());
    let control_path = match matcher.capture_from(source, CaptureMode::CONTENT)? {
        Some(value) if !value.content.is_empty() => value.content,
        _ => {
            warn!("{:?}: ContentDirectory service without controlURL", friendly_name);
            return Ok(None);
        }
    };

    let control_url = resolve_url(location, &control_path);
    info!("found media server {:?}, control url {}", friendly_name, control_url);
    Ok(Some(ServerDescription {
        friendly_name,
        location: location.to_string(),
        control_url,
    }))
}

/// Resolve a potentially relative URL against the description location
pub fn resolve_url(base: &str, url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        return url.to_string();
    }

    let Some(scheme_end) = base.find("://").map(|p| p + 3) else {
        return format!("{}/{}", base.trim_end_matches('/'), url.trim_start_matches('/'));
    };
    let host_end = base[scheme_end..]
        .find('/')
        .map_or(base.len(), |p| scheme_end + p);

    if url.starts_with('/') {
        format!("{}{}", &base[..host_end], url)
    } else {
        // relative to the directory of the description document
        match base[host_end..].rfind('/') {
            Some(last_slash) => format!("{}/{}", &base[..host_end + last_slash], url),
            None => format!("{}/{}", &base[..host_end], url),
        }
    }
}
