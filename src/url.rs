//! URL parsing and path normalization shared by every stage.
//!
//! Only two forms are accepted: absolute URLs (`scheme://host/path?query`) and
//! root-relative paths (`/path?query`). Everything else is malformed.

use once_cell::sync::Lazy;
use regex::Regex;

/// Placeholder that replaces numeric and UUID path segments.
pub const PARAM_MARKER: &str = ":id";

static URL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?P<origin>[A-Za-z][A-Za-z0-9+.\-]*://[^/\s?#]+)?(?P<path>/[^\s?#]*)?(?:\?[^\s#]*)?(?:#\S*)?$",
    )
    .expect("url pattern is valid")
});

static UUID_SEGMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
        .expect("uuid pattern is valid")
});

static VERSION_SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[vV]\d+$").expect("version pattern is valid"));

static ASSET_SEGMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\.(?:js|mjs|cjs|css|map|png|jpe?g|gif|svg|ico|webp|avif|woff2?|ttf|otf|eot|html?|txt|xml)$",
    )
    .expect("asset pattern is valid")
});

/// Extracts the path of a URL, without query or fragment. A URL with an
/// origin but no path yields `/`.
pub fn url_path(raw: &str) -> Option<&str> {
    let raw = raw.trim();
    let captures = URL_PATTERN.captures(raw)?;
    match (captures.name("origin"), captures.name("path")) {
        (_, Some(path)) => Some(path.as_str()),
        (Some(_), None) => Some("/"),
        (None, None) => None,
    }
}

/// Returns true for purely numeric or UUID-shaped segments.
pub fn is_param_segment(segment: &str) -> bool {
    (!segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()))
        || UUID_SEGMENT.is_match(segment)
}

/// Splits a path into its non-empty segments, collapsing parameters.
pub fn normalized_segments(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(|s| {
            if is_param_segment(s) {
                PARAM_MARKER.to_string()
            } else {
                s.to_string()
            }
        })
        .collect()
}

fn join_segments(segments: &[String]) -> String {
    format!("/{}", segments.join("/"))
}

/// Normalizes a URL into the path pattern used to identify screens,
/// e.g. `https://app.test/projects/42?tab=1` becomes `/projects/:id`.
pub fn normalize_screen_path(raw: &str) -> Option<String> {
    url_path(raw).map(|path| join_segments(&normalized_segments(path)))
}

/// A network URL reduced to its resource form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourcePath {
    /// Normalized path, API and version prefixes removed.
    pub path: String,
    pub segments: Vec<String>,
}

impl ResourcePath {
    /// The first segment that is not a parameter marker. Always present on
    /// paths produced by [`normalize_resource_path`].
    pub fn root(&self) -> &str {
        self.segments
            .iter()
            .map(String::as_str)
            .find(|s| *s != PARAM_MARKER)
            .unwrap_or_default()
    }

    pub fn ends_with_param(&self) -> bool {
        self.segments.last().is_some_and(|s| s == PARAM_MARKER)
    }

    pub fn last_segment(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }
}

/// Why a network URL could not be reduced to a resource path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourcePathError {
    Malformed,
    StaticAsset,
    /// Nothing but prefixes and parameters.
    Empty,
}

/// Normalizes a network URL for entity clustering: drops the query, strips
/// a leading `api` segment and/or version segment, and collapses parameters.
pub fn normalize_resource_path(raw: &str) -> Result<ResourcePath, ResourcePathError> {
    let path = url_path(raw).ok_or(ResourcePathError::Malformed)?;

    if path
        .rsplit('/')
        .find(|s| !s.is_empty())
        .is_some_and(|last| ASSET_SEGMENT.is_match(last))
    {
        return Err(ResourcePathError::StaticAsset);
    }

    let mut segments = normalized_segments(path);
    if segments
        .first()
        .is_some_and(|s| s.eq_ignore_ascii_case("api"))
    {
        segments.remove(0);
    }
    if segments.first().is_some_and(|s| VERSION_SEGMENT.is_match(s)) {
        segments.remove(0);
    }
    if segments.iter().all(|s| s == PARAM_MARKER) {
        return Err(ResourcePathError::Empty);
    }

    Ok(ResourcePath {
        path: join_segments(&segments),
        segments,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_path_forms() {
        assert_eq!(url_path("https://app.test/a/b?x=1#top"), Some("/a/b"));
        assert_eq!(url_path("https://app.test"), Some("/"));
        assert_eq!(url_path("http://localhost:3000?next=1"), Some("/"));
        assert_eq!(url_path("/relative/path"), Some("/relative/path"));
        assert_eq!(url_path(""), None);
        assert_eq!(url_path("not a url"), None);
        assert_eq!(url_path("relative/path"), None);
    }

    #[test]
    fn test_screen_path_collapses_ids() {
        assert_eq!(
            normalize_screen_path("https://app.test/projects/42/tasks/9f8b6c1e-2a3d-4e5f-8a9b-0c1d2e3f4a5b/"),
            Some("/projects/:id/tasks/:id".to_string())
        );
        assert_eq!(normalize_screen_path("https://app.test/"), Some("/".to_string()));
    }

    #[test]
    fn test_resource_path_strips_prefixes() {
        let resource = normalize_resource_path("https://api.test/api/v2/widgets/42?expand=1").unwrap();
        assert_eq!(resource.path, "/widgets/:id");
        assert_eq!(resource.root(), "widgets");
        assert!(resource.ends_with_param());

        let unversioned = normalize_resource_path("/v1/orders").unwrap();
        assert_eq!(unversioned.path, "/orders");
    }

    #[test]
    fn test_resource_path_rejections() {
        assert_eq!(
            normalize_resource_path("https://cdn.test/static/app.js"),
            Err(ResourcePathError::StaticAsset)
        );
        assert_eq!(normalize_resource_path("/api"), Err(ResourcePathError::Empty));
        assert_eq!(normalize_resource_path("/api/v1/42"), Err(ResourcePathError::Empty));
        assert_eq!(
            normalize_resource_path("::::"),
            Err(ResourcePathError::Malformed)
        );
    }

    #[test]
    fn test_param_detection() {
        assert!(is_param_segment("123"));
        assert!(is_param_segment("9F8B6C1E-2A3D-4E5F-8A9B-0C1D2E3F4A5B"));
        assert!(!is_param_segment("v1"));
        assert!(!is_param_segment(""));
    }
}
