use crate::diagnostics::{Diagnostic, Diagnostics, Stage, codes};
use crate::trace::{EventKind, Trace};
use crate::url::{PARAM_MARKER, normalize_screen_path};
use indexmap::IndexMap;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub const LANDING_SCREEN_ID: &str = "screen-landing";
pub const UNKNOWN_SCREEN_ID: &str = "screen-unknown";

/// A distinct application view, identified by its normalized URL path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Screen {
    pub id: String,
    pub url_pattern: String,
    pub label: String,
    #[serde(default)]
    pub primary_actions: Vec<String>,
}

/// The identity of a screen: everything about it that derives from the URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenKey {
    pub id: String,
    pub url_pattern: String,
    pub label: String,
}

impl ScreenKey {
    /// Resolves a URL to its screen identity. Pure: the same path always
    /// gives the same key, whatever session it was seen in.
    pub fn for_url(raw: &str) -> Self {
        match normalize_screen_path(raw) {
            Some(pattern) => Self::for_pattern(pattern),
            None => Self::unknown(),
        }
    }

    pub fn for_pattern(pattern: String) -> Self {
        if pattern == "/" {
            return Self {
                id: LANDING_SCREEN_ID.to_string(),
                url_pattern: pattern,
                label: "Landing".to_string(),
            };
        }
        let segments: Vec<&str> = pattern.split('/').filter(|s| !s.is_empty()).collect();
        let slug = exact_slug(&segments)
            .unwrap_or_else(|| format!("{}--{}", slugify(&segments), pattern_digest(&pattern)));
        Self {
            id: format!("screen-{}", slug),
            label: segments.iter().map(|s| title_case(s)).join(" / "),
            url_pattern: pattern,
        }
    }

    pub fn unknown() -> Self {
        Self {
            id: UNKNOWN_SCREEN_ID.to_string(),
            url_pattern: "*".to_string(),
            label: "Unknown".to_string(),
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.id == UNKNOWN_SCREEN_ID
    }

    fn into_screen(self) -> Screen {
        Screen {
            id: self.id,
            url_pattern: self.url_pattern,
            label: self.label,
            primary_actions: Vec::new(),
        }
    }
}

/// Slug for paths made only of lowercase words, which can be read back
/// into the same pattern: segments join with `-`, inner hyphens become `_`
/// and the parameter marker becomes `id`. `None` for anything else.
fn exact_slug(segments: &[&str]) -> Option<String> {
    if matches!(segments, ["landing"] | ["unknown"]) {
        return None;
    }
    segments
        .iter()
        .map(|segment| match *segment {
            PARAM_MARKER => Some("id".to_string()),
            "id" => None,
            word if is_slug_word(word) => Some(word.replace('-', "_")),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()
        .map(|parts| parts.join("-"))
}

fn is_slug_word(segment: &str) -> bool {
    segment.split('-').all(|part| {
        !part.is_empty() && part.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
    })
}

/// First eight hex digits of the pattern's SHA-256.
fn pattern_digest(pattern: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(pattern.as_bytes());
    let mut digest = format!("{:x}", hasher.finalize());
    digest.truncate(8);
    digest
}

/// Lossy slug; never contains `--`, so it cannot clash with a digest suffix.
fn slugify(segments: &[&str]) -> String {
    let raw = segments
        .iter()
        .map(|s| s.trim_start_matches(':'))
        .join("-")
        .to_ascii_lowercase();
    raw.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .join("-")
}

/// Turns a path segment into a breadcrumb word: `user-settings` becomes
/// `User Settings`; a parameter becomes `Detail`.
pub fn title_case(segment: &str) -> String {
    if segment == PARAM_MARKER {
        return "Detail".to_string();
    }
    segment
        .split(['-', '_', ' ', '.'])
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .join(" ")
}

/// The outcome of segmenting a trace into screens.
#[derive(Debug)]
pub struct SegmentedScreens {
    pub screens: Vec<Screen>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Partitions a trace's events into screens keyed by normalized URL path.
pub struct ScreenSegmenter<'a> {
    trace: &'a Trace,
}

impl<'a> ScreenSegmenter<'a> {
    pub fn new(trace: &'a Trace) -> Self {
        Self { trace }
    }

    pub fn segment(&self) -> SegmentedScreens {
        let mut diagnostics = Diagnostics::new(Stage::Screens);
        // Keyed by url pattern: one screen per distinct normalized URL.
        let mut screens: IndexMap<String, Screen> = IndexMap::new();

        let root = self.resolve(&self.trace.meta.url, &mut diagnostics);

        for session in &self.trace.sessions {
            let mut current = root.clone();
            screens
                .entry(current.url_pattern.clone())
                .or_insert_with(|| current.clone().into_screen());

            for event in &session.events {
                match event.kind {
                    EventKind::Navigate => {
                        let Some(destination) = event.destination() else {
                            diagnostics.record(
                                codes::MISSING_URL,
                                Some(event.id.as_str()),
                                "navigate event has no destination; screen unchanged",
                            );
                            continue;
                        };
                        current = self.resolve(destination, &mut diagnostics);
                        screens
                            .entry(current.url_pattern.clone())
                            .or_insert_with(|| current.clone().into_screen());
                    }
                    kind if kind.is_action() => {
                        if let Some(screen) = screens.get_mut(&current.url_pattern) {
                            if !screen.primary_actions.contains(&event.id) {
                                screen.primary_actions.push(event.id.clone());
                            }
                        }
                    }
                    _ => {}
                }
            }
        }

        tracing::info!(screens = screens.len(), "segmented trace into screens");
        SegmentedScreens {
            screens: screens.into_values().collect(),
            diagnostics: diagnostics.into_vec(),
        }
    }

    fn resolve(&self, url: &str, diagnostics: &mut Diagnostics) -> ScreenKey {
        let key = ScreenKey::for_url(url);
        if key.is_unknown() {
            diagnostics.record(
                codes::MALFORMED_URL,
                Some(url),
                format!("could not parse URL; attributed to {}", UNKNOWN_SCREEN_ID),
            );
        }
        key
    }
}
