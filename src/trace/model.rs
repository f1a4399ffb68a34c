use super::Shape;
use crate::error::TraceError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// A complete recorded trace, matching the recorder's JSON output.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Trace {
    pub meta: TraceMeta,
    #[serde(default)]
    pub sessions: Vec<Session>,
}

impl Trace {
    /// Load a trace from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, TraceError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| TraceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| TraceError::JsonParseError {
            path: path.to_path_buf(),
            document: "trace",
            source,
        })
    }

    pub fn new(url: impl Into<String>, sessions: Vec<Session>) -> Self {
        Self {
            meta: TraceMeta {
                url: url.into(),
                recorded_at: None,
                viewport: None,
                duration: None,
            },
            sessions,
        }
    }

    /// Iterates every event of every session, sessions in input order.
    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.sessions.iter().flat_map(|s| s.events.iter())
    }

    pub fn network_events(&self) -> impl Iterator<Item = &Event> {
        self.events().filter(|e| e.kind == EventKind::Network)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TraceMeta {
    /// The URL the recording started on.
    pub url: String,
    #[serde(default)]
    pub recorded_at: Option<String>,
    #[serde(default)]
    pub viewport: Option<Viewport>,
    /// Total recording length in milliseconds.
    #[serde(default)]
    pub duration: Option<u64>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub start_time: u64,
    #[serde(default)]
    pub end_time: Option<u64>,
    #[serde(default)]
    pub events: Vec<Event>,
}

impl Session {
    pub fn new(id: impl Into<String>, start_time: u64, events: Vec<Event>) -> Self {
        Self {
            id: id.into(),
            start_time,
            end_time: events.last().map(|e| e.timestamp),
            events,
        }
    }
}

/// The `type` tag of a recorded event.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum EventKind {
    Click,
    Input,
    Change,
    Submit,
    KeyDown,
    Navigate,
    Network,
    View,
    /// Any event type this crate does not interpret (scroll, focus, ...).
    #[serde(other)]
    Other,
}

impl EventKind {
    /// Events that represent the user triggering something on a screen.
    pub fn is_action(&self) -> bool {
        matches!(self, EventKind::Click | EventKind::Submit)
    }

    pub fn is_ui(&self) -> bool {
        !matches!(self, EventKind::Navigate | EventKind::Network)
    }
}

/// A single recorded event. Only the members relevant to its `type` are set.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: EventKind,
    /// Epoch milliseconds.
    pub timestamp: u64,

    // UI events
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,

    // Network events
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_shape: Option<Shape>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_shape: Option<Shape>,

    // Navigation events
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_url: Option<String>,
}

impl Event {
    pub fn new(id: impl Into<String>, kind: EventKind, timestamp: u64) -> Self {
        Self {
            id: id.into(),
            kind,
            timestamp,
            selector: None,
            label: None,
            value: None,
            method: None,
            url: None,
            status: None,
            request_shape: None,
            response_shape: None,
            to_url: None,
        }
    }

    pub fn navigate(id: impl Into<String>, timestamp: u64, to_url: impl Into<String>) -> Self {
        Self {
            to_url: Some(to_url.into()),
            ..Self::new(id, EventKind::Navigate, timestamp)
        }
    }

    pub fn network(
        id: impl Into<String>,
        timestamp: u64,
        method: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            method: Some(method.into()),
            url: Some(url.into()),
            ..Self::new(id, EventKind::Network, timestamp)
        }
    }

    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = Some(selector.into());
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_request_shape(mut self, shape: Shape) -> Self {
        self.request_shape = Some(shape);
        self
    }

    pub fn with_response_shape(mut self, shape: Shape) -> Self {
        self.response_shape = Some(shape);
        self
    }

    /// The destination of a navigation. Some recorders put it in `url`.
    pub fn destination(&self) -> Option<&str> {
        self.to_url.as_deref().or(self.url.as_deref())
    }

    /// The upper-cased HTTP method of a network event.
    pub fn http_method(&self) -> Option<String> {
        self.method
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_ascii_uppercase)
    }

    /// True when the response signals a client or server error.
    pub fn is_error_response(&self) -> bool {
        self.status.is_some_and(|s| s >= 400)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_trace_parses_recorder_output() {
        let trace: Trace = serde_json::from_value(json!({
            "meta": {
                "url": "https://app.example.com/",
                "recordedAt": "2024-03-01T10:00:00Z",
                "viewport": { "width": 1280, "height": 800 },
                "duration": 4200
            },
            "sessions": [{
                "id": "s1",
                "startTime": 1000,
                "events": [
                    { "id": "e1", "type": "click", "timestamp": 1100, "selector": "#new", "label": "New" },
                    { "id": "e2", "type": "keyDown", "timestamp": 1150 },
                    { "id": "e3", "type": "network", "timestamp": 1200, "method": "post",
                      "url": "/api/orders", "status": 201,
                      "requestShape": { "title": "string" },
                      "responseShape": { "id": "number", "title": "string" } },
                    { "id": "e4", "type": "navigate", "timestamp": 1300, "toUrl": "/orders/1" },
                    { "id": "e5", "type": "scroll", "timestamp": 1400 }
                ]
            }]
        }))
        .unwrap();

        assert_eq!(trace.meta.viewport, Some(Viewport { width: 1280, height: 800 }));
        let events = &trace.sessions[0].events;
        assert_eq!(events[1].kind, EventKind::KeyDown);
        assert_eq!(events[2].http_method().as_deref(), Some("POST"));
        assert!(events[2].request_shape.is_some());
        assert_eq!(events[3].destination(), Some("/orders/1"));
        assert_eq!(events[4].kind, EventKind::Other);
        assert_eq!(trace.sessions[0].end_time, None);
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = Trace::from_file("does/not/exist.json").unwrap_err();
        assert!(err.to_string().contains("does/not/exist.json"));
    }
}
