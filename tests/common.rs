//! Common test utilities for building traces.
use retrace::prelude::*;

pub const APP: &str = "https://app.example.com";

/// One session on an order-management app: browse orders, create one (first
/// attempt rejected with 422), then try to delete it (403) and follow a
/// broken link.
#[allow(dead_code)]
pub const ORDER_TRACE_JSON: &str = r##"{
  "meta": {
    "url": "https://app.example.com/",
    "recordedAt": "2024-05-01T09:00:00Z",
    "viewport": { "width": 1280, "height": 800 },
    "duration": 60000
  },
  "sessions": [{
    "id": "s1",
    "startTime": 1000,
    "events": [
      { "id": "e1", "type": "click", "timestamp": 1100, "selector": "nav a.orders", "label": "Orders" },
      { "id": "e2", "type": "view", "timestamp": 1200, "selector": "main", "label": "Dashboard" },
      { "id": "e3", "type": "navigate", "timestamp": 1300, "toUrl": "https://app.example.com/orders" },
      { "id": "e4", "type": "network", "timestamp": 1350, "method": "GET",
        "url": "https://app.example.com/api/v1/orders?page=1", "status": 200,
        "responseShape": {
          "data": [{ "id": "number", "title": "string", "status": "enum<draft|active|archived>", "createdAt": "date" }],
          "total": "number"
        } },
      { "id": "e5", "type": "click", "timestamp": 1500, "selector": "button.new", "label": "New order" },
      { "id": "e6", "type": "navigate", "timestamp": 1600, "toUrl": "https://app.example.com/orders/new" },
      { "id": "e7", "type": "input", "timestamp": 1700, "selector": "input[name=title]", "label": "Title" },
      { "id": "e8", "type": "submit", "timestamp": 1800, "selector": "form", "label": "Save" },
      { "id": "e9", "type": "network", "timestamp": 1850, "method": "POST",
        "url": "https://app.example.com/api/v1/orders", "status": 422,
        "requestShape": { "title": "string", "customerEmail": "string" } },
      { "id": "e10", "type": "view", "timestamp": 1900, "selector": "#title-error", "label": "Title is required" },
      { "id": "e11", "type": "submit", "timestamp": 2000, "selector": "form", "label": "Save" },
      { "id": "e12", "type": "network", "timestamp": 2050, "method": "POST",
        "url": "https://app.example.com/api/v1/orders", "status": 201,
        "requestShape": { "title": "string", "customerEmail": "string" },
        "responseShape": {
          "id": "number", "title": "string", "customerEmail": "string",
          "status": "enum<draft|active|archived>", "createdAt": "date", "updatedAt": "date"
        } },
      { "id": "e13", "type": "navigate", "timestamp": 2100, "toUrl": "https://app.example.com/orders/17" },
      { "id": "e14", "type": "click", "timestamp": 2200, "selector": "button.delete", "label": "Delete" },
      { "id": "e15", "type": "network", "timestamp": 2250, "method": "DELETE",
        "url": "https://app.example.com/api/v1/orders/17", "status": 403 },
      { "id": "e16", "type": "navigate", "timestamp": 2300, "toUrl": "not a url" }
    ]
  }]
}"##;

#[allow(dead_code)]
pub fn order_trace() -> Trace {
    serde_json::from_str(ORDER_TRACE_JSON).expect("order trace fixture is valid")
}

/// Builds an absolute URL on the test app.
#[allow(dead_code)]
pub fn url(path: &str) -> String {
    format!("{}{}", APP, path)
}

/// A single-session trace starting on the landing page at t=1000.
#[allow(dead_code)]
pub fn trace_with(events: Vec<Event>) -> Trace {
    Trace::new(url("/"), vec![Session::new("s1", 1000, events)])
}

#[allow(dead_code)]
pub fn click(id: &str, timestamp: u64) -> Event {
    Event::new(id, EventKind::Click, timestamp).with_selector(format!("#{}", id))
}

#[allow(dead_code)]
pub fn navigate(id: &str, timestamp: u64, path: &str) -> Event {
    Event::navigate(id, timestamp, url(path))
}

#[allow(dead_code)]
pub fn call(id: &str, timestamp: u64, method: &str, path: &str, status: u16) -> Event {
    Event::network(id, timestamp, method, url(path)).with_status(status)
}

/// The five CRUD calls against `/api/widgets`.
#[allow(dead_code)]
pub fn widget_trace() -> Trace {
    let widget = || {
        Shape::object([
            ("id", Shape::primitive("number")),
            ("name", Shape::primitive("string")),
            ("price", Shape::primitive("number")),
        ])
    };
    let draft = || {
        Shape::object([
            ("name", Shape::primitive("string")),
            ("price", Shape::primitive("number")),
        ])
    };
    trace_with(vec![
        call("n1", 1100, "GET", "/api/widgets", 200).with_response_shape(Shape::array(widget())),
        call("n2", 1200, "POST", "/api/widgets", 201)
            .with_request_shape(draft())
            .with_response_shape(widget()),
        call("n3", 1300, "GET", "/api/widgets/42", 200).with_response_shape(widget()),
        call("n4", 1400, "PATCH", "/api/widgets/42", 200)
            .with_request_shape(Shape::object([("price", Shape::primitive("number"))]))
            .with_response_shape(widget()),
        call("n5", 1500, "DELETE", "/api/widgets/42", 204),
    ])
}

/// Writes a trace to `dir/trace.json` and returns the path.
#[allow(dead_code)]
pub fn write_trace(dir: &std::path::Path, trace: &Trace) -> std::path::PathBuf {
    let path = dir.join("trace.json");
    std::fs::write(&path, serde_json::to_string_pretty(trace).unwrap()).unwrap();
    path
}
