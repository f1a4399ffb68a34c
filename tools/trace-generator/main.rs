use clap::Parser;
use rand::Rng;
use rand::rngs::ThreadRng;
use retrace::trace::{Event, EventKind, Session, Shape, Trace, TraceMeta, Viewport};
use std::fs;

const ORIGIN: &str = "https://app.example.com";
const STATUSES: &str = "enum<draft|pending|active|archived>";

/// A CLI tool to generate synthetic traces for the retrace pipeline
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// The path to write the generated trace to
    #[arg(short, long, default_value = "generated_trace.json")]
    output: String,

    /// Number of sessions to record
    #[arg(long, default_value_t = 3)]
    sessions: usize,

    /// Approximate number of events per session
    #[arg(long, default_value_t = 40)]
    events: usize,

    /// Comma-separated plural resource names the fake app exposes
    #[arg(long, value_delimiter = ',', default_value = "orders,customers,invoices")]
    resources: Vec<String>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let mut rng = rand::rng();

    if cli.resources.is_empty() {
        eprintln!("Error: --resources needs at least one resource name");
        std::process::exit(1);
    }

    println!(
        "Generating {} session(s) of ~{} events over [{}]...",
        cli.sessions,
        cli.events,
        cli.resources.join(", ")
    );

    let mut clock = 1_700_000_000_000u64;
    let start = clock;
    let sessions: Vec<Session> = (0..cli.sessions)
        .map(|i| {
            let session = generate_session(&mut rng, i, &mut clock, cli.events, &cli.resources);
            println!("-> Generated session '{}' with {} events.", session.id, session.events.len());
            // Idle gap between sessions.
            clock += rng.random_range(60_000..600_000);
            session
        })
        .collect();

    let trace = Trace {
        meta: TraceMeta {
            url: format!("{}/", ORIGIN),
            recorded_at: Some(chrono::Utc::now().to_rfc3339()),
            viewport: Some(Viewport {
                width: 1440,
                height: 900,
            }),
            duration: Some(clock - start),
        },
        sessions,
    };

    let json_output = serde_json::to_string_pretty(&trace)?;
    fs::write(&cli.output, json_output)?;

    println!("Successfully generated and saved trace to '{}'", cli.output);
    Ok(())
}

/// Per-session event factory with monotonic ids and timestamps.
struct Recorder<'a> {
    rng: &'a mut ThreadRng,
    session: usize,
    clock: &'a mut u64,
    events: Vec<Event>,
}

impl Recorder<'_> {
    fn tick(&mut self, min: u64, max: u64) -> (String, u64) {
        *self.clock += self.rng.random_range(min..max);
        let id = format!("s{}-e{}", self.session + 1, self.events.len() + 1);
        (id, *self.clock)
    }

    fn ui(&mut self, kind: EventKind, selector: &str, label: &str) {
        let (id, ts) = self.tick(300, 4_000);
        self.events.push(
            Event::new(id, kind, ts)
                .with_selector(selector)
                .with_label(label),
        );
    }

    fn navigate(&mut self, path: &str) {
        let (id, ts) = self.tick(100, 800);
        self.events.push(Event::navigate(id, ts, format!("{}{}", ORIGIN, path)));
    }

    fn call(&mut self, method: &str, path: &str, status: u16, request: Option<Shape>, response: Option<Shape>) {
        let (id, ts) = self.tick(20, 400);
        let mut event = Event::network(id, ts, method, format!("{}/api/v1{}", ORIGIN, path)).with_status(status);
        event.request_shape = request;
        event.response_shape = response;
        self.events.push(event);
    }
}

fn generate_session(
    rng: &mut ThreadRng,
    index: usize,
    clock: &mut u64,
    target_events: usize,
    resources: &[String],
) -> Session {
    let start_time = *clock;
    let mut recorder = Recorder {
        rng,
        session: index,
        clock,
        events: Vec::new(),
    };

    recorder.call("GET", "/me", 200, None, Some(user_shape()));
    while recorder.events.len() < target_events {
        let resource = &resources[recorder.rng.random_range(0..resources.len())];
        match recorder.rng.random_range(0..4) {
            0 => browse(&mut recorder, resource),
            1 => create(&mut recorder, resource),
            2 => edit(&mut recorder, resource),
            _ => remove(&mut recorder, resource),
        }
    }

    Session::new(format!("session-{}", index + 1), start_time, recorder.events)
}

/// Landing page → list → detail.
fn browse(r: &mut Recorder<'_>, resource: &str) {
    let id = r.rng.random_range(1..500);
    r.ui(EventKind::Click, &format!("nav a[href='/{}']", resource), &title(resource));
    r.ui(EventKind::View, "main h1", &title(resource));
    r.navigate(&format!("/{}", resource));
    r.call("GET", &format!("/{}?page=1", resource), 200, None, Some(list_shape()));
    r.ui(EventKind::Click, "table tr:first-child", "Open");
    r.ui(EventKind::View, "main .details", "Details");
    r.navigate(&format!("/{}/{}", resource, id));
    r.call("GET", &format!("/{}/{}", resource, id), 200, None, Some(record_shape()));
}

/// New form, occasionally rejected once with 422 before succeeding.
fn create(r: &mut Recorder<'_>, resource: &str) {
    r.ui(EventKind::Click, "button.new", "New");
    r.navigate(&format!("/{}/new", resource));
    r.ui(EventKind::Input, "input[name='name']", "Name");
    r.ui(EventKind::Input, "input[name='email']", "Email");
    if r.rng.random_bool(0.3) {
        r.ui(EventKind::Submit, "form", "Save");
        r.call("POST", &format!("/{}", resource), 422, Some(draft_shape()), None);
        r.ui(EventKind::View, "#email-error", "Email is invalid");
        r.ui(EventKind::Change, "input[name='email']", "Email");
    }
    r.ui(EventKind::Submit, "form", "Save");
    r.call("POST", &format!("/{}", resource), 201, Some(draft_shape()), Some(record_shape()));
    let id = r.rng.random_range(500..1000);
    r.navigate(&format!("/{}/{}", resource, id));
}

/// Detail → edit → archive or approve.
fn edit(r: &mut Recorder<'_>, resource: &str) {
    let id = r.rng.random_range(1..500);
    r.navigate(&format!("/{}/{}", resource, id));
    r.ui(EventKind::Click, "button.edit", "Edit");
    r.navigate(&format!("/{}/{}/edit", resource, id));
    let (label, verb) = if r.rng.random_bool(0.5) {
        ("Archive", "archive")
    } else {
        ("Approve", "approve")
    };
    r.ui(EventKind::Change, "select[name='status']", "Status");
    r.ui(EventKind::Click, &format!("button.{}", verb), label);
    r.call(
        "PATCH",
        &format!("/{}/{}", resource, id),
        200,
        Some(Shape::object([("status", Shape::primitive(STATUSES))])),
        Some(record_shape()),
    );
    r.navigate(&format!("/{}/{}/{}", resource, id, verb));
}

/// Delete from the detail page; non-admins get a 403.
fn remove(r: &mut Recorder<'_>, resource: &str) {
    let id = r.rng.random_range(1..500);
    r.navigate(&format!("/{}/{}", resource, id));
    r.ui(EventKind::Click, "button.delete", "Delete");
    r.ui(EventKind::Click, "dialog button.confirm", "Confirm");
    let status = if r.rng.random_bool(0.2) { 403 } else { 204 };
    r.call("DELETE", &format!("/{}/{}", resource, id), status, None, None);
    r.navigate(&format!("/{}", resource));
}

fn title(resource: &str) -> String {
    let mut chars = resource.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn user_shape() -> Shape {
    Shape::object([
        ("id", Shape::primitive("string")),
        ("email", Shape::primitive("string")),
        ("roles", Shape::array(Shape::primitive("string"))),
    ])
}

fn draft_shape() -> Shape {
    Shape::object([
        ("name", Shape::primitive("string")),
        ("email", Shape::primitive("string")),
        ("amount", Shape::primitive("number")),
    ])
}

fn record_shape() -> Shape {
    Shape::object([
        ("id", Shape::primitive("number")),
        ("name", Shape::primitive("string")),
        ("email", Shape::primitive("string")),
        ("amount", Shape::primitive("number")),
        ("status", Shape::primitive(STATUSES)),
        ("createdAt", Shape::primitive("date")),
        ("updatedAt", Shape::primitive("date")),
    ])
}

fn list_shape() -> Shape {
    Shape::object([
        ("data", Shape::array(record_shape())),
        ("total", Shape::primitive("number")),
        ("page", Shape::primitive("number")),
    ])
}
