use super::{
    DEFAULT_MAX_FLOW_DURATION_MS, DEFAULT_MIN_STEPS_FOR_FLOW, Flow, FlowStep, StepKind, UNKNOWN_METHOD,
};
use crate::diagnostics::{Diagnostic, Diagnostics, Stage, codes};
use crate::screen::ScreenKey;
use crate::trace::{Event, EventKind, Session, Trace};
use crate::url::normalize_screen_path;

/// The outcome of assembling flows from a trace.
#[derive(Debug)]
pub struct AssembledFlows {
    pub flows: Vec<Flow>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Groups each session's steps between navigations into named flows.
pub struct FlowAssembler<'a> {
    trace: &'a Trace,
    min_steps_for_flow: usize,
    max_flow_duration: u64,
}

pub struct FlowAssemblerBuilder<'a> {
    trace: &'a Trace,
    min_steps_for_flow: usize,
    max_flow_duration: u64,
}

impl<'a> FlowAssemblerBuilder<'a> {
    pub fn new(trace: &'a Trace) -> Self {
        Self {
            trace,
            min_steps_for_flow: DEFAULT_MIN_STEPS_FOR_FLOW,
            max_flow_duration: DEFAULT_MAX_FLOW_DURATION_MS,
        }
    }

    pub fn min_steps_for_flow(mut self, steps: usize) -> Self {
        self.min_steps_for_flow = steps;
        self
    }

    /// Maximum flow length in milliseconds.
    pub fn max_flow_duration(mut self, millis: u64) -> Self {
        self.max_flow_duration = millis;
        self
    }

    pub fn build(self) -> FlowAssembler<'a> {
        FlowAssembler {
            trace: self.trace,
            min_steps_for_flow: self.min_steps_for_flow,
            max_flow_duration: self.max_flow_duration,
        }
    }
}

/// Per-run state. Flow ids come from this counter, never from a global.
struct AssemblyRun {
    next_flow_id: usize,
    flows: Vec<Flow>,
    diagnostics: Diagnostics,
}

impl AssemblyRun {
    fn next_id(&mut self) -> String {
        self.next_flow_id += 1;
        format!("flow-{}", self.next_flow_id)
    }
}

impl<'a> FlowAssembler<'a> {
    pub fn builder(trace: &'a Trace) -> FlowAssemblerBuilder<'a> {
        FlowAssemblerBuilder::new(trace)
    }

    pub fn new(trace: &'a Trace) -> Self {
        FlowAssemblerBuilder::new(trace).build()
    }

    pub fn assemble(&self) -> AssembledFlows {
        let mut run = AssemblyRun {
            next_flow_id: 0,
            flows: Vec::new(),
            diagnostics: Diagnostics::new(Stage::Flows),
        };

        let root = ScreenKey::for_url(&self.trace.meta.url);
        for session in &self.trace.sessions {
            self.assemble_session(session, &root, &mut run);
        }

        tracing::info!(flows = run.flows.len(), "assembled flows");
        AssembledFlows {
            flows: run.flows,
            diagnostics: run.diagnostics.into_vec(),
        }
    }

    fn assemble_session(&self, session: &Session, root: &ScreenKey, run: &mut AssemblyRun) {
        let mut current = root.clone();
        let mut steps: Vec<FlowStep> = Vec::new();
        let mut flow_start = session.start_time;
        let mut previous_timestamp = session.start_time;

        for event in &session.events {
            let duration = event.timestamp.saturating_sub(previous_timestamp);
            previous_timestamp = event.timestamp;

            if event.kind != EventKind::Navigate {
                if let Some(step) = step_for(event, &current, duration) {
                    steps.push(step);
                }
                continue;
            }

            let Some(destination) = event.destination() else {
                run.diagnostics.record(
                    codes::MISSING_URL,
                    Some(event.id.as_str()),
                    "navigate event has no destination; ignored",
                );
                continue;
            };
            let target = ScreenKey::for_url(destination);
            let navigation = FlowStep {
                kind: StepKind::Navigate,
                screen: current.id.clone(),
                action: Some(event.id.clone()),
                operation: None,
                duration,
            };

            if target.url_pattern == current.url_pattern {
                steps.push(navigation);
                continue;
            }

            if steps.len() >= self.min_steps_for_flow {
                steps.push(navigation);
                let elapsed = event.timestamp.saturating_sub(flow_start);
                let name = format!("{} → {}", current.label, target.label);
                if elapsed <= self.max_flow_duration {
                    let id = run.next_id();
                    tracing::debug!(%id, %name, steps = steps.len(), "emitting flow");
                    run.flows.push(Flow {
                        id,
                        name,
                        from_screen: current.id.clone(),
                        to_screen: target.id.clone(),
                        steps: std::mem::take(&mut steps),
                        avg_duration: elapsed,
                    });
                } else {
                    run.diagnostics.record(
                        codes::FLOW_TOO_LONG,
                        Some(session.id.as_str()),
                        format!(
                            "dropped '{}' spanning {}ms (limit {}ms)",
                            name, elapsed, self.max_flow_duration
                        ),
                    );
                }
            } else {
                run.diagnostics.record(
                    codes::FLOW_TOO_SHORT,
                    Some(session.id.as_str()),
                    format!(
                        "{} step(s) before navigating from {} to {}; at least {} required",
                        steps.len(),
                        current.id,
                        target.id,
                        self.min_steps_for_flow
                    ),
                );
            }

            steps.clear();
            flow_start = event.timestamp;
            current = target;
        }
    }
}

fn step_for(event: &Event, screen: &ScreenKey, duration: u64) -> Option<FlowStep> {
    let (kind, action, operation) = match event.kind {
        EventKind::View => (StepKind::View, None, None),
        EventKind::Click | EventKind::Submit => (StepKind::Click, Some(event.id.clone()), None),
        EventKind::Input | EventKind::Change | EventKind::KeyDown => {
            (StepKind::Input, Some(event.id.clone()), None)
        }
        EventKind::Network => (StepKind::Network, None, Some(operation_of(event))),
        EventKind::Navigate | EventKind::Other => return None,
    };
    Some(FlowStep {
        kind,
        screen: screen.id.clone(),
        action,
        operation,
        duration,
    })
}

/// `"METHOD /normalized/path"`; the raw URL is kept when it cannot be parsed.
fn operation_of(event: &Event) -> String {
    let method = event
        .http_method()
        .unwrap_or_else(|| UNKNOWN_METHOD.to_string());
    let url = event.url.as_deref().unwrap_or_default();
    let path = normalize_screen_path(url).unwrap_or_else(|| url.to_string());
    format!("{} {}", method, path)
}
