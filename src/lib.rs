//! # Retrace - Behavioral Model Inference from Recorded Traces
//!
//! **Retrace** turns a recorded web-application trace (UI events, navigations
//! and network calls grouped into sessions) into four JSON documents describing
//! the application: the screens it has, the flows users take between them, the
//! data entities behind its API, and the business rules those entities appear
//! to follow.
//!
//! ## Pipeline
//!
//! 1.  **Screens**: events are partitioned by normalized URL path (`/projects/:id`).
//! 2.  **Flows**: steps between two navigations become a flow when they meet the
//!     configured [`Thresholds`](stage::Thresholds).
//! 3.  **Entities**: network calls are clustered by resource path, their request
//!     and response shapes merged into typed fields, and their methods classified
//!     into CRUD operations.
//! 4.  **Rules**: state machines, validation, permission and business rules are
//!     derived from the entities, the flows and error responses in the trace.
//!
//! Heuristic shortfalls never fail a stage. They fall back to a default and are
//! reported as [`Diagnostic`](diagnostics::Diagnostic)s next to the output.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use retrace::prelude::*;
//!
//! fn main() -> Result<()> {
//!     // Every stage in one go, written to ./model
//!     let report = run_pipeline("trace.json", "model", Thresholds::default());
//!     for stage in &report.stages {
//!         println!("{}: {:?}", stage.stage, stage.counts);
//!     }
//!
//!     // Or in memory, without touching disk
//!     let trace = Trace::from_file("trace.json")?;
//!     let inference = infer(&trace, Thresholds::default());
//!     for entity in &inference.entities.entities {
//!         println!("{} ({} operations)", entity.name, entity.operations.len());
//!     }
//!     Ok(())
//! }
//! ```

pub mod diagnostics;
pub mod entity;
pub mod error;
pub mod flow;
pub mod output;
pub mod prelude;
pub mod rules;
pub mod screen;
pub mod stage;
pub mod trace;
pub mod url;
