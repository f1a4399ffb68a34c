//! Prelude module for convenient imports
//!
//! This module re-exports the most commonly used types from the retrace crate.
//!
//! # Example
//!
//! ```rust,no_run
//! use retrace::prelude::*;
//!
//! # fn run_example() -> Result<()> {
//! let thresholds = Thresholds::from_file("retrace.json")?;
//! let config = StageConfig::new("trace.json", "out/flows.json").with_thresholds(thresholds);
//!
//! let report = run_flows(&config);
//! println!("{} flows, {} diagnostics", report.count("flows"), report.diagnostics.len());
//! # Ok(())
//! # }
//! ```

// Stage entry points
pub use crate::stage::{
    Inference, PipelineReport, StageConfig, StageReport, Thresholds, infer, run_entities,
    run_flows, run_pipeline, run_rules, run_screens,
};

// Input model
pub use crate::trace::{Event, EventKind, Session, Shape, Trace};

// Stage components and their outputs
pub use crate::entity::{Entity, EntityResolver};
pub use crate::flow::{Flow, FlowAssembler};
pub use crate::rules::{RuleContext, RuleExtractor, RuleSet};
pub use crate::screen::{Screen, ScreenSegmenter};

// Output documents
pub use crate::output::{
    EntitiesDocument, FlowsDocument, JsonDocument, RulesDocument, ScreensDocument,
};

// Diagnostics and errors
pub use crate::diagnostics::{Diagnostic, Stage};
pub use crate::error::{OutputError, StageError, TraceError};

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;
