//! Stage entry points. Each stage loads its inputs, runs in memory, serializes
//! its output and only then writes it. Failures never escape: they become the
//! `errors` of the returned report.

use crate::diagnostics::{Diagnostic, Stage};
use crate::entity::{EntityResolver, ResolvedEntities};
use crate::error::{StageError, TraceError};
use crate::flow::{
    AssembledFlows, DEFAULT_MAX_FLOW_DURATION_MS, DEFAULT_MIN_STEPS_FOR_FLOW, FlowAssembler,
};
use crate::output::{
    ENTITIES_FILE, EntitiesDocument, FLOWS_FILE, FlowsDocument, JsonDocument, RULES_FILE,
    RulesDocument, SCREENS_FILE, ScreensDocument, write_document,
};
use crate::rules::{ExtractedRules, RuleContext, RuleExtractor};
use crate::screen::{ScreenSegmenter, SegmentedScreens};
use crate::trace::Trace;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Tunable limits of the flow stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Thresholds {
    pub min_steps_for_flow: usize,
    /// Milliseconds.
    pub max_flow_duration: u64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            min_steps_for_flow: DEFAULT_MIN_STEPS_FOR_FLOW,
            max_flow_duration: DEFAULT_MAX_FLOW_DURATION_MS,
        }
    }
}

impl Thresholds {
    /// Loads thresholds from a JSON config file; missing members keep their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, TraceError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| TraceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| TraceError::JsonParseError {
            path: path.to_path_buf(),
            document: "config",
            source,
        })
    }
}

/// Input and output locations of a single stage run.
#[derive(Debug, Clone)]
pub struct StageConfig {
    pub trace_path: PathBuf,
    /// Required by the rules stage only.
    pub flows_path: Option<PathBuf>,
    /// Required by the rules stage only.
    pub entities_path: Option<PathBuf>,
    pub output_path: PathBuf,
    pub thresholds: Thresholds,
}

impl StageConfig {
    pub fn new(trace_path: impl Into<PathBuf>, output_path: impl Into<PathBuf>) -> Self {
        Self {
            trace_path: trace_path.into(),
            flows_path: None,
            entities_path: None,
            output_path: output_path.into(),
            thresholds: Thresholds::default(),
        }
    }

    pub fn with_flows(mut self, path: impl Into<PathBuf>) -> Self {
        self.flows_path = Some(path.into());
        self
    }

    pub fn with_entities(mut self, path: impl Into<PathBuf>) -> Self {
        self.entities_path = Some(path.into());
        self
    }

    pub fn with_thresholds(mut self, thresholds: Thresholds) -> Self {
        self.thresholds = thresholds;
        self
    }
}

/// The result record of one stage.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageReport {
    pub stage: Stage,
    pub success: bool,
    pub output_paths: Vec<PathBuf>,
    pub counts: IndexMap<String, usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
    pub elapsed_ms: u64,
}

impl StageReport {
    pub fn count(&self, name: &str) -> usize {
        self.counts.get(name).copied().unwrap_or(0)
    }
}

/// What a successful stage body hands back.
struct StageOutput {
    output_paths: Vec<PathBuf>,
    counts: IndexMap<String, usize>,
    diagnostics: Vec<Diagnostic>,
}

fn counts<const N: usize>(pairs: [(&str, usize); N]) -> IndexMap<String, usize> {
    pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

/// Runs a stage body and folds its outcome into a report.
fn run_stage<F>(stage: Stage, body: F) -> StageReport
where
    F: FnOnce() -> Result<StageOutput, StageError>,
{
    let _span = tracing::info_span!("stage", stage = %stage).entered();
    let start = Instant::now();
    let result = body();
    let elapsed_ms = start.elapsed().as_millis() as u64;

    match result {
        Ok(output) => {
            tracing::info!(
                elapsed_ms,
                diagnostics = output.diagnostics.len(),
                "stage finished"
            );
            StageReport {
                stage,
                success: true,
                output_paths: output.output_paths,
                counts: output.counts,
                errors: Vec::new(),
                diagnostics: output.diagnostics,
                elapsed_ms,
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "stage failed");
            StageReport {
                stage,
                success: false,
                output_paths: Vec::new(),
                counts: IndexMap::new(),
                errors: vec![e.to_string()],
                diagnostics: Vec::new(),
                elapsed_ms,
            }
        }
    }
}

fn screens_counts(screens: &SegmentedScreens) -> IndexMap<String, usize> {
    counts([("screens", screens.screens.len())])
}

fn flows_counts(flows: &AssembledFlows) -> IndexMap<String, usize> {
    counts([
        ("flows", flows.flows.len()),
        ("steps", flows.flows.iter().map(|f| f.steps.len()).sum()),
    ])
}

fn entities_counts(entities: &ResolvedEntities) -> IndexMap<String, usize> {
    counts([
        ("entities", entities.entities.len()),
        ("operations", entities.total_operations()),
        ("fields", entities.entities.iter().map(|e| e.fields.len()).sum()),
    ])
}

fn rules_counts(extracted: &ExtractedRules) -> IndexMap<String, usize> {
    let rules = &extracted.rules;
    counts([
        ("stateMachines", rules.state_machines.len()),
        ("validationRules", rules.validation_rules.len()),
        ("permissionRules", rules.permission_rules.len()),
        ("businessRules", rules.business_rules.len()),
    ])
}

/// Segments the trace into screens and writes `screens.json`.
pub fn run_screens(config: &StageConfig) -> StageReport {
    run_stage(Stage::Screens, || {
        let trace = Trace::from_file(&config.trace_path)?;
        let screens = ScreenSegmenter::new(&trace).segment();
        let counts = screens_counts(&screens);

        let json = ScreensDocument {
            screens: screens.screens,
        }
        .to_json()?;
        write_document(&config.output_path, &json)?;

        Ok(StageOutput {
            output_paths: vec![config.output_path.clone()],
            counts,
            diagnostics: screens.diagnostics,
        })
    })
}

/// Assembles flows and writes `flows.json`.
pub fn run_flows(config: &StageConfig) -> StageReport {
    run_stage(Stage::Flows, || {
        let trace = Trace::from_file(&config.trace_path)?;
        let flows = assemble_flows(&trace, config.thresholds);
        let counts = flows_counts(&flows);

        let json = FlowsDocument { flows: flows.flows }.to_json()?;
        write_document(&config.output_path, &json)?;

        Ok(StageOutput {
            output_paths: vec![config.output_path.clone()],
            counts,
            diagnostics: flows.diagnostics,
        })
    })
}

/// Resolves entities and writes `entities.json`.
pub fn run_entities(config: &StageConfig) -> StageReport {
    run_stage(Stage::Entities, || {
        let trace = Trace::from_file(&config.trace_path)?;
        let entities = EntityResolver::new(&trace).resolve();
        let counts = entities_counts(&entities);

        let json = EntitiesDocument::new(entities.entities).to_json()?;
        write_document(&config.output_path, &json)?;

        Ok(StageOutput {
            output_paths: vec![config.output_path.clone()],
            counts,
            diagnostics: entities.diagnostics,
        })
    })
}

/// Extracts rules from the trace plus previously written flows and entities,
/// and writes `rules.json`.
pub fn run_rules(config: &StageConfig) -> StageReport {
    run_stage(Stage::Rules, || {
        let flows_path = config.flows_path.as_ref().ok_or(StageError::MissingInput {
            stage: "rules",
            input: "flows",
        })?;
        let entities_path = config
            .entities_path
            .as_ref()
            .ok_or(StageError::MissingInput {
                stage: "rules",
                input: "entities",
            })?;

        let trace = Trace::from_file(&config.trace_path)?;
        let flows = FlowsDocument::from_file(flows_path)?;
        let entities = EntitiesDocument::from_file(entities_path)?;

        let extracted = RuleExtractor::new().extract(&RuleContext::new(
            &entities.entities,
            &flows.flows,
            &trace,
        ));
        let counts = rules_counts(&extracted);

        let json = RulesDocument::new(extracted.rules).to_json()?;
        write_document(&config.output_path, &json)?;

        Ok(StageOutput {
            output_paths: vec![config.output_path.clone()],
            counts,
            diagnostics: extracted.diagnostics,
        })
    })
}

fn assemble_flows(trace: &Trace, thresholds: Thresholds) -> AssembledFlows {
    FlowAssembler::builder(trace)
        .min_steps_for_flow(thresholds.min_steps_for_flow)
        .max_flow_duration(thresholds.max_flow_duration)
        .build()
        .assemble()
}

/// Every stage's result, computed in memory.
#[derive(Debug)]
pub struct Inference {
    pub screens: SegmentedScreens,
    pub flows: AssembledFlows,
    pub entities: ResolvedEntities,
    pub rules: ExtractedRules,
}

/// Runs all four stages over an already loaded trace without touching disk.
pub fn infer(trace: &Trace, thresholds: Thresholds) -> Inference {
    let screens = ScreenSegmenter::new(trace).segment();
    let flows = assemble_flows(trace, thresholds);
    let entities = EntityResolver::new(trace).resolve();
    let rules = RuleExtractor::new().extract(&RuleContext::new(
        &entities.entities,
        &flows.flows,
        trace,
    ));
    Inference {
        screens,
        flows,
        entities,
        rules,
    }
}

/// The result record of a full pipeline run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineReport {
    pub success: bool,
    pub output_dir: PathBuf,
    pub stages: Vec<StageReport>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl PipelineReport {
    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.stages.iter().flat_map(|s| s.diagnostics.iter())
    }
}

/// Best-effort removal of documents written before a failed write.
fn remove_written(paths: &[PathBuf]) {
    for path in paths {
        if let Err(e) = fs::remove_file(path) {
            tracing::warn!(path = %path.display(), error = %e, "could not remove partial output");
        }
    }
}

/// Runs all four stages into `output_dir`. All four documents are serialized
/// before the first file is written, and a failed write removes the files
/// already written, so the directory never holds a partial model.
pub fn run_pipeline(
    trace_path: impl AsRef<Path>,
    output_dir: impl AsRef<Path>,
    thresholds: Thresholds,
) -> PipelineReport {
    let output_dir = output_dir.as_ref().to_path_buf();
    let _span = tracing::info_span!("pipeline", output = %output_dir.display()).entered();

    let failed = |e: StageError| {
        tracing::error!(error = %e, "pipeline failed");
        PipelineReport {
            success: false,
            output_dir: output_dir.clone(),
            stages: Vec::new(),
            errors: vec![e.to_string()],
        }
    };

    let trace = match Trace::from_file(trace_path.as_ref()) {
        Ok(trace) => trace,
        Err(e) => return failed(e.into()),
    };

    let mut timings = Vec::with_capacity(4);
    let mut timed = |stage: Stage, start: Instant| {
        let elapsed_ms = start.elapsed().as_millis() as u64;
        tracing::info!(stage = %stage, elapsed_ms, "stage finished");
        timings.push(elapsed_ms);
    };

    let start = Instant::now();
    let screens = ScreenSegmenter::new(&trace).segment();
    timed(Stage::Screens, start);

    let start = Instant::now();
    let flows = assemble_flows(&trace, thresholds);
    timed(Stage::Flows, start);

    let start = Instant::now();
    let entities = EntityResolver::new(&trace).resolve();
    timed(Stage::Entities, start);

    let start = Instant::now();
    let rules = RuleExtractor::new().extract(&RuleContext::new(
        &entities.entities,
        &flows.flows,
        &trace,
    ));
    timed(Stage::Rules, start);

    let stage_counts = [
        screens_counts(&screens),
        flows_counts(&flows),
        entities_counts(&entities),
        rules_counts(&rules),
    ];
    let stage_diagnostics = [
        screens.diagnostics,
        flows.diagnostics,
        entities.diagnostics,
        rules.diagnostics,
    ];

    let serialized = (|| -> Result<[String; 4], StageError> {
        Ok([
            ScreensDocument {
                screens: screens.screens,
            }
            .to_json()?,
            FlowsDocument { flows: flows.flows }.to_json()?,
            EntitiesDocument::new(entities.entities).to_json()?,
            RulesDocument::new(rules.rules).to_json()?,
        ])
    })();
    let documents = match serialized {
        Ok(documents) => documents,
        Err(e) => return failed(e),
    };

    let paths = [SCREENS_FILE, FLOWS_FILE, ENTITIES_FILE, RULES_FILE].map(|f| output_dir.join(f));
    for (written, (path, json)) in paths.iter().zip(&documents).enumerate() {
        if let Err(e) = write_document(path, json) {
            remove_written(&paths[..written]);
            return failed(e.into());
        }
    }

    let stages = [Stage::Screens, Stage::Flows, Stage::Entities, Stage::Rules]
        .into_iter()
        .zip(paths)
        .zip(stage_counts)
        .zip(stage_diagnostics)
        .zip(timings)
        .map(
            |((((stage, path), counts), diagnostics), elapsed_ms)| StageReport {
                stage,
                success: true,
                output_paths: vec![path],
                counts,
                errors: Vec::new(),
                diagnostics,
                elapsed_ms,
            },
        )
        .collect();

    PipelineReport {
        success: true,
        output_dir,
        stages,
        errors: Vec::new(),
    }
}
