use clap::{Args, Parser, Subcommand};
use retrace::output::{ENTITIES_FILE, FLOWS_FILE, RULES_FILE, SCREENS_FILE};
use retrace::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Infers screens, flows, entities and rules from a recorded trace
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// JSON file with `minStepsForFlow` / `maxFlowDuration` thresholds
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the minimum number of steps a flow needs
    #[arg(long, global = true)]
    min_steps: Option<usize>,

    /// Override the maximum flow duration, in milliseconds
    #[arg(long, global = true)]
    max_flow_duration: Option<u64>,
}

#[derive(Args, Debug)]
struct SingleStage {
    /// Path to the recorded trace JSON file
    trace: PathBuf,
    /// Where to write the stage's document
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Segment the trace into screens
    Screens(SingleStage),
    /// Assemble user flows between screens
    Flows(SingleStage),
    /// Resolve data entities from network traffic
    Entities(SingleStage),
    /// Extract rules from the trace plus previously written flows and entities
    Rules {
        #[command(flatten)]
        stage: SingleStage,
        /// Path to flows.json
        #[arg(long, default_value = FLOWS_FILE)]
        flows: PathBuf,
        /// Path to entities.json
        #[arg(long, default_value = ENTITIES_FILE)]
        entities: PathBuf,
    },
    /// Run every stage and write all four documents
    All {
        /// Path to the recorded trace JSON file
        trace: PathBuf,
        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let thresholds = resolve_thresholds(&cli);
    let total_start = Instant::now();

    let reports = match cli.command {
        Command::Screens(args) => vec![run_screens(&stage_config(args, SCREENS_FILE, thresholds))],
        Command::Flows(args) => vec![run_flows(&stage_config(args, FLOWS_FILE, thresholds))],
        Command::Entities(args) => {
            vec![run_entities(&stage_config(args, ENTITIES_FILE, thresholds))]
        }
        Command::Rules {
            stage,
            flows,
            entities,
        } => {
            let config = stage_config(stage, RULES_FILE, thresholds)
                .with_flows(flows)
                .with_entities(entities);
            vec![run_rules(&config)]
        }
        Command::All { trace, output } => {
            let report = run_pipeline(&trace, &output, thresholds);
            if !report.success {
                exit_with_error(&report.errors.join("\n"));
            }
            println!("Wrote model to '{}'", report.output_dir.display());
            report.stages
        }
    };

    let failed = print_summary(&reports);
    println!("-----------------------------");
    println!("Total Execution:      {:?}", total_start.elapsed());
    println!();

    if failed {
        std::process::exit(1);
    }
}

/// Config file first, then command-line overrides.
fn resolve_thresholds(cli: &Cli) -> Thresholds {
    let mut thresholds = match &cli.config {
        Some(path) => Thresholds::from_file(path)
            .unwrap_or_else(|e| exit_with_error(&format!("Failed to load config: {}", e))),
        None => Thresholds::default(),
    };
    if let Some(steps) = cli.min_steps {
        thresholds.min_steps_for_flow = steps;
    }
    if let Some(millis) = cli.max_flow_duration {
        thresholds.max_flow_duration = millis;
    }
    thresholds
}

fn stage_config(args: SingleStage, default_output: &str, thresholds: Thresholds) -> StageConfig {
    let output = args
        .output
        .unwrap_or_else(|| Path::new(default_output).to_path_buf());
    StageConfig::new(args.trace, output).with_thresholds(thresholds)
}

/// Prints one block per stage. Returns true when any stage failed.
fn print_summary(reports: &[StageReport]) -> bool {
    let mut failed = false;
    println!("\n--- Stage Summary ---");
    for report in reports {
        let status = if report.success { "ok" } else { "FAILED" };
        println!(
            "{:<10} {:<7} {:>6} ms",
            report.stage.as_str(),
            status,
            report.elapsed_ms
        );
        for (name, count) in &report.counts {
            println!("  {:<20} {}", name, count);
        }
        for path in &report.output_paths {
            println!("  -> {}", path.display());
        }
        for error in &report.errors {
            eprintln!("  Error: {}", error);
        }
        if !report.diagnostics.is_empty() {
            println!("  {} diagnostic(s):", report.diagnostics.len());
            for diagnostic in &report.diagnostics {
                println!("    {}", diagnostic);
            }
        }
        failed |= !report.success;
    }
    failed
}

fn exit_with_error(message: &str) -> ! {
    eprintln!("\nError: {}", message);
    std::process::exit(1);
}
