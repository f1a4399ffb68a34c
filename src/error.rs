use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading an input document (a trace, or the
/// flows and entities documents the rules stage reads back).
#[derive(Error, Debug)]
pub enum TraceError {
    #[error("Failed to read input file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse '{path}' as {document} JSON: {source}")]
    JsonParseError {
        path: PathBuf,
        document: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors that can occur while serializing or writing an output document.
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Failed to serialize {document}: {source}")]
    Serialize {
        document: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Could not create output directory '{path}': {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not write output file '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A fatal stage failure. Never escapes a stage function: it is converted
/// into the `errors` list of the stage's report.
#[derive(Error, Debug)]
pub enum StageError {
    #[error(transparent)]
    Input(#[from] TraceError),

    #[error(transparent)]
    Output(#[from] OutputError),

    #[error("The {stage} stage requires the '{input}' input path")]
    MissingInput {
        stage: &'static str,
        input: &'static str,
    },
}
