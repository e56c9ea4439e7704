//! WellPath CLI - Command-line interface for the WellPath scoring engine
//!
//! Commands:
//! - evaluate: Score a full window with a stored algorithm configuration
//! - progress: Dual progress for a window that is still open
//! - biomarkers: Score biomarker values and aggregate them by pillar
//! - validate: Check a configuration document, marker reference or weight table
//! - algorithms: List the registered algorithm tags

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use wellpath_scoring::biomarker::BiomarkerReport;
use wellpath_scoring::dispatcher::describe;
use wellpath_scoring::pillar::CompositeScore;
use wellpath_scoring::{
    evaluate, evaluate_progress, AlgorithmType, BiomarkerScorer, CompositeWeights,
    ConfigDocument, DailyValueSeries, MarkerReference, PatientInfo, ScoringError,
    ENGINE_NAME, ENGINE_VERSION,
};

/// WellPath - Adherence and biomarker scoring engine
#[derive(Parser)]
#[command(name = "wellpath")]
#[command(version = ENGINE_VERSION)]
#[command(about = "Score adherence windows and biomarkers into pillar scores", long_about = None)]
struct Cli {
    /// Log filter used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Output format
    #[arg(long, global = true, default_value = "json-pretty")]
    output_format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score a complete window of daily values
    Evaluate {
        /// Configuration document path (use - for stdin)
        #[arg(short, long)]
        config: PathBuf,

        /// Daily series path: JSON array of numbers or nulls, day 1 first
        #[arg(short, long)]
        series: PathBuf,
    },

    /// Dual progress for an in-progress window
    Progress {
        /// Configuration document path (use - for stdin)
        #[arg(short, long)]
        config: PathBuf,

        /// Daily series path: JSON array of numbers or nulls, day 1 first
        #[arg(short, long)]
        series: PathBuf,

        /// Day reached so far (1-indexed)
        #[arg(short, long)]
        day: usize,
    },

    /// Score biomarker values against a marker reference
    Biomarkers {
        /// Marker reference path
        #[arg(short, long)]
        reference: PathBuf,

        /// Values path: JSON object of marker key to measured value (use - for stdin)
        #[arg(short, long)]
        values: PathBuf,

        /// Patient context path: JSON object of demographic attributes
        #[arg(short, long)]
        patient: Option<PathBuf>,

        /// Survey percentages per pillar; enables the composite score
        #[arg(long)]
        survey: Option<PathBuf>,

        /// Component weight table; defaults to the built-in table
        #[arg(long)]
        weights: Option<PathBuf>,
    },

    /// Validate a configuration, marker reference or weight table
    Validate {
        /// What the input contains
        #[arg(value_enum)]
        kind: ValidateKind,

        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,
    },

    /// List registered algorithm tags
    Algorithms,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Compact JSON
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

#[derive(Clone, ValueEnum)]
enum ValidateKind {
    /// Algorithm configuration document
    Config,
    /// Marker reference file
    Reference,
    /// Composite component weights
    Weights,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(&cli.log_level) {
        eprintln!("{}", error_json(CliError::from(e)));
        return ExitCode::FAILURE;
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", error_json(CliError::from(e)));
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(level: &str) -> Result<(), WellpathCliError> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level)
            .map_err(|_| WellpathCliError::LogFilter(level.to_string()))?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .compact()
        .try_init()
        .map_err(|e| WellpathCliError::LogFilter(e.to_string()))
}

fn run(cli: Cli) -> Result<(), WellpathCliError> {
    let format = cli.output_format;
    match cli.command {
        Commands::Evaluate { config, series } => cmd_evaluate(&config, &series, &format),

        Commands::Progress {
            config,
            series,
            day,
        } => cmd_progress(&config, &series, day, &format),

        Commands::Biomarkers {
            reference,
            values,
            patient,
            survey,
            weights,
        } => cmd_biomarkers(
            &reference,
            &values,
            patient.as_deref(),
            survey.as_deref(),
            weights.as_deref(),
            &format,
        ),

        Commands::Validate { kind, input } => cmd_validate(kind, &input, &format),

        Commands::Algorithms => cmd_algorithms(&format),
    }
}

fn cmd_evaluate(
    config: &Path,
    series: &Path,
    format: &OutputFormat,
) -> Result<(), WellpathCliError> {
    let document = ConfigDocument::from_json(&read_input(config)?)?;
    let series: DailyValueSeries = serde_json::from_str(&read_input(series)?)?;
    let tag = document.algorithm_type.clone();
    let config = document.into_config()?;

    match evaluate(&tag, &config, &series) {
        Ok(result) => print_output(&result, format),
        Err(ScoringError::InsufficientData {
            required,
            available,
            partial,
        }) => {
            // Best-effort result still goes to stdout
            print_output(&*partial, format)?;
            Err(WellpathCliError::InsufficientData {
                required,
                available,
            })
        }
        Err(e) => Err(e.into()),
    }
}

#[derive(Serialize)]
struct ProgressOutput {
    algorithm: AlgorithmType,
    formula: String,
    #[serde(flatten)]
    progress: wellpath_scoring::DualProgress,
}

fn cmd_progress(
    config: &Path,
    series: &Path,
    day: usize,
    format: &OutputFormat,
) -> Result<(), WellpathCliError> {
    let document = ConfigDocument::from_json(&read_input(config)?)?;
    let series: DailyValueSeries = serde_json::from_str(&read_input(series)?)?;
    let tag = document.algorithm_type.clone();
    let config = document.into_config()?;

    let progress = evaluate_progress(&tag, &config, &series, day)?;
    print_output(
        &ProgressOutput {
            algorithm: config.algorithm_type(),
            formula: describe(&config),
            progress,
        },
        format,
    )
}

#[derive(Serialize)]
struct BiomarkerOutput {
    #[serde(flatten)]
    report: BiomarkerReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    composite: Option<CompositeScore>,
}

fn cmd_biomarkers(
    reference: &Path,
    values: &Path,
    patient: Option<&Path>,
    survey: Option<&Path>,
    weights: Option<&Path>,
    format: &OutputFormat,
) -> Result<(), WellpathCliError> {
    let reference = MarkerReference::from_json(&read_input(reference)?)?;
    let values: BTreeMap<String, f64> = serde_json::from_str(&read_input(values)?)?;
    let patient: Option<PatientInfo> = match patient {
        Some(path) => Some(serde_json::from_str(&read_input(path)?)?),
        None => None,
    };

    let scorer = BiomarkerScorer::new(&reference);
    let report = scorer.score_patient_biomarkers(&values, patient.as_ref());

    let composite = match survey {
        Some(path) => {
            let survey: BTreeMap<String, f64> = serde_json::from_str(&read_input(path)?)?;
            let weights = match weights {
                Some(path) => CompositeWeights::from_json(&read_input(path)?)?,
                None => CompositeWeights::default(),
            };
            Some(weights.combine(&report.pillar_scores, &survey, &BTreeMap::new())?)
        }
        None => None,
    };

    print_output(&BiomarkerOutput { report, composite }, format)
}

#[derive(Serialize)]
struct ValidationReport {
    kind: &'static str,
    valid: bool,
    summary: String,
}

fn cmd_validate(
    kind: ValidateKind,
    input: &Path,
    format: &OutputFormat,
) -> Result<(), WellpathCliError> {
    let data = read_input(input)?;
    let report = match kind {
        ValidateKind::Config => {
            let document = ConfigDocument::from_json(&data)?;
            let config = document.into_config()?;
            ValidationReport {
                kind: "config",
                valid: true,
                summary: format!("{}: {}", config.algorithm_type(), describe(&config)),
            }
        }
        ValidateKind::Reference => {
            let reference = MarkerReference::from_json(&data)?;
            ValidationReport {
                kind: "reference",
                valid: true,
                summary: format!("{} markers", reference.len()),
            }
        }
        ValidateKind::Weights => {
            CompositeWeights::from_json(&data)?;
            ValidationReport {
                kind: "weights",
                valid: true,
                summary: "component weights sum to 1.0 for every pillar".to_string(),
            }
        }
    };
    print_output(&report, format)
}

#[derive(Serialize)]
struct AlgorithmListing {
    engine: &'static str,
    version: &'static str,
    algorithms: Vec<&'static str>,
}

fn cmd_algorithms(format: &OutputFormat) -> Result<(), WellpathCliError> {
    let listing = AlgorithmListing {
        engine: ENGINE_NAME,
        version: ENGINE_VERSION,
        algorithms: AlgorithmType::ALL.iter().map(|a| a.as_str()).collect(),
    };
    print_output(&listing, format)
}

// Helper functions

fn read_input(path: &Path) -> Result<String, WellpathCliError> {
    if path.to_string_lossy() == "-" {
        if atty::is(atty::Stream::Stdin) {
            return Err(WellpathCliError::StdinIsTty);
        }
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(path)?)
    }
}

fn print_output<T: Serialize + ?Sized>(
    value: &T,
    format: &OutputFormat,
) -> Result<(), WellpathCliError> {
    let rendered = match format {
        OutputFormat::Json => serde_json::to_string(value)?,
        OutputFormat::JsonPretty => serde_json::to_string_pretty(value)?,
    };
    println!("{rendered}");
    Ok(())
}

fn error_json(error: CliError) -> String {
    serde_json::to_string(&error).unwrap_or_else(|_| "Unknown error".to_string())
}

// Error types

#[derive(Debug)]
enum WellpathCliError {
    Io(io::Error),
    Json(serde_json::Error),
    Scoring(ScoringError),
    InsufficientData { required: usize, available: usize },
    StdinIsTty,
    LogFilter(String),
}

impl From<io::Error> for WellpathCliError {
    fn from(e: io::Error) -> Self {
        WellpathCliError::Io(e)
    }
}

impl From<serde_json::Error> for WellpathCliError {
    fn from(e: serde_json::Error) -> Self {
        WellpathCliError::Json(e)
    }
}

impl From<ScoringError> for WellpathCliError {
    fn from(e: ScoringError) -> Self {
        match e {
            ScoringError::JsonError(e) => WellpathCliError::Json(e),
            ScoringError::InsufficientData {
                required,
                available,
                ..
            } => WellpathCliError::InsufficientData {
                required,
                available,
            },
            other => WellpathCliError::Scoring(other),
        }
    }
}

#[derive(Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<WellpathCliError> for CliError {
    fn from(e: WellpathCliError) -> Self {
        match e {
            WellpathCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            WellpathCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check the JSON syntax".to_string()),
            },
            WellpathCliError::Scoring(e) => {
                let (code, hint) = match &e {
                    ScoringError::InvalidConfiguration(_) => (
                        "INVALID_CONFIGURATION",
                        "Run 'wellpath validate config' for details",
                    ),
                    ScoringError::UnknownAlgorithmType(_) => (
                        "UNKNOWN_ALGORITHM_TYPE",
                        "Run 'wellpath algorithms' to list registered tags",
                    ),
                    ScoringError::UnknownMarker(_) => (
                        "UNKNOWN_MARKER",
                        "Check the marker key against the reference file",
                    ),
                    _ => ("SCORING_ERROR", "Check the input data"),
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            WellpathCliError::InsufficientData {
                required,
                available,
            } => CliError {
                code: "INSUFFICIENT_DATA".to_string(),
                message: format!("Insufficient data: need {required} days, got {available}"),
                hint: Some("A best-effort result was written to stdout".to_string()),
            },
            WellpathCliError::StdinIsTty => CliError {
                code: "NO_INPUT".to_string(),
                message: "stdin is a terminal, expected piped input".to_string(),
                hint: Some("Pipe a JSON document or pass a file path".to_string()),
            },
            WellpathCliError::LogFilter(value) => CliError {
                code: "LOG_FILTER_ERROR".to_string(),
                message: format!("invalid log level/filter '{value}'"),
                hint: Some("Use a level such as warn, info or debug".to_string()),
            },
        }
    }
}
