//! Guardpost - AI-enriched security finding reports CLI
//!
//! The `guardpost` command replays finding events through the enrichment
//! pipeline against fixture-backed capabilities, for local development and
//! report preview. Deployments wire the same pipeline to real providers.
//!
//! ## Commands
//!
//! - `run`: process a trigger-event file end to end and write the report
//! - `render`: render a report from a finding + analysis text, no pipeline

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use guardpost_capabilities::fakes::{
    FakeAnalysisModel, FakeFindingSource, FakeGraphSource, FakeNotificationBus, FakeObjectStore,
    FakeOneShotScheduler,
};
use guardpost_capabilities::{EntityRecord, Finding};
use guardpost_core::{
    init_tracing, Collaborators, GenerationParams, Pipeline, PipelineConfig, Report, TriggerEvent,
    METRICS,
};
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "guardpost")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "AI-enriched security finding reports", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a trigger event through the pipeline against fixture files
    Run {
        /// Path to the trigger event (JSON)
        #[arg(short, long)]
        event: PathBuf,

        /// Path to the finding fixture the finding source will serve (JSON)
        #[arg(short, long)]
        finding: PathBuf,

        /// Path to the entity records fixture (JSON array)
        #[arg(long)]
        entities: Option<PathBuf>,

        /// Path to the canned analysis text the model will answer with
        #[arg(short, long)]
        analysis: PathBuf,

        /// Simulate a throttled analysis capability instead
        #[arg(long)]
        rate_limited: bool,

        /// Report bucket name
        #[arg(long, env = "GUARDPOST_REPORTS_BUCKET", default_value = "local-reports")]
        bucket: String,

        /// Notification topic
        #[arg(long, env = "GUARDPOST_REPORTS_TOPIC", default_value = "local-notifications")]
        topic: String,

        /// Analysis model identifier
        #[arg(long, env = "GUARDPOST_MODEL_ID")]
        model_id: Option<String>,

        /// Extra provider body argument, `name=value`, repeatable.
        /// Values parse as JSON when possible, else stay literal strings.
        #[arg(long = "body-arg", value_name = "NAME=VALUE")]
        body_args: Vec<String>,

        /// Where to write the rendered report (default: stdout summary only)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Render a report from a finding and analysis text, without the pipeline
    Render {
        /// Path to the finding (JSON)
        #[arg(short, long)]
        finding: PathBuf,

        /// Path to the analysis text
        #[arg(short, long)]
        analysis: PathBuf,

        /// Where to write the rendered report
        #[arg(short, long)]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    init_tracing(cli.json, level);

    match cli.command {
        Commands::Run {
            event,
            finding,
            entities,
            analysis,
            rate_limited,
            bucket,
            topic,
            model_id,
            body_args,
            out,
        } => {
            run_pipeline(RunArgs {
                event,
                finding,
                entities,
                analysis,
                rate_limited,
                bucket,
                topic,
                model_id,
                body_args,
                out,
            })
            .await
        }
        Commands::Render {
            finding,
            analysis,
            out,
        } => render_report(&finding, &analysis, &out),
    }
}

struct RunArgs {
    event: PathBuf,
    finding: PathBuf,
    entities: Option<PathBuf>,
    analysis: PathBuf,
    rate_limited: bool,
    bucket: String,
    topic: String,
    model_id: Option<String>,
    body_args: Vec<String>,
    out: Option<PathBuf>,
}

async fn run_pipeline(args: RunArgs) -> Result<()> {
    let event: TriggerEvent = read_json(&args.event)?;
    let finding: Finding = read_json(&args.finding)?;
    let entities: Vec<EntityRecord> = match &args.entities {
        Some(path) => read_json(path)?,
        None => Vec::new(),
    };
    let analysis_text = fs::read_to_string(&args.analysis)
        .with_context(|| format!("reading {}", args.analysis.display()))?;

    let mut generation = GenerationParams::default();
    if let Some(model_id) = &args.model_id {
        generation = generation.with_model_id(model_id);
    }
    for raw in &args.body_args {
        let (name, value) = split_body_arg(raw)?;
        generation = generation.with_body_arg(name, value);
    }

    let config = PipelineConfig::new(&args.bucket, &args.topic).with_generation(generation);
    config.validate()?;

    let model = if args.rate_limited {
        FakeAnalysisModel::rate_limited()
    } else {
        FakeAnalysisModel::respond_with(analysis_text.trim_end())
    };

    let store = Arc::new(FakeObjectStore::new());
    let bus = Arc::new(FakeNotificationBus::new());
    let scheduler = Arc::new(FakeOneShotScheduler::new());

    let pipeline = Pipeline::new(
        config,
        Collaborators {
            findings: Arc::new(FakeFindingSource::with_finding(
                event.detector_id(),
                finding,
            )),
            graph: Arc::new(FakeGraphSource::new(
                vec!["arn:local:graph/fixture".to_string()],
                entities,
            )),
            model: Arc::new(model),
            store: store.clone(),
            bus: bus.clone(),
            scheduler: scheduler.clone(),
        },
    );

    let result = pipeline.run(&event).await;
    METRICS.flush();

    println!("status: {}", result.status);
    println!("body:   {}", result.body);
    for notification in bus.sent() {
        info!(subject = %notification.subject, "notification captured");
        println!("notification ({}): {}", notification.topic, notification.message.email);
    }
    for schedule in scheduler.created() {
        println!("scheduled retry {} at {}", schedule.name, schedule.when);
    }

    if let Some(out) = &args.out {
        let key = format!("{}.md", event.finding_id());
        match store.object(&key) {
            Some(stored) => {
                fs::write(out, &stored.bytes)
                    .with_context(|| format!("writing {}", out.display()))?;
                println!("report written to {}", out.display());
            }
            None => info!("no report artifact produced, nothing written"),
        }
    }

    if result.status != 200 {
        bail!("pipeline run failed: {}", result.body);
    }
    Ok(())
}

fn render_report(finding_path: &Path, analysis_path: &Path, out: &Path) -> Result<()> {
    let finding: Finding = read_json(finding_path)?;
    let analysis_text = fs::read_to_string(analysis_path)
        .with_context(|| format!("reading {}", analysis_path.display()))?;

    let report = Report::build(&finding, analysis_text.trim_end(), Utc::now());
    fs::write(out, report.to_bytes()).with_context(|| format!("writing {}", out.display()))?;
    println!("report written to {}", out.display());
    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

fn split_body_arg(raw: &str) -> Result<(&str, &str)> {
    raw.split_once('=')
        .ok_or_else(|| anyhow::anyhow!("body arg {raw:?} is not NAME=VALUE"))
}
