//! imgpipe - run an image through a pipeline of remote processing services
//!
//! ```text
//! imgpipe <BASE_URL> <IMAGE_PATH> <PIPELINE> <API_VERSION> [SELECTOR]
//! ```
//!
//! `PIPELINE` is a comma-separated list of `service[.priority]` tokens.
//! Services sharing a priority run concurrently. The final sample, or the
//! value at `SELECTOR`, is printed to stdout as one line of JSON.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use serde_json::Value;
use tracing::{info, Level};

use imgpipe_core::{
    encode_envelope, ApiVersion, FailurePolicy, HttpProcessor, HttpProcessorConfig, Orchestrator,
    PipelineConfig, PipelineDescriptor, Selector,
};

#[derive(Parser, Debug)]
#[command(name = "imgpipe")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Run an image through a pipeline of remote processing services", long_about = None)]
struct Cli {
    /// Base URL of the processing services
    base_url: String,

    /// Image file to send
    image_path: PathBuf,

    /// Pipeline specification, e.g. "detect,classify.1,pose.1"
    pipeline: String,

    /// API version: "1" or "2"
    api_version: String,

    /// Dotted selector applied to the final sample, e.g. "objects.0.label"
    selector: Option<String>,

    /// Attach per-service timing under "durations"
    /// (also enabled by ENABLE_PROCESSING_DURATION_TRACER=true|1)
    #[arg(long)]
    trace_durations: bool,

    /// What to do when a service call fails
    #[arg(long, value_enum, default_value_t = OnFailure::Abort)]
    on_failure: OnFailure,

    /// Use version-less endpoints: {base}/{service}/process/sample
    #[arg(long)]
    legacy_endpoints: bool,

    /// Per-request timeout in seconds (default: wait indefinitely)
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OnFailure {
    /// Fail the run on the first failed service
    Abort,
    /// Ignore failed services unless a whole stage fails
    Skip,
}

impl From<OnFailure> for FailurePolicy {
    fn from(value: OnFailure) -> Self {
        match value {
            OnFailure::Abort => FailurePolicy::Abort,
            OnFailure::Skip => FailurePolicy::Skip,
        }
    }
}

impl Cli {
    /// Environment defaults with the command-line flags applied on top.
    fn pipeline_config(&self) -> PipelineConfig {
        let mut config = PipelineConfig::from_env().with_failure_policy(self.on_failure.into());
        if self.trace_durations {
            config = config.with_trace_durations(true);
        }
        config
    }

    fn processor_config(&self, api_version: ApiVersion) -> HttpProcessorConfig {
        let mut config = HttpProcessorConfig::new(&self.base_url, api_version);
        if self.legacy_endpoints {
            config = config.legacy();
        }
        if let Some(secs) = self.timeout_secs {
            config = config.with_timeout(Duration::from_secs(secs));
        }
        config
    }

    /// Selector to apply, if any. An empty string means none.
    fn selector(&self) -> Result<Option<Selector>> {
        match self.selector.as_deref() {
            None | Some("") => Ok(None),
            Some(raw) => Ok(Some(
                Selector::parse(raw).with_context(|| format!("Invalid selector {raw:?}"))?,
            )),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };
    imgpipe_core::init_tracing(cli.json, level);

    let output = run(&cli).await?;
    println!("{}", serde_json::to_string(&output)?);
    Ok(())
}

/// Execute the pipeline described by `cli` and return the value to print.
async fn run(cli: &Cli) -> Result<Value> {
    let api_version: ApiVersion = cli
        .api_version
        .parse()
        .context("Invalid API version argument")?;
    let descriptor =
        PipelineDescriptor::parse(&cli.pipeline).context("Invalid pipeline specification")?;
    let selector = cli.selector()?;

    let image = load_image(&cli.image_path).await?;
    let sample = encode_envelope(&image, api_version);

    let processor = HttpProcessor::new(cli.processor_config(api_version))
        .context("Failed to create HTTP client")?;
    let orchestrator = Orchestrator::new(Arc::new(processor), cli.pipeline_config());

    info!(pipeline = %descriptor, base_url = %cli.base_url, "Running pipeline");
    let run = orchestrator
        .run(&descriptor, sample)
        .await
        .context("Pipeline failed")?;

    Ok(select_output(run.sample.into_value(), selector.as_ref()))
}

async fn load_image(path: &Path) -> Result<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read image {}", path.display()))
}

/// Apply `selector` to the final sample; a miss becomes `null`.
fn select_output(sample: Value, selector: Option<&Selector>) -> Value {
    match selector {
        None => sample,
        Some(selector) => selector.resolve(&sample).cloned().unwrap_or(Value::Null),
    }
}
