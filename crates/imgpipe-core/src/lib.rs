//! imgpipe core library
//!
//! Sends an image sample through prioritized stages of remote processing
//! services. Services sharing a priority run concurrently and their results
//! are merged before the next stage starts.
//!
//! ```ignore
//! let processor = HttpProcessor::new(HttpProcessorConfig::new(base_url, ApiVersion::V2))?;
//! let orchestrator = Orchestrator::new(Arc::new(processor), PipelineConfig::from_env());
//! let run = orchestrator
//!     .run_spec("detect,classify.1,pose.1", encode_envelope(&image, ApiVersion::V2))
//!     .await?;
//! ```

pub mod config;
pub mod descriptor;
pub mod error;
pub mod executor;
pub mod fakes;
pub mod merge;
pub mod obs;
pub mod orchestrator;
pub mod processor;
pub mod sample;
pub mod selector;
pub mod telemetry;

pub use config::{
    env_truthy, EndpointVersion, FailurePolicy, HttpProcessorConfig, PipelineConfig,
    DURATION_TRACER_ENV,
};
pub use descriptor::{PipelineDescriptor, PriorityGroup};
pub use error::{DescriptorError, PipelineError, RemoteCallError, Result, SelectorError};
pub use executor::{execute_stage, ProcessingResult};
pub use merge::{merge_stage, Contribution};
pub use orchestrator::{DurationRecord, Orchestrator, PipelineRun};
pub use processor::{HttpProcessor, SampleProcessor};
pub use sample::{encode_envelope, ApiVersion, Sample, DURATIONS_KEY, OBJECTS_KEY};
pub use selector::Selector;
pub use telemetry::init_tracing;

/// imgpipe version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
