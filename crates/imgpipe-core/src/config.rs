//! Engine and transport configuration.
//!
//! The engine never reads the process environment on its own. Callers build
//! a [`PipelineConfig`] explicitly, or use [`PipelineConfig::from_env`] at the
//! process boundary.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::sample::ApiVersion;

/// Environment toggle that enables per-service timing in the output.
pub const DURATION_TRACER_ENV: &str = "ENABLE_PROCESSING_DURATION_TRACER";

/// What a stage does when one of its services fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// One failed service voids the stage and the whole run.
    #[default]
    Abort,
    /// Failed services contribute nothing; the stage fails only when every
    /// member failed.
    Skip,
}

/// Orchestrator options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Attach `(service, elapsed)` records to the final sample.
    pub trace_durations: bool,
    pub failure_policy: FailurePolicy,
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the duration toggle from [`DURATION_TRACER_ENV`].
    pub fn from_env() -> Self {
        let trace_durations = std::env::var(DURATION_TRACER_ENV)
            .map(|v| env_truthy(&v))
            .unwrap_or(false);
        Self {
            trace_durations,
            ..Self::default()
        }
    }

    pub fn with_trace_durations(mut self, enabled: bool) -> Self {
        self.trace_durations = enabled;
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }
}

/// `true` for `"true"` or `"1"`, case-insensitive.
pub fn env_truthy(value: &str) -> bool {
    let value = value.trim().to_ascii_lowercase();
    value == "true" || value == "1"
}

/// How the version appears in service endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndpointVersion {
    /// `{base}/{service}/v{n}/process/sample`
    Versioned(ApiVersion),
    /// `{base}/{service}/process/sample`
    Legacy,
}

/// Settings for the HTTP processor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpProcessorConfig {
    /// Base URL that service names are appended to.
    pub base_url: String,
    pub endpoint_version: EndpointVersion,
    /// Per-request timeout. `None` waits indefinitely.
    pub timeout: Option<Duration>,
    pub user_agent: String,
}

impl HttpProcessorConfig {
    pub fn new(base_url: &str, api_version: ApiVersion) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            endpoint_version: EndpointVersion::Versioned(api_version),
            timeout: None,
            user_agent: format!("imgpipe/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Drop the `v{n}` path segment.
    pub fn legacy(mut self) -> Self {
        self.endpoint_version = EndpointVersion::Legacy;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Full processing endpoint for `service`.
    pub fn endpoint(&self, service: &str) -> String {
        match self.endpoint_version {
            EndpointVersion::Versioned(version) => {
                format!("{}/{}/v{}/process/sample", self.base_url, service, version)
            }
            EndpointVersion::Legacy => format!("{}/{}/process/sample", self.base_url, service),
        }
    }
}
