//! Error taxonomy for the pipeline engine.

/// Failure of a single remote processing call.
///
/// Always attributable to one service; the executor attaches the service
/// name and the orchestrator the stage.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RemoteCallError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("undecodable response (HTTP {status}): {reason}")]
    Decode { status: u16, reason: String },

    #[error("response body is not a JSON object")]
    NotAMapping,

    #[error("request serialization failed: {0}")]
    Serialize(String),

    #[error("call task aborted: {0}")]
    TaskAborted(String),
}

impl From<reqwest::Error> for RemoteCallError {
    fn from(err: reqwest::Error) -> Self {
        RemoteCallError::Transport(err.to_string())
    }
}

/// Errors produced while parsing a pipeline specification string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DescriptorError {
    #[error("token {position} has an empty service name: {token:?}")]
    EmptyServiceName { position: usize, token: String },

    #[error("token {position} has an empty priority after '.': {token:?}")]
    EmptyPriority { position: usize, token: String },
}

/// Errors produced while parsing a dotted selector.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectorError {
    #[error("selector must not be empty")]
    Empty,
}

/// Pipeline engine errors.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("invalid pipeline specification: {0}")]
    Descriptor(#[from] DescriptorError),

    #[error("stage {stage}: service {service} failed: {source}")]
    RemoteCallFailed {
        stage: String,
        service: String,
        #[source]
        source: RemoteCallError,
    },

    #[error("stage {stage}: malformed sample at field {field:?}: {detail}")]
    MalformedSample {
        stage: String,
        field: String,
        detail: String,
    },

    #[error("stage {stage}: every service in the group failed")]
    StageFailed { stage: String },

    #[error("unsupported api version {0:?} (expected \"1\" or \"2\")")]
    UnsupportedApiVersion(String),

    #[error("http client error: {0}")]
    Http(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for pipeline engine operations.
pub type Result<T> = std::result::Result<T, PipelineError>;
