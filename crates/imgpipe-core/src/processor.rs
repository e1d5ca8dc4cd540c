//! Remote processing services.
//!
//! [`SampleProcessor`] is the seam between the engine and the network. The
//! production implementation is [`HttpProcessor`]; tests use
//! [`crate::fakes::ScriptedProcessor`].

use async_trait::async_trait;
use tracing::debug;

use crate::config::HttpProcessorConfig;
use crate::error::{PipelineError, RemoteCallError, Result};
use crate::sample::Sample;

/// One request/response exchange with a named processing service.
///
/// Implementations must not mutate shared state between calls: the executor
/// issues every call of a stage concurrently against the same input sample.
#[async_trait]
pub trait SampleProcessor: Send + Sync {
    async fn process(
        &self,
        service: &str,
        sample: &Sample,
    ) -> std::result::Result<Sample, RemoteCallError>;
}

/// HTTP client for processing services.
///
/// `POST`s the sample as JSON to the service endpoint and decodes the body as
/// a sample. Status codes are not interpreted; a body that is not a JSON
/// object is an error.
pub struct HttpProcessor {
    config: HttpProcessorConfig,
    http_client: reqwest::Client,
}

impl HttpProcessor {
    pub fn new(config: HttpProcessorConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(&config.user_agent);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder
            .build()
            .map_err(|e| PipelineError::Http(e.to_string()))?;

        Ok(HttpProcessor {
            config,
            http_client,
        })
    }

    pub fn config(&self) -> &HttpProcessorConfig {
        &self.config
    }
}

#[async_trait]
impl SampleProcessor for HttpProcessor {
    async fn process(
        &self,
        service: &str,
        sample: &Sample,
    ) -> std::result::Result<Sample, RemoteCallError> {
        let url = self.config.endpoint(service);
        let body =
            serde_json::to_vec(sample).map_err(|e| RemoteCallError::Serialize(e.to_string()))?;

        debug!(service = %service, url = %url, bytes = body.len(), "posting sample");

        let response = self
            .http_client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status().as_u16();
        let bytes = response.bytes().await?;

        decode_response(status, &bytes)
    }
}

/// Decode a response body into a sample.
pub fn decode_response(status: u16, body: &[u8]) -> std::result::Result<Sample, RemoteCallError> {
    let value: serde_json::Value =
        serde_json::from_slice(body).map_err(|e| RemoteCallError::Decode {
            status,
            reason: e.to_string(),
        })?;
    Sample::try_from(value).map_err(|_| RemoteCallError::NotAMapping)
}
