//! Sample model and envelope codec.
//!
//! A [`Sample`] is the JSON mapping threaded through every stage. At pipeline
//! entry it is one of two envelope shapes, selected by [`ApiVersion`]:
//!
//! - v1: `{"$image": "<base64>"}`
//! - v2: `{"_image": {"blob": "<base64>", "format": "IMAGE"}}`

use base64::{engine::general_purpose, Engine};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::error::PipelineError;

/// Image field of the v1 envelope.
pub const V1_IMAGE_KEY: &str = "$image";
/// Image field of the v2 envelope.
pub const V2_IMAGE_KEY: &str = "_image";
/// Base64 payload inside the v2 image mapping.
pub const V2_BLOB_KEY: &str = "blob";
/// Format tag inside the v2 image mapping.
pub const V2_FORMAT_KEY: &str = "format";
/// The only format tag the v2 envelope carries.
pub const V2_IMAGE_FORMAT: &str = "IMAGE";
/// Sequence of detected entities that the merger operates on.
pub const OBJECTS_KEY: &str = "objects";
/// Reserved output key for per-service timing.
pub const DURATIONS_KEY: &str = "durations";

/// A tree-shaped JSON sample whose root is always a mapping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sample(Map<String, Value>);

impl Sample {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.0.get_mut(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Borrow the underlying mapping.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    /// Number of entries under `"objects"`, if present and an array.
    pub fn object_count(&self) -> Option<usize> {
        self.0
            .get(OBJECTS_KEY)
            .and_then(Value::as_array)
            .map(Vec::len)
    }
}

impl From<Map<String, Value>> for Sample {
    fn from(map: Map<String, Value>) -> Self {
        Sample(map)
    }
}

impl TryFrom<Value> for Sample {
    type Error = Value;

    /// Succeeds only for JSON objects; any other value is handed back.
    fn try_from(value: Value) -> std::result::Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Sample(map)),
            other => Err(other),
        }
    }
}

impl From<Sample> for Value {
    fn from(sample: Sample) -> Self {
        sample.into_value()
    }
}

/// Remote API generation. Selects both the entry envelope and the
/// `v{n}` endpoint path segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApiVersion {
    V1,
    V2,
}

impl ApiVersion {
    /// Path segment value, e.g. `"2"` for `/v2/`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiVersion::V1 => "1",
            ApiVersion::V2 => "2",
        }
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApiVersion {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1" => Ok(ApiVersion::V1),
            "2" => Ok(ApiVersion::V2),
            other => Err(PipelineError::UnsupportedApiVersion(other.to_string())),
        }
    }
}

/// Wrap raw image bytes into the entry envelope for `version`.
pub fn encode_envelope(image: &[u8], version: ApiVersion) -> Sample {
    let encoded = general_purpose::STANDARD.encode(image);
    let mut sample = Sample::new();
    match version {
        ApiVersion::V1 => {
            sample.insert(V1_IMAGE_KEY, Value::String(encoded));
        }
        ApiVersion::V2 => {
            let mut image = Map::new();
            image.insert(V2_BLOB_KEY.to_string(), Value::String(encoded));
            image.insert(
                V2_FORMAT_KEY.to_string(),
                Value::String(V2_IMAGE_FORMAT.to_string()),
            );
            sample.insert(V2_IMAGE_KEY, Value::Object(image));
        }
    }
    sample
}
