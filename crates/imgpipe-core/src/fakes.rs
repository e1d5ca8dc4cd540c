//! In-memory processor fake (testing only)
//!
//! `ScriptedProcessor` answers each service with a canned sample or error,
//! optionally after a delay, and records every call it receives.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::RemoteCallError;
use crate::processor::SampleProcessor;
use crate::sample::Sample;

#[derive(Debug, Clone)]
enum Reply {
    Respond(Sample),
    Echo,
    Fail(RemoteCallError),
    Panic,
}

#[derive(Debug, Clone)]
struct Script {
    reply: Reply,
    delay: Option<Duration>,
}

/// A recorded call: which service, and the sample it was sent.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub service: String,
    pub input: Sample,
}

/// Processor that replies from a per-service script.
///
/// Unscripted services fail with a transport error.
#[derive(Debug, Default)]
pub struct ScriptedProcessor {
    scripts: HashMap<String, Script>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply to `service` with `sample`.
    pub fn respond(mut self, service: &str, sample: Sample) -> Self {
        self.set(service, Reply::Respond(sample));
        self
    }

    /// Reply to `service` with the sample it was sent.
    pub fn echo(mut self, service: &str) -> Self {
        self.set(service, Reply::Echo);
        self
    }

    /// Fail every call to `service` with `error`.
    pub fn fail(mut self, service: &str, error: RemoteCallError) -> Self {
        self.set(service, Reply::Fail(error));
        self
    }

    /// Panic inside every call to `service`.
    pub fn panic(mut self, service: &str) -> Self {
        self.set(service, Reply::Panic);
        self
    }

    /// Delay the reply of an already scripted `service`.
    pub fn delay(mut self, service: &str, delay: Duration) -> Self {
        if let Some(script) = self.scripts.get_mut(service) {
            script.delay = Some(delay);
        }
        self
    }

    /// Calls in the order they started.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, service: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.service == service)
            .count()
    }

    fn set(&mut self, service: &str, reply: Reply) {
        let delay = self.scripts.get(service).and_then(|s| s.delay);
        self.scripts
            .insert(service.to_string(), Script { reply, delay });
    }
}

#[async_trait]
impl SampleProcessor for ScriptedProcessor {
    async fn process(&self, service: &str, sample: &Sample) -> Result<Sample, RemoteCallError> {
        self.calls.lock().unwrap().push(RecordedCall {
            service: service.to_string(),
            input: sample.clone(),
        });

        let script = self
            .scripts
            .get(service)
            .cloned()
            .ok_or_else(|| RemoteCallError::Transport(format!("no route to {service}")))?;

        if let Some(delay) = script.delay {
            tokio::time::sleep(delay).await;
        }

        match script.reply {
            Reply::Respond(sample) => Ok(sample),
            Reply::Echo => Ok(sample.clone()),
            Reply::Fail(error) => Err(error),
            Reply::Panic => panic!("scripted panic in {service}"),
        }
    }
}
