//! Pipeline orchestration.
//!
//! Drives the priority groups of a [`PipelineDescriptor`] in order. Each
//! group is fanned out by the executor, its results merged, and the merged
//! sample becomes the input of the next group. Groups never overlap.

use std::sync::Arc;
use std::time::Duration;

use serde::{Serialize, Serializer};
use tracing::{info, instrument, Instrument};

use crate::config::{FailurePolicy, PipelineConfig};
use crate::descriptor::{PipelineDescriptor, PriorityGroup};
use crate::error::{PipelineError, Result};
use crate::executor::{execute_stage, ProcessingResult};
use crate::merge::{merge_stage, Contribution};
use crate::obs::{emit_pipeline_finished, emit_pipeline_started, emit_stage_merged, run_span};
use crate::processor::SampleProcessor;
use crate::sample::{Sample, DURATIONS_KEY};

/// Elapsed time of one service call.
///
/// Serialized as a two-element array, `["detector", "12.5ms"]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DurationRecord {
    pub service: String,
    pub elapsed: Duration,
}

impl DurationRecord {
    pub fn elapsed_string(&self) -> String {
        format!("{:?}", self.elapsed)
    }
}

impl Serialize for DurationRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        (&self.service, self.elapsed_string()).serialize(serializer)
    }
}

/// Final state of a completed pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineRun {
    /// Sample after the last group. Carries `"durations"` when tracing is on.
    pub sample: Sample,
    /// Per-call timing in stage order, declared order within a stage.
    /// Empty unless tracing is on.
    pub durations: Vec<DurationRecord>,
}

/// Runs pipelines against a [`SampleProcessor`].
pub struct Orchestrator {
    processor: Arc<dyn SampleProcessor>,
    config: PipelineConfig,
}

impl Orchestrator {
    pub fn new(processor: Arc<dyn SampleProcessor>, config: PipelineConfig) -> Self {
        Self { processor, config }
    }

    /// Parse `spec` and run it.
    pub async fn run_spec(&self, spec: &str, sample: Sample) -> Result<PipelineRun> {
        let descriptor = PipelineDescriptor::parse(spec)?;
        self.run(&descriptor, sample).await
    }

    /// Run every group of `descriptor`, starting from `sample`.
    ///
    /// An empty descriptor hands `sample` back untouched, apart from an
    /// empty `"durations"` list when tracing is on.
    pub async fn run(&self, descriptor: &PipelineDescriptor, sample: Sample) -> Result<PipelineRun> {
        let run_id = uuid::Uuid::new_v4().to_string();
        let start = tokio::time::Instant::now();

        let result = self
            .run_groups(&run_id, descriptor, sample)
            .instrument(run_span(&run_id))
            .await;

        emit_pipeline_finished(&run_id, start.elapsed().as_millis() as u64, result.is_ok());
        result
    }

    async fn run_groups(
        &self,
        run_id: &str,
        descriptor: &PipelineDescriptor,
        mut sample: Sample,
    ) -> Result<PipelineRun> {
        emit_pipeline_started(run_id, descriptor.groups.len(), descriptor.service_count());

        let mut durations = Vec::new();
        for group in &descriptor.groups {
            let results =
                execute_stage(Arc::clone(&self.processor), group, Arc::new(sample)).await;

            if self.config.trace_durations {
                durations.extend(results.iter().map(|r| DurationRecord {
                    service: r.service.clone(),
                    elapsed: r.elapsed,
                }));
            }

            sample = self.merge_group(group, results)?;
        }

        if self.config.trace_durations {
            sample.insert(DURATIONS_KEY, serde_json::to_value(&durations)?);
        }

        Ok(PipelineRun { sample, durations })
    }

    #[instrument(skip(self, group, results), fields(stage = %group.priority))]
    fn merge_group(&self, group: &PriorityGroup, results: Vec<ProcessingResult>) -> Result<Sample> {
        let mut contributions = Vec::with_capacity(results.len());

        for result in results {
            match result.outcome {
                Ok(sample) => contributions.push(Contribution::new(result.service, sample)),
                Err(source) => match self.config.failure_policy {
                    FailurePolicy::Abort => {
                        return Err(PipelineError::RemoteCallFailed {
                            stage: group.priority.clone(),
                            service: result.service,
                            source,
                        });
                    }
                    FailurePolicy::Skip => {
                        info!(service = %result.service, "skipping failed service contribution");
                    }
                },
            }
        }

        let contributors = contributions.len();
        let merged = merge_stage(&group.priority, contributions)?;
        emit_stage_merged(&group.priority, contributors, merged.object_count());
        Ok(merged)
    }
}
