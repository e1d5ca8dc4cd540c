//! Concurrent execution of one priority group.
//!
//! Every service in the group gets its own tokio task and a shared read-only
//! handle to the stage input. The handles are joined as one batch whose
//! output keeps spawn order, so results stay attributed to their service
//! whatever order calls finish in.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::instrument;

use crate::descriptor::PriorityGroup;
use crate::error::RemoteCallError;
use crate::obs::{emit_service_completed, emit_service_failed, emit_stage_started};
use crate::processor::SampleProcessor;
use crate::sample::Sample;

/// Outcome of one service call within a stage.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessingResult {
    pub service: String,
    /// Wall-clock time from request start to response decoded.
    pub elapsed: Duration,
    pub outcome: Result<Sample, RemoteCallError>,
}

impl ProcessingResult {
    pub fn succeeded(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn sample(&self) -> Option<&Sample> {
        self.outcome.as_ref().ok()
    }
}

/// Call every service in `group` concurrently with `sample`.
///
/// Returns once all calls have finished, one result per service in the
/// group's declared order. Failures are carried in
/// [`ProcessingResult::outcome`]; nothing is short-circuited.
#[instrument(skip(processor, group, sample), fields(stage = %group.priority))]
pub async fn execute_stage(
    processor: Arc<dyn SampleProcessor>,
    group: &PriorityGroup,
    sample: Arc<Sample>,
) -> Vec<ProcessingResult> {
    emit_stage_started(&group.priority, &group.services);

    let stage_start = Instant::now();
    let mut services = Vec::with_capacity(group.len());
    let mut tasks: Vec<JoinHandle<(Result<Sample, RemoteCallError>, Duration)>> =
        Vec::with_capacity(group.len());

    for service in &group.services {
        let processor = Arc::clone(&processor);
        let sample = Arc::clone(&sample);
        let name = service.clone();

        tasks.push(tokio::spawn(async move {
            let start = Instant::now();
            let outcome = processor.process(&name, &sample).await;
            (outcome, start.elapsed())
        }));
        services.push(service.clone());
    }

    let joined = join_all(tasks).await;

    let mut results = Vec::with_capacity(joined.len());
    for (service, done) in services.into_iter().zip(joined) {
        let (outcome, elapsed) = match done {
            Ok(done) => done,
            Err(e) => (
                Err(RemoteCallError::TaskAborted(e.to_string())),
                stage_start.elapsed(),
            ),
        };

        match &outcome {
            Ok(_) => emit_service_completed(&group.priority, &service, elapsed),
            Err(e) => emit_service_failed(&group.priority, &service, e),
        }

        results.push(ProcessingResult {
            service,
            elapsed,
            outcome,
        });
    }

    results
}
