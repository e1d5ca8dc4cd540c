//! Structured observability hooks for pipeline runs.
//!
//! This module provides:
//! - A run-scoped span constructor, [`run_span`], for instrumenting a run
//! - Emission functions for lifecycle events: pipeline start/finish, stage
//!   start/merge, and per-service completion or failure

use std::time::Duration;

use tracing::{info, warn};

/// Span tagged with the run id; every event of a run is recorded inside it.
///
/// # Example
///
/// ```ignore
/// run_pipeline().instrument(run_span("3f0c...")).await
/// ```
pub fn run_span(run_id: &str) -> tracing::Span {
    tracing::info_span!("imgpipe.run", run_id = %run_id)
}

/// Emit event: pipeline started with its group and service counts.
pub fn emit_pipeline_started(run_id: &str, groups: usize, services: usize) {
    info!(
        event = "pipeline.started",
        run_id = %run_id,
        groups = groups,
        services = services,
    );
}

/// Emit event: a priority group is about to fan out.
pub fn emit_stage_started(stage: &str, services: &[String]) {
    info!(
        event = "stage.started",
        stage = %stage,
        services = %services.join(","),
    );
}

/// Emit event: one service call returned a sample.
pub fn emit_service_completed(stage: &str, service: &str, elapsed: Duration) {
    info!(
        event = "service.completed",
        stage = %stage,
        service = %service,
        elapsed_ms = elapsed.as_millis() as u64,
    );
}

/// Emit event: one service call failed (warning level).
pub fn emit_service_failed(stage: &str, service: &str, error: &dyn std::fmt::Display) {
    warn!(
        event = "service.failed",
        stage = %stage,
        service = %service,
        error = %error,
    );
}

/// Emit event: stage results merged into the next sample.
pub fn emit_stage_merged(stage: &str, contributors: usize, objects: Option<usize>) {
    info!(
        event = "stage.merged",
        stage = %stage,
        contributors = contributors,
        objects = objects.map(|n| n as i64).unwrap_or(-1),
    );
}

/// Emit event: pipeline finished.
pub fn emit_pipeline_finished(run_id: &str, duration_ms: u64, success: bool) {
    info!(
        event = "pipeline.finished",
        run_id = %run_id,
        duration_ms = duration_ms,
        success = success,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[traced_test]
    #[test]
    fn test_pipeline_lifecycle_events_are_logged() {
        let _span = run_span("run-obs-1").entered();
        emit_pipeline_started("run-obs-1", 2, 3);
        emit_stage_started("1", &["a".to_string(), "b".to_string()]);
        emit_service_completed("1", "a", Duration::from_millis(12));
        emit_stage_merged("1", 2, Some(4));
        emit_pipeline_finished("run-obs-1", 40, true);

        assert!(logs_contain("pipeline.started"));
        assert!(logs_contain("stage.started"));
        assert!(logs_contain("service.completed"));
        assert!(logs_contain("stage.merged"));
        assert!(logs_contain("pipeline.finished"));
        assert!(logs_contain("run-obs-1"));
    }

    #[traced_test]
    #[test]
    fn test_service_failure_logs_warning() {
        emit_service_failed("0", "detector", &"connection refused");
        assert!(logs_contain("service.failed"));
        assert!(logs_contain("connection refused"));
    }
}
