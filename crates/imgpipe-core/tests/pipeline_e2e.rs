//! End-to-end pipeline behaviour against the in-memory processor.

use std::sync::Arc;
use std::time::Duration;

use imgpipe_core::fakes::ScriptedProcessor;
use imgpipe_core::{
    encode_envelope, ApiVersion, Orchestrator, PipelineConfig, PipelineDescriptor, Sample,
    SampleProcessor, Selector, DURATIONS_KEY,
};
use serde_json::{json, Value};

fn sample(value: Value) -> Sample {
    Sample::try_from(value).unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_shared_priority_runs_in_one_stage_and_times_in_declared_order() {
    // svcB answers long before svcA
    let fake = Arc::new(
        ScriptedProcessor::new()
            .respond("svcA", sample(json!({ "objects": [{ "label": "dog" }] })))
            .delay("svcA", Duration::from_millis(300))
            .respond("svcB", sample(json!({ "objects": [{ "angle": 12 }] })))
            .delay("svcB", Duration::from_millis(5)),
    );
    let orchestrator = Orchestrator::new(
        Arc::clone(&fake) as Arc<dyn SampleProcessor>,
        PipelineConfig::new().with_trace_durations(true),
    );

    let input = encode_envelope(b"png-bytes", ApiVersion::V1);
    let run = orchestrator.run_spec("svcA,svcB.0", input.clone()).await.unwrap();

    // one stage: both services saw the original envelope
    let calls = fake.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls.iter().all(|c| c.input == input));

    let names: Vec<&str> = run.durations.iter().map(|d| d.service.as_str()).collect();
    assert_eq!(names, vec!["svcA", "svcB"]);

    let attached = run.sample.get(DURATIONS_KEY).unwrap().as_array().unwrap();
    assert_eq!(attached.len(), 2);
    assert_eq!(attached[0][0], json!("svcA"));
    assert_eq!(attached[1][0], json!("svcB"));

    assert_eq!(
        run.sample.get("objects"),
        Some(&json!([{ "label": "dog", "angle": 12 }]))
    );
}

#[tokio::test]
async fn test_merge_then_select() {
    let fake = ScriptedProcessor::new()
        .respond("a", sample(json!({ "owner": "a", "objects": [{ "x": 1 }] })))
        .respond("b", sample(json!({ "owner": "b", "objects": [{ "y": 2 }] })));
    let orchestrator = Orchestrator::new(Arc::new(fake), PipelineConfig::default());

    let run = orchestrator
        .run_spec("a.1,b.1", encode_envelope(b"img", ApiVersion::V2))
        .await
        .unwrap();
    let output = run.sample.into_value();

    assert_eq!(output, json!({ "owner": "a", "objects": [{ "x": 1, "y": 2 }] }));

    let hit = Selector::parse("objects.0.x").unwrap();
    assert_eq!(hit.resolve(&output), Some(&json!(1)));
    let miss = Selector::parse("objects.5.x").unwrap();
    assert_eq!(miss.resolve(&output), None);
}

#[tokio::test]
async fn test_groups_run_in_priority_order_across_stages() {
    let fake = Arc::new(
        ScriptedProcessor::new()
            .respond("c", sample(json!({ "objects": [{ "stage": "c" }] })))
            .respond("a", sample(json!({ "objects": [{ "stage": "a" }] })))
            .respond("b", sample(json!({ "objects": [{ "extra": true }] }))),
    );
    let orchestrator = Orchestrator::new(
        Arc::clone(&fake) as Arc<dyn SampleProcessor>,
        PipelineConfig::default(),
    );

    let run = orchestrator
        .run_spec("c.2,a.1,b.1", Sample::new())
        .await
        .unwrap();

    let calls = fake.calls();
    // group "1" (a, b) before group "2" (c)
    assert_eq!(calls[2].service, "c");
    assert_eq!(
        calls[2].input,
        sample(json!({ "objects": [{ "stage": "a", "extra": true }] }))
    );
    assert_eq!(run.sample, sample(json!({ "objects": [{ "stage": "c" }] })));
}

#[tokio::test]
async fn test_many_positional_tokens_follow_string_order() {
    let mut fake = ScriptedProcessor::new();
    let tokens: Vec<String> = (0..12).map(|i| format!("svc{i}")).collect();
    for token in &tokens {
        fake = fake.echo(token);
    }
    let fake = Arc::new(fake);
    let orchestrator = Orchestrator::new(
        Arc::clone(&fake) as Arc<dyn SampleProcessor>,
        PipelineConfig::default(),
    );

    let descriptor = PipelineDescriptor::from_tokens(&tokens).unwrap();
    orchestrator.run(&descriptor, Sample::new()).await.unwrap();

    let order: Vec<String> = fake.calls().into_iter().map(|c| c.service).collect();
    assert_eq!(
        order,
        vec![
            "svc0", "svc1", "svc10", "svc11", "svc2", "svc3", "svc4", "svc5", "svc6", "svc7",
            "svc8", "svc9"
        ]
    );
}

#[tokio::test]
async fn test_output_without_tracing_has_no_durations() {
    let fake = ScriptedProcessor::new().respond("only", sample(json!({ "objects": [] })));
    let orchestrator = Orchestrator::new(Arc::new(fake), PipelineConfig::default());

    let run = orchestrator.run_spec("only", Sample::new()).await.unwrap();
    assert_eq!(run.sample.into_value(), json!({ "objects": [] }));
    assert!(run.durations.is_empty());
}
