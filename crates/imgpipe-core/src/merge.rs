//! Merging the concurrent results of one stage.
//!
//! The first contribution becomes the stage's base sample and replaces the
//! stage input entirely. Every later contribution is folded into the base's
//! `"objects"` field by field at matching index: object *k* of a later
//! result overwrites or adds fields on object *k* of the base. Anything
//! outside `"objects"` in later results is ignored.
//!
//! Index *k* must mean the same entity in every contribution, so all
//! contributions must carry an `"objects"` array of the same length whose
//! entries are mappings. Any other shape rejects the stage.

use serde_json::{Map, Value};

use crate::error::{PipelineError, Result};
use crate::sample::{Sample, OBJECTS_KEY};

/// One successful service result entering the merge.
#[derive(Debug, Clone, PartialEq)]
pub struct Contribution {
    pub service: String,
    pub sample: Sample,
}

impl Contribution {
    pub fn new(service: impl Into<String>, sample: Sample) -> Self {
        Self {
            service: service.into(),
            sample,
        }
    }
}

/// Merge `contributions` (in declared order) into the next stage sample.
///
/// Returns [`PipelineError::StageFailed`] when there is nothing to merge and
/// [`PipelineError::MalformedSample`] on any shape mismatch.
pub fn merge_stage(stage: &str, contributions: Vec<Contribution>) -> Result<Sample> {
    let mut iter = contributions.into_iter();
    let Some(first) = iter.next() else {
        return Err(PipelineError::StageFailed {
            stage: stage.to_string(),
        });
    };

    let mut base = first.sample;
    let rest: Vec<Contribution> = iter.collect();
    if rest.is_empty() {
        return Ok(base);
    }

    let base_objects = objects_mut(stage, &first.service, &mut base)?;
    for (k, entry) in base_objects.iter().enumerate() {
        if !entry.is_object() {
            return Err(entry_not_mapping(stage, &first.service, k));
        }
    }

    for contribution in rest {
        let Contribution { service, mut sample } = contribution;
        let objects = objects_mut(stage, &service, &mut sample)?;

        if objects.len() != base_objects.len() {
            return Err(malformed(
                stage,
                OBJECTS_KEY.to_string(),
                format!(
                    "service {service} returned {} objects, service {} returned {}",
                    objects.len(),
                    first.service,
                    base_objects.len()
                ),
            ));
        }

        for (k, (entry, target)) in objects
            .drain(..)
            .zip(base_objects.iter_mut())
            .enumerate()
        {
            let Value::Object(fields) = entry else {
                return Err(entry_not_mapping(stage, &service, k));
            };
            if let Value::Object(target) = target {
                merge_fields(target, fields);
            }
        }
    }

    Ok(base)
}

fn merge_fields(target: &mut Map<String, Value>, fields: Map<String, Value>) {
    for (field, value) in fields {
        target.insert(field, value);
    }
}

fn objects_mut<'a>(stage: &str, service: &str, sample: &'a mut Sample) -> Result<&'a mut Vec<Value>> {
    match sample.get_mut(OBJECTS_KEY) {
        Some(Value::Array(objects)) => Ok(objects),
        Some(_) => Err(malformed(
            stage,
            OBJECTS_KEY.to_string(),
            format!("service {service} returned a non-array value"),
        )),
        None => Err(malformed(
            stage,
            OBJECTS_KEY.to_string(),
            format!("service {service} returned no objects"),
        )),
    }
}

fn entry_not_mapping(stage: &str, service: &str, index: usize) -> PipelineError {
    malformed(
        stage,
        format!("{OBJECTS_KEY}.{index}"),
        format!("service {service} returned a non-mapping entry"),
    )
}

fn malformed(stage: &str, field: String, detail: String) -> PipelineError {
    PipelineError::MalformedSample {
        stage: stage.to_string(),
        field,
        detail,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn contribution(service: &str, value: Value) -> Contribution {
        Contribution::new(service, Sample::try_from(value).unwrap())
    }

    #[test]
    fn test_single_member_is_identity() {
        let only = contribution("a", json!({ "anything": [1, 2], "no_objects": true }));
        let merged = merge_stage("0", vec![only.clone()]).unwrap();
        assert_eq!(merged, only.sample);
    }

    #[test]
    fn test_two_members_union_fields_at_matching_index() {
        let a = contribution("a", json!({ "source": "a", "objects": [{ "x": 1 }] }));
        let b = contribution("b", json!({ "source": "b", "objects": [{ "y": 2 }] }));

        let merged = merge_stage("0", vec![a, b]).unwrap();

        assert_eq!(
            merged.into_value(),
            json!({ "source": "a", "objects": [{ "x": 1, "y": 2 }] })
        );
    }

    #[test]
    fn test_later_members_overwrite_shared_fields() {
        let a = contribution("a", json!({ "objects": [{ "label": "dog", "x": 1 }, { "x": 5 }] }));
        let b = contribution("b", json!({ "objects": [{ "label": "cat" }, {}] }));
        let c = contribution("c", json!({ "objects": [{ "score": 0.9 }, { "label": "cow" }] }));

        let merged = merge_stage("1", vec![a, b, c]).unwrap();

        assert_eq!(
            merged.get(OBJECTS_KEY),
            Some(&json!([
                { "label": "cat", "x": 1, "score": 0.9 },
                { "x": 5, "label": "cow" }
            ]))
        );
    }

    #[test]
    fn test_nested_field_values_are_replaced_not_deep_merged() {
        let a = contribution("a", json!({ "objects": [{ "box": { "w": 1, "h": 2 } }] }));
        let b = contribution("b", json!({ "objects": [{ "box": { "w": 9 } }] }));
        let merged = merge_stage("0", vec![a, b]).unwrap();
        assert_eq!(merged.get(OBJECTS_KEY), Some(&json!([{ "box": { "w": 9 } }])));
    }

    #[test]
    fn test_empty_objects_merge_cleanly() {
        let a = contribution("a", json!({ "objects": [] }));
        let b = contribution("b", json!({ "objects": [] }));
        let merged = merge_stage("0", vec![a, b]).unwrap();
        assert_eq!(merged.object_count(), Some(0));
    }

    #[test]
    fn test_object_count_mismatch_rejects_stage() {
        let a = contribution("a", json!({ "objects": [{ "x": 1 }] }));
        let b = contribution("b", json!({ "objects": [{ "y": 1 }, { "y": 2 }] }));

        let err = merge_stage("2", vec![a, b]).unwrap_err();
        match err {
            PipelineError::MalformedSample { stage, field, detail } => {
                assert_eq!(stage, "2");
                assert_eq!(field, "objects");
                assert!(detail.contains("service b returned 2 objects"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_objects_on_contributor_rejects_stage() {
        let a = contribution("a", json!({ "objects": [{ "x": 1 }] }));
        let b = contribution("b", json!({ "status": "ok" }));
        let err = merge_stage("0", vec![a, b]).unwrap_err();
        assert!(matches!(err, PipelineError::MalformedSample { ref field, .. } if field == "objects"));
        assert!(err.to_string().contains("service b returned no objects"));
    }

    #[test]
    fn test_missing_objects_on_base_rejects_stage() {
        let a = contribution("a", json!({ "objects": "none" }));
        let b = contribution("b", json!({ "objects": [] }));
        let err = merge_stage("0", vec![a, b]).unwrap_err();
        assert!(err.to_string().contains("non-array"));
    }

    #[test]
    fn test_non_mapping_entry_rejects_stage() {
        let a = contribution("a", json!({ "objects": [{ "x": 1 }] }));
        let b = contribution("b", json!({ "objects": [42] }));
        let err = merge_stage("0", vec![a, b]).unwrap_err();
        assert!(matches!(err, PipelineError::MalformedSample { ref field, .. } if field == "objects.0"));

        let a = contribution("a", json!({ "objects": ["str"] }));
        let b = contribution("b", json!({ "objects": [{}] }));
        let err = merge_stage("0", vec![a, b]).unwrap_err();
        assert!(err.to_string().contains("service a returned a non-mapping entry"));
    }

    #[test]
    fn test_no_contributions_is_stage_failure() {
        let err = merge_stage("4", Vec::new()).unwrap_err();
        assert!(matches!(err, PipelineError::StageFailed { stage } if stage == "4"));
    }
}
