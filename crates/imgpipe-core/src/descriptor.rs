//! Pipeline specification parsing.
//!
//! A specification is a comma-separated list of `service[.priority]` tokens.
//! Services sharing a priority key form one group and run concurrently.
//! Groups run in ascending order of their key, compared as plain strings:
//! `"10"` runs before `"2"`.
//!
//! A token without a priority is keyed by its zero-based position in the
//! list, so `"a,b,c"` runs `a`, then `b`, then `c`.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::DescriptorError;

/// Services that run concurrently at one priority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityGroup {
    /// Priority key as written (or positional default).
    pub priority: String,
    /// Service names in order of first appearance. Never empty.
    pub services: Vec<String>,
}

impl PriorityGroup {
    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

impl fmt::Display for PriorityGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.priority, self.services.join(","))
    }
}

/// Parsed pipeline: priority groups in execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineDescriptor {
    pub groups: Vec<PriorityGroup>,
}

impl PipelineDescriptor {
    /// Parse a comma-separated specification string.
    ///
    /// An empty (or whitespace-only) string is an empty pipeline.
    pub fn parse(spec: &str) -> Result<Self, DescriptorError> {
        if spec.trim().is_empty() {
            return Ok(Self::default());
        }
        let tokens: Vec<&str> = spec.split(',').collect();
        Self::from_tokens(&tokens)
    }

    /// Build the descriptor from already-split tokens.
    pub fn from_tokens<S: AsRef<str>>(tokens: &[S]) -> Result<Self, DescriptorError> {
        let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();

        for (position, raw) in tokens.iter().enumerate() {
            let token = raw.as_ref().trim();
            let (service, priority) = split_token(position, token)?;

            let services = grouped.entry(priority).or_default();
            if services.iter().any(|s| s == service) {
                warn!(service = %service, position = position, "duplicate service in priority group ignored");
                continue;
            }
            services.push(service.to_string());
        }

        let groups = grouped
            .into_iter()
            .map(|(priority, services)| PriorityGroup { priority, services })
            .collect();

        Ok(Self { groups })
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Total number of distinct service calls across all groups.
    pub fn service_count(&self) -> usize {
        self.groups.iter().map(PriorityGroup::len).sum()
    }
}

impl fmt::Display for PipelineDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let groups: Vec<String> = self.groups.iter().map(ToString::to_string).collect();
        f.write_str(&groups.join(" -> "))
    }
}

fn split_token(position: usize, token: &str) -> Result<(&str, String), DescriptorError> {
    let (service, priority) = match token.split_once('.') {
        Some((service, priority)) => {
            if priority.is_empty() {
                return Err(DescriptorError::EmptyPriority {
                    position,
                    token: token.to_string(),
                });
            }
            (service, priority.to_string())
        }
        None => (token, position.to_string()),
    };

    if service.is_empty() {
        return Err(DescriptorError::EmptyServiceName {
            position,
            token: token.to_string(),
        });
    }

    Ok((service, priority))
}
