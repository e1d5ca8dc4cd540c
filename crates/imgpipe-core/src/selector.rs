//! Dotted-path selection over JSON values.
//!
//! `objects.0.label` walks key `objects`, index `0`, key `label`. A segment
//! made of ASCII digits, optionally behind a single `+`, is an array index;
//! anything else (including `-1`) is a mapping key. A step that does not fit
//! the value it meets yields `None`.

use serde_json::Value;

use crate::error::SelectorError;

/// One step of a selector path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Index(usize),
    Key(String),
}

/// A parsed, non-empty dotted selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    segments: Vec<Segment>,
}

impl Selector {
    pub fn parse(selector: &str) -> Result<Self, SelectorError> {
        if selector.is_empty() {
            return Err(SelectorError::Empty);
        }
        let segments = selector.split('.').map(parse_segment).collect();
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Resolve against `root`; `None` when any step misses.
    pub fn resolve<'a>(&self, root: &'a Value) -> Option<&'a Value> {
        self.segments
            .iter()
            .try_fold(root, |current, segment| match (segment, current) {
                (Segment::Index(i), Value::Array(items)) => items.get(*i),
                (Segment::Key(key), Value::Object(map)) => map.get(key),
                _ => None,
            })
    }
}

fn parse_segment(raw: &str) -> Segment {
    let digits = raw.strip_prefix('+').unwrap_or(raw);
    // Digit runs too long for usize can never be in range anyway.
    if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
        Segment::Index(digits.parse().unwrap_or(usize::MAX))
    } else {
        Segment::Key(raw.to_string())
    }
}

/// Parse `selector` and resolve it against `root` in one step.
pub fn resolve<'a>(root: &'a Value, selector: &str) -> Result<Option<&'a Value>, SelectorError> {
    Ok(Selector::parse(selector)?.resolve(root))
}
