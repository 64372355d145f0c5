// ── Composite query keys ──
//
// A key is a resource tag followed by zero or more segments. Segments
// are stored as canonical JSON (object keys sorted) so that two equal
// parameter structs always produce the same key.

use std::fmt;

use serde::Serialize;

/// Cache key: `[tag, segment, segment, ...]`.
///
/// Prefix matching drives invalidation: `[farmers]` matches
/// `[farmers, {"page":1}]` and `[farmers, "f-1"]`, but not `[farmer-stats]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey {
    tag: String,
    segments: Vec<String>,
}

impl QueryKey {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            segments: Vec::new(),
        }
    }

    /// Append a segment. Strings, ids and parameter structs all work.
    pub fn with(mut self, segment: impl Serialize) -> Self {
        self.segments.push(canonical_json(&segment));
        self
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// `true` if `self` equals `prefix` or extends it.
    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.tag == prefix.tag && self.segments.starts_with(&prefix.segments)
    }
}

impl From<&str> for QueryKey {
    fn from(tag: &str) -> Self {
        Self::new(tag)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}", self.tag)?;
        for segment in &self.segments {
            write!(f, ", {segment}")?;
        }
        f.write_str("]")
    }
}

/// `serde_json::Value` objects are `BTreeMap`-backed, so re-serializing
/// through `Value` sorts the keys.
fn canonical_json(segment: &impl Serialize) -> String {
    serde_json::to_value(segment)
        .and_then(|value| serde_json::to_string(&value))
        .unwrap_or_else(|_| String::from("null"))
}
