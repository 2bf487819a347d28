//! Runtime operation trees.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::{Serialize, Serializer};

/// Scalar attribute value attached to an operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttrValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl AttrValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttrValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            AttrValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttrValue::Float(f) => Some(*f),
            AttrValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Bool(b) => write!(f, "{}", b),
            AttrValue::Int(i) => write!(f, "{}", i),
            AttrValue::Float(v) => write!(f, "{}", v),
            AttrValue::Str(s) => f.write_str(s),
        }
    }
}

impl From<bool> for AttrValue {
    fn from(v: bool) -> Self {
        AttrValue::Bool(v)
    }
}

impl From<i32> for AttrValue {
    fn from(v: i32) -> Self {
        AttrValue::Int(v as i64)
    }
}

impl From<i64> for AttrValue {
    fn from(v: i64) -> Self {
        AttrValue::Int(v)
    }
}

impl From<usize> for AttrValue {
    fn from(v: usize) -> Self {
        AttrValue::Int(v as i64)
    }
}

impl From<f64> for AttrValue {
    fn from(v: f64) -> Self {
        AttrValue::Float(v)
    }
}

impl From<&str> for AttrValue {
    fn from(v: &str) -> Self {
        AttrValue::Str(v.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(v: String) -> Self {
        AttrValue::Str(v)
    }
}

/// Resolved attributes, ordered by key so trees render deterministically.
pub type Attributes = BTreeMap<&'static str, AttrValue>;

/// 128-bit trace identifier shared by every operation of one tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TraceId(pub u128);

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

impl Serialize for TraceId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// 64-bit operation identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpanId(pub u64);

impl fmt::Display for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl Serialize for SpanId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Identifiers a log line carries to tie it to an operation.
#[derive(Debug, Clone, Copy)]
pub struct Correlation {
    pub trace_id: TraceId,
    pub span_id: SpanId,
    pub operation: &'static str,
}

/// One realized operation and its subtree.
///
/// `start` and `end` are offsets from the trace origin. `parent` is the span id
/// of the enclosing operation; ownership only flows downward through `children`.
#[derive(Debug, Clone, Serialize)]
pub struct OperationInstance {
    pub name: &'static str,
    pub trace_id: TraceId,
    pub span_id: SpanId,
    pub parent: Option<SpanId>,
    pub attributes: Attributes,
    /// Time spent in the node's own simulated work, excluding children.
    pub sampled: Duration,
    pub start: Duration,
    pub end: Duration,
    pub children: Vec<OperationInstance>,
}

impl OperationInstance {
    pub fn duration(&self) -> Duration {
        self.end.saturating_sub(self.start)
    }

    pub fn depth(&self) -> usize {
        1 + self.children.iter().map(|c| c.depth()).max().unwrap_or(0)
    }

    pub fn span_count(&self) -> usize {
        1 + self.children.iter().map(|c| c.span_count()).sum::<usize>()
    }

    pub fn is_error(&self) -> bool {
        self.attributes.get("error").and_then(AttrValue::as_bool).unwrap_or(false)
    }

    pub fn correlation(&self) -> Correlation {
        Correlation {
            trace_id: self.trace_id,
            span_id: self.span_id,
            operation: self.name,
        }
    }

    /// First operation named `name`, depth-first pre-order.
    pub fn find(&self, name: &str) -> Option<&OperationInstance> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(name))
    }

    /// First value recorded under `key` anywhere in the tree, depth-first pre-order.
    pub fn find_attr(&self, key: &str) -> Option<&AttrValue> {
        self.attributes
            .get(key)
            .or_else(|| self.children.iter().find_map(|c| c.find_attr(key)))
    }

    /// Child indices leading from `self` to the first operation named `name`.
    pub fn path_to(&self, name: &str) -> Option<Vec<usize>> {
        if self.name == name {
            return Some(Vec::new());
        }
        self.children.iter().enumerate().find_map(|(i, child)| {
            child.path_to(name).map(|mut rest| {
                rest.insert(0, i);
                rest
            })
        })
    }

    pub fn walk<'a>(&'a self, f: &mut impl FnMut(&'a OperationInstance)) {
        f(self);
        for child in &self.children {
            child.walk(f);
        }
    }

    /// Checks `start <= end` everywhere and that every child lies inside its
    /// parent's interval and points back at it.
    pub fn intervals_nest(&self) -> bool {
        self.start <= self.end
            && self.children.iter().all(|c| {
                c.parent == Some(self.span_id)
                    && c.start >= self.start
                    && c.end <= self.end
                    && c.intervals_nest()
            })
    }

    /// Names, attribute keys and nesting, without values or timing.
    pub fn outline(&self) -> String {
        let keys: Vec<&str> = self.attributes.keys().copied().collect();
        let children: Vec<String> = self.children.iter().map(|c| c.outline()).collect();
        format!("{}[{}]({})", self.name, keys.join(","), children.join(","))
    }
}
