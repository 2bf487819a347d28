//! Static operation templates.
//!
//! A template describes one simulated unit of work: how long it sleeps, which
//! attributes it reports, what it logs on completion, and which downstream
//! operations it calls in order. Route catalogs assemble templates once at
//! startup with the builder-style methods below; they are never mutated after.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::simulation::instance::{AttrValue, Attributes, OperationInstance};
use crate::simulation::random::RandomSource;

/// Closed range of simulated work, in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DurationRange {
    min: f64,
    max: f64,
}

impl DurationRange {
    /// No simulated work of its own; the node only wraps its children.
    pub const ZERO: DurationRange = DurationRange { min: 0.0, max: 0.0 };

    /// Negative bounds clamp to zero and reversed bounds are swapped.
    pub fn new(min: f64, max: f64) -> Self {
        let (min, max) = (min.max(0.0), max.max(0.0));
        if max < min {
            Self { min: max, max: min }
        } else {
            Self { min, max }
        }
    }

    pub fn min(&self) -> Duration {
        Duration::from_secs_f64(self.min)
    }

    pub fn max(&self) -> Duration {
        Duration::from_secs_f64(self.max)
    }

    pub fn sample(&self, rng: &mut dyn RandomSource) -> Duration {
        Duration::from_secs_f64(rng.uniform(self.min, self.max).clamp(self.min, self.max))
    }
}

impl Default for DurationRange {
    fn default() -> Self {
        Self::ZERO
    }
}

/// Severity of a simulated log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

/// Log line attached to an operation.
///
/// `{key}` placeholders are replaced with the operation's attribute values.
/// A line with `only_if` is emitted only when the operation recorded that
/// attribute with that value.
#[derive(Debug, Clone)]
pub struct LogLine {
    pub level: LogLevel,
    pub message: &'static str,
    pub only_if: Option<(&'static str, AttrValue)>,
}

impl LogLine {
    pub const fn new(level: LogLevel, message: &'static str) -> Self {
        Self {
            level,
            message,
            only_if: None,
        }
    }

    pub fn applies(&self, attributes: &Attributes) -> bool {
        match &self.only_if {
            Some((key, equals)) => attributes.get(key) == Some(equals),
            None => true,
        }
    }

    pub fn render(&self, attributes: &Attributes) -> String {
        let mut out = String::with_capacity(self.message.len());
        let mut rest = self.message;
        while let Some(open) = rest.find('{') {
            let Some(close) = rest[open..].find('}') else {
                break;
            };
            let key = &rest[open + 1..open + close];
            out.push_str(&rest[..open]);
            match attributes.get(key) {
                Some(value) => out.push_str(&value.to_string()),
                None => out.push_str(&rest[open..=open + close]),
            }
            rest = &rest[open + close + 1..];
        }
        out.push_str(rest);
        out
    }
}

/// How an attribute value is produced.
#[derive(Debug, Clone)]
pub enum AttributeGenerator {
    Static(AttrValue),
    /// Uniform integer, inclusive.
    IntRange { min: i64, max: i64 },
    /// Uniform float rounded to `decimals` places.
    FloatRange { min: f64, max: f64, decimals: u32 },
    Flip,
    /// `prefix` followed by a uniform integer, e.g. `user_417`.
    PrefixedId { prefix: &'static str, min: i64, max: i64 },
    /// `prefix` followed by the current unix time in whole seconds.
    TimestampKey { prefix: &'static str },
    /// The node's own sampled work in whole milliseconds.
    SampledMillis,
    /// Number of children that actually ran.
    ChildCount,
    /// Copies `key` from the first child named `child`.
    FromChild {
        child: &'static str,
        key: &'static str,
        fallback: Option<AttrValue>,
    },
    /// Seconds elapsed since the node started, rounded to `decimals` places.
    ElapsedSeconds { decimals: u32 },
}

/// What a generator may look at when it resolves.
pub(crate) struct Scope<'a> {
    pub sampled: Duration,
    pub elapsed: Duration,
    pub children: &'a [OperationInstance],
    pub wall_clock: SystemTime,
}

impl AttributeGenerator {
    /// Generators that read child results resolve after the children ran.
    pub fn after_children(&self) -> bool {
        matches!(
            self,
            AttributeGenerator::ChildCount
                | AttributeGenerator::FromChild { .. }
                | AttributeGenerator::ElapsedSeconds { .. }
        )
    }

    pub(crate) fn resolve(&self, rng: &mut dyn RandomSource, scope: &Scope<'_>) -> Option<AttrValue> {
        let value = match self {
            AttributeGenerator::Static(v) => v.clone(),
            AttributeGenerator::IntRange { min, max } => AttrValue::Int(rng.int_between(*min, *max)),
            AttributeGenerator::FloatRange { min, max, decimals } => {
                AttrValue::Float(round_to(rng.uniform(*min, *max), *decimals))
            }
            AttributeGenerator::Flip => AttrValue::Bool(rng.flip()),
            AttributeGenerator::PrefixedId { prefix, min, max } => {
                AttrValue::Str(format!("{}{}", prefix, rng.int_between(*min, *max)))
            }
            AttributeGenerator::TimestampKey { prefix } => {
                let secs = scope
                    .wall_clock
                    .duration_since(UNIX_EPOCH)
                    .map(|d| d.as_secs())
                    .unwrap_or_default();
                AttrValue::Str(format!("{}{}", prefix, secs))
            }
            AttributeGenerator::SampledMillis => AttrValue::Int(scope.sampled.as_millis() as i64),
            AttributeGenerator::ChildCount => AttrValue::Int(scope.children.len() as i64),
            AttributeGenerator::FromChild { child, key, fallback } => {
                return scope
                    .children
                    .iter()
                    .find(|c| c.name == *child)
                    .and_then(|c| c.attributes.get(key).cloned())
                    .or_else(|| fallback.clone());
            }
            AttributeGenerator::ElapsedSeconds { decimals } => {
                AttrValue::Float(round_to(scope.elapsed.as_secs_f64(), *decimals))
            }
        };
        Some(value)
    }
}

pub(crate) fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Gate on a node, evaluated against the siblings that already ran.
#[derive(Debug, Clone)]
pub enum Condition {
    /// Run only if the earlier sibling `operation` recorded `key == equals`.
    SiblingAttr {
        operation: &'static str,
        key: &'static str,
        equals: AttrValue,
    },
}

impl Condition {
    pub fn sibling(operation: &'static str, key: &'static str, equals: impl Into<AttrValue>) -> Self {
        Condition::SiblingAttr {
            operation,
            key,
            equals: equals.into(),
        }
    }

    pub fn holds(&self, earlier: &[OperationInstance]) -> bool {
        match self {
            Condition::SiblingAttr { operation, key, equals } => earlier
                .iter()
                .find(|s| s.name == *operation)
                .and_then(|s| s.attributes.get(key))
                .is_some_and(|v| v == equals),
        }
    }
}

/// Static description of a simulated operation and its downstream calls.
#[derive(Debug, Clone)]
pub struct OperationTemplate {
    pub name: &'static str,
    pub attributes: Vec<(&'static str, AttributeGenerator)>,
    pub children: Vec<OperationTemplate>,
    pub duration: DurationRange,
    pub guard: Option<Condition>,
    /// Emitted as soon as the operation starts, before any work.
    pub start_log: Option<LogLine>,
    /// Emitted on completion, in order, when they apply.
    pub logs: Vec<LogLine>,
}

impl OperationTemplate {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            attributes: Vec::new(),
            children: Vec::new(),
            duration: DurationRange::ZERO,
            guard: None,
            start_log: None,
            logs: Vec::new(),
        }
    }

    pub fn attr(self, key: &'static str, value: impl Into<AttrValue>) -> Self {
        self.generate(key, AttributeGenerator::Static(value.into()))
    }

    pub fn generate(mut self, key: &'static str, generator: AttributeGenerator) -> Self {
        self.attributes.push((key, generator));
        self
    }

    pub fn lasting(mut self, min_secs: f64, max_secs: f64) -> Self {
        self.duration = DurationRange::new(min_secs, max_secs);
        self
    }

    pub fn child(mut self, child: OperationTemplate) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = OperationTemplate>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn when(mut self, condition: Condition) -> Self {
        self.guard = Some(condition);
        self
    }

    pub fn log(mut self, level: LogLevel, message: &'static str) -> Self {
        self.logs.push(LogLine::new(level, message));
        self
    }

    /// Completion line emitted only when attribute `key` equals `equals`.
    pub fn log_if(
        mut self,
        key: &'static str,
        equals: impl Into<AttrValue>,
        level: LogLevel,
        message: &'static str,
    ) -> Self {
        self.logs.push(LogLine {
            only_if: Some((key, equals.into())),
            ..LogLine::new(level, message)
        });
        self
    }

    pub fn log_on_start(mut self, level: LogLevel, message: &'static str) -> Self {
        self.start_log = Some(LogLine::new(level, message));
        self
    }

    /// Lower bound on wall time: the minimum work of every unguarded node.
    pub fn guaranteed_minimum(&self) -> Duration {
        self.duration.min()
            + self
                .children
                .iter()
                .filter(|c| c.guard.is_none())
                .map(|c| c.guaranteed_minimum())
                .sum::<Duration>()
    }

    pub fn span_count(&self) -> usize {
        1 + self.children.iter().map(|c| c.span_count()).sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::random::ScriptedSource;

    #[test]
    fn test_duration_range_normalizes_bounds() {
        let range = DurationRange::new(0.3, 0.1);
        assert_eq!(range.min(), Duration::from_secs_f64(0.1));
        assert_eq!(range.max(), Duration::from_secs_f64(0.3));

        let clamped = DurationRange::new(-1.0, 0.5);
        assert_eq!(clamped.min(), Duration::ZERO);
    }

    #[test]
    fn test_guaranteed_minimum_skips_guarded_children() {
        let template = OperationTemplate::new("root")
            .lasting(0.1, 0.2)
            .child(OperationTemplate::new("always").lasting(0.2, 0.3))
            .child(
                OperationTemplate::new("sometimes")
                    .lasting(5.0, 6.0)
                    .when(Condition::sibling("always", "hit", false)),
            );
        let expected = Duration::from_secs_f64(0.1) + Duration::from_secs_f64(0.2);
        assert_eq!(template.guaranteed_minimum(), expected);
        assert_eq!(template.span_count(), 3);
    }

    #[test]
    fn test_log_line_substitutes_known_keys() {
        let mut attributes = Attributes::new();
        attributes.insert("db.rows_returned", AttrValue::Int(3));
        let line = LogLine::new(LogLevel::Info, "Retrieved {db.rows_returned} users, {missing} left");
        assert_eq!(line.render(&attributes), "Retrieved 3 users, {missing} left");
    }

    #[test]
    fn test_conditional_lines_follow_the_recorded_attribute() {
        let template = OperationTemplate::new("cache.check")
            .log_if("cache.hit", true, LogLevel::Info, "Cache hit for users list")
            .log_if("cache.hit", false, LogLevel::Info, "Cache miss for users list");

        let mut hit = Attributes::new();
        hit.insert("cache.hit", AttrValue::Bool(true));
        let emitted: Vec<_> = template.logs.iter().filter(|l| l.applies(&hit)).map(|l| l.message).collect();
        assert_eq!(emitted, vec!["Cache hit for users list"]);

        let missing = Attributes::new();
        assert!(template.logs.iter().all(|l| !l.applies(&missing)));
    }

    #[test]
    fn test_generators_split_around_children() {
        assert!(!AttributeGenerator::Flip.after_children());
        assert!(AttributeGenerator::ChildCount.after_children());

        let mut rng = ScriptedSource::new([], [true]);
        let scope = Scope {
            sampled: Duration::from_millis(1234),
            elapsed: Duration::from_millis(1500),
            children: &[],
            wall_clock: UNIX_EPOCH + Duration::from_secs(42),
        };
        assert_eq!(AttributeGenerator::Flip.resolve(&mut rng, &scope), Some(AttrValue::Bool(true)));
        assert_eq!(
            AttributeGenerator::SampledMillis.resolve(&mut rng, &scope),
            Some(AttrValue::Int(1234))
        );
        assert_eq!(
            AttributeGenerator::TimestampKey { prefix: "data:" }.resolve(&mut rng, &scope),
            Some(AttrValue::Str("data:42".into()))
        );
        assert_eq!(
            AttributeGenerator::ElapsedSeconds { decimals: 2 }.resolve(&mut rng, &scope),
            Some(AttrValue::Float(1.5))
        );
        let missing = AttributeGenerator::FromChild {
            child: "db.query",
            key: "db.rows_returned",
            fallback: None,
        };
        assert_eq!(missing.resolve(&mut rng, &scope), None);
    }
}
