//! Span tree builder.
//!
//! Walks a template depth-first, sleeping for each node's sampled work and
//! recording when it started and finished relative to the trace origin.
//! Building never fails; the only side effect is the elapsed time.

use std::future::Future;
use std::pin::Pin;
use std::time::SystemTime;

use tokio::time::Instant;

use crate::observability::logging::LogEmitter;
use crate::simulation::instance::{Attributes, Correlation, OperationInstance, SpanId, TraceId};
use crate::simulation::random::RandomSource;
use crate::simulation::template::{OperationTemplate, Scope};

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Per-request state threaded through one build.
pub struct BuildContext<'a> {
    rng: &'a mut dyn RandomSource,
    logs: &'a LogEmitter,
    trace_id: TraceId,
    origin: Instant,
    started_at: SystemTime,
}

impl<'a> BuildContext<'a> {
    /// Starts a new trace; the origin is the moment of construction.
    pub fn new(rng: &'a mut dyn RandomSource, logs: &'a LogEmitter) -> Self {
        let high = rng.next_u64() as u128;
        let low = rng.next_u64() as u128;
        let trace_id = TraceId(((high << 64) | low).max(1));
        Self {
            rng,
            logs,
            trace_id,
            origin: Instant::now(),
            started_at: SystemTime::now(),
        }
    }

    pub fn trace_id(&self) -> TraceId {
        self.trace_id
    }

    /// Wall-clock time of the trace origin; instance offsets are relative to it.
    pub fn started_at(&self) -> SystemTime {
        self.started_at
    }

    pub fn rng(&mut self) -> &mut dyn RandomSource {
        &mut *self.rng
    }

    /// Builds the whole tree for `template` as a new root operation.
    pub async fn build(&mut self, template: &OperationTemplate) -> OperationInstance {
        self.build_node(template, None).await
    }

    fn build_node<'b>(
        &'b mut self,
        template: &'b OperationTemplate,
        parent: Option<SpanId>,
    ) -> BoxFuture<'b, OperationInstance> {
        Box::pin(async move {
            let span_id = SpanId(self.rng.next_u64().max(1));
            let start = self.origin.elapsed();

            if let Some(line) = &template.start_log {
                let correlation = Correlation {
                    trace_id: self.trace_id,
                    span_id,
                    operation: template.name,
                };
                self.logs
                    .log(line.level, &line.render(&Attributes::new()), Some(correlation));
            }

            let sampled = template.duration.sample(&mut *self.rng);
            if !sampled.is_zero() {
                tokio::time::sleep(sampled).await;
            }

            let mut attributes = Attributes::new();
            let scope = Scope {
                sampled,
                elapsed: self.origin.elapsed() - start,
                children: &[],
                wall_clock: self.started_at + start,
            };
            for (key, generator) in template.attributes.iter().filter(|(_, g)| !g.after_children()) {
                if let Some(value) = generator.resolve(&mut *self.rng, &scope) {
                    attributes.insert(*key, value);
                }
            }

            let mut children: Vec<OperationInstance> = Vec::with_capacity(template.children.len());
            for child in &template.children {
                if let Some(guard) = &child.guard {
                    if !guard.holds(&children) {
                        continue;
                    }
                }
                let instance = self.build_node(child, Some(span_id)).await;
                children.push(instance);
            }

            let scope = Scope {
                sampled,
                elapsed: self.origin.elapsed() - start,
                children: &children,
                wall_clock: self.started_at + start,
            };
            for (key, generator) in template.attributes.iter().filter(|(_, g)| g.after_children()) {
                if let Some(value) = generator.resolve(&mut *self.rng, &scope) {
                    attributes.insert(*key, value);
                }
            }

            let instance = OperationInstance {
                name: template.name,
                trace_id: self.trace_id,
                span_id,
                parent,
                attributes,
                sampled,
                start,
                end: self.origin.elapsed(),
                children,
            };

            for line in template.logs.iter().filter(|l| l.applies(&instance.attributes)) {
                self.logs
                    .log(line.level, &line.render(&instance.attributes), Some(instance.correlation()));
            }

            instance
        })
    }
}
