//! Structured pipeline events.
//!
//! Each pipeline run reports its state transitions to an injected
//! [`EventSink`] instead of a process-wide logger, so the event stream can be
//! captured and asserted on.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::pipeline::Stage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Started,
    Succeeded,
    Failed,
    /// Step ran but had nothing to do (e.g. no manifest, nothing to back up)
    Skipped,
    /// Non-fatal problem (e.g. workspace cleanup failure)
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineEvent {
    pub module: String,
    pub stage: Stage,
    pub status: EventStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl PipelineEvent {
    pub fn new(module: impl Into<String>, stage: Stage, status: EventStatus) -> Self {
        Self {
            module: module.into(),
            stage,
            status,
            message: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Receiver of pipeline events.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: PipelineEvent);
}

impl<T: EventSink + ?Sized> EventSink for Arc<T> {
    fn emit(&self, event: PipelineEvent) {
        (**self).emit(event)
    }
}

/// Forwards events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: PipelineEvent) {
        let message = event.message.as_deref().unwrap_or("");
        match event.status {
            EventStatus::Failed | EventStatus::Warning => warn!(
                module = %event.module,
                stage = %event.stage,
                status = ?event.status,
                "{}",
                message
            ),
            _ => info!(
                module = %event.module,
                stage = %event.stage,
                status = ?event.status,
                "{}",
                message
            ),
        }
    }
}

/// Keeps every event in memory, in emission order.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<PipelineEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<PipelineEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Events of one module, as `(stage, status)` pairs.
    pub fn transitions(&self, module: &str) -> Vec<(Stage, EventStatus)> {
        self.events()
            .into_iter()
            .filter(|e| e.module == module)
            .map(|e| (e.stage, e.status))
            .collect()
    }

    pub fn clear(&self) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: PipelineEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_sink_keeps_emission_order() {
        let sink = MemorySink::new();
        sink.emit(PipelineEvent::new("shell", Stage::Fetching, EventStatus::Started));
        sink.emit(PipelineEvent::new("api", Stage::Init, EventStatus::Started));
        sink.emit(
            PipelineEvent::new("shell", Stage::Fetching, EventStatus::Failed)
                .with_message("unreachable"),
        );

        assert_eq!(sink.events().len(), 3);
        assert_eq!(
            sink.transitions("shell"),
            vec![
                (Stage::Fetching, EventStatus::Started),
                (Stage::Fetching, EventStatus::Failed),
            ]
        );
        assert_eq!(sink.events()[2].message.as_deref(), Some("unreachable"));

        sink.clear();
        assert!(sink.events().is_empty());
    }

    #[test]
    fn arc_sink_forwards() {
        let sink = Arc::new(MemorySink::new());
        let shared: Arc<dyn EventSink> = sink.clone();
        shared.emit(PipelineEvent::new("shell", Stage::Done, EventStatus::Succeeded));
        assert_eq!(sink.events().len(), 1);
    }
}
