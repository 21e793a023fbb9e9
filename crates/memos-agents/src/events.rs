//! Trajectory telemetry (§4.3): a `tool_call`/`tool_result` pair around
//! every external call an agent or the runner makes. Events that occur
//! before the owning `AgentRun` row exists are buffered by the caller and
//! flushed once the row id is known; failures here never abort execution.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct ToolCallEvent {
    pub tool: String,
    pub ok: Option<bool>,
    pub duration_ms: Option<u64>,
    pub context: Value,
    pub at: DateTime<Utc>,
}

pub trait ToolEventSink: Send + Sync {
    fn emit_call(&self, tool: &str, context: Value);
    fn emit_result(&self, tool: &str, ok: bool, duration_ms: u64, context: Value);
    fn drain(&self) -> Vec<ToolCallEvent>;
}

#[derive(Default)]
pub struct InMemoryToolEventSink {
    events: Mutex<Vec<ToolCallEvent>>,
}

impl ToolEventSink for InMemoryToolEventSink {
    fn emit_call(&self, tool: &str, context: Value) {
        self.events.lock().push(ToolCallEvent {
            tool: tool.to_string(),
            ok: None,
            duration_ms: None,
            context,
            at: Utc::now(),
        });
    }

    fn emit_result(&self, tool: &str, ok: bool, duration_ms: u64, context: Value) {
        self.events.lock().push(ToolCallEvent {
            tool: tool.to_string(),
            ok: Some(ok),
            duration_ms: Some(duration_ms),
            context,
            at: Utc::now(),
        });
    }

    fn drain(&self) -> Vec<ToolCallEvent> {
        std::mem::take(&mut *self.events.lock())
    }
}
