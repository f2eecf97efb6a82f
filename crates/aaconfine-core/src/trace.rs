//! Diagnostic trace records for confinement transitions.
//!
//! Every successful transition produces one [`TraceRecord`]. With the verbose
//! level, refused transitions and module initialization are recorded too.
//! Records render either as a single text line or as a JSON line.
//!
//! Tracing never affects an operation's outcome: sink write failures are
//! dropped.

use std::io::Write;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

use crate::config::{TraceConfig, TraceFormat, trace_config};
use crate::error::NativeOperationError;
use crate::operation::Operation;

/// Severity of a trace record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Debug,
    Info,
    Warn,
}

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceEvent {
    ModuleInitialized,
    TransitionSucceeded,
    TransitionRefused,
}

/// One structured trace record.
#[derive(Debug, Clone, Serialize)]
pub struct TraceRecord {
    pub timestamp_ms: u64,
    pub level: Severity,
    pub event: TraceEvent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primitive: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub argument: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errno: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// The transition takes effect at the next exec.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub deferred: bool,
}

impl TraceRecord {
    fn new(level: Severity, event: TraceEvent) -> Self {
        Self {
            timestamp_ms: now_ms(),
            level,
            event,
            operation: None,
            primitive: None,
            argument: None,
            errno: None,
            detail: None,
            deferred: false,
        }
    }

    /// A successful transition (or query) of `operation`.
    #[must_use]
    pub fn succeeded(operation: Operation, argument: Option<&str>) -> Self {
        Self {
            operation: Some(operation),
            primitive: Some(operation.primitive()),
            argument: argument.map(str::to_owned),
            deferred: operation.is_deferred(),
            ..Self::new(Severity::Info, TraceEvent::TransitionSucceeded)
        }
    }

    /// A transition the native layer refused.
    #[must_use]
    pub fn refused(err: &NativeOperationError) -> Self {
        Self {
            operation: Some(err.operation),
            primitive: Some(err.operation.primitive()),
            argument: err.argument.clone(),
            errno: err.errno,
            deferred: err.operation.is_deferred(),
            detail: Some(err.to_string()),
            ..Self::new(Severity::Warn, TraceEvent::TransitionRefused)
        }
    }

    #[must_use]
    pub fn initialized(detail: impl Into<String>) -> Self {
        Self {
            detail: Some(detail.into()),
            ..Self::new(Severity::Debug, TraceEvent::ModuleInitialized)
        }
    }

    /// Render as a single human-readable line (no trailing newline).
    #[must_use]
    pub fn to_text(&self) -> String {
        let subject = match (self.operation, self.argument.as_deref()) {
            (Some(op), Some(arg)) => format!("{op}('{arg}')"),
            (Some(op), None) => op.name().to_string(),
            (None, _) => "module".to_string(),
        };
        match self.event {
            TraceEvent::TransitionSucceeded if self.deferred => format!(
                "aaconfine: {subject} succeeded via {}, effective at next exec",
                self.primitive.unwrap_or("?")
            ),
            TraceEvent::TransitionSucceeded => format!(
                "aaconfine: {subject} succeeded via {}",
                self.primitive.unwrap_or("?")
            ),
            TraceEvent::TransitionRefused => format!(
                "aaconfine: {subject} refused: {}",
                self.detail.as_deref().unwrap_or("native call failed")
            ),
            TraceEvent::ModuleInitialized => match self.detail.as_deref() {
                Some(detail) => format!("aaconfine: module initialized ({detail})"),
                None => "aaconfine: module initialized".to_string(),
            },
        }
    }

    /// Render as one JSON object (no trailing newline).
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Shared in-memory sink, mainly for tests and embedders that collect traces.
#[derive(Debug, Clone, Default)]
pub struct TraceBuffer(Arc<Mutex<Vec<u8>>>);

impl TraceBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }

    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_owned).collect()
    }

    pub fn clear(&self) {
        self.0.lock().clear();
    }
}

/// Where trace lines go.
#[derive(Debug, Clone, Default)]
pub enum TraceSink {
    #[default]
    Stderr,
    Buffer(TraceBuffer),
}

/// Formats and writes trace records according to a [`TraceConfig`].
#[derive(Debug, Clone, Default)]
pub struct Tracer {
    config: TraceConfig,
    sink: TraceSink,
}

impl Tracer {
    #[must_use]
    pub fn new(config: TraceConfig, sink: TraceSink) -> Self {
        Self { config, sink }
    }

    /// Tracer configured from the process environment, writing to stderr.
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(trace_config(), TraceSink::Stderr)
    }

    /// Tracer writing into a fresh buffer, returned alongside it.
    #[must_use]
    pub fn buffered(config: TraceConfig) -> (Self, TraceBuffer) {
        let buffer = TraceBuffer::new();
        (Self::new(config, TraceSink::Buffer(buffer.clone())), buffer)
    }

    pub fn transition_succeeded(&self, operation: Operation, argument: Option<&str>) {
        if self.config.level.records_success() {
            self.emit(&TraceRecord::succeeded(operation, argument));
        }
    }

    pub fn transition_refused(&self, err: &NativeOperationError) {
        if self.config.level.records_verbose() {
            self.emit(&TraceRecord::refused(err));
        }
    }

    pub fn module_initialized(&self, detail: impl Into<String>) {
        if self.config.level.records_verbose() {
            self.emit(&TraceRecord::initialized(detail));
        }
    }

    fn emit(&self, record: &TraceRecord) {
        let line = match self.config.format {
            TraceFormat::Text => record.to_text(),
            TraceFormat::Json => match record.to_json() {
                Ok(line) => line,
                Err(_) => return,
            },
        };
        let _ = match &self.sink {
            TraceSink::Stderr => writeln!(std::io::stderr().lock(), "{line}"),
            TraceSink::Buffer(buffer) => writeln!(buffer.0.lock(), "{line}"),
        };
    }
}

fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TraceLevel;

    fn config(level: TraceLevel, format: TraceFormat) -> TraceConfig {
        TraceConfig { level, format }
    }

    fn refusal() -> NativeOperationError {
        NativeOperationError {
            operation: Operation::StackProfile,
            argument: Some("extra".to_string()),
            status: -1,
            errno: Some(13),
        }
    }

    #[test]
    fn success_text_names_operation_and_primitive() {
        let record = TraceRecord::succeeded(Operation::ChangeProfile, Some("x"));
        assert_eq!(
            record.to_text(),
            "aaconfine: change_profile('x') succeeded via aa_change_profile"
        );
        let exit = TraceRecord::succeeded(Operation::ExitHat, None);
        assert_eq!(exit.to_text(), "aaconfine: exit_hat succeeded via aa_change_hat");
    }

    #[test]
    fn stack_operations_have_distinct_text() {
        let now = TraceRecord::succeeded(Operation::StackProfile, Some("p")).to_text();
        let later = TraceRecord::succeeded(Operation::StackOnexec, Some("p")).to_text();
        assert_ne!(now, later);
        assert!(later.contains("stack_onexec"));
        assert!(later.contains("aa_stack_onexec"));
    }

    #[test]
    fn onexec_transitions_are_marked_deferred() {
        let text = TraceRecord::succeeded(Operation::ChangeOnexec, Some("child")).to_text();
        assert_eq!(
            text,
            "aaconfine: change_onexec('child') succeeded via aa_change_onexec, effective at next exec"
        );
        let json = TraceRecord::succeeded(Operation::StackOnexec, Some("p"))
            .to_json()
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["deferred"], true);

        let immediate = TraceRecord::succeeded(Operation::StackProfile, Some("p"))
            .to_json()
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&immediate).unwrap();
        assert!(value.get("deferred").is_none());
    }

    #[test]
    fn json_omits_absent_fields() {
        let json = TraceRecord::succeeded(Operation::ExitHat, None)
            .to_json()
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["event"], "transition_succeeded");
        assert_eq!(value["operation"], "exit_hat");
        assert_eq!(value["primitive"], "aa_change_hat");
        assert_eq!(value["level"], "info");
        assert!(value.get("argument").is_none());
        assert!(value.get("errno").is_none());
    }

    #[test]
    fn refused_record_carries_errno() {
        let json = TraceRecord::refused(&refusal()).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["event"], "transition_refused");
        assert_eq!(value["errno"], 13);
        assert_eq!(value["argument"], "extra");
    }

    #[test]
    fn default_level_records_success_only() {
        let (tracer, buffer) = Tracer::buffered(config(TraceLevel::Transitions, TraceFormat::Text));
        tracer.module_initialized("token installed");
        tracer.transition_refused(&refusal());
        tracer.transition_succeeded(Operation::EnterHat, Some("reader"));
        assert_eq!(
            buffer.lines(),
            vec!["aaconfine: enter_hat('reader') succeeded via aa_change_hat"]
        );
    }

    #[test]
    fn verbose_level_records_everything() {
        let (tracer, buffer) = Tracer::buffered(config(TraceLevel::Verbose, TraceFormat::Text));
        tracer.module_initialized("token installed");
        tracer.transition_refused(&refusal());
        let lines = buffer.lines();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "aaconfine: module initialized (token installed)");
        assert!(lines[1].starts_with("aaconfine: stack_profile('extra') refused: "));
    }

    #[test]
    fn off_level_records_nothing() {
        let (tracer, buffer) = Tracer::buffered(config(TraceLevel::Off, TraceFormat::Json));
        tracer.transition_succeeded(Operation::ChangeOnexec, Some("p"));
        assert!(buffer.contents().is_empty());
    }

    #[test]
    fn json_sink_writes_one_object_per_line() {
        let (tracer, buffer) = Tracer::buffered(config(TraceLevel::Transitions, TraceFormat::Json));
        tracer.transition_succeeded(Operation::ChangeProfile, Some("a"));
        tracer.transition_succeeded(Operation::StackOnexec, Some("b"));
        let lines = buffer.lines();
        assert_eq!(lines.len(), 2);
        for line in &lines {
            let value: serde_json::Value = serde_json::from_str(line).unwrap();
            assert_eq!(value["event"], "transition_succeeded");
        }
        buffer.clear();
        assert!(buffer.lines().is_empty());
    }
}
