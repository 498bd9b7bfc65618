// Capturing logger for testing

use flagway_log::{Level, Logger, error_chain};
use parking_lot::Mutex;
use serde_json::Value;
use std::error::Error;
use std::sync::Arc;

/// One captured log line
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub scope: String,
    pub level: Level,
    pub message: String,
    pub data: Option<Value>,
}

#[derive(Default)]
struct State {
    scope: String,
    entries: Vec<LogEntry>,
}

/// [`Logger`] that keeps everything in memory
///
/// Errors are stored with their full source chain as the message.
#[derive(Clone, Default)]
pub struct CapturingLogger {
    state: Arc<Mutex<State>>,
}

impl CapturingLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scope(&self) -> String {
        self.state.lock().scope.clone()
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.state.lock().entries.clone()
    }

    pub fn errors(&self) -> Vec<LogEntry> {
        self.at(Level::Error)
    }

    pub fn infos(&self) -> Vec<LogEntry> {
        self.at(Level::Info)
    }

    pub fn clear(&self) {
        self.state.lock().entries.clear();
    }

    fn at(&self, level: Level) -> Vec<LogEntry> {
        self.state
            .lock()
            .entries
            .iter()
            .filter(|e| e.level == level)
            .cloned()
            .collect()
    }

    fn push(&self, level: Level, message: String, data: Option<Value>) {
        let mut state = self.state.lock();
        let scope = state.scope.clone();
        state.entries.push(LogEntry {
            scope,
            level,
            message,
            data,
        });
    }
}

impl Logger for CapturingLogger {
    fn set_scope(&self, scope: &str) {
        self.state.lock().scope = scope.to_string();
    }

    fn info(&self, message: &str, data: Option<&Value>) {
        self.push(Level::Info, message.to_string(), data.cloned());
    }

    fn error(&self, error: &dyn Error) {
        self.push(Level::Error, error_chain(error), None);
    }
}
