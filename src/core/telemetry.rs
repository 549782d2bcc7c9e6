use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use crate::llm::Convention;

/// A record of one call that reached a backend.
#[derive(Debug, Clone, PartialEq)]
pub struct CallTrace {
    pub timestamp: u64,
    pub function: String,
    pub contract_id: String,
    pub convention: Convention,
    pub prompt: String,
    /// Raw backend output, absent when the backend itself failed.
    pub output: Option<String>,
    pub error: Option<String>,
    /// `examples`: number of replayed examples; `result_type`: the contract's type.
    pub metadata: HashMap<String, String>,
}

impl CallTrace {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Trait for recording call traces.
pub trait Telemetry: Send + Sync {
    fn record(&self, entry: CallTrace);
}

/// Simple in-memory collector for traces.
#[derive(Debug, Default)]
pub struct MemoryTelemetry {
    traces: Mutex<Vec<CallTrace>>,
}

impl MemoryTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_traces(&self) -> Vec<CallTrace> {
        self.traces
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Telemetry for MemoryTelemetry {
    fn record(&self, entry: CallTrace) {
        self.traces
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry);
    }
}
