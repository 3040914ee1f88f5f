//! Execution events

use crate::core::RunId;
use std::sync::{Arc, RwLock};

/// Events that can occur during pipeline execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionEvent {
    PipelineStarted {
        run_id: RunId,
        pipeline_name: String,
        stages: Vec<String>,
    },
    StageStarted {
        stage: String,
    },
    StageSkipped {
        stage: String,
    },
    StepStarted {
        stage: String,
        step_id: String,
        after: bool,
    },
    StepOutput {
        step_id: String,
        line: String,
    },
    StepFinished {
        step_id: String,
        success: bool,
        error: Option<String>,
    },
    StageFinished {
        stage: String,
        success: bool,
        secrets_released: usize,
    },
    PipelineFinished {
        run_id: RunId,
        success: bool,
    },
}

/// Type for event handlers
pub type EventHandler = Arc<dyn Fn(ExecutionEvent) + Send + Sync>;

/// Shared list of event handlers
#[derive(Clone, Default)]
pub struct EventHandlers {
    handlers: Arc<RwLock<Vec<EventHandler>>>,
}

impl EventHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an event handler
    pub fn add<F>(&self, handler: F)
    where
        F: Fn(ExecutionEvent) + Send + Sync + 'static,
    {
        if let Ok(mut handlers) = self.handlers.write() {
            handlers.push(Arc::new(handler));
        }
    }

    /// Emit an event to all handlers
    pub fn emit(&self, event: ExecutionEvent) {
        let handlers = match self.handlers.read() {
            Ok(handlers) => handlers.clone(),
            Err(_) => return,
        };
        for handler in handlers.iter() {
            handler(event.clone());
        }
    }
}

impl std::fmt::Debug for EventHandlers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.handlers.read().map(|h| h.len()).unwrap_or(0);
        f.debug_struct("EventHandlers").field("handlers", &count).finish()
    }
}
