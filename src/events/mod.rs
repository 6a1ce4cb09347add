//! Process-local publish/subscribe hub between the pipeline and the client
//! transport.
//!
//! Stage callers and the orchestrator publish typed events; every sink
//! registered at construction receives each one. Publishing is
//! fire-and-forget for the publisher: each delivery is spawned onto the
//! runtime and its join handle is registered in the run's [`TaskBag`], which
//! the orchestrator drains before a run is declared finished. Slow client
//! delivery therefore never blocks the pipeline, and never gets dropped.

mod console;

pub use console::ConsoleSink;

use crossport_common::{CodeProject, GeneratorResponse, PickerResponse};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, warn};

/// Severity attached to log-view and result events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Info,
    Error,
    Warning,
    Debug,
}

impl LogLevel {
    /// Parse a level string from an untrusted boundary. Unknown levels are
    /// coerced to `info` with an internal warning, never rejected.
    pub fn coerce(raw: &str) -> Self {
        match raw {
            "info" => LogLevel::Info,
            "error" => LogLevel::Error,
            "warning" => LogLevel::Warning,
            "debug" => LogLevel::Debug,
            other => {
                warn!(level = other, "invalid log level, falling back to info");
                LogLevel::Info
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Info => "info",
            LogLevel::Error => "error",
            LogLevel::Warning => "warning",
            LogLevel::Debug => "debug",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The three canonical progress keys shown to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStep {
    GenerateUnittests,
    Translate,
    Validate,
}

impl ProgressStep {
    pub const ALL: [ProgressStep; 3] = [
        ProgressStep::GenerateUnittests,
        ProgressStep::Translate,
        ProgressStep::Validate,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ProgressStep::GenerateUnittests => "generate_unittests",
            ProgressStep::Translate => "translate",
            ProgressStep::Validate => "validate",
        }
    }
}

/// Progress state of one step key. Within a run each key only moves forward:
/// `pending -> in_progress -> completed | error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressState {
    Pending,
    InProgress,
    Completed,
    Error,
}

impl ProgressState {
    pub fn as_str(self) -> &'static str {
        match self {
            ProgressState::Pending => "pending",
            ProgressState::InProgress => "in_progress",
            ProgressState::Completed => "completed",
            ProgressState::Error => "error",
        }
    }
}

/// Everything the gateway can announce to a client.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GatewayEvent {
    ProgressUpdate {
        key: ProgressStep,
        state: ProgressState,
    },
    LogLine {
        message: String,
        level: LogLevel,
    },
    UnitTestCandidates {
        candidates: Vec<CodeProject>,
        level: LogLevel,
    },
    UnitTestResult {
        response: PickerResponse,
        level: LogLevel,
    },
    TranslationCandidates {
        response: GeneratorResponse,
        level: LogLevel,
    },
    TranslationResult {
        response: PickerResponse,
        level: LogLevel,
    },
    AssessmentResult {
        response: GeneratorResponse,
        level: LogLevel,
    },
    PlanGenerated {
        plan: String,
        level: LogLevel,
    },
}

/// Transport-facing observer. Implementations push events to whatever
/// channel reaches the client; delivery may be slow, the bus never waits on
/// it inline (except for the plan return event, see [`EventBus::plan_generated`]).
#[async_trait::async_trait]
pub trait EventSink: Send + Sync {
    async fn deliver(&self, event: GatewayEvent) -> anyhow::Result<()>;
}

/// Run-scoped collection of background work.
///
/// Everything spawned during a run lands here: event deliveries, in-flight
/// stage calls, backups. The orchestrator drains the bag before closing the
/// run so nothing outlives the workflow span. Draining loops because a
/// draining task can itself enqueue more work (a late stage result publishes
/// events while the drain is underway).
#[derive(Default)]
pub struct TaskBag {
    handles: Mutex<Vec<JoinHandle<anyhow::Result<()>>>>,
}

impl TaskBag {
    pub fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let handle = tokio::spawn(fut);
        self.handles
            .lock()
            .expect("task bag lock poisoned")
            .push(handle);
    }

    /// Join every tracked task, logging failures but never propagating them.
    pub async fn drain(&self) {
        loop {
            let drained: Vec<_> = {
                let mut handles = self.handles.lock().expect("task bag lock poisoned");
                handles.drain(..).collect()
            };
            if drained.is_empty() {
                break;
            }
            for handle in drained {
                match handle.await {
                    Ok(Ok(())) => {}
                    Ok(Err(err)) => error!(error = %err, "background task failed"),
                    Err(err) => error!(error = %err, "background task panicked or was aborted"),
                }
            }
        }
    }
}

/// Per-run event hub. Cheap to clone; all clones share the sink list and the
/// task bag. Sinks are registered once at construction, never mid-run.
#[derive(Clone)]
pub struct EventBus {
    sinks: Arc<[Arc<dyn EventSink>]>,
    tasks: Arc<TaskBag>,
}

impl EventBus {
    pub fn new(sinks: Vec<Arc<dyn EventSink>>) -> Self {
        Self {
            sinks: sinks.into(),
            tasks: Arc::new(TaskBag::default()),
        }
    }

    pub fn tasks(&self) -> &TaskBag {
        &self.tasks
    }

    fn publish(&self, event: GatewayEvent) {
        for sink in self.sinks.iter() {
            let sink = Arc::clone(sink);
            let event = event.clone();
            self.tasks.spawn(async move { sink.deliver(event).await });
        }
    }

    pub fn progress_update(&self, key: ProgressStep, state: ProgressState) {
        self.publish(GatewayEvent::ProgressUpdate { key, state });
    }

    pub fn log_view(&self, message: impl Into<String>, level: LogLevel) {
        self.publish(GatewayEvent::LogLine {
            message: message.into(),
            level,
        });
    }

    pub fn ut_candidates(&self, candidates: Vec<CodeProject>) {
        self.publish(GatewayEvent::UnitTestCandidates {
            candidates,
            level: LogLevel::Info,
        });
    }

    pub fn ut_result(&self, response: PickerResponse, level: LogLevel) {
        self.publish(GatewayEvent::UnitTestResult { response, level });
    }

    pub fn translation_candidates(&self, response: GeneratorResponse, level: LogLevel) {
        self.publish(GatewayEvent::TranslationCandidates { response, level });
    }

    pub fn translation_result(&self, response: PickerResponse, level: LogLevel) {
        self.publish(GatewayEvent::TranslationResult { response, level });
    }

    pub fn assessment_result(&self, response: GeneratorResponse, level: LogLevel) {
        self.publish(GatewayEvent::AssessmentResult { response, level });
    }

    /// The plan return channel is the one delivery the caller waits on: the
    /// generated plan is the workflow's result, so it is pushed inline after
    /// the run wrapper finishes rather than through the task bag.
    pub async fn plan_generated(&self, plan: String, level: LogLevel) {
        for sink in self.sinks.iter() {
            let event = GatewayEvent::PlanGenerated {
                plan: plan.clone(),
                level,
            };
            if let Err(err) = sink.deliver(event).await {
                error!(error = %err, "failed to deliver generated plan");
            }
        }
    }

    /// Join all deliveries and background work spawned during the run.
    pub async fn drain(&self) {
        self.tasks.drain().await;
    }
}
