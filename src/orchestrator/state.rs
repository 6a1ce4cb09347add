//! Per-run state threaded through every stage call.

use crate::auth::Identity;
use crate::events::EventBus;
use std::future::Future;
use tokio::sync::oneshot;
use uuid::Uuid;

/// Everything one workflow invocation carries: a fresh trace id, the
/// caller's identity (correlation only), and the run's event bus with its
/// task bag. Cloning is cheap and clones share the bus and bag.
///
/// The trace context travels as an explicit value rather than ambient
/// task-local state - under concurrent stage dispatch there is no single
/// "current" run.
#[derive(Clone)]
pub struct RunContext {
    pub trace_id: String,
    pub user_id: String,
    pub company_id: String,
    pub events: EventBus,
}

impl RunContext {
    pub fn new(events: EventBus, identity: &Identity) -> Self {
        Self {
            trace_id: Uuid::new_v4().simple().to_string(),
            user_id: identity.user_id.clone(),
            company_id: identity.company_id.clone(),
            events,
        }
    }

    /// Spawn a stage call into the run's task bag and hand its result out
    /// through a oneshot channel.
    ///
    /// The bag owns the join handle, so the task is joined at drain time
    /// even when the workflow body bails before awaiting the receiver;
    /// awaiting the receiver after the task finished is a plain no-op join.
    pub fn spawn_tracked<T, F>(&self, fut: F) -> oneshot::Receiver<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        self.events.tasks().spawn(async move {
            // the receiver may be gone when the body aborted early
            let _ = tx.send(fut.await);
            Ok(())
        });
        rx
    }
}
