//! Callback registry: one handler per hardware event kind.

use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use tokio::sync::RwLock;
use tracing::{debug, error, warn};

use crate::error::{Error, HardwareError};
use crate::hardware::events::EventKind;

/// Reacts to a hardware event.
///
/// Handlers run on the monitor task, in between polls. They must not call
/// [`HardwareMonitor::stop_monitoring`](crate::hardware::HardwareMonitor::stop_monitoring),
/// which would wait on the task running them.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: EventKind) -> Result<(), Error>;
}

#[async_trait]
impl<F, Fut> EventHandler for F
where
    F: Fn(EventKind) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), Error>> + Send + 'static,
{
    async fn handle(&self, event: EventKind) -> Result<(), Error> {
        (self)(event).await
    }
}

/// Maps each [`EventKind`] to at most one handler.
pub struct CallbackRegistry {
    handlers: RwLock<HashMap<EventKind, Arc<dyn EventHandler>>>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
        }
    }

    /// Register a handler. Replaces any earlier handler for the same kind.
    pub async fn register(&self, kind: EventKind, handler: Arc<dyn EventHandler>) {
        if self.handlers.write().await.insert(kind, handler).is_some() {
            debug!(event = %kind, "Replaced callback");
        } else {
            debug!(event = %kind, "Registered callback");
        }
    }

    /// Register by event name. Unknown names are rejected.
    pub async fn register_named(
        &self,
        name: &str,
        handler: Arc<dyn EventHandler>,
    ) -> Result<(), HardwareError> {
        let kind = name.parse::<EventKind>().inspect_err(|_| {
            warn!(event = %name, "Rejected callback registration for unknown event type");
        })?;
        self.register(kind, handler).await;
        Ok(())
    }

    /// Remove the handler for a kind.
    pub async fn unregister(&self, kind: EventKind) -> Option<Arc<dyn EventHandler>> {
        self.handlers.write().await.remove(&kind)
    }

    pub async fn has(&self, kind: EventKind) -> bool {
        self.handlers.read().await.contains_key(&kind)
    }

    /// Run the handler for `kind`, if any.
    ///
    /// Errors and panics from the handler are logged here and never reach
    /// the caller. Returns whether a handler ran to completion successfully.
    pub async fn dispatch(&self, kind: EventKind) -> bool {
        let Some(handler) = self.handlers.read().await.get(&kind).cloned() else {
            return false;
        };

        match AssertUnwindSafe(handler.handle(kind)).catch_unwind().await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                error!(event = %kind, "Error in event callback: {}", e);
                false
            }
            Err(_) => {
                error!(event = %kind, "Event callback panicked");
                false
            }
        }
    }
}

impl Default for CallbackRegistry {
    fn default() -> Self {
        Self::new()
    }
}
