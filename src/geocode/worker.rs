//! Background task that drains the lookup queue.
//!
//! The loop asks the resolver what to do, sleeps until the next dispatch is
//! due, runs one lookup, and reports the result. The resolver lock is taken
//! only between awaits, and the liveness flag is checked after every await
//! so a torn-down map stops scheduling lookups. A lookup that finishes after
//! teardown is handed back to the queue unrecorded.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;
use tokio::task::JoinHandle;

use super::resolver::SharedResolver;
use super::scheduler::Dispatch;
use super::{lookup_first, GeocodeService};

/// Handle to a running worker. Dropping it does not stop the worker; call
/// [`WorkerHandle::shutdown`].
pub struct WorkerHandle {
    alive: Arc<AtomicBool>,
    wake: Arc<Notify>,
    join: JoinHandle<()>,
}

impl WorkerHandle {
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire) && !self.join.is_finished()
    }

    /// Stop scheduling lookups and wait for the task to exit.
    ///
    /// A lookup already in flight is allowed to finish; its result is discarded.
    pub async fn shutdown(self) {
        self.alive.store(false, Ordering::Release);
        self.wake.notify_one();
        if let Err(e) = self.join.await {
            tracing::warn!(error = %e, "geocode worker panicked");
        }
    }
}

/// Spawn the worker on the current tokio runtime.
pub fn spawn<S>(resolver: SharedResolver, service: Arc<S>, alive: Arc<AtomicBool>) -> WorkerHandle
where
    S: GeocodeService + 'static,
{
    let wake = match resolver.lock() {
        Ok(r) => r.wake_handle(),
        Err(poisoned) => poisoned.into_inner().wake_handle(),
    };
    let join = tokio::spawn(run(resolver, service, Arc::clone(&alive), Arc::clone(&wake)));
    WorkerHandle { alive, wake, join }
}

async fn run<S: GeocodeService>(
    resolver: SharedResolver,
    service: Arc<S>,
    alive: Arc<AtomicBool>,
    wake: Arc<Notify>,
) {
    tracing::debug!("geocode worker started");
    while alive.load(Ordering::Acquire) {
        let step = match resolver.lock() {
            Ok(mut r) => r.poll_dispatch(),
            Err(e) => {
                tracing::warn!(error = %e, "resolver lock poisoned, stopping geocode worker");
                break;
            }
        };

        match step {
            Dispatch::Ready(name) => {
                tracing::debug!(name = %name, "dispatching geocode lookup");
                let outcome = lookup_first(service.as_ref(), &name).await;
                let live = alive.load(Ordering::Acquire);
                match resolver.lock() {
                    Ok(mut r) if live => r.complete(&name, outcome),
                    Ok(mut r) => {
                        r.abandon(&name);
                        break;
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "resolver lock poisoned, stopping geocode worker");
                        break;
                    }
                }
            }
            Dispatch::Wait(until) => {
                tokio::select! {
                    _ = tokio::time::sleep_until(until) => {}
                    _ = wake.notified() => {}
                }
            }
            Dispatch::Busy | Dispatch::Idle => wake.notified().await,
        }
    }
    tracing::debug!("geocode worker stopped");
}
