//! Shutdown coordination.

use super::MediaDownloader;
use crate::types::Event;
use std::sync::atomic::Ordering;

impl MediaDownloader {
    /// Whether the downloader still accepts new tasks
    pub fn is_accepting(&self) -> bool {
        self.accepting_new.load(Ordering::SeqCst)
    }

    /// Begin a graceful shutdown.
    ///
    /// New submissions are rejected from this point on, the active download
    /// (if any) is interrupted, and the scheduler loop is woken so it can
    /// observe the flag and exit. Queued tasks keep their `Queued` status;
    /// they are simply never started.
    pub async fn shutdown(&self) {
        if self.accepting_new.swap(false, Ordering::SeqCst) {
            tracing::info!("Shutdown requested, stopping task processing");
        }

        let active_id = {
            let state = self.state.lock().await;
            state.active
        };
        if let Some(id) = active_id {
            self.cancel_task(id).await;
        }

        self.wake.notify_one();
        self.emit_event(Event::Shutdown);
    }
}
