//! Integration-style tests for the queue manager, grouped by concern.

#[cfg(unix)]
mod cancel;
#[cfg(unix)]
mod scheduler;

#[cfg(unix)]
use crate::types::{Event, TaskId};
#[cfg(unix)]
use tokio::sync::broadcast;
#[cfg(unix)]
use tokio::time::{timeout, Duration};

/// Receive events until one matches `pred`, panicking after a generous timeout
#[cfg(unix)]
pub(crate) async fn wait_for_event<F>(rx: &mut broadcast::Receiver<Event>, mut pred: F) -> Event
where
    F: FnMut(&Event) -> bool,
{
    timeout(Duration::from_secs(10), async {
        loop {
            match rx.recv().await {
                Ok(event) if pred(&event) => return event,
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => panic!("event channel closed"),
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}

/// Predicate matching any terminal event for the given task
#[cfg(unix)]
pub(crate) fn terminal_for(id: TaskId) -> impl FnMut(&Event) -> bool {
    move |event| {
        matches!(
            event,
            Event::Completed { id: eid }
                | Event::Skipped { id: eid }
                | Event::Failed { id: eid, .. }
                | Event::Cancelled { id: eid }
            if *eid == id
        )
    }
}
