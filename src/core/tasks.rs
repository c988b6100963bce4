//! Detached background tasks
//!
//! Work that must not block the caller (driver runs, deferred document
//! queries) is spawned here. The caller returns before the task completes;
//! a failed task only logs.

use crate::domain::Result;
use std::future::Future;
use std::sync::Mutex;
use tokio::task::JoinHandle;

/// Spawn `future` on the runtime, logging its error if it fails
pub fn spawn_detached<F>(name: &'static str, future: F) -> JoinHandle<()>
where
    F: Future<Output = Result<()>> + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(e) = future.await {
            tracing::error!(task = name, error = %e, "Detached task failed");
        }
    })
}

/// Handles of detached tasks, kept so a host can wait for them to settle
///
/// A task may carry a label describing the work it runs. Labelled tasks can
/// be aborted as a group, handing their labels back to the host.
#[derive(Debug)]
pub struct TaskSet<L = ()> {
    handles: Mutex<Vec<Tracked<L>>>,
}

#[derive(Debug)]
struct Tracked<L> {
    handle: JoinHandle<()>,
    label: Option<L>,
}

impl<L> Default for TaskSet<L> {
    fn default() -> Self {
        Self {
            handles: Mutex::new(Vec::new()),
        }
    }
}

impl<L> TaskSet<L> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(&self, handle: JoinHandle<()>) {
        self.push(Tracked {
            handle,
            label: None,
        });
    }

    pub fn track_labelled(&self, handle: JoinHandle<()>, label: L) {
        self.push(Tracked {
            handle,
            label: Some(label),
        });
    }

    fn push(&self, tracked: Tracked<L>) {
        if let Ok(mut handles) = self.handles.lock() {
            handles.retain(|t| !t.handle.is_finished());
            handles.push(tracked);
        }
    }

    /// Tasks not yet finished
    pub fn pending(&self) -> usize {
        self.handles
            .lock()
            .map(|h| h.iter().filter(|t| !t.handle.is_finished()).count())
            .unwrap_or(0)
    }

    /// Wait until every tracked task has finished, including tasks spawned
    /// by tasks that were already running
    ///
    /// Cancel safe: handles not yet joined go back into the set when the
    /// wait is dropped.
    pub async fn wait_idle(&self) {
        loop {
            let batch: Vec<Tracked<L>> = match self.handles.lock() {
                Ok(mut handles) => handles.drain(..).collect(),
                Err(_) => return,
            };
            if batch.is_empty() {
                return;
            }

            let mut pending = Unjoined { set: self, batch };
            while let Some(tracked) = pending.batch.last_mut() {
                let joined = (&mut tracked.handle).await;
                pending.batch.pop();
                if let Err(e) = joined {
                    if !e.is_cancelled() {
                        tracing::warn!(error = %e, "Detached task aborted");
                    }
                }
            }
        }
    }

    /// Abort every labelled task and return the labels once the tasks have
    /// stopped
    ///
    /// Unlabelled tasks keep running. Labels of tasks that had already
    /// finished are returned as well.
    pub async fn abort_labelled(&self) -> Vec<L> {
        let labelled: Vec<Tracked<L>> = match self.handles.lock() {
            Ok(mut handles) => {
                let (labelled, rest): (Vec<_>, Vec<_>) =
                    handles.drain(..).partition(|t| t.label.is_some());
                *handles = rest;
                labelled
            }
            Err(_) => return Vec::new(),
        };

        for tracked in &labelled {
            tracked.handle.abort();
        }

        let mut labels = Vec::with_capacity(labelled.len());
        for Tracked { handle, label } in labelled {
            // Aborted tasks resolve to a cancellation error
            let _ = handle.await;
            labels.extend(label);
        }
        labels
    }
}

/// Handles taken out of a [`TaskSet`] by an in-progress wait
struct Unjoined<'a, L> {
    set: &'a TaskSet<L>,
    batch: Vec<Tracked<L>>,
}

impl<L> Drop for Unjoined<'_, L> {
    fn drop(&mut self) {
        if self.batch.is_empty() {
            return;
        }
        if let Ok(mut handles) = self.set.handles.lock() {
            handles.append(&mut self.batch);
        }
    }
}
