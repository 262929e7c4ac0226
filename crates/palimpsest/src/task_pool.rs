//! Background work for the editor (chiefly syntax analysis).
//!
//! Jobs run on a small tokio blocking pool and hand their output back over a
//! channel. Nothing here touches editor state: the editor drains completions
//! at the top of each frame and decides whether they still apply.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::runtime::{Builder, Runtime};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::buffer::BufferId;

pub const DEFAULT_WORKERS: usize = 2;

/// Identifies what a job was computed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stamp {
    pub target: BufferId,
    /// Content version.
    pub version: u64,
    /// Highlighter generation.
    pub generation: u64,
}

/// Output of a job plus the stamp it was submitted with.
#[derive(Debug)]
pub struct Completed<T> {
    pub stamp: Stamp,
    pub output: T,
}

struct PendingGuard(Arc<AtomicUsize>);

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

pub struct TaskPool<T> {
    runtime: Option<Runtime>,
    sender: UnboundedSender<Completed<T>>,
    receiver: UnboundedReceiver<Completed<T>>,
    pending: Arc<AtomicUsize>,
}

impl<T: Send + 'static> TaskPool<T> {
    /// `threaded == false` runs every job inline on the caller's thread.
    /// A runtime that fails to start also degrades to inline execution.
    pub fn new(threaded: bool, workers: usize) -> Self {
        let runtime = if threaded {
            match Builder::new_multi_thread()
                .worker_threads(1)
                .max_blocking_threads(workers.max(1))
                .thread_name("palimpsest-task")
                .build()
            {
                Ok(runtime) => Some(runtime),
                Err(e) => {
                    log::warn!("Failed to start task pool, running jobs inline: {}", e);
                    None
                }
            }
        } else {
            None
        };

        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            runtime,
            sender,
            receiver,
            pending: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn is_threaded(&self) -> bool {
        self.runtime.is_some()
    }

    /// Submits `job` tagged with `stamp`. When running inline the
    /// completion is returned directly and nothing is queued.
    pub fn submit<F>(&mut self, stamp: Stamp, job: F) -> Option<Completed<T>>
    where
        F: FnOnce() -> T + Send + 'static,
    {
        let Some(runtime) = &self.runtime else {
            return Some(Completed {
                stamp,
                output: job(),
            });
        };

        self.pending.fetch_add(1, Ordering::AcqRel);
        let guard = PendingGuard(Arc::clone(&self.pending));
        let sender = self.sender.clone();
        runtime.spawn_blocking(move || {
            let _guard = guard;
            let output = job();
            // The receiver only disappears with the pool itself.
            let _ = sender.send(Completed { stamp, output });
        });
        None
    }

    /// Takes every completion that has arrived so far without blocking.
    pub fn drain(&mut self) -> Vec<Completed<T>> {
        let mut done = Vec::new();
        while let Ok(completed) = self.receiver.try_recv() {
            done.push(completed);
        }
        done
    }

    /// Jobs submitted but not yet finished.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }
}

impl<T> Drop for TaskPool<T> {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}
