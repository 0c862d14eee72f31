use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

use crate::engine::SharedEngine;

#[derive(Default)]
struct PendingNote {
    generation: u64,
    text: Option<String>,
    task: Option<JoinHandle<()>>,
}

/// Coalesces rapid note edits into one write.
///
/// Every [`NotesDebouncer::edit`] restarts the quiet period; only the latest
/// text is handed to the engine once the period passes without another edit.
/// Pending text is claimed only while the engine lock is held, so an older
/// text can never be written after a newer one.
#[derive(Clone)]
pub struct NotesDebouncer {
    engine: SharedEngine,
    delay: Duration,
    pending: Arc<Mutex<PendingNote>>,
}

impl NotesDebouncer {
    #[must_use]
    pub fn new(engine: SharedEngine, delay: Duration) -> Self {
        Self {
            engine,
            delay,
            pending: Arc::new(Mutex::new(PendingNote::default())),
        }
    }

    /// Replace the pending text and restart the quiet period.
    pub fn edit(&self, text: impl Into<String>) {
        let mut pending = lock(&self.pending);
        pending.generation += 1;
        pending.text = Some(text.into());
        if let Some(task) = pending.task.take() {
            task.abort();
        }

        let generation = pending.generation;
        let delay = self.delay;
        let engine = Arc::clone(&self.engine);
        let shared = Arc::clone(&self.pending);
        pending.task = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let mut engine = engine.lock().await;
            let text = {
                let mut pending = lock(&shared);
                // a newer edit or a flush owns the write
                if pending.generation != generation {
                    return;
                }
                pending.task = None;
                pending.text.take()
            };
            if let Some(text) = text {
                debug!("writing debounced notes");
                engine.update_notes(text).await;
            }
        }));
    }

    /// Write the pending text immediately, if there is any.
    pub async fn flush(&self) {
        let mut engine = self.engine.lock().await;
        let text = {
            let mut pending = lock(&self.pending);
            pending.generation += 1;
            if let Some(task) = pending.task.take() {
                task.abort();
            }
            pending.text.take()
        };
        if let Some(text) = text {
            engine.update_notes(text).await;
        }
    }

    /// Text waiting for the quiet period to pass.
    #[must_use]
    pub fn pending(&self) -> Option<String> {
        lock(&self.pending).text.clone()
    }
}

fn lock(pending: &Mutex<PendingNote>) -> MutexGuard<'_, PendingNote> {
    pending.lock().unwrap_or_else(PoisonError::into_inner)
}
