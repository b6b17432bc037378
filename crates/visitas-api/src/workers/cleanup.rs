//! Deferred scratch-file cleanup.
//!
//! Every intake request enqueues its scratch files (uploads plus the
//! rendered PDF) exactly once, after the response value is built. The
//! worker deletes at-least-once with delete-if-exists semantics: a file
//! already gone counts as done, and IO errors are logged and swallowed.

use std::path::PathBuf;

use tokio::sync::mpsc;
use tracing::{info, warn};

#[derive(Clone)]
pub struct CleanupQueue {
    tx: mpsc::UnboundedSender<Vec<PathBuf>>,
}

impl CleanupQueue {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Vec<PathBuf>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Enqueue one request's scratch files. Deletion is best-effort: if the
    /// worker is gone the files stay behind and we only log it.
    pub fn schedule(&self, files: Vec<PathBuf>) {
        if files.is_empty() {
            return;
        }
        if self.tx.send(files).is_err() {
            warn!("cleanup worker not running; scratch files left behind");
        }
    }
}

pub async fn run_cleanup(mut rx: mpsc::UnboundedReceiver<Vec<PathBuf>>) {
    while let Some(batch) = rx.recv().await {
        info!("cleaning {} scratch files", batch.len());
        for path in batch {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {}
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => warn!("could not delete {}: {}", path.display(), err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn worker_deletes_scheduled_files_and_ignores_missing_ones() {
        let dir = tempfile::tempdir().unwrap();
        let present = dir.path().join("foto.jpg");
        std::fs::write(&present, b"jpg").unwrap();
        let missing = dir.path().join("ya_borrado.jpg");

        let (queue, rx) = CleanupQueue::new();
        queue.schedule(vec![present.clone(), missing]);
        drop(queue); // close the channel so the worker drains and exits

        run_cleanup(rx).await;

        assert!(!present.exists());
    }

    #[tokio::test]
    async fn empty_batches_are_not_enqueued() {
        let (queue, mut rx) = CleanupQueue::new();
        queue.schedule(Vec::new());
        drop(queue);

        assert!(rx.recv().await.is_none());
    }
}
