//! Ordered background persistence.
//!
//! Writes are applied one at a time by a single worker thread, in submission
//! order. Callers get a `WriteTicket` per submission and decide which ones to
//! wait on; a drag only keeps the ticket of its latest write.

use std::sync::{Arc, mpsc};
use std::thread::{self, JoinHandle};

use log::{debug, error};

use super::backend::StorageBackend;
use crate::error::LibraryError;
use crate::notice::Notices;

pub type WriteJob = Box<dyn FnOnce(&dyn StorageBackend) -> Result<(), LibraryError> + Send>;

struct WriteTask {
    label: String,
    job: WriteJob,
    reply: mpsc::Sender<Result<(), LibraryError>>,
}

/// Completion handle for one submitted write.
#[derive(Debug)]
pub struct WriteTicket {
    label: String,
    rx: mpsc::Receiver<Result<(), LibraryError>>,
}

impl WriteTicket {
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Result of the write if it has already been applied, without blocking.
    pub fn poll(&self) -> Option<Result<(), LibraryError>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(mpsc::TryRecvError::Empty) => None,
            Err(mpsc::TryRecvError::Disconnected) => Some(Err(LibraryError::Runtime(format!(
                "Write queue closed before '{}' completed",
                self.label
            )))),
        }
    }

    /// Blocks until the write has been applied.
    pub fn wait(self) -> Result<(), LibraryError> {
        self.rx.recv().map_err(|_| {
            LibraryError::Runtime(format!("Write queue closed before '{}' completed", self.label))
        })?
    }
}

pub struct WriteQueue {
    tx: Option<mpsc::Sender<WriteTask>>,
    worker: Option<JoinHandle<()>>,
}

impl WriteQueue {
    pub fn new(backend: Arc<dyn StorageBackend>, notices: Notices) -> Self {
        let (tx, rx) = mpsc::channel::<WriteTask>();
        let worker = thread::spawn(move || {
            while let Ok(task) = rx.recv() {
                let result = (task.job)(backend.as_ref());
                match &result {
                    Ok(()) => debug!("Write '{}' applied", task.label),
                    Err(err) => error!("Write '{}' failed: {}", task.label, err),
                }
                if let Err(mpsc::SendError(Err(err))) = task.reply.send(result) {
                    // Nobody is waiting on this one; surface the failure anyway.
                    notices.error(format!("Failed to save changes ({}): {}", task.label, err));
                }
            }
            debug!("Write queue worker exiting");
        });
        Self {
            tx: Some(tx),
            worker: Some(worker),
        }
    }

    pub fn submit(&self, label: impl Into<String>, job: WriteJob) -> WriteTicket {
        let label = label.into();
        let (reply, rx) = mpsc::channel();
        let task = WriteTask {
            label: label.clone(),
            job,
            reply,
        };
        match &self.tx {
            Some(tx) => {
                if let Err(mpsc::SendError(task)) = tx.send(task) {
                    error!("Write queue is gone, dropping '{}'", task.label);
                }
            }
            None => error!("Write queue is shut down, dropping '{}'", label),
        }
        WriteTicket { label, rx }
    }
}

impl Drop for WriteQueue {
    fn drop(&mut self) {
        drop(self.tx.take());
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                error!("Write queue worker panicked");
            }
        }
    }
}
