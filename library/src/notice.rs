use std::sync::{Arc, Mutex};

use log::{error, info, warn};
use serde::Serialize;

#[derive(Serialize, Clone, Copy, PartialEq, Eq, Debug)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// A message meant for the user, e.g. a rejected drop or a failed save.
#[derive(Serialize, Clone, PartialEq, Debug)]
pub struct Notice {
    pub severity: Severity,
    pub message: String,
}

/// Shared notice sink. Cloning yields another handle onto the same list, so
/// the write queue's worker thread can report into it.
#[derive(Clone, Default, Debug)]
pub struct Notices {
    inner: Arc<Mutex<Vec<Notice>>>,
}

impl Notices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, severity: Severity, message: impl Into<String>) {
        let message = message.into();
        match severity {
            Severity::Info => info!("{}", message),
            Severity::Warning => warn!("{}", message),
            Severity::Error => error!("{}", message),
        }
        match self.inner.lock() {
            Ok(mut list) => list.push(Notice { severity, message }),
            Err(_) => error!("Notice list lock poisoned, dropping notice"),
        }
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.push(Severity::Warning, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.push(Severity::Error, message);
    }

    /// Takes every pending notice, oldest first.
    pub fn drain(&self) -> Vec<Notice> {
        self.inner
            .lock()
            .map(|mut list| std::mem::take(&mut *list))
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map(|list| list.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
