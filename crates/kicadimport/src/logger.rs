//! User-facing import messages
//!
//! Every message is forwarded to the `log` facade and additionally kept in a
//! shared buffer so the caller can present all messages of a stage for
//! review once it has finished.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

/// Message severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

/// One recorded message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub severity: Severity,
    /// Context labels from outermost to innermost (library → element → item)
    pub context: Vec<String>,
    pub text: String,
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.context.is_empty() {
            write!(f, "{}", self.text)
        } else {
            write!(f, "[{}] {}", self.context.join(" → "), self.text)
        }
    }
}

/// Hierarchical message logger
///
/// Clones and children share the same message buffer.
#[derive(Debug, Clone, Default)]
pub struct MessageLogger {
    context: Vec<String>,
    messages: Arc<Mutex<Vec<Message>>>,
}

impl MessageLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a logger whose messages are labelled with an additional context
    pub fn child(&self, label: impl Into<String>) -> Self {
        let mut context = self.context.clone();
        context.push(label.into());
        Self {
            context,
            messages: Arc::clone(&self.messages),
        }
    }

    pub fn info(&self, text: impl Into<String>) {
        self.push(Severity::Info, text.into());
    }

    pub fn warning(&self, text: impl Into<String>) {
        self.push(Severity::Warning, text.into());
    }

    pub fn critical(&self, text: impl Into<String>) {
        self.push(Severity::Critical, text.into());
    }

    /// Snapshot of all messages recorded so far
    pub fn messages(&self) -> Vec<Message> {
        self.lock().clone()
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.lock().iter().filter(|m| m.severity == severity).count()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn push(&self, severity: Severity, text: String) {
        let message = Message {
            severity,
            context: self.context.clone(),
            text,
        };
        match severity {
            Severity::Info => log::info!("{}", message),
            Severity::Warning => log::warn!("{}", message),
            Severity::Critical => log::error!("{}", message),
        }
        self.lock().push(message);
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Message>> {
        // A panicking writer cannot leave the buffer half-updated.
        self.messages.lock().unwrap_or_else(|e| e.into_inner())
    }
}
