//! Notifications emitted while the pipeline runs

use super::CheckState;
use crate::librepcb::ElementKind;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

/// Something observers of the pipeline may want to know about
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportEvent {
    /// Progress of the running stage, 0..=100
    ProgressPercent(u32),
    ProgressStatus(String),
    /// The selection of an element changed as a consequence of a dependency
    CheckStateChanged(CheckStateChange),
    ScanFinished,
    ParseFinished,
    ImportFinished,
}

/// New selection state of the symbol, component, device or package named
/// `name` in the library `library`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckStateChange {
    pub kind: ElementKind,
    pub library: String,
    pub name: String,
    pub state: CheckState,
}

type Observer = Arc<dyn Fn(&ImportEvent) + Send + Sync>;

/// Synchronous observer list, events are delivered in emission order
#[derive(Clone, Default)]
pub struct EventBus {
    observers: Arc<RwLock<Vec<Observer>>>,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("observers", &self.len())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, observer: impl Fn(&ImportEvent) + Send + Sync + 'static) {
        self.observers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(Arc::new(observer));
    }

    /// Observers run without the list locked and may subscribe themselves
    pub fn emit(&self, event: ImportEvent) {
        let observers: Vec<Observer> = self
            .observers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        for observer in &observers {
            observer(&event);
        }
    }

    fn len(&self) -> usize {
        self.observers.read().map(|o| o.len()).unwrap_or(0)
    }
}

/// What a stage needs to report back and to notice cancellation
#[derive(Debug, Clone, Default)]
pub struct StageContext {
    pub log: crate::MessageLogger,
    pub events: EventBus,
    abort: Arc<AtomicBool>,
}

impl StageContext {
    pub fn new(log: crate::MessageLogger, events: EventBus, abort: Arc<AtomicBool>) -> Self {
        Self { log, events, abort }
    }

    pub fn is_aborted(&self) -> bool {
        self.abort.load(Ordering::SeqCst)
    }

    pub fn progress(&self, percent: usize) {
        self.events
            .emit(ImportEvent::ProgressPercent(percent.min(100) as u32));
    }

    pub fn status(&self, status: impl Into<String>) {
        self.events.emit(ImportEvent::ProgressStatus(status.into()));
    }
}
