//! The import pipeline: scan → parse → select → import

mod controller;
mod events;
mod import;
mod parse;
mod result;
mod scan;
mod selection;

pub use controller::{ImportController, State};
pub use events::{CheckStateChange, EventBus, ImportEvent, StageContext};
pub use import::{import, ImportSummary};
pub use parse::{merge_symbol_gates, parse};
pub use result::{
    generated_by, CheckState, FootprintEntry, FootprintLibrary, GateEntry, Package3dLibrary,
    PipelineResult, SymbolEntry, SymbolLibrary,
};
pub use scan::scan;
