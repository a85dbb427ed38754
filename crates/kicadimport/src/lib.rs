//! KiCad library importer
//!
//! Converts KiCad symbol libraries (`*.kicad_sym`), footprint libraries
//! (`*.pretty`) and their 3D models (`*.3dshapes`) into LibrePCB library
//! elements: symbols, packages, components and devices.
//!
//! The import runs in stages driven by [`ImportController`]: the libraries
//! are scanned, parsed, the elements to import are selected and finally
//! converted and written to the destination library. Elements record which
//! KiCad entity they were generated from, so running the import again only
//! adds what is missing.

pub mod convert;
pub mod geometry;
pub mod kicad;
pub mod librepcb;
pub mod pipeline;
pub mod store;

mod error;
mod logger;
mod settings;

pub use error::{Error, Result};
pub use logger::{Message, MessageLogger, Severity};
pub use pipeline::{
    CheckState, CheckStateChange, ImportController, ImportEvent, ImportSummary, PipelineResult,
    State,
};
pub use settings::ImportSettings;
