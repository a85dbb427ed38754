//! Conversion of KiCad entities to LibrePCB library elements

mod geometry;
mod library;
mod metadata;
mod pad;
mod pins;

pub use geometry::{convert_arc, footprint_point, symbol_point};
pub use library::LibraryConverter;
pub use metadata::{
    clean_circuit_identifier, clean_component_prefix, clean_element_name, find_property,
};
pub use pad::{convert_pad, PadDefaults, PadReplacements};
pub use pins::{convert_circuit_identifier, convert_symbol_pin_names};

use crate::{MessageLogger, Result};

/// Run `f`, reporting a failure as critical message instead of propagating it
pub(crate) fn try_or_log<T>(log: &MessageLogger, f: impl FnOnce() -> Result<T>) -> Option<T> {
    match f() {
        Ok(value) => Some(value),
        Err(e) => {
            log.critical(e.to_string());
            None
        }
    }
}
