//! Typed model of KiCad symbol libraries and footprints
//!
//! Only the subset of the file formats consumed by the converter is modeled.
//! Unknown keywords and children produce warnings, missing mandatory
//! children produce errors.

mod footprint;
mod pad;
mod symbol;
mod types;

pub use footprint::{
    FootprintArc, FootprintCircle, FootprintLine, FootprintModel, FootprintPolygon,
    FootprintRectangle, FootprintText, KicadFootprint, Zone,
};
pub use pad::{FootprintPad, GraphicalArc, GraphicalCircle, GraphicalLine, GraphicalPolygon};
pub use symbol::{
    GateStyle, KicadSymbol, KicadSymbolLibrary, SymbolArc, SymbolCircle, SymbolGate, SymbolPin,
    SymbolPolyline, SymbolRectangle, SymbolText,
};
pub use types::{
    CustomPadAnchor, Edge, FootprintFillType, KicadLayer, Keyword, PadProperty, PadShape, PadType,
    PinStyle, PinType, Property, Size, StrokeType, SymbolFillType, TextType, Vec3, ZoneConnect,
};
