//! LibrePCB library element model
//!
//! The target of the conversion: symbols, packages (with one footprint),
//! components and devices, serialized with serde.

mod elements;
mod layer;
mod primitives;

pub use elements::{
    AssemblyType, Component, ComponentSide, ComponentSignal, Device, ElementKind, ElementMeta,
    Footprint, FootprintPad, LibraryElement, Package, PackageModel, PackagePad, PadFunction,
    PadHole, PadShape, PadSignalMapItem, PinDisplayType, PinSignalMapItem, Resource, SignalRole,
    Symbol, SymbolPin, SymbolVariant, SymbolVariantItem,
};
pub use layer::Layer;
pub use primitives::{
    Circle, Hole, MaskConfig, Polygon, StrokeText, Text, Zone, ZoneLayers, ZoneRules,
};
