//! Library elements produced by the importer
//!
//! Each element is stored as one JSON document. Only the structure needed to
//! describe an imported part is modeled, there is no editing API.

use super::{Circle, Hole, MaskConfig, Polygon, StrokeText, Text, Zone};
use crate::geometry::{Alignment, Angle, HAlign, Path, Point, VAlign};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

static NO_ATTACHMENTS: BTreeMap<String, Vec<u8>> = BTreeMap::new();

/// The four kinds of library elements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ElementKind {
    Symbol,
    Package,
    Component,
    Device,
}

impl ElementKind {
    pub const ALL: [ElementKind; 4] = [
        ElementKind::Symbol,
        ElementKind::Package,
        ElementKind::Component,
        ElementKind::Device,
    ];

    /// Directory name within a library, also used as file stem
    pub fn short_name(self) -> &'static str {
        match self {
            ElementKind::Symbol => "sym",
            ElementKind::Package => "pkg",
            ElementKind::Component => "cmp",
            ElementKind::Device => "dev",
        }
    }

    pub fn long_name(self) -> &'static str {
        match self {
            ElementKind::Symbol => "symbol",
            ElementKind::Package => "package",
            ElementKind::Component => "component",
            ElementKind::Device => "device",
        }
    }

    pub fn from_short_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.short_name() == name)
    }
}

/// A link to an external document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub name: String,
    pub media_type: String,
    pub url: String,
}

/// Attributes common to all library elements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementMeta {
    pub uuid: Uuid,
    pub name: String,
    pub description: String,
    /// Comma separated
    pub keywords: String,
    pub author: String,
    pub version: String,
    /// Provenance key of the source entity, empty for hand-made elements
    #[serde(default)]
    pub generated_by: String,
    #[serde(default)]
    pub categories: BTreeSet<Uuid>,
    #[serde(default)]
    pub resources: Vec<Resource>,
}

/// A library element which can be stored in a library
pub trait LibraryElement: Serialize + DeserializeOwned {
    const KIND: ElementKind;

    fn meta(&self) -> &ElementMeta;

    fn uuid(&self) -> Uuid {
        self.meta().uuid
    }

    /// Additional files stored next to the element document
    fn attachments(&self) -> &BTreeMap<String, Vec<u8>> {
        &NO_ATTACHMENTS
    }
}

// =============================================================================
// Symbol
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolPin {
    pub uuid: Uuid,
    pub name: String,
    pub position: Point,
    pub rotation: Angle,
    pub length: f64,
    /// Relative to the pin position, before rotation
    pub name_position: Point,
    pub name_rotation: Angle,
    pub name_height: f64,
    pub name_alignment: Alignment,
}

impl SymbolPin {
    pub const DEFAULT_NAME_HEIGHT: f64 = 2.5;

    pub fn default_name_alignment() -> Alignment {
        Alignment {
            h: HAlign::Left,
            v: VAlign::Center,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Symbol {
    #[serde(flatten)]
    pub meta: ElementMeta,
    pub pins: Vec<SymbolPin>,
    pub polygons: Vec<Polygon>,
    pub circles: Vec<Circle>,
    pub texts: Vec<Text>,
}

impl LibraryElement for Symbol {
    const KIND: ElementKind = ElementKind::Symbol;

    fn meta(&self) -> &ElementMeta {
        &self.meta
    }
}

// =============================================================================
// Package
// =============================================================================

/// How a package is mounted on the board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssemblyType {
    /// Not mounted
    None,
    Tht,
    Smt,
    /// Both THT and SMT pads
    Mixed,
    Other,
    /// Derived from the pads of the footprint
    Auto,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackagePad {
    pub uuid: Uuid,
    pub name: String,
}

/// A 3D model attached to a package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageModel {
    pub uuid: Uuid,
    pub name: String,
}

impl PackageModel {
    /// Name of the STEP file within the package directory
    pub fn file_name(&self) -> String {
        format!("{}.step", self.uuid)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PadShape {
    /// Rectangle with rounded corners, see [`FootprintPad::radius`]
    RoundedRect,
    /// Arbitrary outline, see [`FootprintPad::custom_shape_outline`]
    Custom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentSide {
    Top,
    Bottom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PadFunction {
    Unspecified,
    StandardPad,
    PressFitPad,
    ThermalPad,
    BgaPad,
    EdgeConnectorPad,
    TestPad,
    LocalFiducial,
    GlobalFiducial,
}

/// Plated hole of a THT pad, relative to the pad position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PadHole {
    pub uuid: Uuid,
    pub diameter: f64,
    pub path: Path,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FootprintPad {
    pub uuid: Uuid,
    /// Connected package pad, `None` for unconnected pads
    pub package_pad: Option<Uuid>,
    pub position: Point,
    pub rotation: Angle,
    pub shape: PadShape,
    pub width: f64,
    pub height: f64,
    /// Corner radius relative to the smaller side, 0.0 to 1.0
    pub radius: f64,
    /// Implicitly closed, only used with [`PadShape::Custom`]
    pub custom_shape_outline: Path,
    pub stop_mask: MaskConfig,
    pub solder_paste: MaskConfig,
    pub copper_clearance: f64,
    pub component_side: ComponentSide,
    pub function: PadFunction,
    pub holes: Vec<PadHole>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Footprint {
    pub uuid: Uuid,
    pub name: String,
    pub description: String,
    /// Offset of the 3D models (x, y, z)
    pub model_position: [f64; 3],
    /// Rotation of the 3D models in degrees (x, y, z)
    pub model_rotation: [f64; 3],
    /// Package models shown for this footprint
    pub models: BTreeSet<Uuid>,
    pub polygons: Vec<Polygon>,
    pub circles: Vec<Circle>,
    pub stroke_texts: Vec<StrokeText>,
    pub zones: Vec<Zone>,
    pub holes: Vec<Hole>,
    pub pads: Vec<FootprintPad>,
}

impl Footprint {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: name.into(),
            description: String::new(),
            model_position: [0.0; 3],
            model_rotation: [0.0; 3],
            models: BTreeSet::new(),
            polygons: Vec::new(),
            circles: Vec::new(),
            stroke_texts: Vec::new(),
            zones: Vec::new(),
            holes: Vec::new(),
            pads: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Package {
    #[serde(flatten)]
    pub meta: ElementMeta,
    pub assembly_type: AssemblyType,
    pub pads: Vec<PackagePad>,
    pub models: Vec<PackageModel>,
    pub footprints: Vec<Footprint>,
    /// Model files by file name, written next to the package document
    #[serde(skip)]
    pub attachments: BTreeMap<String, Vec<u8>>,
}

impl Package {
    pub fn pad(&self, name: &str) -> Option<&PackagePad> {
        self.pads.iter().find(|p| p.name == name)
    }
}

impl LibraryElement for Package {
    const KIND: ElementKind = ElementKind::Package;

    fn meta(&self) -> &ElementMeta {
        &self.meta
    }

    fn attachments(&self) -> &BTreeMap<String, Vec<u8>> {
        &self.attachments
    }
}

// =============================================================================
// Component
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalRole {
    Passive,
    Power,
    Input,
    Output,
    Inout,
    Opendrain,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentSignal {
    pub uuid: Uuid,
    pub name: String,
    pub role: SignalRole,
    pub forced_net: String,
    pub required: bool,
    pub negated: bool,
    pub clock: bool,
}

/// What is displayed next to a symbol pin in schematics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PinDisplayType {
    None,
    PinName,
    ComponentSignal,
    NetSignal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinSignalMapItem {
    pub pin: Uuid,
    pub signal: Option<Uuid>,
    pub display: PinDisplayType,
}

/// One gate of a component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolVariantItem {
    pub uuid: Uuid,
    pub symbol: Uuid,
    pub position: Point,
    pub rotation: Angle,
    pub required: bool,
    /// Appended to the component name, e.g. "A" for U1A
    pub suffix: String,
    pub pins: Vec<PinSignalMapItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolVariant {
    pub uuid: Uuid,
    pub norm: String,
    pub name: String,
    pub description: String,
    pub items: Vec<SymbolVariantItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    #[serde(flatten)]
    pub meta: ElementMeta,
    pub schematic_only: bool,
    pub default_value: String,
    pub prefix: String,
    pub signals: Vec<ComponentSignal>,
    pub symbol_variants: Vec<SymbolVariant>,
}

impl LibraryElement for Component {
    const KIND: ElementKind = ElementKind::Component;

    fn meta(&self) -> &ElementMeta {
        &self.meta
    }
}

// =============================================================================
// Device
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PadSignalMapItem {
    pub pad: Uuid,
    /// `None` if the pad is not connected to any signal
    pub signal: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    #[serde(flatten)]
    pub meta: ElementMeta,
    pub component: Uuid,
    pub package: Uuid,
    pub pads: Vec<PadSignalMapItem>,
}

impl LibraryElement for Device {
    const KIND: ElementKind = ElementKind::Device;

    fn meta(&self) -> &ElementMeta {
        &self.meta
    }
}
