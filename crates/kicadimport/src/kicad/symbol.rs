//! Model of `.kicad_sym` symbol libraries

use super::types::{
    alignment, point, points, read_font, stroke_type, stroke_width, yes_no, Keyword, PinStyle,
    PinType, Property, Size, StrokeType, SymbolFillType,
};
use crate::geometry::{Alignment, Point};
use crate::{bail_runtime, Error, MessageLogger, Result};
use kicadimport_sexpr::Sexpr;
use std::path::Path;

#[derive(Debug, Clone, PartialEq)]
pub struct SymbolArc {
    pub start: Point,
    pub mid: Point,
    pub end: Point,
    pub stroke_width: f64,
    pub stroke_type: StrokeType,
    pub fill_type: SymbolFillType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SymbolCircle {
    pub center: Point,
    pub radius: f64,
    pub stroke_width: f64,
    pub stroke_type: StrokeType,
    pub fill_type: SymbolFillType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SymbolRectangle {
    pub start: Point,
    pub end: Point,
    pub stroke_width: f64,
    pub stroke_type: StrokeType,
    pub fill_type: SymbolFillType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SymbolPolyline {
    pub coordinates: Vec<Point>,
    pub stroke_width: f64,
    pub stroke_type: StrokeType,
    pub fill_type: SymbolFillType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SymbolText {
    pub text: String,
    pub position: Point,
    pub rotation: f64,
    pub font_size: Size,
    pub font_thickness: f64,
    pub alignment: Alignment,
}

/// A pin of a symbol gate
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolPin {
    pub pin_type: PinType,
    pub style: PinStyle,
    /// Position of the connection point
    pub position: Point,
    pub rotation: f64,
    pub length: f64,
    pub name: String,
    pub number: String,
}

/// Which body style a gate belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GateStyle {
    /// Shared by all body styles
    Common,
    Base,
    /// Alternative body style, not imported
    DeMorgan,
}

/// One unit/body-style section of a symbol
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolGate {
    /// Full name including the `_<index>_<style>` suffix
    pub name: String,
    /// Unit number, 0 means shared by all units
    pub index: i32,
    pub style: GateStyle,
    pub arcs: Vec<SymbolArc>,
    pub circles: Vec<SymbolCircle>,
    pub rectangles: Vec<SymbolRectangle>,
    pub polylines: Vec<SymbolPolyline>,
    pub texts: Vec<SymbolText>,
    pub pins: Vec<SymbolPin>,
}

/// A symbol of a symbol library
#[derive(Debug, Clone, PartialEq)]
pub struct KicadSymbol {
    pub name: String,
    /// Name of the symbol this one derives from, empty if not set
    pub extends: String,
    pub pin_names_offset: f64,
    pub hide_pin_numbers: bool,
    pub hide_pin_names: bool,
    pub exclude_from_sim: bool,
    pub in_bom: bool,
    pub on_board: bool,
    pub properties: Vec<Property>,
    pub gates: Vec<SymbolGate>,
}

/// A parsed `.kicad_sym` file
#[derive(Debug, Clone, PartialEq)]
pub struct KicadSymbolLibrary {
    pub version: i32,
    pub generator: String,
    /// Symbols which could be parsed; failures are logged and skipped
    pub symbols: Vec<KicadSymbol>,
}

// =============================================================================
// Parsing
// =============================================================================

fn symbol_fill(node: &Sexpr, log: &MessageLogger) -> Result<SymbolFillType> {
    SymbolFillType::parse(node.child("fill/type/@0")?, log)
}

impl SymbolArc {
    pub fn parse(node: &Sexpr, log: &MessageLogger) -> Result<Self> {
        Ok(Self {
            start: point(node.child("start")?)?,
            mid: point(node.child("mid")?)?,
            end: point(node.child("end")?)?,
            stroke_width: stroke_width(node)?,
            stroke_type: stroke_type(node, log)?,
            fill_type: symbol_fill(node, log)?,
        })
    }
}

impl SymbolCircle {
    pub fn parse(node: &Sexpr, log: &MessageLogger) -> Result<Self> {
        Ok(Self {
            center: point(node.child("center")?)?,
            radius: node.child("radius/@0")?.deserialize()?,
            stroke_width: stroke_width(node)?,
            stroke_type: stroke_type(node, log)?,
            fill_type: symbol_fill(node, log)?,
        })
    }
}

impl SymbolRectangle {
    pub fn parse(node: &Sexpr, log: &MessageLogger) -> Result<Self> {
        Ok(Self {
            start: point(node.child("start")?)?,
            end: point(node.child("end")?)?,
            stroke_width: stroke_width(node)?,
            stroke_type: stroke_type(node, log)?,
            fill_type: symbol_fill(node, log)?,
        })
    }
}

impl SymbolPolyline {
    pub fn parse(node: &Sexpr, log: &MessageLogger) -> Result<Self> {
        Ok(Self {
            coordinates: points(node.child("pts")?)?,
            stroke_width: stroke_width(node)?,
            stroke_type: stroke_type(node, log)?,
            fill_type: symbol_fill(node, log)?,
        })
    }
}

impl SymbolText {
    pub fn parse(node: &Sexpr, _log: &MessageLogger) -> Result<Self> {
        let mut obj = Self {
            text: node.child("@0")?.value()?.to_string(),
            position: point(node.child("at")?)?,
            rotation: 0.0,
            font_size: Size::default(),
            font_thickness: 0.0,
            alignment: Alignment::default(),
        };
        if let Some(rotation) = node.try_child("at/@2") {
            obj.rotation = rotation.deserialize()?;
        }
        read_font(node, &mut obj.font_size, &mut obj.font_thickness)?;
        if let Some(justify) = node.try_child("effects/justify") {
            obj.alignment = alignment(justify);
        }
        Ok(obj)
    }
}

impl SymbolPin {
    pub fn parse(node: &Sexpr, log: &MessageLogger) -> Result<Self> {
        Ok(Self {
            pin_type: PinType::parse(node.child("@0")?, log)?,
            style: PinStyle::parse(node.child("@1")?, log)?,
            position: point(node.child("at")?)?,
            rotation: match node.try_child("at/@2") {
                Some(rotation) => rotation.deserialize()?,
                None => 0.0,
            },
            length: node.child("length/@0")?.deserialize()?,
            name: node.child("name/@0")?.value()?.to_string(),
            number: node.child("number/@0")?.value()?.to_string(),
        })
    }
}

impl SymbolGate {
    pub fn parse(node: &Sexpr, log: &MessageLogger) -> Result<Self> {
        let name = node.child("@0")?.value()?.to_string();
        let parts: Vec<&str> = name.split('_').collect();
        let (index, style) = match parts.as_slice() {
            [_, .., index, style] => (index.parse::<i32>().ok(), style.parse::<i32>().ok()),
            _ => (None, None),
        };
        let (Some(index), Some(style)) = (index, style) else {
            bail_runtime!("Invalid symbol gate name: {}", name);
        };
        let style = match style {
            0 => GateStyle::Common,
            1 => GateStyle::Base,
            2 => GateStyle::DeMorgan,
            other => bail_runtime!("Unknown symbol gate style {}.", other),
        };

        let mut gate = SymbolGate {
            name,
            index,
            style,
            arcs: Vec::new(),
            circles: Vec::new(),
            rectangles: Vec::new(),
            polylines: Vec::new(),
            texts: Vec::new(),
            pins: Vec::new(),
        };
        for child in node.lists() {
            match child.name() {
                Some("arc") => gate.arcs.push(SymbolArc::parse(child, log)?),
                Some("circle") => gate.circles.push(SymbolCircle::parse(child, log)?),
                Some("rectangle") => gate.rectangles.push(SymbolRectangle::parse(child, log)?),
                Some("polyline") => gate.polylines.push(SymbolPolyline::parse(child, log)?),
                Some("text") => gate.texts.push(SymbolText::parse(child, log)?),
                Some("pin") => gate.pins.push(SymbolPin::parse(child, log)?),
                other => log.warning(format!(
                    "Unsupported symbol gate child: '{}'",
                    other.unwrap_or_default()
                )),
            }
        }
        Ok(gate)
    }

    /// Copy all geometry and pins of another gate into this one
    ///
    /// Texts are not merged.
    pub fn absorb(&mut self, other: &SymbolGate) {
        self.arcs.extend(other.arcs.iter().cloned());
        self.circles.extend(other.circles.iter().cloned());
        self.rectangles.extend(other.rectangles.iter().cloned());
        self.polylines.extend(other.polylines.iter().cloned());
        self.pins.extend(other.pins.iter().cloned());
    }
}

impl KicadSymbol {
    pub fn parse(node: &Sexpr, log: &MessageLogger) -> Result<Self> {
        let mut symbol = KicadSymbol {
            name: node.child("@0")?.value()?.to_string(),
            extends: String::new(),
            pin_names_offset: 0.508,
            hide_pin_numbers: false,
            hide_pin_names: false,
            exclude_from_sim: false,
            in_bom: true,
            on_board: true,
            properties: Vec::new(),
            gates: Vec::new(),
        };
        for child in node.lists() {
            match child.name() {
                Some("extends") => symbol.extends = child.child("@0")?.value()?.to_string(),
                Some("pin_names") => {
                    symbol.hide_pin_names = child.contains_token("hide");
                    if let Some(offset) = child.try_child("offset/@0") {
                        symbol.pin_names_offset = offset.deserialize()?;
                    }
                }
                Some("pin_numbers") => symbol.hide_pin_numbers = child.contains_token("hide"),
                Some("exclude_from_sim") => symbol.exclude_from_sim = yes_no(child.child("@0")?)?,
                Some("in_bom") => symbol.in_bom = yes_no(child.child("@0")?)?,
                Some("on_board") => symbol.on_board = yes_no(child.child("@0")?)?,
                Some("property") => symbol.properties.push(Property::parse(child, log)?),
                Some("symbol") => symbol.gates.push(SymbolGate::parse(child, log)?),
                Some("embedded_fonts") => {}
                other => log.warning(format!(
                    "Unsupported symbol child: '{}'",
                    other.unwrap_or_default()
                )),
            }
        }
        Ok(symbol)
    }

    pub fn property(&self, key: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.key == key)
    }
}

impl KicadSymbolLibrary {
    /// Parse a `.kicad_sym` file
    pub fn parse(path: &Path, log: &MessageLogger) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::parse_str(&content, log)
    }

    /// Parse symbol library content
    ///
    /// Symbols failing to parse are reported as critical messages and
    /// skipped, the rest of the library is still returned.
    pub fn parse_str(content: &str, log: &MessageLogger) -> Result<Self> {
        let root = kicadimport_sexpr::parse(content)?;
        if !root.is_named("kicad_symbol_lib") {
            bail_runtime!("File does not seem to be a KiCad symbol library.");
        }

        let mut library = KicadSymbolLibrary {
            version: root.child("version/@0")?.deserialize()?,
            generator: root.child("generator/@0")?.value()?.to_string(),
            symbols: Vec::new(),
        };
        for node in root.children_named("symbol") {
            let name = node
                .try_child("@0")
                .and_then(|n| n.value().ok())
                .unwrap_or_default();
            match KicadSymbol::parse(node, log) {
                Ok(symbol) => library.symbols.push(symbol),
                Err(e) => log.critical(format!("Failed to parse symbol '{}': {}", name, e)),
            }
        }
        Ok(library)
    }
}
