//! Model of footprint pads, including custom pad primitives

use super::types::{
    point, points, size, yes_no, CustomPadAnchor, Edge, KicadLayer, Keyword, PadProperty,
    PadShape, PadType, Size,
};
use crate::geometry::Point;
use crate::{MessageLogger, Result};
use kicadimport_sexpr::Sexpr;

#[derive(Debug, Clone, PartialEq)]
pub struct GraphicalLine {
    pub start: Point,
    pub end: Point,
    pub width: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GraphicalArc {
    pub start: Point,
    pub mid: Point,
    pub end: Point,
    pub width: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GraphicalCircle {
    pub center: Point,
    /// Any point on the circle
    pub end: Point,
    pub width: f64,
    pub fill: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GraphicalPolygon {
    pub coordinates: Vec<Point>,
    pub width: f64,
    pub fill: bool,
}

fn fill_flag(node: &Sexpr) -> Result<bool> {
    match node.try_child("fill/@0") {
        Some(fill) => Ok(matches!(fill.value()?, "yes" | "solid")),
        None => Ok(false),
    }
}

impl GraphicalLine {
    pub fn parse(node: &Sexpr) -> Result<Self> {
        Ok(Self {
            start: point(node.child("start")?)?,
            end: point(node.child("end")?)?,
            width: node.child("width/@0")?.deserialize()?,
        })
    }
}

impl GraphicalArc {
    pub fn parse(node: &Sexpr) -> Result<Self> {
        Ok(Self {
            start: point(node.child("start")?)?,
            mid: point(node.child("mid")?)?,
            end: point(node.child("end")?)?,
            width: node.child("width/@0")?.deserialize()?,
        })
    }
}

impl GraphicalCircle {
    pub fn parse(node: &Sexpr) -> Result<Self> {
        Ok(Self {
            center: point(node.child("center")?)?,
            end: point(node.child("end")?)?,
            width: node.child("width/@0")?.deserialize()?,
            fill: fill_flag(node)?,
        })
    }
}

impl GraphicalPolygon {
    pub fn parse(node: &Sexpr) -> Result<Self> {
        Ok(Self {
            coordinates: points(node.child("pts")?)?,
            width: node.child("width/@0")?.deserialize()?,
            fill: fill_flag(node)?,
        })
    }
}

/// A footprint pad
#[derive(Debug, Clone, PartialEq)]
pub struct FootprintPad {
    /// Pad number, empty for mechanical pads
    pub number: String,
    pub pad_type: PadType,
    pub shape: PadShape,
    pub position: Point,
    /// Offset of the copper shape relative to the drill
    pub offset: Point,
    pub rotation: f64,
    pub size: Size,
    /// Zero if there is no drill
    pub drill: Size,
    pub layers: Vec<KicadLayer>,
    pub property: Option<PadProperty>,
    pub solder_mask_margin: f64,
    pub solder_paste_margin: f64,
    pub solder_paste_margin_ratio: f64,
    pub thermal_bridge_angle: f64,
    pub thermal_bridge_width: f64,
    pub clearance: f64,
    pub remove_unused_layers: bool,
    pub round_rect_ratio: f64,
    pub rect_delta: Size,
    pub chamfer_ratio: f64,
    pub chamfer_edges: Vec<Edge>,
    pub custom_pad_anchor: Option<CustomPadAnchor>,
    pub graphical_lines: Vec<GraphicalLine>,
    pub graphical_arcs: Vec<GraphicalArc>,
    pub graphical_circles: Vec<GraphicalCircle>,
    pub graphical_polygons: Vec<GraphicalPolygon>,
}

impl FootprintPad {
    pub fn parse(node: &Sexpr, log: &MessageLogger) -> Result<Self> {
        let mut pad = FootprintPad {
            number: node.child("@0")?.value()?.to_string(),
            pad_type: PadType::parse(node.child("@1")?, log)?,
            shape: PadShape::parse(node.child("@2")?, log)?,
            position: Point::default(),
            offset: Point::default(),
            rotation: 0.0,
            size: Size::default(),
            drill: Size::default(),
            layers: Vec::new(),
            property: None,
            solder_mask_margin: 0.0,
            solder_paste_margin: 0.0,
            solder_paste_margin_ratio: 0.0,
            thermal_bridge_angle: 0.0,
            thermal_bridge_width: 0.0,
            clearance: 0.0,
            remove_unused_layers: false,
            round_rect_ratio: 0.0,
            rect_delta: Size::default(),
            chamfer_ratio: 0.0,
            chamfer_edges: Vec::new(),
            custom_pad_anchor: None,
            graphical_lines: Vec::new(),
            graphical_arcs: Vec::new(),
            graphical_circles: Vec::new(),
            graphical_polygons: Vec::new(),
        };

        for child in node.lists() {
            let number = || -> Result<f64> { Ok(child.child("@0")?.deserialize()?) };
            match child.name().unwrap_or_default() {
                "at" => {
                    pad.position = point(child)?;
                    if let Some(rotation) = child.try_child("@2") {
                        pad.rotation = rotation.deserialize()?;
                    }
                }
                "size" => pad.size = size(child)?,
                "drill" => pad.parse_drill(child)?,
                "layers" => {
                    // Older files write some layer names without quotes.
                    for layer in child.args().iter().filter(|a| a.as_list().is_none()) {
                        pad.layers.push(KicadLayer::parse(layer, log)?);
                    }
                }
                "property" => pad.property = Some(PadProperty::parse(child.child("@0")?, log)?),
                "solder_mask_margin" => pad.solder_mask_margin = number()?,
                "solder_paste_margin" => pad.solder_paste_margin = number()?,
                "solder_paste_margin_ratio" => pad.solder_paste_margin_ratio = number()?,
                "thermal_bridge_angle" => pad.thermal_bridge_angle = number()?,
                "thermal_bridge_width" => pad.thermal_bridge_width = number()?,
                "clearance" => pad.clearance = number()?,
                "remove_unused_layers" => pad.remove_unused_layers = yes_no(child.child("@0")?)?,
                "roundrect_rratio" => pad.round_rect_ratio = number()?,
                "rect_delta" => pad.rect_delta = size(child)?,
                "chamfer_ratio" => pad.chamfer_ratio = number()?,
                "chamfer" => {
                    for edge in child.args().iter().filter(|a| a.as_sym().is_some()) {
                        pad.chamfer_edges.push(Edge::parse(edge, log)?);
                    }
                }
                "options" => {
                    for option in child.lists() {
                        match option.name().unwrap_or_default() {
                            "clearance" => {
                                let clearance = option.child("@0")?.value()?;
                                if clearance != "outline" {
                                    log.warning(format!(
                                        "Unsupported pad clearance: '{}'",
                                        clearance
                                    ));
                                }
                            }
                            "anchor" => {
                                pad.custom_pad_anchor =
                                    Some(CustomPadAnchor::parse(option.child("@0")?, log)?)
                            }
                            other => log.warning(format!("Unsupported pad option: '{}'", other)),
                        }
                    }
                }
                "primitives" => {
                    for primitive in child.lists() {
                        match primitive.name().unwrap_or_default() {
                            "gr_line" => pad.graphical_lines.push(GraphicalLine::parse(primitive)?),
                            "gr_arc" => pad.graphical_arcs.push(GraphicalArc::parse(primitive)?),
                            "gr_circle" => {
                                pad.graphical_circles.push(GraphicalCircle::parse(primitive)?)
                            }
                            "gr_poly" => {
                                pad.graphical_polygons.push(GraphicalPolygon::parse(primitive)?)
                            }
                            other => {
                                log.warning(format!("Unsupported pad primitive: '{}'", other))
                            }
                        }
                    }
                }
                "zone_connect" | "die_length" | "keep_end_layers" | "uuid" | "tstamp" => {}
                other => log.warning(format!("Unsupported pad child: '{}'", other)),
            }
        }
        Ok(pad)
    }

    /// `(drill D)`, `(drill oval W H)`, optionally with `(offset X Y)`
    fn parse_drill(&mut self, node: &Sexpr) -> Result<()> {
        let values: Vec<&Sexpr> = node.args().iter().filter(|a| a.as_sym().is_some()).collect();
        let (is_oval, values) = match values.split_first() {
            Some((first, rest)) if first.as_sym() == Some("oval") => (true, rest),
            _ => (false, values.as_slice()),
        };
        if let Some(diameter) = values.first() {
            let diameter: f64 = diameter.deserialize()?;
            self.drill = Size::new(diameter, diameter);
        }
        if is_oval {
            if let Some(height) = values.get(1) {
                self.drill.height = height.deserialize()?;
            }
        }
        if let Some(offset) = node.try_child("offset") {
            self.offset = point(offset)?;
        }
        Ok(())
    }

    pub fn has_layer(&self, layer: KicadLayer) -> bool {
        self.layers.contains(&layer)
    }
}
