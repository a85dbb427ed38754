//! Conversion of symbol and footprint graphics

use crate::geometry::{arc_angle_from_3_points, Angle, Path, Point};
use crate::kicad::{self, FootprintFillType, KicadLayer, SymbolFillType};
use crate::librepcb::{Circle, Layer, Polygon, StrokeText, Text, Zone, ZoneLayers, ZoneRules};
use crate::{bail_runtime, MessageLogger, Result};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Default KiCad symbol line width (6 mil)
const DEFAULT_SYMBOL_STROKE_WIDTH: f64 = 0.1524;

/// Symbol coordinates are used as-is
pub fn symbol_point(p: Point) -> Point {
    p
}

/// Footprint coordinates have the Y axis pointing down
pub fn footprint_point(p: Point) -> Point {
    Point::new(p.x, -p.y)
}

/// Sweep angle of an arc given by three points
///
/// Angles within 0.1° of a multiple of 45° are snapped to it.
pub fn convert_arc(start: Point, mid: Point, end: Point) -> Angle {
    let angle = arc_angle_from_3_points(start, mid, end);
    let remainder = angle.mapped_0_360().to_deg() % 45.0;
    if remainder < 0.1 || remainder > 45.0 - 0.1 {
        angle.rounded(45.0)
    } else {
        angle
    }
}

pub fn symbol_stroke_width(width: f64) -> f64 {
    if width <= 0.0 {
        DEFAULT_SYMBOL_STROKE_WIDTH
    } else {
        width
    }
}

/// KiCad sizes symbol texts by glyph height, LibrePCB by line height
pub fn symbol_text_height(height: f64) -> f64 {
    height * 2.5 / 1.27
}

pub fn footprint_stroke_width(width: f64, layer: Layer) -> f64 {
    if layer.is_board_edge() || layer.polygons_represent_areas() {
        0.0
    } else {
        width
    }
}

/// Rotate texts by 180° which KiCad would render upside down
fn keep_upright(rotation: Angle) -> Angle {
    let mapped = rotation.mapped_0_360().to_deg();
    if mapped > 90.0 && mapped <= 270.0 {
        rotation + Angle::deg(180.0)
    } else {
        rotation
    }
}

// =============================================================================
// Symbols
// =============================================================================

fn symbol_fill(fill_type: SymbolFillType) -> (bool, bool) {
    (
        fill_type == SymbolFillType::Outline,
        fill_type == SymbolFillType::Background,
    )
}

pub fn convert_symbol_arc(arc: &kicad::SymbolArc) -> Polygon {
    let (fill, grab_area) = symbol_fill(arc.fill_type);
    let start = symbol_point(arc.start);
    let end = symbol_point(arc.end);
    let mut path = Path::line(start, end, convert_arc(start, symbol_point(arc.mid), end));
    if fill {
        path.close();
    }
    Polygon::new(
        Layer::SymOutlines,
        symbol_stroke_width(arc.stroke_width),
        fill,
        grab_area,
        path,
    )
}

pub fn convert_symbol_circle(circle: &kicad::SymbolCircle) -> Result<Circle> {
    if circle.radius <= 0.0 {
        bail_runtime!("Invalid circle radius: {}", circle.radius);
    }
    let (fill, grab_area) = symbol_fill(circle.fill_type);
    Ok(Circle {
        uuid: Uuid::new_v4(),
        layer: Layer::SymOutlines,
        line_width: symbol_stroke_width(circle.stroke_width),
        fill,
        grab_area,
        center: symbol_point(circle.center),
        diameter: circle.radius * 2.0,
    })
}

pub fn convert_symbol_rectangle(rect: &kicad::SymbolRectangle) -> Polygon {
    let (fill, grab_area) = symbol_fill(rect.fill_type);
    Polygon::new(
        Layer::SymOutlines,
        symbol_stroke_width(rect.stroke_width),
        fill,
        grab_area,
        Path::rect(symbol_point(rect.start), symbol_point(rect.end)),
    )
}

pub fn convert_symbol_polyline(polyline: &kicad::SymbolPolyline) -> Result<Polygon> {
    let (fill, grab_area) = symbol_fill(polyline.fill_type);
    let mut path = Path::from_points(polyline.coordinates.iter().copied().map(symbol_point));
    if path.len() < 2 {
        bail_runtime!("Polygon with less than 2 vertices.");
    }
    if fill {
        path.close();
    }
    Ok(Polygon::new(
        Layer::SymOutlines,
        symbol_stroke_width(polyline.stroke_width),
        fill,
        grab_area,
        path,
    ))
}

/// Graphical symbol text, locked since it is not a placeholder
pub fn convert_symbol_text(text: &kicad::SymbolText) -> Text {
    Text {
        uuid: Uuid::new_v4(),
        layer: Layer::SymOutlines,
        text: text.text.clone(),
        position: symbol_point(text.position),
        rotation: keep_upright(Angle::deg(text.rotation)),
        height: symbol_text_height(text.font_size.height),
        alignment: text.alignment,
        locked: true,
    }
}

/// Visible reference and value become name and value placeholders
pub fn convert_symbol_property(property: &kicad::Property) -> Option<Text> {
    let (layer, text) = match property.key.to_lowercase().as_str() {
        "reference" if !property.hide => (Layer::SymNames, "{{NAME}}"),
        "value" if !property.hide => (Layer::SymValues, "{{VALUE}}"),
        _ => return None,
    };
    // Default properties which KiCad does not display
    if property.value.is_empty() && property.position.is_origin() {
        return None;
    }
    let mut rotation = Angle::deg(property.rotation);
    if !property.unlocked {
        rotation = keep_upright(rotation);
    }
    Some(Text {
        uuid: Uuid::new_v4(),
        layer,
        text: text.to_string(),
        position: symbol_point(property.position),
        rotation,
        height: symbol_text_height(property.font_size.height),
        alignment: property.alignment,
        locked: false,
    })
}

// =============================================================================
// Footprints
// =============================================================================

pub fn footprint_geometry_layer(layer: KicadLayer) -> Result<Layer> {
    Ok(match layer {
        KicadLayer::FrontAdhesion => Layer::TopGlue,
        KicadLayer::FrontCopper => Layer::TopCopper,
        KicadLayer::FrontCourtyard => Layer::TopCourtyard,
        KicadLayer::FrontFabrication => Layer::TopDocumentation,
        KicadLayer::FrontPaste => Layer::TopSolderPaste,
        KicadLayer::FrontSilkscreen => Layer::TopLegend,
        KicadLayer::FrontSolderMask => Layer::TopStopMask,
        KicadLayer::BackAdhesion => Layer::BotGlue,
        KicadLayer::BackCopper => Layer::BotCopper,
        KicadLayer::BackCourtyard => Layer::BotCourtyard,
        KicadLayer::BackFabrication => Layer::BotDocumentation,
        KicadLayer::BackPaste => Layer::BotSolderPaste,
        KicadLayer::BackSilkscreen => Layer::BotLegend,
        KicadLayer::BackSolderMask => Layer::BotStopMask,
        KicadLayer::BoardOutline => Layer::BrdOutlines,
        KicadLayer::UserComment => Layer::BrdComments,
        KicadLayer::UserDrawing => Layer::BrdDocumentation,
        other => bail_runtime!("Unsupported footprint geometry layer {:?}.", other),
    })
}

/// A straight or arc segment of a footprint outline
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub layer: Layer,
    pub width: f64,
    pub start: Point,
    pub end: Point,
    pub angle: Angle,
}

/// Segments with the same layer and width, candidates for joining
#[derive(Debug, Clone, PartialEq)]
pub struct LineGroup {
    pub layer: Layer,
    pub width: f64,
    pub paths: Vec<Path>,
}

pub fn convert_footprint_line(line: &kicad::FootprintLine) -> Result<Line> {
    let layer = footprint_geometry_layer(line.layer)?;
    Ok(Line {
        layer,
        width: footprint_stroke_width(line.stroke_width, layer),
        start: footprint_point(line.start),
        end: footprint_point(line.end),
        angle: Angle::ZERO,
    })
}

pub fn convert_footprint_arc(arc: &kicad::FootprintArc) -> Result<Line> {
    let layer = footprint_geometry_layer(arc.layer)?;
    let start = footprint_point(arc.start);
    let end = footprint_point(arc.end);
    Ok(Line {
        layer,
        width: footprint_stroke_width(arc.stroke_width, layer),
        start,
        end,
        angle: convert_arc(start, footprint_point(arc.mid), end),
    })
}

/// Group segments by layer and width (compared in nanometers)
pub fn group_lines_by_layer_and_width(lines: &[Line]) -> Vec<LineGroup> {
    let mut groups: BTreeMap<(Layer, i64), LineGroup> = BTreeMap::new();
    for line in lines {
        let key = (line.layer, (line.width * 1e6).round() as i64);
        groups
            .entry(key)
            .or_insert_with(|| LineGroup {
                layer: line.layer,
                width: line.width,
                paths: Vec::new(),
            })
            .paths
            .push(Path::line(line.start, line.end, line.angle));
    }
    groups.into_values().collect()
}

pub fn convert_footprint_circle(circle: &kicad::FootprintCircle) -> Result<Circle> {
    let center = footprint_point(circle.center);
    let mut diameter = (footprint_point(circle.end) - center).length() * 2.0;
    let layer = footprint_geometry_layer(circle.layer)?;
    let mut line_width = footprint_stroke_width(circle.stroke_width, layer);
    let mut fill = circle.fill_type == FootprintFillType::Solid;
    // Tiny circles drawn with a thick line are dots
    if diameter <= line_width {
        diameter += line_width;
        line_width = 0.0;
        fill = true;
    }
    if diameter <= 0.0 {
        bail_runtime!("Circle with zero diameter.");
    }
    Ok(Circle {
        uuid: Uuid::new_v4(),
        layer,
        line_width,
        fill,
        grab_area: false,
        center,
        diameter,
    })
}

pub fn convert_footprint_rectangle(rect: &kicad::FootprintRectangle) -> Result<Polygon> {
    let layer = footprint_geometry_layer(rect.layer)?;
    Ok(Polygon::new(
        layer,
        footprint_stroke_width(rect.stroke_width, layer),
        rect.fill_type == FootprintFillType::Solid,
        false,
        Path::rect(footprint_point(rect.start), footprint_point(rect.end)),
    ))
}

pub fn convert_footprint_polygon(polygon: &kicad::FootprintPolygon) -> Result<Polygon> {
    let layer = footprint_geometry_layer(polygon.layer)?;
    let mut path = Path::from_points(polygon.coordinates.iter().copied().map(footprint_point));
    if path.len() < 2 {
        bail_runtime!("Polygon with less than 2 vertices.");
    }
    // KiCad polygons are always closed
    path.close();
    Ok(Polygon::new(
        layer,
        footprint_stroke_width(polygon.stroke_width, layer),
        polygon.fill_type == FootprintFillType::Solid,
        false,
        path,
    ))
}

/// Keepout zone, `None` (with a warning) if nothing useful remains
pub fn convert_footprint_zone(zone: &kicad::Zone, log: &MessageLogger) -> Option<Zone> {
    let has = |layer: KicadLayer| zone.layers.contains(&layer);
    let layers = ZoneLayers {
        top: has(KicadLayer::FrontCopper)
            || has(KicadLayer::FrontAndBackCopper)
            || has(KicadLayer::AllCopper),
        inner: has(KicadLayer::InnerCopper(1)) || has(KicadLayer::AllCopper),
        bottom: has(KicadLayer::BackCopper)
            || has(KicadLayer::FrontAndBackCopper)
            || has(KicadLayer::AllCopper),
    };
    if layers.is_empty() {
        log.warning("Zone without any layers, will be discarded.");
        return None;
    }

    let rules = ZoneRules {
        no_copper: zone.keep_out_tracks || zone.keep_out_vias || zone.keep_out_pads,
        no_planes: zone.keep_out_copper_pour,
        no_exposure: false,
        no_devices: zone.keep_out_footprints,
    };
    if !zone.keep_out_tracks && (zone.keep_out_vias || zone.keep_out_pads) {
        log.warning("Via- or pad-keepout in zone is not supported, will be ignored.");
    }
    if rules.is_empty() {
        log.warning("Zone without any rules, will be discarded.");
        return None;
    }

    let mut outline = Path::from_points(zone.polygon.iter().copied().map(footprint_point));
    outline.open();
    outline.clean();
    if outline.len() < 3 {
        log.warning("Invalid zone outline, will be discarded.");
        return None;
    }
    Some(Zone {
        uuid: Uuid::new_v4(),
        layers,
        rules,
        outline,
    })
}

/// Footprint text, `None` for the reference copy on the fabrication layer
pub fn convert_footprint_text(text: &kicad::FootprintText) -> Result<Option<StrokeText>> {
    if text.text == "${REFERENCE}" {
        return Ok(None);
    }
    let mut rotation = Angle::deg(text.rotation);
    if !text.unlocked {
        rotation = keep_upright(rotation);
    }
    Ok(Some(StrokeText {
        uuid: Uuid::new_v4(),
        layer: footprint_geometry_layer(text.layer)?,
        text: text.text.clone(),
        position: footprint_point(text.position),
        rotation,
        height: text.font_size.height,
        stroke_width: text.font_thickness,
        alignment: text.alignment,
        mirror: text.mirror,
        auto_rotate: !text.unlocked,
    }))
}

/// Visible reference and value become name and value placeholders
pub fn convert_footprint_property(property: &kicad::Property) -> Option<StrokeText> {
    let (layer, text) = match property.key.to_lowercase().as_str() {
        "reference" if property.value == "REF**" && !property.hide => {
            (Layer::TopNames, "{{NAME}}")
        }
        "value" if !property.hide => (Layer::TopValues, "{{VALUE}}"),
        _ => return None,
    };
    if property.value.is_empty() && property.position.is_origin() {
        return None;
    }
    let mut rotation = Angle::deg(property.rotation);
    if !property.unlocked {
        rotation = keep_upright(rotation);
    }
    Some(StrokeText {
        uuid: Uuid::new_v4(),
        layer,
        text: text.to_string(),
        position: footprint_point(property.position),
        rotation,
        height: property.font_size.height,
        stroke_width: property.font_thickness,
        alignment: property.alignment,
        mirror: property.mirror,
        auto_rotate: !property.unlocked,
    })
}
