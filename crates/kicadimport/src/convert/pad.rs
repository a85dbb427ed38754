//! Reconstruction of LibrePCB pads, holes and polygons from KiCad pads
//!
//! A KiCad pad is a bag of layers plus a shape. Depending on the layers and
//! the pad type it becomes a footprint pad, a non-plated hole, or just
//! copper/mask polygons (apertures). Anything that cannot be represented is
//! reported through the message log.

use super::geometry::{convert_arc, footprint_point};
use crate::geometry::{
    donut_region, flatten_regions, region_from_path, unite, Angle, Path, Point, Region, EPSILON,
};
use crate::kicad::{self, CustomPadAnchor, Edge, KicadFootprint, KicadLayer, PadProperty, PadType};
use crate::librepcb::{
    ComponentSide, FootprintPad, Hole, Layer, MaskConfig, PadFunction, PadHole, PadShape, Polygon,
};
use crate::{bail_runtime, MessageLogger, Result};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Footprint level fallbacks for pad attributes left at zero
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PadDefaults {
    pub solder_mask_margin: f64,
    pub solder_paste_margin: f64,
    pub solder_paste_ratio: f64,
    pub clearance: f64,
}

impl From<&KicadFootprint> for PadDefaults {
    fn from(fp: &KicadFootprint) -> Self {
        Self {
            solder_mask_margin: fp.solder_mask_margin,
            solder_paste_margin: fp.solder_paste_margin,
            solder_paste_ratio: fp.solder_paste_ratio,
            clearance: fp.clearance,
        }
    }
}

/// What a single KiCad pad turns into
#[derive(Debug, Clone, Default)]
pub struct PadReplacements {
    pub pad: Option<FootprintPad>,
    pub hole: Option<Hole>,
    pub polygons: Vec<Polygon>,
}

fn pad_layer(layer: KicadLayer) -> Option<Layer> {
    Some(match layer {
        KicadLayer::FrontCopper => Layer::TopCopper,
        KicadLayer::FrontAdhesion => Layer::TopGlue,
        KicadLayer::FrontPaste => Layer::TopSolderPaste,
        KicadLayer::FrontSilkscreen => Layer::TopLegend,
        KicadLayer::FrontSolderMask => Layer::TopStopMask,
        KicadLayer::BackCopper => Layer::BotCopper,
        KicadLayer::BackAdhesion => Layer::BotGlue,
        KicadLayer::BackPaste => Layer::BotSolderPaste,
        KicadLayer::BackSilkscreen => Layer::BotLegend,
        KicadLayer::BackSolderMask => Layer::BotStopMask,
        _ => return None,
    })
}

fn pad_layers(pad: &kicad::FootprintPad, log: &MessageLogger) -> BTreeSet<Layer> {
    let mut layers = BTreeSet::new();
    for &kicad_layer in &pad.layers {
        if let Some(layer) = pad_layer(kicad_layer) {
            layers.insert(layer);
            continue;
        }
        match kicad_layer {
            KicadLayer::AllCopper | KicadLayer::FrontAndBackCopper => {
                layers.extend([Layer::TopCopper, Layer::BotCopper]);
            }
            KicadLayer::AllSolderMask => {
                layers.extend([Layer::TopStopMask, Layer::BotStopMask]);
            }
            KicadLayer::AllSilkscreen => {
                log.warning("Silkscreen enabled on pad, don't know what to do with it.");
            }
            other => log.warning(format!("Unsupported layer {:?} enabled on pad.", other)),
        }
    }
    layers
}

/// Shape of the LibrePCB pad plus the outline of the actual copper area
struct ShapeOutline {
    shape: PadShape,
    radius: f64,
    custom: Path,
    actual: Path,
}

impl ShapeOutline {
    fn rounded(radius: f64, actual: Path) -> Self {
        Self {
            shape: PadShape::RoundedRect,
            radius,
            custom: Path::new(),
            actual,
        }
    }

    fn custom(outline: Path) -> Self {
        Self {
            shape: PadShape::Custom,
            radius: 0.0,
            custom: outline.clone(),
            actual: outline,
        }
    }
}

fn convert_shape(pad: &kicad::FootprintPad, log: &MessageLogger) -> Result<ShapeOutline> {
    let (width, height) = (pad.size.width, pad.size.height);
    let min_size = width.min(height);
    let no_delta = pad.rect_delta.width == 0.0 && pad.rect_delta.height == 0.0;

    let outline = match pad.shape {
        kicad::PadShape::Circle | kicad::PadShape::Oval => {
            ShapeOutline::rounded(1.0, Path::obround(width, height))
        }
        kicad::PadShape::Rect => rect_shape(pad, min_size),
        kicad::PadShape::RoundRect if pad.round_rect_ratio == 0.0 => rect_shape(pad, min_size),
        kicad::PadShape::Trapezoid if no_delta => rect_shape(pad, min_size),
        kicad::PadShape::RoundRect => {
            if pad.chamfer_ratio > 0.0 && !pad.chamfer_edges.is_empty() {
                log.warning("Pads with mixed rounded and chamfered edges are not supported yet.");
            }
            ShapeOutline::rounded(
                (pad.round_rect_ratio * 2.0).clamp(0.0, 1.0),
                Path::centered_rect(width, height, min_size * pad.round_rect_ratio),
            )
        }
        kicad::PadShape::Trapezoid => ShapeOutline::custom(Path::trapezoid(
            width,
            height,
            -pad.rect_delta.height,
            -pad.rect_delta.width,
        )),
        kicad::PadShape::Custom => custom_shape(pad, log)?,
        kicad::PadShape::Unknown => {
            log.critical(format!(
                "Unsupported pad shape {:?}, using circular shape instead.",
                pad.shape
            ));
            ShapeOutline::rounded(1.0, Path::obround(width, height))
        }
    };
    Ok(outline)
}

fn rect_shape(pad: &kicad::FootprintPad, min_size: f64) -> ShapeOutline {
    let (width, height) = (pad.size.width, pad.size.height);
    let chamfer = min_size * pad.chamfer_ratio;
    if chamfer > 0.0 && !pad.chamfer_edges.is_empty() {
        let has = |edge: Edge| pad.chamfer_edges.contains(&edge);
        ShapeOutline::custom(Path::chamfered_rect(
            width,
            height,
            chamfer,
            has(Edge::TopLeft),
            has(Edge::TopRight),
            has(Edge::BottomLeft),
            has(Edge::BottomRight),
        ))
    } else {
        ShapeOutline::rounded(0.0, Path::centered_rect(width, height, 0.0))
    }
}

/// Union of all custom primitives and the anchor
///
/// Polygon strokes are approximated by round capped segments along each edge.
fn custom_shape(pad: &kicad::FootprintPad, log: &MessageLogger) -> Result<ShapeOutline> {
    let (width, height) = (pad.size.width, pad.size.height);
    let mut regions: Vec<Region> = Vec::new();

    for line in &pad.graphical_lines {
        let path = Path::obround_line(
            footprint_point(line.start),
            footprint_point(line.end),
            line.width,
        );
        regions.extend(region_from_path(&path));
    }
    for arc in &pad.graphical_arcs {
        let start = footprint_point(arc.start);
        let end = footprint_point(arc.end);
        let angle = convert_arc(start, footprint_point(arc.mid), end);
        regions.extend(region_from_path(&Path::arc_obround(start, end, angle, arc.width)));
    }
    for circle in &pad.graphical_circles {
        let center = footprint_point(circle.center);
        let diameter = (footprint_point(circle.end) - center).length() * 2.0;
        let outer = diameter + circle.width;
        let hole = diameter - circle.width;
        if outer > 0.0 && (circle.fill || hole <= 0.0) {
            regions.extend(region_from_path(&Path::circle(outer).translated(center)));
        } else if outer > hole && hole > 0.0 {
            regions.extend(donut_region(center, outer, hole));
        } else {
            log.warning("Strange circle in custom pad shape ignored.");
        }
    }
    for polygon in &pad.graphical_polygons {
        let points: Vec<Point> = polygon.coordinates.iter().copied().map(footprint_point).collect();
        regions.extend(region_from_path(&Path::from_points(points.iter().copied())));
        if polygon.width > 0.0 && points.len() > 1 {
            for (i, &p1) in points.iter().enumerate() {
                let p2 = points[(i + 1) % points.len()];
                regions.extend(region_from_path(&Path::obround_line(p1, p2, polygon.width)));
            }
        }
    }

    let (fallback, anchor) = match pad.custom_pad_anchor {
        Some(CustomPadAnchor::Rect) => {
            let rect = Path::centered_rect(width, height, 0.0);
            (ShapeOutline::rounded(0.0, rect.clone()), rect)
        }
        anchor => {
            if let Some(anchor @ CustomPadAnchor::Unknown) = anchor {
                log.critical(format!(
                    "Invalid custom pad anchor {:?}, using circular shape.",
                    anchor
                ));
            }
            let obround = Path::obround(width, height);
            (ShapeOutline::rounded(1.0, obround.clone()), obround)
        }
    };

    if regions.is_empty() {
        log.critical("Custom pad shape does not have a custom shape set.");
        return Ok(fallback);
    }
    regions.extend(region_from_path(&anchor));
    let mut outlines = flatten_regions(&unite(regions)?).into_iter();
    let Some(first) = outlines.next() else {
        log.critical("Custom pad shape does not have a custom shape set.");
        return Ok(fallback);
    };
    if outlines.next().is_some() {
        log.critical(
            "Custom pad shape consists of multiple separated primitives, \
             considering only one of them.",
        );
    }
    Ok(ShapeOutline::custom(first))
}

/// Round hole or slot centered at the origin
struct Drill {
    diameter: f64,
    path: Path,
}

fn convert_drill(pad: &kicad::FootprintPad, log: &MessageLogger) -> Result<Option<Drill>> {
    let plated_or_not = matches!(pad.pad_type, PadType::ThruHole | PadType::NpThruHole);
    let dw = pad.drill.width.max(0.0);
    let dh = pad.drill.height.max(0.0);
    let mut drill = None;
    if dw > 0.0 && dh > 0.0 {
        let diameter = dw.min(dh);
        let path = if (dw - dh).abs() > EPSILON {
            let dx = dw - diameter;
            let dy = dh - diameter;
            Path::line(
                Point::new(-dx / 2.0, dy / 2.0),
                Point::new(dx / 2.0, -dy / 2.0),
                Angle::ZERO,
            )
        } else {
            Path::from_points([Point::default()])
        };
        drill = Some(Drill { diameter, path });
    } else if plated_or_not {
        bail_runtime!("Through-hole pad has no valid drill set.");
    }
    if (dw > 0.0 || dh > 0.0) && !plated_or_not {
        log.warning("SMD pad has a drill diameter specified, it will be ignored.");
        drill = None;
    }
    Ok(drill)
}

fn has_stop_mask(layers: &BTreeSet<Layer>, has_drill: bool, log: &MessageLogger) -> bool {
    let has = |layer| layers.contains(&layer);
    if has_drill && (has(Layer::TopStopMask) || has(Layer::BotStopMask)) {
        if !has(Layer::TopStopMask) || !has(Layer::BotStopMask) {
            log.warning("THT pad with stop mask only on one side is not supported.");
        }
        true
    } else if has(Layer::TopCopper) && !has(Layer::BotCopper) && has(Layer::TopStopMask) {
        if has(Layer::BotStopMask) {
            log.warning("SMD pad with stop mask on both sides is not supported.");
        }
        true
    } else if has(Layer::BotCopper) && !has(Layer::TopCopper) && has(Layer::BotStopMask) {
        if has(Layer::TopStopMask) {
            log.warning("SMD pad with stop mask on both sides is not supported.");
        }
        true
    } else {
        false
    }
}

fn has_solder_paste(
    layers: &BTreeSet<Layer>,
    tht: bool,
    side: ComponentSide,
    log: &MessageLogger,
) -> bool {
    let has = |layer| layers.contains(&layer);
    if tht && (has(Layer::TopSolderPaste) || has(Layer::BotSolderPaste)) {
        if !has(Layer::TopSolderPaste) || !has(Layer::BotSolderPaste) {
            log.warning("THT pad with solder paste only on one side is not supported.");
        }
        true
    } else if side == ComponentSide::Top && has(Layer::TopSolderPaste) {
        if has(Layer::BotSolderPaste) {
            log.warning("SMD pad with solder paste on both sides is not supported.");
        }
        true
    } else if side == ComponentSide::Bottom && has(Layer::BotSolderPaste) {
        if has(Layer::TopSolderPaste) {
            log.warning("SMD pad with solder paste on both sides is not supported.");
        }
        true
    } else {
        false
    }
}

/// Pad attribute, or the footprint default if the pad leaves it at zero
fn or_default(value: f64, default: f64) -> f64 {
    if value != 0.0 {
        value
    } else {
        default
    }
}

fn pad_function(pad: &kicad::FootprintPad) -> PadFunction {
    match pad.property {
        Some(PadProperty::Bga) => PadFunction::BgaPad,
        Some(PadProperty::FiducialGlobal) => PadFunction::GlobalFiducial,
        Some(PadProperty::FiducialLocal) => PadFunction::LocalFiducial,
        Some(PadProperty::Testpoint) => PadFunction::TestPad,
        Some(PadProperty::Heatsink) => PadFunction::ThermalPad,
        _ if pad.pad_type == PadType::Connect => PadFunction::EdgeConnectorPad,
        _ => PadFunction::Unspecified,
    }
}

/// Convert a KiCad pad
///
/// Fails if the pad cannot be represented at all. Partially unsupported
/// features are reported as warnings or critical messages.
pub fn convert_pad(
    pad: &kicad::FootprintPad,
    defaults: &PadDefaults,
    log: &MessageLogger,
) -> Result<PadReplacements> {
    let layers = pad_layers(pad, log);
    let mut handled: BTreeSet<Layer> = BTreeSet::new();
    let has = |layer| layers.contains(&layer);

    let (width, height) = (pad.size.width, pad.size.height);
    if width <= 0.0 || height <= 0.0 {
        bail_runtime!("Invalid pad size {}x{}.", width, height);
    }
    let rotation = Angle::deg(pad.rotation);
    let mut shape = convert_shape(pad, log)?;
    shape.custom.open();
    shape.custom.clean();
    shape.actual.close();
    shape.actual.clean();
    let actual = shape
        .actual
        .translated(footprint_point(pad.offset))
        .rotated(rotation)
        .translated(footprint_point(pad.position));
    if actual.len() < 2 {
        log.critical("Pad shape detection failed.");
    }

    let drill = convert_drill(pad, log)?;
    let stop_mask = if !has_stop_mask(&layers, drill.is_some(), log) {
        MaskConfig::Off
    } else {
        match or_default(pad.solder_mask_margin, defaults.solder_mask_margin) {
            margin if margin != 0.0 => MaskConfig::Manual(margin),
            _ => MaskConfig::Automatic,
        }
    };
    let copper_clearance = pad.clearance.max(defaults.clearance).max(0.0);

    let mut result = PadReplacements::default();
    if pad.pad_type != PadType::NpThruHole && (has(Layer::TopCopper) || has(Layer::BotCopper)) {
        let mut holes = Vec::new();
        let component_side = match &drill {
            Some(drill)
                if pad.pad_type == PadType::ThruHole
                    && has(Layer::TopCopper)
                    && has(Layer::BotCopper) =>
            {
                holes.push(PadHole {
                    uuid: Uuid::new_v4(),
                    diameter: drill.diameter,
                    path: drill.path.clone().translated(-footprint_point(pad.offset)),
                });
                handled.extend([
                    Layer::TopCopper,
                    Layer::BotCopper,
                    Layer::TopStopMask,
                    Layer::BotStopMask,
                    Layer::TopSolderPaste,
                    Layer::BotSolderPaste,
                ]);
                ComponentSide::Top
            }
            _ if has(Layer::TopCopper) && !has(Layer::BotCopper) => {
                handled.extend([Layer::TopCopper, Layer::TopStopMask, Layer::TopSolderPaste]);
                ComponentSide::Top
            }
            _ if has(Layer::BotCopper) && !has(Layer::TopCopper) => {
                handled.extend([Layer::BotCopper, Layer::BotStopMask, Layer::BotSolderPaste]);
                ComponentSide::Bottom
            }
            _ => bail_runtime!("Strange/unsupported pad configuration detected."),
        };

        let solder_paste = if !has_solder_paste(&layers, !holes.is_empty(), component_side, log)
        {
            MaskConfig::Off
        } else {
            let margin = or_default(pad.solder_paste_margin, defaults.solder_paste_margin);
            let ratio = or_default(pad.solder_paste_margin_ratio, defaults.solder_paste_ratio);
            if margin != 0.0 || ratio != 0.0 {
                MaskConfig::Manual(-margin - width.min(height) * ratio)
            } else {
                MaskConfig::Automatic
            }
        };

        result.pad = Some(FootprintPad {
            uuid: Uuid::new_v4(),
            package_pad: None,
            position: footprint_point(pad.position)
                + footprint_point(pad.offset).rotated(rotation),
            rotation,
            shape: shape.shape,
            width,
            height,
            radius: shape.radius,
            custom_shape_outline: shape.custom,
            stop_mask,
            solder_paste,
            copper_clearance,
            component_side,
            function: pad_function(pad),
            holes,
        });
    }

    if let (PadType::NpThruHole, Some(drill)) = (pad.pad_type, &drill) {
        handled.extend([Layer::TopStopMask, Layer::BotStopMask]);
        result.hole = Some(Hole {
            uuid: Uuid::new_v4(),
            diameter: drill.diameter,
            path: drill
                .path
                .clone()
                .rotated(rotation)
                .translated(footprint_point(pad.position)),
            stop_mask,
        });
        let has_copper = has(Layer::TopCopper) || has(Layer::BotCopper);
        if (width > pad.drill.width || height > pad.drill.height) && has_copper {
            log.critical("NPTH with copper on top and/or bottom side is not supported.");
        }
        if copper_clearance > 0.0 && has_copper {
            log.critical("Copper clearance on NPTH is not supported and will be ignored.");
        }
        handled.extend([Layer::TopCopper, Layer::BotCopper]);
    }

    if pad.pad_type == PadType::Smd && result.pad.is_none() && !actual.is_empty() {
        for &kicad_layer in &pad.layers {
            match pad_layer(kicad_layer) {
                Some(layer) => {
                    result
                        .polygons
                        .push(Polygon::new(layer, 0.0, true, false, actual.clone()));
                    handled.insert(layer);
                }
                None => log.critical(format!(
                    "SMD aperture with unsupported layer {:?}.",
                    kicad_layer
                )),
            }
        }
    }

    if result.pad.is_none() && result.hole.is_none() && result.polygons.is_empty() {
        bail_runtime!("Could not convert pad '{}'.", pad.number);
    }

    for layer in layers.difference(&handled) {
        log.critical(format!(
            "Don't know what to do with layer '{}' on pad.",
            layer.name()
        ));
    }

    Ok(result)
}
