//! Model of `.kicad_mod` footprint files

use super::pad::FootprintPad;
use super::types::{
    alignment, point, points, read_font, stroke_type, stroke_width, vec3, FootprintFillType,
    KicadLayer, Keyword, Property, Size, StrokeType, TextType, Vec3, ZoneConnect,
};
use crate::geometry::{Alignment, Point};
use crate::{bail_runtime, Error, MessageLogger, Result};
use kicadimport_sexpr::Sexpr;
use std::path::Path;

#[derive(Debug, Clone, PartialEq)]
pub struct FootprintLine {
    pub start: Point,
    pub end: Point,
    pub stroke_width: f64,
    pub stroke_type: StrokeType,
    pub layer: KicadLayer,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FootprintArc {
    pub start: Point,
    pub mid: Point,
    pub end: Point,
    pub stroke_width: f64,
    pub stroke_type: StrokeType,
    pub layer: KicadLayer,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FootprintCircle {
    pub center: Point,
    /// Any point on the circle
    pub end: Point,
    pub layer: KicadLayer,
    pub stroke_width: f64,
    pub stroke_type: StrokeType,
    pub fill_type: FootprintFillType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FootprintRectangle {
    pub start: Point,
    pub end: Point,
    pub layer: KicadLayer,
    pub stroke_width: f64,
    pub stroke_type: StrokeType,
    pub fill_type: FootprintFillType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FootprintPolygon {
    pub coordinates: Vec<Point>,
    pub layer: KicadLayer,
    pub stroke_width: f64,
    pub stroke_type: StrokeType,
    pub fill_type: FootprintFillType,
}

/// Free text of a footprint (KiCad 6/7 also stores reference and value this way)
#[derive(Debug, Clone, PartialEq)]
pub struct FootprintText {
    pub text_type: TextType,
    pub text: String,
    pub position: Point,
    pub rotation: f64,
    pub layer: KicadLayer,
    pub font_size: Size,
    pub font_thickness: f64,
    pub alignment: Alignment,
    pub mirror: bool,
    pub unlocked: bool,
}

/// Keepout zone
#[derive(Debug, Clone, PartialEq)]
pub struct Zone {
    pub layers: Vec<KicadLayer>,
    pub keep_out_tracks: bool,
    pub keep_out_vias: bool,
    pub keep_out_pads: bool,
    pub keep_out_copper_pour: bool,
    pub keep_out_footprints: bool,
    pub polygon: Vec<Point>,
}

/// Reference to a 3D model file
#[derive(Debug, Clone, PartialEq)]
pub struct FootprintModel {
    /// Path as written in the footprint, usually with a `${KICADx_3DMODEL_DIR}` prefix
    pub path: String,
    pub offset: Vec3,
    pub scale: Vec3,
    pub rotate: Vec3,
}

/// A parsed `.kicad_mod` file
#[derive(Debug, Clone, PartialEq)]
pub struct KicadFootprint {
    pub name: String,
    /// -1 if not set
    pub version: i32,
    pub generator: String,
    pub layer: KicadLayer,
    pub description: String,
    pub tags: String,
    pub is_smd: bool,
    pub is_through_hole: bool,
    pub board_only: bool,
    pub exclude_from_pos_files: bool,
    pub exclude_from_bom: bool,
    pub solder_mask_margin: f64,
    pub solder_paste_margin: f64,
    pub solder_paste_ratio: f64,
    pub clearance: f64,
    pub zone_connect: Option<ZoneConnect>,
    pub net_tie_pad_groups: Vec<Vec<String>>,
    pub properties: Vec<Property>,
    pub lines: Vec<FootprintLine>,
    pub arcs: Vec<FootprintArc>,
    pub circles: Vec<FootprintCircle>,
    pub rectangles: Vec<FootprintRectangle>,
    pub polygons: Vec<FootprintPolygon>,
    pub texts: Vec<FootprintText>,
    pub pads: Vec<FootprintPad>,
    pub zones: Vec<Zone>,
    pub models: Vec<FootprintModel>,
}

// =============================================================================
// Parsing
// =============================================================================

fn layer(node: &Sexpr, log: &MessageLogger) -> Result<KicadLayer> {
    KicadLayer::parse(node.child("layer/@0")?, log)
}

fn fill_type(node: &Sexpr, log: &MessageLogger) -> Result<FootprintFillType> {
    match node.try_child("fill/@0") {
        Some(fill) => FootprintFillType::parse(fill, log),
        None => Ok(FootprintFillType::None),
    }
}

impl FootprintLine {
    pub fn parse(node: &Sexpr, log: &MessageLogger) -> Result<Self> {
        Ok(Self {
            start: point(node.child("start")?)?,
            end: point(node.child("end")?)?,
            stroke_width: stroke_width(node)?,
            stroke_type: stroke_type(node, log)?,
            layer: layer(node, log)?,
        })
    }
}

impl FootprintArc {
    pub fn parse(node: &Sexpr, log: &MessageLogger) -> Result<Self> {
        Ok(Self {
            start: point(node.child("start")?)?,
            mid: point(node.child("mid")?)?,
            end: point(node.child("end")?)?,
            stroke_width: stroke_width(node)?,
            stroke_type: stroke_type(node, log)?,
            layer: layer(node, log)?,
        })
    }
}

impl FootprintCircle {
    pub fn parse(node: &Sexpr, log: &MessageLogger) -> Result<Self> {
        Ok(Self {
            center: point(node.child("center")?)?,
            end: point(node.child("end")?)?,
            layer: layer(node, log)?,
            stroke_width: stroke_width(node)?,
            stroke_type: stroke_type(node, log)?,
            fill_type: fill_type(node, log)?,
        })
    }
}

impl FootprintRectangle {
    pub fn parse(node: &Sexpr, log: &MessageLogger) -> Result<Self> {
        Ok(Self {
            start: point(node.child("start")?)?,
            end: point(node.child("end")?)?,
            layer: layer(node, log)?,
            stroke_width: stroke_width(node)?,
            stroke_type: stroke_type(node, log)?,
            fill_type: fill_type(node, log)?,
        })
    }
}

impl FootprintPolygon {
    pub fn parse(node: &Sexpr, log: &MessageLogger) -> Result<Self> {
        Ok(Self {
            coordinates: points(node.child("pts")?)?,
            layer: layer(node, log)?,
            stroke_width: stroke_width(node)?,
            stroke_type: stroke_type(node, log)?,
            fill_type: fill_type(node, log)?,
        })
    }
}

impl FootprintText {
    pub fn parse(node: &Sexpr, log: &MessageLogger) -> Result<Self> {
        let mut text = Self {
            text_type: TextType::parse(node.child("@0")?, log)?,
            text: node.child("@1")?.value()?.to_string(),
            position: point(node.child("at")?)?,
            rotation: 0.0,
            layer: layer(node, log)?,
            font_size: Size::default(),
            font_thickness: 0.0,
            alignment: Alignment::default(),
            mirror: false,
            unlocked: false,
        };
        if let Some(child) = node.try_child("at/@2") {
            if child.value()? == "unlocked" {
                text.unlocked = true;
            } else {
                text.rotation = child.deserialize()?;
            }
        }
        read_font(node, &mut text.font_size, &mut text.font_thickness)?;
        if let Some(justify) = node.try_child("effects/justify") {
            text.alignment = alignment(justify);
            text.mirror = justify.contains_token("mirror");
        }
        if let Some(child) = node.try_child("unlocked/@0") {
            text.unlocked = child.value()? == "yes";
        }
        Ok(text)
    }
}

impl Zone {
    pub fn parse(node: &Sexpr, log: &MessageLogger) -> Result<Self> {
        let keep_out = |name: &str| -> Result<bool> {
            let value = node.child(&format!("keepout/{}/@0", name))?.value()?;
            Ok(match value {
                "allowed" => false,
                "not_allowed" => true,
                other => {
                    log.warning(format!("Unknown keepout value: {}", other));
                    false
                }
            })
        };

        let layers = match node.try_child("layer/@0") {
            Some(layer) => vec![KicadLayer::parse(layer, log)?],
            None => node
                .child("layers")?
                .args()
                .iter()
                .filter(|a| a.as_str().is_some())
                .map(|a| KicadLayer::parse(a, log))
                .collect::<Result<Vec<_>>>()?,
        };
        Ok(Self {
            layers,
            keep_out_tracks: keep_out("tracks")?,
            keep_out_vias: keep_out("vias")?,
            keep_out_pads: keep_out("pads")?,
            keep_out_copper_pour: keep_out("copperpour")?,
            keep_out_footprints: keep_out("footprints")?,
            polygon: points(node.child("polygon/pts")?)?,
        })
    }
}

impl FootprintModel {
    pub fn parse(node: &Sexpr, _log: &MessageLogger) -> Result<Self> {
        let offset = match node.try_child("at/xyz") {
            Some(at) => vec3(at)?,
            None => vec3(node.child("offset/xyz")?)?,
        };
        Ok(Self {
            path: node.child("@0")?.value()?.to_string(),
            offset,
            scale: vec3(node.child("scale/xyz")?)?,
            rotate: vec3(node.child("rotate/xyz")?)?,
        })
    }
}

impl KicadFootprint {
    /// Parse a `.kicad_mod` file
    pub fn parse(path: &Path, log: &MessageLogger) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::parse_str(&content, log)
    }

    /// Parse footprint content, `(module ...)` roots of old files included
    pub fn parse_str(content: &str, log: &MessageLogger) -> Result<Self> {
        let root = kicadimport_sexpr::parse(content)?;
        if !root.is_named("footprint") && !root.is_named("module") {
            bail_runtime!("File does not seem to be a KiCad footprint.");
        }

        let mut fp = KicadFootprint {
            name: root.child("@0")?.value()?.to_string(),
            version: -1,
            generator: String::new(),
            layer: KicadLayer::Unknown,
            description: String::new(),
            tags: String::new(),
            is_smd: false,
            is_through_hole: false,
            board_only: false,
            exclude_from_pos_files: false,
            exclude_from_bom: false,
            solder_mask_margin: 0.0,
            solder_paste_margin: 0.0,
            solder_paste_ratio: 0.0,
            clearance: 0.0,
            zone_connect: None,
            net_tie_pad_groups: Vec::new(),
            properties: Vec::new(),
            lines: Vec::new(),
            arcs: Vec::new(),
            circles: Vec::new(),
            rectangles: Vec::new(),
            polygons: Vec::new(),
            texts: Vec::new(),
            pads: Vec::new(),
            zones: Vec::new(),
            models: Vec::new(),
        };

        for child in root.lists() {
            let value = || child.child("@0");
            match child.name().unwrap_or_default() {
                "version" => fp.version = value()?.deserialize()?,
                "generator" => fp.generator = value()?.value()?.to_string(),
                "generator_version" | "group" | "embedded_fonts" => {}
                "layer" => fp.layer = KicadLayer::parse(value()?, log)?,
                "descr" => fp.description = value()?.value()?.to_string(),
                "tags" => fp.tags = value()?.value()?.to_string(),
                "attr" => {
                    fp.is_smd |= child.contains_token("smd");
                    fp.is_through_hole |= child.contains_token("through_hole");
                    fp.board_only |= child.contains_token("board_only");
                    fp.exclude_from_pos_files |= child.contains_token("exclude_from_pos_files");
                    fp.exclude_from_bom |= child.contains_token("exclude_from_bom");
                }
                "solder_mask_margin" => fp.solder_mask_margin = value()?.deserialize()?,
                "solder_paste_ratio" => fp.solder_paste_ratio = value()?.deserialize()?,
                "solder_paste_margin" => fp.solder_paste_margin = value()?.deserialize()?,
                "clearance" => fp.clearance = value()?.deserialize()?,
                "zone_connect" => fp.zone_connect = Some(ZoneConnect::parse(value()?, log)?),
                "net_tie_pad_groups" => {
                    for group in child.args().iter().filter_map(|a| a.as_str()) {
                        fp.net_tie_pad_groups.push(
                            group
                                .split(',')
                                .map(str::trim)
                                .filter(|p| !p.is_empty())
                                .map(str::to_string)
                                .collect(),
                        );
                    }
                }
                "property" => fp.properties.push(Property::parse(child, log)?),
                "fp_line" => fp.lines.push(FootprintLine::parse(child, log)?),
                "fp_arc" => fp.arcs.push(FootprintArc::parse(child, log)?),
                "fp_circle" => fp.circles.push(FootprintCircle::parse(child, log)?),
                "fp_rect" => fp.rectangles.push(FootprintRectangle::parse(child, log)?),
                "fp_poly" => fp.polygons.push(FootprintPolygon::parse(child, log)?),
                "fp_text" => fp.texts.push(FootprintText::parse(child, log)?),
                "zone" => fp.zones.push(Zone::parse(child, log)?),
                "pad" => fp.pads.push(FootprintPad::parse(child, log)?),
                "model" => fp.models.push(FootprintModel::parse(child, log)?),
                other => log.warning(format!("Unsupported footprint child: '{}'", other)),
            }
        }
        Ok(fp)
    }

    pub fn property(&self, key: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.key == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kicad::{PadShape, PadType};

    const R_0603: &str = r#"(footprint "R_0603_1608Metric" (version 20240108) (generator "pcbnew")
  (layer "F.Cu")
  (descr "Resistor SMD 0603 (1608 Metric)")
  (tags "resistor")
  (property "Reference" "REF**" (at 0 -1.43 0) (layer "F.SilkS")
    (effects (font (size 1 1) (thickness 0.15))))
  (property "Value" "R_0603_1608Metric" (at 0 1.43 0) (layer "F.Fab")
    (effects (font (size 1 1) (thickness 0.15))))
  (attr smd)
  (fp_line (start -0.237258 -0.5225) (end 0.237258 -0.5225)
    (stroke (width 0.12) (type solid)) (layer "F.SilkS"))
  (fp_rect (start -1.48 -0.73) (end 1.48 0.73)
    (stroke (width 0.05) (type solid)) (fill none) (layer "F.CrtYd"))
  (fp_text user "${REFERENCE}" (at 0 0 0) (layer "F.Fab")
    (effects (font (size 0.4 0.4) (thickness 0.06))))
  (pad "1" smd roundrect (at -0.825 0) (size 0.8 0.95) (layers "F.Cu" "F.Paste" "F.Mask")
    (roundrect_rratio 0.25))
  (pad "2" smd roundrect (at 0.825 0) (size 0.8 0.95) (layers "F.Cu" "F.Paste" "F.Mask")
    (roundrect_rratio 0.25))
  (model "${KICAD8_3DMODEL_DIR}/Resistor_SMD.3dshapes/R_0603_1608Metric.wrl"
    (offset (xyz 0 0 0)) (scale (xyz 1 1 1)) (rotate (xyz 0 0 0))))
"#;

    #[test]
    fn test_parse_footprint() {
        let log = MessageLogger::new();
        let fp = KicadFootprint::parse_str(R_0603, &log).unwrap();
        assert!(log.messages().is_empty(), "{:?}", log.messages());
        assert_eq!(fp.name, "R_0603_1608Metric");
        assert_eq!(fp.version, 20240108);
        assert_eq!(fp.layer, KicadLayer::FrontCopper);
        assert!(fp.is_smd);
        assert!(!fp.is_through_hole);
        assert_eq!(fp.property("Reference").map(|p| p.value.as_str()), Some("REF**"));
        assert_eq!(fp.lines.len(), 1);
        assert_eq!(fp.lines[0].layer, KicadLayer::FrontSilkscreen);
        assert_eq!(fp.rectangles[0].fill_type, FootprintFillType::None);
        assert_eq!(fp.texts[0].text_type, TextType::User);
        assert_eq!(fp.texts[0].text, "${REFERENCE}");
        assert_eq!(fp.pads.len(), 2);
        assert_eq!(fp.pads[1].pad_type, PadType::Smd);
        assert_eq!(fp.pads[1].shape, PadShape::RoundRect);
        assert_eq!(fp.models.len(), 1);
        assert_eq!(fp.models[0].scale, Vec3::new(1.0, 1.0, 1.0));
    }

    #[test]
    fn test_parse_zone() {
        let log = MessageLogger::new();
        let node = kicadimport_sexpr::parse(
            r#"(zone (net 0) (net_name "") (layers "F.Cu" "B.Cu") (hatch edge 0.5)
                 (keepout (tracks not_allowed) (vias allowed) (pads allowed)
                          (copperpour not_allowed) (footprints maybe))
                 (polygon (pts (xy 0 0) (xy 1 0) (xy 1 1))))"#,
        )
        .unwrap();
        let zone = Zone::parse(&node, &log).unwrap();
        assert_eq!(zone.layers, vec![KicadLayer::FrontCopper, KicadLayer::BackCopper]);
        assert!(zone.keep_out_tracks);
        assert!(!zone.keep_out_vias);
        assert!(zone.keep_out_copper_pour);
        assert!(!zone.keep_out_footprints);
        assert_eq!(zone.polygon.len(), 3);
        assert_eq!(log.messages()[0].text, "Unknown keepout value: maybe");
    }

    #[test]
    fn test_old_module_root_and_unknown_child() {
        let log = MessageLogger::new();
        let fp = KicadFootprint::parse_str(
            r#"(module "X" (layer F.Cu) (fp_text reference "REF**" (at 0 0 unlocked) (layer F.SilkS)) (teardrop yes))"#,
            &log,
        )
        .unwrap();
        assert_eq!(fp.version, -1);
        assert!(fp.texts[0].unlocked);
        assert_eq!(log.messages()[0].text, "Unsupported footprint child: 'teardrop'");

        let err = KicadFootprint::parse_str("(kicad_symbol_lib)", &log).unwrap_err();
        assert_eq!(err.to_string(), "File does not seem to be a KiCad footprint.");
    }

    #[test]
    fn test_missing_layer_is_error() {
        let log = MessageLogger::new();
        let result = KicadFootprint::parse_str(
            r#"(footprint "X" (fp_line (start 0 0) (end 1 0) (stroke (width 0.1))))"#,
            &log,
        );
        assert!(result.is_err());
    }
}
