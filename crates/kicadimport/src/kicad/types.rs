//! Enumerations and small value types shared by the KiCad symbol and
//! footprint models

use crate::geometry::{Alignment, HAlign, Point, VAlign};
use crate::{Error, MessageLogger, Result};
use kicadimport_sexpr::Sexpr;

/// A KiCad enumeration written as a bare keyword
///
/// Unknown keywords are not fatal: they produce a warning and map to the
/// `Unknown` variant so the converter can decide what to do with them.
pub trait Keyword: Sized + Copy {
    /// Human readable name used in warnings
    const WHAT: &'static str;
    const UNKNOWN: Self;

    fn from_keyword(keyword: &str) -> Option<Self>;

    fn parse(node: &Sexpr, log: &MessageLogger) -> Result<Self> {
        let value = node.value()?;
        Ok(Self::from_keyword(value).unwrap_or_else(|| {
            log.warning(format!("Unknown {}: {}", Self::WHAT, value));
            Self::UNKNOWN
        }))
    }
}

macro_rules! keyword_enum {
    (
        $(#[$meta:meta])*
        $name:ident($what:literal) {
            $($variant:ident => $($keyword:literal)|+),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            /// Keyword not recognized
            Unknown,
            $($variant),*
        }

        impl Keyword for $name {
            const WHAT: &'static str = $what;
            const UNKNOWN: Self = $name::Unknown;

            fn from_keyword(keyword: &str) -> Option<Self> {
                match keyword {
                    $($($keyword)|+ => Some($name::$variant),)*
                    _ => None,
                }
            }
        }
    };
}

keyword_enum! {
    /// Corner of a chamfered pad
    Edge("edge") {
        TopLeft => "top_left",
        TopRight => "top_right",
        BottomLeft => "bottom_left",
        BottomRight => "bottom_right",
    }
}

keyword_enum! {
    StrokeType("stroke type") {
        Dash => "dash",
        DashDot => "dash_dot",
        DashDotDot => "dash_dot_dot",
        Dot => "dot",
        Default => "default",
        Solid => "solid",
    }
}

keyword_enum! {
    /// Role of a footprint text
    TextType("text type") {
        Reference => "reference",
        Value => "value",
        User => "user",
    }
}

keyword_enum! {
    SymbolFillType("symbol fill type") {
        None => "none",
        Outline => "outline",
        Background => "background",
    }
}

keyword_enum! {
    /// Electrical type of a symbol pin
    PinType("pin type") {
        Input => "input",
        Output => "output",
        Bidirectional => "bidirectional",
        TriState => "tri_state",
        Passive => "passive",
        Free => "free",
        Unspecified => "unspecified",
        PowerIn => "power_in",
        PowerOut => "power_out",
        OpenCollector => "open_collector",
        OpenEmitter => "open_emitter",
        NoConnect => "no_connect",
    }
}

keyword_enum! {
    /// Graphical style of a symbol pin
    PinStyle("pin shape") {
        Line => "line",
        Inverted => "inverted",
        Clock => "clock",
        InvertedClock => "inverted_clock",
        InputLow => "input_low",
        ClockLow => "clock_low",
        OutputLow => "output_low",
        EdgeClockHigh => "edge_clock_high",
        NonLogic => "non_logic",
    }
}

keyword_enum! {
    /// Fill of footprint graphics (`yes`/`no` since KiCad 9)
    FootprintFillType("footprint fill type") {
        None => "no" | "none",
        Solid => "yes" | "solid",
    }
}

keyword_enum! {
    PadType("pad type") {
        ThruHole => "thru_hole",
        Smd => "smd",
        Connect => "connect",
        NpThruHole => "np_thru_hole",
    }
}

keyword_enum! {
    PadShape("pad shape") {
        Circle => "circle",
        Rect => "rect",
        Oval => "oval",
        Trapezoid => "trapezoid",
        RoundRect => "roundrect",
        Custom => "custom",
    }
}

keyword_enum! {
    /// Anchor shape of a custom pad
    CustomPadAnchor("custom pad anchor") {
        Circle => "circle",
        Rect => "rect",
    }
}

keyword_enum! {
    /// Fabrication property of a pad
    PadProperty("pad property") {
        Bga => "pad_prop_bga",
        FiducialGlobal => "pad_prop_fiducial_glob",
        FiducialLocal => "pad_prop_fiducial_loc",
        Testpoint => "pad_prop_testpoint",
        Heatsink => "pad_prop_heatsink",
        Castellated => "pad_prop_castellated",
    }
}

keyword_enum! {
    ZoneConnect("zone connect") {
        NoConnect => "0",
        ThermalReliefs => "1",
        Solid => "2",
    }
}

/// A KiCad board layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KicadLayer {
    Unknown,
    /// `*.Cu`
    AllCopper,
    /// `*.Mask`
    AllSolderMask,
    /// `*.SilkS`
    AllSilkscreen,
    /// `F&B.Cu`
    FrontAndBackCopper,
    FrontAdhesion,
    FrontCopper,
    FrontCourtyard,
    FrontFabrication,
    FrontPaste,
    FrontSilkscreen,
    FrontSolderMask,
    /// `In1.Cu` to `In30.Cu`
    InnerCopper(u8),
    BackAdhesion,
    BackCopper,
    BackCourtyard,
    BackFabrication,
    BackPaste,
    BackSilkscreen,
    BackSolderMask,
    /// `Edge.Cuts`
    BoardOutline,
    UserComment,
    UserDrawing,
    /// `User.1` to `User.9`
    User(u8),
}

impl Keyword for KicadLayer {
    const WHAT: &'static str = "layer";
    const UNKNOWN: Self = KicadLayer::Unknown;

    fn from_keyword(keyword: &str) -> Option<Self> {
        use KicadLayer::*;
        let layer = match keyword {
            "*.Cu" => AllCopper,
            "*.Mask" => AllSolderMask,
            "*.SilkS" => AllSilkscreen,
            "F&B.Cu" => FrontAndBackCopper,
            "F.Adhes" => FrontAdhesion,
            "F.Cu" => FrontCopper,
            "F.CrtYd" => FrontCourtyard,
            "F.Fab" => FrontFabrication,
            "F.Paste" => FrontPaste,
            "F.SilkS" => FrontSilkscreen,
            "F.Mask" => FrontSolderMask,
            "B.Adhes" => BackAdhesion,
            "B.Cu" => BackCopper,
            "B.CrtYd" => BackCourtyard,
            "B.Fab" => BackFabrication,
            "B.Paste" => BackPaste,
            "B.SilkS" => BackSilkscreen,
            "B.Mask" => BackSolderMask,
            "Edge.Cuts" => BoardOutline,
            "Cmts.User" => UserComment,
            "Dwgs.User" => UserDrawing,
            _ => {
                if let Some(n) = keyword
                    .strip_prefix("In")
                    .and_then(|s| s.strip_suffix(".Cu"))
                {
                    return n
                        .parse::<u8>()
                        .ok()
                        .filter(|n| (1..=30).contains(n))
                        .map(InnerCopper);
                }
                return keyword
                    .strip_prefix("User.")
                    .and_then(|n| n.parse::<u8>().ok())
                    .filter(|n| (1..=9).contains(n))
                    .map(User);
            }
        };
        Some(layer)
    }
}

// =============================================================================
// Value types
// =============================================================================

/// Width and height pair
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// Three dimensional vector of 3D model placements
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// A key/value property of a symbol or footprint
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Property {
    pub key: String,
    pub value: String,
    pub position: Point,
    pub rotation: f64,
    /// Empty if not set
    pub layer: String,
    pub font_size: Size,
    pub font_thickness: f64,
    pub alignment: Alignment,
    pub mirror: bool,
    pub unlocked: bool,
    pub hide: bool,
}

impl Property {
    pub fn parse(node: &Sexpr, _log: &MessageLogger) -> Result<Self> {
        let mut obj = Property {
            key: node.child("@0")?.value()?.to_string(),
            value: node.child("@1")?.value()?.to_string(),
            position: point(node.child("at")?)?,
            ..Default::default()
        };
        if let Some(child) = node.try_child("at/@2") {
            if child.value()? == "unlocked" {
                obj.unlocked = true;
            } else {
                obj.rotation = child.deserialize()?;
            }
        }
        if let Some(child) = node.try_child("layer/@0") {
            obj.layer = child.value()?.to_string();
        }
        read_font(node, &mut obj.font_size, &mut obj.font_thickness)?;
        if let Some(justify) = node.try_child("effects/justify") {
            obj.alignment = alignment(justify);
            obj.mirror = justify.contains_token("mirror");
        }
        if let Some(child) = node.try_child("unlocked/@0") {
            obj.unlocked = child.value()? == "yes";
        }
        if let Some(child) = node.try_child("effects/hide/@0") {
            obj.hide = yes_no(child)?;
        }
        Ok(obj)
    }
}

// =============================================================================
// Helpers
// =============================================================================

pub(crate) fn point(node: &Sexpr) -> Result<Point> {
    Ok(Point::new(
        node.child("@0")?.deserialize()?,
        node.child("@1")?.deserialize()?,
    ))
}

pub(crate) fn points(node: &Sexpr) -> Result<Vec<Point>> {
    node.children_named("xy").map(point).collect()
}

pub(crate) fn size(node: &Sexpr) -> Result<Size> {
    Ok(Size::new(
        node.child("@0")?.deserialize()?,
        node.child("@1")?.deserialize()?,
    ))
}

pub(crate) fn vec3(node: &Sexpr) -> Result<Vec3> {
    Ok(Vec3::new(
        node.child("@0")?.deserialize()?,
        node.child("@1")?.deserialize()?,
        node.child("@2")?.deserialize()?,
    ))
}

/// Strict `yes`/`no` boolean
pub(crate) fn yes_no(node: &Sexpr) -> Result<bool> {
    match node.value()? {
        "yes" => Ok(true),
        "no" => Ok(false),
        other => Err(Error::runtime(format!("Invalid bool: {}", other))),
    }
}

pub(crate) fn alignment(justify: &Sexpr) -> Alignment {
    let h = if justify.contains_token("left") {
        HAlign::Left
    } else if justify.contains_token("right") {
        HAlign::Right
    } else {
        HAlign::Center
    };
    let v = if justify.contains_token("top") {
        VAlign::Top
    } else if justify.contains_token("bottom") {
        VAlign::Bottom
    } else {
        VAlign::Center
    };
    Alignment { h, v }
}

/// Stroke width from `(width w)` (KiCad 6) or `(stroke (width w))`
pub(crate) fn stroke_width(node: &Sexpr) -> Result<f64> {
    match node.try_child("width/@0") {
        Some(width) => Ok(width.deserialize()?),
        None => Ok(node.child("stroke/width/@0")?.deserialize()?),
    }
}

pub(crate) fn stroke_type(node: &Sexpr, log: &MessageLogger) -> Result<StrokeType> {
    match node.try_child("stroke/type/@0") {
        Some(child) => StrokeType::parse(child, log),
        None => Ok(StrokeType::Solid),
    }
}

pub(crate) fn read_font(node: &Sexpr, font_size: &mut Size, thickness: &mut f64) -> Result<()> {
    if let Some(child) = node.try_child("effects/font/size") {
        *font_size = size(child)?;
    }
    if let Some(child) = node.try_child("effects/font/thickness/@0") {
        *thickness = child.deserialize()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_keywords() {
        assert_eq!(KicadLayer::from_keyword("F.Cu"), Some(KicadLayer::FrontCopper));
        assert_eq!(KicadLayer::from_keyword("In12.Cu"), Some(KicadLayer::InnerCopper(12)));
        assert_eq!(KicadLayer::from_keyword("In31.Cu"), None);
        assert_eq!(KicadLayer::from_keyword("User.9"), Some(KicadLayer::User(9)));
        assert_eq!(KicadLayer::from_keyword("User.10"), None);
        assert_eq!(KicadLayer::from_keyword("F&B.Cu"), Some(KicadLayer::FrontAndBackCopper));
    }

    #[test]
    fn test_unknown_keyword_warns() {
        let log = MessageLogger::new();
        let node = kicadimport_sexpr::parse("(type sideways)").unwrap();
        let pin_type = PinType::parse(node.child("@0").unwrap(), &log).unwrap();
        assert_eq!(pin_type, PinType::Unknown);
        assert_eq!(log.messages()[0].text, "Unknown pin type: sideways");

        let node = kicadimport_sexpr::parse("(fill yes)").unwrap();
        let fill = FootprintFillType::parse(node.child("@0").unwrap(), &log).unwrap();
        assert_eq!(fill, FootprintFillType::Solid);
    }

    #[test]
    fn test_parse_property() {
        let log = MessageLogger::new();
        let node = kicadimport_sexpr::parse(
            r#"(property "Reference" "R" (at 2.032 0 90) (layer "F.SilkS")
                 (effects (font (size 1.27 1.27) (thickness 0.15)) (justify left mirror) (hide yes)))"#,
        )
        .unwrap();
        let prop = Property::parse(&node, &log).unwrap();
        assert_eq!(prop.key, "Reference");
        assert_eq!(prop.value, "R");
        assert_eq!(prop.position, Point::new(2.032, 0.0));
        assert_eq!(prop.rotation, 90.0);
        assert_eq!(prop.layer, "F.SilkS");
        assert_eq!(prop.font_size, Size::new(1.27, 1.27));
        assert_eq!(prop.font_thickness, 0.15);
        assert_eq!(prop.alignment.h, HAlign::Left);
        assert!(prop.mirror);
        assert!(prop.hide);
        assert!(!prop.unlocked);

        let node = kicadimport_sexpr::parse(r#"(property "Value" "" (at 0 0 unlocked))"#).unwrap();
        let prop = Property::parse(&node, &log).unwrap();
        assert!(prop.unlocked);
        assert_eq!(prop.rotation, 0.0);
    }

    #[test]
    fn test_invalid_bool() {
        let node = kicadimport_sexpr::parse("(hide maybe)").unwrap();
        let err = yes_no(node.child("@0").unwrap()).unwrap_err();
        assert_eq!(err.to_string(), "Invalid bool: maybe");
    }
}
