//! Geometry items shared by symbols and footprints

use super::Layer;
use crate::geometry::{Alignment, Angle, Path, Point};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    pub uuid: Uuid,
    pub layer: Layer,
    pub line_width: f64,
    pub fill: bool,
    pub grab_area: bool,
    pub path: Path,
}

impl Polygon {
    pub fn new(layer: Layer, line_width: f64, fill: bool, grab_area: bool, path: Path) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            layer,
            line_width,
            fill,
            grab_area,
            path,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub uuid: Uuid,
    pub layer: Layer,
    pub line_width: f64,
    pub fill: bool,
    pub grab_area: bool,
    pub center: Point,
    pub diameter: f64,
}

/// Symbol text (rendered with the schematic font)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Text {
    pub uuid: Uuid,
    pub layer: Layer,
    pub text: String,
    pub position: Point,
    pub rotation: Angle,
    pub height: f64,
    pub alignment: Alignment,
    pub locked: bool,
}

/// Footprint text (rendered with the stroke font)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrokeText {
    pub uuid: Uuid,
    pub layer: Layer,
    pub text: String,
    pub position: Point,
    pub rotation: Angle,
    pub height: f64,
    pub stroke_width: f64,
    pub alignment: Alignment,
    pub mirror: bool,
    /// Rotate to stay readable when the footprint is rotated
    pub auto_rotate: bool,
}

/// Copper layers a zone applies to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneLayers {
    pub top: bool,
    pub inner: bool,
    pub bottom: bool,
}

impl ZoneLayers {
    pub fn is_empty(&self) -> bool {
        !(self.top || self.inner || self.bottom)
    }
}

/// What a zone keeps out
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneRules {
    pub no_copper: bool,
    pub no_planes: bool,
    pub no_exposure: bool,
    pub no_devices: bool,
}

impl ZoneRules {
    pub fn is_empty(&self) -> bool {
        !(self.no_copper || self.no_planes || self.no_exposure || self.no_devices)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub uuid: Uuid,
    pub layers: ZoneLayers,
    pub rules: ZoneRules,
    /// Implicitly closed
    pub outline: Path,
}

/// Stop mask or solder paste opening of a pad or hole
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode", content = "offset")]
pub enum MaskConfig {
    Off,
    /// Use the design rules of the board
    Automatic,
    /// Fixed offset in millimeters (negative shrinks the opening)
    Manual(f64),
}

/// Non-plated hole
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hole {
    pub uuid: Uuid,
    pub diameter: f64,
    /// Single vertex for round holes, a line for slots
    pub path: Path,
    pub stop_mask: MaskConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_config_json() {
        assert_eq!(
            serde_json::to_string(&MaskConfig::Manual(0.1)).unwrap(),
            r#"{"mode":"manual","offset":0.1}"#
        );
        assert_eq!(serde_json::to_string(&MaskConfig::Off).unwrap(), r#"{"mode":"off"}"#);
        let parsed: MaskConfig = serde_json::from_str(r#"{"mode":"automatic"}"#).unwrap();
        assert_eq!(parsed, MaskConfig::Automatic);
    }
}
