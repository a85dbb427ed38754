//! Creation of library elements from parsed KiCad entities
//!
//! The converter remembers every element it created (or loaded from the
//! workspace) by provenance key, so components can refer to symbols and
//! devices to components and packages.

use super::geometry::{
    convert_footprint_arc, convert_footprint_circle, convert_footprint_line,
    convert_footprint_polygon, convert_footprint_property, convert_footprint_rectangle,
    convert_footprint_text, convert_footprint_zone, convert_symbol_arc, convert_symbol_circle,
    convert_symbol_polyline, convert_symbol_property, convert_symbol_rectangle,
    convert_symbol_text, group_lines_by_layer_and_width,
};
use super::metadata::{clean_component_prefix, clean_element_name, element_meta, find_property};
use super::pad::{convert_pad, PadDefaults};
use super::pins::{convert_symbol_pin, convert_symbol_pin_names};
use super::try_or_log;
use crate::geometry::{Angle, Point, TangentPathJoiner};
use crate::kicad::{KicadFootprint, KicadLayer, KicadSymbol, PinStyle, PinType, SymbolGate};
use crate::librepcb::{
    AssemblyType, Component, ComponentSignal, Device, Footprint, LibraryElement,
    Package, PackageModel, PackagePad, PadSignalMapItem, PinDisplayType, PinSignalMapItem,
    Polygon, SignalRole, Symbol, SymbolVariant, SymbolVariantItem,
};
use crate::store::{LibraryStore, WorkspaceLibraryDb};
use crate::{bail_logic, bail_runtime, Error, ImportSettings, MessageLogger, Result};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

const GATE_SUFFIXES: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Converts KiCad symbols and footprints to library elements
pub struct LibraryConverter<'a> {
    db: &'a dyn WorkspaceLibraryDb,
    settings: &'a ImportSettings,
    symbols: HashMap<String, Uuid>,
    symbol_pins: HashMap<(String, String), Uuid>,
    packages: HashMap<String, Uuid>,
    package_pads: HashMap<String, BTreeMap<String, Uuid>>,
    components: HashMap<String, Uuid>,
    component_signals: HashMap<(String, String), Uuid>,
}

impl<'a> LibraryConverter<'a> {
    pub fn new(db: &'a dyn WorkspaceLibraryDb, settings: &'a ImportSettings) -> Self {
        Self {
            db,
            settings,
            symbols: HashMap::new(),
            symbol_pins: HashMap::new(),
            packages: HashMap::new(),
            package_pads: HashMap::new(),
            components: HashMap::new(),
            component_signals: HashMap::new(),
        }
    }

    /// Package with a single "default" footprint
    ///
    /// `models` maps the model paths referenced by the footprint to STEP
    /// files found on disk; unmapped models are skipped.
    pub fn create_package(
        &mut self,
        lib_name: &str,
        fp: &KicadFootprint,
        generated_by: &str,
        models: &HashMap<String, PathBuf>,
        log: &MessageLogger,
    ) -> Result<Package> {
        if self.packages.contains_key(generated_by) {
            bail_logic!("Duplicate import.");
        }
        if fp.layer != KicadLayer::FrontCopper {
            bail_runtime!("Unsupported footprint board side.");
        }

        let exclude = fp.exclude_from_bom || fp.exclude_from_pos_files;
        let assembly_type = match (fp.is_smd, fp.is_through_hole) {
            _ if exclude => AssemblyType::None,
            (true, false) => AssemblyType::Smt,
            (false, true) => AssemblyType::Tht,
            (true, true) => AssemblyType::Mixed,
            (false, false) => AssemblyType::Auto,
        };
        let mut package = Package {
            meta: element_meta(
                self.settings,
                lib_name,
                &fp.name,
                &fp.properties,
                generated_by,
                &self.settings.package_categories,
            ),
            assembly_type,
            pads: Vec::new(),
            models: Vec::new(),
            footprints: Vec::new(),
            attachments: BTreeMap::new(),
        };
        let mut footprint = Footprint::new("default");

        let mut lines = Vec::new();
        for line in &fp.lines {
            lines.extend(try_or_log(log, || convert_footprint_line(line)));
        }
        for arc in &fp.arcs {
            lines.extend(try_or_log(log, || convert_footprint_arc(arc)));
        }
        let joiner = TangentPathJoiner::new(Duration::from_millis(
            self.settings.joiner_timeout_ms(generated_by),
        ));
        let mut timed_out = false;
        for group in group_lines_by_layer_and_width(&lines) {
            let paths = joiner.join(&group.paths).unwrap_or_else(|| {
                timed_out = true;
                group.paths.clone()
            });
            footprint.polygons.extend(
                paths
                    .into_iter()
                    .map(|path| Polygon::new(group.layer, group.width, false, false, path)),
            );
        }
        if timed_out {
            log.info(
                "Aborted joining tangent line segments to polygons due to timeout, \
                 keeping them separate.",
            );
        }

        for circle in &fp.circles {
            footprint
                .circles
                .extend(try_or_log(log, || convert_footprint_circle(circle)));
        }
        for rect in &fp.rectangles {
            footprint
                .polygons
                .extend(try_or_log(log, || convert_footprint_rectangle(rect)));
        }
        for polygon in &fp.polygons {
            footprint
                .polygons
                .extend(try_or_log(log, || convert_footprint_polygon(polygon)));
        }
        footprint
            .stroke_texts
            .extend(fp.properties.iter().filter_map(convert_footprint_property));
        for text in &fp.texts {
            footprint
                .stroke_texts
                .extend(try_or_log(log, || convert_footprint_text(text)).flatten());
        }
        footprint.zones.extend(
            fp.zones
                .iter()
                .filter_map(|zone| convert_footprint_zone(zone, log)),
        );

        let defaults = PadDefaults::from(fp);
        for kicad_pad in &fp.pads {
            let Some(converted) = try_or_log(log, || convert_pad(kicad_pad, &defaults, log))
            else {
                continue;
            };
            if let Some(mut pad) = converted.pad {
                let mut package_pad = package.pad(&kicad_pad.number).map(|p| p.uuid);
                if package_pad.is_none() && !kicad_pad.number.is_empty() {
                    package.pads.push(PackagePad {
                        uuid: pad.uuid,
                        name: kicad_pad.number.clone(),
                    });
                    self.package_pads
                        .entry(generated_by.to_string())
                        .or_default()
                        .insert(kicad_pad.number.clone(), pad.uuid);
                    package_pad = Some(pad.uuid);
                }
                pad.package_pad = package_pad;
                footprint.pads.push(pad);
            }
            footprint.holes.extend(converted.hole);
            footprint.polygons.extend(converted.polygons);
        }

        for model in &fp.models {
            let Some(path) = models.get(&model.path) else {
                continue;
            };
            let added = try_or_log(log, || {
                let content = std::fs::read(path).map_err(|e| Error::io(path, e))?;
                let stem = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let model_element = PackageModel {
                    uuid: Uuid::new_v4(),
                    name: clean_element_name(&stem),
                };
                package
                    .attachments
                    .insert(model_element.file_name(), content);
                Ok(model_element)
            });
            let Some(model_element) = added else {
                continue;
            };
            footprint.model_position = [model.offset.x, model.offset.y, model.offset.z];
            footprint.model_rotation = [model.rotate.x, model.rotate.y, -model.rotate.z];
            if model.scale.x == 1.0 && model.scale.y == 1.0 && model.scale.z == 1.0 {
                footprint.models = BTreeSet::from([model_element.uuid]);
            } else {
                log.warning("Scale factor on 3D model is not supported, will be ignored.");
            }
            package.models.push(model_element);
        }

        package.footprints.push(footprint);
        self.packages
            .insert(generated_by.to_string(), package.meta.uuid);
        self.package_pads.entry(generated_by.to_string()).or_default();
        Ok(package)
    }

    /// Symbol of a single gate
    pub fn create_symbol(
        &mut self,
        lib_name: &str,
        sym: &KicadSymbol,
        gate: &SymbolGate,
        generated_by: &str,
        log: &MessageLogger,
    ) -> Result<Symbol> {
        if self.symbols.contains_key(generated_by) {
            bail_logic!("Duplicate import.");
        }
        let mut symbol = Symbol {
            meta: element_meta(
                self.settings,
                lib_name,
                &gate.name,
                &sym.properties,
                generated_by,
                &self.settings.symbol_categories,
            ),
            pins: Vec::new(),
            polygons: Vec::new(),
            circles: Vec::new(),
            texts: Vec::new(),
        };

        symbol.polygons.extend(gate.arcs.iter().map(convert_symbol_arc));
        for circle in &gate.circles {
            symbol
                .circles
                .extend(try_or_log(log, || convert_symbol_circle(circle)));
        }
        symbol
            .polygons
            .extend(gate.rectangles.iter().map(convert_symbol_rectangle));
        for polyline in &gate.polylines {
            symbol
                .polygons
                .extend(try_or_log(log, || convert_symbol_polyline(polyline)));
        }
        symbol.texts.extend(gate.texts.iter().map(convert_symbol_text));
        symbol
            .texts
            .extend(sym.properties.iter().filter_map(convert_symbol_property));

        for (pin, (name, _)) in gate.pins.iter().zip(convert_symbol_pin_names(&gate.pins)) {
            if name.is_empty() {
                continue;
            }
            let converted = convert_symbol_pin(pin, &name, sym.pin_names_offset);
            self.symbol_pins
                .insert((generated_by.to_string(), name), converted.uuid);
            symbol.pins.push(converted);
        }

        self.symbols
            .insert(generated_by.to_string(), symbol.meta.uuid);
        Ok(symbol)
    }

    /// Component with one symbol variant containing all gates
    ///
    /// `symbols_generated_by` holds the provenance key of each gate's symbol.
    /// Symbols not created by this converter are loaded from the workspace.
    pub fn create_component(
        &mut self,
        lib_name: &str,
        sym: &KicadSymbol,
        gates: &[SymbolGate],
        generated_by: &str,
        symbols_generated_by: &[String],
    ) -> Result<Component> {
        if gates.len() != symbols_generated_by.len() {
            bail_logic!(
                "Got {} gates but {} symbols.",
                gates.len(),
                symbols_generated_by.len()
            );
        }
        if self.components.contains_key(generated_by) {
            bail_logic!("Duplicate import.");
        }
        for key in symbols_generated_by {
            if !self.symbols.contains_key(key) {
                self.load_already_imported_symbol(key)?;
            }
        }

        let mut component = Component {
            meta: element_meta(
                self.settings,
                lib_name,
                &sym.name,
                &sym.properties,
                generated_by,
                &self.settings.component_categories,
            ),
            schematic_only: !sym.on_board,
            default_value: "{{ MPN or DEVICE }}".to_string(),
            prefix: find_property(&sym.properties, "reference")
                .map(|p| clean_component_prefix(&p.value))
                .unwrap_or_default(),
            signals: Vec::new(),
            symbol_variants: Vec::new(),
        };
        let mut variant = SymbolVariant {
            uuid: Uuid::new_v4(),
            norm: String::new(),
            name: "default".to_string(),
            description: String::new(),
            items: Vec::new(),
        };

        let add_suffixes = gates.len() > 1;
        for (i, (gate, symbol_key)) in gates.iter().zip(symbols_generated_by).enumerate() {
            let Some(&symbol_uuid) = self.symbols.get(symbol_key) else {
                bail_logic!("Symbol '{}' not loaded.", symbol_key);
            };
            let mut item = SymbolVariantItem {
                uuid: Uuid::new_v4(),
                symbol: symbol_uuid,
                position: Point::default(),
                rotation: Angle::ZERO,
                required: true,
                suffix: if add_suffixes {
                    GATE_SUFFIXES.chars().nth(i).map(String::from).unwrap_or_default()
                } else {
                    String::new()
                },
                pins: Vec::new(),
            };

            for (pin, (name, _)) in gate.pins.iter().zip(convert_symbol_pin_names(&gate.pins)) {
                if name.is_empty() {
                    continue;
                }
                let signal = ComponentSignal {
                    uuid: Uuid::new_v4(),
                    name: name.clone(),
                    role: signal_role(pin.pin_type),
                    forced_net: String::new(),
                    required: false,
                    negated: matches!(pin.style, PinStyle::Inverted | PinStyle::InvertedClock),
                    clock: matches!(
                        pin.style,
                        PinStyle::Clock
                            | PinStyle::ClockLow
                            | PinStyle::EdgeClockHigh
                            | PinStyle::InvertedClock
                    ),
                };
                let Some(&pin_uuid) = self.symbol_pins.get(&(symbol_key.clone(), name.clone()))
                else {
                    bail_runtime!("Pin '{}' not found in symbol.", name);
                };
                item.pins.push(PinSignalMapItem {
                    pin: pin_uuid,
                    signal: Some(signal.uuid),
                    display: PinDisplayType::ComponentSignal,
                });
                self.component_signals
                    .insert((generated_by.to_string(), name), signal.uuid);
                component.signals.push(signal);
            }
            variant.items.push(item);
        }
        component.symbol_variants.push(variant);

        self.components
            .insert(generated_by.to_string(), component.meta.uuid);
        Ok(component)
    }

    /// Device connecting each package pad to the signal of the pin with the
    /// same number
    pub fn create_device(
        &mut self,
        lib_name: &str,
        sym: &KicadSymbol,
        gates: &[SymbolGate],
        generated_by: &str,
        component_generated_by: &str,
        package_generated_by: &str,
    ) -> Result<Device> {
        if !self.components.contains_key(component_generated_by) {
            self.load_already_imported_component(component_generated_by)?;
        }
        let Some(&component) = self.components.get(component_generated_by) else {
            bail_logic!("Component '{}' not loaded.", component_generated_by);
        };
        if !self.packages.contains_key(package_generated_by) {
            self.load_already_imported_package(package_generated_by)?;
        }
        let Some(&package) = self.packages.get(package_generated_by) else {
            bail_logic!("Package '{}' not loaded.", package_generated_by);
        };

        let pin_names: Vec<(String, Vec<String>)> = gates
            .iter()
            .flat_map(|gate| convert_symbol_pin_names(&gate.pins))
            .collect();
        let mut connected: BTreeSet<&str> = BTreeSet::new();
        let mut pads = Vec::new();
        if let Some(package_pads) = self.package_pads.get(package_generated_by) {
            for (pad_name, &pad_uuid) in package_pads {
                let mut signal = None;
                for (pin_name, numbers) in &pin_names {
                    if numbers.contains(pad_name) {
                        signal = self
                            .component_signals
                            .get(&(component_generated_by.to_string(), pin_name.clone()))
                            .copied();
                        connected.insert(pad_name.as_str());
                    }
                }
                pads.push(PadSignalMapItem {
                    pad: pad_uuid,
                    signal,
                });
            }
        }

        for number in pin_names.iter().flat_map(|(_, numbers)| numbers) {
            if !connected.contains(number.as_str()) {
                bail_runtime!("Pad '{}' not found in imported package.", number);
            }
        }

        Ok(Device {
            meta: element_meta(
                self.settings,
                lib_name,
                &sym.name,
                &sym.properties,
                generated_by,
                &self.settings.device_categories,
            ),
            component,
            package,
            pads,
        })
    }

    fn load_already_imported_symbol(&mut self, generated_by: &str) -> Result<()> {
        let symbol: Symbol = self.load_already_imported(generated_by)?;
        for pin in &symbol.pins {
            self.symbol_pins
                .insert((generated_by.to_string(), pin.name.clone()), pin.uuid);
        }
        self.symbols
            .insert(generated_by.to_string(), symbol.meta.uuid);
        Ok(())
    }

    fn load_already_imported_package(&mut self, generated_by: &str) -> Result<()> {
        let package: Package = self.load_already_imported(generated_by)?;
        let pads = self.package_pads.entry(generated_by.to_string()).or_default();
        for pad in &package.pads {
            pads.insert(pad.name.clone(), pad.uuid);
        }
        self.packages
            .insert(generated_by.to_string(), package.meta.uuid);
        Ok(())
    }

    fn load_already_imported_component(&mut self, generated_by: &str) -> Result<()> {
        let component: Component = self.load_already_imported(generated_by)?;
        for signal in &component.signals {
            self.component_signals
                .insert((generated_by.to_string(), signal.name.clone()), signal.uuid);
        }
        self.components
            .insert(generated_by.to_string(), component.meta.uuid);
        Ok(())
    }

    /// Open the newest workspace element generated from `generated_by`
    fn load_already_imported<E: LibraryElement>(&self, generated_by: &str) -> Result<E> {
        for uuid in self.db.generated(E::KIND, generated_by)? {
            if let Some(dir) = self.db.latest(E::KIND, uuid)? {
                return LibraryStore::open(&dir);
            }
        }
        bail_runtime!(
            "Dependent {} '{}' not found.",
            E::KIND.long_name(),
            generated_by.replace("KiCadImport::", "").replace("::", ":")
        );
    }
}

fn signal_role(pin_type: PinType) -> SignalRole {
    match pin_type {
        PinType::Input => SignalRole::Input,
        PinType::Output => SignalRole::Output,
        PinType::Bidirectional => SignalRole::Inout,
        PinType::PowerIn | PinType::PowerOut => SignalRole::Power,
        PinType::OpenCollector => SignalRole::Opendrain,
        _ => SignalRole::Passive,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kicad::KicadSymbolLibrary;
    use crate::store::FsLibraryDb;
    use crate::Severity;

    const RESISTOR_LIB: &str = r#"(kicad_symbol_lib (version 20231120) (generator "kicad_symbol_editor")
  (symbol "R" (pin_numbers hide) (pin_names (offset 0)) (in_bom yes) (on_board yes)
    (property "Reference" "R" (at 2.032 0 90) (effects (font (size 1.27 1.27))))
    (property "Value" "R" (at 0 0 90) (effects (font (size 1.27 1.27))))
    (property "Footprint" "Resistor_SMD:R_0603_1608Metric" (at 0 0 0) (effects (font (size 1.27 1.27)) (hide yes)))
    (symbol "R_0_1"
      (rectangle (start -1.016 -2.54) (end 1.016 2.54)
        (stroke (width 0.254) (type default)) (fill (type none))))
    (symbol "R_1_1"
      (pin passive line (at 0 3.81 270) (length 1.27) (name "~" (effects (font (size 1.27 1.27)))) (number "1" (effects (font (size 1.27 1.27)))))
      (pin passive line (at 0 -3.81 90) (length 1.27) (name "~" (effects (font (size 1.27 1.27)))) (number "2" (effects (font (size 1.27 1.27))))))))
"#;

    const R_0603: &str = r#"(footprint "R_0603_1608Metric" (version 20240108) (generator "pcbnew")
  (layer "F.Cu")
  (property "Reference" "REF**" (at 0 -1.43 0) (layer "F.SilkS") (effects (font (size 1 1) (thickness 0.15))))
  (property "Value" "R_0603_1608Metric" (at 0 1.43 0) (layer "F.Fab") (effects (font (size 1 1) (thickness 0.15))))
  (attr smd)
  (fp_line (start -0.237258 -0.5225) (end 0.237258 -0.5225) (stroke (width 0.12) (type solid)) (layer "F.SilkS"))
  (fp_line (start -0.237258 0.5225) (end 0.237258 0.5225) (stroke (width 0.12) (type solid)) (layer "F.SilkS"))
  (pad "1" smd roundrect (at -0.825 0) (size 0.8 0.95) (layers "F.Cu" "F.Paste" "F.Mask") (roundrect_rratio 0.25))
  (pad "2" smd roundrect (at 0.825 0) (size 0.8 0.95) (layers "F.Cu" "F.Paste" "F.Mask") (roundrect_rratio 0.25)))
"#;

    fn merged_gates(sym: &KicadSymbol) -> Vec<SymbolGate> {
        crate::pipeline::merge_symbol_gates(sym)
    }

    #[test]
    fn test_convert_resistor() {
        let log = MessageLogger::new();
        let settings = ImportSettings::default();
        let db = FsLibraryDb::new(Vec::new());
        let mut converter = LibraryConverter::new(&db, &settings);

        let fp = KicadFootprint::parse_str(R_0603, &log).unwrap();
        let pkg_key = "KiCadImport::Resistor_SMD::R_0603_1608Metric";
        let package = converter
            .create_package("Resistor_SMD", &fp, pkg_key, &HashMap::new(), &log)
            .unwrap();
        assert_eq!(package.assembly_type, AssemblyType::Smt);
        assert_eq!(package.pads.len(), 2);
        let footprint = &package.footprints[0];
        assert_eq!(footprint.name, "default");
        assert_eq!(footprint.pads.len(), 2);
        assert_eq!(footprint.pads[0].package_pad, Some(package.pads[0].uuid));
        assert_eq!(footprint.stroke_texts.len(), 2);
        assert_eq!(
            package.meta.description,
            "Imported from KiCad (Resistor_SMD:R_0603_1608Metric)."
        );

        let lib = KicadSymbolLibrary::parse_str(RESISTOR_LIB, &log).unwrap();
        let sym = &lib.symbols[0];
        let gates = merged_gates(sym);
        assert_eq!(gates.len(), 1);
        let sym_key = "KiCadImport::Device::R::1".to_string();
        let symbol = converter
            .create_symbol("Device", sym, &gates[0], &sym_key, &log)
            .unwrap();
        let pin_names: Vec<&str> = symbol.pins.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(pin_names, vec!["1", "2"]);
        assert_eq!(symbol.polygons.len(), 1);

        let component = converter
            .create_component("Device", sym, &gates, "KiCadImport::Device::R", &[sym_key])
            .unwrap();
        assert_eq!(component.prefix, "R");
        assert!(!component.schematic_only);
        assert_eq!(component.signals.len(), 2);
        assert_eq!(component.symbol_variants[0].items[0].suffix, "");
        assert_eq!(component.symbol_variants[0].items[0].pins.len(), 2);

        let device = converter
            .create_device(
                "Device",
                sym,
                &gates,
                "KiCadImport::Device::R",
                "KiCadImport::Device::R",
                pkg_key,
            )
            .unwrap();
        assert_eq!(device.component, component.meta.uuid);
        assert_eq!(device.package, package.meta.uuid);
        assert_eq!(device.pads.len(), 2);
        assert!(device.pads.iter().all(|p| p.signal.is_some()));
        assert_eq!(log.count(Severity::Critical), 0, "{:?}", log.messages());
    }

    #[test]
    fn test_duplicate_package_import() {
        let log = MessageLogger::new();
        let settings = ImportSettings::default();
        let db = FsLibraryDb::new(Vec::new());
        let mut converter = LibraryConverter::new(&db, &settings);
        let fp = KicadFootprint::parse_str(R_0603, &log).unwrap();
        converter
            .create_package("Lib", &fp, "KiCadImport::Lib::R", &HashMap::new(), &log)
            .unwrap();
        let err = converter
            .create_package("Lib", &fp, "KiCadImport::Lib::R", &HashMap::new(), &log)
            .unwrap_err();
        assert!(err.is_logic());
        assert_eq!(err.to_string(), "Duplicate import.");
    }

    #[test]
    fn test_missing_dependency() {
        let log = MessageLogger::new();
        let settings = ImportSettings::default();
        let db = FsLibraryDb::new(Vec::new());
        let mut converter = LibraryConverter::new(&db, &settings);
        let lib = KicadSymbolLibrary::parse_str(RESISTOR_LIB, &log).unwrap();
        let sym = &lib.symbols[0];
        let gates = merged_gates(sym);
        let err = converter
            .create_device(
                "Device",
                sym,
                &gates,
                "KiCadImport::Device::R",
                "KiCadImport::Device::R",
                "KiCadImport::Resistor_SMD::R_0603",
            )
            .unwrap_err();
        assert_eq!(err.to_string(), "Dependent component 'Device:R' not found.");
    }

    #[test]
    fn test_loads_already_imported_package() {
        let log = MessageLogger::new();
        let settings = ImportSettings::default();
        let dir = tempfile::tempdir().unwrap();
        let pkg_key = "KiCadImport::Resistor_SMD::R_0603_1608Metric";
        {
            let db = FsLibraryDb::new(Vec::new());
            let mut converter = LibraryConverter::new(&db, &settings);
            let fp = KicadFootprint::parse_str(R_0603, &log).unwrap();
            let package = converter
                .create_package("Resistor_SMD", &fp, pkg_key, &HashMap::new(), &log)
                .unwrap();
            LibraryStore::new(dir.path()).save(&package).unwrap();
        }

        let db = FsLibraryDb::new([dir.path().to_path_buf()]);
        db.rescan();
        let mut converter = LibraryConverter::new(&db, &settings);
        let lib = KicadSymbolLibrary::parse_str(RESISTOR_LIB, &log).unwrap();
        let sym = &lib.symbols[0];
        let gates = merged_gates(sym);
        let sym_key = "KiCadImport::Device::R::1".to_string();
        converter
            .create_symbol("Device", sym, &gates[0], &sym_key, &log)
            .unwrap();
        converter
            .create_component("Device", sym, &gates, "KiCadImport::Device::R", &[sym_key])
            .unwrap();
        let device = converter
            .create_device(
                "Device",
                sym,
                &gates,
                "KiCadImport::Device::R",
                "KiCadImport::Device::R",
                pkg_key,
            )
            .unwrap();
        assert_eq!(device.pads.len(), 2);
    }

    #[test]
    fn test_pin_without_pad_fails() {
        let log = MessageLogger::new();
        let settings = ImportSettings::default();
        let db = FsLibraryDb::new(Vec::new());
        let mut converter = LibraryConverter::new(&db, &settings);
        let fp = KicadFootprint::parse_str(
            r#"(footprint "One" (layer "F.Cu")
                 (pad "1" smd rect (at 0 0) (size 1 1) (layers "F.Cu")))"#,
            &log,
        )
        .unwrap();
        converter
            .create_package("Lib", &fp, "KiCadImport::Lib::One", &HashMap::new(), &log)
            .unwrap();
        let lib = KicadSymbolLibrary::parse_str(RESISTOR_LIB, &log).unwrap();
        let sym = &lib.symbols[0];
        let gates = merged_gates(sym);
        let sym_key = "KiCadImport::Device::R::1".to_string();
        converter
            .create_symbol("Device", sym, &gates[0], &sym_key, &log)
            .unwrap();
        converter
            .create_component("Device", sym, &gates, "KiCadImport::Device::R", &[sym_key])
            .unwrap();
        let err = converter
            .create_device(
                "Device",
                sym,
                &gates,
                "KiCadImport::Device::R",
                "KiCadImport::Device::R",
                "KiCadImport::Lib::One",
            )
            .unwrap_err();
        assert_eq!(err.to_string(), "Pad '2' not found in imported package.");
    }
}
