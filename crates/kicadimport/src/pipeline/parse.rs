//! Parsing of the scanned libraries and detection of elements imported by a
//! previous run

use super::{
    generated_by, CheckState, FootprintEntry, GateEntry, PipelineResult, StageContext,
    SymbolEntry,
};
use crate::convert::find_property;
use crate::kicad::{GateStyle, KicadFootprint, KicadSymbol, KicadSymbolLibrary, SymbolGate};
use crate::librepcb::ElementKind;
use crate::store::WorkspaceLibraryDb;
use crate::ImportSettings;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Gates of a symbol as they are imported
///
/// Body styles other than the base style are dropped, declarations with the
/// same unit index are concatenated. The shared unit 0 is added to every
/// other unit and then removed, unless it is the only one. Gates are named
/// `<symbol>` or `<symbol>:<index>` if there are several.
pub fn merge_symbol_gates(sym: &KicadSymbol) -> Vec<SymbolGate> {
    let mut map: BTreeMap<i32, SymbolGate> = BTreeMap::new();
    for gate in &sym.gates {
        if !matches!(gate.style, GateStyle::Base | GateStyle::Common) {
            continue;
        }
        match map.entry(gate.index) {
            Entry::Occupied(mut e) => e.get_mut().absorb(gate),
            Entry::Vacant(e) => {
                e.insert(gate.clone());
            }
        }
    }

    if map.len() > 1 {
        if let Some(common) = map.remove(&0) {
            for gate in map.values_mut() {
                gate.absorb(&common);
            }
        }
    }

    let multiple = map.len() > 1;
    map.into_values()
        .map(|mut gate| {
            gate.name = if multiple {
                format!("{}:{}", sym.name, gate.index)
            } else {
                sym.name.clone()
            };
            gate.style = GateStyle::Base;
            gate
        })
        .collect()
}

/// Provenance key of the package a symbol refers to by its "Footprint"
/// property (`<lib>:<footprint>`), empty if there is none
fn package_generated_by(sym: &KicadSymbol) -> String {
    let footprint = find_property(&sym.properties, "footprint")
        .map(|p| p.value.trim())
        .unwrap_or_default();
    if footprint.is_empty() {
        return String::new();
    }
    let mut split = footprint.split(':');
    let lib = split.next().unwrap_or_default();
    let rest: Vec<&str> = split.collect();
    generated_by(lib, &rest)
}

fn is_already_imported(db: &dyn WorkspaceLibraryDb, kind: ElementKind, key: &str) -> bool {
    match db.generated(kind, key) {
        Ok(uuids) => !uuids.is_empty(),
        Err(e) => {
            log::error!("Failed to get imported elements: {}", e);
            false
        }
    }
}

fn symbol_entry(
    db: &dyn WorkspaceLibraryDb,
    lib_name: &str,
    sym: &KicadSymbol,
) -> SymbolEntry {
    let component_name = if sym.extends.is_empty() {
        &sym.name
    } else {
        &sym.extends
    };
    let cmp_generated_by = generated_by(lib_name, &[component_name]);
    let dev_generated_by = generated_by(lib_name, &[&sym.name]);
    let mut entry = SymbolEntry {
        name: sym.name.clone(),
        cmp_already_imported: is_already_imported(db, ElementKind::Component, &cmp_generated_by),
        dev_already_imported: is_already_imported(db, ElementKind::Device, &dev_generated_by),
        cmp_generated_by,
        dev_generated_by,
        pkg_generated_by: package_generated_by(sym),
        sym_already_imported: true,
        extends: sym.extends.clone(),
        gates: Vec::new(),
        sym_checked: CheckState::Checked,
        cmp_checked: CheckState::Checked,
        dev_checked: CheckState::Checked,
    };
    for gate in merge_symbol_gates(sym) {
        let key = generated_by(lib_name, &[sym.name.clone(), gate.index.to_string()]);
        let already_imported = is_already_imported(db, ElementKind::Symbol, &key);
        entry.sym_already_imported &= already_imported;
        entry.gates.push(GateEntry {
            index: gate.index,
            generated_by: key,
            already_imported,
        });
    }
    entry
}

/// Parse all scanned files and fill in the symbols and footprints
///
/// Waits for a running workspace library scan first, since the "already
/// imported" state depends on an up to date catalog.
pub fn parse(
    result: &mut PipelineResult,
    db: &dyn WorkspaceLibraryDb,
    settings: &ImportSettings,
    ctx: &StageContext,
) {
    let log = &ctx.log;
    if db.is_scan_in_progress() {
        log.info("Waiting for background library scan to finish...");
        while db.is_scan_in_progress() && !ctx.is_aborted() {
            std::thread::sleep(Duration::from_millis(settings.db_poll_interval_ms));
        }
    }

    let timer = Instant::now();
    log.info("Parsing libraries...");
    ctx.progress(5);

    let mut symbol_count = 0;
    let lib_count = result.symbol_libs.len();
    for (i, lib) in result.symbol_libs.iter_mut().enumerate() {
        lib.symbols.clear();
        if ctx.is_aborted() {
            break;
        }
        let lib_name = lib.name();
        let sym_log = log.child(&lib_name);
        match KicadSymbolLibrary::parse(&lib.file, &sym_log) {
            Ok(kicad_lib) => {
                for sym in &kicad_lib.symbols {
                    if !sym.extends.is_empty() && !sym.gates.is_empty() {
                        sym_log.critical(format!(
                            "Symbol '{}' extends another symbol and contains gates.",
                            sym.name
                        ));
                        continue;
                    } else if sym.extends.is_empty() && sym.gates.is_empty() {
                        sym_log.critical(format!(
                            "Symbol '{}' does not contain any gates.",
                            sym.name
                        ));
                        continue;
                    }
                    lib.symbols.push(symbol_entry(db, &lib_name, sym));
                    symbol_count += 1;
                }
            }
            Err(e) => sym_log.critical(format!(
                "Failed to parse symbol library '{}': {}",
                super::result::file_name(&lib.file),
                e
            )),
        }
        ctx.progress(5 + 45 * (i + 1) / lib_count);
    }

    let mut footprint_count = 0;
    let lib_count = result.footprint_libs.len();
    for (i, lib) in result.footprint_libs.iter_mut().enumerate() {
        lib.footprints.clear();
        let lib_name = lib.name();
        for file in &lib.files {
            if ctx.is_aborted() {
                break;
            }
            let stem = super::result::file_stem(file);
            let fp_log = log.child(format!("{}:{}", lib_name, stem));
            match KicadFootprint::parse(file, &fp_log) {
                Ok(fp) => {
                    let key = generated_by(&lib_name, &[&stem]);
                    lib.footprints.push(FootprintEntry {
                        file: file.clone(),
                        name: fp.name,
                        already_imported: is_already_imported(db, ElementKind::Package, &key),
                        generated_by: key,
                        checked: CheckState::Checked,
                    });
                    footprint_count += 1;
                }
                Err(e) => fp_log.critical(format!(
                    "Failed to parse footprint '{}:{}': {}",
                    super::result::file_name(&lib.dir),
                    super::result::file_name(file),
                    e
                )),
            }
        }
        ctx.progress(50 + 45 * (i + 1) / lib_count);
    }

    log::debug!(
        "Parsed all KiCad libraries in {} ms.",
        timer.elapsed().as_millis()
    );

    if ctx.is_aborted() {
        log.info("Aborted.");
    } else {
        log.info(format!(
            "Found {} symbols and {} footprints.",
            symbol_count, footprint_count
        ));
        if symbol_count + footprint_count > 1000 {
            log.warning(
                "Due to the large amount of elements, please be patient during the following steps.",
            );
        }
        log.info("Please review the messages (if any) before continuing.");
    }
    ctx.progress(100);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{FootprintLibrary, SymbolLibrary};
    use crate::store::FsLibraryDb;
    use crate::{MessageLogger, Severity};
    use std::fs;

    const MULTI_UNIT: &str = r#"(kicad_symbol_lib (version 20231120) (generator "kicad_symbol_editor")
  (symbol "DUAL" (in_bom yes) (on_board yes)
    (property "Reference" "U" (at 0 0 0) (effects (font (size 1.27 1.27))))
    (property "Footprint" "Package_SO:SOIC-8" (at 0 0 0) (effects (font (size 1.27 1.27)) (hide yes)))
    (symbol "DUAL_0_1"
      (rectangle (start -1 -1) (end 1 1) (stroke (width 0.254) (type default)) (fill (type background))))
    (symbol "DUAL_1_1"
      (pin input line (at -3 0 0) (length 2) (name "A" (effects (font (size 1.27 1.27)))) (number "1" (effects (font (size 1.27 1.27))))))
    (symbol "DUAL_1_2"
      (pin input line (at -3 1 0) (length 2) (name "A" (effects (font (size 1.27 1.27)))) (number "1" (effects (font (size 1.27 1.27))))))
    (symbol "DUAL_2_1"
      (polyline (pts (xy 0 0) (xy 1 1)) (stroke (width 0) (type default)) (fill (type none)))
      (pin input line (at -3 0 0) (length 2) (name "B" (effects (font (size 1.27 1.27)))) (number "2" (effects (font (size 1.27 1.27)))))))
  (symbol "DUAL_ALT" (extends "DUAL")
    (property "Reference" "U" (at 0 0 0) (effects (font (size 1.27 1.27)))))
  (symbol "EMPTY"
    (property "Reference" "U" (at 0 0 0) (effects (font (size 1.27 1.27))))))
"#;

    fn symbol(content: &str, index: usize) -> KicadSymbol {
        let lib = KicadSymbolLibrary::parse_str(content, &MessageLogger::new()).unwrap();
        lib.symbols[index].clone()
    }

    #[test]
    fn test_merge_multiple_gates() {
        let gates = merge_symbol_gates(&symbol(MULTI_UNIT, 0));
        assert_eq!(gates.len(), 2);
        assert_eq!(gates[0].name, "DUAL:1");
        assert_eq!(gates[0].index, 1);
        assert_eq!(gates[0].rectangles.len(), 1);
        assert_eq!(gates[0].pins.len(), 1);
        assert_eq!(gates[1].name, "DUAL:2");
        assert_eq!(gates[1].rectangles.len(), 1);
        assert_eq!(gates[1].polylines.len(), 1);
        assert!(gates.iter().all(|g| g.style == GateStyle::Base));
    }

    #[test]
    fn test_merge_single_gate_keeps_common_part() {
        let lib = r#"(kicad_symbol_lib (version 20231120) (generator "x")
  (symbol "LOGO" (in_bom yes) (on_board yes)
    (symbol "LOGO_0_1"
      (circle (center 0 0) (radius 1) (stroke (width 0.254) (type default)) (fill (type none))))))
"#;
        let gates = merge_symbol_gates(&symbol(lib, 0));
        assert_eq!(gates.len(), 1);
        assert_eq!(gates[0].name, "LOGO");
        assert_eq!(gates[0].index, 0);
        assert_eq!(gates[0].circles.len(), 1);
    }

    #[test]
    fn test_merge_without_gates() {
        assert!(merge_symbol_gates(&symbol(MULTI_UNIT, 1)).is_empty());
    }

    #[test]
    fn test_package_generated_by() {
        assert_eq!(
            package_generated_by(&symbol(MULTI_UNIT, 0)),
            "KiCadImport::Package_SO::SOIC-8"
        );
        assert_eq!(package_generated_by(&symbol(MULTI_UNIT, 2)), "");
    }

    #[test]
    fn test_parse_libraries() {
        let dir = tempfile::tempdir().unwrap();
        let sym_file = dir.path().join("Logic.kicad_sym");
        fs::write(&sym_file, MULTI_UNIT).unwrap();
        let fp_dir = dir.path().join("Package_SO.pretty");
        fs::create_dir_all(&fp_dir).unwrap();
        fs::write(
            fp_dir.join("SOIC-8.kicad_mod"),
            r#"(footprint "SOIC-8" (layer "F.Cu") (pad "1" smd rect (at 0 0) (size 1 1) (layers "F.Cu")))"#,
        )
        .unwrap();
        fs::write(fp_dir.join("Broken.kicad_mod"), "(footprint").unwrap();

        let mut footprints = FootprintLibrary::new(fp_dir.clone());
        footprints.files = vec![fp_dir.join("Broken.kicad_mod"), fp_dir.join("SOIC-8.kicad_mod")];
        let mut result = PipelineResult {
            symbol_libs: vec![SymbolLibrary::new(sym_file)],
            footprint_libs: vec![footprints],
            package_3d_libs: Vec::new(),
            file_count: 3,
        };

        let ctx = StageContext::new(MessageLogger::new(), Default::default(), Default::default());
        let db = FsLibraryDb::new(Vec::new());
        parse(&mut result, &db, &ImportSettings::default(), &ctx);

        let symbols = &result.symbol_libs[0].symbols;
        assert_eq!(symbols.len(), 2);
        let dual = &symbols[0];
        assert_eq!(dual.cmp_generated_by, "KiCadImport::Logic::DUAL");
        assert_eq!(dual.dev_generated_by, "KiCadImport::Logic::DUAL");
        assert_eq!(dual.pkg_generated_by, "KiCadImport::Package_SO::SOIC-8");
        let gate_keys: Vec<&str> = dual.gates.iter().map(|g| g.generated_by.as_str()).collect();
        assert_eq!(gate_keys, vec!["KiCadImport::Logic::DUAL::1", "KiCadImport::Logic::DUAL::2"]);
        assert!(!dual.sym_already_imported);

        let alt = &symbols[1];
        assert_eq!(alt.extends, "DUAL");
        assert_eq!(alt.cmp_generated_by, "KiCadImport::Logic::DUAL");
        assert_eq!(alt.dev_generated_by, "KiCadImport::Logic::DUAL_ALT");
        assert!(alt.gates.is_empty());

        let footprints = &result.footprint_libs[0].footprints;
        assert_eq!(footprints.len(), 1);
        assert_eq!(footprints[0].name, "SOIC-8");
        assert_eq!(footprints[0].generated_by, "KiCadImport::Package_SO::SOIC-8");

        let critical: Vec<String> = ctx
            .log
            .messages()
            .into_iter()
            .filter(|m| m.severity == Severity::Critical)
            .map(|m| m.text)
            .collect();
        assert_eq!(critical.len(), 2, "{:?}", critical);
        assert_eq!(critical[0], "Symbol 'EMPTY' does not contain any gates.");
        assert!(critical[1].starts_with("Failed to parse footprint 'Package_SO.pretty:Broken.kicad_mod': "));
        assert!(ctx
            .log
            .messages()
            .iter()
            .any(|m| m.text == "Found 2 symbols and 1 footprints."));
    }
}
