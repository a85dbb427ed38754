//! Conversion and storage of the selected elements
//!
//! Packages are imported first, then per symbol library the symbols of each
//! gate, the component and the device. A failing element is reported and
//! skipped, everything else is still imported.

use super::parse::merge_symbol_gates;
use super::result::{file_name, file_stem};
use super::{FootprintEntry, Package3dLibrary, PipelineResult, StageContext, SymbolEntry, SymbolLibrary};
use crate::convert::LibraryConverter;
use crate::kicad::{KicadFootprint, KicadSymbol, KicadSymbolLibrary, SymbolGate};
use crate::librepcb::LibraryElement;
use crate::store::{LibraryStore, WorkspaceLibraryDb};
use crate::{bail_logic, bail_runtime, ImportSettings, MessageLogger, Result};
use itertools::Itertools;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::time::Instant;

/// Outcome of an import run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImportSummary {
    pub imported: usize,
    pub total: usize,
}

/// Symbols which can be imported at all; the parser skips the others
fn is_importable(sym: &KicadSymbol) -> bool {
    sym.extends.is_empty() != sym.gates.is_empty()
}

struct Progress<'c> {
    ctx: &'c StageContext,
    summary: ImportSummary,
    processed: usize,
}

impl Progress<'_> {
    fn element_done(&mut self, result: Result<()>, log: &MessageLogger, kind: &str) {
        match result {
            Ok(()) => self.summary.imported += 1,
            Err(e) => log.critical(format!("Skipped {} due to error: {}", kind, e)),
        }
        self.processed += 1;
        self.ctx
            .progress(100 * self.processed / self.summary.total.max(1));
    }
}

fn save<E: LibraryElement>(store: &LibraryStore, element: Result<E>) -> Result<()> {
    store.save(&element?)?;
    Ok(())
}

/// STEP files for the 3D models referenced by a footprint
///
/// Model paths look like `${KICAD8_3DMODEL_DIR}/<lib>.3dshapes/<name>.wrl`,
/// VRML references are mapped to the STEP file of the same name.
fn find_models(
    fp: &KicadFootprint,
    libs: &[Package3dLibrary],
    missing_libs: &mut HashSet<String>,
    log: &MessageLogger,
) -> HashMap<String, PathBuf> {
    let mut models = HashMap::new();
    for model in &fp.models {
        let segments: Vec<&str> = model.path.split('/').collect();
        let lib_name = match segments.len() {
            n if n >= 2 => segments[n - 2],
            _ => "",
        };
        let step_name = segments
            .last()
            .copied()
            .unwrap_or_default()
            .replace(".wrl", ".step");
        if !lib_name.ends_with(".3dshapes") || !step_name.ends_with(".step") {
            log.warning(format!("Unknown 3D model file: '{}'", model.path));
            continue;
        }
        let mut lib_found = false;
        for lib in libs.iter().filter(|l| file_name(&l.dir) == lib_name) {
            lib_found = true;
            if let Some(file) = lib.step_files.iter().find(|f| file_name(f) == step_name) {
                models.insert(model.path.clone(), file.clone());
            }
        }
        if !lib_found {
            missing_libs.insert(lib_name.to_string());
        }
    }
    models
}

struct Importer<'a, 'c> {
    result: &'a PipelineResult,
    store: &'a LibraryStore,
    converter: LibraryConverter<'a>,
    progress: Progress<'c>,
    missing_3d_libs: HashSet<String>,
}

impl Importer<'_, '_> {
    fn ctx(&self) -> &StageContext {
        self.progress.ctx
    }

    fn import_package(&mut self, lib_name: &str, entry: &FootprintEntry, log: &MessageLogger) -> Result<()> {
        let fp = KicadFootprint::parse(&entry.file, log)?;
        let models = find_models(
            &fp,
            &self.result.package_3d_libs,
            &mut self.missing_3d_libs,
            log,
        );
        let package = self
            .converter
            .create_package(lib_name, &fp, &entry.generated_by, &models, log);
        save(self.store, package)
    }

    fn import_symbol_library(&mut self, lib: &SymbolLibrary, log: &MessageLogger) -> Result<()> {
        let lib_name = lib.name();
        let kicad_lib = KicadSymbolLibrary::parse(&lib.file, log)?;
        let symbols: Vec<&KicadSymbol> = kicad_lib
            .symbols
            .iter()
            .filter(|s| is_importable(s))
            .collect();
        if symbols.len() != lib.symbols.len()
            || symbols.iter().zip(&lib.symbols).any(|(s, e)| s.name != e.name)
        {
            bail_logic!("Symbol library changed since it was parsed.");
        }

        for (entry, sym) in lib.symbols.iter().zip(symbols) {
            if self.ctx().is_aborted() {
                break;
            }
            let sym_log = log.child(&sym.name);
            let gates = merge_symbol_gates(sym);
            if gates.len() != entry.gates.len() {
                bail_logic!("Gates of symbol '{}' changed since parsing.", sym.name);
            }
            self.import_symbols(&lib_name, entry, sym, &gates, &sym_log);
            self.import_component(&lib_name, entry, sym, &gates, &sym_log);
            if self.ctx().is_aborted() {
                break;
            }
            if entry.needs_device_import() {
                self.ctx()
                    .status(format!("{}:{}:DEV", lib_name, sym.name));
                let device = self.import_device(&lib_name, entry, sym, gates, &kicad_lib);
                self.progress.element_done(device, &sym_log, "device");
            }
        }
        Ok(())
    }

    fn import_symbols(
        &mut self,
        lib_name: &str,
        entry: &SymbolEntry,
        sym: &KicadSymbol,
        gates: &[SymbolGate],
        log: &MessageLogger,
    ) {
        if !entry.sym_checked.is_checked() || !sym.extends.is_empty() {
            return;
        }
        for (gate, kicad_gate) in entry.gates.iter().zip(gates) {
            if self.ctx().is_aborted() {
                break;
            }
            if gate.already_imported {
                continue;
            }
            let gate_log = log.child(kicad_gate.index.to_string());
            self.ctx()
                .status(format!("{}:{}", lib_name, kicad_gate.name));
            let symbol =
                self.converter
                    .create_symbol(lib_name, sym, kicad_gate, &gate.generated_by, &gate_log);
            let saved = save(self.store, symbol);
            self.progress.element_done(saved, &gate_log, "symbol");
        }
    }

    fn import_component(
        &mut self,
        lib_name: &str,
        entry: &SymbolEntry,
        sym: &KicadSymbol,
        gates: &[SymbolGate],
        log: &MessageLogger,
    ) {
        if !entry.needs_component_import() || self.ctx().is_aborted() {
            return;
        }
        self.ctx()
            .status(format!("{}:{}:CMP", lib_name, sym.name));
        let symbol_keys: Vec<String> = entry
            .gates
            .iter()
            .map(|g| g.generated_by.clone())
            .collect();
        let component = self.converter.create_component(
            lib_name,
            sym,
            gates,
            &entry.cmp_generated_by,
            &symbol_keys,
        );
        let saved = save(self.store, component);
        self.progress.element_done(saved, log, "component");
    }

    /// Devices of derived symbols use the gates of their base symbol
    fn import_device(
        &mut self,
        lib_name: &str,
        entry: &SymbolEntry,
        sym: &KicadSymbol,
        mut gates: Vec<SymbolGate>,
        kicad_lib: &KicadSymbolLibrary,
    ) -> Result<()> {
        if !sym.extends.is_empty() {
            let Some(base) = kicad_lib.symbols.iter().find(|s| s.name == sym.extends) else {
                bail_runtime!("Base symbol '{}' not found.", sym.extends);
            };
            gates = merge_symbol_gates(base);
        }
        let device = self.converter.create_device(
            lib_name,
            sym,
            &gates,
            &entry.dev_generated_by,
            &entry.cmp_generated_by,
            &entry.pkg_generated_by,
        );
        save(self.store, device)
    }
}

/// Import all selected elements which were not imported before
pub fn import(
    result: &PipelineResult,
    store: &LibraryStore,
    db: &dyn WorkspaceLibraryDb,
    settings: &ImportSettings,
    ctx: &StageContext,
) -> ImportSummary {
    let timer = Instant::now();
    let log = &ctx.log;
    log.info("Importing libraries...");
    ctx.progress(5);

    let mut importer = Importer {
        result,
        store,
        converter: LibraryConverter::new(db, settings),
        progress: Progress {
            ctx,
            summary: ImportSummary {
                imported: 0,
                total: result.pending_count(),
            },
            processed: 0,
        },
        missing_3d_libs: HashSet::new(),
    };

    'packages: for lib in &result.footprint_libs {
        let lib_name = lib.name();
        for entry in &lib.footprints {
            if ctx.is_aborted() {
                break 'packages;
            }
            if !entry.checked.is_checked() || entry.already_imported {
                continue;
            }
            let label = format!("{}:{}", lib_name, file_stem(&entry.file));
            let fp_log = log.child(&label);
            ctx.status(label);
            let saved = importer.import_package(&lib_name, entry, &fp_log);
            importer.progress.element_done(saved, &fp_log, "footprint");
        }
    }

    for lib in &result.symbol_libs {
        if ctx.is_aborted() {
            break;
        }
        let lib_log = log.child(lib.name());
        if let Err(e) = importer.import_symbol_library(lib, &lib_log) {
            lib_log.critical(format!("Skipped symbol library due to error: {}", e));
        }
    }

    for lib_name in importer.missing_3d_libs.iter().sorted() {
        log.info(format!("3D model library not found: '{}'", lib_name));
    }
    log::debug!(
        "Imported all KiCad libraries in {} ms.",
        timer.elapsed().as_millis()
    );

    let summary = importer.progress.summary;
    if ctx.is_aborted() {
        log.info("Aborted.");
    } else {
        log.info("Done! Please check all messages (if any) before proceeding.");
    }
    ctx.progress(100);
    ctx.status(format!(
        "Finished: {} of {} element(s) imported",
        summary.imported, summary.total
    ));
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{parse, scan};
    use crate::store::FsLibraryDb;
    use crate::Severity;
    use std::fs;
    use std::path::Path;

    const SYMBOLS: &str = r#"(kicad_symbol_lib (version 20231120) (generator "kicad_symbol_editor")
  (symbol "R" (in_bom yes) (on_board yes)
    (property "Reference" "R" (at 2.032 0 90) (effects (font (size 1.27 1.27))))
    (property "Footprint" "Resistor_SMD:R_0603" (at 0 0 0) (effects (font (size 1.27 1.27)) (hide yes)))
    (symbol "R_0_1"
      (rectangle (start -1.016 -2.54) (end 1.016 2.54) (stroke (width 0.254) (type default)) (fill (type none))))
    (symbol "R_1_1"
      (pin passive line (at 0 3.81 270) (length 1.27) (name "~" (effects (font (size 1.27 1.27)))) (number "1" (effects (font (size 1.27 1.27)))))
      (pin passive line (at 0 -3.81 90) (length 1.27) (name "~" (effects (font (size 1.27 1.27)))) (number "2" (effects (font (size 1.27 1.27)))))))
  (symbol "R_Small" (extends "R")
    (property "Reference" "R" (at 0 0 0) (effects (font (size 1.27 1.27))))
    (property "Footprint" "Resistor_SMD:R_0603" (at 0 0 0) (effects (font (size 1.27 1.27)) (hide yes))))
  (symbol "R_Orphan" (extends "Missing")
    (property "Reference" "R" (at 0 0 0) (effects (font (size 1.27 1.27))))
    (property "Footprint" "Resistor_SMD:R_0603" (at 0 0 0) (effects (font (size 1.27 1.27)) (hide yes)))))
"#;

    const FOOTPRINT: &str = r#"(footprint "R_0603" (layer "F.Cu") (attr smd)
  (pad "1" smd rect (at -0.8 0) (size 0.8 0.9) (layers "F.Cu" "F.Paste" "F.Mask"))
  (pad "2" smd rect (at 0.8 0) (size 0.8 0.9) (layers "F.Cu" "F.Paste" "F.Mask"))
  (model "${KICAD8_3DMODEL_DIR}/Resistor_SMD.3dshapes/R_0603.wrl" (offset (xyz 0 0 0)) (scale (xyz 1 1 1)) (rotate (xyz 0 0 0))))
"#;

    fn write_libs(root: &Path) {
        fs::write(root.join("Device.kicad_sym"), SYMBOLS).unwrap();
        fs::create_dir_all(root.join("Resistor_SMD.pretty")).unwrap();
        fs::write(root.join("Resistor_SMD.pretty/R_0603.kicad_mod"), FOOTPRINT).unwrap();
        fs::create_dir_all(root.join("Resistor_SMD.3dshapes")).unwrap();
        fs::write(root.join("Resistor_SMD.3dshapes/R_0603.step"), "ISO-10303-21;").unwrap();
    }

    fn element_count(root: &Path, kind: &str) -> usize {
        fs::read_dir(root.join(kind)).map(|d| d.count()).unwrap_or(0)
    }

    #[test]
    fn test_find_models() {
        let fp = KicadFootprint::parse_str(
            r#"(footprint "X" (layer "F.Cu")
  (model "${KICAD8_3DMODEL_DIR}/Resistor_SMD.3dshapes/R_0603.wrl" (offset (xyz 0 0 0)) (scale (xyz 1 1 1)) (rotate (xyz 0 0 0)))
  (model "${KICAD8_3DMODEL_DIR}/Other.3dshapes/X.step" (offset (xyz 0 0 0)) (scale (xyz 1 1 1)) (rotate (xyz 0 0 0)))
  (model "R_0603.wrl" (offset (xyz 0 0 0)) (scale (xyz 1 1 1)) (rotate (xyz 0 0 0))))"#,
            &MessageLogger::new(),
        )
        .unwrap();
        let libs = vec![Package3dLibrary {
            dir: PathBuf::from("/models/Resistor_SMD.3dshapes"),
            step_files: vec![PathBuf::from("/models/Resistor_SMD.3dshapes/R_0603.step")],
        }];
        let log = MessageLogger::new();
        let mut missing = HashSet::new();
        let models = find_models(&fp, &libs, &mut missing, &log);
        assert_eq!(models.len(), 1);
        assert_eq!(
            models["${KICAD8_3DMODEL_DIR}/Resistor_SMD.3dshapes/R_0603.wrl"],
            PathBuf::from("/models/Resistor_SMD.3dshapes/R_0603.step")
        );
        assert_eq!(missing, HashSet::from(["Other.3dshapes".to_string()]));
        assert_eq!(log.count(Severity::Warning), 1);
    }

    #[test]
    fn test_import_all() {
        let src = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        write_libs(src.path());

        let ctx = StageContext::new(MessageLogger::new(), Default::default(), Default::default());
        let db = FsLibraryDb::new([dest.path().to_path_buf()]);
        let settings = ImportSettings::default();
        let mut result = scan(src.path(), None, &ctx);
        parse(&mut result, &db, &settings, &ctx);
        assert_eq!(result.pending_count(), 6);

        let store = LibraryStore::new(dest.path());
        let summary = import(&result, &store, &db, &settings, &ctx);
        assert_eq!(summary, ImportSummary { imported: 5, total: 6 });
        assert_eq!(element_count(dest.path(), "pkg"), 1);
        assert_eq!(element_count(dest.path(), "sym"), 1);
        assert_eq!(element_count(dest.path(), "cmp"), 1);
        assert_eq!(element_count(dest.path(), "dev"), 2);

        let critical: Vec<String> = ctx
            .log
            .messages()
            .into_iter()
            .filter(|m| m.severity == Severity::Critical)
            .map(|m| m.text)
            .collect();
        assert_eq!(
            critical,
            vec!["Skipped device due to error: Base symbol 'Missing' not found."]
        );

        let pkg_dir = fs::read_dir(dest.path().join("pkg"))
            .unwrap()
            .next()
            .unwrap()
            .unwrap()
            .path();
        assert!(fs::read_dir(&pkg_dir)
            .unwrap()
            .any(|e| e.unwrap().file_name().to_string_lossy().ends_with(".step")));
    }

    #[test]
    fn test_changed_library_is_skipped() {
        let src = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        write_libs(src.path());

        let ctx = StageContext::new(MessageLogger::new(), Default::default(), Default::default());
        let db = FsLibraryDb::new(Vec::new());
        let settings = ImportSettings::default();
        let mut result = scan(src.path(), None, &ctx);
        parse(&mut result, &db, &settings, &ctx);
        fs::write(
            src.path().join("Device.kicad_sym"),
            r#"(kicad_symbol_lib (version 20231120) (generator "x"))"#,
        )
        .unwrap();

        let summary = import(&result, &LibraryStore::new(dest.path()), &db, &settings, &ctx);
        assert_eq!(summary.imported, 1);
        assert!(ctx.log.messages().iter().any(|m| m.text
            == "Skipped symbol library due to error: Symbol library changed since it was parsed."));
    }
}
