use kicadimport::librepcb::{Component, Device, LibraryElement, Package, Symbol};
use kicadimport::store::{FsLibraryDb, LibraryStore};
use kicadimport::{ImportController, ImportSettings, MessageLogger, Severity, State};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const DEVICE_LIB: &str = r#"(kicad_symbol_lib (version 20231120) (generator "kicad_symbol_editor")
  (symbol "R" (pin_numbers hide) (pin_names (offset 0)) (in_bom yes) (on_board yes)
    (property "Reference" "R" (at 2.032 0 90) (effects (font (size 1.27 1.27))))
    (property "Value" "R" (at 0 0 90) (effects (font (size 1.27 1.27))))
    (property "Footprint" "Resistors:R_0603" (at 0 0 0) (effects (font (size 1.27 1.27)) (hide yes)))
    (property "Description" "Resistor" (at 0 0 0) (effects (font (size 1.27 1.27)) (hide yes)))
    (symbol "R_0_1"
      (rectangle (start -1.016 -2.54) (end 1.016 2.54) (stroke (width 0.254) (type default)) (fill (type none))))
    (symbol "R_1_1"
      (pin passive line (at 0 3.81 270) (length 1.27) (name "~" (effects (font (size 1.27 1.27)))) (number "1" (effects (font (size 1.27 1.27)))))
      (pin passive line (at 0 -3.81 90) (length 1.27) (name "~" (effects (font (size 1.27 1.27)))) (number "2" (effects (font (size 1.27 1.27))))))))
"#;

fn footprint(name: &str) -> String {
    format!(
        r#"(footprint "{name}" (layer "F.Cu") (attr smd)
  (fp_line (start -1.5 -0.7) (end 1.5 -0.7) (stroke (width 0.12) (type solid)) (layer "F.SilkS"))
  (pad "1" smd roundrect (at -0.8 0) (size 0.8 0.95) (layers "F.Cu" "F.Paste" "F.Mask") (roundrect_rratio 0.25))
  (pad "2" smd roundrect (at 0.8 0) (size 0.8 0.95) (layers "F.Cu" "F.Paste" "F.Mask") (roundrect_rratio 0.25)))
"#
    )
}

fn write_libs(root: &Path) {
    fs::write(root.join("Device.kicad_sym"), DEVICE_LIB).unwrap();
    fs::create_dir_all(root.join("Resistors.pretty")).unwrap();
    fs::write(root.join("Resistors.pretty/R_0603.kicad_mod"), footprint("R_0603")).unwrap();
}

fn controller(db: &Arc<FsLibraryDb>, dest: &Path) -> ImportController {
    ImportController::new(db.clone(), dest, ImportSettings::default(), MessageLogger::new())
}

fn scan_and_parse(ctrl: &mut ImportController, libs: &Path) {
    assert!(ctrl.start_scan(libs, None));
    ctrl.wait();
    assert_eq!(ctrl.state(), State::Scanned);
    assert!(ctrl.start_parse());
    ctrl.wait();
    assert_eq!(ctrl.state(), State::Parsed);
}

fn import(ctrl: &mut ImportController) {
    assert!(ctrl.start_import());
    ctrl.wait();
    assert_eq!(ctrl.state(), State::Imported);
}

fn element_dirs(root: &Path, kind: &str) -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = match fs::read_dir(root.join(kind)) {
        Ok(entries) => entries.map(|e| e.unwrap().path()).collect(),
        Err(_) => Vec::new(),
    };
    dirs.sort();
    dirs
}

fn open_single<E: LibraryElement>(root: &Path, kind: &str) -> E {
    let dirs = element_dirs(root, kind);
    assert_eq!(dirs.len(), 1, "expected one {} element", kind);
    LibraryStore::open(&dirs[0]).unwrap()
}

#[test]
fn test_import_resistor() {
    let src = tempfile::tempdir().unwrap();
    let dest = tempfile::tempdir().unwrap();
    write_libs(src.path());

    let db = Arc::new(FsLibraryDb::new([dest.path().to_path_buf()]));
    let mut ctrl = controller(&db, dest.path());
    scan_and_parse(&mut ctrl, src.path());
    assert_eq!(ctrl.result().pending_count(), 4);
    import(&mut ctrl);

    let summary = ctrl.import_summary().unwrap();
    assert_eq!((summary.imported, summary.total), (4, 4));
    assert_eq!(ctrl.log().count(Severity::Critical), 0);

    let sym: Symbol = open_single(dest.path(), "sym");
    assert_eq!(sym.meta.name, "R");
    assert_eq!(sym.meta.generated_by, "KiCadImport::Device::R::1");
    assert_eq!(sym.pins.len(), 2);

    let pkg: Package = open_single(dest.path(), "pkg");
    assert_eq!(pkg.meta.generated_by, "KiCadImport::Resistors::R_0603");
    assert_eq!(pkg.pads.len(), 2);
    assert_eq!(pkg.footprints.len(), 1);
    assert_eq!(pkg.footprints[0].pads.len(), 2);

    let cmp: Component = open_single(dest.path(), "cmp");
    assert_eq!(cmp.meta.generated_by, "KiCadImport::Device::R");
    assert_eq!(cmp.signals.len(), 2);
    assert_eq!(cmp.prefix, "R");

    let dev: Device = open_single(dest.path(), "dev");
    assert_eq!(dev.component, cmp.meta.uuid);
    assert_eq!(dev.package, pkg.meta.uuid);
    assert_eq!(dev.pads.len(), 2);
    assert!(dev.pads.iter().all(|p| p.signal.is_some()));
}

#[test]
fn test_import_again_adds_nothing() {
    let src = tempfile::tempdir().unwrap();
    let dest = tempfile::tempdir().unwrap();
    write_libs(src.path());

    let db = Arc::new(FsLibraryDb::new([dest.path().to_path_buf()]));
    let mut ctrl = controller(&db, dest.path());
    scan_and_parse(&mut ctrl, src.path());
    import(&mut ctrl);

    assert!(!ctrl.can_start_parsing());
    assert!(!ctrl.start_parse());
    assert_eq!(ctrl.state(), State::Imported);

    db.rescan();
    ctrl.reset();
    scan_and_parse(&mut ctrl, src.path());
    assert_eq!(ctrl.result().pending_count(), 0);
    assert!(!ctrl.can_start_import());

    let sym = &ctrl.result().symbol_libs[0].symbols[0];
    assert!(sym.sym_already_imported);
    assert!(sym.cmp_already_imported);
    assert!(sym.dev_already_imported);
    assert!(ctrl.result().footprint_libs[0].footprints[0].already_imported);
    assert_eq!(element_dirs(dest.path(), "dev").len(), 1);
}

#[test]
fn test_corrupt_footprint_is_skipped() {
    let src = tempfile::tempdir().unwrap();
    let dest = tempfile::tempdir().unwrap();
    let lib = src.path().join("Resistors.pretty");
    fs::create_dir_all(&lib).unwrap();
    for i in 0..9 {
        let name = format!("R_{:02}", i);
        fs::write(lib.join(format!("{}.kicad_mod", name)), footprint(&name)).unwrap();
    }
    fs::write(lib.join("R_Broken.kicad_mod"), "(footprint \"R_Broken\" (pad").unwrap();

    let db = Arc::new(FsLibraryDb::new([dest.path().to_path_buf()]));
    let mut ctrl = controller(&db, dest.path());
    scan_and_parse(&mut ctrl, src.path());
    assert_eq!(ctrl.result().file_count, 10);
    assert_eq!(ctrl.log().count(Severity::Critical), 1);
    import(&mut ctrl);

    assert_eq!(element_dirs(dest.path(), "pkg").len(), 9);
    assert_eq!(ctrl.log().count(Severity::Critical), 1);
}

#[test]
fn test_excluded_device_keeps_package() {
    let src = tempfile::tempdir().unwrap();
    let dest = tempfile::tempdir().unwrap();
    write_libs(src.path());

    let db = Arc::new(FsLibraryDb::new([dest.path().to_path_buf()]));
    let mut ctrl = controller(&db, dest.path());
    scan_and_parse(&mut ctrl, src.path());
    ctrl.set_device_checked("Device", "R", false);
    ctrl.set_component_checked("Device", "R", false);
    import(&mut ctrl);

    assert_eq!(element_dirs(dest.path(), "dev").len(), 0);
    assert_eq!(element_dirs(dest.path(), "cmp").len(), 0);
    assert_eq!(element_dirs(dest.path(), "sym").len(), 1);
    assert_eq!(element_dirs(dest.path(), "pkg").len(), 1);
}
