//! Discovery of KiCad library files
//!
//! Nothing is parsed here, only directory entries are read. Directories are
//! searched one level deep: the selected directory and its direct
//! subdirectories.

use super::{FootprintLibrary, Package3dLibrary, PipelineResult, StageContext, SymbolLibrary};
use std::path::{Path, PathBuf};
use std::time::Instant;
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ItemType {
    File,
    Dir,
}

/// Direct children of `dir` of the given type, sorted by name
///
/// With a `suffix` only entries with that extension (case insensitive) are
/// returned.
fn find_items(dir: &Path, item_type: ItemType, suffix: Option<&str>) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                log::debug!("Skipping unreadable entry in {}: {}", dir.display(), e);
                None
            }
        })
        .filter(|entry| match item_type {
            ItemType::File => entry.file_type().is_file(),
            ItemType::Dir => entry.file_type().is_dir(),
        })
        .map(|entry| entry.into_path())
        .filter(|path| suffix.map_or(true, |s| has_suffix(path, s)))
        .collect()
}

fn has_suffix(path: &Path, suffix: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(suffix))
}

#[derive(Default)]
struct Scanner {
    result: PipelineResult,
    footprint_count: usize,
    step_file_count: usize,
}

impl Scanner {
    fn add_symbol_lib(&mut self, file: PathBuf) {
        self.result.symbol_libs.push(SymbolLibrary::new(file));
        self.result.file_count += 1;
    }

    fn find_symbol_libs(&mut self, dir: &Path) {
        for file in find_items(dir, ItemType::File, Some("kicad_sym")) {
            self.add_symbol_lib(file);
        }
    }

    fn add_footprint_to_lib(&mut self, lib: &mut FootprintLibrary, file: PathBuf) {
        lib.files.push(file);
        self.footprint_count += 1;
        self.result.file_count += 1;
    }

    fn add_footprint_lib(&mut self, dir: PathBuf) {
        let mut lib = FootprintLibrary::new(dir);
        for file in find_items(&lib.dir, ItemType::File, Some("kicad_mod")) {
            self.add_footprint_to_lib(&mut lib, file);
        }
        self.result.footprint_libs.push(lib);
    }

    fn find_footprint_libs(&mut self, dir: &Path) {
        for sub in find_items(dir, ItemType::Dir, Some("pretty")) {
            self.add_footprint_lib(sub);
        }
    }

    fn add_shapes_3d_lib(&mut self, dir: PathBuf) {
        let step_files = find_items(&dir, ItemType::File, Some("step"));
        self.step_file_count += step_files.len();
        self.result.file_count += step_files.len();
        self.result
            .package_3d_libs
            .push(Package3dLibrary { dir, step_files });
    }

    fn find_shapes_3d_libs(&mut self, dir: &Path) {
        for sub in find_items(dir, ItemType::Dir, Some("3dshapes")) {
            self.add_shapes_3d_lib(sub);
        }
    }
}

/// Find the libraries in `libs` (a directory, a `*.pretty` library, a
/// `*.kicad_sym` file or a single `*.kicad_mod` file) and the 3D model
/// libraries in `shapes_3d`, which defaults to `libs`
pub fn scan(libs: &Path, shapes_3d: Option<&Path>, ctx: &StageContext) -> PipelineResult {
    let timer = Instant::now();
    log::debug!("Searching for KiCad libraries in {}...", libs.display());
    let log = &ctx.log;
    let mut scanner = Scanner::default();
    ctx.status("Scanning libraries...");

    if !libs.exists() {
        log.critical(format!("Path does not exist: '{}'", libs.display()));
    } else if has_suffix(libs, "kicad_sym") {
        scanner.add_symbol_lib(libs.to_path_buf());
    } else if has_suffix(libs, "kicad_mod") {
        match libs.parent().filter(|p| has_suffix(p, "pretty")) {
            Some(parent) => {
                let mut lib = FootprintLibrary::new(parent.to_path_buf());
                scanner.add_footprint_to_lib(&mut lib, libs.to_path_buf());
                scanner.result.footprint_libs.push(lib);
            }
            None => log.critical("Parent directory is not a *.pretty library."),
        }
    } else if has_suffix(libs, "pretty") {
        scanner.add_footprint_lib(libs.to_path_buf());
    } else if libs.is_dir() {
        scanner.find_symbol_libs(libs);
        scanner.find_footprint_libs(libs);
        for sub in find_items(libs, ItemType::Dir, None) {
            if ctx.is_aborted() {
                break;
            }
            scanner.find_symbol_libs(&sub);
            scanner.find_footprint_libs(&sub);
        }
    }

    let models = shapes_3d.unwrap_or(libs);
    if has_suffix(models, "3dshapes") {
        scanner.add_shapes_3d_lib(models.to_path_buf());
    } else if models.is_dir() {
        scanner.find_shapes_3d_libs(models);
        for sub in find_items(models, ItemType::Dir, None) {
            if ctx.is_aborted() {
                break;
            }
            scanner.find_shapes_3d_libs(&sub);
        }
    } else if shapes_3d.is_some() {
        log.warning(format!(
            "3D model directory does not exist: '{}'",
            models.display()
        ));
    }

    if ctx.is_aborted() {
        log.info("Aborted.");
        return PipelineResult::default();
    }

    let result = scanner.result;
    log.info(format!(
        "Found {} symbol libraries.",
        result.symbol_libs.len()
    ));
    log.info(format!(
        "Found {} footprints in {} libraries.",
        scanner.footprint_count,
        result.footprint_libs.len()
    ));
    log.info(format!(
        "Found {} STEP files in {} libraries.",
        scanner.step_file_count,
        result.package_3d_libs.len()
    ));
    log::debug!(
        "Found {} KiCad library files in {} ms.",
        result.file_count,
        timer.elapsed().as_millis()
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MessageLogger, Severity};
    use std::fs;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    fn context() -> StageContext {
        StageContext::new(MessageLogger::new(), Default::default(), Default::default())
    }

    #[test]
    fn test_scan_directory() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("Device.kicad_sym"));
        touch(&root.join("notes.txt"));
        touch(&root.join("symbols/Connector.kicad_sym"));
        touch(&root.join("Resistor_SMD.pretty/R_0603.kicad_mod"));
        touch(&root.join("Resistor_SMD.pretty/R_0402.kicad_mod"));
        touch(&root.join("Resistor_SMD.pretty/readme.md"));
        touch(&root.join("footprints/Capacitor_SMD.pretty/C_0603.kicad_mod"));
        touch(&root.join("a/b/Deep.kicad_sym"));
        touch(&root.join("Resistor_SMD.3dshapes/R_0603.step"));
        touch(&root.join("Resistor_SMD.3dshapes/R_0603.wrl"));

        let ctx = context();
        let result = scan(root, None, &ctx);
        let symbol_libs: Vec<String> = result.symbol_libs.iter().map(|l| l.name()).collect();
        assert_eq!(symbol_libs, vec!["Device", "Connector"]);
        let footprint_libs: Vec<(String, usize)> = result
            .footprint_libs
            .iter()
            .map(|l| (l.name(), l.files.len()))
            .collect();
        assert_eq!(
            footprint_libs,
            vec![("Resistor_SMD".to_string(), 2), ("Capacitor_SMD".to_string(), 1)]
        );
        assert_eq!(result.footprint_libs[0].files[0].file_name().unwrap(), "R_0402.kicad_mod");
        assert_eq!(result.package_3d_libs.len(), 1);
        assert_eq!(result.package_3d_libs[0].step_files.len(), 1);
        assert_eq!(result.file_count, 6);

        let texts: Vec<String> = ctx.log.messages().into_iter().map(|m| m.text).collect();
        assert_eq!(
            texts,
            vec![
                "Found 2 symbol libraries.",
                "Found 3 footprints in 2 libraries.",
                "Found 1 STEP files in 1 libraries.",
            ]
        );
    }

    #[test]
    fn test_scan_single_footprint() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("Lib.pretty/FP.kicad_mod");
        touch(&file);
        let result = scan(&file, None, &context());
        assert_eq!(result.footprint_libs.len(), 1);
        assert_eq!(result.footprint_libs[0].name(), "Lib");
        assert_eq!(result.footprint_libs[0].files, vec![file]);
    }

    #[test]
    fn test_scan_footprint_outside_library() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("FP.kicad_mod");
        touch(&file);
        let ctx = context();
        let result = scan(&file, None, &ctx);
        assert!(result.footprint_libs.is_empty());
        assert_eq!(ctx.log.count(Severity::Critical), 1);
    }

    #[test]
    fn test_scan_separate_shapes_dir() {
        let dir = tempfile::tempdir().unwrap();
        let lib = dir.path().join("Device.kicad_sym");
        touch(&lib);
        let shapes = dir.path().join("models/Package_SO.3dshapes");
        touch(&shapes.join("SOIC-8.step"));
        let result = scan(&lib, Some(&shapes), &context());
        assert_eq!(result.symbol_libs.len(), 1);
        assert_eq!(result.package_3d_libs.len(), 1);
        assert_eq!(result.file_count, 2);
    }

    #[test]
    fn test_scan_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context();
        let result = scan(&dir.path().join("missing"), None, &ctx);
        assert_eq!(result, PipelineResult::default());
        assert_eq!(ctx.log.count(Severity::Critical), 1);
    }
}
