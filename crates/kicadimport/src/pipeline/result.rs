//! Snapshot of the libraries found by the scanner and parsed by the parser

use std::path::{Path, PathBuf};

/// Selection state of one element to import
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CheckState {
    Unchecked,
    #[default]
    Checked,
    /// Not selected by the user but needed by a selected element
    ImplicitlyChecked,
}

impl CheckState {
    pub fn from_checked(checked: bool) -> Self {
        if checked {
            CheckState::Checked
        } else {
            CheckState::Unchecked
        }
    }

    /// Selected explicitly or implicitly
    pub fn is_checked(self) -> bool {
        self != CheckState::Unchecked
    }
}

/// A gate of a symbol, imported as one library symbol
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateEntry {
    pub index: i32,
    pub generated_by: String,
    pub already_imported: bool,
}

/// A KiCad symbol, imported as symbols, a component and a device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolEntry {
    pub name: String,
    pub cmp_generated_by: String,
    pub dev_generated_by: String,
    /// Empty if the symbol has no footprint assigned
    pub pkg_generated_by: String,
    /// True if every gate has been imported before
    pub sym_already_imported: bool,
    pub cmp_already_imported: bool,
    pub dev_already_imported: bool,
    pub extends: String,
    pub gates: Vec<GateEntry>,
    pub sym_checked: CheckState,
    pub cmp_checked: CheckState,
    pub dev_checked: CheckState,
}

/// A `*.kicad_sym` file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolLibrary {
    pub file: PathBuf,
    pub symbols: Vec<SymbolEntry>,
}

impl SymbolLibrary {
    pub fn new(file: PathBuf) -> Self {
        Self {
            file,
            symbols: Vec::new(),
        }
    }

    pub fn name(&self) -> String {
        file_stem(&self.file)
    }
}

/// A `*.kicad_mod` file, imported as package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FootprintEntry {
    pub file: PathBuf,
    pub name: String,
    pub generated_by: String,
    pub already_imported: bool,
    pub checked: CheckState,
}

/// A `*.pretty` directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FootprintLibrary {
    pub dir: PathBuf,
    /// Found by the scanner
    pub files: Vec<PathBuf>,
    /// Successfully parsed footprints
    pub footprints: Vec<FootprintEntry>,
}

impl FootprintLibrary {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            files: Vec::new(),
            footprints: Vec::new(),
        }
    }

    pub fn name(&self) -> String {
        file_stem(&self.dir)
    }
}

/// A `*.3dshapes` directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package3dLibrary {
    pub dir: PathBuf,
    pub step_files: Vec<PathBuf>,
}

/// Everything found in the selected KiCad libraries
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineResult {
    pub symbol_libs: Vec<SymbolLibrary>,
    pub footprint_libs: Vec<FootprintLibrary>,
    pub package_3d_libs: Vec<Package3dLibrary>,
    /// Number of library files found by the scanner
    pub file_count: usize,
}

impl PipelineResult {
    pub fn symbol_count(&self) -> usize {
        self.symbol_libs.iter().map(|l| l.symbols.len()).sum()
    }

    pub fn footprint_count(&self) -> usize {
        self.footprint_libs.iter().map(|l| l.footprints.len()).sum()
    }
}

/// Provenance key of a KiCad entity, e.g. `KiCadImport::Device::R::1`
pub fn generated_by<S: AsRef<str>>(lib_name: &str, keys: &[S]) -> String {
    let mut out = format!("KiCadImport::{}", lib_name);
    for key in keys {
        out.push_str("::");
        out.push_str(key.as_ref());
    }
    out
}

/// File name without its last extension
pub(crate) fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// File name including extensions
pub(crate) fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_by() {
        assert_eq!(generated_by("Device", &["R", "1"]), "KiCadImport::Device::R::1");
        assert_eq!(
            generated_by("Resistor_SMD", &["R_0603".to_string()]),
            "KiCadImport::Resistor_SMD::R_0603"
        );
        assert_eq!(generated_by::<&str>("Lib", &[]), "KiCadImport::Lib");
    }

    #[test]
    fn test_library_names() {
        let lib = FootprintLibrary::new(PathBuf::from("/libs/Resistor_SMD.pretty"));
        assert_eq!(lib.name(), "Resistor_SMD");
        let lib = SymbolLibrary::new(PathBuf::from("/libs/Device.kicad_sym"));
        assert_eq!(lib.name(), "Device");
    }
}
