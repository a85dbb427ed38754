//! Selection of the elements to import
//!
//! A selected device needs its component and package, a selected component
//! needs its symbols. Such dependencies are selected implicitly and
//! deselected again once nothing needs them anymore. Explicit selections are
//! never changed.

use super::{CheckState, CheckStateChange, PipelineResult, SymbolEntry};
use crate::librepcb::ElementKind;
use std::collections::HashSet;

/// Apply a dependency, returns whether `state` changed
fn set_dependent(dependent: bool, state: &mut CheckState) -> bool {
    match (*state, dependent) {
        (CheckState::Unchecked, true) => {
            *state = CheckState::ImplicitlyChecked;
            true
        }
        (CheckState::ImplicitlyChecked, false) => {
            *state = CheckState::Unchecked;
            true
        }
        _ => false,
    }
}

impl SymbolEntry {
    fn needs_symbol_import(&self) -> bool {
        self.sym_checked.is_checked()
            && !self.sym_already_imported
            && self.gates.iter().any(|g| !g.already_imported)
    }

    pub(crate) fn needs_component_import(&self) -> bool {
        self.cmp_checked.is_checked() && !self.cmp_already_imported && self.extends.is_empty()
    }

    pub(crate) fn needs_device_import(&self) -> bool {
        self.dev_checked.is_checked()
            && !self.dev_already_imported
            && !self.pkg_generated_by.is_empty()
    }
}

impl PipelineResult {
    pub fn set_symbol_checked(
        &mut self,
        lib_name: &str,
        name: &str,
        checked: bool,
    ) -> Vec<CheckStateChange> {
        self.set_symbol_state(lib_name, name, checked, |s| &mut s.sym_checked)
    }

    pub fn set_component_checked(
        &mut self,
        lib_name: &str,
        name: &str,
        checked: bool,
    ) -> Vec<CheckStateChange> {
        self.set_symbol_state(lib_name, name, checked, |s| &mut s.cmp_checked)
    }

    pub fn set_device_checked(
        &mut self,
        lib_name: &str,
        name: &str,
        checked: bool,
    ) -> Vec<CheckStateChange> {
        self.set_symbol_state(lib_name, name, checked, |s| &mut s.dev_checked)
    }

    pub fn set_package_checked(
        &mut self,
        lib_name: &str,
        name: &str,
        checked: bool,
    ) -> Vec<CheckStateChange> {
        let state = CheckState::from_checked(checked);
        let mut modified = false;
        for lib in self.footprint_libs.iter_mut().filter(|l| l.name() == lib_name) {
            for fp in lib.footprints.iter_mut() {
                if fp.name == name && fp.checked != state {
                    fp.checked = state;
                    modified = true;
                }
            }
        }
        if modified {
            self.update_dependencies()
        } else {
            Vec::new()
        }
    }

    fn set_symbol_state(
        &mut self,
        lib_name: &str,
        name: &str,
        checked: bool,
        field: impl Fn(&mut SymbolEntry) -> &mut CheckState,
    ) -> Vec<CheckStateChange> {
        let state = CheckState::from_checked(checked);
        let mut modified = false;
        for lib in self.symbol_libs.iter_mut().filter(|l| l.name() == lib_name) {
            for sym in lib.symbols.iter_mut().filter(|s| s.name == name) {
                let current = field(sym);
                if *current != state {
                    *current = state;
                    modified = true;
                }
            }
        }
        if modified {
            self.update_dependencies()
        } else {
            Vec::new()
        }
    }

    /// Recompute all implicit selections, returns the changed ones
    pub fn update_dependencies(&mut self) -> Vec<CheckStateChange> {
        let mut dependent_components: HashSet<String> = HashSet::new();
        let mut dependent_packages: HashSet<String> = HashSet::new();
        for sym in self.symbol_libs.iter().flat_map(|l| &l.symbols) {
            if sym.needs_device_import() {
                dependent_components.insert(sym.cmp_generated_by.clone());
                dependent_packages.insert(sym.pkg_generated_by.clone());
            }
        }

        let mut changes = Vec::new();
        for lib in &mut self.symbol_libs {
            let lib_name = lib.name();
            for sym in lib.symbols.iter_mut().filter(|s| s.extends.is_empty()) {
                let dependent = dependent_components.contains(&sym.cmp_generated_by);
                if set_dependent(dependent, &mut sym.cmp_checked) {
                    changes.push(CheckStateChange {
                        kind: ElementKind::Component,
                        library: lib_name.clone(),
                        name: sym.name.clone(),
                        state: sym.cmp_checked,
                    });
                }
                if set_dependent(sym.cmp_checked.is_checked(), &mut sym.sym_checked) {
                    changes.push(CheckStateChange {
                        kind: ElementKind::Symbol,
                        library: lib_name.clone(),
                        name: sym.name.clone(),
                        state: sym.sym_checked,
                    });
                }
            }
        }

        for lib in &mut self.footprint_libs {
            let lib_name = lib.name();
            for fp in &mut lib.footprints {
                if set_dependent(dependent_packages.contains(&fp.generated_by), &mut fp.checked) {
                    changes.push(CheckStateChange {
                        kind: ElementKind::Package,
                        library: lib_name.clone(),
                        name: fp.name.clone(),
                        state: fp.checked,
                    });
                }
            }
        }
        changes
    }

    /// Whether any symbol or footprint was parsed
    pub fn has_elements(&self) -> bool {
        self.symbol_libs.iter().any(|l| !l.symbols.is_empty())
            || self.footprint_libs.iter().any(|l| !l.footprints.is_empty())
    }

    /// Number of elements the import would create
    pub fn pending_count(&self) -> usize {
        let packages = self
            .footprint_libs
            .iter()
            .flat_map(|l| &l.footprints)
            .filter(|fp| fp.checked.is_checked() && !fp.already_imported)
            .count();
        let mut elements = 0;
        for sym in self.symbol_libs.iter().flat_map(|l| &l.symbols) {
            if sym.sym_checked.is_checked() && !sym.sym_already_imported {
                elements += sym.gates.iter().filter(|g| !g.already_imported).count();
            }
            elements += usize::from(sym.needs_component_import());
            elements += usize::from(sym.needs_device_import());
        }
        packages + elements
    }

    /// Whether the import would create anything
    pub fn has_pending_import(&self) -> bool {
        self.symbol_libs.iter().flat_map(|l| &l.symbols).any(|s| {
            s.needs_symbol_import() || s.needs_component_import() || s.needs_device_import()
        }) || self
            .footprint_libs
            .iter()
            .flat_map(|l| &l.footprints)
            .any(|fp| fp.checked.is_checked() && !fp.already_imported)
    }
}
