use crate::librepcb::LibraryElement;
use crate::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Destination library on disk
///
/// Elements are stored as `<root>/<kind>/<uuid>/<kind>.json`, attachments
/// (3D models) next to the document.
#[derive(Debug, Clone)]
pub struct LibraryStore {
    root: PathBuf,
}

impl LibraryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn element_dir<E: LibraryElement>(&self, uuid: Uuid) -> PathBuf {
        self.root.join(E::KIND.short_name()).join(uuid.to_string())
    }

    /// Write an element, returns its directory
    pub fn save<E: LibraryElement>(&self, element: &E) -> Result<PathBuf> {
        let dir = self.element_dir::<E>(element.uuid());
        if dir.exists() {
            return Err(Error::logic(format!(
                "Element directory '{}' exists already.",
                dir.display()
            )));
        }
        fs::create_dir_all(&dir).map_err(|e| Error::io(&dir, e))?;
        for (name, content) in element.attachments() {
            write_file(&dir.join(name), content)?;
        }
        let json = serde_json::to_string_pretty(element)?;
        write_file(&document_path::<E>(&dir), json.as_bytes())?;
        log::debug!(
            "Saved {} '{}' to {}",
            E::KIND.long_name(),
            element.meta().name,
            dir.display()
        );
        Ok(dir)
    }

    /// Read the element stored in `dir`
    pub fn open<E: LibraryElement>(dir: &Path) -> Result<E> {
        let path = document_path::<E>(dir);
        let content = fs::read_to_string(&path).map_err(|e| Error::io(&path, e))?;
        Ok(serde_json::from_str(&content)?)
    }
}

fn document_path<E: LibraryElement>(dir: &Path) -> PathBuf {
    dir.join(format!("{}.json", E::KIND.short_name()))
}

/// Write through a temporary file so readers never see partial documents
fn write_file(path: &Path, content: &[u8]) -> Result<()> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, content).map_err(|e| Error::io(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| Error::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::librepcb::{ElementMeta, Symbol};
    use std::collections::BTreeSet;

    fn symbol() -> Symbol {
        Symbol {
            meta: ElementMeta {
                uuid: Uuid::new_v4(),
                name: "R".to_string(),
                description: String::new(),
                keywords: String::new(),
                author: "KiCad Import".to_string(),
                version: "0.1".to_string(),
                generated_by: "KiCadImport::Device::R::1".to_string(),
                categories: BTreeSet::new(),
                resources: vec![],
            },
            pins: vec![],
            polygons: vec![],
            circles: vec![],
            texts: vec![],
        }
    }

    #[test]
    fn test_save_and_open() {
        let dir = tempfile::tempdir().unwrap();
        let store = LibraryStore::new(dir.path());
        let sym = symbol();
        let sym_dir = store.save(&sym).unwrap();
        assert_eq!(sym_dir, dir.path().join("sym").join(sym.meta.uuid.to_string()));
        assert!(sym_dir.join("sym.json").is_file());

        let loaded: Symbol = LibraryStore::open(&sym_dir).unwrap();
        assert_eq!(loaded, sym);
    }

    #[test]
    fn test_save_twice_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = LibraryStore::new(dir.path());
        let sym = symbol();
        store.save(&sym).unwrap();
        assert!(store.save(&sym).unwrap_err().is_logic());
    }
}
