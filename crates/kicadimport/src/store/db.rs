use crate::librepcb::ElementKind;
use crate::Result;
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{RwLock, RwLockReadGuard};
use uuid::Uuid;
use walkdir::WalkDir;

/// Catalog of the elements available in the workspace libraries
pub trait WorkspaceLibraryDb: Send + Sync {
    /// UUIDs of all elements of `kind` generated from the given source entity
    fn generated(&self, kind: ElementKind, generated_by: &str) -> Result<BTreeSet<Uuid>>;

    /// Directory of the newest version of an element
    fn latest(&self, kind: ElementKind, uuid: Uuid) -> Result<Option<PathBuf>>;

    /// Whether the catalog is currently being rebuilt
    fn is_scan_in_progress(&self) -> bool;
}

/// The part of an element document needed for the catalog
#[derive(Debug, Deserialize)]
struct ElementHeader {
    uuid: Uuid,
    version: String,
    #[serde(default)]
    generated_by: String,
}

#[derive(Debug, Default)]
struct Index {
    generated: HashMap<(ElementKind, String), BTreeSet<Uuid>>,
    latest: HashMap<(ElementKind, Uuid), (Vec<u64>, PathBuf)>,
}

impl Index {
    fn insert(&mut self, kind: ElementKind, header: ElementHeader, dir: PathBuf) {
        if !header.generated_by.is_empty() {
            self.generated
                .entry((kind, header.generated_by))
                .or_default()
                .insert(header.uuid);
        }
        let version = version_key(&header.version);
        match self.latest.get(&(kind, header.uuid)) {
            Some((existing, _)) if *existing >= version => {}
            _ => {
                self.latest.insert((kind, header.uuid), (version, dir));
            }
        }
    }
}

/// Numeric version segments, non-numeric segments count as zero
fn version_key(version: &str) -> Vec<u64> {
    version
        .split('.')
        .map(|s| s.trim().parse().unwrap_or(0))
        .collect()
}

/// Library database built by scanning library directories on disk
#[derive(Debug, Default)]
pub struct FsLibraryDb {
    roots: Vec<PathBuf>,
    index: RwLock<Index>,
    scanning: AtomicBool,
}

impl FsLibraryDb {
    pub fn new(roots: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            roots: roots.into_iter().collect(),
            ..Default::default()
        }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Rebuild the catalog from all library roots, returns the element count
    pub fn rescan(&self) -> usize {
        self.scanning.store(true, Ordering::SeqCst);
        let mut index = Index::default();
        let mut count = 0;
        for root in &self.roots {
            count += scan_root(root, &mut index);
        }
        *self.index.write().unwrap_or_else(|e| e.into_inner()) = index;
        self.scanning.store(false, Ordering::SeqCst);
        log::debug!("Library scan found {} elements", count);
        count
    }

    fn index(&self) -> RwLockReadGuard<'_, Index> {
        self.index.read().unwrap_or_else(|e| e.into_inner())
    }
}

fn scan_root(root: &Path, index: &mut Index) -> usize {
    let mut count = 0;
    let walker = WalkDir::new(root)
        .min_depth(3)
        .max_depth(3)
        .sort_by_file_name();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("Failed to scan library directory: {}", e);
                continue;
            }
        };
        let path = entry.path();
        let (Some(dir), Some(stem)) = (path.parent(), path.file_stem()) else {
            continue;
        };
        let kind_dir = dir.parent().and_then(|p| p.file_name());
        let Some(kind) = stem
            .to_str()
            .and_then(ElementKind::from_short_name)
            .filter(|k| kind_dir.and_then(|d| d.to_str()) == Some(k.short_name()))
        else {
            continue;
        };
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let header = std::fs::read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|c| serde_json::from_str::<ElementHeader>(&c).map_err(|e| e.to_string()));
        match header {
            Ok(header) => {
                index.insert(kind, header, dir.to_path_buf());
                count += 1;
            }
            Err(e) => log::warn!("Skipping invalid element {}: {}", path.display(), e),
        }
    }
    count
}

impl WorkspaceLibraryDb for FsLibraryDb {
    fn generated(&self, kind: ElementKind, generated_by: &str) -> Result<BTreeSet<Uuid>> {
        Ok(self
            .index()
            .generated
            .get(&(kind, generated_by.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    fn latest(&self, kind: ElementKind, uuid: Uuid) -> Result<Option<PathBuf>> {
        Ok(self
            .index()
            .latest
            .get(&(kind, uuid))
            .map(|(_, dir)| dir.clone()))
    }

    fn is_scan_in_progress(&self) -> bool {
        self.scanning.load(Ordering::SeqCst)
    }
}
