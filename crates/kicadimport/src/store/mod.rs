//! Destination library storage and the workspace library catalog

mod db;
mod library;

pub use db::{FsLibraryDb, WorkspaceLibraryDb};
pub use library::LibraryStore;
