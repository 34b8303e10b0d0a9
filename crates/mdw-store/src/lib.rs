//! Client seams for the warehouse's external collaborators: the archive
//! store, the relational store, the catalog API, and the spreadsheet
//! endpoint. Each seam is an async trait plus one thin real client and one
//! in-memory stand-in used by tests.

mod archive;
mod catalog;
mod memory;
mod mysql;
mod relational;
mod sheet;

pub use archive::{ArchiveError, ArchiveObject, ArchiveStore, FsArchiveStore, MemoryArchiveStore};
pub use catalog::{CatalogApi, CatalogError, TmdbClient};
pub use memory::MemoryStore;
pub use mysql::MySqlStore;
pub use relational::{RelationalStore, StoreError};
pub use sheet::{MemorySheet, SheetError, SheetUpdate, SheetWriter, SheetsClient};
