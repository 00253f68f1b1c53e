//! whispr-db – Persistenz-Abstraktion
//!
//! Dieses Crate stellt das Repository-Pattern bereit: die Kernlogik haengt
//! nur von den Traits in [`repository`] ab, waehrend [`sqlite`] (Standard)
//! und [`memory`] (Tests, fluechtiger Betrieb) dieselbe Schnittstelle
//! implementieren.

pub mod error;
pub mod memory;
pub mod models;
pub mod repository;
pub mod sqlite;

// Bequeme Re-Exporte
pub use error::DbError;
pub use memory::MemoryDb;
pub use repository::{
    ChannelRepository, DbResult, MessageRepository, PermissionRepository, UserRepository,
};
pub use sqlite::SqliteDb;
