//! whispr-core – Gemeinsame Typen
//!
//! Dieses Crate definiert die Identifikations- und Basistypen die von
//! allen anderen Whispr-Crates geteilt werden.

pub mod types;

pub use types::{ChannelId, ClientId, KanalTyp, PermissionZustand, UserId, UserRolle};
