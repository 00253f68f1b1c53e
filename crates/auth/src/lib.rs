//! whispr-auth – Authentifizierung und Berechtigungen
//!
//! Dieses Crate buendelt Passwort-Hashing (Argon2id), den In-Memory
//! Token-Store fuer Bearer-Tokens, den AuthService und den
//! Berechtigungs-Evaluator (Rollen-Komposition, direkte Overrides,
//! Kanal-Overrides mit "Deny dominiert").

pub mod error;
pub mod password;
pub mod permissions;
pub mod seed;
pub mod service;
pub mod token;

// Bequeme Re-Exporte
pub use error::{AuthError, AuthResult};
pub use permissions::{keys, PermissionService};
pub use service::AuthService;
pub use token::{TokenEintrag, TokenStore};
