//! Authentication module for the LinkUp server
//!
//! Credential checks (registration, login), session token issuance and
//! verification, and the cookie-based extractor guarding protected routes.

pub mod handlers;
mod middleware;
mod password;
mod service;
mod token;

pub use middleware::AuthenticatedAccount;
pub use password::CredentialHasher;
pub use service::{AuthService, Registration, Session};
pub use token::{Claims, TokenSigner};

pub const MIN_PASSWORD_LENGTH: usize = 6;
