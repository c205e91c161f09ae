//! Account profiles: lookup, field updates, and profile pictures.

pub mod handlers;
mod service;

pub use service::ProfileService;
