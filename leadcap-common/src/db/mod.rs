//! Database initialization, models and settings queries

pub mod init;
pub mod models;

pub use init::*;
pub use models::*;
