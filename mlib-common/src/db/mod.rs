//! Database models and schema

pub mod init;
pub mod keys;
pub mod models;

pub use init::*;
pub use keys::fold_key;
pub use models::*;
