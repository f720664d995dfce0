//! # Music Library Common
//!
//! Shared code for the music library service:
//! - Catalog models (songs, groups, edit requests)
//! - Database initialization and schema
//! - Bootstrap configuration loading
//! - Page request normalization
//! - Release date parsing and formatting

pub mod config;
pub mod db;
pub mod error;
pub mod pagination;
pub mod time;

pub use error::{Error, Result};
pub use pagination::PageRequest;
