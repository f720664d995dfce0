//! Catalog consistency engine
//!
//! - `filter`: whitelisted, parameterized listing queries
//! - `reconcile`: group row maintenance when a song changes group
//! - `repository`: transactional add/edit/delete and reads

pub mod error;
pub mod filter;
pub mod reconcile;
pub mod repository;

pub use error::{CatalogError, CatalogResult};
pub use filter::{build_list_query, FilterColumn, FilterSet, ListQuery, QueryArg};
pub use reconcile::{reconcile_group, GroupChange};
pub use repository::{CatalogRepository, DeleteOutcome, EditOutcome};
