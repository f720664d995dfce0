//! Services backing the HTTP API

pub mod metadata_client;

pub use metadata_client::{HttpMetadataClient, MetadataError, MetadataProvider, SongDetails};
