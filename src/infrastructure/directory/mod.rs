//! Upstream directory client implementations

mod http_client;

pub use http_client::{DirectoryClientConfig, HttpDirectoryClient};
