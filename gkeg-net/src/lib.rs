// gkeg-net/src/lib.rs
pub mod http;
pub mod validation;

pub use http::{fetch_resource, fetch_source, resource_cache_path, source_cache_path};
pub use validation::{validate_url, FetchScheme};
