// HTTP request handlers module
// Thin adapters from requests to the services in `crate::services`

pub mod cleanup;
pub mod download;
pub mod health;
pub mod index;
pub mod upload;
