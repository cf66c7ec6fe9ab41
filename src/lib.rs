// Library exports for Scribe
// The binary, the integration tests and frontends built on the client core use these

pub mod blog;
pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod routes;
pub mod state;
