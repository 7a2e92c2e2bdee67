//! Helm release bridge backend.

mod backend;
mod config;

pub use backend::HelmDriver;
pub use config::HelmDriverConfig;
