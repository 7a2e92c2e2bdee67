//! Argo CD application API backend.

mod backend;
mod config;

pub use backend::ArgoCdDriver;
pub use config::ArgoCdDriverConfig;
