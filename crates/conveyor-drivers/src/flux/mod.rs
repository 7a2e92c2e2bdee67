//! Flux kustomization bridge backend.

mod backend;
mod config;

pub use backend::FluxDriver;
pub use config::FluxDriverConfig;
