pub mod backend;
pub mod browser;
pub mod config;
pub mod errors;
pub mod models;
pub mod pipeline;
pub mod scoring;
pub mod summary;
pub mod trend;
pub mod upload;
pub mod utils;

#[cfg(feature = "api")]
pub mod api;
#[cfg(feature = "cli")]
pub mod cli;

pub use errors::GateError;

/// Version string with the build metadata embedded by `build.rs`.
pub fn version_info() -> String {
    match option_env!("GIT_HASH") {
        Some(hash) => format!("{} ({}, built {})", env!("CARGO_PKG_VERSION"), hash, env!("BUILD_TIMESTAMP")),
        None => format!("{} (built {})", env!("CARGO_PKG_VERSION"), env!("BUILD_TIMESTAMP")),
    }
}
