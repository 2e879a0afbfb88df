pub mod parser;
pub mod schema;
pub mod types;
pub mod security;

pub use types::*;
pub use parser::{parse_config, resolve_backend, resolve_scoring, resolve_upload, CliOverrides};
