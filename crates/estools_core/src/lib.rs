pub mod client;
pub mod config;
pub mod copy;
pub mod index_config;
pub mod sync;
pub mod version;

#[cfg(test)]
mod testing;

/// Version string printed by `--verison`.
pub const TOOL_VERSION: &str = concat!("v", env!("CARGO_PKG_VERSION"));
