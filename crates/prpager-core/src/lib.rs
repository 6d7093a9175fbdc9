//! Core configuration and logging for prpager

mod config;
mod logging;

pub use config::{
    ChunkingConfig, Config, LoggingConfig, PaginationConfig, CURRENT_CONFIG_VERSION,
};
pub use logging::init_logging;
