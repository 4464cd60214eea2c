//! Configuration module for entity-linker

mod linker_config;

pub use linker_config::*;
