//! Configuration domain module

mod engine_config;

pub use engine_config::{EngineConfig, CONFIG_KEYS};
