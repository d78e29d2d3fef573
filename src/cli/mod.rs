//! CLI layer - Command-line interface
//!
//! Contains argument parsing, output formatting, signal handling,
//! and the command runners.

pub mod app;
pub mod args;
pub mod cache_cmd;
pub mod config_cmd;
pub mod presenter;
pub mod signals;

// Re-export commonly used types
pub use app::{run_cache, run_play, run_record, run_waveform, EXIT_ERROR, EXIT_SUCCESS, EXIT_USAGE_ERROR};
pub use args::{CacheAction, Cli, Commands, ConfigAction, PlayOptions, RecordOptions, WaveformOptions};
pub use presenter::Presenter;
