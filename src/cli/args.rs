//! CLI argument definitions using Clap

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::domain::cache::MediaType;
use crate::domain::recording::RecordingPreset;

/// Default number of bars for the `waveform` command
pub const DEFAULT_BAR_COUNT: usize = 40;

/// voicenote - record, play back and cache voice messages
#[derive(Parser, Debug)]
#[command(name = "voicenote")]
#[command(version)]
#[command(about = "Record, play back and cache voice messages")]
#[command(long_about = None)]
pub struct Cli {
    /// Directory for recordings and the media cache index
    #[arg(long, global = true, value_name = "DIR", env = "VOICENOTE_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Config file to use instead of the XDG default
    #[arg(long, global = true, value_name = "FILE", env = "VOICENOTE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short = 'v', long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Record a voice message from the default microphone
    Record(RecordOptions),
    /// Play a local file or HTTP(S) URL
    Play(PlayOptions),
    /// Render waveform bars from amplitude samples
    Waveform(WaveformOptions),
    /// Inspect and manage the media cache index
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Args, Debug, Clone)]
pub struct RecordOptions {
    /// Stop automatically after this long (e.g., 10s, 1m, 2m30s); otherwise Ctrl+C stops
    #[arg(short = 'd', long, value_name = "TIME")]
    pub duration: Option<String>,

    /// Encoder preset
    #[arg(short = 'p', long, value_name = "PRESET")]
    pub preset: Option<PresetArg>,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct PlayOptions {
    /// File path or URL to play
    pub uri: String,

    /// Skip the media cache and always open the source
    #[arg(long)]
    pub no_cache: bool,
}

#[derive(Args, Debug, Clone)]
pub struct WaveformOptions {
    /// Number of bars to produce
    #[arg(short = 'n', long, default_value_t = DEFAULT_BAR_COUNT)]
    pub bars: usize,

    /// Message identifier seeding the placeholder pattern when there are no samples
    #[arg(long, value_name = "ID")]
    pub id: Option<String>,

    /// Print the bar heights as a JSON array instead of drawing them
    #[arg(long)]
    pub json: bool,

    /// Normalized amplitude samples
    #[arg(value_name = "SAMPLE", allow_negative_numbers = true)]
    pub samples: Vec<f32>,
}

/// Cache subcommands
#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// Show totals over fresh entries
    Stats {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// List fresh entries
    List,
    /// Record a local replica for a remote key
    Put {
        /// Remote URL or key
        key: String,
        /// Local file holding the replica
        path: String,
        /// Kind of media
        #[arg(short = 't', long = "type", default_value = "voice")]
        media_type: MediaTypeArg,
    },
    /// Print the local path for a key, if fresh
    Resolve { key: String },
    /// Forget one entry
    Remove { key: String },
    /// Evict expired entries
    Prune,
    /// Drop the whole index
    Clear,
}

/// Config action subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Create config file with defaults
    Init,
    /// Set a config value
    Set {
        /// Config key
        key: String,
        /// Config value
        value: String,
    },
    /// Get a config value
    Get {
        /// Config key
        key: String,
    },
    /// List all config values
    List,
    /// Show config file path
    Path,
}

/// Preset argument for clap ValueEnum
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum PresetArg {
    High,
    Low,
}

impl From<PresetArg> for RecordingPreset {
    fn from(arg: PresetArg) -> Self {
        match arg {
            PresetArg::High => RecordingPreset::HighQuality,
            PresetArg::Low => RecordingPreset::LowQuality,
        }
    }
}

/// Media type argument for clap ValueEnum
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum MediaTypeArg {
    Image,
    Voice,
}

impl From<MediaTypeArg> for MediaType {
    fn from(arg: MediaTypeArg) -> Self {
        match arg {
            MediaTypeArg::Image => MediaType::Image,
            MediaTypeArg::Voice => MediaType::Voice,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_parses_record_defaults() {
        let cli = Cli::parse_from(["voicenote", "record"]);
        let Commands::Record(options) = cli.command else {
            panic!("Expected record command");
        };
        assert!(options.duration.is_none());
        assert!(options.preset.is_none());
        assert!(!options.json);
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn cli_parses_record_options() {
        let cli = Cli::parse_from(["voicenote", "record", "-d", "30s", "-p", "low", "--json"]);
        let Commands::Record(options) = cli.command else {
            panic!("Expected record command");
        };
        assert_eq!(options.duration, Some("30s".to_string()));
        assert_eq!(options.preset, Some(PresetArg::Low));
        assert!(options.json);
    }

    #[test]
    fn cli_parses_global_options_after_subcommand() {
        let cli = Cli::parse_from(["voicenote", "play", "a.flac", "--data-dir", "/tmp/vn", "-vv"]);
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/vn")));
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Commands::Play(PlayOptions { ref uri, no_cache: false }) if uri == "a.flac"));
    }

    #[test]
    fn cli_parses_waveform_samples() {
        let cli = Cli::parse_from(["voicenote", "waveform", "-n", "4", "0.1", "0.9", "-0.5"]);
        let Commands::Waveform(options) = cli.command else {
            panic!("Expected waveform command");
        };
        assert_eq!(options.bars, 4);
        assert_eq!(options.samples, vec![0.1, 0.9, -0.5]);
    }

    #[test]
    fn cli_parses_cache_put() {
        let cli = Cli::parse_from([
            "voicenote", "cache", "put", "https://cdn/a.jpg", "/tmp/a.jpg", "--type", "image",
        ]);
        if let Commands::Cache {
            action: CacheAction::Put { key, path, media_type },
        } = cli.command
        {
            assert_eq!(key, "https://cdn/a.jpg");
            assert_eq!(path, "/tmp/a.jpg");
            assert_eq!(MediaType::from(media_type), MediaType::Image);
        } else {
            panic!("Expected cache put command");
        }
    }

    #[test]
    fn cli_parses_config_set() {
        let cli = Cli::parse_from(["voicenote", "config", "set", "preset", "low"]);
        if let Commands::Config {
            action: ConfigAction::Set { key, value },
        } = cli.command
        {
            assert_eq!(key, "preset");
            assert_eq!(value, "low");
        } else {
            panic!("Expected Config Set command");
        }
    }

    #[test]
    fn preset_arg_converts() {
        assert_eq!(RecordingPreset::from(PresetArg::High), RecordingPreset::HighQuality);
        assert_eq!(RecordingPreset::from(PresetArg::Low), RecordingPreset::LowQuality);
    }

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }
}
