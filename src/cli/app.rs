//! Runners for the record, play, waveform and cache commands

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use tokio::sync::Notify;
use tracing::{debug, warn};

use crate::application::ports::ConfigStore;
use crate::application::{
    AudioSessionArbiter, LoadOutcome, MediaCacheStore, PlayerConfig, PlayerController,
    RecorderConfig, RecorderController, StartOutcome,
};
use crate::domain::config::EngineConfig;
use crate::domain::duration::Duration;
use crate::domain::waveform::waveform_bars;
use crate::infrastructure::{
    CpalAudioInput, CpalRouting, DevicePermission, JsonFileStorage, LocalMediaFiles,
    RodioAudioOutput, SystemClock, XdgConfigStore,
};

use super::args::{CacheAction, PlayOptions, RecordOptions, WaveformOptions};
use super::cache_cmd::handle_cache_command;
use super::presenter::{format_playback, format_waveform, Presenter};
use super::signals::ShutdownSignal;

/// Exit codes
pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_ERROR: u8 = 1;
pub const EXIT_USAGE_ERROR: u8 = 2;

/// Bars kept in the live level display while recording
const LIVE_BARS: usize = 32;

/// Bars in the summary printed after a recording
const SUMMARY_BARS: usize = 40;

/// Config store for an explicit path or the XDG default
pub fn config_store(path: Option<PathBuf>) -> XdgConfigStore {
    match path {
        Some(path) => XdgConfigStore::with_path(path),
        None => XdgConfigStore::new(),
    }
}

/// Load and merge configuration: defaults < file < cli
pub async fn load_merged_config<S: ConfigStore>(store: &S, cli_config: EngineConfig) -> EngineConfig {
    let file_config = store.load().await.unwrap_or_else(|e| {
        warn!(path = %store.path().display(), error = %e, "ignoring unreadable config file");
        EngineConfig::empty()
    });

    EngineConfig::defaults().merge(file_config).merge(cli_config)
}

/// Directory holding recordings and the cache index
pub fn resolve_data_dir(config: &EngineConfig) -> PathBuf {
    match config.data_dir.as_deref() {
        Some(dir) if !dir.trim().is_empty() => PathBuf::from(dir),
        _ => dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("voicenote"),
    }
}

/// Cache index persisted under `<data_dir>/store`
pub fn build_cache(config: &EngineConfig, data_dir: &Path) -> Arc<MediaCacheStore> {
    let store = MediaCacheStore::new(
        Arc::new(JsonFileStorage::new(data_dir.join("store"))),
        Arc::new(LocalMediaFiles::new()),
        Arc::new(SystemClock),
    )
    .with_max_age(config.cache_max_age_or_default());
    Arc::new(store)
}

/// Record until the duration elapses or Ctrl+C is pressed
pub async fn run_record(options: RecordOptions, config: &EngineConfig, data_dir: &Path) -> ExitCode {
    let mut presenter = Presenter::new();

    let limit = match options.duration.as_deref().map(str::parse::<Duration>).transpose() {
        Ok(limit) => limit,
        Err(e) => {
            presenter.error(&format!("Invalid duration: {}", e));
            return ExitCode::from(EXIT_USAGE_ERROR);
        }
    };

    let mut recorder_config = RecorderConfig::from(config);
    if let Some(preset) = options.preset {
        recorder_config.preset = preset.into();
    }
    debug!(preset = %recorder_config.preset, ?limit, "recording requested");

    let arbiter = AudioSessionArbiter::new(Arc::new(CpalRouting::new()));
    let recorder = RecorderController::new(
        CpalAudioInput::new(data_dir.join("recordings")),
        DevicePermission::new(),
        LocalMediaFiles::new(),
        arbiter,
        recorder_config,
    );

    let shutdown = ShutdownSignal::new();
    shutdown.setup();

    match recorder.start().await {
        Ok(StartOutcome::Started) => {}
        Ok(StartOutcome::Degraded { reason }) => {
            presenter.warn(&format!("Audio routing not configured: {}", reason));
        }
        Err(e) => {
            presenter.error(&e.to_string());
            return ExitCode::from(EXIT_ERROR);
        }
    }

    presenter.start_spinner("Recording... (Ctrl+C to stop)");
    let spinner = presenter.spinner();
    let recent = Mutex::new(VecDeque::with_capacity(LIVE_BARS));
    let metering = recorder.subscribe_metering(move |level| {
        let mut recent = recent.lock().unwrap_or_else(PoisonError::into_inner);
        if recent.len() == LIVE_BARS {
            recent.pop_front();
        }
        recent.push_back(*level);
        if let Some(spinner) = &spinner {
            let bars: Vec<f32> = recent.iter().copied().collect();
            spinner.set_message(format!("Recording {} (Ctrl+C to stop)", format_waveform(&bars)));
        }
    });

    match limit {
        Some(limit) => {
            tokio::select! {
                _ = tokio::time::sleep(limit.as_std()) => debug!("recording limit reached"),
                _ = shutdown.wait() => debug!("recording stopped by interrupt"),
            }
        }
        None => shutdown.wait().await,
    }
    metering.dispose();

    let result = match recorder.stop().await {
        Ok(result) => result,
        Err(e) => {
            presenter.spinner_fail(&e.to_string());
            return ExitCode::from(EXIT_ERROR);
        }
    };

    presenter.spinner_success(&format!(
        "Recorded {:.1}s ({})",
        result.duration,
        result.human_readable_size()
    ));

    if options.json {
        return print_json(&presenter, &result);
    }

    presenter.output(&result.uri);
    let summary = waveform_bars(&result.metering_values, SUMMARY_BARS, Some(&result.uri));
    presenter.info(&format_waveform(&summary));
    ExitCode::from(EXIT_SUCCESS)
}

/// Play a file or URL until it ends or Ctrl+C is pressed
pub async fn run_play(options: PlayOptions, config: &EngineConfig, data_dir: &Path) -> ExitCode {
    let mut presenter = Presenter::new();

    let arbiter = AudioSessionArbiter::new(Arc::new(CpalRouting::new()));
    let mut player = PlayerController::new(RodioAudioOutput::new(), arbiter, PlayerConfig::from(config));
    if !options.no_cache {
        player = player.with_cache(build_cache(config, data_dir));
    }

    let shutdown = ShutdownSignal::new();
    shutdown.setup();

    presenter.start_spinner(&format!("Loading {}", options.uri));
    let spinner = presenter.spinner();
    let ended = Arc::new(Notify::new());
    let listener_ended = ended.clone();

    let loaded = player
        .load(&options.uri, move |status| {
            if !status.is_loaded {
                listener_ended.notify_one();
                return;
            }
            if let Some(spinner) = &spinner {
                spinner.set_message(format_playback(status));
            }
        })
        .await;

    let (outcome, subscription) = match loaded {
        Ok(loaded) => loaded,
        Err(e) => {
            presenter.spinner_fail(&e.to_string());
            return ExitCode::from(EXIT_ERROR);
        }
    };

    if let LoadOutcome::Degraded { reason, .. } = &outcome {
        presenter.warn(&format!("Audio routing not configured: {}", reason));
    }
    if outcome.from_cache() {
        debug!(uri = %options.uri, "playing cached replica");
    }

    let interrupted = tokio::select! {
        _ = ended.notified() => false,
        _ = shutdown.wait() => true,
    };

    player.unload().await;
    subscription.dispose();

    if interrupted {
        presenter.spinner_fail("Stopped");
    } else {
        presenter.spinner_success(&format!("Played {}", options.uri));
    }
    ExitCode::from(EXIT_SUCCESS)
}

/// Print bar heights for a sample series
pub fn run_waveform(options: WaveformOptions) -> ExitCode {
    let presenter = Presenter::new();
    let bars = waveform_bars(&options.samples, options.bars, options.id.as_deref());

    if options.json {
        return print_json(&presenter, &bars);
    }

    presenter.output(&format_waveform(&bars));
    ExitCode::from(EXIT_SUCCESS)
}

/// Run a cache subcommand against the index in `data_dir`
pub async fn run_cache(action: CacheAction, config: &EngineConfig, data_dir: &Path) -> ExitCode {
    let presenter = Presenter::new();
    let cache = build_cache(config, data_dir);

    match handle_cache_command(action, &cache, &presenter).await {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(e) => {
            presenter.error(&e.to_string());
            ExitCode::from(EXIT_ERROR)
        }
    }
}

fn print_json<T: Serialize + ?Sized>(presenter: &Presenter, value: &T) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            presenter.output(&json);
            ExitCode::from(EXIT_SUCCESS)
        }
        Err(e) => {
            presenter.error(&format!("Failed to serialize output: {}", e));
            ExitCode::from(EXIT_ERROR)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::ConfigError;
    use async_trait::async_trait;

    struct FixedStore(Result<EngineConfig, ()>);

    #[async_trait]
    impl ConfigStore for FixedStore {
        async fn load(&self) -> Result<EngineConfig, ConfigError> {
            self.0
                .clone()
                .map_err(|_| ConfigError::ParseError("bad toml".into()))
        }

        async fn save(&self, _config: &EngineConfig) -> Result<(), ConfigError> {
            Ok(())
        }

        fn path(&self) -> PathBuf {
            PathBuf::from("/mock/config.toml")
        }

        fn exists(&self) -> bool {
            true
        }
    }

    #[tokio::test]
    async fn merged_config_prefers_cli_over_file() {
        let file = EngineConfig {
            preset: Some("low".into()),
            data_dir: Some("/from/file".into()),
            ..EngineConfig::empty()
        };
        let cli = EngineConfig {
            data_dir: Some("/from/cli".into()),
            ..EngineConfig::empty()
        };

        let config = load_merged_config(&FixedStore(Ok(file)), cli).await;
        assert_eq!(config.preset.as_deref(), Some("low"));
        assert_eq!(config.data_dir.as_deref(), Some("/from/cli"));
        assert!(config.metering_interval.is_some());
    }

    #[tokio::test]
    async fn unreadable_config_falls_back_to_defaults() {
        let config = load_merged_config(&FixedStore(Err(())), EngineConfig::empty()).await;
        assert_eq!(config, EngineConfig::defaults());
    }

    #[test]
    fn data_dir_from_config() {
        let config = EngineConfig {
            data_dir: Some("/srv/voicenote".into()),
            ..EngineConfig::empty()
        };
        assert_eq!(resolve_data_dir(&config), PathBuf::from("/srv/voicenote"));
    }

    #[test]
    fn blank_data_dir_uses_platform_default() {
        let config = EngineConfig {
            data_dir: Some("  ".into()),
            ..EngineConfig::empty()
        };
        assert!(resolve_data_dir(&config).ends_with("voicenote"));
    }

    #[test]
    fn cache_uses_configured_max_age() {
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig {
            cache_max_age: Some("2d".into()),
            ..EngineConfig::empty()
        };
        let cache = build_cache(&config, dir.path());
        assert_eq!(cache.max_age(), Duration::from_days(2));
    }
}
