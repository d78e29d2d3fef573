//! voicenote CLI entry point

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use voicenote::cli::{
    app::{
        config_store, load_merged_config, resolve_data_dir, run_cache, run_play, run_record,
        run_waveform, EXIT_ERROR,
    },
    args::{Cli, Commands},
    config_cmd::handle_config_command,
    presenter::Presenter,
};
use voicenote::domain::config::EngineConfig;

/// Log to stderr; RUST_LOG overrides the -v level
fn init_tracing(verbose: u8) {
    let default_directive = match verbose {
        0 => "voicenote=warn",
        1 => "voicenote=debug",
        _ => "voicenote=trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let presenter = Presenter::new();
    let store = config_store(cli.config.clone());

    // Config commands work on the file itself, not the merged view
    if let Commands::Config { action } = cli.command {
        if let Err(e) = handle_config_command(action, &store, &presenter).await {
            presenter.error(&e.to_string());
            return ExitCode::from(EXIT_ERROR);
        }
        return ExitCode::SUCCESS;
    }

    let cli_config = EngineConfig {
        data_dir: cli.data_dir.as_ref().map(|p| p.to_string_lossy().into_owned()),
        ..EngineConfig::empty()
    };
    let config = load_merged_config(&store, cli_config).await;
    let data_dir = resolve_data_dir(&config);

    match cli.command {
        Commands::Record(options) => run_record(options, &config, &data_dir).await,
        Commands::Play(options) => run_play(options, &config, &data_dir).await,
        Commands::Waveform(options) => run_waveform(options),
        Commands::Cache { action } => run_cache(action, &config, &data_dir).await,
        Commands::Config { .. } => ExitCode::SUCCESS,
    }
}
