//! stagegate - entry point
//!
//! Serves the deployment review API and sweeps expired staging directories.

use std::collections::HashMap;
use std::env;

use stagegate::app::options::AppOptions;
use stagegate::app::run::run;
use stagegate::app::state::AppState;
use stagegate::errors::GateError;
use stagegate::logs::{init_logging, LogOptions};
use stagegate::storage::layout::StorageLayout;
use stagegate::storage::settings::Settings;
use stagegate::utils::version_info;

use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut cli_args: HashMap<String, String> = HashMap::new();

    for arg in args.iter().skip(1) {
        if let Some((key, value)) = arg.split_once('=') {
            let clean_key = key.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), value.to_string());
        } else if arg.starts_with("--") {
            let clean_key = arg.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), "true".to_string());
        }
    }

    // Print version and exit
    let version = version_info();
    if cli_args.contains_key("version") {
        match serde_json::to_string_pretty(&version) {
            Ok(json) => println!("{json}"),
            Err(e) => eprintln!("Failed to render version: {e}"),
        }
        return;
    }

    let layout = match cli_args.get("base-dir") {
        Some(dir) => StorageLayout::new(dir),
        None => StorageLayout::default(),
    };

    // Write a default settings file and exit
    if cli_args.contains_key("init") {
        if let Err(e) = init_layout(&layout).await {
            eprintln!("Failed to initialize {}: {e}", layout.base_dir.display());
            std::process::exit(1);
        }
        println!("Initialized {}", layout.base_dir.display());
        return;
    }

    let settings_file = layout.settings_file();
    let settings = if settings_file.exists().await {
        match settings_file.read_json::<Settings>().await {
            Ok(settings) => settings,
            Err(e) => {
                eprintln!("Unable to read settings file: {e}");
                std::process::exit(1);
            }
        }
    } else {
        Settings::default()
    };

    // Initialize logging
    let log_options = LogOptions {
        log_level: settings.log_level.clone(),
        log_dir: Some(layout.logs_dir().path().to_path_buf()),
        ..Default::default()
    };
    let _log_guard = match init_logging(log_options) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            None
        }
    };

    if !settings_file.exists().await {
        warn!(
            "No settings file at {}, running with defaults",
            settings_file.path().display()
        );
    }

    // Run one sweep and exit
    if cli_args.contains_key("cleanup") {
        if let Err(e) = run_cleanup(&layout, &settings).await {
            error!("Cleanup failed: {e}");
            std::process::exit(1);
        }
        return;
    }

    let options = AppOptions::from_settings(layout, &settings);
    info!("Running stagegate {} with options: {:?}", version.version, options);
    if let Err(e) = run(options, settings, await_shutdown_signal()).await {
        error!("Failed to run stagegate: {e}");
        std::process::exit(1);
    }
}

async fn init_layout(layout: &StorageLayout) -> Result<(), GateError> {
    layout.setup().await?;

    let settings_file = layout.settings_file();
    let settings = if settings_file.exists().await {
        settings_file.read_json::<Settings>().await?
    } else {
        let settings = Settings::default();
        settings_file.write_json(&settings).await?;
        settings
    };

    let roots = settings.target_roots(layout);
    for (_, root) in roots.all() {
        stagegate::filesys::dir::Dir::new(root).create().await?;
    }
    Ok(())
}

async fn run_cleanup(layout: &StorageLayout, settings: &Settings) -> Result<(), GateError> {
    let state = AppState::init(layout, settings).await?;
    let report = state.service.cleanup(settings.cleanup_days).await?;
    info!(
        removed = report.removed.len(),
        kept = report.kept,
        skipped = report.skipped,
        "Cleanup complete"
    );
    Ok(())
}

async fn await_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let (mut sigterm, mut sigint) =
            match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                (Ok(term), Ok(int)) => (term, int),
                _ => {
                    warn!("Unable to install signal handlers, falling back to Ctrl+C");
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };

        tokio::select! {
            _ = sigterm.recv() => {
                info!("SIGTERM received, shutting down...");
            }
            _ = sigint.recv() => {
                info!("SIGINT received, shutting down...");
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl+C received, shutting down...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {e}");
        }
        info!("Ctrl+C received, shutting down...");
    }
}
