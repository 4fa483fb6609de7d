//! Deployify - Entry Point
//!
//! Runs the deployment daemon, or a single deployment with `--deploy`.

use std::collections::HashMap;
use std::env;

use anyhow::{anyhow, Context};
use colored::Colorize;
use deployify::app::options::AppOptions;
use deployify::app::run::run;
use deployify::app::state::AppState;
use deployify::deploy::fsm::DeploymentStatus;
use deployify::deploy::orchestrator::record_duration;
use deployify::logs::{init_logging, LogOptions};
use deployify::models::deployment::{Budget, DeploymentRequest, Environment};
use deployify::storage::layout::StorageLayout;
use deployify::storage::settings::Settings;
use deployify::utils::{format_duration, version_info};

use tracing::{error, info};

#[tokio::main]
async fn main() {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut cli_args: HashMap<String, String> = HashMap::new();

    for arg in args.iter().skip(1) {
        if let Some((key, value)) = arg.split_once('=') {
            // Handle --key=value format
            let clean_key = key.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), value.to_string());
        } else if arg.starts_with("--") {
            // Handle standalone flags like --version
            let clean_key = arg.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), "true".to_string());
        }
    }

    // Print version and exit
    let version = version_info();
    if cli_args.contains_key("version") {
        match serde_json::to_string_pretty(&version) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Failed to serialize version info: {e}"),
        }
        return;
    }

    let layout = match cli_args.get("base-dir") {
        Some(dir) => StorageLayout::new(dir),
        None => StorageLayout::default(),
    };

    // Retrieve the settings file, defaults when absent
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

    // One-shot deployment
    if cli_args.contains_key("deploy") {
        let log_options = LogOptions {
            log_level: settings.log_level.clone(),
            ..Default::default()
        };
        if let Err(e) = init_logging(log_options) {
            println!("Failed to initialize logging: {e}");
        }

        let options = AppOptions::from_settings(settings, layout);
        if let Err(e) = deploy_once(&cli_args, options).await {
            eprintln!("{} {:#}", "error:".red().bold(), e);
            std::process::exit(1);
        }
        return;
    }

    // Initialize logging
    let log_options = LogOptions {
        log_level: settings.log_level.clone(),
        json_format: settings.log_json,
        log_dir: Some(layout.logs_dir().path().to_path_buf()),
        ..Default::default()
    };
    let _log_guard = match init_logging(log_options) {
        Ok(guard) => guard,
        Err(e) => {
            println!("Failed to initialize logging: {e}");
            None
        }
    };

    // Run the daemon
    let options = AppOptions::from_settings(settings, layout);
    info!("Running Deployify with options: {:?}", options);
    let result = run(version.version, options, await_shutdown_signal()).await;
    if let Err(e) = result {
        error!("Failed to run the daemon: {e}");
        std::process::exit(1);
    }
}

/// Run a single deployment in the foreground and print the final record
async fn deploy_once(cli_args: &HashMap<String, String>, options: AppOptions) -> anyhow::Result<()> {
    let repo_url = cli_args
        .get("repo")
        .ok_or_else(|| anyhow!("--repo=<https url> is required with --deploy"))?;
    let environment: Environment = cli_args
        .get("env")
        .map(String::as_str)
        .unwrap_or("school")
        .parse()
        .map_err(|e: String| anyhow!(e))?;
    let budget: Budget = cli_args
        .get("budget")
        .map(String::as_str)
        .unwrap_or("free")
        .parse()
        .map_err(|e: String| anyhow!(e))?;

    let mut request = DeploymentRequest::new(repo_url.clone(), environment, budget);
    if let Some(branch) = cli_args.get("branch") {
        request.branch = branch.clone();
    }
    if let Some(prefer) = cli_args.get("prefer") {
        request.prefer_providers = prefer
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect();
    }

    let (state, mut jobs) = AppState::init(
        &options.storage,
        options.build.clone(),
        options.clone_timeout,
        options.providers,
        1,
    )
    .await
    .context("failed to initialize application state")?;

    let id = state
        .queue
        .submit(request)
        .await
        .context("deployment request rejected")?;
    let queued = jobs
        .recv()
        .await
        .ok_or_else(|| anyhow!("job queue closed before deployment {} was picked up", id))?;

    let record = state
        .orchestrator
        .run_job(&queued)
        .await
        .with_context(|| format!("deployment {} could not be processed", queued))?;

    println!("{}", serde_json::to_string_pretty(&record)?);

    let duration = record_duration(&record)
        .map(|secs| format_duration(std::time::Duration::from_secs(secs.max(0) as u64)))
        .unwrap_or_else(|| "-".to_string());
    match record.status {
        DeploymentStatus::Success => println!(
            "{} {} via {} in {}",
            "Deployed".green().bold(),
            record.deployment_url.as_deref().unwrap_or("-"),
            record.provider.as_deref().unwrap_or("-"),
            duration
        ),
        status => println!(
            "{} {}: {}",
            status.to_string().red().bold(),
            record.id,
            record.error_message.as_deref().unwrap_or("-")
        ),
    }

    if record.status != DeploymentStatus::Success {
        return Err(anyhow!("deployment {} ended as {}", record.id, record.status));
    }
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
                    error!("Failed to install signal handlers, falling back to Ctrl+C");
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
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        info!("Ctrl+C received, shutting down...");
    }
}
