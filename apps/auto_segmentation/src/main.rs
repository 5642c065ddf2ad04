use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use dsf_client::{CancelToken, InterceptConnection};
use segmentation::{
    run_interception, Interpolator, InterpolatorOptions, CHANNELS, FILTERS, INTERCEPTION_MODE,
};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod config;

use config::{load_settings, Settings};

/// Splits every file-channel XY move at the midpoint of the previous and the
/// new target to soften direction changes.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// TOML configuration file (defaults to ./auto-segmentation.toml if present).
    #[arg(long)]
    config: Option<PathBuf>,
    /// Path of the controller's IPC socket.
    #[arg(long)]
    socket_path: Option<PathBuf>,
    /// Send replacement codes without the asynchronous flag.
    #[arg(long)]
    no_async_flag: bool,
}

impl Args {
    fn apply(&self, settings: &mut Settings) {
        if let Some(socket_path) = &self.socket_path {
            settings.socket_path = socket_path.clone();
        }
        if self.no_async_flag {
            settings.mark_asynchronous = false;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut settings = load_settings(args.config.as_deref())?;
    args.apply(&mut settings);

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.log_filter))
        .with_context(|| format!("invalid log filter '{}'", settings.log_filter))?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut connection = InterceptConnection::connect(
        &settings.socket_path,
        INTERCEPTION_MODE,
        &CHANNELS,
        &FILTERS,
    )
    .await
    .map_err(|error| {
        error!(
            socket = %settings.socket_path.display(),
            %error,
            "failed to connect to the control server; verify it is running and the socket path is correct"
        );
        error
    })?;

    let cancel = CancelToken::new();
    spawn_shutdown_listener(cancel.clone());

    let mut interpolator = Interpolator::new(InterpolatorOptions {
        mark_asynchronous: settings.mark_asynchronous,
    });
    let connection_id = connection.connection_id();
    run_interception(&mut connection, &mut interpolator, &cancel)
        .await
        .map_err(|error| {
            error!(
                connection_id,
                error = %format!("{error:#}"),
                "interception aborted"
            );
            error
        })?;
    info!(
        connection_id,
        server_version = connection.server_version(),
        "dsf: intercept connection closed"
    );

    Ok(())
}

fn spawn_shutdown_listener(cancel: CancelToken) {
    tokio::spawn(async move {
        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = terminate.recv() => {}
                }
            }
            Err(error) => {
                warn!(%error, "SIGTERM handler unavailable; only Ctrl+C stops the filter");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
        info!("shutdown requested; finishing the current code");
        cancel.cancel();
    });
}
