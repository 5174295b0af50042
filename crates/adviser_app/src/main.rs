mod config;
mod logging;

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use adviser_engine::{
    ClientSettings, ConsumerSettings, EventConsumer, SqliteStorage, StoreSettings,
    TelegramClient, TelegramProcessor,
};
use adviser_logging::{adviser_error, adviser_info};
use anyhow::Context;
use clap::Parser;
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;

use crate::config::{AppConfig, Cli};

/// How long a clean shutdown waits for blocking store calls to finish.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

fn main() -> ExitCode {
    let config = match Cli::parse().validate() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("read-adviser: {err}");
            return ExitCode::FAILURE;
        }
    };
    logging::initialize(config.log_destination, config.verbose);

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            adviser_error!("can't start async runtime: {err}");
            return ExitCode::FAILURE;
        }
    };

    let outcome = runtime.block_on(run(config));
    shut_down(runtime, outcome.is_err());
    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            adviser_error!("service is stopped: {err:#}");
            ExitCode::FAILURE
        }
    }
}

/// A store call that missed its deadline keeps its blocking thread busy.
/// After a failure nothing is waited for; a clean stop gets a short grace.
fn shut_down(runtime: Runtime, failed: bool) {
    if failed {
        runtime.shutdown_background();
    } else {
        runtime.shutdown_timeout(SHUTDOWN_GRACE);
    }
}

async fn run(config: AppConfig) -> anyhow::Result<()> {
    let store = SqliteStorage::open(&config.db_connection_string, StoreSettings::default())
        .await
        .context("can't connect to storage")?;
    let client = TelegramClient::new(&config.tg_bot_token, ClientSettings::default())
        .context("can't create telegram client")?;

    let processor = Arc::new(TelegramProcessor::new(client, store));
    let settings = ConsumerSettings {
        batch_size: config.batch_size,
        ..ConsumerSettings::default()
    };
    let consumer = EventConsumer::new(Arc::clone(&processor), processor, settings);

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                adviser_info!("shutdown requested");
                shutdown.cancel();
            }
        }
    });

    adviser_info!("service started");
    consumer.run(shutdown).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;

    fn runtime_with_stuck_job(stuck_for: Duration) -> Runtime {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .unwrap();
        let (started, running) = std::sync::mpsc::channel();
        runtime.spawn_blocking(move || {
            let _ = started.send(());
            std::thread::sleep(stuck_for);
        });
        running.recv().unwrap();
        runtime
    }

    #[test]
    fn failed_run_does_not_wait_for_blocking_jobs() {
        let runtime = runtime_with_stuck_job(Duration::from_secs(5));
        let started_at = Instant::now();

        shut_down(runtime, true);

        assert!(started_at.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn clean_stop_waits_at_most_the_grace_period() {
        let runtime = runtime_with_stuck_job(SHUTDOWN_GRACE * 3);
        let started_at = Instant::now();

        shut_down(runtime, false);

        let elapsed = started_at.elapsed();
        assert!(elapsed >= SHUTDOWN_GRACE / 2);
        assert!(elapsed < SHUTDOWN_GRACE * 2);
    }
}
