//! Rotation worker: advances the bird of the day on schedule.
//!
//! Runs as a single long-lived task per deployment. `--advance-now` performs
//! one advance and exits, for operators and cron-style deployments.

use std::ffi::OsString;
use std::sync::Arc;

use birdwatch::config::BirdwatchSettings;
use birdwatch::domain::{
    AttemptJitter, BirdOfTheDayService, Retrier, RetryRuntime, RotationScheduler,
    SchedulerRuntime, TokioSleeper,
};
use birdwatch::outbound::persistence::{
    DbPool, DieselBirdOfTheDayRepository, DieselBirdRepository, PoolConfig,
    run_pending_migrations,
};
use clap::Parser;
use color_eyre::eyre::{Context, Result};
use mockable::{Clock, DefaultClock};
use ortho_config::OrthoConfig as _;
use tokio::runtime::Builder;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

/// `birdwatch-rotation` command arguments.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "birdwatch-rotation",
    about = "Advance the bird of the day on a fixed interval",
    version
)]
struct CliArgs {
    /// Advance once immediately and exit.
    #[arg(long = "advance-now")]
    advance_now: bool,
    /// Database connection URL. Falls back to `BIRDWATCH_DATABASE_URL`.
    #[arg(long = "database-url", value_name = "url")]
    database_url: Option<String>,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let args = CliArgs::parse();
    let runtime = Builder::new_multi_thread()
        .enable_all()
        .build()
        .wrap_err("failed to build Tokio runtime")?;
    runtime.block_on(run(args))
}

async fn run(args: CliArgs) -> Result<()> {
    // Flags belong to `CliArgs`; settings come from the environment and
    // config file only.
    let settings = BirdwatchSettings::load_from_iter([OsString::from("birdwatch-rotation")])
        .wrap_err("failed to load settings")?;
    let database_url = match args.database_url {
        Some(url) => url,
        None => settings.database_url()?.to_owned(),
    };

    if settings.run_migrations {
        run_pending_migrations(&database_url).await?;
    }

    let pool = DbPool::new(PoolConfig::new(&database_url).with_max_size(settings.pool_max_size()?))
        .await
        .wrap_err("failed to create database pool")?;

    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
    let retrier = Retrier::new(settings.read_policy()?, RetryRuntime::default());
    let rotation = BirdOfTheDayService::new(
        Arc::new(DieselBirdRepository::new(pool.clone())),
        Arc::new(DieselBirdOfTheDayRepository::new(pool)),
        Arc::clone(&clock),
        retrier,
    );
    let scheduler = RotationScheduler::new(
        Arc::new(rotation),
        SchedulerRuntime {
            clock,
            sleeper: Arc::new(TokioSleeper),
            jitter: Arc::new(AttemptJitter),
        },
        settings.scheduler_config()?,
    );

    if args.advance_now {
        let bird_id = scheduler.advance_now().await?;
        info!(bird_id = bird_id.get(), "bird of the day advanced on request");
        return Ok(());
    }

    info!("bird of the day scheduler starting");
    scheduler.run_until(shutdown_signal()).await?;
    Ok(())
}

/// Resolve on Ctrl-C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            warn!(%error, "ctrl-c listener failed");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(error) => {
                warn!(%error, "SIGTERM listener failed");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
