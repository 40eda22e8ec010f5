use anyhow::Result;
use clap::Parser;
use optica_cms::{config, db, instagram, mailer, outbox};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info, warn};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;
    cfg.ensure_dirs()?;

    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| format!("sqlite://{}/optica.db", cfg.app.data_dir));

    let pool = db::init_pool(&database_url).await?;
    db::run_migrations(&pool).await?;

    // Spawn outbox worker (single-threaded)
    let mailer = mailer::HttpMailer::from_config(&cfg);
    let worker_pool = pool.clone();
    let poll_sleep = Duration::from_millis(cfg.app.poll_interval_ms);
    let max_backoff = cfg.app.max_backoff_seconds as i64;
    tokio::spawn(async move {
        loop {
            match outbox::process_next_task(&worker_pool, &mailer, max_backoff).await {
                Ok(processed) => {
                    if !processed {
                        tokio::time::sleep(poll_sleep).await;
                    }
                }
                Err(err) => {
                    error!(?err, "outbox worker error");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }
    });

    // Mirror the Instagram feed on a slow cycle; each run is idempotent so a
    // failed cycle just waits for the next one.
    let api = instagram::GraphApiClient::from_config(&cfg);
    let mirror_limit = cfg.instagram.mirror_limit;
    let mirror_every = Duration::from_secs(15 * 60);

    info!("starting optica cms workers");
    loop {
        match instagram::mirror_feed(&pool, &api, mirror_limit).await {
            Ok(count) => info!(count, "instagram mirror cycle complete"),
            Err(err) => warn!(?err, "instagram mirror cycle failed"),
        }
        tokio::time::sleep(mirror_every).await;
    }
}
