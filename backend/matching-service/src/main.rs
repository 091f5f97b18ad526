use actix_web::{web, App, HttpServer};
use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::info;
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use matching_service::config::Config;
use matching_service::db::{PgDispatchQueue, PgJobStore, PgMatchStore, PgWorkerStore};
use matching_service::handlers::{self, health};
use matching_service::metrics::{DispatchMetrics, ReconcileMetrics};
use matching_service::middleware::JwtValidator;
use matching_service::services::geocoding::GEOCODER_MAX_REQUESTS_PER_SECOND;
use matching_service::services::{
    DispatchConfig, GeocodeReconciler, HttpMatchScorer, JobService, MatchDispatcher, MatchReader,
    PostcodesIoGeocoder,
};
use matching_service::AppState;
use resilience::Pacer;

fn init_tracing(production: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    let registry = tracing_subscriber::registry().with(filter);

    if production {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_target(true),
            )
            .init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate =
            signal(SignalKind::terminate()).expect("Failed to install SIGTERM handler");

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = terminate.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::from_env().context("Failed to load configuration")?;
    init_tracing(config.app.is_production());

    info!(
        env = %config.app.env,
        http_port = config.app.http_port,
        "Starting matching-service"
    );

    let pg_pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .acquire_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(&config.database.url)
        .await
        .context("Failed to connect to database")?;

    sqlx::migrate!("./migrations")
        .run(&pg_pool)
        .await
        .context("Failed to run database migrations")?;
    info!("Database pool ready and migrations applied");

    let workers = Arc::new(PgWorkerStore::new(pg_pool.clone()));
    let jobs = Arc::new(PgJobStore::new(pg_pool.clone()));
    let matches = Arc::new(PgMatchStore::new(pg_pool.clone()));
    let queue = Arc::new(PgDispatchQueue::new(pg_pool.clone()));

    let pacer = Pacer::with_interval(config.geocoder.min_interval())
        .context("Invalid GEOCODER_MIN_INTERVAL_MS")?;
    let min_interval = Duration::from_secs(1) / GEOCODER_MAX_REQUESTS_PER_SECOND;
    if pacer.interval() < min_interval {
        tracing::warn!(
            interval_ms = pacer.interval().as_millis() as u64,
            "Geocoder pacing is faster than the upstream request ceiling"
        );
    }

    let geocoder = Arc::new(
        PostcodesIoGeocoder::new(&config.geocoder.base_url, config.geocoder.timeout())
            .context("Failed to build geocoder client")?,
    );
    let reconciler = Arc::new(
        GeocodeReconciler::new(workers, geocoder, pacer).with_metrics(ReconcileMetrics::new()),
    );

    let scorer = Arc::new(
        HttpMatchScorer::new(
            &config.scorer.url,
            Duration::from_secs(config.scorer.timeout_secs),
            matches.clone(),
        )
        .context("Failed to build match scorer client")?,
    );

    let dispatcher = Arc::new(
        MatchDispatcher::new(
            queue,
            DispatchConfig {
                batch_size: config.dispatch.batch_size,
                poll_interval: Duration::from_secs(config.dispatch.poll_interval_secs),
                max_attempts: config.dispatch.max_attempts,
            },
        )
        .with_metrics(DispatchMetrics::new()),
    );

    let state = AppState {
        reconciler,
        jobs: Arc::new(JobService::new(jobs, dispatcher.clone())),
        matches: Arc::new(MatchReader::new(matches)),
        dispatcher: dispatcher.clone(),
    };
    let jwt = JwtValidator::new(&config.auth.jwt_secret);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut join_set = JoinSet::new();

    let processor = dispatcher.processor(scorer);
    join_set.spawn(async move {
        processor.run(shutdown_rx).await;
        Ok(())
    });

    let http_addr = format!("{}:{}", config.app.host, config.app.http_port);
    let http_pool = pg_pool.clone();
    let http_server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .app_data(web::Data::new(state.clone()))
            .app_data(web::Data::new(jwt.clone()))
            .app_data(web::Data::new(http_pool.clone()))
            .route("/ready", web::get().to(health::ready))
            .configure(handlers::configure)
    })
    .disable_signals()
    .bind(&http_addr)
    .context("Failed to bind HTTP server")?
    .run();
    let server_handle = http_server.handle();

    join_set.spawn(async move {
        http_server
            .await
            .map_err(|e| anyhow::anyhow!("HTTP server error: {}", e))
    });
    info!(addr = %http_addr, "HTTP server started");

    join_set.spawn(async move {
        shutdown_signal().await;
        info!("Shutdown signal received");
        let _ = shutdown_tx.send(true);
        server_handle.stop(true).await;
        Ok(())
    });

    while let Some(result) = join_set.join_next().await {
        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::error!("Task failed: {:#}", e);
                return Err(e);
            }
            Err(e) => {
                tracing::error!("Task panicked: {:#}", e);
                return Err(anyhow::anyhow!("Task panicked: {}", e));
            }
        }
    }

    info!("matching-service stopped");
    Ok(())
}
