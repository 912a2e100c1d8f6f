mod candidates;
mod config;
mod db;
mod errors;
mod extraction;
mod models;
mod routes;
mod schema;
mod scoring;
mod state;

use std::fs::File;
use std::io::BufWriter;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::{create_pool, init_schema};
use crate::extraction::build_extractor;
use crate::extraction::gate::GpuGate;
use crate::extraction::model::GenerativeModel;
use crate::extraction::ollama::OllamaModel;
use crate::routes::build_router;
use crate::scoring::build_scorer;
use crate::scoring::logistic::{accuracy, train, LogisticScorer, TrainingParams};
use crate::scoring::synthetic::{write_csv, SyntheticDataGenerator, DEFAULT_NOISE_RATE};
use crate::state::AppState;

#[derive(Debug, Parser)]
#[command(name = "retention-api", version, about = "Resume analysis and retention scoring API")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Train the logistic scorer on synthetic data and write the model file
    TrainScorer {
        /// Number of synthetic samples
        #[arg(long, default_value_t = 1000)]
        samples: usize,

        #[arg(long, default_value_t = 42)]
        seed: u64,

        #[arg(long, default_value_t = 500)]
        epochs: usize,

        #[arg(long, default_value_t = 0.1)]
        learning_rate: f64,

        /// Share of labels flipped at random
        #[arg(long, default_value_t = DEFAULT_NOISE_RATE)]
        noise: f64,

        /// Output path; defaults to SCORER_MODEL_PATH
        #[arg(long)]
        out: Option<PathBuf>,

        /// Also dump the generated samples as CSV
        #[arg(long)]
        csv: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration first (fails on malformed env vars)
    let config = Config::from_env()?;

    // Initialize structured logging; RUST_LOG wins, LOG_LEVEL covers this crate otherwise
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.log_level))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::TrainScorer {
            samples,
            seed,
            epochs,
            learning_rate,
            noise,
            out,
            csv,
        } => {
            let params = TrainingParams {
                epochs,
                learning_rate,
                ..TrainingParams::default()
            };
            let out = out.unwrap_or_else(|| config.scorer_model_path.clone());
            train_scorer(samples, seed, noise, &params, &out, csv)
        }
    }
}

async fn serve(config: Config) -> Result<()> {
    info!("Starting retention API v{}", env!("CARGO_PKG_VERSION"));

    tokio::fs::create_dir_all(&config.upload_dir)
        .await
        .with_context(|| format!("Failed to create upload dir {}", config.upload_dir.display()))?;

    // Initialize SQLite
    let db = create_pool(&config.database_url).await?;
    init_schema(&db).await?;

    // Initialize the model backend
    let model: Arc<dyn GenerativeModel> = Arc::new(
        OllamaModel::new(
            &config.model_endpoint,
            &config.model_name,
            &config.model_api_key,
            Duration::from_secs(config.model_timeout_secs),
        )
        .context("Failed to build model client")?,
    );

    let gate = (config.gpu_permits > 0).then(|| GpuGate::new("gpu", config.gpu_permits));
    match &gate {
        Some(gate) => info!("GPU gate enabled ({} permit(s))", gate.permits()),
        None => warn!("GPU gate disabled; generations are not serialized"),
    }

    info!("Loading model {} via {}", config.model_name, config.model_endpoint);
    let loaded = match &gate {
        Some(gate) => gate.with_exclusive_access(|| model.load()).await?,
        None => model.load().await,
    };
    loaded.with_context(|| format!("Failed to load model {}", config.model_name))?;
    info!("Model {} loaded", model.name());

    let scorer = build_scorer(&config)?;
    info!("Retention scorer: {}", scorer.backend());

    let extractor = build_extractor(
        config.extraction_mode,
        model.clone(),
        config.generation_params(),
    );
    info!("Extraction mode: {}", extractor.mode().as_str());

    let state = AppState {
        db,
        config: config.clone(),
        extractor,
        gate: gate.clone(),
        scorer,
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped; releasing model");
    let released = match &gate {
        Some(gate) => gate.drain_and_close(|| model.unload()).await?,
        None => model.unload().await,
    };
    if let Err(e) = released {
        warn!("Failed to unload model: {e}");
    }

    Ok(())
}

fn train_scorer(
    samples: usize,
    seed: u64,
    noise: f64,
    params: &TrainingParams,
    out: &Path,
    csv: Option<PathBuf>,
) -> Result<()> {
    info!("Generating {samples} synthetic samples (seed {seed}, noise {noise})");
    let data = SyntheticDataGenerator::new(seed)
        .with_noise(noise)
        .generate(samples);

    if let Some(path) = csv {
        let file = File::create(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        write_csv(&data, BufWriter::new(file))?;
        info!("Samples written to {}", path.display());
    }

    // 80/20 split; samples are independent draws
    let split = data.len() * 4 / 5;
    let (train_set, test_set) = data.split_at(split);

    let model = train(train_set, params).context("Training failed")?;
    info!("Training accuracy: {:.3}", accuracy(&model, train_set));
    if !test_set.is_empty() {
        info!(
            "Held-out accuracy: {:.3} on {} samples",
            accuracy(&model, test_set),
            test_set.len()
        );
    }

    let scorer = LogisticScorer::new(model)?;
    scorer
        .save(out)
        .with_context(|| format!("Failed to write model to {}", out.display()))?;
    for (name, weight) in scorer.model().feature_names.iter().zip(&scorer.model().weights) {
        debug!(feature = %name, weight, "fitted weight");
    }
    info!("Model written to {}", out.display());
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
