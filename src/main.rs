use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use axum_prometheus::PrometheusMetricLayer;
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use contest_vote::config::AppConfig;
use contest_vote::contest::admin::{admin_router, AdminService};
use contest_vote::contest::domain::{AdminStatus, Participant, ParticipantId, UserId};
use contest_vote::contest::history::blob::parse_timestamp;
use contest_vote::contest::history::{reconstruct, ActorDirectory, ReconstructSettings};
use contest_vote::contest::lifecycle::ReasonCatalog;
use contest_vote::contest::voting::engine::RatingEngine;
use contest_vote::contest::voting::router::voting_router;
use contest_vote::contest::InMemoryContestStore;
use contest_vote::error::AppError;
use contest_vote::telemetry;
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
struct AppState {
    readiness: Arc<AtomicBool>,
    metrics: PrometheusHandle,
}

#[derive(Parser, Debug)]
#[command(
    name = "Contest Vote",
    about = "Run the contestant voting service or inspect participant status history",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Render a participant's reconstructed status history from a JSON blob
    History(HistoryArgs),
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    port: Option<u16>,
}

#[derive(Args, Debug)]
struct HistoryArgs {
    /// Path to the stored status history blob (any legacy encoding)
    #[arg(long)]
    blob: PathBuf,
    /// Participant creation timestamp
    #[arg(long, value_parser = parse_timestamp_arg)]
    created_at: DateTime<Utc>,
    /// Application submission timestamp
    #[arg(long, value_parser = parse_timestamp_arg)]
    submitted_at: DateTime<Utc>,
    /// Display offset in minutes east of UTC
    #[arg(long, default_value_t = 0)]
    offset_minutes: i32,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run_cli().await {
        eprintln!("application error: {err}");
        std::process::exit(1);
    }
}

async fn run_cli() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => run_server(args).await,
        Command::History(args) => run_history(args),
    }
}

fn parse_timestamp_arg(raw: &str) -> Result<DateTime<Utc>, String> {
    parse_timestamp(raw).ok_or_else(|| format!("failed to parse '{raw}' as a timestamp"))
}

async fn run_server(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let state = AppState {
        readiness: readiness_flag.clone(),
        metrics: prometheus_handle,
    };

    let store = seeded_store();
    let engine = Arc::new(RatingEngine::new(store.clone(), config.voting.clone()));
    let admin = Arc::new(AdminService::new(
        store,
        ReasonCatalog::standard(),
        seeded_directory(),
        config.voting.clone(),
    ));

    let app = Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .with_state(state)
        .merge(voting_router(engine))
        .merge(admin_router(admin))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "contest voting service ready");

    axum::serve(listener, app).await?;
    Ok(())
}

async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn readiness_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

async fn metrics_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

fn run_history(args: HistoryArgs) -> Result<(), AppError> {
    let raw = std::fs::read_to_string(&args.blob)?;
    let blob: serde_json::Value = serde_json::from_str(&raw)?;

    let settings = ReconstructSettings {
        resubmission_threshold: AppConfig::load()?.voting.resubmission_threshold(),
        display_offset: contest_vote::contest::history::display_offset(args.offset_minutes),
    };
    let history = reconstruct(
        &blob,
        args.created_at,
        args.submitted_at,
        &ActorDirectory::new(),
        &settings,
    );

    println!("Status history ({} entries)", history.entries.len());
    for entry in &history.entries {
        let week = entry
            .week
            .as_deref()
            .map(|week| format!(" [{week}]"))
            .unwrap_or_default();
        let reason = entry
            .reason
            .as_deref()
            .map(|reason| format!(" ({reason})"))
            .unwrap_or_default();
        println!(
            "- {} | {}{} | {}{}",
            entry.at.format("%Y-%m-%d %H:%M %:z"),
            entry.status,
            week,
            entry.actor,
            reason
        );
    }
    if history.anomalies > 0 {
        println!("Skipped {} unreadable fragment(s)", history.anomalies);
    }

    Ok(())
}

/// Dev-server seed so the HTTP surface is explorable out of the box.
fn seeded_store() -> Arc<InMemoryContestStore> {
    let store = Arc::new(InMemoryContestStore::default());
    let created = Utc::now();

    let entries = [
        ("p-100", "Anna K", AdminStatus::ThisWeek, false),
        ("p-101", "Marta L", AdminStatus::ThisWeek, false),
        ("p-102", "Elena V", AdminStatus::NextWeek, false),
        ("p-000", "Sample Entrant", AdminStatus::ThisWeek, true),
    ];
    for (id, name, status, is_sample) in entries {
        let participant = Participant {
            id: ParticipantId(id.to_string()),
            owner: UserId(format!("owner-{id}")),
            name: name.to_string(),
            location: Some("Riga".to_string()),
            admin_status: status,
            average_rating: 0.0,
            total_votes: 0,
            final_rank: None,
            status_history: json!([]),
            created_at: created,
            submitted_at: created,
            deleted_at: None,
            is_sample,
        };
        if let Err(err) = store.insert_participant(participant) {
            tracing::warn!(%err, id, "skipping seed participant");
        }
    }

    store
}

fn seeded_directory() -> ActorDirectory {
    let mut directory = ActorDirectory::new();
    directory.insert("17", "admin@contest.example");
    directory
}
