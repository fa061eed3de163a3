use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use sqlx::PgPool;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use koopwijs_core::analysis::AnalysisPipeline;
use koopwijs_core::config::Settings;
use koopwijs_core::domain::analysis::{AnalysisResult, AnalysisStatus};
use koopwijs_core::domain::bidding::AdviceSet;
use koopwijs_core::domain::finding::{Finding, RiskCategory, RiskLevel};
use koopwijs_core::domain::risk::RiskScore;
use koopwijs_core::market::intelligence::MarketIntelligence;
use koopwijs_core::market::MarketData;
use koopwijs_core::storage::documents::PgDocumentSource;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let pool: Option<PgPool> = match settings.require_database_url() {
        Ok(db_url) => match sqlx::postgres::PgPoolOptions::new()
            .max_connections(5)
            .connect(db_url)
            .await
        {
            Ok(pool) => match koopwijs_core::storage::migrate(&pool).await {
                Ok(()) => Some(pool),
                Err(e) => {
                    sentry_anyhow::capture_anyhow(&e);
                    tracing::error!(error = %e, "db migrations failed; starting API in degraded mode");
                    None
                }
            },
            Err(e) => {
                let err = anyhow::Error::new(e);
                sentry_anyhow::capture_anyhow(&err);
                tracing::error!(error = %err, "db connect failed; starting API in degraded mode");
                None
            }
        },
        Err(e) => {
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(error = %e, "DATABASE_URL missing; starting API in degraded mode");
            None
        }
    };

    let state = AppState { pool, settings };

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/sessions/:session_id/analyze", post(trigger_analysis))
        .route("/sessions/:session_id/analysis", get(get_analysis))
        .route(
            "/sessions/:session_id/analysis/status",
            get(get_analysis_status),
        )
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Clone)]
struct AppState {
    pool: Option<PgPool>,
    settings: Settings,
}

#[derive(Debug, Serialize)]
struct TriggerResponse {
    session_id: Uuid,
    analysis_id: Uuid,
    status: AnalysisStatus,
}

async fn trigger_analysis(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<(StatusCode, Json<TriggerResponse>), StatusCode> {
    let Some(pool) = &state.pool else {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    };

    let existing = koopwijs_core::storage::analyses::fetch_by_session(pool, session_id)
        .await
        .map_err(|e| {
            sentry_anyhow::capture_anyhow(&e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    if let Some(existing) = &existing {
        if existing.status == AnalysisStatus::Complete {
            // Delete the session to re-analyze.
            return Err(StatusCode::CONFLICT);
        }
    }

    let mut pending = AnalysisResult::new(session_id);
    pending.status = AnalysisStatus::Pending;
    koopwijs_core::storage::analyses::upsert_result(pool, &pending)
        .await
        .map_err(|e| {
            sentry_anyhow::capture_anyhow(&e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    let analysis_id = pending.id;
    tokio::spawn(run_analysis_task(
        pool.clone(),
        state.settings.clone(),
        session_id,
    ));

    Ok((
        StatusCode::ACCEPTED,
        Json(TriggerResponse {
            session_id,
            analysis_id,
            status: AnalysisStatus::Pending,
        }),
    ))
}

/// Background task behind the trigger route: run the pipeline under the
/// session lock and persist whatever terminal state it reached.
async fn run_analysis_task(pool: PgPool, settings: Settings, session_id: Uuid) {
    let acquired =
        match koopwijs_core::storage::lock::try_acquire_session_lock(&pool, session_id).await {
            Ok(acquired) => acquired,
            Err(err) => {
                sentry_anyhow::capture_anyhow(&err);
                tracing::error!(%session_id, error = %err, "failed to acquire session lock");
                return;
            }
        };
    if !acquired {
        tracing::warn!(%session_id, "session lock not acquired; another analysis in progress");
        return;
    }

    if let Err(err) =
        koopwijs_core::storage::analyses::mark_status(&pool, session_id, AnalysisStatus::Extracting)
            .await
    {
        tracing::warn!(%session_id, error = %err, "failed to record extracting status");
    }

    let analysis = match build_pipeline(&pool, &settings) {
        Ok(pipeline) => pipeline.run(session_id).await,
        Err(err) => {
            sentry_anyhow::capture_anyhow(&err);
            let mut failed = AnalysisResult::new(session_id);
            failed.fail(format!("analysis setup failed: {err:#}"));
            failed
        }
    };

    if let Err(err) = koopwijs_core::storage::analyses::upsert_result(&pool, &analysis).await {
        sentry_anyhow::capture_anyhow(&err);
        tracing::error!(%session_id, error = %err, "failed to persist analysis result");
    }

    let _ = koopwijs_core::storage::lock::release_session_lock(&pool, session_id).await;
}

fn build_pipeline(pool: &PgPool, settings: &Settings) -> anyhow::Result<AnalysisPipeline> {
    let ai = koopwijs_core::ai::gateway_from_settings(settings)?;
    let market = MarketIntelligence::from_settings(settings)?;
    let documents = PgDocumentSource::new(pool.clone());
    Ok(AnalysisPipeline::new(
        ai,
        Box::new(documents),
        Some(market),
    ))
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    session_id: Uuid,
    status: AnalysisStatus,
    progress_message: String,
}

async fn get_analysis_status(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<StatusResponse>, StatusCode> {
    let Some(pool) = &state.pool else {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    };

    let analysis = koopwijs_core::storage::analyses::fetch_by_session(pool, session_id)
        .await
        .map_err(|e| {
            sentry_anyhow::capture_anyhow(&e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(StatusResponse {
        session_id,
        status: analysis.status,
        progress_message: progress_message(&analysis),
    }))
}

fn progress_message(analysis: &AnalysisResult) -> String {
    match analysis.status {
        AnalysisStatus::Pending => "Waiting to start...".to_string(),
        AnalysisStatus::Extracting => "Extracting text from documents...".to_string(),
        AnalysisStatus::Analyzing => "AI is analyzing your documents...".to_string(),
        AnalysisStatus::Enriching => "Enriching with market data...".to_string(),
        AnalysisStatus::Scoring => "Computing risk scores...".to_string(),
        AnalysisStatus::Complete => "Analysis complete!".to_string(),
        AnalysisStatus::Failed => format!(
            "Analysis failed: {}",
            analysis.error_message.as_deref().unwrap_or("Unknown error")
        ),
    }
}

#[derive(Debug, Serialize)]
struct ApiRiskScore {
    overall_score: f64,
    risk_level: RiskLevel,
    category_scores: std::collections::BTreeMap<RiskCategory, f64>,
    findings: Vec<Finding>,
}

impl From<RiskScore> for ApiRiskScore {
    fn from(score: RiskScore) -> Self {
        Self {
            overall_score: score.overall_score,
            risk_level: score.risk_level(),
            category_scores: score.category_scores,
            findings: score.findings,
        }
    }
}

#[derive(Debug, Serialize)]
struct AnalysisResponse {
    id: Uuid,
    session_id: Uuid,
    status: AnalysisStatus,
    property_data: Option<serde_json::Value>,
    strengths: Vec<String>,
    weaknesses: Vec<String>,
    risk_score: Option<ApiRiskScore>,
    market_position: Option<MarketData>,
    bidding_advice: Option<AdviceSet>,
    created_at: chrono::DateTime<chrono::Utc>,
    completed_at: Option<chrono::DateTime<chrono::Utc>>,
    error_message: Option<String>,
}

impl From<AnalysisResult> for AnalysisResponse {
    fn from(analysis: AnalysisResult) -> Self {
        let risk_score = analysis.risk_score.map(ApiRiskScore::from);
        Self {
            id: analysis.id,
            session_id: analysis.session_id,
            status: analysis.status,
            property_data: analysis.property_data,
            strengths: analysis.strengths,
            weaknesses: analysis.weaknesses,
            risk_score,
            market_position: analysis.market_position,
            bidding_advice: analysis.bidding_advice,
            created_at: analysis.created_at,
            completed_at: analysis.completed_at,
            error_message: analysis.error_message,
        }
    }
}

async fn get_analysis(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<AnalysisResponse>, StatusCode> {
    let Some(pool) = &state.pool else {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    };

    let analysis = koopwijs_core::storage::analyses::fetch_by_session(pool, session_id)
        .await
        .map_err(|e| {
            sentry_anyhow::capture_anyhow(&e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(analysis.into()))
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
