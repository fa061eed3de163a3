use anyhow::Context;
use clap::Parser;
use koopwijs_core::analysis::AnalysisPipeline;
use koopwijs_core::market::intelligence::MarketIntelligence;
use koopwijs_core::storage::documents::PgDocumentSource;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "koopwijs_worker")]
struct Args {
    /// Session whose documents should be analyzed.
    #[arg(long)]
    session_id: uuid::Uuid,

    /// Run the full pipeline but skip writing the result to the database.
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = koopwijs_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();
    let session_id = args.session_id;

    let db_url = settings.require_database_url()?;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(db_url)
        .await
        .context("connect DATABASE_URL failed")?;

    koopwijs_core::storage::migrate(&pool).await?;

    let acquired = koopwijs_core::storage::lock::try_acquire_session_lock(&pool, session_id).await?;
    if !acquired {
        tracing::warn!(%session_id, "session lock not acquired; another analysis in progress");
        return Ok(());
    }

    let ai = koopwijs_core::ai::gateway_from_settings(&settings)?;
    let market = MarketIntelligence::from_settings(&settings)?;
    let documents = PgDocumentSource::new(pool.clone());

    let pipeline = AnalysisPipeline::new(ai, Box::new(documents), Some(market));
    let analysis = pipeline.run(session_id).await;

    match &analysis.error_message {
        None => {
            tracing::info!(
                %session_id,
                analysis_id = %analysis.id,
                status = %analysis.status,
                overall_score = analysis.risk_score.as_ref().map(|s| s.overall_score),
                "analysis run finished"
            );
        }
        Some(error) => {
            tracing::error!(
                %session_id,
                analysis_id = %analysis.id,
                status = %analysis.status,
                error = %error,
                "analysis run failed"
            );
        }
    }

    if args.dry_run {
        tracing::info!(%session_id, dry_run = true, "skipping persistence");
    } else if let Err(err) =
        koopwijs_core::storage::analyses::upsert_result(&pool, &analysis).await
    {
        sentry_anyhow::capture_anyhow(&err);
        let _ = koopwijs_core::storage::lock::release_session_lock(&pool, session_id).await;
        return Err(err);
    }

    let _ = koopwijs_core::storage::lock::release_session_lock(&pool, session_id).await;
    Ok(())
}

fn init_sentry(settings: &koopwijs_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
