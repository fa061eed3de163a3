use anyhow::Context;
use uuid::Uuid;

// Advisory locks are scoped to the Postgres session. Best-effort guard
// against two concurrent analysis runs for the same session.
const LOCK_NAMESPACE: i64 = 0x4B4F_4F50_5749; // "KOOPWI" as hex-ish namespace.

fn lock_key_for_session(session_id: Uuid) -> i64 {
    let (hi, lo) = session_id.as_u64_pair();
    LOCK_NAMESPACE ^ (hi as i64) ^ (lo as i64)
}

pub async fn try_acquire_session_lock(
    pool: &sqlx::PgPool,
    session_id: Uuid,
) -> anyhow::Result<bool> {
    let key = lock_key_for_session(session_id);
    let acquired: (bool,) = sqlx::query_as("SELECT pg_try_advisory_lock($1)")
        .persistent(false)
        .bind(key)
        .fetch_one(pool)
        .await
        .with_context(|| format!("failed to acquire advisory lock (key={key})"))?;
    Ok(acquired.0)
}

pub async fn release_session_lock(pool: &sqlx::PgPool, session_id: Uuid) -> anyhow::Result<()> {
    let key = lock_key_for_session(session_id);
    sqlx::query("SELECT pg_advisory_unlock($1)")
        .persistent(false)
        .bind(key)
        .execute(pool)
        .await
        .with_context(|| format!("failed to release advisory lock (key={key})"))?;
    Ok(())
}
