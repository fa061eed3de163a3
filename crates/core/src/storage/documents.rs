use crate::analysis::DocumentSource;
use crate::domain::document::SessionDocument;
use anyhow::Context;
use uuid::Uuid;

/// Session documents read from Postgres in upload order.
#[derive(Debug, Clone)]
pub struct PgDocumentSource {
    pool: sqlx::PgPool,
}

impl PgDocumentSource {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl DocumentSource for PgDocumentSource {
    async fn documents_for_session(
        &self,
        session_id: Uuid,
    ) -> anyhow::Result<Vec<SessionDocument>> {
        let rows = sqlx::query_as::<_, (Uuid, String, Option<String>, Option<String>)>(
            "SELECT id, filename, extracted_text, document_type \
             FROM documents \
             WHERE session_id = $1 \
             ORDER BY uploaded_at ASC",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await
        .context("select documents failed")?;

        Ok(rows
            .into_iter()
            .map(|(id, filename, extracted_text, document_type)| SessionDocument {
                id,
                filename,
                extracted_text,
                // An unrecognized stored type is treated as unclassified.
                document_type: document_type.and_then(|t| t.parse().ok()),
            })
            .collect())
    }
}
