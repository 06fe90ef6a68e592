//! PostgreSQL content repository implementation

use async_trait::async_trait;
use sqlx::PgPool;

use dramapass_types::{ContentItem, ContentSlug};

use crate::error::DbResult;
use crate::models::{count_to_db, ContentItemRow};
use crate::repo::ContentRepository;

/// PostgreSQL content repository
#[derive(Clone)]
pub struct PgContentRepository {
    pool: PgPool,
}

impl PgContentRepository {
    /// Create a new content repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ContentRepository for PgContentRepository {
    async fn find_by_slug(&self, slug: &ContentSlug) -> DbResult<Option<ContentItem>> {
        let row = sqlx::query_as::<_, ContentItemRow>(
            r#"
            SELECT slug, title, vip_only, part, total_parts, media_ref, uploaded_at
            FROM content_items
            WHERE slug = $1
            "#,
        )
        .bind(slug.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn upsert(&self, item: &ContentItem) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO content_items (slug, title, vip_only, part, total_parts, media_ref, uploaded_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (slug) DO UPDATE
            SET title = EXCLUDED.title,
                vip_only = EXCLUDED.vip_only,
                part = EXCLUDED.part,
                total_parts = EXCLUDED.total_parts,
                media_ref = EXCLUDED.media_ref,
                uploaded_at = EXCLUDED.uploaded_at
            "#,
        )
        .bind(item.slug.as_str())
        .bind(&item.title)
        .bind(item.vip_only)
        .bind(count_to_db(item.part))
        .bind(count_to_db(item.total_parts))
        .bind(&item.media_ref)
        .bind(item.uploaded_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
