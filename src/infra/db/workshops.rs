use async_trait::async_trait;
use sqlx::QueryBuilder;
use uuid::Uuid;

use crate::{
    application::pagination::{CursorPage, PageRequest, TimeCursor},
    application::repos::{RepoError, WorkshopParams, WorkshopQueryFilter, WorkshopsRepo},
    domain::entities::{WorkshopListing, WorkshopRecord},
};

use super::{PostgresRepositories, map_sqlx_error};

const WORKSHOP_COLUMNS: &str = "id, title, slug, speaker_id, summary, format, duration_minutes, \
     price_cents, published, created_at, updated_at";

const LISTING_SELECT: &str = "SELECT w.id, w.title, w.slug, w.speaker_id, w.summary, w.format, \
     w.duration_minutes, w.price_cents, w.published, w.created_at, w.updated_at, \
     s.name AS speaker_name, s.slug AS speaker_slug \
     FROM workshops w JOIN speakers s ON s.id = w.speaker_id";

#[async_trait]
impl WorkshopsRepo for PostgresRepositories {
    async fn create_workshop(
        &self,
        slug: &str,
        params: WorkshopParams,
    ) -> Result<WorkshopRecord, RepoError> {
        sqlx::query_as::<_, WorkshopRecord>(&format!(
            "INSERT INTO workshops (title, slug, speaker_id, summary, format, duration_minutes, \
             price_cents, published) VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {WORKSHOP_COLUMNS}"
        ))
        .bind(params.title)
        .bind(slug)
        .bind(params.speaker_id)
        .bind(params.summary)
        .bind(params.format)
        .bind(params.duration_minutes)
        .bind(params.price_cents)
        .bind(params.published)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn update_workshop(
        &self,
        id: Uuid,
        params: WorkshopParams,
    ) -> Result<WorkshopRecord, RepoError> {
        sqlx::query_as::<_, WorkshopRecord>(&format!(
            "UPDATE workshops SET title = $2, speaker_id = $3, summary = $4, format = $5, \
             duration_minutes = $6, price_cents = $7, published = $8, updated_at = now() \
             WHERE id = $1 RETURNING {WORKSHOP_COLUMNS}"
        ))
        .bind(id)
        .bind(params.title)
        .bind(params.speaker_id)
        .bind(params.summary)
        .bind(params.format)
        .bind(params.duration_minutes)
        .bind(params.price_cents)
        .bind(params.published)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn find_workshop(&self, id: Uuid) -> Result<Option<WorkshopRecord>, RepoError> {
        sqlx::query_as::<_, WorkshopRecord>(&format!(
            "SELECT {WORKSHOP_COLUMNS} FROM workshops WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn find_published_workshop_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<WorkshopListing>, RepoError> {
        sqlx::query_as::<_, WorkshopListing>(&format!(
            "{LISTING_SELECT} WHERE w.slug = $1 AND w.published"
        ))
        .bind(slug)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn workshop_slug_taken(&self, slug: &str) -> Result<bool, RepoError> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM workshops WHERE slug = $1)")
            .bind(slug)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)
    }

    async fn list_workshops(
        &self,
        page: PageRequest<TimeCursor>,
        filter: &WorkshopQueryFilter,
    ) -> Result<CursorPage<WorkshopListing>, RepoError> {
        let mut qb = QueryBuilder::new(format!("{LISTING_SELECT} WHERE 1=1 "));
        if filter.published_only {
            qb.push(" AND w.published");
        }
        if let Some(format) = filter.format {
            qb.push(" AND w.format = ");
            qb.push_bind(format);
        }
        if let Some(speaker_slug) = filter.speaker_slug.as_ref() {
            qb.push(" AND s.slug = ");
            qb.push_bind(speaker_slug.clone());
        }
        if let Some(search) = filter.search.as_ref() {
            Self::push_search(&mut qb, &["w.title", "w.summary"], search);
        }
        if let Some(cursor) = page.cursor.as_ref() {
            Self::push_keyset(&mut qb, "w.created_at, w.id", "<", cursor);
        }
        qb.push(" ORDER BY w.created_at DESC, w.id DESC LIMIT ");
        qb.push_bind(page.fetch_limit());

        let rows = qb
            .build_query_as::<WorkshopListing>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(Self::finish_page(rows, &page, |listing| {
            TimeCursor::new(listing.workshop.created_at, listing.workshop.id).encode()
        }))
    }

    async fn list_published_workshops_for_speaker(
        &self,
        speaker_id: Uuid,
    ) -> Result<Vec<WorkshopRecord>, RepoError> {
        sqlx::query_as::<_, WorkshopRecord>(&format!(
            "SELECT {WORKSHOP_COLUMNS} FROM workshops WHERE speaker_id = $1 AND published \
             ORDER BY title"
        ))
        .bind(speaker_id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn delete_workshop(&self, id: Uuid) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM workshops WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}
