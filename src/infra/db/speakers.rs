use async_trait::async_trait;
use sqlx::QueryBuilder;
use uuid::Uuid;

use crate::{
    application::pagination::{CursorPage, PageRequest, TimeCursor},
    application::repos::{
        RepoError, SpeakerParams, SpeakerProfileParams, SpeakerQueryFilter, SpeakersRepo,
    },
    domain::entities::SpeakerRecord,
};

use super::{PostgresRepositories, map_sqlx_error};

const SPEAKER_COLUMNS: &str = "id, name, slug, email, headline, bio, topics, location, \
     fee_min_cents, fee_max_cents, active, portal_token, created_at, updated_at";

impl PostgresRepositories {
    async fn find_speaker_where(
        &self,
        column: &str,
        value: &str,
    ) -> Result<Option<SpeakerRecord>, RepoError> {
        sqlx::query_as::<_, SpeakerRecord>(&format!(
            "SELECT {SPEAKER_COLUMNS} FROM speakers WHERE {column} = $1"
        ))
        .bind(value)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)
    }
}

#[async_trait]
impl SpeakersRepo for PostgresRepositories {
    async fn create_speaker(
        &self,
        slug: &str,
        portal_token: &str,
        params: SpeakerParams,
    ) -> Result<SpeakerRecord, RepoError> {
        sqlx::query_as::<_, SpeakerRecord>(&format!(
            "INSERT INTO speakers (name, slug, email, headline, bio, topics, location, \
             fee_min_cents, fee_max_cents, active, portal_token) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) RETURNING {SPEAKER_COLUMNS}"
        ))
        .bind(params.name)
        .bind(slug)
        .bind(params.email)
        .bind(params.headline)
        .bind(params.bio)
        .bind(params.topics)
        .bind(params.location)
        .bind(params.fee_min_cents)
        .bind(params.fee_max_cents)
        .bind(params.active)
        .bind(portal_token)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn update_speaker(
        &self,
        id: Uuid,
        params: SpeakerParams,
    ) -> Result<SpeakerRecord, RepoError> {
        sqlx::query_as::<_, SpeakerRecord>(&format!(
            "UPDATE speakers SET name = $2, email = $3, headline = $4, bio = $5, topics = $6, \
             location = $7, fee_min_cents = $8, fee_max_cents = $9, active = $10, \
             updated_at = now() WHERE id = $1 RETURNING {SPEAKER_COLUMNS}"
        ))
        .bind(id)
        .bind(params.name)
        .bind(params.email)
        .bind(params.headline)
        .bind(params.bio)
        .bind(params.topics)
        .bind(params.location)
        .bind(params.fee_min_cents)
        .bind(params.fee_max_cents)
        .bind(params.active)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn update_speaker_profile(
        &self,
        id: Uuid,
        params: SpeakerProfileParams,
    ) -> Result<SpeakerRecord, RepoError> {
        sqlx::query_as::<_, SpeakerRecord>(&format!(
            "UPDATE speakers SET headline = $2, bio = $3, topics = $4, location = $5, \
             updated_at = now() WHERE id = $1 RETURNING {SPEAKER_COLUMNS}"
        ))
        .bind(id)
        .bind(params.headline)
        .bind(params.bio)
        .bind(params.topics)
        .bind(params.location)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn find_speaker(&self, id: Uuid) -> Result<Option<SpeakerRecord>, RepoError> {
        sqlx::query_as::<_, SpeakerRecord>(&format!(
            "SELECT {SPEAKER_COLUMNS} FROM speakers WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn find_speaker_by_slug(&self, slug: &str) -> Result<Option<SpeakerRecord>, RepoError> {
        self.find_speaker_where("slug", slug).await
    }

    async fn find_speaker_by_portal_token(
        &self,
        token: &str,
    ) -> Result<Option<SpeakerRecord>, RepoError> {
        self.find_speaker_where("portal_token", token).await
    }

    async fn speaker_slug_taken(&self, slug: &str) -> Result<bool, RepoError> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM speakers WHERE slug = $1)")
            .bind(slug)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)
    }

    async fn list_speakers(
        &self,
        page: PageRequest<TimeCursor>,
        filter: &SpeakerQueryFilter,
    ) -> Result<CursorPage<SpeakerRecord>, RepoError> {
        let mut qb =
            QueryBuilder::new(format!("SELECT {SPEAKER_COLUMNS} FROM speakers WHERE 1=1 "));
        if let Some(active) = filter.active {
            qb.push(" AND active = ");
            qb.push_bind(active);
        }
        if let Some(search) = filter.search.as_ref() {
            Self::push_search(
                &mut qb,
                &["name", "headline", "location", "array_to_string(topics, ' ')"],
                search,
            );
        }
        if let Some(cursor) = page.cursor.as_ref() {
            Self::push_keyset(&mut qb, "created_at, id", "<", cursor);
        }
        qb.push(" ORDER BY created_at DESC, id DESC LIMIT ");
        qb.push_bind(page.fetch_limit());

        let rows = qb
            .build_query_as::<SpeakerRecord>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(Self::finish_page(rows, &page, |speaker| {
            TimeCursor::new(speaker.created_at, speaker.id).encode()
        }))
    }

    async fn set_speaker_active(
        &self,
        id: Uuid,
        active: bool,
    ) -> Result<SpeakerRecord, RepoError> {
        sqlx::query_as::<_, SpeakerRecord>(&format!(
            "UPDATE speakers SET active = $2, updated_at = now() WHERE id = $1 \
             RETURNING {SPEAKER_COLUMNS}"
        ))
        .bind(id)
        .bind(active)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn set_speaker_portal_token(
        &self,
        id: Uuid,
        token: &str,
    ) -> Result<SpeakerRecord, RepoError> {
        sqlx::query_as::<_, SpeakerRecord>(&format!(
            "UPDATE speakers SET portal_token = $2, updated_at = now() WHERE id = $1 \
             RETURNING {SPEAKER_COLUMNS}"
        ))
        .bind(id)
        .bind(token)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)
    }
}
