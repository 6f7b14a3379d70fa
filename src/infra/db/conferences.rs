use async_trait::async_trait;
use sqlx::{FromRow, QueryBuilder};
use time::Date;
use uuid::Uuid;

use crate::{
    application::pagination::{CursorPage, DateCursor, PageRequest},
    application::repos::{
        CategoryCount, ConferenceParams, ConferenceQueryFilter, ConferencesRepo, RepoError,
    },
    domain::entities::ConferenceRecord,
};

use super::{PostgresRepositories, map_sqlx_error};

const CONFERENCE_COLUMNS: &str = "id, name, slug, description, category, city, country, \
     starts_on, ends_on, website_url, cfp_deadline, published, created_at, updated_at";

#[derive(FromRow)]
struct CategoryRow {
    category: String,
    count: i64,
}

#[async_trait]
impl ConferencesRepo for PostgresRepositories {
    async fn create_conference(
        &self,
        slug: &str,
        params: ConferenceParams,
    ) -> Result<ConferenceRecord, RepoError> {
        sqlx::query_as::<_, ConferenceRecord>(&format!(
            "INSERT INTO conferences (name, slug, description, category, city, country, \
             starts_on, ends_on, website_url, cfp_deadline, published) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             RETURNING {CONFERENCE_COLUMNS}"
        ))
        .bind(params.name)
        .bind(slug)
        .bind(params.description)
        .bind(params.category)
        .bind(params.city)
        .bind(params.country)
        .bind(params.starts_on)
        .bind(params.ends_on)
        .bind(params.website_url)
        .bind(params.cfp_deadline)
        .bind(params.published)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn update_conference(
        &self,
        id: Uuid,
        params: ConferenceParams,
    ) -> Result<ConferenceRecord, RepoError> {
        sqlx::query_as::<_, ConferenceRecord>(&format!(
            "UPDATE conferences SET name = $2, description = $3, category = $4, city = $5, \
             country = $6, starts_on = $7, ends_on = $8, website_url = $9, cfp_deadline = $10, \
             published = $11, updated_at = now() WHERE id = $1 RETURNING {CONFERENCE_COLUMNS}"
        ))
        .bind(id)
        .bind(params.name)
        .bind(params.description)
        .bind(params.category)
        .bind(params.city)
        .bind(params.country)
        .bind(params.starts_on)
        .bind(params.ends_on)
        .bind(params.website_url)
        .bind(params.cfp_deadline)
        .bind(params.published)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn find_conference(&self, id: Uuid) -> Result<Option<ConferenceRecord>, RepoError> {
        sqlx::query_as::<_, ConferenceRecord>(&format!(
            "SELECT {CONFERENCE_COLUMNS} FROM conferences WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn find_published_conference_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<ConferenceRecord>, RepoError> {
        sqlx::query_as::<_, ConferenceRecord>(&format!(
            "SELECT {CONFERENCE_COLUMNS} FROM conferences WHERE slug = $1 AND published"
        ))
        .bind(slug)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn conference_slug_taken(&self, slug: &str) -> Result<bool, RepoError> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM conferences WHERE slug = $1)")
            .bind(slug)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)
    }

    async fn list_conferences(
        &self,
        page: PageRequest<DateCursor>,
        filter: &ConferenceQueryFilter,
    ) -> Result<CursorPage<ConferenceRecord>, RepoError> {
        let mut qb = QueryBuilder::new(format!(
            "SELECT {CONFERENCE_COLUMNS} FROM conferences WHERE 1=1 "
        ));
        if filter.published_only {
            qb.push(" AND published");
        }
        if let Some(from) = filter.ending_from {
            qb.push(" AND ends_on >= ");
            qb.push_bind(from);
        }
        if let Some(category) = filter.category.as_ref() {
            qb.push(" AND lower(category) = lower(");
            qb.push_bind(category.clone());
            qb.push(")");
        }
        if let Some(country) = filter.country.as_ref() {
            qb.push(" AND lower(country) = lower(");
            qb.push_bind(country.clone());
            qb.push(")");
        }
        if let Some(search) = filter.search.as_ref() {
            Self::push_search(&mut qb, &["name", "city", "description"], search);
        }
        if let Some(cursor) = page.cursor.as_ref() {
            Self::push_keyset(&mut qb, "starts_on, id", ">", cursor);
        }
        qb.push(" ORDER BY starts_on ASC, id ASC LIMIT ");
        qb.push_bind(page.fetch_limit());

        let rows = qb
            .build_query_as::<ConferenceRecord>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(Self::finish_page(rows, &page, |conference| {
            DateCursor::new(conference.starts_on, conference.id).encode()
        }))
    }

    async fn conference_categories(
        &self,
        ending_from: Option<Date>,
    ) -> Result<Vec<CategoryCount>, RepoError> {
        let rows = sqlx::query_as::<_, CategoryRow>(
            "SELECT category, COUNT(*) AS count FROM conferences \
             WHERE published AND ($1::DATE IS NULL OR ends_on >= $1) \
             GROUP BY category ORDER BY category",
        )
        .bind(ending_from)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter()
            .map(|row| {
                Ok(CategoryCount {
                    category: row.category,
                    count: Self::convert_count(row.count)?,
                })
            })
            .collect()
    }

    async fn delete_conference(&self, id: Uuid) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM conferences WHERE id = $1")
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
