use async_trait::async_trait;
use sqlx::{FromRow, QueryBuilder, types::Json};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    application::pagination::{CursorPage, PageRequest, TimeCursor},
    application::repos::{
        ArticleQueryFilter, ArticlesRepo, RepoError, UpsertArticleParams, UpsertOutcome,
    },
    domain::entities::{ArticleRecord, ArticleSummary},
    domain::types::ArticleStatus,
};

use super::{PostgresRepositories, map_sqlx_error};

const ARTICLE_COLUMNS: &str = "id, source, external_id, slug, title, meta_description, image_url, \
     tags, body_markdown, body_json, body_html, word_count, reading_minutes, status, \
     published_at, created_at, updated_at";

const SUMMARY_COLUMNS: &str =
    "id, slug, title, meta_description, image_url, tags, reading_minutes, status, published_at";

#[derive(FromRow)]
struct ArticleRow {
    id: Uuid,
    source: String,
    external_id: String,
    slug: String,
    title: String,
    meta_description: Option<String>,
    image_url: Option<String>,
    tags: Vec<String>,
    body_markdown: String,
    body_json: Json<serde_json::Value>,
    body_html: String,
    word_count: i32,
    reading_minutes: i32,
    status: ArticleStatus,
    published_at: OffsetDateTime,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<ArticleRow> for ArticleRecord {
    fn from(row: ArticleRow) -> Self {
        Self {
            id: row.id,
            source: row.source,
            external_id: row.external_id,
            slug: row.slug,
            title: row.title,
            meta_description: row.meta_description,
            image_url: row.image_url,
            tags: row.tags,
            body_markdown: row.body_markdown,
            body_json: row.body_json.0,
            body_html: row.body_html,
            word_count: row.word_count,
            reading_minutes: row.reading_minutes,
            status: row.status,
            published_at: row.published_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(FromRow)]
struct UpsertedArticleRow {
    #[sqlx(flatten)]
    article: ArticleRow,
    inserted: bool,
}

#[async_trait]
impl ArticlesRepo for PostgresRepositories {
    async fn article_slug_taken(
        &self,
        slug: &str,
        source: &str,
        external_id: &str,
    ) -> Result<bool, RepoError> {
        sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM articles WHERE slug = $1 \
             AND NOT (source = $2 AND external_id = $3))",
        )
        .bind(slug)
        .bind(source)
        .bind(external_id)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn upsert_article(
        &self,
        params: UpsertArticleParams,
    ) -> Result<(ArticleRecord, UpsertOutcome), RepoError> {
        // `xmax = 0` only holds for rows created by this statement.
        let row = sqlx::query_as::<_, UpsertedArticleRow>(&format!(
            "INSERT INTO articles (source, external_id, slug, title, meta_description, image_url, \
             tags, body_markdown, body_json, body_html, word_count, reading_minutes, published_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) \
             ON CONFLICT (source, external_id) DO UPDATE SET \
             slug = EXCLUDED.slug, title = EXCLUDED.title, \
             meta_description = EXCLUDED.meta_description, image_url = EXCLUDED.image_url, \
             tags = EXCLUDED.tags, body_markdown = EXCLUDED.body_markdown, \
             body_json = EXCLUDED.body_json, body_html = EXCLUDED.body_html, \
             word_count = EXCLUDED.word_count, reading_minutes = EXCLUDED.reading_minutes, \
             published_at = EXCLUDED.published_at, updated_at = now() \
             RETURNING {ARTICLE_COLUMNS}, (xmax = 0) AS inserted"
        ))
        .bind(params.source)
        .bind(params.external_id)
        .bind(params.slug)
        .bind(params.title)
        .bind(params.meta_description)
        .bind(params.image_url)
        .bind(params.tags)
        .bind(params.body_markdown)
        .bind(Json(params.body_json))
        .bind(params.body_html)
        .bind(params.word_count)
        .bind(params.reading_minutes)
        .bind(params.published_at)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        let outcome = if row.inserted {
            UpsertOutcome::Created
        } else {
            UpsertOutcome::Updated
        };
        Ok((row.article.into(), outcome))
    }

    async fn find_article(&self, id: Uuid) -> Result<Option<ArticleRecord>, RepoError> {
        let row = sqlx::query_as::<_, ArticleRow>(&format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        Ok(row.map(Into::into))
    }

    async fn find_published_article_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<ArticleRecord>, RepoError> {
        let row = sqlx::query_as::<_, ArticleRow>(&format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles WHERE slug = $1 AND status = 'published'"
        ))
        .bind(slug)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        Ok(row.map(Into::into))
    }

    async fn list_articles(
        &self,
        page: PageRequest<TimeCursor>,
        filter: &ArticleQueryFilter,
    ) -> Result<CursorPage<ArticleSummary>, RepoError> {
        let mut qb =
            QueryBuilder::new(format!("SELECT {SUMMARY_COLUMNS} FROM articles WHERE 1=1 "));
        if let Some(status) = filter.status {
            qb.push(" AND status = ");
            qb.push_bind(status);
        }
        if let Some(search) = filter.search.as_ref() {
            Self::push_search(&mut qb, &["title", "meta_description"], search);
        }
        if let Some(cursor) = page.cursor.as_ref() {
            Self::push_keyset(&mut qb, "published_at, id", "<", cursor);
        }
        qb.push(" ORDER BY published_at DESC, id DESC LIMIT ");
        qb.push_bind(page.fetch_limit());

        let rows = qb
            .build_query_as::<ArticleSummary>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(Self::finish_page(rows, &page, |article| {
            TimeCursor::new(article.published_at, article.id).encode()
        }))
    }

    async fn set_article_status(
        &self,
        id: Uuid,
        status: ArticleStatus,
    ) -> Result<ArticleRecord, RepoError> {
        let row = sqlx::query_as::<_, ArticleRow>(&format!(
            "UPDATE articles SET status = $2, updated_at = now() WHERE id = $1 \
             RETURNING {ARTICLE_COLUMNS}"
        ))
        .bind(id)
        .bind(status)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        Ok(row.into())
    }

    async fn delete_article(&self, id: Uuid) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM articles WHERE id = $1")
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
