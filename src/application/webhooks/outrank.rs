//! Article ingestion from the Outrank content platform.

use std::sync::Arc;

use serde::Serialize;
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use crate::application::admin::audit::ActivityService;
use crate::application::repos::{ArticlesRepo, RepoError, UpsertArticleParams, UpsertOutcome};
use crate::application::webhooks::WebhookError;
use crate::domain::rich_text::{RichDocument, html_to_markdown};
use crate::domain::slug::{SlugAsyncError, SlugError, generate_unique_slug_async, preferred_slug};
use crate::domain::types::OUTRANK_SOURCE;
use crate::domain::validate;
use lectern_api_types::{OutrankArticle, OutrankWebhookPayload};

pub const PUBLISH_EVENT: &str = "publish_articles";
const ACTOR: &str = "webhook:outrank";
const META_DESCRIPTION_CHARS: usize = 160;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArticleOutcome {
    Created,
    Updated,
    Skipped,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestedArticle {
    pub external_id: String,
    pub id: Option<Uuid>,
    pub slug: Option<String>,
    pub outcome: ArticleOutcome,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestReport {
    pub received: usize,
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub articles: Vec<IngestedArticle>,
}

impl IngestReport {
    fn push(&mut self, article: IngestedArticle) {
        match article.outcome {
            ArticleOutcome::Created => self.created += 1,
            ArticleOutcome::Updated => self.updated += 1,
            ArticleOutcome::Skipped => self.skipped += 1,
        }
        self.articles.push(article);
    }
}

/// Converted article body in all three stored representations.
struct PreparedBody {
    markdown: String,
    document: RichDocument,
}

#[derive(Clone)]
pub struct OutrankWebhookService {
    repo: Arc<dyn ArticlesRepo>,
    audit: ActivityService,
}

impl OutrankWebhookService {
    pub fn new(repo: Arc<dyn ArticlesRepo>, audit: ActivityService) -> Self {
        Self { repo, audit }
    }

    pub async fn ingest(&self, payload: OutrankWebhookPayload) -> Result<IngestReport, WebhookError> {
        if payload.event_type != PUBLISH_EVENT {
            return Err(WebhookError::UnsupportedEvent(payload.event_type));
        }

        let mut report = IngestReport {
            received: payload.data.articles.len(),
            ..IngestReport::default()
        };

        for article in payload.data.articles {
            let ingested = self.ingest_article(article).await?;
            report.push(ingested);
        }

        metrics::counter!("lectern_webhook_articles_total", "outcome" => "created")
            .increment(report.created as u64);
        metrics::counter!("lectern_webhook_articles_total", "outcome" => "updated")
            .increment(report.updated as u64);
        metrics::counter!("lectern_webhook_articles_total", "outcome" => "skipped")
            .increment(report.skipped as u64);
        info!(
            target = "lectern::webhooks::outrank",
            received = report.received,
            created = report.created,
            updated = report.updated,
            skipped = report.skipped,
            "outrank articles ingested"
        );
        Ok(report)
    }

    async fn ingest_article(&self, article: OutrankArticle) -> Result<IngestedArticle, WebhookError> {
        let external_id = article.id.trim().to_string();
        let skipped = |reason: &str| {
            warn!(
                target = "lectern::webhooks::outrank",
                external_id = %external_id,
                reason,
                "skipping outrank article"
            );
            IngestedArticle {
                external_id: external_id.clone(),
                id: None,
                slug: None,
                outcome: ArticleOutcome::Skipped,
            }
        };

        if external_id.is_empty() {
            return Ok(skipped("missing id"));
        }
        let title = article.title.trim().to_string();
        if title.is_empty() {
            return Ok(skipped("missing title"));
        }
        let Some(body) = prepare_body(&article) else {
            return Ok(skipped("empty body"));
        };

        let base = match preferred_slug(article.slug.as_deref(), &title) {
            Ok(base) => base,
            Err(_) => return Ok(skipped("title has no slug characters")),
        };
        let slug = self.unique_slug(&base, &external_id).await?;

        let meta_description = validate::optional(article.meta_description.as_deref())
            .or_else(|| body.document.excerpt(META_DESCRIPTION_CHARS));
        let image_url = match validate::optional(article.image_url.as_deref()) {
            Some(url) => match validate::web_url("image_url", &url) {
                Ok(url) => Some(url),
                Err(err) => {
                    warn!(
                        target = "lectern::webhooks::outrank",
                        external_id = %external_id,
                        error = %err,
                        "dropping invalid image url"
                    );
                    None
                }
            },
            None => None,
        };

        let params = UpsertArticleParams {
            source: OUTRANK_SOURCE.to_string(),
            external_id: external_id.clone(),
            slug,
            title,
            meta_description,
            image_url,
            tags: validate::labels(&article.tags),
            body_json: body.document.to_portable_text(),
            body_html: body.document.render_html(),
            word_count: clamp_i32(body.document.word_count()),
            reading_minutes: clamp_i32(body.document.reading_time_minutes()),
            body_markdown: body.markdown,
            published_at: article.created_at.unwrap_or_else(OffsetDateTime::now_utc),
        };

        let (record, outcome) = self.repo.upsert_article(params).await?;
        let outcome = match outcome {
            UpsertOutcome::Created => ArticleOutcome::Created,
            UpsertOutcome::Updated => ArticleOutcome::Updated,
        };
        self.audit
            .record(
                ACTOR,
                "article.ingest",
                "article",
                Some(&record.id.to_string()),
                Some(&serde_json::json!({
                    "external_id": record.external_id,
                    "slug": record.slug,
                    "outcome": outcome,
                })),
            )
            .await?;

        Ok(IngestedArticle {
            external_id,
            id: Some(record.id),
            slug: Some(record.slug),
            outcome,
        })
    }

    /// Slugs owned by the same external article do not count as taken.
    async fn unique_slug(&self, base: &str, external_id: &str) -> Result<String, WebhookError> {
        let repo = self.repo.clone();
        let external_id = external_id.to_string();
        let result = generate_unique_slug_async(base, move |candidate| {
            let repo = repo.clone();
            let external_id = external_id.clone();
            async move {
                repo.article_slug_taken(&candidate, OUTRANK_SOURCE, &external_id)
                    .await
                    .map(|taken| !taken)
            }
        })
        .await;

        match result {
            Ok(slug) => Ok(slug),
            Err(SlugAsyncError::Predicate(err)) => Err(err.into()),
            Err(SlugAsyncError::Slug(SlugError::Exhausted { base })) => Err(RepoError::Integrity {
                message: format!("no free article slug left for `{base}`"),
            }
            .into()),
            Err(SlugAsyncError::Slug(err)) => Err(RepoError::InvalidInput {
                message: err.to_string(),
            }
            .into()),
        }
    }
}

/// Markdown wins when present; HTML is converted; both blank means no body.
fn prepare_body(article: &OutrankArticle) -> Option<PreparedBody> {
    let markdown = match validate::optional(article.content_markdown.as_deref()) {
        Some(markdown) => markdown,
        None => {
            let html = validate::optional(article.content_html.as_deref())?;
            html_to_markdown(&html)
        }
    };
    let document = RichDocument::from_markdown(&markdown);
    if document.is_empty() {
        return None;
    }
    Some(PreparedBody { markdown, document })
}

fn clamp_i32(value: usize) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}
