use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use crate::application::admin::audit::ActivityService;
use crate::application::pagination::{CursorPage, PageRequest, TimeCursor};
use crate::application::repos::{ArticleQueryFilter, ArticlesRepo, RepoError};
use crate::domain::entities::{ArticleRecord, ArticleSummary};
use crate::domain::error::DomainError;
use crate::domain::types::ArticleStatus;

#[derive(Debug, Error)]
pub enum AdminArticleError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Clone)]
pub struct AdminArticleService {
    repo: Arc<dyn ArticlesRepo>,
    audit: ActivityService,
}

impl AdminArticleService {
    pub fn new(repo: Arc<dyn ArticlesRepo>, audit: ActivityService) -> Self {
        Self { repo, audit }
    }

    pub async fn list(
        &self,
        filter: &ArticleQueryFilter,
        page: PageRequest<TimeCursor>,
    ) -> Result<CursorPage<ArticleSummary>, AdminArticleError> {
        Ok(self.repo.list_articles(page, filter).await?)
    }

    pub async fn get(&self, id: Uuid) -> Result<ArticleRecord, AdminArticleError> {
        self.repo
            .find_article(id)
            .await?
            .ok_or_else(|| DomainError::not_found("article").into())
    }

    pub async fn set_status(
        &self,
        actor: &str,
        id: Uuid,
        status: ArticleStatus,
    ) -> Result<ArticleRecord, AdminArticleError> {
        let article = self
            .repo
            .set_article_status(id, status)
            .await
            .map_err(|err| match err {
                RepoError::NotFound => DomainError::not_found("article").into(),
                other => AdminArticleError::from(other),
            })?;
        self.audit
            .record(
                actor,
                "article.status",
                "article",
                Some(&id.to_string()),
                Some(&serde_json::json!({ "slug": article.slug, "status": status })),
            )
            .await?;
        Ok(article)
    }

    pub async fn delete(&self, actor: &str, id: Uuid) -> Result<(), AdminArticleError> {
        let article = self.get(id).await?;
        self.repo.delete_article(id).await?;
        self.audit
            .record(
                actor,
                "article.delete",
                "article",
                Some(&id.to_string()),
                Some(&serde_json::json!({ "slug": article.slug })),
            )
            .await?;
        Ok(())
    }
}
