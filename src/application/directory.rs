//! Read-only public listings: conferences, workshops and published articles.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::application::pagination::{CursorPage, DateCursor, PageRequest, TimeCursor};
use crate::application::repos::{
    ArticleQueryFilter, ArticlesRepo, CategoryCount, ConferenceQueryFilter, ConferencesRepo,
    RepoError, WorkshopQueryFilter, WorkshopsRepo,
};
use crate::domain::entities::{ArticleSummary, ConferenceRecord, WorkshopListing};
use crate::domain::types::{ArticleStatus, WorkshopFormat};

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone, Default)]
pub struct ConferenceSearch {
    pub search: Option<String>,
    pub category: Option<String>,
    pub country: Option<String>,
    pub include_past: bool,
}

#[derive(Debug, Clone, Default)]
pub struct WorkshopSearch {
    pub format: Option<WorkshopFormat>,
    pub speaker_slug: Option<String>,
    pub search: Option<String>,
}

/// Published article as served to readers.
#[derive(Debug, Clone, Serialize)]
pub struct PublicArticle {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub meta_description: Option<String>,
    pub image_url: Option<String>,
    pub tags: Vec<String>,
    pub reading_minutes: i32,
    pub word_count: i32,
    pub published_at: OffsetDateTime,
    pub body: serde_json::Value,
    pub body_html: String,
}

#[derive(Clone)]
pub struct DirectoryService {
    conferences: Arc<dyn ConferencesRepo>,
    workshops: Arc<dyn WorkshopsRepo>,
    articles: Arc<dyn ArticlesRepo>,
}

impl DirectoryService {
    pub fn new(
        conferences: Arc<dyn ConferencesRepo>,
        workshops: Arc<dyn WorkshopsRepo>,
        articles: Arc<dyn ArticlesRepo>,
    ) -> Self {
        Self {
            conferences,
            workshops,
            articles,
        }
    }

    /// Upcoming published conferences (still running on `today` or later)
    /// unless `include_past` is set.
    pub async fn conferences(
        &self,
        search: ConferenceSearch,
        today: Date,
        page: PageRequest<DateCursor>,
    ) -> Result<CursorPage<ConferenceRecord>, DirectoryError> {
        let filter = ConferenceQueryFilter {
            published_only: true,
            search: non_blank(search.search),
            category: non_blank(search.category),
            country: non_blank(search.country),
            ending_from: (!search.include_past).then_some(today),
        };
        Ok(self.conferences.list_conferences(page, &filter).await?)
    }

    pub async fn conference(&self, slug: &str) -> Result<ConferenceRecord, DirectoryError> {
        self.conferences
            .find_published_conference_by_slug(slug)
            .await?
            .ok_or(DirectoryError::NotFound("conference"))
    }

    pub async fn conference_categories(
        &self,
        today: Date,
        include_past: bool,
    ) -> Result<Vec<CategoryCount>, DirectoryError> {
        Ok(self
            .conferences
            .conference_categories((!include_past).then_some(today))
            .await?)
    }

    pub async fn workshops(
        &self,
        search: WorkshopSearch,
        page: PageRequest<TimeCursor>,
    ) -> Result<CursorPage<WorkshopListing>, DirectoryError> {
        let filter = WorkshopQueryFilter {
            published_only: true,
            format: search.format,
            speaker_slug: non_blank(search.speaker_slug),
            search: non_blank(search.search),
        };
        Ok(self.workshops.list_workshops(page, &filter).await?)
    }

    pub async fn workshop(&self, slug: &str) -> Result<WorkshopListing, DirectoryError> {
        self.workshops
            .find_published_workshop_by_slug(slug)
            .await?
            .ok_or(DirectoryError::NotFound("workshop"))
    }

    pub async fn articles(
        &self,
        page: PageRequest<TimeCursor>,
    ) -> Result<CursorPage<ArticleSummary>, DirectoryError> {
        let filter = ArticleQueryFilter {
            status: Some(ArticleStatus::Published),
            search: None,
        };
        Ok(self.articles.list_articles(page, &filter).await?)
    }

    pub async fn article(&self, slug: &str) -> Result<PublicArticle, DirectoryError> {
        let article = self
            .articles
            .find_published_article_by_slug(slug)
            .await?
            .ok_or(DirectoryError::NotFound("article"))?;
        Ok(PublicArticle {
            id: article.id,
            slug: article.slug,
            title: article.title,
            meta_description: article.meta_description,
            image_url: article.image_url,
            tags: article.tags,
            reading_minutes: article.reading_minutes,
            word_count: article.word_count,
            published_at: article.published_at,
            body: article.body_json,
            body_html: article.body_html,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
