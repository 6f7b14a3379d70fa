use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::application::admin::audit::ActivityService;
use crate::application::admin::slug_error;
use crate::application::pagination::{CursorPage, PageRequest, TimeCursor};
use crate::application::repos::{
    RepoError, SpeakersRepo, WorkshopParams, WorkshopQueryFilter, WorkshopsRepo,
};
use crate::domain::entities::{WorkshopListing, WorkshopRecord};
use crate::domain::error::DomainError;
use crate::domain::slug::{SlugAsyncError, generate_unique_slug_async};
use crate::domain::validate;
use lectern_api_types::{WorkshopCreateRequest, WorkshopUpdateRequest};

#[derive(Debug, Error)]
pub enum AdminWorkshopError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl From<SlugAsyncError<RepoError>> for AdminWorkshopError {
    fn from(err: SlugAsyncError<RepoError>) -> Self {
        slug_error(err)
    }
}

#[derive(Clone)]
pub struct AdminWorkshopService {
    repo: Arc<dyn WorkshopsRepo>,
    speakers: Arc<dyn SpeakersRepo>,
    audit: ActivityService,
}

impl AdminWorkshopService {
    pub fn new(
        repo: Arc<dyn WorkshopsRepo>,
        speakers: Arc<dyn SpeakersRepo>,
        audit: ActivityService,
    ) -> Self {
        Self {
            repo,
            speakers,
            audit,
        }
    }

    pub async fn list(
        &self,
        filter: &WorkshopQueryFilter,
        page: PageRequest<TimeCursor>,
    ) -> Result<CursorPage<WorkshopListing>, AdminWorkshopError> {
        Ok(self.repo.list_workshops(page, filter).await?)
    }

    pub async fn get(&self, id: Uuid) -> Result<WorkshopRecord, AdminWorkshopError> {
        self.repo
            .find_workshop(id)
            .await?
            .ok_or_else(|| DomainError::not_found("workshop").into())
    }

    pub async fn create(
        &self,
        actor: &str,
        request: WorkshopCreateRequest,
    ) -> Result<WorkshopRecord, AdminWorkshopError> {
        let params = self.workshop_params(request).await?;

        let repo = self.repo.clone();
        let slug = generate_unique_slug_async(&params.title, move |candidate| {
            let repo = repo.clone();
            async move { repo.workshop_slug_taken(&candidate).await.map(|taken| !taken) }
        })
        .await?;

        let workshop = self.repo.create_workshop(&slug, params).await?;
        self.log(actor, "workshop.create", &workshop).await?;
        Ok(workshop)
    }

    pub async fn update(
        &self,
        actor: &str,
        id: Uuid,
        request: WorkshopUpdateRequest,
    ) -> Result<WorkshopRecord, AdminWorkshopError> {
        let params = self.workshop_params(request).await?;
        let workshop = self
            .repo
            .update_workshop(id, params)
            .await
            .map_err(|err| match err {
                RepoError::NotFound => DomainError::not_found("workshop").into(),
                other => AdminWorkshopError::from(other),
            })?;
        self.log(actor, "workshop.update", &workshop).await?;
        Ok(workshop)
    }

    pub async fn delete(&self, actor: &str, id: Uuid) -> Result<(), AdminWorkshopError> {
        let workshop = self.get(id).await?;
        self.repo.delete_workshop(id).await?;
        self.log(actor, "workshop.delete", &workshop).await?;
        Ok(())
    }

    async fn workshop_params(
        &self,
        request: WorkshopCreateRequest,
    ) -> Result<WorkshopParams, AdminWorkshopError> {
        if request.duration_minutes <= 0 {
            return Err(DomainError::validation("duration_minutes must be positive").into());
        }
        if let Some(price) = request.price_cents {
            validate::non_negative("price_cents", price)?;
        }
        if self.speakers.find_speaker(request.speaker_id).await?.is_none() {
            return Err(DomainError::not_found("speaker").into());
        }

        Ok(WorkshopParams {
            title: validate::required("title", &request.title)?,
            speaker_id: request.speaker_id,
            summary: request.summary.trim().to_string(),
            format: request.format,
            duration_minutes: request.duration_minutes,
            price_cents: request.price_cents,
            published: request.published,
        })
    }

    async fn log(
        &self,
        actor: &str,
        action: &str,
        workshop: &WorkshopRecord,
    ) -> Result<(), AdminWorkshopError> {
        let snapshot = WorkshopSnapshot {
            slug: &workshop.slug,
            title: &workshop.title,
            published: workshop.published,
        };
        self.audit
            .record(
                actor,
                action,
                "workshop",
                Some(&workshop.id.to_string()),
                Some(&snapshot),
            )
            .await?;
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct WorkshopSnapshot<'a> {
    slug: &'a str,
    title: &'a str,
    published: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::{MemoryStore, services};
    use crate::domain::types::WorkshopFormat;

    fn request(speaker_id: Uuid) -> WorkshopCreateRequest {
        WorkshopCreateRequest {
            title: "Storytelling for Engineers".into(),
            speaker_id,
            summary: "Half-day session.".into(),
            format: WorkshopFormat::Hybrid,
            duration_minutes: 180,
            price_cents: Some(250_000),
            published: true,
        }
    }

    #[tokio::test]
    async fn create_requires_known_speaker() {
        let store = MemoryStore::shared();
        assert!(matches!(
            services(&store)
                .workshops
                .create("admin", request(Uuid::new_v4()))
                .await,
            Err(AdminWorkshopError::Domain(DomainError::NotFound { entity: "speaker" }))
        ));
    }

    #[tokio::test]
    async fn create_validates_duration_and_slugs_title() {
        let store = MemoryStore::shared();
        let speaker = store.seed_speaker("Ada Lovelace");
        let service = services(&store).workshops;

        let mut bad = request(speaker.id);
        bad.duration_minutes = 0;
        assert!(service.create("admin", bad).await.is_err());

        let workshop = service.create("admin", request(speaker.id)).await.unwrap();
        assert_eq!(workshop.slug, "storytelling-for-engineers");
    }
}
