use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::application::admin::audit::ActivityService;
use crate::application::admin::slug_error;
use crate::application::pagination::{CursorPage, PageRequest, TimeCursor};
use crate::application::repos::{
    RepoError, SpeakerParams, SpeakerProfileParams, SpeakerQueryFilter, SpeakersRepo,
};
use crate::application::tokens::issue_token;
use crate::domain::entities::SpeakerRecord;
use crate::domain::error::DomainError;
use crate::domain::slug::{SlugAsyncError, generate_unique_slug_async};
use crate::domain::validate;
use lectern_api_types::{SpeakerCreateRequest, SpeakerProfilePatch, SpeakerUpdateRequest};

#[derive(Debug, Error)]
pub enum AdminSpeakerError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl From<SlugAsyncError<RepoError>> for AdminSpeakerError {
    fn from(err: SlugAsyncError<RepoError>) -> Self {
        slug_error(err)
    }
}

#[derive(Clone)]
pub struct AdminSpeakerService {
    repo: Arc<dyn SpeakersRepo>,
    audit: ActivityService,
}

impl AdminSpeakerService {
    pub fn new(repo: Arc<dyn SpeakersRepo>, audit: ActivityService) -> Self {
        Self { repo, audit }
    }

    pub async fn list(
        &self,
        filter: &SpeakerQueryFilter,
        page: PageRequest<TimeCursor>,
    ) -> Result<CursorPage<SpeakerRecord>, AdminSpeakerError> {
        Ok(self.repo.list_speakers(page, filter).await?)
    }

    pub async fn get(&self, id: Uuid) -> Result<SpeakerRecord, AdminSpeakerError> {
        self.repo
            .find_speaker(id)
            .await?
            .ok_or_else(|| DomainError::not_found("speaker").into())
    }

    pub async fn create(
        &self,
        actor: &str,
        request: SpeakerCreateRequest,
    ) -> Result<SpeakerRecord, AdminSpeakerError> {
        let params = speaker_params(request)?;

        let repo = self.repo.clone();
        let slug = generate_unique_slug_async(&params.name, move |candidate| {
            let repo = repo.clone();
            async move { repo.speaker_slug_taken(&candidate).await.map(|taken| !taken) }
        })
        .await?;

        let speaker = self
            .repo
            .create_speaker(&slug, &issue_token(), params)
            .await?;
        self.log(actor, "speaker.create", &speaker).await?;
        Ok(speaker)
    }

    /// Slugs stay stable across renames so published links keep working.
    pub async fn update(
        &self,
        actor: &str,
        id: Uuid,
        request: SpeakerUpdateRequest,
    ) -> Result<SpeakerRecord, AdminSpeakerError> {
        let params = speaker_params(request)?;
        let speaker = self
            .repo
            .update_speaker(id, params)
            .await
            .map_err(not_found)?;
        self.log(actor, "speaker.update", &speaker).await?;
        Ok(speaker)
    }

    pub async fn set_active(
        &self,
        actor: &str,
        id: Uuid,
        active: bool,
    ) -> Result<SpeakerRecord, AdminSpeakerError> {
        let speaker = self
            .repo
            .set_speaker_active(id, active)
            .await
            .map_err(not_found)?;
        let action = if active {
            "speaker.activate"
        } else {
            "speaker.deactivate"
        };
        self.log(actor, action, &speaker).await?;
        Ok(speaker)
    }

    pub async fn rotate_portal_token(
        &self,
        actor: &str,
        id: Uuid,
    ) -> Result<SpeakerRecord, AdminSpeakerError> {
        let speaker = self
            .repo
            .set_speaker_portal_token(id, &issue_token())
            .await
            .map_err(not_found)?;
        self.log(actor, "speaker.rotate_token", &speaker).await?;
        Ok(speaker)
    }

    /// Self-service profile edit from the speaker portal.
    pub async fn apply_profile_patch(
        &self,
        speaker: &SpeakerRecord,
        patch: SpeakerProfilePatch,
    ) -> Result<SpeakerRecord, AdminSpeakerError> {
        let params = SpeakerProfileParams {
            headline: patch
                .headline
                .map(|value| value.trim().to_string())
                .unwrap_or_else(|| speaker.headline.clone()),
            bio: patch
                .bio
                .map(|value| value.trim().to_string())
                .unwrap_or_else(|| speaker.bio.clone()),
            topics: patch
                .topics
                .map(|topics| validate::labels(&topics))
                .unwrap_or_else(|| speaker.topics.clone()),
            location: match patch.location {
                Some(value) => validate::optional(Some(&value)),
                None => speaker.location.clone(),
            },
        };

        let updated = self
            .repo
            .update_speaker_profile(speaker.id, params)
            .await
            .map_err(not_found)?;
        let actor = format!("speaker:{}", updated.slug);
        self.log(&actor, "speaker.profile_update", &updated).await?;
        Ok(updated)
    }

    async fn log(
        &self,
        actor: &str,
        action: &str,
        speaker: &SpeakerRecord,
    ) -> Result<(), AdminSpeakerError> {
        let snapshot = SpeakerSnapshot {
            slug: &speaker.slug,
            name: &speaker.name,
            active: speaker.active,
        };
        self.audit
            .record(
                actor,
                action,
                "speaker",
                Some(&speaker.id.to_string()),
                Some(&snapshot),
            )
            .await?;
        Ok(())
    }
}

fn speaker_params(request: SpeakerCreateRequest) -> Result<SpeakerParams, AdminSpeakerError> {
    validate::fee_range(request.fee_min_cents, request.fee_max_cents)?;
    let email = match validate::optional(request.email.as_deref()) {
        Some(email) => Some(validate::email(&email)?),
        None => None,
    };

    Ok(SpeakerParams {
        name: validate::required("name", &request.name)?,
        email,
        headline: request.headline.trim().to_string(),
        bio: request.bio.trim().to_string(),
        topics: validate::labels(&request.topics),
        location: validate::optional(request.location.as_deref()),
        fee_min_cents: request.fee_min_cents,
        fee_max_cents: request.fee_max_cents,
        active: request.active,
    })
}

fn not_found(err: RepoError) -> AdminSpeakerError {
    match err {
        RepoError::NotFound => DomainError::not_found("speaker").into(),
        other => other.into(),
    }
}

#[derive(Debug, Serialize)]
struct SpeakerSnapshot<'a> {
    slug: &'a str,
    name: &'a str,
    active: bool,
}
