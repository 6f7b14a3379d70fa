use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::application::admin::audit::ActivityService;
use crate::application::admin::slug_error;
use crate::application::pagination::{CursorPage, DateCursor, PageRequest};
use crate::application::repos::{
    ConferenceParams, ConferenceQueryFilter, ConferencesRepo, RepoError,
};
use crate::domain::entities::ConferenceRecord;
use crate::domain::error::DomainError;
use crate::domain::slug::{SlugAsyncError, generate_unique_slug_async};
use crate::domain::validate;
use lectern_api_types::{ConferenceCreateRequest, ConferenceUpdateRequest};

#[derive(Debug, Error)]
pub enum AdminConferenceError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl From<SlugAsyncError<RepoError>> for AdminConferenceError {
    fn from(err: SlugAsyncError<RepoError>) -> Self {
        slug_error(err)
    }
}

#[derive(Clone)]
pub struct AdminConferenceService {
    repo: Arc<dyn ConferencesRepo>,
    audit: ActivityService,
}

impl AdminConferenceService {
    pub fn new(repo: Arc<dyn ConferencesRepo>, audit: ActivityService) -> Self {
        Self { repo, audit }
    }

    pub async fn list(
        &self,
        filter: &ConferenceQueryFilter,
        page: PageRequest<DateCursor>,
    ) -> Result<CursorPage<ConferenceRecord>, AdminConferenceError> {
        Ok(self.repo.list_conferences(page, filter).await?)
    }

    pub async fn get(&self, id: Uuid) -> Result<ConferenceRecord, AdminConferenceError> {
        self.repo
            .find_conference(id)
            .await?
            .ok_or_else(|| DomainError::not_found("conference").into())
    }

    pub async fn create(
        &self,
        actor: &str,
        request: ConferenceCreateRequest,
    ) -> Result<ConferenceRecord, AdminConferenceError> {
        let params = conference_params(request)?;

        let repo = self.repo.clone();
        let slug = generate_unique_slug_async(&params.name, move |candidate| {
            let repo = repo.clone();
            async move { repo.conference_slug_taken(&candidate).await.map(|taken| !taken) }
        })
        .await?;

        let conference = self.repo.create_conference(&slug, params).await?;
        self.log(actor, "conference.create", &conference).await?;
        Ok(conference)
    }

    pub async fn update(
        &self,
        actor: &str,
        id: Uuid,
        request: ConferenceUpdateRequest,
    ) -> Result<ConferenceRecord, AdminConferenceError> {
        let params = conference_params(request)?;
        let conference = self
            .repo
            .update_conference(id, params)
            .await
            .map_err(|err| match err {
                RepoError::NotFound => DomainError::not_found("conference").into(),
                other => AdminConferenceError::from(other),
            })?;
        self.log(actor, "conference.update", &conference).await?;
        Ok(conference)
    }

    pub async fn delete(&self, actor: &str, id: Uuid) -> Result<(), AdminConferenceError> {
        let conference = self.get(id).await?;
        self.repo.delete_conference(id).await?;
        self.log(actor, "conference.delete", &conference).await?;
        Ok(())
    }

    async fn log(
        &self,
        actor: &str,
        action: &str,
        conference: &ConferenceRecord,
    ) -> Result<(), AdminConferenceError> {
        let snapshot = ConferenceSnapshot {
            slug: &conference.slug,
            name: &conference.name,
            published: conference.published,
        };
        self.audit
            .record(
                actor,
                action,
                "conference",
                Some(&conference.id.to_string()),
                Some(&snapshot),
            )
            .await?;
        Ok(())
    }
}

fn conference_params(
    request: ConferenceCreateRequest,
) -> Result<ConferenceParams, AdminConferenceError> {
    if request.ends_on < request.starts_on {
        return Err(DomainError::validation("ends_on must not be before starts_on").into());
    }
    if let Some(deadline) = request.cfp_deadline
        && deadline > request.ends_on
    {
        return Err(DomainError::validation("cfp_deadline must not be after ends_on").into());
    }
    let website_url = match validate::optional(request.website_url.as_deref()) {
        Some(url) => Some(validate::web_url("website_url", &url)?),
        None => None,
    };

    Ok(ConferenceParams {
        name: validate::required("name", &request.name)?,
        description: request.description.trim().to_string(),
        category: validate::required("category", &request.category)?,
        city: validate::required("city", &request.city)?,
        country: validate::required("country", &request.country)?,
        starts_on: request.starts_on,
        ends_on: request.ends_on,
        website_url,
        cfp_deadline: request.cfp_deadline,
        published: request.published,
    })
}

#[derive(Debug, Serialize)]
struct ConferenceSnapshot<'a> {
    slug: &'a str,
    name: &'a str,
    published: bool,
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::application::testing::{MemoryStore, services};
    use time::macros::date;

    pub(crate) fn request(name: &str) -> ConferenceCreateRequest {
        ConferenceCreateRequest {
            name: name.into(),
            description: String::new(),
            category: "Technology".into(),
            city: "Lisbon".into(),
            country: "PT".into(),
            starts_on: date!(2030 - 11 - 03),
            ends_on: date!(2030 - 11 - 06),
            website_url: Some("https://websummit.test".into()),
            cfp_deadline: None,
            published: true,
        }
    }

    #[tokio::test]
    async fn create_derives_slug_and_normalizes_url() {
        let store = MemoryStore::shared();
        let conference = services(&store)
            .conferences
            .create("admin", request("Web Summit 2030"))
            .await
            .unwrap();
        assert_eq!(conference.slug, "web-summit-2030");
        assert_eq!(conference.website_url.as_deref(), Some("https://websummit.test/"));
    }

    #[tokio::test]
    async fn dates_must_be_ordered() {
        let store = MemoryStore::shared();
        let mut bad = request("Backwards");
        bad.ends_on = date!(2030 - 11 - 01);
        assert!(matches!(
            services(&store).conferences.create("admin", bad).await,
            Err(AdminConferenceError::Domain(DomainError::Validation { .. }))
        ));
    }

    #[tokio::test]
    async fn relative_website_is_rejected() {
        let store = MemoryStore::shared();
        let mut bad = request("Relative");
        bad.website_url = Some("/events".into());
        assert!(services(&store).conferences.create("admin", bad).await.is_err());
    }
}
