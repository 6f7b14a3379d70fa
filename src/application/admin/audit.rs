use std::sync::Arc;

use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::pagination::{CursorPage, PageRequest, TimeCursor};
use crate::application::repos::{ActivityQueryFilter, ActivityRepo, RepoError};
use crate::domain::entities::ActivityRecord;

/// Thin wrapper around the activity repository used by every mutating service.
#[derive(Clone)]
pub struct ActivityService {
    repo: Arc<dyn ActivityRepo>,
}

impl ActivityService {
    pub fn new(repo: Arc<dyn ActivityRepo>) -> Self {
        Self { repo }
    }

    pub async fn record<S>(
        &self,
        actor: &str,
        action: &str,
        entity_type: &str,
        entity_id: Option<&str>,
        payload: Option<&S>,
    ) -> Result<(), RepoError>
    where
        S: Serialize,
    {
        let payload_text = match payload {
            Some(value) => Some(serde_json::to_string(value).map_err(RepoError::from_persistence)?),
            None => None,
        };

        let record = ActivityRecord {
            id: Uuid::new_v4(),
            actor: actor.to_string(),
            action: action.to_string(),
            entity_type: entity_type.to_string(),
            entity_id: entity_id.map(str::to_string),
            payload_text,
            created_at: OffsetDateTime::now_utc(),
        };

        self.repo.append_activity(record).await
    }

    pub async fn list_recent(&self, limit: u32) -> Result<Vec<ActivityRecord>, RepoError> {
        let page = PageRequest::new(limit, None);
        let records = self
            .repo
            .list_activity(page, &ActivityQueryFilter::default())
            .await?
            .items;
        Ok(records)
    }

    pub async fn list_filtered(
        &self,
        page: PageRequest<TimeCursor>,
        filter: &ActivityQueryFilter,
    ) -> Result<CursorPage<ActivityRecord>, RepoError> {
        self.repo.list_activity(page, filter).await
    }
}
