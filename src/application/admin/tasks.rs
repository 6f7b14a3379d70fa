use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::admin::audit::ActivityService;
use crate::application::pagination::{CursorPage, DueCursor, PageRequest};
use crate::application::repos::{RepoError, TaskParams, TaskQueryFilter, TasksRepo};
use crate::domain::entities::TaskRecord;
use crate::domain::error::DomainError;
use crate::domain::types::{TaskPriority, TaskStatus};
use crate::domain::validate;
use lectern_api_types::{TaskCreateRequest, TaskUpdateRequest};

#[derive(Debug, Error)]
pub enum AdminTaskError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Clone)]
pub struct AdminTaskService {
    repo: Arc<dyn TasksRepo>,
    audit: ActivityService,
}

impl AdminTaskService {
    pub fn new(repo: Arc<dyn TasksRepo>, audit: ActivityService) -> Self {
        Self { repo, audit }
    }

    pub async fn list(
        &self,
        filter: &TaskQueryFilter,
        page: PageRequest<DueCursor>,
    ) -> Result<CursorPage<TaskRecord>, AdminTaskError> {
        Ok(self.repo.list_tasks(page, filter).await?)
    }

    pub async fn get(&self, id: Uuid) -> Result<TaskRecord, AdminTaskError> {
        self.repo
            .find_task(id)
            .await?
            .ok_or_else(|| DomainError::not_found("task").into())
    }

    pub async fn create(
        &self,
        actor: &str,
        request: TaskCreateRequest,
    ) -> Result<TaskRecord, AdminTaskError> {
        let params = TaskParams {
            title: validate::required("title", &request.title)?,
            description: request.description.trim().to_string(),
            priority: request.priority.unwrap_or(TaskPriority::Medium),
            due_on: request.due_on,
            assignee: validate::optional(request.assignee.as_deref()),
            deal_id: request.deal_id,
            client_id: request.client_id,
        };
        let task = self.repo.create_task(params).await?;
        self.log(actor, "task.create", &task).await?;
        Ok(task)
    }

    pub async fn update(
        &self,
        actor: &str,
        id: Uuid,
        request: TaskUpdateRequest,
    ) -> Result<TaskRecord, AdminTaskError> {
        let params = TaskParams {
            title: validate::required("title", &request.title)?,
            description: request.description.trim().to_string(),
            priority: request.priority,
            due_on: request.due_on,
            assignee: validate::optional(request.assignee.as_deref()),
            deal_id: request.deal_id,
            client_id: request.client_id,
        };
        let task = self.repo.update_task(id, params).await.map_err(not_found)?;
        self.log(actor, "task.update", &task).await?;
        Ok(task)
    }

    /// Completing stamps `completed_at`; leaving `done` clears it.
    pub async fn set_status(
        &self,
        actor: &str,
        id: Uuid,
        status: TaskStatus,
    ) -> Result<TaskRecord, AdminTaskError> {
        let task = self.get(id).await?;
        let completed_at = match status {
            TaskStatus::Done if task.status == TaskStatus::Done => task.completed_at,
            TaskStatus::Done => Some(OffsetDateTime::now_utc()),
            _ => None,
        };
        let updated = self.repo.set_task_status(id, status, completed_at).await?;
        self.log(actor, "task.status", &updated).await?;
        Ok(updated)
    }

    pub async fn delete(&self, actor: &str, id: Uuid) -> Result<(), AdminTaskError> {
        let task = self.get(id).await?;
        self.repo.delete_task(id).await?;
        self.log(actor, "task.delete", &task).await?;
        Ok(())
    }

    async fn log(&self, actor: &str, action: &str, task: &TaskRecord) -> Result<(), AdminTaskError> {
        let snapshot = TaskSnapshot {
            title: &task.title,
            status: task.status,
            priority: task.priority,
        };
        self.audit
            .record(
                actor,
                action,
                "task",
                Some(&task.id.to_string()),
                Some(&snapshot),
            )
            .await?;
        Ok(())
    }
}

fn not_found(err: RepoError) -> AdminTaskError {
    match err {
        RepoError::NotFound => DomainError::not_found("task").into(),
        other => other.into(),
    }
}

#[derive(Debug, Serialize)]
struct TaskSnapshot<'a> {
    title: &'a str,
    status: TaskStatus,
    priority: TaskPriority,
}
