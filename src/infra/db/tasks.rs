use async_trait::async_trait;
use sqlx::QueryBuilder;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    application::pagination::{CursorPage, DueCursor, PageRequest},
    application::repos::{RepoError, TaskParams, TaskQueryFilter, TasksRepo},
    domain::entities::TaskRecord,
    domain::types::TaskStatus,
};

use super::{PostgresRepositories, map_sqlx_error};

const TASK_COLUMNS: &str = "id, title, description, status, priority, due_on, assignee, deal_id, \
     client_id, completed_at, created_at, updated_at";

#[async_trait]
impl TasksRepo for PostgresRepositories {
    async fn create_task(&self, params: TaskParams) -> Result<TaskRecord, RepoError> {
        sqlx::query_as::<_, TaskRecord>(&format!(
            "INSERT INTO tasks (title, description, priority, due_on, assignee, deal_id, client_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {TASK_COLUMNS}"
        ))
        .bind(params.title)
        .bind(params.description)
        .bind(params.priority)
        .bind(params.due_on)
        .bind(params.assignee)
        .bind(params.deal_id)
        .bind(params.client_id)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn update_task(&self, id: Uuid, params: TaskParams) -> Result<TaskRecord, RepoError> {
        sqlx::query_as::<_, TaskRecord>(&format!(
            "UPDATE tasks SET title = $2, description = $3, priority = $4, due_on = $5, \
             assignee = $6, deal_id = $7, client_id = $8, updated_at = now() \
             WHERE id = $1 RETURNING {TASK_COLUMNS}"
        ))
        .bind(id)
        .bind(params.title)
        .bind(params.description)
        .bind(params.priority)
        .bind(params.due_on)
        .bind(params.assignee)
        .bind(params.deal_id)
        .bind(params.client_id)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn set_task_status(
        &self,
        id: Uuid,
        status: TaskStatus,
        completed_at: Option<OffsetDateTime>,
    ) -> Result<TaskRecord, RepoError> {
        sqlx::query_as::<_, TaskRecord>(&format!(
            "UPDATE tasks SET status = $2, completed_at = $3, updated_at = now() \
             WHERE id = $1 RETURNING {TASK_COLUMNS}"
        ))
        .bind(id)
        .bind(status)
        .bind(completed_at)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn find_task(&self, id: Uuid) -> Result<Option<TaskRecord>, RepoError> {
        sqlx::query_as::<_, TaskRecord>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn list_tasks(
        &self,
        page: PageRequest<DueCursor>,
        filter: &TaskQueryFilter,
    ) -> Result<CursorPage<TaskRecord>, RepoError> {
        let mut qb = QueryBuilder::new(format!("SELECT {TASK_COLUMNS} FROM tasks WHERE 1=1 "));
        if let Some(status) = filter.status {
            qb.push(" AND status = ");
            qb.push_bind(status);
        }
        if let Some(priority) = filter.priority {
            qb.push(" AND priority = ");
            qb.push_bind(priority);
        }
        if let Some(deal_id) = filter.deal_id {
            qb.push(" AND deal_id = ");
            qb.push_bind(deal_id);
        }
        if let Some(assignee) = filter.assignee.as_ref() {
            qb.push(" AND assignee = ");
            qb.push_bind(assignee.clone());
        }
        if let Some(today) = filter.overdue_before {
            qb.push(" AND status <> 'done' AND due_on < ");
            qb.push_bind(today);
        }
        // Nulls sort last, so a dated cursor still has every undated row ahead of it.
        if let Some(cursor) = page.cursor.as_ref() {
            let (due_on, created_at) = *cursor.key();
            match due_on {
                Some(due_on) => {
                    qb.push(" AND (due_on > ");
                    qb.push_bind(due_on);
                    qb.push(" OR due_on IS NULL OR (due_on = ");
                    qb.push_bind(due_on);
                    qb.push(" AND (created_at, id) > (");
                    qb.push_bind(created_at);
                    qb.push(", ");
                    qb.push_bind(cursor.id());
                    qb.push(")))");
                }
                None => {
                    qb.push(" AND due_on IS NULL AND (created_at, id) > (");
                    qb.push_bind(created_at);
                    qb.push(", ");
                    qb.push_bind(cursor.id());
                    qb.push(")");
                }
            }
        }
        qb.push(" ORDER BY due_on ASC NULLS LAST, created_at ASC, id ASC LIMIT ");
        qb.push_bind(page.fetch_limit());

        let rows = qb
            .build_query_as::<TaskRecord>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(Self::finish_page(rows, &page, |task| {
            DueCursor::new((task.due_on, task.created_at), task.id).encode()
        }))
    }

    async fn delete_task(&self, id: Uuid) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
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
