use async_trait::async_trait;
use sqlx::QueryBuilder;

use crate::{
    application::pagination::{CursorPage, PageRequest, TimeCursor},
    application::repos::{ActivityQueryFilter, ActivityRepo, RepoError},
    domain::entities::ActivityRecord,
};

use super::{PostgresRepositories, map_sqlx_error};

#[async_trait]
impl ActivityRepo for PostgresRepositories {
    async fn append_activity(&self, record: ActivityRecord) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            INSERT INTO activity_log (id, actor, action, entity_type, entity_id, payload_text, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(record.id)
        .bind(record.actor)
        .bind(record.action)
        .bind(record.entity_type)
        .bind(record.entity_id)
        .bind(record.payload_text)
        .bind(record.created_at)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn list_activity(
        &self,
        page: PageRequest<TimeCursor>,
        filter: &ActivityQueryFilter,
    ) -> Result<CursorPage<ActivityRecord>, RepoError> {
        let mut qb = QueryBuilder::new(
            "SELECT id, actor, action, entity_type, entity_id, payload_text, created_at \
             FROM activity_log WHERE 1=1 ",
        );

        if let Some(actor) = filter.actor.as_ref() {
            qb.push(" AND actor ILIKE ");
            qb.push_bind(format!("%{actor}%"));
        }

        if let Some(action) = filter.action.as_ref() {
            qb.push(" AND action ILIKE ");
            qb.push_bind(format!("%{action}%"));
        }

        if let Some(entity_type) = filter.entity_type.as_ref() {
            qb.push(" AND entity_type = ");
            qb.push_bind(entity_type.clone());
        }

        if let Some(search) = filter.search.as_ref() {
            Self::push_search(&mut qb, &["entity_id", "payload_text"], search);
        }

        if let Some(cursor) = page.cursor.as_ref() {
            Self::push_keyset(&mut qb, "created_at, id", "<", cursor);
        }

        qb.push(" ORDER BY created_at DESC, id DESC LIMIT ");
        qb.push_bind(page.fetch_limit());

        let rows = qb
            .build_query_as::<ActivityRecord>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(Self::finish_page(rows, &page, |entry| {
            TimeCursor::new(entry.created_at, entry.id).encode()
        }))
    }
}
