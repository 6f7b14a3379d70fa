use async_trait::async_trait;
use sqlx::QueryBuilder;
use uuid::Uuid;

use crate::{
    application::pagination::{CursorPage, PageRequest, TimeCursor},
    application::repos::{
        ClientQueryFilter, ClientsRepo, CreateClientParams, RepoError, UpdateClientParams,
    },
    domain::entities::ClientRecord,
};

use super::{PostgresRepositories, map_sqlx_error};

const CLIENT_COLUMNS: &str =
    "id, name, email, company, phone, notes, portal_token, created_at, updated_at";

#[async_trait]
impl ClientsRepo for PostgresRepositories {
    async fn create_client(&self, params: CreateClientParams) -> Result<ClientRecord, RepoError> {
        sqlx::query_as::<_, ClientRecord>(&format!(
            "INSERT INTO clients (name, email, company, phone, notes, portal_token) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {CLIENT_COLUMNS}"
        ))
        .bind(params.name)
        .bind(params.email)
        .bind(params.company)
        .bind(params.phone)
        .bind(params.notes)
        .bind(params.portal_token)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn update_client(&self, params: UpdateClientParams) -> Result<ClientRecord, RepoError> {
        sqlx::query_as::<_, ClientRecord>(&format!(
            "UPDATE clients SET name = $2, email = $3, company = $4, phone = $5, notes = $6, \
             updated_at = now() WHERE id = $1 RETURNING {CLIENT_COLUMNS}"
        ))
        .bind(params.id)
        .bind(params.name)
        .bind(params.email)
        .bind(params.company)
        .bind(params.phone)
        .bind(params.notes)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn find_client(&self, id: Uuid) -> Result<Option<ClientRecord>, RepoError> {
        sqlx::query_as::<_, ClientRecord>(&format!(
            "SELECT {CLIENT_COLUMNS} FROM clients WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn find_client_by_email(&self, email: &str) -> Result<Option<ClientRecord>, RepoError> {
        sqlx::query_as::<_, ClientRecord>(&format!(
            "SELECT {CLIENT_COLUMNS} FROM clients WHERE lower(email) = lower($1)"
        ))
        .bind(email)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn find_client_by_portal_token(
        &self,
        token: &str,
    ) -> Result<Option<ClientRecord>, RepoError> {
        sqlx::query_as::<_, ClientRecord>(&format!(
            "SELECT {CLIENT_COLUMNS} FROM clients WHERE portal_token = $1"
        ))
        .bind(token)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn list_clients(
        &self,
        page: PageRequest<TimeCursor>,
        filter: &ClientQueryFilter,
    ) -> Result<CursorPage<ClientRecord>, RepoError> {
        let mut qb = QueryBuilder::new(format!("SELECT {CLIENT_COLUMNS} FROM clients WHERE 1=1 "));
        if let Some(search) = filter.search.as_ref() {
            Self::push_search(&mut qb, &["name", "email", "company"], search);
        }
        if let Some(cursor) = page.cursor.as_ref() {
            Self::push_keyset(&mut qb, "created_at, id", "<", cursor);
        }
        qb.push(" ORDER BY created_at DESC, id DESC LIMIT ");
        qb.push_bind(page.fetch_limit());

        let rows = qb
            .build_query_as::<ClientRecord>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(Self::finish_page(rows, &page, |client| {
            TimeCursor::new(client.created_at, client.id).encode()
        }))
    }

    async fn count_deals_for_client(&self, id: Uuid) -> Result<u64, RepoError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM deals WHERE client_id = $1")
            .bind(id)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Self::convert_count(count)
    }

    async fn delete_client(&self, id: Uuid) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM clients WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn set_client_portal_token(
        &self,
        id: Uuid,
        token: &str,
    ) -> Result<ClientRecord, RepoError> {
        sqlx::query_as::<_, ClientRecord>(&format!(
            "UPDATE clients SET portal_token = $2, updated_at = now() WHERE id = $1 \
             RETURNING {CLIENT_COLUMNS}"
        ))
        .bind(id)
        .bind(token)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)
    }
}
