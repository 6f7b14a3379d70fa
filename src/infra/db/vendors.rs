use async_trait::async_trait;
use sqlx::QueryBuilder;
use uuid::Uuid;

use crate::{
    application::pagination::{CursorPage, PageRequest, TimeCursor},
    application::repos::{RepoError, VendorParams, VendorQueryFilter, VendorsRepo},
    domain::entities::VendorRecord,
};

use super::{PostgresRepositories, map_sqlx_error};

const VENDOR_COLUMNS: &str = "id, name, category, contact_name, email, phone, website, rating, \
     notes, active, created_at, updated_at";

#[async_trait]
impl VendorsRepo for PostgresRepositories {
    async fn create_vendor(&self, params: VendorParams) -> Result<VendorRecord, RepoError> {
        sqlx::query_as::<_, VendorRecord>(&format!(
            "INSERT INTO vendors (name, category, contact_name, email, phone, website, rating, \
             notes, active) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {VENDOR_COLUMNS}"
        ))
        .bind(params.name)
        .bind(params.category)
        .bind(params.contact_name)
        .bind(params.email)
        .bind(params.phone)
        .bind(params.website)
        .bind(params.rating)
        .bind(params.notes)
        .bind(params.active)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn update_vendor(
        &self,
        id: Uuid,
        params: VendorParams,
    ) -> Result<VendorRecord, RepoError> {
        sqlx::query_as::<_, VendorRecord>(&format!(
            "UPDATE vendors SET name = $2, category = $3, contact_name = $4, email = $5, \
             phone = $6, website = $7, rating = $8, notes = $9, active = $10, \
             updated_at = now() WHERE id = $1 RETURNING {VENDOR_COLUMNS}"
        ))
        .bind(id)
        .bind(params.name)
        .bind(params.category)
        .bind(params.contact_name)
        .bind(params.email)
        .bind(params.phone)
        .bind(params.website)
        .bind(params.rating)
        .bind(params.notes)
        .bind(params.active)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn find_vendor(&self, id: Uuid) -> Result<Option<VendorRecord>, RepoError> {
        sqlx::query_as::<_, VendorRecord>(&format!(
            "SELECT {VENDOR_COLUMNS} FROM vendors WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn list_vendors(
        &self,
        page: PageRequest<TimeCursor>,
        filter: &VendorQueryFilter,
    ) -> Result<CursorPage<VendorRecord>, RepoError> {
        let mut qb = QueryBuilder::new(format!("SELECT {VENDOR_COLUMNS} FROM vendors WHERE 1=1 "));
        if let Some(category) = filter.category {
            qb.push(" AND category = ");
            qb.push_bind(category);
        }
        if let Some(active) = filter.active {
            qb.push(" AND active = ");
            qb.push_bind(active);
        }
        if let Some(search) = filter.search.as_ref() {
            Self::push_search(&mut qb, &["name", "contact_name", "email"], search);
        }
        if let Some(cursor) = page.cursor.as_ref() {
            Self::push_keyset(&mut qb, "created_at, id", "<", cursor);
        }
        qb.push(" ORDER BY created_at DESC, id DESC LIMIT ");
        qb.push_bind(page.fetch_limit());

        let rows = qb
            .build_query_as::<VendorRecord>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(Self::finish_page(rows, &page, |vendor| {
            TimeCursor::new(vendor.created_at, vendor.id).encode()
        }))
    }

    async fn delete_vendor(&self, id: Uuid) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM vendors WHERE id = $1")
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
