//! Postgres-backed repository implementations.

mod activity;
mod analytics;
mod articles;
mod clients;
mod conferences;
mod contracts;
mod deals;
mod newsletter;
mod speakers;
mod tasks;
mod util;
mod vendors;
mod workshops;

pub use util::map_sqlx_error;

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{
    Postgres, QueryBuilder, query,
    postgres::{PgPool, PgPoolOptions},
};

use crate::application::pagination::{CursorPage, KeysetCursor, PageRequest};
use crate::application::repos::{HealthRepo, RepoError};

#[derive(Clone)]
pub struct PostgresRepositories {
    pool: Arc<PgPool>,
}

impl PostgresRepositories {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
        PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
    }

    pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations")
            .run(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        query("SELECT 1").execute(self.pool()).await.map(|_| ())
    }

    /// `AND (columns) <op> (key, id)` for keyset pagination.
    fn push_keyset<'q, K>(
        qb: &mut QueryBuilder<'q, Postgres>,
        columns: &str,
        op: &str,
        cursor: &KeysetCursor<K>,
    ) where
        K: serde::Serialize
            + serde::de::DeserializeOwned
            + Clone
            + Send
            + sqlx::Encode<'q, Postgres>
            + sqlx::Type<Postgres>
            + 'q,
    {
        qb.push(format!(" AND ({columns}) {op} ("));
        qb.push_bind(cursor.key().clone());
        qb.push(", ");
        qb.push_bind(cursor.id());
        qb.push(")");
    }

    /// `AND (a ILIKE $p OR b ILIKE $p ...)` over the given columns.
    fn push_search<'q>(qb: &mut QueryBuilder<'q, Postgres>, columns: &[&str], search: &str) {
        let pattern = format!("%{}%", search.trim());
        qb.push(" AND (");
        for (index, column) in columns.iter().enumerate() {
            if index > 0 {
                qb.push(" OR ");
            }
            qb.push(format!("COALESCE({column}, '') ILIKE "));
            qb.push_bind(pattern.clone());
        }
        qb.push(")");
    }

    fn finish_page<T, F>(rows: Vec<T>, page: &PageRequest<impl Sized>, cursor_for: F) -> CursorPage<T>
    where
        F: Fn(&T) -> String,
    {
        CursorPage::from_overfetch(rows, page.limit, cursor_for)
    }

    fn convert_count(value: i64) -> Result<u64, RepoError> {
        value
            .try_into()
            .map_err(|_| RepoError::from_persistence("count exceeds supported range"))
    }
}

#[async_trait]
impl HealthRepo for PostgresRepositories {
    async fn ping(&self) -> Result<(), RepoError> {
        self.health_check().await.map_err(map_sqlx_error)
    }
}
