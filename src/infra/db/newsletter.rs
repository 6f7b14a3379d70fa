use async_trait::async_trait;
use sqlx::QueryBuilder;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    application::pagination::{CursorPage, PageRequest, TimeCursor},
    application::repos::{
        CampaignParams, CampaignsRepo, NewSubscriberParams, RepoError, SubscriberQueryFilter,
        SubscribersRepo,
    },
    domain::entities::{CampaignRecord, SubscriberRecord},
};

use super::{PostgresRepositories, map_sqlx_error};

const SUBSCRIBER_COLUMNS: &str =
    "id, email, name, status, unsubscribe_token, source, subscribed_at, unsubscribed_at";

const CAMPAIGN_COLUMNS: &str = "id, subject, preheader, body_markdown, status, recipient_count, \
     rendered_html, sent_at, created_at, updated_at";

#[async_trait]
impl SubscribersRepo for PostgresRepositories {
    async fn find_subscriber_by_email(
        &self,
        email: &str,
    ) -> Result<Option<SubscriberRecord>, RepoError> {
        sqlx::query_as::<_, SubscriberRecord>(&format!(
            "SELECT {SUBSCRIBER_COLUMNS} FROM subscribers WHERE lower(email) = lower($1)"
        ))
        .bind(email)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn insert_subscriber(
        &self,
        params: NewSubscriberParams,
    ) -> Result<SubscriberRecord, RepoError> {
        sqlx::query_as::<_, SubscriberRecord>(&format!(
            "INSERT INTO subscribers (email, name, source, unsubscribe_token) \
             VALUES ($1, $2, $3, $4) RETURNING {SUBSCRIBER_COLUMNS}"
        ))
        .bind(params.email)
        .bind(params.name)
        .bind(params.source)
        .bind(params.unsubscribe_token)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn reactivate_subscriber(
        &self,
        id: Uuid,
        name: Option<String>,
    ) -> Result<SubscriberRecord, RepoError> {
        sqlx::query_as::<_, SubscriberRecord>(&format!(
            "UPDATE subscribers SET status = 'active', name = COALESCE($2, name), \
             subscribed_at = now(), unsubscribed_at = NULL \
             WHERE id = $1 RETURNING {SUBSCRIBER_COLUMNS}"
        ))
        .bind(id)
        .bind(name)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn unsubscribe_by_token(
        &self,
        token: &str,
        at: OffsetDateTime,
    ) -> Result<Option<SubscriberRecord>, RepoError> {
        sqlx::query_as::<_, SubscriberRecord>(&format!(
            "UPDATE subscribers SET status = 'unsubscribed', \
             unsubscribed_at = COALESCE(unsubscribed_at, $2) \
             WHERE unsubscribe_token = $1 RETURNING {SUBSCRIBER_COLUMNS}"
        ))
        .bind(token)
        .bind(at)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn list_subscribers(
        &self,
        page: PageRequest<TimeCursor>,
        filter: &SubscriberQueryFilter,
    ) -> Result<CursorPage<SubscriberRecord>, RepoError> {
        let mut qb = QueryBuilder::new(format!(
            "SELECT {SUBSCRIBER_COLUMNS} FROM subscribers WHERE 1=1 "
        ));
        if let Some(status) = filter.status {
            qb.push(" AND status = ");
            qb.push_bind(status);
        }
        if let Some(search) = filter.search.as_ref() {
            Self::push_search(&mut qb, &["email", "name"], search);
        }
        if let Some(cursor) = page.cursor.as_ref() {
            Self::push_keyset(&mut qb, "subscribed_at, id", "<", cursor);
        }
        qb.push(" ORDER BY subscribed_at DESC, id DESC LIMIT ");
        qb.push_bind(page.fetch_limit());

        let rows = qb
            .build_query_as::<SubscriberRecord>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(Self::finish_page(rows, &page, |subscriber| {
            TimeCursor::new(subscriber.subscribed_at, subscriber.id).encode()
        }))
    }

    async fn count_active_subscribers(&self) -> Result<u64, RepoError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM subscribers WHERE status = 'active'")
                .fetch_one(self.pool())
                .await
                .map_err(map_sqlx_error)?;
        Self::convert_count(count)
    }

    async fn delete_subscriber(&self, id: Uuid) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM subscribers WHERE id = $1")
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

#[async_trait]
impl CampaignsRepo for PostgresRepositories {
    async fn create_campaign(&self, params: CampaignParams) -> Result<CampaignRecord, RepoError> {
        sqlx::query_as::<_, CampaignRecord>(&format!(
            "INSERT INTO campaigns (subject, preheader, body_markdown) \
             VALUES ($1, $2, $3) RETURNING {CAMPAIGN_COLUMNS}"
        ))
        .bind(params.subject)
        .bind(params.preheader)
        .bind(params.body_markdown)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn update_campaign(
        &self,
        id: Uuid,
        params: CampaignParams,
    ) -> Result<CampaignRecord, RepoError> {
        sqlx::query_as::<_, CampaignRecord>(&format!(
            "UPDATE campaigns SET subject = $2, preheader = $3, body_markdown = $4, \
             updated_at = now() WHERE id = $1 RETURNING {CAMPAIGN_COLUMNS}"
        ))
        .bind(id)
        .bind(params.subject)
        .bind(params.preheader)
        .bind(params.body_markdown)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn find_campaign(&self, id: Uuid) -> Result<Option<CampaignRecord>, RepoError> {
        sqlx::query_as::<_, CampaignRecord>(&format!(
            "SELECT {CAMPAIGN_COLUMNS} FROM campaigns WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn list_campaigns(
        &self,
        page: PageRequest<TimeCursor>,
    ) -> Result<CursorPage<CampaignRecord>, RepoError> {
        let mut qb =
            QueryBuilder::new(format!("SELECT {CAMPAIGN_COLUMNS} FROM campaigns WHERE 1=1 "));
        if let Some(cursor) = page.cursor.as_ref() {
            Self::push_keyset(&mut qb, "created_at, id", "<", cursor);
        }
        qb.push(" ORDER BY created_at DESC, id DESC LIMIT ");
        qb.push_bind(page.fetch_limit());

        let rows = qb
            .build_query_as::<CampaignRecord>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(Self::finish_page(rows, &page, |campaign| {
            TimeCursor::new(campaign.created_at, campaign.id).encode()
        }))
    }

    async fn delete_campaign(&self, id: Uuid) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM campaigns WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn mark_campaign_sent(
        &self,
        id: Uuid,
        rendered_html: &str,
        recipient_count: i32,
        sent_at: OffsetDateTime,
    ) -> Result<Option<CampaignRecord>, RepoError> {
        sqlx::query_as::<_, CampaignRecord>(&format!(
            "UPDATE campaigns SET status = 'sent', rendered_html = $2, recipient_count = $3, \
             sent_at = $4, updated_at = now() \
             WHERE id = $1 AND status = 'draft' RETURNING {CAMPAIGN_COLUMNS}"
        ))
        .bind(id)
        .bind(rendered_html)
        .bind(recipient_count)
        .bind(sent_at)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)
    }
}
