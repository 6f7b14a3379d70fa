use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::application::admin::audit::ActivityService;
use crate::application::pagination::{CursorPage, PageRequest, TimeCursor};
use crate::application::repos::{
    ClientQueryFilter, ClientsRepo, CreateClientParams, RepoError, UpdateClientParams,
};
use crate::application::tokens::issue_token;
use crate::domain::entities::ClientRecord;
use crate::domain::error::DomainError;
use crate::domain::validate;
use lectern_api_types::{ClientCreateRequest, ClientUpdateRequest};

#[derive(Debug, Error)]
pub enum AdminClientError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("client is referenced by {count} deals")]
    InUse { count: u64 },
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Clone)]
pub struct AdminClientService {
    repo: Arc<dyn ClientsRepo>,
    audit: ActivityService,
}

impl AdminClientService {
    pub fn new(repo: Arc<dyn ClientsRepo>, audit: ActivityService) -> Self {
        Self { repo, audit }
    }

    pub async fn list(
        &self,
        filter: &ClientQueryFilter,
        page: PageRequest<TimeCursor>,
    ) -> Result<CursorPage<ClientRecord>, AdminClientError> {
        Ok(self.repo.list_clients(page, filter).await?)
    }

    pub async fn get(&self, id: Uuid) -> Result<ClientRecord, AdminClientError> {
        self.repo
            .find_client(id)
            .await?
            .ok_or_else(|| DomainError::not_found("client").into())
    }

    pub async fn create(
        &self,
        actor: &str,
        request: ClientCreateRequest,
    ) -> Result<ClientRecord, AdminClientError> {
        let params = CreateClientParams {
            name: validate::required("name", &request.name)?,
            email: validate::email(&request.email)?,
            company: validate::optional(request.company.as_deref()),
            phone: validate::optional(request.phone.as_deref()),
            notes: request.notes.trim().to_string(),
            portal_token: issue_token(),
        };

        let client = self.repo.create_client(params).await?;
        self.audit
            .record(
                actor,
                "client.create",
                "client",
                Some(&client.id.to_string()),
                Some(&ClientSnapshot::from(&client)),
            )
            .await?;
        Ok(client)
    }

    pub async fn update(
        &self,
        actor: &str,
        id: Uuid,
        request: ClientUpdateRequest,
    ) -> Result<ClientRecord, AdminClientError> {
        let params = UpdateClientParams {
            id,
            name: validate::required("name", &request.name)?,
            email: validate::email(&request.email)?,
            company: validate::optional(request.company.as_deref()),
            phone: validate::optional(request.phone.as_deref()),
            notes: request.notes.trim().to_string(),
        };

        let client = self.repo.update_client(params).await.map_err(not_found)?;
        self.audit
            .record(
                actor,
                "client.update",
                "client",
                Some(&client.id.to_string()),
                Some(&ClientSnapshot::from(&client)),
            )
            .await?;
        Ok(client)
    }

    pub async fn delete(&self, actor: &str, id: Uuid) -> Result<(), AdminClientError> {
        let client = self.get(id).await?;
        let count = self.repo.count_deals_for_client(id).await?;
        if count > 0 {
            return Err(AdminClientError::InUse { count });
        }

        self.repo.delete_client(id).await?;
        self.audit
            .record(
                actor,
                "client.delete",
                "client",
                Some(&id.to_string()),
                Some(&ClientSnapshot::from(&client)),
            )
            .await?;
        Ok(())
    }

    /// Issue a fresh portal token; the previous portal link stops working.
    pub async fn rotate_portal_token(
        &self,
        actor: &str,
        id: Uuid,
    ) -> Result<ClientRecord, AdminClientError> {
        let client = self
            .repo
            .set_client_portal_token(id, &issue_token())
            .await
            .map_err(not_found)?;
        self.audit
            .record(
                actor,
                "client.rotate_token",
                "client",
                Some(&id.to_string()),
                Option::<&ClientSnapshot>::None,
            )
            .await?;
        Ok(client)
    }
}

fn not_found(err: RepoError) -> AdminClientError {
    match err {
        RepoError::NotFound => DomainError::not_found("client").into(),
        other => other.into(),
    }
}

#[derive(Debug, Serialize)]
struct ClientSnapshot<'a> {
    name: &'a str,
    email: &'a str,
}

impl<'a> From<&'a ClientRecord> for ClientSnapshot<'a> {
    fn from(client: &'a ClientRecord) -> Self {
        Self {
            name: &client.name,
            email: &client.email,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::{MemoryStore, services};

    fn request(email: &str) -> ClientCreateRequest {
        ClientCreateRequest {
            name: "  Acme Events ".into(),
            email: email.into(),
            company: Some(" ".into()),
            phone: None,
            notes: String::new(),
        }
    }

    #[tokio::test]
    async fn create_normalizes_fields_and_logs() {
        let store = MemoryStore::shared();
        let service = services(&store).clients;

        let client = service
            .create("admin", request("Events@Acme.TEST"))
            .await
            .unwrap();
        assert_eq!(client.name, "Acme Events");
        assert_eq!(client.email, "events@acme.test");
        assert_eq!(client.company, None);
        assert_eq!(client.portal_token.len(), 64);
        assert_eq!(store.activity.actions(), vec!["client.create"]);
    }

    #[tokio::test]
    async fn create_rejects_bad_email() {
        let store = MemoryStore::shared();
        let service = services(&store).clients;
        let err = service.create("admin", request("nope")).await.unwrap_err();
        assert!(matches!(err, AdminClientError::Domain(DomainError::Validation { .. })));
    }

    #[tokio::test]
    async fn delete_is_blocked_by_deals() {
        let store = MemoryStore::shared();
        let services = services(&store);
        let client = services
            .clients
            .create("admin", request("a@b.test"))
            .await
            .unwrap();
        store.seed_deal(client.id, None);

        let err = services.clients.delete("admin", client.id).await.unwrap_err();
        assert!(matches!(err, AdminClientError::InUse { count: 1 }));
    }

    #[tokio::test]
    async fn rotate_replaces_portal_token() {
        let store = MemoryStore::shared();
        let service = services(&store).clients;
        let client = service.create("admin", request("a@b.test")).await.unwrap();
        let rotated = service.rotate_portal_token("admin", client.id).await.unwrap();
        assert_ne!(rotated.portal_token, client.portal_token);

        let missing = service
            .rotate_portal_token("admin", Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(missing, AdminClientError::Domain(DomainError::NotFound { .. })));
    }
}
