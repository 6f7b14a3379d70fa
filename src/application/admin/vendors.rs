use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::application::admin::audit::ActivityService;
use crate::application::pagination::{CursorPage, PageRequest, TimeCursor};
use crate::application::repos::{RepoError, VendorParams, VendorQueryFilter, VendorsRepo};
use crate::domain::entities::VendorRecord;
use crate::domain::error::DomainError;
use crate::domain::types::VendorCategory;
use crate::domain::validate;
use lectern_api_types::{VendorCreateRequest, VendorUpdateRequest};

#[derive(Debug, Error)]
pub enum AdminVendorError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Clone)]
pub struct AdminVendorService {
    repo: Arc<dyn VendorsRepo>,
    audit: ActivityService,
}

impl AdminVendorService {
    pub fn new(repo: Arc<dyn VendorsRepo>, audit: ActivityService) -> Self {
        Self { repo, audit }
    }

    pub async fn list(
        &self,
        filter: &VendorQueryFilter,
        page: PageRequest<TimeCursor>,
    ) -> Result<CursorPage<VendorRecord>, AdminVendorError> {
        Ok(self.repo.list_vendors(page, filter).await?)
    }

    pub async fn get(&self, id: Uuid) -> Result<VendorRecord, AdminVendorError> {
        self.repo
            .find_vendor(id)
            .await?
            .ok_or_else(|| DomainError::not_found("vendor").into())
    }

    pub async fn create(
        &self,
        actor: &str,
        request: VendorCreateRequest,
    ) -> Result<VendorRecord, AdminVendorError> {
        let vendor = self.repo.create_vendor(vendor_params(request)?).await?;
        self.log(actor, "vendor.create", &vendor).await?;
        Ok(vendor)
    }

    pub async fn update(
        &self,
        actor: &str,
        id: Uuid,
        request: VendorUpdateRequest,
    ) -> Result<VendorRecord, AdminVendorError> {
        let vendor = self
            .repo
            .update_vendor(id, vendor_params(request)?)
            .await
            .map_err(|err| match err {
                RepoError::NotFound => DomainError::not_found("vendor").into(),
                other => AdminVendorError::from(other),
            })?;
        self.log(actor, "vendor.update", &vendor).await?;
        Ok(vendor)
    }

    pub async fn delete(&self, actor: &str, id: Uuid) -> Result<(), AdminVendorError> {
        let vendor = self.get(id).await?;
        self.repo.delete_vendor(id).await?;
        self.log(actor, "vendor.delete", &vendor).await?;
        Ok(())
    }

    async fn log(
        &self,
        actor: &str,
        action: &str,
        vendor: &VendorRecord,
    ) -> Result<(), AdminVendorError> {
        let snapshot = VendorSnapshot {
            name: &vendor.name,
            category: vendor.category,
            active: vendor.active,
        };
        self.audit
            .record(
                actor,
                action,
                "vendor",
                Some(&vendor.id.to_string()),
                Some(&snapshot),
            )
            .await?;
        Ok(())
    }
}

fn vendor_params(request: VendorCreateRequest) -> Result<VendorParams, AdminVendorError> {
    let email = match validate::optional(request.email.as_deref()) {
        Some(email) => Some(validate::email(&email)?),
        None => None,
    };
    let website = match validate::optional(request.website.as_deref()) {
        Some(url) => Some(validate::web_url("website", &url)?),
        None => None,
    };

    Ok(VendorParams {
        name: validate::required("name", &request.name)?,
        category: request.category,
        contact_name: validate::optional(request.contact_name.as_deref()),
        email,
        phone: validate::optional(request.phone.as_deref()),
        website,
        rating: validate::rating(request.rating)?,
        notes: request.notes.trim().to_string(),
        active: request.active,
    })
}

#[derive(Debug, Serialize)]
struct VendorSnapshot<'a> {
    name: &'a str,
    category: VendorCategory,
    active: bool,
}
