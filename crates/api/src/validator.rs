use std::time::Duration;

use accounts_contracts::{AccountsResource, Errors, Transaction, ValidationError};
use accounts_validation::{DataFailure, RequestContext, SubmissionValidator};
use async_trait::async_trait;
use reqwest::Url;

use crate::transactions::forward_request_headers;

const SMALL_FULL_LINK: &str = "small_full";
const REQUIRED_SMALL_FULL_LINKS: &[&str] = &["balance_sheet", "statements", "approval"];

const INVALID_TRANSACTION_RESOURCE: &str = "invalid.transaction.resource";
const MANDATORY_ELEMENT_MISSING: &str = "mandatory.element.missing";

/// Checks that a company-accounts submission is structurally complete
/// by walking its links on the accounts data API.
#[derive(Clone)]
pub struct CompanyAccountsValidator {
    http: reqwest::Client,
    data_api_url: Url,
}

impl CompanyAccountsValidator {
    pub fn new(data_api_url: &Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            data_api_url: data_api_url.clone(),
        })
    }

    fn company_accounts_url(
        &self,
        transaction_id: &str,
        company_accounts_id: &str,
    ) -> Result<Url, DataFailure> {
        let mut url = self.data_api_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                DataFailure::new(
                    "ERR_DATA_INVALID",
                    "accounts data api url cannot carry a path",
                )
            })?
            .pop_if_empty()
            .extend([
                "transactions",
                transaction_id,
                "company-accounts",
                company_accounts_id,
            ]);
        Ok(url)
    }

    /// Links returned by the data API must be absolute paths that resolve
    /// to the data API's own origin.
    fn resolve_link(&self, link: &str) -> Result<Url, DataFailure> {
        let refused = || {
            DataFailure::new(
                "ERR_DATA_INVALID",
                format!("accounts data api returned a link outside its origin: {}", link),
            )
        };

        if !link.starts_with('/') || link.starts_with("//") {
            return Err(refused());
        }
        let url = self.data_api_url.join(link).map_err(|_| refused())?;
        if url.origin() != self.data_api_url.origin() {
            return Err(refused());
        }
        Ok(url)
    }

    async fn fetch_resource(
        &self,
        url: Url,
        ctx: &RequestContext,
    ) -> Result<AccountsResource, DataFailure> {
        let path = url.path().to_string();
        let response = forward_request_headers(self.http.get(url), ctx)
            .send()
            .await
            .map_err(|err| {
                tracing::warn!(
                    request_id = %ctx.request_id,
                    path = %path,
                    timeout = err.is_timeout(),
                    "validator.data_api_unreachable"
                );
                DataFailure::new(
                    "ERR_DATA_UNAVAILABLE",
                    format!("accounts data api request failed for {}", path),
                )
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(DataFailure::new(
                "ERR_DATA_NOT_FOUND",
                format!("accounts resource {} not found", path),
            ));
        }
        if !status.is_success() {
            return Err(DataFailure::new(
                "ERR_DATA_UPSTREAM",
                format!(
                    "accounts data api returned status {} for {}",
                    status.as_u16(),
                    path
                ),
            ));
        }

        response.json::<AccountsResource>().await.map_err(|_| {
            DataFailure::new(
                "ERR_DATA_INVALID",
                format!("accounts data api returned an invalid body for {}", path),
            )
        })
    }
}

#[async_trait]
impl SubmissionValidator for CompanyAccountsValidator {
    async fn validation_submission(
        &self,
        transaction: &Transaction,
        company_accounts_id: &str,
        ctx: &RequestContext,
    ) -> Result<Errors, DataFailure> {
        let mut errors = Errors::new();

        let company_accounts_uri = transaction.company_accounts_uri(company_accounts_id);
        if !transaction.has_resource(&company_accounts_uri) {
            errors.add_error(ValidationError::validation(
                INVALID_TRANSACTION_RESOURCE,
                "$.company_accounts",
            ));
            return Ok(errors);
        }

        let company_accounts_url = self.company_accounts_url(&transaction.id, company_accounts_id)?;
        let company_accounts = self.fetch_resource(company_accounts_url, ctx).await?;
        let Some(small_full_link) = company_accounts.link(SMALL_FULL_LINK) else {
            errors.add_error(ValidationError::validation(
                MANDATORY_ELEMENT_MISSING,
                format!("$.company_accounts.{}", SMALL_FULL_LINK),
            ));
            return Ok(errors);
        };

        let small_full_url = self.resolve_link(small_full_link)?;
        let small_full = self.fetch_resource(small_full_url, ctx).await?;
        for name in REQUIRED_SMALL_FULL_LINKS {
            if small_full.link(name).is_none() {
                errors.add_error(ValidationError::validation(
                    MANDATORY_ELEMENT_MISSING,
                    format!("$.{}.{}", SMALL_FULL_LINK, name),
                ));
            }
        }

        Ok(errors)
    }
}
