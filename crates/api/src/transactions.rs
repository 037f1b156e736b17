use std::time::Duration;

use accounts_contracts::Transaction;
use accounts_validation::RequestContext;
use reqwest::Url;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionLookupError {
    pub code: &'static str,
    pub message: String,
}

impl std::fmt::Display for TransactionLookupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for TransactionLookupError {}

/// Resolves transactions from the transactions API.
#[derive(Clone)]
pub struct TransactionsClient {
    http: reqwest::Client,
    base_url: Url,
}

impl TransactionsClient {
    pub fn new(base_url: &Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.clone(),
        })
    }

    /// The id is pushed as one escaped path segment, so `/`, `?` and `%`
    /// inside it never reach the transactions API as path structure.
    fn transaction_url(&self, transaction_id: &str) -> Option<Url> {
        if matches!(transaction_id, "" | "." | "..") {
            return None;
        }

        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .ok()?
            .pop_if_empty()
            .push("transactions")
            .push(transaction_id);
        Some(url)
    }

    /// `Ok(None)` when the transactions API does not know the id.
    pub async fn fetch(
        &self,
        transaction_id: &str,
        ctx: &RequestContext,
    ) -> Result<Option<Transaction>, TransactionLookupError> {
        let Some(url) = self.transaction_url(transaction_id) else {
            return Ok(None);
        };
        let response = forward_request_headers(self.http.get(url), ctx)
            .send()
            .await
            .map_err(|err| TransactionLookupError {
                code: "ERR_TRANSACTIONS_UNAVAILABLE",
                message: if err.is_timeout() {
                    "transactions api request timed out".to_string()
                } else {
                    "transactions api request failed".to_string()
                },
            })?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !response.status().is_success() {
            return Err(TransactionLookupError {
                code: "ERR_TRANSACTIONS_UNAVAILABLE",
                message: format!(
                    "transactions api returned status {}",
                    response.status().as_u16()
                ),
            });
        }

        let transaction = response
            .json::<Transaction>()
            .await
            .map_err(|_| TransactionLookupError {
                code: "ERR_TRANSACTIONS_UNAVAILABLE",
                message: "transactions api returned an invalid body".to_string(),
            })?;

        Ok(Some(transaction))
    }
}

pub(crate) fn forward_request_headers(
    builder: reqwest::RequestBuilder,
    ctx: &RequestContext,
) -> reqwest::RequestBuilder {
    let builder = builder.header(REQUEST_ID_HEADER, ctx.request_id.as_str());
    match ctx.authorization.as_deref() {
        Some(authorization) => builder.header(reqwest::header::AUTHORIZATION, authorization),
        None => builder,
    }
}
