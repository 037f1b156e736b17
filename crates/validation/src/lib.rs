use std::sync::Arc;

use accounts_contracts::{Errors, Transaction};
use async_trait::async_trait;
use tracing::Instrument;

/// Per-request state resolved once at the host boundary.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub request_id: String,
    pub trace_id: String,
    pub authorization: Option<String>,
    transaction: Option<Arc<Transaction>>,
}

impl RequestContext {
    pub fn new(request_id: impl Into<String>, trace_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            trace_id: trace_id.into(),
            authorization: None,
            transaction: None,
        }
    }

    pub fn with_authorization(mut self, authorization: Option<String>) -> Self {
        self.authorization = authorization;
        self
    }

    pub fn with_transaction(mut self, transaction: Transaction) -> Self {
        self.transaction = Some(Arc::new(transaction));
        self
    }

    pub fn transaction(&self) -> Option<&Transaction> {
        self.transaction.as_deref()
    }
}

/// Raised by a validator that could not load the data it needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFailure {
    pub code: &'static str,
    pub message: String,
}

impl DataFailure {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for DataFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for DataFailure {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationStatusError {
    MissingTransaction,
    Data(DataFailure),
}

impl ValidationStatusError {
    pub fn code(&self) -> &'static str {
        match self {
            ValidationStatusError::MissingTransaction => "ERR_TRANSACTION_NOT_FOUND",
            ValidationStatusError::Data(failure) => failure.code,
        }
    }
}

impl std::fmt::Display for ValidationStatusError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationStatusError::MissingTransaction => {
                write!(f, "no transaction attached to the request")
            }
            ValidationStatusError::Data(failure) => write!(f, "{}", failure),
        }
    }
}

impl std::error::Error for ValidationStatusError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ValidationStatusError::MissingTransaction => None,
            ValidationStatusError::Data(failure) => Some(failure),
        }
    }
}

impl From<DataFailure> for ValidationStatusError {
    fn from(value: DataFailure) -> Self {
        ValidationStatusError::Data(value)
    }
}

#[async_trait]
pub trait SubmissionValidator: Send + Sync {
    async fn validation_submission(
        &self,
        transaction: &Transaction,
        company_accounts_id: &str,
        ctx: &RequestContext,
    ) -> Result<Errors, DataFailure>;
}

#[derive(Clone)]
pub struct ValidationStatusService {
    validator: Arc<dyn SubmissionValidator>,
}

impl ValidationStatusService {
    pub fn new(validator: Arc<dyn SubmissionValidator>) -> Self {
        Self { validator }
    }

    pub async fn get_validation_errors(
        &self,
        company_accounts_id: &str,
        ctx: &RequestContext,
    ) -> Result<Errors, ValidationStatusError> {
        let Some(transaction) = ctx.transaction() else {
            tracing::warn!(
                request_id = %ctx.request_id,
                trace_id = %ctx.trace_id,
                company_accounts_id = %company_accounts_id,
                "validation_status.missing_transaction"
            );
            return Err(ValidationStatusError::MissingTransaction);
        };

        let span = tracing::info_span!(
            "validation_status.evaluate",
            request_id = %ctx.request_id,
            trace_id = %ctx.trace_id,
            transaction_id = %transaction.id,
            company_accounts_id = %company_accounts_id,
            outcome = tracing::field::Empty,
            error_count = tracing::field::Empty,
        );

        async {
            let result = self
                .validator
                .validation_submission(transaction, company_accounts_id, ctx)
                .await;

            let current = tracing::Span::current();
            match result {
                Ok(errors) => {
                    current.record(
                        "outcome",
                        if errors.has_errors() { "invalid" } else { "valid" },
                    );
                    current.record("error_count", errors.error_count() as u64);
                    Ok(errors)
                }
                Err(failure) => {
                    current.record("outcome", "data_failure");
                    tracing::warn!(code = failure.code, "validation_status.data_failure");
                    Err(ValidationStatusError::Data(failure))
                }
            }
        }
        .instrument(span)
        .await
    }
}
