use std::sync::Arc;

use accounts_statements::StatementsProperties;
use accounts_validation::{SubmissionValidator, ValidationStatusService};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use ulid::Ulid;

use crate::config::{ApiConfig, StartupError};
use crate::transactions::{REQUEST_ID_HEADER, TransactionsClient};
use crate::validator::CompanyAccountsValidator;

mod statements;
mod validation_status;

use self::statements::legal_statements;
use self::validation_status::validation_status;

pub const TRACE_ID_HEADER: &str = "x-trace-id";

pub const VALIDATION_STATUS_ROUTE: &str =
    "/transactions/{transaction_id}/company-accounts/{company_accounts_id}/validation-status";
pub const LEGAL_STATEMENTS_ROUTE: &str = "/statements/legal";

#[derive(Clone)]
pub struct AppState {
    statements: Arc<StatementsProperties>,
    validation: ValidationStatusService,
    transactions: TransactionsClient,
}

impl AppState {
    pub fn new(
        config: ApiConfig,
        validator: Arc<dyn SubmissionValidator>,
    ) -> Result<Self, StartupError> {
        let transactions =
            TransactionsClient::new(&config.transactions_api_url, config.upstream_timeout())
                .map_err(|_| StartupError {
                    code: "ERR_INVALID_CONFIG",
                    message: "failed to initialize transactions api client".to_string(),
                })?;

        Ok(Self {
            statements: Arc::new(config.statements),
            validation: ValidationStatusService::new(validator),
            transactions,
        })
    }
}

type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn router(config: ApiConfig) -> Result<Router, StartupError> {
    let validator = CompanyAccountsValidator::new(&config.data_api_url, config.upstream_timeout())
        .map_err(|_| StartupError {
            code: "ERR_INVALID_CONFIG",
            message: "failed to initialize accounts data api client".to_string(),
        })?;

    let state = AppState::new(config, Arc::new(validator))?;
    Ok(router_with_state(state))
}

pub fn router_with_state(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics))
        .route(VALIDATION_STATUS_ROUTE, get(validation_status))
        .route(LEGAL_STATEMENTS_ROUTE, get(legal_statements))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn metrics() -> impl IntoResponse {
    match crate::metrics::render() {
        Ok((body, content_type)) => {
            let mut headers = HeaderMap::new();
            if let Ok(value) = HeaderValue::from_str(content_type.as_str()) {
                headers.insert(header::CONTENT_TYPE, value);
            }
            (headers, body).into_response()
        }
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

fn extract_authorization_header(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string())
}

fn extract_request_id(headers: &HeaderMap) -> String {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .and_then(sanitize_request_id)
        .unwrap_or_else(|| Ulid::new().to_string())
}

fn extract_trace_id(headers: &HeaderMap) -> String {
    headers
        .get(TRACE_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .and_then(|v| v.parse::<Ulid>().ok())
        .map(|u| u.to_string())
        .unwrap_or_else(|| Ulid::new().to_string())
}

fn sanitize_request_id(raw: &str) -> Option<String> {
    const MAX_LEN: usize = 64;
    let mut out = String::with_capacity(raw.len().min(MAX_LEN));

    for ch in raw.chars() {
        if out.len() >= MAX_LEN {
            break;
        }
        if ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.') {
            out.push(ch);
        }
    }

    (!out.is_empty()).then_some(out)
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    code: String,
    message: String,
    retryable: bool,
}

fn json_error(
    status: StatusCode,
    code: impl Into<String>,
    message: impl Into<String>,
    retryable: bool,
) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            code: code.into(),
            message: message.into(),
            retryable,
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_request_id_strips_disallowed_chars_and_truncates() {
        assert_eq!(
            sanitize_request_id("req 01/<script>").as_deref(),
            Some("req01script")
        );
        assert_eq!(sanitize_request_id("///"), None);

        let long = "a".repeat(100);
        assert_eq!(sanitize_request_id(&long).map(|s| s.len()), Some(64));
    }

    #[test]
    fn request_and_trace_ids_fall_back_to_generated_ulids() {
        let mut headers = HeaderMap::new();
        headers.insert(TRACE_ID_HEADER, HeaderValue::from_static("not-a-ulid"));

        let request_id = extract_request_id(&headers);
        let trace_id = extract_trace_id(&headers);

        assert!(request_id.parse::<Ulid>().is_ok());
        assert!(trace_id.parse::<Ulid>().is_ok());
        assert_ne!(trace_id, "not-a-ulid");
    }

    #[test]
    fn supplied_request_id_and_authorization_are_kept() {
        let mut headers = HeaderMap::new();
        headers.insert(REQUEST_ID_HEADER, HeaderValue::from_static(" req_abc.1 "));
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer t0k"));

        assert_eq!(extract_request_id(&headers), "req_abc.1");
        assert_eq!(
            extract_authorization_header(&headers).as_deref(),
            Some("Bearer t0k")
        );
    }
}
