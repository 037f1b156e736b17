use std::time::Instant;

use accounts_contracts::ValidationStatusResponse;
use accounts_validation::{RequestContext, ValidationStatusError};
use axum::Json;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use tracing::Instrument;

use super::{
    ApiError, AppState, VALIDATION_STATUS_ROUTE, extract_authorization_header, extract_request_id,
    extract_trace_id, json_error,
};

pub(super) async fn validation_status(
    State(state): State<AppState>,
    Path((transaction_id, company_accounts_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Json<ValidationStatusResponse>, ApiError> {
    let request_started = Instant::now();
    let request_id = extract_request_id(&headers);
    let trace_id = extract_trace_id(&headers);

    let span = tracing::info_span!(
        "api.validation_status",
        request_id = %request_id,
        trace_id = %trace_id,
        transaction_id = %transaction_id,
        company_accounts_id = %company_accounts_id,
        latency_ms = tracing::field::Empty,
        outcome = tracing::field::Empty,
    );

    let handler_result = async {
        let mut ctx = RequestContext::new(request_id.as_str(), trace_id.as_str())
            .with_authorization(extract_authorization_header(&headers));

        let transaction = state
            .transactions
            .fetch(&transaction_id, &ctx)
            .await
            .map_err(|err| {
                tracing::warn!(
                    code = err.code,
                    message = %err.message,
                    "api.transaction_lookup_failed"
                );
                json_error(StatusCode::BAD_GATEWAY, err.code, err.message, true)
            })?;
        if let Some(transaction) = transaction {
            ctx = ctx.with_transaction(transaction);
        }

        let outcome = state
            .validation
            .get_validation_errors(&company_accounts_id, &ctx)
            .await;

        let label = match &outcome {
            Ok(errors) if errors.has_errors() => "invalid",
            Ok(_) => "valid",
            Err(ValidationStatusError::MissingTransaction) => "missing_transaction",
            Err(ValidationStatusError::Data(_)) => "data_failure",
        };
        crate::metrics::observe_validation_outcome(label);
        tracing::Span::current().record("outcome", label);

        outcome
            .map(|errors| Json(ValidationStatusResponse::from(errors)))
            .map_err(validation_error_response)
    }
    .instrument(span.clone())
    .await;

    let latency_ms = request_started.elapsed().as_millis() as u64;
    span.record("latency_ms", latency_ms);
    tracing::info!(parent: &span, "api.validation_status.completed");

    let status = match &handler_result {
        Ok(_) => StatusCode::OK,
        Err((status, _)) => *status,
    };
    crate::metrics::observe_http_request(
        VALIDATION_STATUS_ROUTE,
        "GET",
        status.as_u16(),
        request_started.elapsed(),
    );

    handler_result
}

fn validation_error_response(err: ValidationStatusError) -> ApiError {
    let code = err.code();
    match err {
        ValidationStatusError::MissingTransaction => json_error(
            StatusCode::NOT_FOUND,
            code,
            "transaction not found".to_string(),
            false,
        ),
        ValidationStatusError::Data(failure) => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            code,
            failure.message,
            false,
        ),
    }
}
