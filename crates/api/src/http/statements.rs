use std::collections::BTreeMap;
use std::time::Instant;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use chrono::NaiveDate;
use serde::Deserialize;

use super::{ApiError, AppState, LEGAL_STATEMENTS_ROUTE, json_error};

#[derive(Debug, Deserialize)]
pub(super) struct LegalStatementsQuery {
    #[serde(default)]
    period_end_on: Option<String>,
}

/// Without `period_end_on` the raw statement texts are returned.
pub(super) async fn legal_statements(
    State(state): State<AppState>,
    Query(query): Query<LegalStatementsQuery>,
) -> Result<Json<BTreeMap<String, String>>, ApiError> {
    let started = Instant::now();

    let result = match query
        .period_end_on
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        None => Ok(Json(state.statements.statements_copy().into_iter().collect())),
        Some(raw) => {
            parse_period_end_on(raw).map(|date| Json(state.statements.legal_statements(date)))
        }
    };

    let status = match &result {
        Ok(_) => StatusCode::OK,
        Err((status, _)) => *status,
    };
    crate::metrics::observe_http_request(
        LEGAL_STATEMENTS_ROUTE,
        "GET",
        status.as_u16(),
        started.elapsed(),
    );

    result
}

fn parse_period_end_on(raw: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
        json_error(
            StatusCode::BAD_REQUEST,
            "ERR_INVALID_PARAMS",
            "period_end_on must be a YYYY-MM-DD date".to_string(),
            false,
        )
    })
}
