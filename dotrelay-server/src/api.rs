use crate::AppState;
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use dotrelay_compose::{Parameters, ToolDescriptor, WORKING_DIRECTORY};
use dotrelay_core::DotrelayError;
use dotrelay_runner::Invocation;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct InvokeRequest {
    #[serde(default)]
    pub arguments: serde_json::Map<String, serde_json::Value>,
    pub working_directory: Option<String>,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Default, Deserialize)]
pub struct InvokeQuery {
    #[serde(default)]
    pub format: ResponseFormat,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

pub enum ApiError {
    Dotrelay(DotrelayError),
    /// The request body could not be read as an [`InvokeRequest`].
    MalformedBody(String),
}

impl From<DotrelayError> for ApiError {
    fn from(e: DotrelayError) -> Self {
        Self::Dotrelay(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            ApiError::Dotrelay(e) => {
                let status = match &e {
                    DotrelayError::UnknownOperation(_) => StatusCode::NOT_FOUND,
                    e if e.is_composition_error() => StatusCode::BAD_REQUEST,
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, e.to_string())
            }
            ApiError::MalformedBody(reason) => (StatusCode::BAD_REQUEST, reason),
        };
        (status, Json(ErrorBody { error })).into_response()
    }
}

/// An empty body means "no arguments". Anything else must be a
/// well-formed JSON invocation.
fn parse_invoke_body(headers: &HeaderMap, body: &Bytes) -> Result<InvokeRequest, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(InvokeRequest::default());
    }

    let is_json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map_or(false, |ct| ct.starts_with("application/json") || ct.contains("+json"));
    if !is_json {
        return Err(ApiError::MalformedBody(
            "Expected request with `Content-Type: application/json`".to_string(),
        ));
    }

    serde_json::from_slice(body)
        .map_err(|e| ApiError::MalformedBody(format!("Invalid request body: {}", e)))
}

pub async fn health_check() -> &'static str {
    "OK"
}

pub async fn list_tools(State(state): State<AppState>) -> Json<Vec<ToolDescriptor>> {
    Json(state.registry.catalog().descriptors())
}

pub async fn describe_tool(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ToolDescriptor>, ApiError> {
    let op = state
        .registry
        .catalog()
        .get(&name)
        .ok_or(DotrelayError::UnknownOperation(name))?;
    Ok(Json(op.describe()))
}

pub async fn invoke_tool(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<InvokeQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let req = match parse_invoke_body(&headers, &body) {
        Ok(req) => req,
        Err(e) => {
            warn!(operation = %name, "Rejected malformed request body");
            return Err(e);
        }
    };

    let mut params = Parameters::from_json(&name, &req.arguments)?;
    if let Some(dir) = req.working_directory {
        params.insert(WORKING_DIRECTORY, dir);
    }
    let mut invocation = Invocation::new(params);
    if let Some(secs) = req.timeout_seconds.filter(|s| *s > 0) {
        invocation = invocation.with_timeout(Duration::from_secs(secs));
    }

    let result = match state.registry.invoke(&name, invocation, &state.shutdown).await {
        Ok(result) => result,
        Err(e) => {
            warn!(operation = %name, error = %e, "Rejected invocation");
            return Err(e.into());
        }
    };

    info!(
        operation = %name,
        execution_id = %result.id(),
        outcome = ?result.outcome(),
        "Invocation completed"
    );

    Ok(match query.format {
        ResponseFormat::Json => Json(result).into_response(),
        ResponseFormat::Text => result.to_string().into_response(),
    })
}
