/// Shared response helpers for route handlers
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;

/// Structured error body used across the API
#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    code: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<&'a str>,
}

/// Build a JSON error response
pub fn error_response(
    status: StatusCode,
    code: &str,
    message: &str,
    hint: Option<&str>,
) -> Response {
    (
        status,
        Json(json!({
            "error": ErrorBody { code, message, hint }
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_status() {
        let response = error_response(
            StatusCode::BAD_REQUEST,
            "INVALID_PARAM",
            "title is required",
            None,
        );
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
