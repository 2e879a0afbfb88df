use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use crate::errors::GateError;

impl IntoResponse for GateError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            GateError::Config(_) | GateError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            GateError::Authentication(_) => StatusCode::UNAUTHORIZED,
            GateError::NotFound(_) => StatusCode::NOT_FOUND,
            GateError::Backend(_) | GateError::Network(_) => StatusCode::BAD_GATEWAY,
            GateError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let kind = self.classify().error_type;

        (status, Json(json!({"error": self.to_string(), "type": kind}))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(GateError::NotFound("x".into()).into_response().status(), StatusCode::NOT_FOUND);
        assert_eq!(GateError::InvalidInput("x".into()).into_response().status(), StatusCode::BAD_REQUEST);
        assert_eq!(GateError::Network("x".into()).into_response().status(), StatusCode::BAD_GATEWAY);
        assert_eq!(GateError::Internal("x".into()).into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
