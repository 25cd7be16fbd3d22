//! Tenant extraction for Axum
//!
//! Every `/api/v1/llm` route is tenant scoped. The tenant id comes from the
//! `X-Tenant-Id` header set by the upstream gateway.

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Header carrying the tenant id
pub const TENANT_HEADER: &str = "x-tenant-id";

#[derive(Debug, Serialize)]
struct TenantErrorResponse {
    success: bool,
    error: String,
    code: &'static str,
}

/// Missing or malformed tenant header
#[derive(Debug)]
pub struct TenantRejection {
    message: String,
}

impl IntoResponse for TenantRejection {
    fn into_response(self) -> Response {
        let body = TenantErrorResponse {
            success: false,
            error: self.message,
            code: "TENANT_REQUIRED",
        };
        (StatusCode::BAD_REQUEST, Json(body)).into_response()
    }
}

/// Axum extractor for the calling tenant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tenant(pub i64);

#[async_trait::async_trait]
impl<S> FromRequestParts<S> for Tenant
where
    S: Send + Sync,
{
    type Rejection = TenantRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        parse_tenant(parts.headers.get(TENANT_HEADER).and_then(|v| v.to_str().ok()))
            .map(Tenant)
    }
}

fn parse_tenant(value: Option<&str>) -> std::result::Result<i64, TenantRejection> {
    let value = value.map(str::trim).filter(|v| !v.is_empty()).ok_or_else(|| TenantRejection {
        message: "X-Tenant-Id header is required".to_string(),
    })?;
    match value.parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(TenantRejection {
            message: format!("Invalid X-Tenant-Id: {value}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tenant() {
        assert_eq!(parse_tenant(Some("42")).unwrap(), 42);
        assert_eq!(parse_tenant(Some(" 7 ")).unwrap(), 7);
        assert!(parse_tenant(None).is_err());
        assert!(parse_tenant(Some("")).is_err());
        assert!(parse_tenant(Some("0")).is_err());
        assert!(parse_tenant(Some("acme")).is_err());
    }
}
