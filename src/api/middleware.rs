//! API Middleware
//!
//! Staff authentication and request logging.

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use std::net::IpAddr;
use uuid::Uuid;

use crate::domain::access::hash_api_key;
use crate::domain::{Operation, OperationContext};
use crate::error::AppError;
use crate::handlers::Services;

pub const API_KEY_HEADER: &str = "X-API-Key";
pub const CORRELATION_ID_HEADER: &str = "X-Correlation-Id";

// =========================================================================
// API Key Authentication Middleware
// =========================================================================

/// Resolve the X-API-Key header to a staff member and attach an
/// [`OperationContext`] to the request.
///
/// A request without a key continues anonymously; each route decides
/// through [`authorize`] whether that is enough. A key that is present but
/// unknown or disabled is rejected here.
pub async fn auth_middleware(
    State(services): State<Services>,
    headers: HeaderMap,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let mut context = OperationContext::new();

    if let Some(api_key) = headers.get(API_KEY_HEADER) {
        let api_key = api_key.to_str().map_err(|_| AppError::InvalidApiKey)?;

        let staff = services
            .store
            .find_staff_by_key_hash(&hash_api_key(api_key.trim()))
            .await?
            .ok_or(AppError::InvalidApiKey)?;

        if !staff.is_active {
            tracing::warn!(username = %staff.username, "Rejected disabled API key");
            return Err(AppError::InvalidApiKey);
        }

        context = context.with_staff(staff.id, staff.role);
    }

    let correlation_id = headers
        .get(CORRELATION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(Uuid::new_v4);
    context = context.with_correlation_id(correlation_id);

    if let Some(ip) = forwarded_client_ip(&headers) {
        context = context.with_client_ip(ip);
    }

    request.extensions_mut().insert(context);

    Ok(next.run(request).await)
}

/// First address in X-Forwarded-For, when it parses
fn forwarded_client_ip(headers: &HeaderMap) -> Option<IpAddr> {
    headers
        .get("X-Forwarded-For")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|ip| ip.trim().parse().ok())
}

/// Check that the caller may perform `operation`
pub fn authorize(context: &OperationContext, operation: Operation) -> Result<(), AppError> {
    if context.permits(operation) {
        return Ok(());
    }
    match context.role {
        None => Err(AppError::MissingHeader(API_KEY_HEADER.to_string())),
        Some(role) => {
            tracing::warn!(
                staff_id = ?context.staff_id,
                role = %role.as_str(),
                operation = ?operation,
                client_ip = ?context.client_ip,
                "Permission denied"
            );
            Err(AppError::PermissionDenied(format!("{:?}", operation)))
        }
    }
}

// =========================================================================
// mask_headers_for_logging
// =========================================================================

/// Headers that should be masked in logs
const SENSITIVE_HEADERS: &[&str] = &["x-api-key", "authorization", "cookie", "set-cookie"];

/// Mask sensitive headers for logging
pub fn mask_headers_for_logging(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            let masked_value = if SENSITIVE_HEADERS.contains(&name.as_str()) {
                "[REDACTED]".to_string()
            } else {
                value.to_str().unwrap_or("[invalid utf8]").to_string()
            };
            (name.to_string(), masked_value)
        })
        .collect()
}

// =========================================================================
// Request Logging Middleware
// =========================================================================

pub async fn logging_middleware(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let headers = mask_headers_for_logging(request.headers());
    let correlation_id = request
        .headers()
        .get(CORRELATION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let start = std::time::Instant::now();

    tracing::info!(
        method = %method,
        uri = %uri,
        correlation_id = ?correlation_id,
        headers = ?headers,
        "Incoming request"
    );

    let response = next.run(request).await;

    tracing::info!(
        method = %method,
        uri = %uri,
        status = %response.status(),
        duration_ms = %start.elapsed().as_millis(),
        correlation_id = ?correlation_id,
        "Request completed"
    );

    response
}
