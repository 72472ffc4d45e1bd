//! HTTP status classification for the gateway adapter.

use reqwest::StatusCode;

use crate::domain::errors::GatewayError;

/// Map a non-success status and response body to a gateway error.
pub(crate) fn from_status(status: StatusCode, body: String) -> GatewayError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => GatewayError::Authentication(body),
        StatusCode::TOO_MANY_REQUESTS => GatewayError::RateLimited(body),
        _ => GatewayError::Provider {
            status: status.as_u16(),
            message: body,
        },
    }
}
