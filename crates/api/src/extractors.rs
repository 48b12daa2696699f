//! Request extractors.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

/// Key used when no client address header is present.
pub const ANONYMOUS_CLIENT: &str = "anonymous";

/// Client IP address: first hop of `X-Forwarded-For`, then `X-Real-IP`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        };

        // Take the first IP in the chain
        if let Some(ip) = header("X-Forwarded-For")
            .and_then(|xff| xff.split(',').next())
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
        {
            return Ok(ClientIp(ip.to_string()));
        }

        if let Some(ip) = header("X-Real-IP") {
            return Ok(ClientIp(ip.to_string()));
        }

        Ok(ClientIp(ANONYMOUS_CLIENT.to_string()))
    }
}
