use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use cookie::Cookie;

use crate::api::common::utils::ACCESS_TOKEN_COOKIE;
use crate::authentication::decode_access_token;
use crate::errors::AppError;
use crate::InnerState;

/// Resolves the requester from the access token and stores its [`Claims`]
/// in the request extensions.
///
/// [`Claims`]: crate::authentication::Claims
pub async fn auth_middleware(
    State(inner): State<InnerState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_token(&request).ok_or_else(|| {
        AppError::Authentication(anyhow::anyhow!("Unauthorized request"))
    })?;

    let claims = decode_access_token(&token, &inner.auth).inspect_err(|e| {
        tracing::warn!("JWT validation failed: {:?}", e);
    })?;

    tracing::debug!(user_id = %claims.sub, "Request authenticated");
    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

/// Like [`auth_middleware`] but lets anonymous requests through. A token that
/// fails validation is treated as absent.
pub async fn optional_auth_middleware(
    State(inner): State<InnerState>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(token) = extract_token(&request) {
        match decode_access_token(&token, &inner.auth) {
            Ok(claims) => {
                request.extensions_mut().insert(claims);
            }
            Err(e) => tracing::debug!("Ignoring invalid access token: {:?}", e),
        }
    }
    next.run(request).await
}

/// Extracts the JWT from either the `Authorization` header or the access token cookie.
fn extract_token<B>(req: &axum::http::Request<B>) -> Option<String> {
    if let Some(auth_header) = req.headers().get(header::AUTHORIZATION) {
        if let Ok(auth_str) = auth_header.to_str() {
            if let Some(token) = auth_str.strip_prefix("Bearer ") {
                let token = token.trim();
                if !token.is_empty() {
                    return Some(token.to_string());
                }
            }
        }
    }

    req.headers()
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|raw| raw.split(';'))
        .filter_map(|pair| Cookie::parse(pair.trim()).ok())
        .find(|cookie| cookie.name() == ACCESS_TOKEN_COOKIE)
        .map(|cookie| cookie.value().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request(name: header::HeaderName, value: &str) -> axum::http::Request<Body> {
        axum::http::Request::builder()
            .header(name, value)
            .body(Body::empty())
            .unwrap()
    }

    #[test]
    fn bearer_header_wins_over_cookie() {
        let mut req = request(header::AUTHORIZATION, "Bearer abc");
        req.headers_mut()
            .insert(header::COOKIE, "accessToken=xyz".parse().unwrap());
        assert_eq!(extract_token(&req).as_deref(), Some("abc"));
    }

    #[test]
    fn cookie_token_is_found_among_others() {
        let req = request(header::COOKIE, "theme=dark; accessToken=xyz; refreshToken=r");
        assert_eq!(extract_token(&req).as_deref(), Some("xyz"));
    }

    #[test]
    fn missing_token_yields_none() {
        let req = request(header::AUTHORIZATION, "Basic dXNlcjpwYXNz");
        assert_eq!(extract_token(&req), None);
    }
}
