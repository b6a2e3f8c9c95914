use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, Secret};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use uuid::Uuid;

use crate::config::AuthSettings;
use crate::errors::AppError;
use crate::models::User;

/// Access token claims, inserted into request extensions by the auth middleware.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub exp: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: Uuid,
    pub exp: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

fn expiry(ttl: chrono::Duration) -> usize {
    (Utc::now() + ttl).timestamp().max(0) as usize
}

fn sign<T: Serialize>(claims: &T, secret: &Secret<String>) -> Result<String, AppError> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.expose_secret().as_bytes()),
    )
    .map_err(|e| {
        tracing::error!("Failed to encode JWT token: {:?}", e);
        AppError::Unexpected(anyhow::Error::new(e).context("Failed to encode JWT token"))
    })
}

fn verify<T: DeserializeOwned>(token: &str, secret: &Secret<String>) -> Result<T, AppError> {
    decode::<T>(
        token,
        &DecodingKey::from_secret(secret.expose_secret().as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map(|data| data.claims)
    .map_err(|e| AppError::Authentication(anyhow::Error::new(e).context("Invalid access token")))
}

#[tracing::instrument(name = "Generate token pair", skip(user, settings), fields(user_id = %user.id))]
pub fn issue_token_pair(user: &User, settings: &AuthSettings) -> Result<TokenPair, AppError> {
    let access_token = sign(
        &Claims {
            sub: user.id,
            username: user.username.clone(),
            exp: expiry(settings.access_token_ttl),
        },
        &settings.access_token_secret,
    )?;
    let refresh_token = sign(
        &RefreshClaims {
            sub: user.id,
            exp: expiry(settings.refresh_token_ttl),
        },
        &settings.refresh_token_secret,
    )?;

    Ok(TokenPair {
        access_token,
        refresh_token,
    })
}

pub fn decode_access_token(token: &str, settings: &AuthSettings) -> Result<Claims, AppError> {
    verify(token, &settings.access_token_secret)
}
