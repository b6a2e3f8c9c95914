use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::{Extension, Json};
use axum_typed_multipart::{FieldData, TryFromMultipart, TypedMultipart, TypedMultipartError};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_cookies::Cookies;

use crate::api::common::utils::{clear_session_cookies, required_text, set_session_cookies};
use crate::api::common::ApiResponse;
use crate::authentication::{
    compute_password_hash, issue_token_pair, validate_credentials, Claims, Credentials, TokenPair,
};
use crate::errors::AppError;
use crate::media::{stage_upload, AssetKind, AssetLedger};
use crate::models::{NewUser, PublicUser};
use crate::InnerState;

#[derive(TryFromMultipart)]
pub struct RegisterForm {
    #[form_data(field_name = "fullName")]
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    #[form_data(limit = "unlimited")]
    pub avatar: Option<FieldData<Bytes>>,
    #[form_data(field_name = "coverImage", limit = "unlimited")]
    pub cover_image: Option<FieldData<Bytes>>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginData {
    pub user: PublicUser,
    #[serde(flatten)]
    pub tokens: TokenPair,
}

fn non_empty_file(field: Option<FieldData<Bytes>>) -> Option<FieldData<Bytes>> {
    field.filter(|f| !f.contents.is_empty())
}

#[tracing::instrument(name = "Register user", skip(inner, form))]
pub async fn register_user(
    State(inner): State<InnerState>,
    form: Result<TypedMultipart<RegisterForm>, TypedMultipartError>,
) -> Result<ApiResponse<PublicUser>, AppError> {
    let TypedMultipart(form) = form?;
    let full_name = required_text(form.full_name, "fullName")?;
    let email = required_text(form.email, "email")?;
    let username = required_text(form.username, "username")?.to_lowercase();
    let password = form
        .password
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| AppError::InvalidArgument("password is required".to_string()))?;
    tracing::info!("Starting registration for user: {}", username);

    if inner
        .store
        .find_user_by_handle(Some(&username), Some(&email))
        .await?
        .is_some()
    {
        return Err(AppError::Conflict(
            "User with email or username already exists".to_string(),
        ));
    }

    let avatar = non_empty_file(form.avatar)
        .ok_or_else(|| AppError::InvalidArgument("Avatar file is required".to_string()))?;
    let avatar_file = stage_upload(avatar.contents, avatar.metadata.file_name).await?;
    let cover_file = match non_empty_file(form.cover_image) {
        Some(cover) => Some(stage_upload(cover.contents, cover.metadata.file_name).await?),
        None => None,
    };
    let password_hash = compute_password_hash(password).await?;

    let mut ledger = AssetLedger::new(inner.assets.as_ref());
    let created = async {
        let avatar = ledger.upload(avatar_file.path(), AssetKind::Image).await?.asset();
        let cover_image = match &cover_file {
            Some(file) => Some(ledger.upload(file.path(), AssetKind::Image).await?.asset()),
            None => None,
        };
        inner
            .store
            .insert_user(NewUser {
                username,
                email,
                full_name,
                avatar,
                cover_image,
                password_hash,
            })
            .await
    }
    .await;

    let user = match created {
        Ok(user) => {
            ledger.commit();
            user
        }
        Err(e) => {
            tracing::warn!("Registration failed, removing uploaded images: {}", e);
            ledger.rollback().await;
            return Err(e);
        }
    };

    tracing::info!(user_id = %user.id, "User registered");
    Ok(ApiResponse::created(
        PublicUser::from(&user),
        "User registered successfully",
    ))
}

#[tracing::instrument(name = "User login", skip(cookies, inner, payload))]
pub async fn login_user(
    cookies: Cookies,
    State(inner): State<InnerState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<ApiResponse<LoginData>, AppError> {
    let Json(request) = payload?;
    let username = request
        .username
        .map(|u| u.trim().to_lowercase())
        .filter(|u| !u.is_empty());
    let email = request
        .email
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty());
    if username.is_none() && email.is_none() {
        return Err(AppError::InvalidArgument(
            "username or email is required".to_string(),
        ));
    }
    let password = request
        .password
        .ok_or_else(|| AppError::InvalidArgument("password is required".to_string()))?;

    let user = validate_credentials(
        Credentials {
            username,
            email,
            password,
        },
        inner.store.as_ref(),
    )
    .await?;

    let tokens = issue_token_pair(&user, &inner.auth)?;
    inner
        .store
        .set_refresh_token(user.id, Some(tokens.refresh_token.clone()))
        .await?;
    set_session_cookies(&tokens, &inner.auth, &cookies);

    tracing::info!(user_id = %user.id, "Login completed");
    Ok(ApiResponse::ok(
        LoginData {
            user: PublicUser::from(&user),
            tokens,
        },
        "User logged in successfully",
    ))
}

#[tracing::instrument(name = "User logout", skip(cookies, inner, claims), fields(user_id = %claims.sub))]
pub async fn logout_user(
    cookies: Cookies,
    State(inner): State<InnerState>,
    Extension(claims): Extension<Claims>,
) -> Result<ApiResponse<Value>, AppError> {
    inner.store.set_refresh_token(claims.sub, None).await?;
    clear_session_cookies(&cookies);
    tracing::info!("Logout completed");
    Ok(ApiResponse::ok(json!({}), "User logged out"))
}

#[tracing::instrument(name = "Current user", skip(inner, claims), fields(user_id = %claims.sub))]
pub async fn current_user(
    State(inner): State<InnerState>,
    Extension(claims): Extension<Claims>,
) -> Result<ApiResponse<PublicUser>, AppError> {
    let user = inner
        .store
        .find_user(claims.sub)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    Ok(ApiResponse::ok(
        PublicUser::from(&user),
        "Current user fetched successfully",
    ))
}
