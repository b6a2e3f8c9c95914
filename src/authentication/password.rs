use anyhow::Context;
use argon2::password_hash::SaltString;
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version};

use crate::db::Store;
use crate::errors::AppError;
use crate::models::User;

/// Verified against when the login handle matches nobody, so unknown users cost
/// the same hash work as known ones.
const FALLBACK_PASSWORD_HASH: &str = "$argon2id$v=19$m=15000,t=2,p=1$\
    gZiV/M1gPc22ElAH/Jh1Hw$\
    CWOrkoo7oJBQ/iyh7uJ0LO2aLEfrHwTWllSAxT0zRno";

pub struct Credentials {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: String,
}

#[tracing::instrument(
    name = "Validate user credentials",
    skip(credentials, store),
    fields(username = ?credentials.username, email = ?credentials.email)
)]
pub async fn validate_credentials(
    credentials: Credentials,
    store: &dyn Store,
) -> Result<User, AppError> {
    let user = store
        .find_user_by_handle(credentials.username.as_deref(), credentials.email.as_deref())
        .await?;

    let expected_password_hash = match &user {
        Some(user) => user.password_hash.clone(),
        None => {
            tracing::debug!("No user for handle, verifying against fallback hash");
            FALLBACK_PASSWORD_HASH.to_string()
        }
    };

    let password = credentials.password;
    tokio::task::spawn_blocking(move || verify_password_hash(&expected_password_hash, &password))
        .await
        .context("Failed to spawn blocking task.")??;

    user.ok_or_else(|| {
        tracing::warn!("Credential validation failed: user not found");
        AppError::Authentication(anyhow::anyhow!("Invalid user credentials"))
    })
}

fn verify_password_hash(
    expected_password_hash: &str,
    password_candidate: &str,
) -> Result<(), AppError> {
    let expected_password_hash = PasswordHash::new(expected_password_hash)
        .context("Failed to parse hash in PHC string format.")?;

    Argon2::default()
        .verify_password(password_candidate.as_bytes(), &expected_password_hash)
        .map_err(|e| {
            tracing::warn!("Password verification failed: {:?}", e);
            AppError::Authentication(anyhow::anyhow!("Invalid user credentials"))
        })
}

#[tracing::instrument(name = "Compute password hash", skip(password))]
pub async fn compute_password_hash(password: String) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .context("Failed to spawn blocking task.")?
}

fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut rand::thread_rng());
    let params = Params::new(15000, 2, 1, None).map_err(|e| {
        tracing::error!("Failed to create Argon2 parameters: {:?}", e);
        AppError::Unexpected(anyhow::anyhow!(e).context("Failed to create Argon2 params"))
    })?;

    let password_hash = Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| {
            tracing::error!("Failed to hash password: {:?}", e);
            AppError::Unexpected(anyhow::anyhow!(e).context("Failed to hash password"))
        })?
        .to_string();

    Ok(password_hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::tests::seed_user;
    use crate::db::{MemoryStore, UserRepo};
    use crate::models::{Asset, NewUser};

    #[tokio::test]
    async fn hashes_verify_only_their_own_password() {
        let hash = compute_password_hash("hunter22".into()).await.unwrap();
        assert!(hash.starts_with("$argon2id$v=19$m=15000,t=2,p=1$"));
        assert!(verify_password_hash(&hash, "hunter22").is_ok());
        assert!(matches!(
            verify_password_hash(&hash, "hunter23"),
            Err(AppError::Authentication(_))
        ));
    }

    #[tokio::test]
    async fn login_accepts_username_or_email() {
        let store = MemoryStore::new();
        let user = store
            .insert_user(NewUser {
                username: "alice".into(),
                email: "alice@example.com".into(),
                full_name: "Alice".into(),
                avatar: Asset {
                    public_id: "a".into(),
                    url: "https://media.test/a".into(),
                },
                cover_image: None,
                password_hash: compute_password_hash("secret".into()).await.unwrap(),
            })
            .await
            .unwrap();

        let by_email = validate_credentials(
            Credentials {
                username: None,
                email: Some("ALICE@example.com".into()),
                password: "secret".into(),
            },
            &store,
        )
        .await
        .unwrap();
        assert_eq!(by_email.id, user.id);

        let wrong = validate_credentials(
            Credentials {
                username: Some("alice".into()),
                email: None,
                password: "guess".into(),
            },
            &store,
        )
        .await;
        assert!(matches!(wrong, Err(AppError::Authentication(_))));
    }

    #[tokio::test]
    async fn unknown_users_are_reported_after_hashing() {
        let store = MemoryStore::new();
        seed_user(&store, "bob").await;
        let result = validate_credentials(
            Credentials {
                username: Some("nobody".into()),
                email: None,
                password: "whatever".into(),
            },
            &store,
        )
        .await;
        // the fallback hash never matches, so the password check fails first
        assert!(matches!(result, Err(AppError::Authentication(_))));
    }
}
