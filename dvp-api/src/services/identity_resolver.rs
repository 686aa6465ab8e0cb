//! User identity resolution
//!
//! Resolves a user from either local credentials or an OAuth assertion,
//! creating or linking accounts as needed. All three flows are single-row
//! upserts over the pool; the unique email column is the arbiter for
//! concurrent creation, same recovery pattern as the device catalog.

use chrono::Utc;
use dvp_common::{auth, Error, Result};
use rand::{distributions::Alphanumeric, Rng};
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::db::users::{self, OAuthLink, User};

/// Local registration request (`POST /api/v1/auth/register` body)
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// OAuth assertion as submitted by the client after provider sign-in
/// (`POST /api/v1/auth/oauth-signin` body)
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthProfile {
    pub uid: String,
    pub email: String,
    pub display_name: String,
    pub photo_url: Option<String>,
    pub auth_provider: String,
    pub provider_id: String,
    #[serde(default)]
    pub email_verified: bool,
}

/// Resolves user identities against the users table
pub struct IdentityResolver {
    db: SqlitePool,
}

impl IdentityResolver {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Create a local (password) account. Duplicate email surfaces as
    /// `Conflict` from the unique constraint.
    pub async fn register_local(&self, request: &RegisterRequest) -> Result<User> {
        let salt = auth::generate_salt();
        let hash = auth::hash_password(&request.password, &salt);
        let user = User::new_local(
            new_local_uid(),
            request.email.clone(),
            Some(request.name.clone()),
            hash,
            salt,
        );

        match users::insert(&self.db, &user).await {
            Ok(()) => {
                tracing::info!(user_id = %user.uid, email = %user.email, "User registered");
                Ok(user)
            }
            Err(err) if err.is_unique_violation() => {
                Err(Error::Conflict("Email already registered".to_string()))
            }
            Err(err) => Err(err),
        }
    }

    /// Authenticate a local account by email and password.
    ///
    /// Unknown email is `NotFound`. A wrong password and a non-local
    /// provider both fail with the same `AuthenticationFailed` message so
    /// the response never reveals which check rejected the attempt.
    pub async fn login_local(&self, email: &str, password: &str) -> Result<User> {
        let user = users::find_by_email(&self.db, email)
            .await?
            .ok_or_else(|| Error::NotFound("User not found".to_string()))?;

        let verified = match (
            user.auth_provider.as_str(),
            &user.password_hash,
            &user.password_salt,
        ) {
            ("local", Some(hash), Some(salt)) => auth::verify_password(password, salt, hash),
            _ => false,
        };
        if !verified {
            return Err(Error::AuthenticationFailed(
                "Invalid credentials".to_string(),
            ));
        }

        let now = Utc::now().to_rfc3339();
        users::touch_last_login(&self.db, &user.guid, &now).await?;
        tracing::info!(user_id = %user.uid, "User logged in");

        Ok(User {
            last_login_at: Some(now),
            ..user
        })
    }

    /// Resolve an OAuth assertion to exactly one user record.
    ///
    /// Lookup order: uid (existing sign-in), then email (link the provider
    /// identity onto the existing account), then create. Creating a new
    /// user is success, never an error; a lost insert race on the unique
    /// email column is recovered by resolving again.
    pub async fn oauth_sign_in(&self, profile: &OAuthProfile) -> Result<User> {
        if let Some(user) = self.resolve_existing_oauth(profile).await? {
            return Ok(user);
        }

        let now = Utc::now().to_rfc3339();
        let user = User::new_oauth(
            profile.uid.clone(),
            profile.email.clone(),
            Some(profile.display_name.clone()),
            profile.photo_url.clone(),
            profile.auth_provider.clone(),
            Some(profile.provider_id.clone()),
            profile.email_verified,
            now,
        );

        match users::insert(&self.db, &user).await {
            Ok(()) => {
                tracing::info!(
                    user_id = %user.uid,
                    provider = %user.auth_provider,
                    "New OAuth user created"
                );
                Ok(user)
            }
            Err(err) if err.is_unique_violation() => {
                // Another request created the email first; its row wins and
                // this assertion links onto it.
                self.resolve_existing_oauth(profile).await?.ok_or(err)
            }
            Err(err) => Err(err),
        }
    }

    /// The uid-then-email resolution chain shared by first attempt and
    /// conflict recovery. Returns None when neither matches.
    async fn resolve_existing_oauth(&self, profile: &OAuthProfile) -> Result<Option<User>> {
        let now = Utc::now().to_rfc3339();

        if let Some(user) = users::find_by_uid(&self.db, &profile.uid).await? {
            users::touch_last_login(&self.db, &user.guid, &now).await?;
            tracing::info!(
                user_id = %user.uid,
                provider = %profile.auth_provider,
                "OAuth user logged in"
            );
            return Ok(Some(User {
                last_login_at: Some(now),
                ..user
            }));
        }

        if let Some(existing) = users::find_by_email(&self.db, &profile.email).await? {
            // Email match takes over the existing row: uid and provider
            // fields are overwritten, the stored password hash survives.
            let link = OAuthLink {
                uid: &profile.uid,
                provider: &profile.auth_provider,
                provider_id: Some(&profile.provider_id),
                display_name: Some(&profile.display_name),
                photo_url: profile.photo_url.as_deref(),
                email_verified: profile.email_verified,
                last_login_at: &now,
            };
            users::link_oauth_identity(&self.db, &existing.guid, &link).await?;
            tracing::info!(
                user_id = %profile.uid,
                email = %profile.email,
                "OAuth account linked to existing email"
            );

            let user = users::find_by_uid(&self.db, &profile.uid)
                .await?
                .ok_or_else(|| Error::Internal("Linked user row not found".to_string()))?;
            return Ok(Some(user));
        }

        Ok(None)
    }
}

/// External id for locally-registered accounts: unix-seconds prefix plus a
/// random 8-character alphanumeric suffix.
fn new_local_uid() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(char::from)
        .collect();
    format!("local_{}_{}", Utc::now().timestamp(), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup_resolver() -> IdentityResolver {
        let pool = SqlitePool::connect(":memory:").await.unwrap();
        dvp_common::db::create_schema(&pool).await.unwrap();
        IdentityResolver::new(pool)
    }

    fn register_request(email: &str) -> RegisterRequest {
        RegisterRequest {
            name: "Test User".to_string(),
            email: email.to_string(),
            password: "secret123".to_string(),
        }
    }

    fn oauth_profile(uid: &str, email: &str) -> OAuthProfile {
        OAuthProfile {
            uid: uid.to_string(),
            email: email.to_string(),
            display_name: "OAuth User".to_string(),
            photo_url: Some("https://example.com/p.jpg".to_string()),
            auth_provider: "google".to_string(),
            provider_id: "google-123".to_string(),
            email_verified: true,
        }
    }

    #[tokio::test]
    async fn register_creates_local_account() {
        let resolver = setup_resolver().await;

        let user = resolver
            .register_local(&register_request("a@example.com"))
            .await
            .unwrap();

        assert!(user.uid.starts_with("local_"));
        assert_eq!(user.auth_provider, "local");
        assert!(!user.email_verified);
        assert!(user.password_hash.is_some());
        assert!(user.password_salt.is_some());

        let stored = users::find_by_uid(&resolver.db, &user.uid)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.email, "a@example.com");
        assert_eq!(stored.display_name.as_deref(), Some("Test User"));
    }

    #[tokio::test]
    async fn duplicate_email_registration_conflicts() {
        let resolver = setup_resolver().await;
        resolver
            .register_local(&register_request("a@example.com"))
            .await
            .unwrap();

        let err = resolver
            .register_local(&register_request("a@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[tokio::test]
    async fn login_verifies_password_and_stamps_last_login() {
        let resolver = setup_resolver().await;
        resolver
            .register_local(&register_request("a@example.com"))
            .await
            .unwrap();

        let user = resolver
            .login_local("a@example.com", "secret123")
            .await
            .unwrap();
        assert!(user.last_login_at.is_some());

        let stored = users::find_by_uid(&resolver.db, &user.uid)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.last_login_at, user.last_login_at);
    }

    #[tokio::test]
    async fn login_unknown_email_is_not_found() {
        let resolver = setup_resolver().await;

        let err = resolver
            .login_local("nobody@example.com", "whatever")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn wrong_password_and_wrong_provider_fail_identically() {
        let resolver = setup_resolver().await;
        resolver
            .register_local(&register_request("local@example.com"))
            .await
            .unwrap();
        resolver
            .oauth_sign_in(&oauth_profile("g-uid-1", "oauth@example.com"))
            .await
            .unwrap();

        let wrong_password = resolver
            .login_local("local@example.com", "not-the-password")
            .await
            .unwrap_err();
        let wrong_provider = resolver
            .login_local("oauth@example.com", "whatever")
            .await
            .unwrap_err();

        assert!(matches!(wrong_password, Error::AuthenticationFailed(_)));
        assert!(matches!(wrong_provider, Error::AuthenticationFailed(_)));
        // Same message for both, so the caller cannot tell which check failed
        assert_eq!(wrong_password.to_string(), wrong_provider.to_string());
    }

    #[tokio::test]
    async fn oauth_creates_new_user() {
        let resolver = setup_resolver().await;

        let user = resolver
            .oauth_sign_in(&oauth_profile("g-uid-1", "new@example.com"))
            .await
            .unwrap();

        assert_eq!(user.uid, "g-uid-1");
        assert_eq!(user.auth_provider, "google");
        assert!(user.email_verified);
        assert!(user.last_login_at.is_some());
        assert!(user.password_hash.is_none());
    }

    #[tokio::test]
    async fn oauth_repeat_sign_in_reuses_row() {
        let resolver = setup_resolver().await;
        let first = resolver
            .oauth_sign_in(&oauth_profile("g-uid-1", "new@example.com"))
            .await
            .unwrap();
        let second = resolver
            .oauth_sign_in(&oauth_profile("g-uid-1", "new@example.com"))
            .await
            .unwrap();

        assert_eq!(first.guid, second.guid);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&resolver.db)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn oauth_links_onto_existing_email_account() {
        let resolver = setup_resolver().await;
        let local = resolver
            .register_local(&register_request("shared@example.com"))
            .await
            .unwrap();

        let linked = resolver
            .oauth_sign_in(&oauth_profile("g-uid-9", "shared@example.com"))
            .await
            .unwrap();

        // Same row, taken over by the provider identity
        assert_eq!(linked.guid, local.guid);
        assert_eq!(linked.uid, "g-uid-9");
        assert_eq!(linked.auth_provider, "google");
        assert_eq!(linked.provider_id.as_deref(), Some("google-123"));
        // The stored password is not cleared by linking
        assert_eq!(linked.password_hash, local.password_hash);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&resolver.db)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }
}
