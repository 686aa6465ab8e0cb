//! User account database operations

use dvp_common::Result;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// User account record
#[derive(Debug, Clone)]
pub struct User {
    pub guid: String,
    pub uid: String,
    pub email: String,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    pub auth_provider: String,
    pub provider_id: Option<String>,
    pub password_hash: Option<String>,
    pub password_salt: Option<String>,
    pub email_verified: bool,
    pub last_login_at: Option<String>,
    pub is_active: bool,
    pub preferences: String,
}

impl User {
    /// Create a new local (password) account record
    pub fn new_local(
        uid: String,
        email: String,
        display_name: Option<String>,
        password_hash: String,
        password_salt: String,
    ) -> Self {
        Self {
            guid: Uuid::new_v4().to_string(),
            uid,
            email,
            display_name,
            photo_url: None,
            auth_provider: "local".to_string(),
            provider_id: None,
            password_hash: Some(password_hash),
            password_salt: Some(password_salt),
            email_verified: false,
            last_login_at: None,
            is_active: true,
            preferences: "{}".to_string(),
        }
    }

    /// Create a new account record from an OAuth assertion
    pub fn new_oauth(
        uid: String,
        email: String,
        display_name: Option<String>,
        photo_url: Option<String>,
        provider: String,
        provider_id: Option<String>,
        email_verified: bool,
        last_login_at: String,
    ) -> Self {
        Self {
            guid: Uuid::new_v4().to_string(),
            uid,
            email,
            display_name,
            photo_url,
            auth_provider: provider,
            provider_id,
            password_hash: None,
            password_salt: None,
            email_verified,
            last_login_at: Some(last_login_at),
            is_active: true,
            preferences: "{}".to_string(),
        }
    }
}

/// Provider fields applied when an OAuth identity takes over an existing
/// account matched by email
#[derive(Debug)]
pub struct OAuthLink<'a> {
    pub uid: &'a str,
    pub provider: &'a str,
    pub provider_id: Option<&'a str>,
    pub display_name: Option<&'a str>,
    pub photo_url: Option<&'a str>,
    pub email_verified: bool,
    pub last_login_at: &'a str,
}

/// Insert a user row
pub async fn insert(pool: &SqlitePool, user: &User) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO users (
            guid, uid, email, display_name, photo_url,
            auth_provider, provider_id, password_hash, password_salt,
            email_verified, last_login_at, is_active, preferences,
            created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
        "#,
    )
    .bind(&user.guid)
    .bind(&user.uid)
    .bind(&user.email)
    .bind(&user.display_name)
    .bind(&user.photo_url)
    .bind(&user.auth_provider)
    .bind(&user.provider_id)
    .bind(&user.password_hash)
    .bind(&user.password_salt)
    .bind(user.email_verified)
    .bind(&user.last_login_at)
    .bind(user.is_active)
    .bind(&user.preferences)
    .execute(pool)
    .await?;

    Ok(())
}

/// Load user by external uid
pub async fn find_by_uid(pool: &SqlitePool, uid: &str) -> Result<Option<User>> {
    let row = sqlx::query(
        r#"
        SELECT guid, uid, email, display_name, photo_url,
               auth_provider, provider_id, password_hash, password_salt,
               email_verified, last_login_at, is_active, preferences
        FROM users
        WHERE uid = ?
        "#,
    )
    .bind(uid)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(map_user))
}

/// Load user by internal guid
pub async fn find_by_guid(pool: &SqlitePool, guid: &str) -> Result<Option<User>> {
    let row = sqlx::query(
        r#"
        SELECT guid, uid, email, display_name, photo_url,
               auth_provider, provider_id, password_hash, password_salt,
               email_verified, last_login_at, is_active, preferences
        FROM users
        WHERE guid = ?
        "#,
    )
    .bind(guid)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(map_user))
}

/// Load user by email
pub async fn find_by_email(pool: &SqlitePool, email: &str) -> Result<Option<User>> {
    let row = sqlx::query(
        r#"
        SELECT guid, uid, email, display_name, photo_url,
               auth_provider, provider_id, password_hash, password_salt,
               email_verified, last_login_at, is_active, preferences
        FROM users
        WHERE email = ?
        "#,
    )
    .bind(email)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(map_user))
}

/// Stamp last_login_at on a resolved user
pub async fn touch_last_login(pool: &SqlitePool, guid: &str, at: &str) -> Result<()> {
    sqlx::query("UPDATE users SET last_login_at = ?, updated_at = CURRENT_TIMESTAMP WHERE guid = ?")
        .bind(at)
        .bind(guid)
        .execute(pool)
        .await?;

    Ok(())
}

/// Overwrite provider identity fields on an existing row (account linking).
/// The stored password hash is not cleared.
pub async fn link_oauth_identity(pool: &SqlitePool, guid: &str, link: &OAuthLink<'_>) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE users SET
            uid = ?,
            auth_provider = ?,
            provider_id = ?,
            display_name = ?,
            photo_url = ?,
            email_verified = ?,
            last_login_at = ?,
            updated_at = CURRENT_TIMESTAMP
        WHERE guid = ?
        "#,
    )
    .bind(link.uid)
    .bind(link.provider)
    .bind(link.provider_id)
    .bind(link.display_name)
    .bind(link.photo_url)
    .bind(link.email_verified)
    .bind(link.last_login_at)
    .bind(guid)
    .execute(pool)
    .await?;

    Ok(())
}

fn map_user(row: sqlx::sqlite::SqliteRow) -> User {
    User {
        guid: row.get("guid"),
        uid: row.get("uid"),
        email: row.get("email"),
        display_name: row.get("display_name"),
        photo_url: row.get("photo_url"),
        auth_provider: row.get("auth_provider"),
        provider_id: row.get("provider_id"),
        password_hash: row.get("password_hash"),
        password_salt: row.get("password_salt"),
        email_verified: row.get("email_verified"),
        last_login_at: row.get("last_login_at"),
        is_active: row.get("is_active"),
        preferences: row.get("preferences"),
    }
}
