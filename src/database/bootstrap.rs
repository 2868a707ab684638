use crate::config::get_config;
use crate::error::{Error, Result};
use crate::utils::crypto::{self, FieldCipher};
use crate::utils::time;
use sqlx::SqlitePool;

/// Creates the initial admin account on an empty users table. A no-op when
/// accounts already exist or when ADMIN_EMAIL/ADMIN_PASSWORD are not set.
pub async fn seed_admin_user(pool: &SqlitePool, cipher: &FieldCipher) -> Result<()> {
    let config = get_config();
    let (email, password) = match (&config.admin_email, &config.admin_password) {
        (Some(email), Some(password)) => (email.clone(), password.clone()),
        _ => return Ok(()),
    };

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?;
    if count > 0 {
        return Ok(());
    }

    let password_hash = crypto::hash_password(&password)
        .map_err(|e| Error::Internal(format!("Failed to hash admin password: {}", e)))?;
    let now = time::now();
    sqlx::query(
        "INSERT INTO users (email_encrypted, email_index, full_name, password_hash, role, is_active, created_at, updated_at)
         VALUES (?, ?, ?, ?, 'admin', TRUE, ?, ?)",
    )
    .bind(cipher.encrypt(&email)?)
    .bind(cipher.blind_index(&crypto::normalize_email(&email)))
    .bind("Administrator")
    .bind(password_hash)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    tracing::info!("Seeded initial admin account");
    Ok(())
}
