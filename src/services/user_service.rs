use crate::dto::admin_dto::{CreateUserPayload, UpdateUserPayload, UserResponse};
use crate::error::{Error, Result};
use crate::models::User;
use crate::utils::crypto::{self, normalize_email, FieldCipher};
use crate::utils::time;
use sqlx::SqlitePool;

const ROLES: [&str; 2] = ["admin", "hr"];

const USER_COLUMNS: &str =
    "id, email_encrypted, email_index, full_name, password_hash, role, is_active, \
     created_at, updated_at";

#[derive(Clone)]
pub struct UserService {
    pool: SqlitePool,
    cipher: FieldCipher,
}

impl UserService {
    pub fn new(pool: SqlitePool, cipher: FieldCipher) -> Self {
        Self { pool, cipher }
    }

    /// Credential check for the login endpoint. Unknown email and wrong
    /// password produce the same error so the endpoint does not leak which
    /// accounts exist.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User> {
        let index = self.cipher.blind_index(&normalize_email(email));
        let query = format!("SELECT {} FROM users WHERE email_index = ?", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&query)
            .bind(index)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::Unauthorized("Invalid credentials".to_string()))?;

        let ok = crypto::verify_password(password, &user.password_hash)
            .map_err(|e| Error::Internal(format!("Password verification failed: {}", e)))?;
        if !ok {
            return Err(Error::Unauthorized("Invalid credentials".to_string()));
        }
        if !user.is_active {
            return Err(Error::Forbidden("Account is disabled".to_string()));
        }
        Ok(user)
    }

    pub async fn create(&self, payload: CreateUserPayload) -> Result<User> {
        let role = payload.role.unwrap_or_else(|| "hr".to_string());
        if !ROLES.contains(&role.as_str()) {
            return Err(Error::BadRequest(format!("Unknown role '{}'", role)));
        }

        let index = self.cipher.blind_index(&normalize_email(&payload.email));
        let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email_index = ?")
            .bind(&index)
            .fetch_one(&self.pool)
            .await?;
        if existing > 0 {
            return Err(Error::Conflict(
                "User with this email already exists".to_string(),
            ));
        }

        let password_hash = crypto::hash_password(&payload.password)
            .map_err(|e| Error::Internal(format!("Failed to hash password: {}", e)))?;
        let now = time::now();
        let query = format!(
            "INSERT INTO users (email_encrypted, email_index, full_name, password_hash, role, is_active, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, TRUE, ?, ?)
             RETURNING {}",
            USER_COLUMNS
        );
        let user = sqlx::query_as::<_, User>(&query)
            .bind(self.cipher.encrypt(&payload.email)?)
            .bind(index)
            .bind(&payload.full_name)
            .bind(password_hash)
            .bind(&role)
            .bind(now)
            .bind(now)
            .fetch_one(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn get(&self, id: i64) -> Result<User> {
        let query = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("User not found".to_string()))?;
        Ok(user)
    }

    pub async fn list(&self) -> Result<Vec<User>> {
        let query = format!("SELECT {} FROM users ORDER BY created_at ASC", USER_COLUMNS);
        let users = sqlx::query_as::<_, User>(&query)
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    pub async fn update(&self, id: i64, payload: UpdateUserPayload) -> Result<User> {
        self.get(id).await?;

        if let Some(role) = &payload.role {
            if !ROLES.contains(&role.as_str()) {
                return Err(Error::BadRequest(format!("Unknown role '{}'", role)));
            }
        }
        let password_hash = match &payload.password {
            Some(password) => Some(
                crypto::hash_password(password)
                    .map_err(|e| Error::Internal(format!("Failed to hash password: {}", e)))?,
            ),
            None => None,
        };

        let query = format!(
            "UPDATE users SET
                full_name = COALESCE(?, full_name),
                password_hash = COALESCE(?, password_hash),
                role = COALESCE(?, role),
                is_active = COALESCE(?, is_active),
                updated_at = ?
             WHERE id = ?
             RETURNING {}",
            USER_COLUMNS
        );
        let user = sqlx::query_as::<_, User>(&query)
            .bind(&payload.full_name)
            .bind(password_hash)
            .bind(&payload.role)
            .bind(payload.is_active)
            .bind(time::now())
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(user)
    }

    pub fn to_response(&self, user: User) -> Result<UserResponse> {
        Ok(UserResponse {
            id: user.id,
            email: self.cipher.decrypt(&user.email_encrypted)?,
            full_name: user.full_name,
            role: user.role,
            is_active: user.is_active,
            created_at: user.created_at,
        })
    }
}
