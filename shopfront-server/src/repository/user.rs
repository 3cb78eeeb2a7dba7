//! User Repository
//!
//! Handles all database operations related to users.

use shopfront_core::domain::user::{Role, User};
use sqlx::PgPool;

/// Fields needed to insert a user; the password is already hashed
pub struct NewUser<'a> {
    pub nickname: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
}

/// Insert a user and return it
pub async fn create(pool: &PgPool, new_user: NewUser<'_>) -> Result<User, sqlx::Error> {
    let row = sqlx::query_as::<_, UserRow>(
        r#"
        INSERT INTO users (nickname, email, password, role)
        VALUES ($1, $2, $3, $4)
        RETURNING id, nickname, email, login_id, phone, password, role, created_at
        "#,
    )
    .bind(new_user.nickname)
    .bind(new_user.email)
    .bind(new_user.password_hash)
    .bind(Role::User.as_str())
    .fetch_one(pool)
    .await?;

    Ok(row.into())
}

/// Find a user by ID
pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<User>, sqlx::Error> {
    let row = sqlx::query_as::<_, UserRow>(
        r#"
        SELECT id, nickname, email, login_id, phone, password, role, created_at
        FROM users
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| r.into()))
}

/// Find a user by email together with the stored password hash
pub async fn find_credentials_by_email(
    pool: &PgPool,
    email: &str,
) -> Result<Option<(User, String)>, sqlx::Error> {
    let row = sqlx::query_as::<_, UserRow>(
        r#"
        SELECT id, nickname, email, login_id, phone, password, role, created_at
        FROM users
        WHERE email = $1
        "#,
    )
    .bind(email)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| {
        let hash = r.password.clone();
        (r.into(), hash)
    }))
}

/// Name of the first unique field (`email`, then `nickname`) already taken
pub async fn find_taken_field(
    pool: &PgPool,
    email: &str,
    nickname: &str,
) -> Result<Option<&'static str>, sqlx::Error> {
    let (email_taken, nickname_taken): (bool, bool) = sqlx::query_as(
        r#"
        SELECT
            EXISTS (SELECT 1 FROM users WHERE email = $1),
            EXISTS (SELECT 1 FROM users WHERE nickname = $2)
        "#,
    )
    .bind(email)
    .bind(nickname)
    .fetch_one(pool)
    .await?;

    Ok(if email_taken {
        Some("email")
    } else if nickname_taken {
        Some("nickname")
    } else {
        None
    })
}

/// The unique field an insert collided with, if `err` is a unique violation
///
/// Relies on the default constraint names, `users_email_key` and
/// `users_nickname_key`.
pub fn duplicate_field(err: &sqlx::Error) -> Option<&'static str> {
    let db_err = err.as_database_error()?;
    if !db_err.is_unique_violation() {
        return None;
    }

    match db_err.constraint() {
        Some(constraint) if constraint.contains("nickname") => Some("nickname"),
        _ => Some("email"),
    }
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    nickname: String,
    email: String,
    login_id: Option<String>,
    phone: Option<String>,
    password: String,
    role: String,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        let role = Role::parse(&row.role).unwrap_or_else(|| {
            tracing::warn!("Unknown role {:?} for user {}, treating as USER", row.role, row.id);
            Role::User
        });

        User {
            id: row.id,
            nickname: row.nickname,
            email: row.email,
            login_id: row.login_id,
            phone: row.phone,
            role,
            created_at: row.created_at,
        }
    }
}
