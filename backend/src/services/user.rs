//! User records mirrored from the identity provider

use chrono::{DateTime, Utc};
use shared::{Pagination, RoleProfile, User, UserRole};
use sqlx::{types::Json, FromRow, PgPool};
use uuid::Uuid;

use crate::audit::{self, AuditEvent};
use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;

#[derive(Clone)]
pub struct UserService {
    db: PgPool,
}

#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    email: Option<String>,
    name: String,
    role: String,
    profile: Json<RoleProfile>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = AppError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: row.id,
            email: row.email,
            name: row.name,
            role: row.role.parse()?,
            profile: row.profile.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const USER_COLUMNS: &str = "id, email, name, role, profile, created_at, updated_at";

impl UserService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    async fn find(&self, id: Uuid) -> AppResult<Option<User>> {
        sqlx::query_as::<_, UserRow>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .map(User::try_from)
            .transpose()
    }

    /// The caller's user record, created from token claims on first sight.
    ///
    /// A role change at the identity provider replaces the stored role and
    /// resets the profile to that role's empty profile.
    pub async fn current(&self, auth: &AuthUser) -> AppResult<User> {
        if let Some(user) = self.find(auth.user_id).await? {
            if user.role == auth.role {
                return Ok(user);
            }

            tracing::info!(user_id = %auth.user_id, from = %user.role, to = %auth.role, "user role changed");
            let row = sqlx::query_as::<_, UserRow>(&format!(
                r#"
                UPDATE users SET role = $2, profile = $3, updated_at = NOW()
                WHERE id = $1
                RETURNING {USER_COLUMNS}
                "#
            ))
            .bind(auth.user_id)
            .bind(auth.role.as_str())
            .bind(Json(auth.role.default_profile()))
            .fetch_one(&self.db)
            .await?;
            return row.try_into();
        }

        let name = auth
            .name
            .clone()
            .or_else(|| auth.email.clone())
            .unwrap_or_else(|| auth.user_id.to_string());

        let inserted = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            INSERT INTO users (id, email, name, role, profile)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO NOTHING
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(auth.user_id)
        .bind(&auth.email)
        .bind(&name)
        .bind(auth.role.as_str())
        .bind(Json(auth.role.default_profile()))
        .fetch_optional(&self.db)
        .await?;

        match inserted {
            Some(row) => {
                audit::emit(AuditEvent::UserProvisioned {
                    user_id: auth.user_id,
                    role: auth.role,
                });
                row.try_into()
            }
            // Provisioned by a concurrent request
            None => self
                .find(auth.user_id)
                .await?
                .ok_or_else(|| AppError::not_found("User", auth.user_id)),
        }
    }

    /// Replace the caller's role profile; the profile must match the caller's role
    pub async fn update_profile(&self, auth: &AuthUser, profile: RoleProfile) -> AppResult<User> {
        if profile.role() != auth.role {
            return Err(AppError::validation(
                "role",
                format!("Profile for {} does not match role {}", profile.role(), auth.role),
            ));
        }
        self.current(auth).await?;

        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            UPDATE users SET profile = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(auth.user_id)
        .bind(Json(profile))
        .fetch_one(&self.db)
        .await?;

        row.try_into()
    }

    pub async fn list(&self, role: Option<UserRole>, pagination: Pagination) -> AppResult<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            SELECT {USER_COLUMNS} FROM users
            WHERE $1::TEXT IS NULL OR role = $1
            ORDER BY name, id
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(role.map(|r| r.as_str()))
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(User::try_from).collect()
    }
}

/// Ensure `client_id` names a user with the CLIENT role
pub(crate) async fn require_client(conn: &mut sqlx::PgConnection, client_id: Uuid) -> AppResult<()> {
    let role = sqlx::query_scalar::<_, String>("SELECT role FROM users WHERE id = $1")
        .bind(client_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::not_found("User", client_id))?;

    if role != UserRole::Client.as_str() {
        return Err(AppError::validation(
            "clientId",
            "Sales orders can only be placed for CLIENT users",
        ));
    }
    Ok(())
}
