//! PostgreSQL user repository implementation

use async_trait::async_trait;
use sqlx::{PgPool, Row};

use crate::domain::avatar::ContentHash;
use crate::domain::user::{ProfilePatch, UserId, UserRecord, UserRepository};
use crate::domain::DomainError;

/// PostgreSQL implementation of UserRepository
#[derive(Debug, Clone)]
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn get(&self, id: &UserId) -> Result<Option<UserRecord>, DomainError> {
        let row = sqlx::query(
            r#"
            SELECT id, first_name, last_name, email, avatar_hash, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to get user: {}", e)))?;

        match row {
            Some(row) => Ok(Some(row_to_user(&row)?)),
            None => Ok(None),
        }
    }

    async fn create(&self, user: UserRecord) -> Result<UserRecord, DomainError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, first_name, last_name, email, avatar_hash,
                               created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(user.id().as_str())
        .bind(user.first_name())
        .bind(user.last_name())
        .bind(user.email())
        .bind(user.avatar_hash().map(|h| h.as_str()))
        .bind(user.created_at())
        .bind(user.updated_at())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            let msg = e.to_string();

            if msg.contains("duplicate key") || msg.contains("unique constraint") {
                DomainError::conflict(format!("User '{}' already exists", user.id()))
            } else {
                DomainError::storage(format!("Failed to create user: {}", e))
            }
        })?;

        Ok(user)
    }

    async fn delete(&self, id: &UserId) -> Result<bool, DomainError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to delete user: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }

    async fn update_profile(
        &self,
        id: &UserId,
        patch: &ProfilePatch,
    ) -> Result<Option<UserRecord>, DomainError> {
        let row = sqlx::query(
            r#"
            UPDATE users
            SET first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                email = COALESCE($4, email),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, first_name, last_name, email, avatar_hash, created_at, updated_at
            "#,
        )
        .bind(id.as_str())
        .bind(patch.first_name.as_deref())
        .bind(patch.last_name.as_deref())
        .bind(patch.email.as_deref())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to update user: {}", e)))?;

        row.as_ref().map(row_to_user).transpose()
    }

    async fn associate_avatar(
        &self,
        id: &UserId,
        hash: &ContentHash,
    ) -> Result<Option<ContentHash>, DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DomainError::storage(format!("Failed to begin transaction: {}", e)))?;

        let previous: Option<Option<String>> =
            sqlx::query_scalar("SELECT avatar_hash FROM users WHERE id = $1 FOR UPDATE")
                .bind(id.as_str())
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| DomainError::storage(format!("Failed to lock user: {}", e)))?;

        sqlx::query(
            r#"
            INSERT INTO users (id, avatar_hash, created_at, updated_at)
            VALUES ($1, $2, NOW(), NOW())
            ON CONFLICT (id) DO UPDATE
            SET avatar_hash = EXCLUDED.avatar_hash,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(id.as_str())
        .bind(hash.as_str())
        .execute(&mut *tx)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to associate avatar: {}", e)))?;

        tx.commit()
            .await
            .map_err(|e| DomainError::storage(format!("Failed to commit transaction: {}", e)))?;

        parse_avatar_hash(previous.flatten())
    }

    async fn dissociate_avatar(
        &self,
        id: &UserId,
        hash: &ContentHash,
    ) -> Result<bool, DomainError> {
        let deleted = sqlx::query(
            r#"
            DELETE FROM users
            WHERE id = $1 AND avatar_hash = $2
              AND first_name IS NULL AND last_name IS NULL AND email IS NULL
            "#,
        )
        .bind(id.as_str())
        .bind(hash.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to delete avatar record: {}", e)))?;

        if deleted.rows_affected() > 0 {
            return Ok(true);
        }

        let cleared = sqlx::query(
            r#"
            UPDATE users
            SET avatar_hash = NULL, updated_at = NOW()
            WHERE id = $1 AND avatar_hash = $2
            "#,
        )
        .bind(id.as_str())
        .bind(hash.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to clear avatar hash: {}", e)))?;

        Ok(cleared.rows_affected() > 0)
    }

    async fn count_by_avatar_hash(&self, hash: &ContentHash) -> Result<usize, DomainError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE avatar_hash = $1")
            .bind(hash.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                DomainError::storage(format!("Failed to count avatar references: {}", e))
            })?;

        Ok(count as usize)
    }
}

fn row_to_user(row: &sqlx::postgres::PgRow) -> Result<UserRecord, DomainError> {
    let id: String = row.get("id");
    let avatar_hash: Option<String> = row.get("avatar_hash");

    let user_id = UserId::new(&id)
        .map_err(|e| DomainError::storage(format!("Invalid user ID in database: {}", e)))?;
    let avatar_hash = parse_avatar_hash(avatar_hash)?;

    Ok(UserRecord::restore(
        user_id,
        row.get("first_name"),
        row.get("last_name"),
        row.get("email"),
        avatar_hash,
        row.get("created_at"),
        row.get("updated_at"),
    ))
}

fn parse_avatar_hash(value: Option<String>) -> Result<Option<ContentHash>, DomainError> {
    value
        .map(|hex| {
            ContentHash::new(hex).map_err(|e| {
                DomainError::storage(format!("Invalid avatar hash in database: {}", e))
            })
        })
        .transpose()
}
