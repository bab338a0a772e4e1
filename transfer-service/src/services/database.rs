//! PostgreSQL-backed credential store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{info, instrument};

use super::metrics::db_timer;
use super::store::{CompletionOutcome, CredentialStore, DeleteOutcome};
use crate::models::{Item, NewTransfer, Transfer, User};

const USER_COLUMNS: &str =
    "user_id, login, secret_hash, session_token, session_expires_utc, created_utc";
const ITEM_COLUMNS: &str = "item_id, owner_id, name, created_utc";
const TRANSFER_COLUMNS: &str = "transfer_id, item_id, from_user_id, to_user_id, \
     confirmation_token, status, created_utc, completed_utc";

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "transfer-service"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for Database {
    #[instrument(skip(self))]
    async fn health_check(&self) -> Result<(), anyhow::Error> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| anyhow::anyhow!("Health check failed: {}", e))?;
        Ok(())
    }

    #[instrument(skip(self, secret_hash))]
    async fn insert_user(
        &self,
        login: &str,
        secret_hash: &str,
    ) -> Result<Option<User>, anyhow::Error> {
        let _timer = db_timer("insert_user");

        // ON CONFLICT keeps the uniqueness check and the insert in one statement
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (login, secret_hash)
            VALUES ($1, $2)
            ON CONFLICT (login) DO NOTHING
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(login)
        .bind(secret_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to insert user: {}", e))?;

        Ok(user)
    }

    #[instrument(skip(self))]
    async fn find_user_by_login(&self, login: &str) -> Result<Option<User>, anyhow::Error> {
        let _timer = db_timer("find_user_by_login");

        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE login = $1"
        ))
        .bind(login)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to find user by login: {}", e))
    }

    #[instrument(skip_all)]
    async fn find_user_by_token(&self, token: &str) -> Result<Option<User>, anyhow::Error> {
        let _timer = db_timer("find_user_by_token");

        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE session_token = $1"
        ))
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to find user by token: {}", e))
    }

    #[instrument(skip(self, token))]
    async fn store_session(
        &self,
        user_id: i64,
        token: &str,
        expires_utc: DateTime<Utc>,
    ) -> Result<bool, anyhow::Error> {
        let _timer = db_timer("store_session");

        let result = sqlx::query(
            r#"
            UPDATE users
            SET session_token = $2, session_expires_utc = $3
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .bind(token)
        .bind(expires_utc)
        .execute(&self.pool)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to store session: {}", e))?;

        Ok(result.rows_affected() == 1)
    }

    #[instrument(skip(self))]
    async fn insert_item(&self, owner_id: i64, name: &str) -> Result<Item, anyhow::Error> {
        let _timer = db_timer("insert_item");

        sqlx::query_as::<_, Item>(&format!(
            "INSERT INTO items (owner_id, name) VALUES ($1, $2) RETURNING {ITEM_COLUMNS}"
        ))
        .bind(owner_id)
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to insert item: {}", e))
    }

    #[instrument(skip(self))]
    async fn find_item(&self, item_id: i64) -> Result<Option<Item>, anyhow::Error> {
        let _timer = db_timer("find_item");

        sqlx::query_as::<_, Item>(&format!(
            "SELECT {ITEM_COLUMNS} FROM items WHERE item_id = $1"
        ))
        .bind(item_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to find item: {}", e))
    }

    #[instrument(skip(self))]
    async fn list_items_by_owner(&self, owner_id: i64) -> Result<Vec<Item>, anyhow::Error> {
        let _timer = db_timer("list_items_by_owner");

        sqlx::query_as::<_, Item>(&format!(
            "SELECT {ITEM_COLUMNS} FROM items WHERE owner_id = $1 ORDER BY item_id"
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to list items: {}", e))
    }

    #[instrument(skip(self))]
    async fn delete_item(
        &self,
        item_id: i64,
        owner_id: Option<i64>,
    ) -> Result<DeleteOutcome, anyhow::Error> {
        let _timer = db_timer("delete_item");

        let deleted: Option<i64> = sqlx::query_scalar(
            r#"
            DELETE FROM items
            WHERE item_id = $1 AND ($2::BIGINT IS NULL OR owner_id = $2)
            RETURNING item_id
            "#,
        )
        .bind(item_id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to delete item: {}", e))?;

        if deleted.is_some() {
            return Ok(DeleteOutcome::Deleted);
        }

        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM items WHERE item_id = $1)")
                .bind(item_id)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to check item: {}", e))?;

        Ok(if exists {
            DeleteOutcome::NotOwner
        } else {
            DeleteOutcome::NotFound
        })
    }

    #[instrument(skip(self, transfer), fields(item_id = transfer.item_id))]
    async fn insert_transfer(&self, transfer: &NewTransfer) -> Result<Transfer, anyhow::Error> {
        let _timer = db_timer("insert_transfer");

        sqlx::query_as::<_, Transfer>(&format!(
            r#"
            INSERT INTO transfers (item_id, from_user_id, to_user_id, confirmation_token)
            VALUES ($1, $2, $3, $4)
            RETURNING {TRANSFER_COLUMNS}
            "#
        ))
        .bind(transfer.item_id)
        .bind(transfer.from_user_id)
        .bind(transfer.to_user_id)
        .bind(&transfer.confirmation_token)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to insert transfer: {}", e))
    }

    #[instrument(skip_all)]
    async fn find_transfer_by_token(
        &self,
        token: &str,
    ) -> Result<Option<Transfer>, anyhow::Error> {
        let _timer = db_timer("find_transfer_by_token");

        sqlx::query_as::<_, Transfer>(&format!(
            "SELECT {TRANSFER_COLUMNS} FROM transfers WHERE confirmation_token = $1"
        ))
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to find transfer: {}", e))
    }

    #[instrument(skip_all)]
    async fn complete_transfer(
        &self,
        token: &str,
        require_sender_owns: bool,
    ) -> Result<CompletionOutcome, anyhow::Error> {
        let _timer = db_timer("complete_transfer");

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to begin transaction: {}", e))?;

        // Row lock plus the status predicate: concurrent callers serialize
        // here and only the first sees a row.
        let completed = sqlx::query_as::<_, Transfer>(&format!(
            r#"
            UPDATE transfers
            SET status = 'completed', completed_utc = NOW()
            WHERE confirmation_token = $1 AND status = 'pending'
            RETURNING {TRANSFER_COLUMNS}
            "#
        ))
        .bind(token)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to complete transfer: {}", e))?;

        let Some(transfer) = completed else {
            tx.rollback()
                .await
                .map_err(|e| anyhow::anyhow!("Failed to roll back: {}", e))?;

            return Ok(match self.find_transfer_by_token(token).await? {
                Some(_) => CompletionOutcome::AlreadyCompleted,
                None => CompletionOutcome::TransferMissing,
            });
        };

        let moved = sqlx::query(
            r#"
            UPDATE items SET owner_id = $1
            WHERE item_id = $2 AND (NOT $3 OR owner_id = $4)
            "#,
        )
        .bind(transfer.to_user_id)
        .bind(transfer.item_id)
        .bind(require_sender_owns)
        .bind(transfer.from_user_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to reassign item owner: {}", e))?;

        if moved.rows_affected() == 0 {
            let item_exists: bool =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM items WHERE item_id = $1)")
                    .bind(transfer.item_id)
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(|e| anyhow::anyhow!("Failed to check item: {}", e))?;

            tx.rollback()
                .await
                .map_err(|e| anyhow::anyhow!("Failed to roll back: {}", e))?;

            return Ok(if item_exists {
                CompletionOutcome::SenderNotOwner
            } else {
                CompletionOutcome::ItemMissing
            });
        }

        tx.commit()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to commit transfer: {}", e))?;

        Ok(CompletionOutcome::Completed(transfer))
    }
}
