//! Credential store contract.
//!
//! The store is the single source of truth and the serialization point for
//! conflicting operations. Every method that both checks and mutates state
//! does so in one atomic step on the implementation side; callers never
//! pair a read with a separate write.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{Item, NewTransfer, Transfer, User};

/// Result of a conditional item delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
    /// The item exists but the owner filter did not match.
    NotOwner,
}

/// Result of the atomic `Pending -> Completed` swap plus owner reassignment.
#[derive(Debug, Clone)]
pub enum CompletionOutcome {
    /// Both mutations committed; carries the completed transfer.
    Completed(Transfer),
    /// The transfer was no longer pending; nothing changed.
    AlreadyCompleted,
    /// No transfer holds this token.
    TransferMissing,
    /// The item was deleted after initiation; nothing changed.
    ItemMissing,
    /// The sender no longer owns the item; nothing changed.
    SenderNotOwner,
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn health_check(&self) -> Result<(), anyhow::Error>;

    /// Insert a user unless the login is taken. `None` means it was.
    async fn insert_user(&self, login: &str, secret_hash: &str)
        -> Result<Option<User>, anyhow::Error>;

    async fn find_user_by_login(&self, login: &str) -> Result<Option<User>, anyhow::Error>;

    /// Find the user currently holding `token`, expired or not.
    async fn find_user_by_token(&self, token: &str) -> Result<Option<User>, anyhow::Error>;

    /// Overwrite the user's session token and expiry together.
    /// Returns false if the user does not exist.
    async fn store_session(
        &self,
        user_id: i64,
        token: &str,
        expires_utc: DateTime<Utc>,
    ) -> Result<bool, anyhow::Error>;

    async fn insert_item(&self, owner_id: i64, name: &str) -> Result<Item, anyhow::Error>;

    async fn find_item(&self, item_id: i64) -> Result<Option<Item>, anyhow::Error>;

    /// Items owned by `owner_id`, ascending by id.
    async fn list_items_by_owner(&self, owner_id: i64) -> Result<Vec<Item>, anyhow::Error>;

    /// Delete an item, optionally only if `owner_id` owns it.
    async fn delete_item(
        &self,
        item_id: i64,
        owner_id: Option<i64>,
    ) -> Result<DeleteOutcome, anyhow::Error>;

    async fn insert_transfer(&self, transfer: &NewTransfer) -> Result<Transfer, anyhow::Error>;

    async fn find_transfer_by_token(&self, token: &str)
        -> Result<Option<Transfer>, anyhow::Error>;

    /// Atomically mark the pending transfer completed and move its item to
    /// the recipient. Both changes commit together or not at all, and at
    /// most one caller per token ever observes `Completed`.
    ///
    /// With `require_sender_owns`, the item must still belong to the
    /// transfer's sender at completion time.
    async fn complete_transfer(
        &self,
        token: &str,
        require_sender_owns: bool,
    ) -> Result<CompletionOutcome, anyhow::Error>;
}
