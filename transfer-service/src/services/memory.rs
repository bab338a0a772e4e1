//! In-process credential store.
//!
//! All tables sit behind one mutex, so every trait method is a single
//! critical section and therefore atomic with respect to every other call.
//! The lock is never held across an await point.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use super::store::{CompletionOutcome, CredentialStore, DeleteOutcome};
use crate::models::{Item, NewTransfer, Transfer, TransferStatus, User};

#[derive(Default)]
struct Tables {
    users: BTreeMap<i64, User>,
    items: BTreeMap<i64, Item>,
    transfers: BTreeMap<i64, Transfer>,
    last_user_id: i64,
    last_item_id: i64,
    last_transfer_id: i64,
}

#[derive(Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, anyhow::Error> {
        self.tables
            .lock()
            .map_err(|e| anyhow::anyhow!("In-memory store mutex poisoned: {}", e))
    }

    /// Insert a fully formed user record, keeping its id.
    pub fn seed_user(&self, user: User) -> Result<(), anyhow::Error> {
        let mut tables = self.lock()?;
        tables.last_user_id = tables.last_user_id.max(user.user_id);
        tables.users.insert(user.user_id, user);
        Ok(())
    }

    /// Insert a fully formed item record, keeping its id.
    pub fn seed_item(&self, item: Item) -> Result<(), anyhow::Error> {
        let mut tables = self.lock()?;
        tables.last_item_id = tables.last_item_id.max(item.item_id);
        tables.items.insert(item.item_id, item);
        Ok(())
    }

}

#[async_trait]
impl CredentialStore for InMemoryStore {
    async fn health_check(&self) -> Result<(), anyhow::Error> {
        self.lock().map(|_| ())
    }

    async fn insert_user(
        &self,
        login: &str,
        secret_hash: &str,
    ) -> Result<Option<User>, anyhow::Error> {
        let mut tables = self.lock()?;
        if tables.users.values().any(|u| u.login == login) {
            return Ok(None);
        }

        tables.last_user_id += 1;
        let user = User::new(tables.last_user_id, login.to_string(), secret_hash.to_string());
        tables.users.insert(user.user_id, user.clone());
        Ok(Some(user))
    }

    async fn find_user_by_login(&self, login: &str) -> Result<Option<User>, anyhow::Error> {
        let tables = self.lock()?;
        Ok(tables.users.values().find(|u| u.login == login).cloned())
    }

    async fn find_user_by_token(&self, token: &str) -> Result<Option<User>, anyhow::Error> {
        let tables = self.lock()?;
        Ok(tables
            .users
            .values()
            .find(|u| u.session_token.as_deref() == Some(token))
            .cloned())
    }

    async fn store_session(
        &self,
        user_id: i64,
        token: &str,
        expires_utc: DateTime<Utc>,
    ) -> Result<bool, anyhow::Error> {
        let mut tables = self.lock()?;
        match tables.users.get_mut(&user_id) {
            Some(user) => {
                user.session_token = Some(token.to_string());
                user.session_expires_utc = Some(expires_utc);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn insert_item(&self, owner_id: i64, name: &str) -> Result<Item, anyhow::Error> {
        let mut tables = self.lock()?;
        if !tables.users.contains_key(&owner_id) {
            return Err(anyhow::anyhow!("Owner {} does not exist", owner_id));
        }

        tables.last_item_id += 1;
        let item = Item::new(tables.last_item_id, owner_id, name.to_string());
        tables.items.insert(item.item_id, item.clone());
        Ok(item)
    }

    async fn find_item(&self, item_id: i64) -> Result<Option<Item>, anyhow::Error> {
        let tables = self.lock()?;
        Ok(tables.items.get(&item_id).cloned())
    }

    async fn list_items_by_owner(&self, owner_id: i64) -> Result<Vec<Item>, anyhow::Error> {
        let tables = self.lock()?;
        // BTreeMap iteration is already ascending by item id
        Ok(tables
            .items
            .values()
            .filter(|item| item.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn delete_item(
        &self,
        item_id: i64,
        owner_id: Option<i64>,
    ) -> Result<DeleteOutcome, anyhow::Error> {
        let mut tables = self.lock()?;
        let outcome = match (tables.items.get(&item_id), owner_id) {
            (None, _) => DeleteOutcome::NotFound,
            (Some(item), Some(owner)) if item.owner_id != owner => DeleteOutcome::NotOwner,
            (Some(_), _) => DeleteOutcome::Deleted,
        };

        if outcome == DeleteOutcome::Deleted {
            tables.items.remove(&item_id);
        }
        Ok(outcome)
    }

    async fn insert_transfer(&self, transfer: &NewTransfer) -> Result<Transfer, anyhow::Error> {
        let mut tables = self.lock()?;
        if tables
            .transfers
            .values()
            .any(|t| t.confirmation_token == transfer.confirmation_token)
        {
            return Err(anyhow::anyhow!("Duplicate confirmation token"));
        }

        tables.last_transfer_id += 1;
        let record = Transfer {
            transfer_id: tables.last_transfer_id,
            item_id: transfer.item_id,
            from_user_id: transfer.from_user_id,
            to_user_id: transfer.to_user_id,
            confirmation_token: transfer.confirmation_token.clone(),
            status: TransferStatus::Pending,
            created_utc: Utc::now(),
            completed_utc: None,
        };
        tables.transfers.insert(record.transfer_id, record.clone());
        Ok(record)
    }

    async fn find_transfer_by_token(
        &self,
        token: &str,
    ) -> Result<Option<Transfer>, anyhow::Error> {
        let tables = self.lock()?;
        Ok(tables
            .transfers
            .values()
            .find(|t| t.confirmation_token == token)
            .cloned())
    }

    async fn complete_transfer(
        &self,
        token: &str,
        require_sender_owns: bool,
    ) -> Result<CompletionOutcome, anyhow::Error> {
        let mut guard = self.lock()?;
        let tables = &mut *guard;

        let Some(transfer) = tables
            .transfers
            .values_mut()
            .find(|t| t.confirmation_token == token)
        else {
            return Ok(CompletionOutcome::TransferMissing);
        };

        if transfer.status != TransferStatus::Pending {
            return Ok(CompletionOutcome::AlreadyCompleted);
        }

        let Some(item) = tables.items.get_mut(&transfer.item_id) else {
            return Ok(CompletionOutcome::ItemMissing);
        };

        if require_sender_owns && item.owner_id != transfer.from_user_id {
            return Ok(CompletionOutcome::SenderNotOwner);
        }

        item.owner_id = transfer.to_user_id;
        transfer.status = TransferStatus::Completed;
        transfer.completed_utc = Some(Utc::now());

        Ok(CompletionOutcome::Completed(transfer.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store_with_users() -> (InMemoryStore, User, User) {
        let store = InMemoryStore::new();
        let alice = store.insert_user("alice", "hash").await.unwrap().unwrap();
        let bob = store.insert_user("bob", "hash").await.unwrap().unwrap();
        (store, alice, bob)
    }

    #[tokio::test]
    async fn test_insert_user_rejects_duplicate_login() {
        let (store, _, _) = store_with_users().await;
        assert!(store.insert_user("alice", "other").await.unwrap().is_none());
        // Logins are case-sensitive
        assert!(store.insert_user("Alice", "other").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_store_session_overwrites_previous_token() {
        let (store, alice, _) = store_with_users().await;
        let expires = Utc::now();

        assert!(store.store_session(alice.user_id, "first", expires).await.unwrap());
        assert!(store.store_session(alice.user_id, "second", expires).await.unwrap());

        assert!(store.find_user_by_token("first").await.unwrap().is_none());
        let holder = store.find_user_by_token("second").await.unwrap().unwrap();
        assert_eq!(holder.user_id, alice.user_id);
        assert!(!store.store_session(999, "x", expires).await.unwrap());
    }

    #[tokio::test]
    async fn test_seeded_ids_advance_counters() {
        let (store, alice, _) = store_with_users().await;
        store
            .seed_item(Item::new(10, alice.user_id, "seeded".to_string()))
            .unwrap();

        let next = store.insert_item(alice.user_id, "next").await.unwrap();
        assert_eq!(next.item_id, 11);
    }

    #[tokio::test]
    async fn test_delete_item_with_owner_filter() {
        let (store, alice, bob) = store_with_users().await;
        let item = store.insert_item(alice.user_id, "lamp").await.unwrap();

        assert_eq!(
            store.delete_item(item.item_id, Some(bob.user_id)).await.unwrap(),
            DeleteOutcome::NotOwner
        );
        assert_eq!(
            store.delete_item(item.item_id, Some(alice.user_id)).await.unwrap(),
            DeleteOutcome::Deleted
        );
        assert_eq!(
            store.delete_item(item.item_id, None).await.unwrap(),
            DeleteOutcome::NotFound
        );
    }

    #[tokio::test]
    async fn test_complete_transfer_is_single_shot() {
        let (store, alice, bob) = store_with_users().await;
        let item = store.insert_item(alice.user_id, "lamp").await.unwrap();
        store
            .insert_transfer(&NewTransfer {
                item_id: item.item_id,
                from_user_id: alice.user_id,
                to_user_id: bob.user_id,
                confirmation_token: "tok".to_string(),
            })
            .await
            .unwrap();

        assert!(matches!(
            store.complete_transfer("tok", true).await.unwrap(),
            CompletionOutcome::Completed(_)
        ));
        assert!(matches!(
            store.complete_transfer("tok", true).await.unwrap(),
            CompletionOutcome::AlreadyCompleted
        ));
        assert!(matches!(
            store.complete_transfer("nope", true).await.unwrap(),
            CompletionOutcome::TransferMissing
        ));

        let moved = store.find_item(item.item_id).await.unwrap().unwrap();
        assert_eq!(moved.owner_id, bob.user_id);
    }

    #[tokio::test]
    async fn test_complete_transfer_of_deleted_item_changes_nothing() {
        let (store, alice, bob) = store_with_users().await;
        let item = store.insert_item(alice.user_id, "lamp").await.unwrap();
        store
            .insert_transfer(&NewTransfer {
                item_id: item.item_id,
                from_user_id: alice.user_id,
                to_user_id: bob.user_id,
                confirmation_token: "tok".to_string(),
            })
            .await
            .unwrap();
        store.delete_item(item.item_id, None).await.unwrap();

        assert!(matches!(
            store.complete_transfer("tok", true).await.unwrap(),
            CompletionOutcome::ItemMissing
        ));
        let transfer = store.find_transfer_by_token("tok").await.unwrap().unwrap();
        assert_eq!(transfer.status, TransferStatus::Pending);
    }

    #[tokio::test]
    async fn test_complete_transfer_requires_sender_to_still_own_item() {
        let (store, alice, bob) = store_with_users().await;
        let carol = store.insert_user("carol", "hash").await.unwrap().unwrap();
        let item = store.insert_item(alice.user_id, "lamp").await.unwrap();
        for (to, token) in [(&bob, "to-bob"), (&carol, "to-carol")] {
            store
                .insert_transfer(&NewTransfer {
                    item_id: item.item_id,
                    from_user_id: alice.user_id,
                    to_user_id: to.user_id,
                    confirmation_token: token.to_string(),
                })
                .await
                .unwrap();
        }

        assert!(matches!(
            store.complete_transfer("to-bob", true).await.unwrap(),
            CompletionOutcome::Completed(_)
        ));
        assert!(matches!(
            store.complete_transfer("to-carol", true).await.unwrap(),
            CompletionOutcome::SenderNotOwner
        ));

        let stale = store.find_transfer_by_token("to-carol").await.unwrap().unwrap();
        assert_eq!(stale.status, TransferStatus::Pending);
        let item = store.find_item(item.item_id).await.unwrap().unwrap();
        assert_eq!(item.owner_id, bob.user_id);

        // Without the ownership requirement the stale transfer still completes
        assert!(matches!(
            store.complete_transfer("to-carol", false).await.unwrap(),
            CompletionOutcome::Completed(_)
        ));
    }
}
