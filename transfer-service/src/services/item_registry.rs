//! Item catalogue and ownership changes.

use serde::Deserialize;
use std::sync::Arc;

use super::error::ServiceError;
use super::store::{CompletionOutcome, CredentialStore, DeleteOutcome};
use crate::models::{Item, Principal, Transfer};

/// Whether deletes and sends require the caller to own the item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OwnershipPolicy {
    #[default]
    Enforced,
    /// Any authenticated user may delete or send any item.
    Permissive,
}

impl OwnershipPolicy {
    pub fn is_enforced(&self) -> bool {
        matches!(self, Self::Enforced)
    }
}

impl std::str::FromStr for OwnershipPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "enforced" | "true" | "1" => Ok(Self::Enforced),
            "permissive" | "false" | "0" => Ok(Self::Permissive),
            _ => Err(format!("Invalid ownership policy: {}", s)),
        }
    }
}

#[derive(Clone)]
pub struct ItemRegistry {
    store: Arc<dyn CredentialStore>,
    policy: OwnershipPolicy,
}

impl ItemRegistry {
    pub fn new(store: Arc<dyn CredentialStore>, policy: OwnershipPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> OwnershipPolicy {
        self.policy
    }

    #[tracing::instrument(skip(self, owner), fields(owner_id = owner.user_id))]
    pub async fn create(&self, owner: &Principal, name: &str) -> Result<Item, ServiceError> {
        let item = self.store.insert_item(owner.user_id, name).await?;
        tracing::info!(item_id = item.item_id, "Item created");
        Ok(item)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get(&self, item_id: i64) -> Result<Item, ServiceError> {
        self.store
            .find_item(item_id)
            .await?
            .ok_or(ServiceError::ItemNotFound)
    }

    /// Items owned by `owner`, ascending by id.
    pub async fn list_by_owner(&self, owner: &Principal) -> Result<Vec<Item>, ServiceError> {
        Ok(self.store.list_items_by_owner(owner.user_id).await?)
    }

    /// Remove an item. Pending transfers for it stay on record and fail
    /// with `ItemNotFound` if later confirmed.
    #[tracing::instrument(skip(self, caller), fields(caller_id = caller.user_id))]
    pub async fn delete(&self, caller: &Principal, item_id: i64) -> Result<(), ServiceError> {
        let owner_filter = self.policy.is_enforced().then_some(caller.user_id);

        match self.store.delete_item(item_id, owner_filter).await? {
            DeleteOutcome::Deleted => {
                tracing::info!("Item deleted");
                Ok(())
            }
            DeleteOutcome::NotFound => Err(ServiceError::ItemNotFound),
            DeleteOutcome::NotOwner => Err(ServiceError::NotItemOwner),
        }
    }

    /// Complete a pending transfer and hand its item to the recipient in
    /// one atomic store step. Under the enforced policy the sender must
    /// still own the item, so a stale transfer cannot take it back from
    /// whoever received it since.
    #[tracing::instrument(skip_all, fields(item_id = transfer.item_id))]
    pub(crate) async fn reassign_owner(
        &self,
        transfer: &Transfer,
    ) -> Result<Transfer, ServiceError> {
        match self
            .store
            .complete_transfer(&transfer.confirmation_token, self.policy.is_enforced())
            .await?
        {
            CompletionOutcome::Completed(done) => {
                tracing::info!(
                    from_user_id = done.from_user_id,
                    to_user_id = done.to_user_id,
                    "Item ownership reassigned"
                );
                Ok(done)
            }
            CompletionOutcome::AlreadyCompleted => Err(ServiceError::AlreadyCompleted),
            CompletionOutcome::TransferMissing => Err(ServiceError::TransferNotFound),
            CompletionOutcome::ItemMissing => Err(ServiceError::ItemNotFound),
            CompletionOutcome::SenderNotOwner => Err(ServiceError::NotItemOwner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::InMemoryStore;

    async fn setup(policy: OwnershipPolicy) -> (ItemRegistry, Principal, Principal) {
        let store = Arc::new(InMemoryStore::new());
        let alice = store.insert_user("alice", "h").await.unwrap().unwrap();
        let bob = store.insert_user("bob", "h").await.unwrap().unwrap();
        (
            ItemRegistry::new(store, policy),
            alice.principal(),
            bob.principal(),
        )
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!("true".parse(), Ok(OwnershipPolicy::Enforced));
        assert_eq!("Permissive".parse(), Ok(OwnershipPolicy::Permissive));
        assert!("sometimes".parse::<OwnershipPolicy>().is_err());
        assert_eq!(OwnershipPolicy::default(), OwnershipPolicy::Enforced);
    }

    #[tokio::test]
    async fn test_list_is_ascending_and_scoped_to_owner() {
        let (registry, alice, bob) = setup(OwnershipPolicy::Enforced).await;
        let first = registry.create(&alice, "a").await.unwrap();
        registry.create(&bob, "b").await.unwrap();
        let second = registry.create(&alice, "c").await.unwrap();

        let ids: Vec<i64> = registry
            .list_by_owner(&alice)
            .await
            .unwrap()
            .iter()
            .map(|i| i.item_id)
            .collect();
        assert_eq!(ids, vec![first.item_id, second.item_id]);
    }

    #[tokio::test]
    async fn test_create_allows_duplicate_names() {
        let (registry, alice, _) = setup(OwnershipPolicy::Enforced).await;
        let a = registry.create(&alice, "lamp").await.unwrap();
        let b = registry.create(&alice, "lamp").await.unwrap();
        assert_ne!(a.item_id, b.item_id);
    }

    #[tokio::test]
    async fn test_enforced_delete_requires_owner() {
        let (registry, alice, bob) = setup(OwnershipPolicy::Enforced).await;
        let item = registry.create(&alice, "lamp").await.unwrap();

        assert!(matches!(
            registry.delete(&bob, item.item_id).await,
            Err(ServiceError::NotItemOwner)
        ));
        registry.delete(&alice, item.item_id).await.unwrap();
        assert!(matches!(
            registry.delete(&alice, item.item_id).await,
            Err(ServiceError::ItemNotFound)
        ));
    }

    #[tokio::test]
    async fn test_permissive_delete_by_anyone() {
        let (registry, alice, bob) = setup(OwnershipPolicy::Permissive).await;
        let item = registry.create(&alice, "lamp").await.unwrap();

        registry.delete(&bob, item.item_id).await.unwrap();
        assert!(matches!(
            registry.get(item.item_id).await,
            Err(ServiceError::ItemNotFound)
        ));
    }
}
