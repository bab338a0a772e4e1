//! Two-step ownership handoff: the sender initiates, the recipient confirms.

use std::sync::Arc;

use super::error::ServiceError;
use super::item_registry::ItemRegistry;
use super::metrics::{record_transfer, TransferOutcome};
use super::store::CredentialStore;
use crate::models::{NewTransfer, Principal, Transfer};
use crate::utils::generate_random_token;

#[derive(Clone)]
pub struct TransferCoordinator {
    store: Arc<dyn CredentialStore>,
    items: ItemRegistry,
}

impl TransferCoordinator {
    pub fn new(store: Arc<dyn CredentialStore>, items: ItemRegistry) -> Self {
        Self { store, items }
    }

    /// Record a pending transfer of `item_id` from `sender` to the user
    /// named `recipient_login` and return it with its confirmation token.
    ///
    /// Checks run in a fixed order: self-send, item, recipient, then
    /// ownership when the policy enforces it.
    #[tracing::instrument(skip(self, sender), fields(from_user_id = sender.user_id))]
    pub async fn initiate(
        &self,
        sender: &Principal,
        item_id: i64,
        recipient_login: &str,
    ) -> Result<Transfer, ServiceError> {
        let result = self.try_initiate(sender, item_id, recipient_login).await;
        match &result {
            Ok(transfer) => {
                record_transfer(TransferOutcome::Initiated);
                tracing::info!(
                    transfer_id = transfer.transfer_id,
                    to_user_id = transfer.to_user_id,
                    "Transfer initiated"
                );
            }
            Err(ServiceError::Store(_)) => {}
            Err(e) => {
                record_transfer(TransferOutcome::Rejected);
                tracing::info!(reason = %e, "Transfer rejected");
            }
        }
        result
    }

    async fn try_initiate(
        &self,
        sender: &Principal,
        item_id: i64,
        recipient_login: &str,
    ) -> Result<Transfer, ServiceError> {
        if sender.login == recipient_login {
            return Err(ServiceError::SelfTransferRejected);
        }

        let item = self.items.get(item_id).await?;

        let recipient = self
            .store
            .find_user_by_login(recipient_login)
            .await?
            .ok_or(ServiceError::RecipientNotFound)?;

        if self.items.policy().is_enforced() && !item.is_owned_by(sender.user_id) {
            return Err(ServiceError::NotItemOwner);
        }

        let transfer = NewTransfer {
            item_id: item.item_id,
            from_user_id: sender.user_id,
            to_user_id: recipient.user_id,
            confirmation_token: generate_random_token(),
        };

        Ok(self.store.insert_transfer(&transfer).await?)
    }

    /// Redeem a confirmation token on behalf of `requester`.
    ///
    /// At most one call per token ever succeeds, however many race.
    #[tracing::instrument(skip_all, fields(user_id = requester.user_id))]
    pub async fn confirm(
        &self,
        token: &str,
        requester: &Principal,
    ) -> Result<Transfer, ServiceError> {
        let transfer = self
            .store
            .find_transfer_by_token(token)
            .await?
            .ok_or(ServiceError::TransferNotFound)?;

        if transfer.to_user_id != requester.user_id {
            record_transfer(TransferOutcome::Rejected);
            tracing::warn!(
                transfer_id = transfer.transfer_id,
                "Confirmation attempted by someone other than the recipient"
            );
            return Err(ServiceError::NotAuthorizedForConfirmation);
        }

        if transfer.is_completed() {
            record_transfer(TransferOutcome::AlreadyCompleted);
            return Err(ServiceError::AlreadyCompleted);
        }

        match self.items.reassign_owner(&transfer).await {
            Ok(done) => {
                record_transfer(TransferOutcome::Completed);
                tracing::info!(transfer_id = done.transfer_id, item_id = done.item_id, "Transfer completed");
                Ok(done)
            }
            Err(ServiceError::AlreadyCompleted) => {
                record_transfer(TransferOutcome::AlreadyCompleted);
                tracing::warn!(transfer_id = transfer.transfer_id, "Lost confirmation race");
                Err(ServiceError::AlreadyCompleted)
            }
            Err(ServiceError::NotItemOwner) => {
                record_transfer(TransferOutcome::Rejected);
                tracing::warn!(
                    transfer_id = transfer.transfer_id,
                    "Sender no longer owns the item"
                );
                Err(ServiceError::NotItemOwner)
            }
            Err(e) => Err(e),
        }
    }
}
