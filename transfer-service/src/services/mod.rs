//! Services layer for transfer-service.
//!
//! The three core components share one injected [`CredentialStore`]; none of
//! them keeps state of its own.

mod database;
pub mod error;
mod item_registry;
mod memory;
pub mod metrics;
mod store;
mod token_authority;
mod transfer_coordinator;

pub use database::Database;
pub use error::ServiceError;
pub use item_registry::{ItemRegistry, OwnershipPolicy};
pub use memory::InMemoryStore;
pub use store::{CompletionOutcome, CredentialStore, DeleteOutcome};
pub use token_authority::TokenAuthority;
pub use transfer_coordinator::TransferCoordinator;
