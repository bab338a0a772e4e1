//! Domain records for users, items and transfers.

pub mod item;
pub mod transfer;
pub mod user;

pub use item::Item;
pub use transfer::{NewTransfer, Transfer, TransferStatus};
pub use user::{Principal, SessionToken, User};
