use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Item held by exactly one user.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Item {
    pub item_id: i64,
    pub owner_id: i64,
    pub name: String,
    pub created_utc: DateTime<Utc>,
}

impl Item {
    pub fn new(item_id: i64, owner_id: i64, name: String) -> Self {
        Self {
            item_id,
            owner_id,
            name,
            created_utc: Utc::now(),
        }
    }

    pub fn is_owned_by(&self, user_id: i64) -> bool {
        self.owner_id == user_id
    }
}
