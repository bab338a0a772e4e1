//! Transfer model - pending and completed ownership handoffs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{
    error::BoxDynError,
    postgres::{PgTypeInfo, PgValueRef},
    Decode, FromRow, Postgres, Type,
};

/// Transfer lifecycle. The only transition is `Pending -> Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferStatus {
    Pending,
    Completed,
}

impl TransferStatus {
    /// Get string representation for database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
        }
    }
}

impl std::str::FromStr for TransferStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            _ => Err(format!("Invalid transfer status: {}", s)),
        }
    }
}

// Stored as VARCHAR; decoded through the string form.
impl Type<Postgres> for TransferStatus {
    fn type_info() -> PgTypeInfo {
        <String as Type<Postgres>>::type_info()
    }

    fn compatible(ty: &PgTypeInfo) -> bool {
        <String as Type<Postgres>>::compatible(ty)
    }
}

impl<'r> Decode<'r, Postgres> for TransferStatus {
    fn decode(value: PgValueRef<'r>) -> Result<Self, BoxDynError> {
        let raw = <&str as Decode<Postgres>>::decode(value)?;
        raw.parse().map_err(Into::into)
    }
}

impl std::fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Ownership handoff of one item between two distinct users.
#[derive(Debug, Clone, FromRow)]
pub struct Transfer {
    pub transfer_id: i64,
    pub item_id: i64,
    pub from_user_id: i64,
    pub to_user_id: i64,
    pub confirmation_token: String,
    pub status: TransferStatus,
    pub created_utc: DateTime<Utc>,
    pub completed_utc: Option<DateTime<Utc>>,
}

impl Transfer {
    pub fn is_completed(&self) -> bool {
        self.status == TransferStatus::Completed
    }
}

/// Input for recording a new pending transfer.
#[derive(Debug, Clone)]
pub struct NewTransfer {
    pub item_id: i64,
    pub from_user_id: i64,
    pub to_user_id: i64,
    pub confirmation_token: String,
}
