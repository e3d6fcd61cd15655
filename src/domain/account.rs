use {
    serde::{Deserialize, Serialize},
    uuid::Uuid,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub wallet_address: String,
    /// The only durable quantity. Mutated by deposits, withdrawals, trade commits and accrual.
    pub balance: f64,
    pub created_at_ms: i64,
}

impl User {
    pub fn new(wallet_address: &str, now_ms: i64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            wallet_address: normalize_wallet(wallet_address),
            balance: 0.0,
            created_at_ms: now_ms,
        }
    }
}

/// Wallet addresses compare case-insensitively (EIP-55 checksums differ only in case).
pub(crate) fn normalize_wallet(address: &str) -> String {
    address.trim().to_lowercase()
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display,
    strum_macros::EnumString,
)]
pub enum TransferStatus {
    Pending,
    Completed,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deposit {
    pub id: String,
    pub user_id: String,
    pub amount: f64,
    pub tx_hash: Option<String>,
    pub status: TransferStatus,
    pub created_at_ms: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Withdrawal {
    pub id: String,
    pub user_id: String,
    pub amount: f64,
    pub address: String,
    pub status: TransferStatus,
    pub created_at_ms: i64,
}
