//! File persistence configuration

/// Configuration for the account database
pub struct AccountPersistenceConfig {
    /// Default SQLite file used by the CLI when `--db` is given without a path
    pub db_path: &'static str,
    pub max_connections: u32,
    pub busy_timeout_secs: u64,
}

/// The Master Persistence Configuration
pub struct PersistenceConfig {
    pub accounts: AccountPersistenceConfig,
}

pub const PERSISTENCE: PersistenceConfig = PersistenceConfig {
    accounts: AccountPersistenceConfig {
        db_path: "accounts.sqlite",
        max_connections: 5,
        busy_timeout_secs: 10,
    },
};
