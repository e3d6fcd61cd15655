use {
    crate::{
        config::PERSISTENCE,
        data::{AccountStore, LedgerChange},
        domain::{Deposit, Timeframe, Trade, TradeDirection, TradeStatus, TransferStatus, User, Withdrawal},
    },
    anyhow::{Context, Result, anyhow},
    async_trait::async_trait,
    sqlx::{
        ConnectOptions, Pool, Row, Sqlite, Transaction,
        sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous},
    },
    std::{str::FromStr, time::Duration},
};

/// Durable account store. Balance CAS is a single guarded UPDATE inside a transaction.
pub struct SqliteAccountStore {
    pool: Pool<Sqlite>,
}

impl SqliteAccountStore {
    pub async fn new(db_path: &str) -> Result<Self> {
        let connection_options = SqliteConnectOptions::from_str(&format!("sqlite://{}", db_path))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(PERSISTENCE.accounts.busy_timeout_secs))
            .synchronous(SqliteSynchronous::Normal)
            .log_slow_statements(log::LevelFilter::Warn, Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(PERSISTENCE.accounts.max_connections)
            .connect_with(connection_options)
            .await
            .with_context(|| format!("Failed to open account db at {}", db_path))?;

        let store = Self { pool };
        store.initialize().await?;
        Ok(store)
    }

    /// Private in-memory database. One connection, kept alive for the pool's lifetime.
    pub async fn in_memory() -> Result<Self> {
        let connection_options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(connection_options)
            .await
            .context("Failed to open in-memory account db")?;

        let store = Self { pool };
        store.initialize().await?;
        Ok(store)
    }

    async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                wallet_address TEXT NOT NULL UNIQUE,
                balance REAL NOT NULL,
                created_at INTEGER NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create users table")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS trades (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                symbol TEXT NOT NULL,
                amount REAL NOT NULL,
                timeframe_days INTEGER NOT NULL,
                direction TEXT NOT NULL,
                open_price REAL NOT NULL,
                close_price REAL,
                profit REAL NOT NULL,
                status TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                end_time INTEGER NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create trades table")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS deposits (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                amount REAL NOT NULL,
                tx_hash TEXT,
                status TEXT NOT NULL,
                created_at INTEGER NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create deposits table")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS withdrawals (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                amount REAL NOT NULL,
                address TEXT NOT NULL,
                status TEXT NOT NULL,
                created_at INTEGER NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create withdrawals table")?;

        Ok(())
    }

    async fn write_change(tx: &mut Transaction<'_, Sqlite>, change: LedgerChange<'_>) -> Result<()> {
        match change {
            LedgerChange::None => {}
            LedgerChange::NewTrade(t) => {
                sqlx::query(
                    r#"
                    INSERT INTO trades (id, user_id, symbol, amount, timeframe_days, direction,
                        open_price, close_price, profit, status, created_at, end_time)
                    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(&t.id)
                .bind(&t.user_id)
                .bind(&t.symbol)
                .bind(t.amount)
                .bind(t.timeframe.days() as i64)
                .bind(t.direction.to_string())
                .bind(t.open_price)
                .bind(t.close_price)
                .bind(t.profit)
                .bind(t.status.to_string())
                .bind(t.created_at_ms)
                .bind(t.end_time_ms)
                .execute(&mut **tx)
                .await?;
            }
            LedgerChange::TradeUpdate(t) => {
                let result = sqlx::query(
                    "UPDATE trades SET profit = ?, status = ?, close_price = ? WHERE id = ?",
                )
                .bind(t.profit)
                .bind(t.status.to_string())
                .bind(t.close_price)
                .bind(&t.id)
                .execute(&mut **tx)
                .await?;
                if result.rows_affected() == 0 {
                    return Err(anyhow!("trade {} not found", t.id));
                }
            }
            LedgerChange::Deposit(d) => {
                sqlx::query(
                    "INSERT INTO deposits (id, user_id, amount, tx_hash, status, created_at) VALUES (?, ?, ?, ?, ?, ?)",
                )
                .bind(&d.id)
                .bind(&d.user_id)
                .bind(d.amount)
                .bind(&d.tx_hash)
                .bind(d.status.to_string())
                .bind(d.created_at_ms)
                .execute(&mut **tx)
                .await?;
            }
            LedgerChange::Withdrawal(w) => {
                sqlx::query(
                    "INSERT INTO withdrawals (id, user_id, amount, address, status, created_at) VALUES (?, ?, ?, ?, ?, ?)",
                )
                .bind(&w.id)
                .bind(&w.user_id)
                .bind(w.amount)
                .bind(&w.address)
                .bind(w.status.to_string())
                .bind(w.created_at_ms)
                .execute(&mut **tx)
                .await?;
            }
        }
        Ok(())
    }
}

fn user_from_row(row: &SqliteRow) -> Result<User> {
    Ok(User {
        id: row.try_get("id")?,
        wallet_address: row.try_get("wallet_address")?,
        balance: row.try_get("balance")?,
        created_at_ms: row.try_get("created_at")?,
    })
}

fn trade_from_row(row: &SqliteRow) -> Result<Trade> {
    let days: i64 = row.try_get("timeframe_days")?;
    let direction: String = row.try_get("direction")?;
    let status: String = row.try_get("status")?;

    Ok(Trade {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        symbol: row.try_get("symbol")?,
        amount: row.try_get("amount")?,
        timeframe: u32::try_from(days)
            .ok()
            .and_then(Timeframe::from_days)
            .ok_or_else(|| anyhow!("bad timeframe_days {}", days))?,
        direction: TradeDirection::from_str(&direction)?,
        open_price: row.try_get("open_price")?,
        close_price: row.try_get("close_price")?,
        profit: row.try_get("profit")?,
        status: TradeStatus::from_str(&status)?,
        created_at_ms: row.try_get("created_at")?,
        end_time_ms: row.try_get("end_time")?,
    })
}

fn deposit_from_row(row: &SqliteRow) -> Result<Deposit> {
    let status: String = row.try_get("status")?;
    Ok(Deposit {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        amount: row.try_get("amount")?,
        tx_hash: row.try_get("tx_hash")?,
        status: TransferStatus::from_str(&status)?,
        created_at_ms: row.try_get("created_at")?,
    })
}

fn withdrawal_from_row(row: &SqliteRow) -> Result<Withdrawal> {
    let status: String = row.try_get("status")?;
    Ok(Withdrawal {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        amount: row.try_get("amount")?,
        address: row.try_get("address")?,
        status: TransferStatus::from_str(&status)?,
        created_at_ms: row.try_get("created_at")?,
    })
}

#[async_trait]
impl AccountStore for SqliteAccountStore {
    async fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        sqlx::query("SELECT id, wallet_address, balance, created_at FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(user_from_row)
            .transpose()
    }

    async fn get_user_by_wallet(&self, wallet: &str) -> Result<Option<User>> {
        sqlx::query(
            "SELECT id, wallet_address, balance, created_at FROM users WHERE wallet_address = ?",
        )
        .bind(wallet)
        .fetch_optional(&self.pool)
        .await?
        .as_ref()
        .map(user_from_row)
        .transpose()
    }

    async fn insert_user_if_absent(&self, user: &User) -> Result<User> {
        sqlx::query(
            "INSERT OR IGNORE INTO users (id, wallet_address, balance, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&user.id)
        .bind(&user.wallet_address)
        .bind(user.balance)
        .bind(user.created_at_ms)
        .execute(&self.pool)
        .await
        .context("Failed to insert user")?;

        self.get_user_by_wallet(&user.wallet_address)
            .await?
            .ok_or_else(|| anyhow!("user {} vanished after insert", user.wallet_address))
    }

    async fn set_balance(&self, user_id: &str, balance: f64) -> Result<bool> {
        let result = sqlx::query("UPDATE users SET balance = ? WHERE id = ?")
            .bind(balance)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn commit(
        &self,
        user_id: &str,
        expected: f64,
        new_balance: f64,
        change: LedgerChange<'_>,
    ) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let swapped = sqlx::query("UPDATE users SET balance = ? WHERE id = ? AND balance = ?")
            .bind(new_balance)
            .bind(user_id)
            .bind(expected)
            .execute(&mut *tx)
            .await?;

        if swapped.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        // Dropping `tx` on error rolls back the balance update too
        Self::write_change(&mut tx, change).await?;
        tx.commit().await?;
        Ok(true)
    }

    async fn get_trade(&self, trade_id: &str) -> Result<Option<Trade>> {
        sqlx::query("SELECT * FROM trades WHERE id = ?")
            .bind(trade_id)
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(trade_from_row)
            .transpose()
    }

    async fn user_trades(&self, user_id: &str) -> Result<Vec<Trade>> {
        let rows = sqlx::query(
            "SELECT * FROM trades WHERE user_id = ? ORDER BY created_at DESC, rowid DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(trade_from_row).collect()
    }

    async fn active_trades(&self) -> Result<Vec<Trade>> {
        let rows = sqlx::query("SELECT * FROM trades WHERE status = ? ORDER BY created_at ASC")
            .bind(TradeStatus::Active.to_string())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(trade_from_row).collect()
    }

    async fn user_deposits(&self, user_id: &str) -> Result<Vec<Deposit>> {
        let rows = sqlx::query(
            "SELECT * FROM deposits WHERE user_id = ? ORDER BY created_at DESC, rowid DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(deposit_from_row).collect()
    }

    async fn user_withdrawals(&self, user_id: &str) -> Result<Vec<Withdrawal>> {
        let rows = sqlx::query(
            "SELECT * FROM withdrawals WHERE user_id = ? ORDER BY created_at DESC, rowid DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(withdrawal_from_row).collect()
    }
}
