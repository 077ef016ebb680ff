//! SQLite-backed buffer.
//!
//! `save` and `claim` each run in a `BEGIN IMMEDIATE` transaction, which takes
//! the database write lock before the lookup. Two writers (in this process or
//! another one sharing the file) therefore serialize: the second waits up to
//! the busy timeout and then re-runs its lookup against committed state.
//!
//! All SQLite I/O runs on the blocking pool; the connection mutex is never
//! held across an await point.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use tracing::{debug, info};

use crate::core::buffer::validate_save_args;
use crate::core::{Buffer, MessageId, MessengerError, QueuedMessage, Recipient};

/// Default wait for a competing writer to release the database lock.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const BUFFER_SCHEMA_SQL: &str = r"
CREATE TABLE IF NOT EXISTS queued_messages (
    message_id INTEGER PRIMARY KEY AUTOINCREMENT,
    originator TEXT NOT NULL,
    text TEXT NOT NULL,
    claimed INTEGER NOT NULL DEFAULT 0
);
CREATE UNIQUE INDEX IF NOT EXISTS idx_queued_messages_unclaimed_key
    ON queued_messages (originator, text) WHERE claimed = 0;
CREATE INDEX IF NOT EXISTS idx_queued_messages_claimable
    ON queued_messages (claimed, message_id);

CREATE TABLE IF NOT EXISTS recipients (
    message_id INTEGER NOT NULL REFERENCES queued_messages (message_id),
    phone_number TEXT NOT NULL,
    UNIQUE (message_id, phone_number)
);

CREATE TRIGGER IF NOT EXISTS trg_queued_messages_claim_is_terminal
BEFORE UPDATE OF claimed ON queued_messages
WHEN OLD.claimed = 1 AND NEW.claimed = 0
BEGIN
    SELECT RAISE(ABORT, 'claimed messages cannot be unclaimed');
END;

CREATE TRIGGER IF NOT EXISTS trg_recipients_reject_claimed
BEFORE INSERT ON recipients
WHEN (SELECT claimed FROM queued_messages WHERE message_id = NEW.message_id) = 1
BEGIN
    SELECT RAISE(ABORT, 'cannot attach recipients to a claimed message');
END;
";

/// Durable buffer stored in a SQLite database file.
///
/// Several instances may open the same file; cross-instance safety comes
/// from SQLite's write lock, not from anything held in process.
#[derive(Clone)]
pub struct SqliteBuffer {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteBuffer {
    /// Open (or create) a buffer database at `path`.
    ///
    /// Enables WAL mode and applies the schema.
    ///
    /// # Errors
    ///
    /// Returns [`MessengerError::Persistence`] if the file cannot be opened or
    /// the schema cannot be applied.
    pub fn open(path: impl AsRef<Path>, busy_timeout: Duration) -> Result<Self, MessengerError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| MessengerError::persistence("create buffer directory failed", e))?;
        }

        let conn = Connection::open(path)
            .map_err(|e| MessengerError::persistence("open buffer database failed", e))?;
        conn.busy_timeout(busy_timeout)
            .map_err(|e| MessengerError::persistence("set busy timeout failed", e))?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            ",
        )
        .map_err(|e| MessengerError::persistence("configure pragmas failed", e))?;

        info!(path = %path.display(), "opened sqlite buffer");
        Self::from_connection(conn)
    }

    /// Create a private in-memory buffer.
    ///
    /// # Errors
    ///
    /// Returns [`MessengerError::Persistence`] if SQLite initialization fails.
    pub fn in_memory() -> Result<Self, MessengerError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| MessengerError::persistence("open in-memory database failed", e))?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(|e| MessengerError::persistence("configure pragmas failed", e))?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, MessengerError> {
        conn.execute_batch(BUFFER_SCHEMA_SQL)
            .map_err(|e| MessengerError::persistence("schema init failed", e))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `op` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, op: F) -> Result<T, MessengerError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, MessengerError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock();
            op(&mut *guard)
        })
        .await
        .map_err(|e| MessengerError::persistence("blocking store task failed", e))?
    }
}

fn save_in_tx(
    conn: &mut Connection,
    phone_number: &str,
    originator: &str,
    text: &str,
) -> Result<MessageId, MessengerError> {
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(|e| MessengerError::persistence("failed to create new transaction", e))?;

    let existing: Option<MessageId> = tx
        .query_row(
            "SELECT message_id FROM queued_messages
             WHERE originator = ?1 AND text = ?2 AND claimed = 0
             ORDER BY message_id LIMIT 1",
            params![originator, text],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| MessengerError::persistence("failed to select unclaimed messages", e))?;

    let message_id = if let Some(id) = existing {
        id
    } else {
        tx.execute(
            "INSERT INTO queued_messages (originator, text) VALUES (?1, ?2)",
            params![originator, text],
        )
        .map_err(|e| MessengerError::persistence("failed to save message", e))?;
        tx.last_insert_rowid()
    };

    tx.execute(
        "INSERT OR IGNORE INTO recipients (message_id, phone_number) VALUES (?1, ?2)",
        params![message_id, phone_number],
    )
    .map_err(|e| MessengerError::persistence("failed to save recipient", e))?;

    tx.commit()
        .map_err(|e| MessengerError::persistence("failed to commit transaction", e))?;
    Ok(message_id)
}

fn claim_in_tx(conn: &mut Connection) -> Result<Option<QueuedMessage>, MessengerError> {
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(|e| MessengerError::persistence("failed to create new transaction", e))?;

    let next = tx
        .query_row(
            "SELECT message_id, originator, text FROM queued_messages
             WHERE claimed = 0 ORDER BY message_id LIMIT 1",
            [],
            |row| {
                Ok(QueuedMessage {
                    id: row.get(0)?,
                    originator: row.get(1)?,
                    text: row.get(2)?,
                    claimed: false,
                })
            },
        )
        .optional()
        .map_err(|e| MessengerError::persistence("failed to select next message", e))?;

    // Dropping the transaction rolls it back.
    let Some(mut message) = next else {
        return Ok(None);
    };

    tx.execute(
        "UPDATE queued_messages SET claimed = 1 WHERE message_id = ?1 AND claimed = 0",
        params![message.id],
    )
    .map_err(|e| MessengerError::persistence("failed to mark message as claimed", e))?;

    tx.commit()
        .map_err(|e| MessengerError::persistence("failed to commit transaction", e))?;
    message.claimed = true;
    Ok(Some(message))
}

fn recipients_for(
    conn: &Connection,
    message_id: MessageId,
) -> Result<Vec<Recipient>, MessengerError> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT message_id, phone_number FROM recipients
             WHERE message_id = ?1 ORDER BY rowid",
        )
        .map_err(|e| MessengerError::persistence("failed to prepare recipients query", e))?;
    let rows = stmt
        .query_map(params![message_id], |row| {
            Ok(Recipient {
                message_id: row.get(0)?,
                phone_number: row.get(1)?,
            })
        })
        .map_err(|e| MessengerError::persistence("failed to get recipients", e))?;
    rows.collect::<Result<Vec<_>, _>>()
        .map_err(|e| MessengerError::persistence("failed to read recipient row", e))
}

#[async_trait]
impl Buffer for SqliteBuffer {
    async fn save(
        &self,
        phone_number: &str,
        originator: &str,
        text: &str,
    ) -> Result<(), MessengerError> {
        validate_save_args(phone_number, originator, text)?;

        let phone_number = phone_number.to_string();
        let originator = originator.to_string();
        let text = text.to_string();
        let message_id = self
            .with_conn(move |conn| save_in_tx(conn, &phone_number, &originator, &text))
            .await?;
        debug!(message_id, "recipient queued");
        Ok(())
    }

    async fn claim(&self) -> Result<Option<QueuedMessage>, MessengerError> {
        self.with_conn(claim_in_tx).await
    }

    async fn recipients(&self, message_id: MessageId) -> Result<Vec<Recipient>, MessengerError> {
        self.with_conn(move |conn| recipients_for(conn, message_id))
            .await
    }
}
