//! Mention storage trait and SQLite implementation.
//!
//! The (conversation, anchor_message_id, addressed_user) triple is unique at
//! the schema level; re-observing the same address is a no-op insert. That
//! constraint, not in-process locking, is what makes duplicate transport
//! delivery safe.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::error::{BadgerError, BadgerResult};
use crate::types::{Mention, MentionState, NewMention, Priority};

/// Trait for mention storage operations.
pub trait MentionStore: Send + Sync {
    /// Insert a new mention. A duplicate triple returns `Ok(None)`.
    fn insert(&self, new: &NewMention) -> BadgerResult<Option<Mention>>;

    /// Get a mention by id. Missing rows are `Ok(None)`.
    fn get_by_id(&self, id: &str) -> BadgerResult<Option<Mention>>;

    /// Record that `replied_user` answered in the thread rooted at
    /// `anchor_message_id`. Only that user's still-unreplied mentions are
    /// touched; the resolved mentions are returned.
    fn update_reply_state(
        &self,
        conversation: &str,
        anchor_message_id: &str,
        replied_user: &str,
        replied_at: DateTime<Utc>,
    ) -> BadgerResult<Vec<Mention>>;

    /// Conditionally mark a mention escalated with the created work item id.
    /// Returns false when the mention was already replied to or escalated,
    /// in which case the caller must not treat the escalation as done.
    fn mark_escalated(&self, id: &str, work_item_id: &str) -> BadgerResult<bool>;

    /// Unresolved mentions (no reply, not escalated) recorded at least
    /// `age_threshold_hours` ago; 0 disables the age filter. Most recent
    /// first.
    fn list_unresolved(&self, age_threshold_hours: i64) -> BadgerResult<Vec<Mention>>;

    /// Count mentions in the given state. States partition the table, so the
    /// three counts sum to the row count.
    fn count_by(&self, state: MentionState) -> BadgerResult<u64>;
}

const COLUMNS: &str = "id, conversation, anchor_message_id, addressed_user, asking_user, text, \
                       priority, recorded_at, replied_at, escalated, work_item_id";

/// SQLite-backed mention store.
pub struct SqliteMentionStore {
    conn: Mutex<Connection>,
}

impl SqliteMentionStore {
    /// Create a new store at the given path.
    pub fn new(path: impl AsRef<Path>) -> BadgerResult<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing).
    pub fn in_memory() -> BadgerResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> BadgerResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS mentions (
                id TEXT PRIMARY KEY,
                conversation TEXT NOT NULL,
                anchor_message_id TEXT NOT NULL,
                addressed_user TEXT NOT NULL,
                asking_user TEXT NOT NULL,
                text TEXT NOT NULL,
                priority INTEGER NOT NULL DEFAULT 2,
                recorded_at TEXT NOT NULL,
                replied_at TEXT,
                escalated INTEGER NOT NULL DEFAULT 0,
                work_item_id TEXT,
                UNIQUE(conversation, anchor_message_id, addressed_user)
            );

            CREATE INDEX IF NOT EXISTS idx_mentions_open ON mentions(replied_at, escalated);
            CREATE INDEX IF NOT EXISTS idx_mentions_user ON mentions(addressed_user);
        "#,
        )?;
        Ok(())
    }

    fn row_to_mention(row: &rusqlite::Row<'_>) -> BadgerResult<Mention> {
        let priority: i64 = row.get(6)?;
        let recorded_at: String = row.get(7)?;
        let replied_at: Option<String> = row.get(8)?;
        let escalated: i32 = row.get(9)?;

        Ok(Mention {
            id: row.get(0)?,
            conversation: row.get(1)?,
            anchor_message_id: row.get(2)?,
            addressed_user: row.get(3)?,
            asking_user: row.get(4)?,
            text: row.get(5)?,
            priority: Priority::from_code(priority)
                .ok_or_else(|| BadgerError::parse(format!("bad priority code {}", priority)))?,
            recorded_at: parse_timestamp(&recorded_at)?,
            replied_at: replied_at.map(|s| parse_timestamp(&s)).transpose()?,
            escalated: escalated != 0,
            work_item_id: row.get(10)?,
        })
    }

    fn is_unique_violation(err: &rusqlite::Error) -> bool {
        matches!(
            err,
            rusqlite::Error::SqliteFailure(e, _)
                if e.code == rusqlite::ErrorCode::ConstraintViolation
        )
    }
}

fn parse_timestamp(raw: &str) -> BadgerResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| BadgerError::parse(format!("bad timestamp '{}': {}", raw, e)))
}

impl MentionStore for SqliteMentionStore {
    fn insert(&self, new: &NewMention) -> BadgerResult<Option<Mention>> {
        let conn = self.conn.lock().unwrap();
        let mention = Mention {
            id: Uuid::new_v4().to_string(),
            conversation: new.conversation.clone(),
            anchor_message_id: new.anchor_message_id.clone(),
            addressed_user: new.addressed_user.clone(),
            asking_user: new.asking_user.clone(),
            text: new.text.clone(),
            priority: new.priority,
            recorded_at: Utc::now(),
            replied_at: None,
            escalated: false,
            work_item_id: None,
        };

        let inserted = conn.execute(
            r#"INSERT INTO mentions
               (id, conversation, anchor_message_id, addressed_user, asking_user, text,
                priority, recorded_at, replied_at, escalated, work_item_id)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, NULL, 0, NULL)"#,
            params![
                mention.id,
                mention.conversation,
                mention.anchor_message_id,
                mention.addressed_user,
                mention.asking_user,
                mention.text,
                mention.priority.code(),
                mention.recorded_at.to_rfc3339(),
            ],
        );

        match inserted {
            Ok(_) => Ok(Some(mention)),
            Err(e) if Self::is_unique_violation(&e) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn get_by_id(&self, id: &str) -> BadgerResult<Option<Mention>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!("SELECT {} FROM mentions WHERE id = ?1", COLUMNS))?;
        stmt.query_row(params![id], |row| Ok(Self::row_to_mention(row)))
            .optional()?
            .transpose()
    }

    fn update_reply_state(
        &self,
        conversation: &str,
        anchor_message_id: &str,
        replied_user: &str,
        replied_at: DateTime<Utc>,
    ) -> BadgerResult<Vec<Mention>> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn.prepare(&format!(
            r#"SELECT {} FROM mentions
               WHERE conversation = ?1 AND anchor_message_id = ?2 AND addressed_user = ?3
                 AND replied_at IS NULL"#,
            COLUMNS
        ))?;
        let results = stmt.query_map(
            params![conversation, anchor_message_id, replied_user],
            |row| Ok(Self::row_to_mention(row)),
        )?;
        let mut resolved: Vec<Mention> = results
            .map(|r| r.map_err(|e| e.into()).and_then(|inner| inner))
            .collect::<BadgerResult<_>>()?;

        if resolved.is_empty() {
            return Ok(resolved);
        }

        conn.execute(
            r#"UPDATE mentions SET replied_at = ?4
               WHERE conversation = ?1 AND anchor_message_id = ?2 AND addressed_user = ?3
                 AND replied_at IS NULL"#,
            params![
                conversation,
                anchor_message_id,
                replied_user,
                replied_at.to_rfc3339()
            ],
        )?;

        for mention in &mut resolved {
            mention.replied_at = Some(replied_at);
        }
        Ok(resolved)
    }

    fn mark_escalated(&self, id: &str, work_item_id: &str) -> BadgerResult<bool> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            r#"UPDATE mentions SET escalated = 1, work_item_id = ?2
               WHERE id = ?1 AND replied_at IS NULL AND escalated = 0"#,
            params![id, work_item_id],
        )?;
        Ok(changed > 0)
    }

    fn list_unresolved(&self, age_threshold_hours: i64) -> BadgerResult<Vec<Mention>> {
        let conn = self.conn.lock().unwrap();

        let mut sql = format!(
            "SELECT {} FROM mentions WHERE replied_at IS NULL AND escalated = 0",
            COLUMNS
        );
        let cutoff = if age_threshold_hours > 0 {
            sql.push_str(" AND recorded_at <= ?1");
            Some((Utc::now() - Duration::hours(age_threshold_hours)).to_rfc3339())
        } else {
            None
        };
        sql.push_str(" ORDER BY recorded_at DESC");

        let mut stmt = conn.prepare(&sql)?;
        let map_row = |row: &rusqlite::Row<'_>| Ok(Self::row_to_mention(row));
        let results = match &cutoff {
            Some(cutoff) => stmt.query_map(params![cutoff], map_row)?,
            None => stmt.query_map([], map_row)?,
        };

        results
            .map(|r| r.map_err(|e| e.into()).and_then(|inner| inner))
            .collect()
    }

    fn count_by(&self, state: MentionState) -> BadgerResult<u64> {
        let conn = self.conn.lock().unwrap();
        let condition = match state {
            MentionState::Unresolved => "replied_at IS NULL AND escalated = 0",
            MentionState::Replied => "replied_at IS NOT NULL",
            MentionState::Escalated => "replied_at IS NULL AND escalated = 1",
        };
        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM mentions WHERE {}", condition),
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}
