//! Work item storage trait and SQLite implementation.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::warn;

use crate::error::{BadgerError, BadgerResult};
use crate::types::{Priority, WorkItem, WorkItemFilter, WorkItemStatus, WorkItemUpdate};

/// Trait for work item storage operations.
pub trait WorkItemStore: Send + Sync {
    /// Persist a new work item.
    fn create(&self, item: &WorkItem) -> BadgerResult<()>;

    /// Get a work item by id. Missing rows are `Ok(None)`.
    fn get_by_id(&self, id: &str) -> BadgerResult<Option<WorkItem>>;

    /// List work items matching the filter, newest first.
    fn list(&self, filter: &WorkItemFilter) -> BadgerResult<Vec<WorkItem>>;

    /// Apply a partial update. Missing rows are `Ok(None)`.
    fn update(&self, id: &str, update: &WorkItemUpdate) -> BadgerResult<Option<WorkItem>>;

    /// Mark a work item completed. Completing an already-completed item is a
    /// no-op that returns the item unchanged. Missing rows are `Ok(None)`.
    fn complete(&self, id: &str, completed_by: &str) -> BadgerResult<Option<WorkItem>>;

    /// Delete a work item. Returns whether a row was removed.
    fn delete(&self, id: &str) -> BadgerResult<bool>;

    /// Open items with a deadline inside `[now, now + hours_ahead]`, soonest
    /// first.
    fn list_upcoming(&self, hours_ahead: i64) -> BadgerResult<Vec<WorkItem>>;

    /// Open items with a deadline in the past, most overdue first.
    fn list_overdue(&self) -> BadgerResult<Vec<WorkItem>>;
}

const COLUMNS: &str = "id, text, status, assignee, created_by, origin_conversation, \
                       origin_message_id, due_at, priority, summary, created_at, updated_at, \
                       completed_at, completed_by";

/// SQLite-backed work item store.
pub struct SqliteWorkItemStore {
    conn: Mutex<Connection>,
}

impl SqliteWorkItemStore {
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
            CREATE TABLE IF NOT EXISTS work_items (
                id TEXT PRIMARY KEY,
                text TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'open',
                assignee TEXT,
                created_by TEXT NOT NULL,
                origin_conversation TEXT NOT NULL,
                origin_message_id TEXT NOT NULL,
                due_at TEXT,
                priority INTEGER NOT NULL DEFAULT 2,
                summary TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                completed_at TEXT,
                completed_by TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_work_items_due ON work_items(status, due_at);
            CREATE INDEX IF NOT EXISTS idx_work_items_assignee ON work_items(assignee);
        "#,
        )?;
        Ok(())
    }

    fn fetch_by_id(conn: &Connection, id: &str) -> BadgerResult<Option<WorkItem>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM work_items WHERE id = ?1",
            COLUMNS
        ))?;
        stmt.query_row(params![id], |row| Ok(Self::row_to_item(row)))
            .optional()?
            .transpose()
    }

    fn row_to_item(row: &rusqlite::Row<'_>) -> BadgerResult<WorkItem> {
        let status: String = row.get(2)?;
        let due_at: Option<String> = row.get(7)?;
        let priority: i64 = row.get(8)?;
        let created_at: String = row.get(10)?;
        let updated_at: String = row.get(11)?;
        let completed_at: Option<String> = row.get(12)?;

        Ok(WorkItem {
            id: row.get(0)?,
            text: row.get(1)?,
            status: status
                .parse::<WorkItemStatus>()
                .map_err(|e| BadgerError::parse(format!("bad status '{}': {}", status, e)))?,
            assignee: row.get(3)?,
            created_by: row.get(4)?,
            origin_conversation: row.get(5)?,
            origin_message_id: row.get(6)?,
            due_at: due_at.map(|s| parse_timestamp(&s)).transpose()?,
            priority: Priority::from_code(priority)
                .ok_or_else(|| BadgerError::parse(format!("bad priority code {}", priority)))?,
            summary: row.get(9)?,
            created_at: parse_timestamp(&created_at)?,
            updated_at: parse_timestamp(&updated_at)?,
            completed_at: completed_at.map(|s| parse_timestamp(&s)).transpose()?,
            completed_by: row.get(13)?,
        })
    }

    fn write_full(conn: &Connection, item: &WorkItem) -> BadgerResult<()> {
        conn.execute(
            r#"UPDATE work_items SET
               text = ?2, status = ?3, assignee = ?4, due_at = ?5, priority = ?6,
               summary = ?7, updated_at = ?8, completed_at = ?9, completed_by = ?10
               WHERE id = ?1"#,
            params![
                item.id,
                item.text,
                item.status.to_string(),
                item.assignee,
                item.due_at.map(|dt| dt.to_rfc3339()),
                item.priority.code(),
                item.summary,
                item.updated_at.to_rfc3339(),
                item.completed_at.map(|dt| dt.to_rfc3339()),
                item.completed_by,
            ],
        )?;
        Ok(())
    }
}

fn parse_timestamp(raw: &str) -> BadgerResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| BadgerError::parse(format!("bad timestamp '{}': {}", raw, e)))
}

impl WorkItemStore for SqliteWorkItemStore {
    fn create(&self, item: &WorkItem) -> BadgerResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"INSERT INTO work_items
               (id, text, status, assignee, created_by, origin_conversation, origin_message_id,
                due_at, priority, summary, created_at, updated_at, completed_at, completed_by)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)"#,
            params![
                item.id,
                item.text,
                item.status.to_string(),
                item.assignee,
                item.created_by,
                item.origin_conversation,
                item.origin_message_id,
                item.due_at.map(|dt| dt.to_rfc3339()),
                item.priority.code(),
                item.summary,
                item.created_at.to_rfc3339(),
                item.updated_at.to_rfc3339(),
                item.completed_at.map(|dt| dt.to_rfc3339()),
                item.completed_by,
            ],
        )?;
        Ok(())
    }

    fn get_by_id(&self, id: &str) -> BadgerResult<Option<WorkItem>> {
        let conn = self.conn.lock().unwrap();
        Self::fetch_by_id(&conn, id)
    }

    fn list(&self, filter: &WorkItemFilter) -> BadgerResult<Vec<WorkItem>> {
        let conn = self.conn.lock().unwrap();

        let mut sql = format!("SELECT {} FROM work_items", COLUMNS);
        let mut clauses: Vec<&str> = Vec::new();
        let mut values: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(status) = filter.status {
            clauses.push("status = ?");
            values.push(Box::new(status.to_string()));
        }
        if let Some(assignee) = &filter.assignee {
            clauses.push("assignee = ?");
            values.push(Box::new(assignee.clone()));
        }
        if let Some(created_by) = &filter.created_by {
            clauses.push("created_by = ?");
            values.push(Box::new(created_by.clone()));
        }
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY created_at DESC");
        if let Some(limit) = filter.limit {
            sql.push_str(" LIMIT ?");
            values.push(Box::new(limit as i64));
        }

        let mut stmt = conn.prepare(&sql)?;
        let param_refs: Vec<&dyn rusqlite::ToSql> = values.iter().map(|v| v.as_ref()).collect();
        let results = stmt.query_map(&param_refs[..], |row| Ok(Self::row_to_item(row)))?;

        results
            .map(|r| r.map_err(|e| e.into()).and_then(|inner| inner))
            .collect()
    }

    fn update(&self, id: &str, update: &WorkItemUpdate) -> BadgerResult<Option<WorkItem>> {
        let conn = self.conn.lock().unwrap();
        let Some(mut item) = Self::fetch_by_id(&conn, id)? else {
            return Ok(None);
        };

        if let Some(text) = &update.text {
            item.text = text.clone();
        }
        if let Some(assignee) = &update.assignee {
            item.assignee = Some(assignee.clone());
        }
        if let Some(due_at) = update.due_at {
            item.due_at = due_at;
        }
        if let Some(priority) = update.priority {
            item.priority = priority;
        }
        if let Some(summary) = &update.summary {
            item.summary = Some(summary.clone());
        }
        item.updated_at = Utc::now();

        Self::write_full(&conn, &item)?;
        Ok(Some(item))
    }

    fn complete(&self, id: &str, completed_by: &str) -> BadgerResult<Option<WorkItem>> {
        let conn = self.conn.lock().unwrap();
        let Some(mut item) = Self::fetch_by_id(&conn, id)? else {
            return Ok(None);
        };

        if item.status == WorkItemStatus::Completed {
            warn!(id, "work item already completed, ignoring");
            return Ok(Some(item));
        }

        let now = Utc::now();
        item.status = WorkItemStatus::Completed;
        item.completed_at = Some(now);
        item.completed_by = Some(completed_by.to_string());
        item.updated_at = now;

        Self::write_full(&conn, &item)?;
        Ok(Some(item))
    }

    fn delete(&self, id: &str) -> BadgerResult<bool> {
        let conn = self.conn.lock().unwrap();
        let removed = conn.execute("DELETE FROM work_items WHERE id = ?1", params![id])?;
        Ok(removed > 0)
    }

    fn list_upcoming(&self, hours_ahead: i64) -> BadgerResult<Vec<WorkItem>> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now();
        let horizon = now + Duration::hours(hours_ahead);

        let mut stmt = conn.prepare(&format!(
            r#"SELECT {} FROM work_items
               WHERE status = 'open' AND due_at IS NOT NULL AND due_at >= ?1 AND due_at <= ?2
               ORDER BY due_at ASC"#,
            COLUMNS
        ))?;

        let results = stmt.query_map(params![now.to_rfc3339(), horizon.to_rfc3339()], |row| {
            Ok(Self::row_to_item(row))
        })?;

        results
            .map(|r| r.map_err(|e| e.into()).and_then(|inner| inner))
            .collect()
    }

    fn list_overdue(&self) -> BadgerResult<Vec<WorkItem>> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now().to_rfc3339();

        let mut stmt = conn.prepare(&format!(
            r#"SELECT {} FROM work_items
               WHERE status = 'open' AND due_at IS NOT NULL AND due_at < ?1
               ORDER BY due_at ASC"#,
            COLUMNS
        ))?;

        let results = stmt.query_map(params![now], |row| Ok(Self::row_to_item(row)))?;

        results
            .map(|r| r.map_err(|e| e.into()).and_then(|inner| inner))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_item(text: &str) -> WorkItem {
        WorkItem::new(text, "C01", "1700000000.000100", "U_ALICE")
    }

    #[test]
    fn test_work_item_crud() {
        let store = SqliteWorkItemStore::in_memory().unwrap();

        let item = sample_item("write the report")
            .with_assignee("U_BOB")
            .with_due_at(Utc::now() + Duration::hours(30))
            .with_priority(Priority::High);
        store.create(&item).unwrap();

        let retrieved = store.get_by_id(&item.id).unwrap().unwrap();
        assert_eq!(retrieved.text, "write the report");
        assert_eq!(retrieved.assignee.as_deref(), Some("U_BOB"));
        assert_eq!(retrieved.priority, Priority::High);
        assert_eq!(retrieved.status, WorkItemStatus::Open);
        assert!(retrieved.due_at.is_some());

        let updated = store
            .update(
                &item.id,
                &WorkItemUpdate::default().with_text("rewrite the report").clear_due_at(),
            )
            .unwrap()
            .unwrap();
        assert_eq!(updated.text, "rewrite the report");
        assert!(updated.due_at.is_none());

        assert!(store.delete(&item.id).unwrap());
        assert!(store.get_by_id(&item.id).unwrap().is_none());
        assert!(!store.delete(&item.id).unwrap());
    }

    #[test]
    fn test_get_missing_is_none() {
        let store = SqliteWorkItemStore::in_memory().unwrap();
        assert!(store.get_by_id("task-nope").unwrap().is_none());
        assert!(store
            .update("task-nope", &WorkItemUpdate::default().with_text("x"))
            .unwrap()
            .is_none());
        assert!(store.complete("task-nope", "U1").unwrap().is_none());
    }

    #[test]
    fn test_complete_sets_fields_once() {
        let store = SqliteWorkItemStore::in_memory().unwrap();
        let item = sample_item("ship it");
        store.create(&item).unwrap();

        let completed = store.complete(&item.id, "U_BOB").unwrap().unwrap();
        assert_eq!(completed.status, WorkItemStatus::Completed);
        assert_eq!(completed.completed_by.as_deref(), Some("U_BOB"));
        let first_completed_at = completed.completed_at.unwrap();

        // Second completion is a no-op and keeps the original completer
        let again = store.complete(&item.id, "U_EVE").unwrap().unwrap();
        assert_eq!(again.completed_by.as_deref(), Some("U_BOB"));
        assert_eq!(again.completed_at.unwrap(), first_completed_at);
    }

    #[test]
    fn test_list_filters() {
        let store = SqliteWorkItemStore::in_memory().unwrap();
        store
            .create(&sample_item("a").with_assignee("U_BOB"))
            .unwrap();
        store
            .create(&sample_item("b").with_assignee("U_EVE"))
            .unwrap();
        let done = sample_item("c");
        store.create(&done).unwrap();
        store.complete(&done.id, "U_ALICE").unwrap();

        let open = store
            .list(&WorkItemFilter::default().with_status(WorkItemStatus::Open))
            .unwrap();
        assert_eq!(open.len(), 2);

        let bobs = store
            .list(&WorkItemFilter::default().with_assignee("U_BOB"))
            .unwrap();
        assert_eq!(bobs.len(), 1);
        assert_eq!(bobs[0].text, "a");

        let limited = store.list(&WorkItemFilter::default().with_limit(1)).unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[test]
    fn test_list_upcoming_window() {
        let store = SqliteWorkItemStore::in_memory().unwrap();
        let now = Utc::now();

        store
            .create(&sample_item("due soon").with_due_at(now + Duration::hours(2)))
            .unwrap();
        store
            .create(&sample_item("due later").with_due_at(now + Duration::hours(50)))
            .unwrap();
        store
            .create(&sample_item("overdue").with_due_at(now - Duration::hours(1)))
            .unwrap();
        store.create(&sample_item("no deadline")).unwrap();

        let narrow = store.list_upcoming(3).unwrap();
        assert_eq!(narrow.len(), 1);
        assert_eq!(narrow[0].text, "due soon");

        let wide = store.list_upcoming(72).unwrap();
        assert_eq!(wide.len(), 2);
        // Soonest first
        assert_eq!(wide[0].text, "due soon");
    }

    #[test]
    fn test_list_overdue_excludes_completed() {
        let store = SqliteWorkItemStore::in_memory().unwrap();
        let now = Utc::now();

        let late = sample_item("late").with_due_at(now - Duration::hours(10));
        store.create(&late).unwrap();
        let done = sample_item("done late").with_due_at(now - Duration::hours(10));
        store.create(&done).unwrap();
        store.complete(&done.id, "U1").unwrap();

        let overdue = store.list_overdue().unwrap();
        assert_eq!(overdue.len(), 1);
        assert_eq!(overdue[0].text, "late");
    }

    #[test]
    fn test_persists_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("badger.db");

        let item = sample_item("survive restart");
        {
            let store = SqliteWorkItemStore::new(&path).unwrap();
            store.create(&item).unwrap();
        }

        let reopened = SqliteWorkItemStore::new(&path).unwrap();
        let retrieved = reopened.get_by_id(&item.id).unwrap().unwrap();
        assert_eq!(retrieved.text, "survive restart");
    }
}
