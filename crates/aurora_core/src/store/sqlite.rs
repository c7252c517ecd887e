use super::{AccountRecord, RecordKind, StorageBackend, StoreError, ToonRecord};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::info;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite-backed storage. A single connection is shared behind a mutex;
/// every statement is short and runs on the blocking pool.
#[derive(Debug)]
pub struct SqliteBackend {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl SqliteBackend {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        initialize_schema(&conn)?;
        info!("🗄️ Opened account database at {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
            path: Some(path.to_path_buf()),
        })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: None,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Unavailable("connection lock poisoned".to_string()))
    }
}

fn initialize_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS accounts (
           id INTEGER PRIMARY KEY,
           email TEXT NOT NULL UNIQUE
         );
         CREATE TABLE IF NOT EXISTS toons (
           id INTEGER PRIMARY KEY,
           account_id INTEGER NOT NULL,
           name TEXT NOT NULL
         );
         CREATE INDEX IF NOT EXISTS toons_by_account ON toons (account_id);",
    )?;
    Ok(())
}

fn to_sql_id(id: u64) -> Result<i64, StoreError> {
    i64::try_from(id).map_err(|_| StoreError::Unavailable(format!("id {id} does not fit a signed column")))
}

fn from_sql_id(id: i64) -> Result<u64, StoreError> {
    u64::try_from(id).map_err(|_| StoreError::NegativeId(id))
}

impl StorageBackend for SqliteBackend {
    fn max_id(&self, kind: RecordKind) -> Result<Option<u64>, StoreError> {
        let conn = self.conn()?;
        let sql = format!("SELECT MAX(id) FROM {}", kind.table());
        let max: Option<i64> = conn
            .query_row(&sql, [], |row| row.get::<_, Option<i64>>(0))
            .optional()?
            .flatten();
        max.map(from_sql_id).transpose()
    }

    fn insert_account(&self, record: &AccountRecord) -> Result<(), StoreError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO accounts (id, email) VALUES (?1, ?2)",
            params![to_sql_id(record.id)?, record.email],
        )?;
        Ok(())
    }

    fn insert_toon(&self, record: &ToonRecord) -> Result<(), StoreError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO toons (id, account_id, name) VALUES (?1, ?2, ?3)",
            params![to_sql_id(record.id)?, to_sql_id(record.account_id)?, record.name],
        )?;
        Ok(())
    }

    fn load_accounts(&self) -> Result<Vec<AccountRecord>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT id, email FROM accounts ORDER BY id")?;
        let mut rows = stmt.query([])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(AccountRecord {
                id: from_sql_id(row.get(0)?)?,
                email: row.get(1)?,
            });
        }
        Ok(records)
    }

    fn load_toons(&self) -> Result<Vec<ToonRecord>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT id, account_id, name FROM toons ORDER BY id")?;
        let mut rows = stmt.query([])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(ToonRecord {
                id: from_sql_id(row.get(0)?)?,
                account_id: from_sql_id(row.get(1)?)?,
                name: row.get(2)?,
            });
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_tables_have_no_max_id() {
        let backend = SqliteBackend::open_in_memory().unwrap();
        assert_eq!(backend.max_id(RecordKind::Account).unwrap(), None);
        assert_eq!(backend.max_id(RecordKind::Toon).unwrap(), None);
    }

    #[test]
    fn rows_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accounts.db");
        {
            let backend = SqliteBackend::open(&path).unwrap();
            backend
                .insert_account(&AccountRecord { id: 7, email: "x@y.z".into() })
                .unwrap();
            backend
                .insert_toon(&ToonRecord { id: 3, account_id: 7, name: "Hero".into() })
                .unwrap();
        }

        let backend = SqliteBackend::open(&path).unwrap();
        assert_eq!(backend.max_id(RecordKind::Account).unwrap(), Some(7));
        assert_eq!(backend.max_id(RecordKind::Toon).unwrap(), Some(3));
        assert_eq!(backend.load_toons().unwrap()[0].name, "Hero");
        assert_eq!(backend.path(), Some(path.as_path()));
    }

    #[test]
    fn duplicate_id_is_a_sqlite_error() {
        let backend = SqliteBackend::open_in_memory().unwrap();
        let record = AccountRecord { id: 1, email: "a@b.com".into() };
        backend.insert_account(&record).unwrap();
        let err = backend
            .insert_account(&AccountRecord { id: 1, email: "c@d.com".into() })
            .unwrap_err();
        assert!(matches!(err, StoreError::Sqlite(_)));
    }
}
