use crate::error::{StoreError, StoreResult};
use crate::store::{Document, DocumentStore};
use rusqlite::{Connection, OptionalExtension, params};
use serde_json::{Map, Value};
use std::path::Path;

/// SQLite-backed document store. Each document is one JSON row keyed by
/// `(collection, id)`.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(db_path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(db_path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        init(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        init(&conn)?;
        Ok(Self { conn })
    }
}

fn init(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS documents (
          collection TEXT NOT NULL,
          id TEXT NOT NULL,
          fields_json TEXT NOT NULL,
          updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now')),
          PRIMARY KEY (collection, id)
        );
        "#,
    )?;
    Ok(())
}

fn decode(collection: &str, id: String, fields_json: &str) -> StoreResult<Document> {
    match serde_json::from_str::<Map<String, Value>>(fields_json) {
        Ok(fields) => Ok(Document { id, fields }),
        Err(source) => Err(StoreError::Corrupt {
            collection: collection.to_string(),
            id,
            source,
        }),
    }
}

impl DocumentStore for SqliteStore {
    fn get_collection(&self, collection: &str, limit: Option<usize>) -> StoreResult<Vec<Document>> {
        // SQLite treats a negative LIMIT as unbounded.
        let limit = limit.map_or(-1, |n| i64::try_from(n).unwrap_or(i64::MAX));
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, fields_json
            FROM documents
            WHERE collection = ?1
            ORDER BY id
            LIMIT ?2
            "#,
        )?;

        let rows = stmt.query_map(params![collection, limit], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut docs = Vec::new();
        for r in rows {
            let (id, fields_json) = r?;
            docs.push(decode(collection, id, &fields_json)?);
        }
        Ok(docs)
    }

    fn get_document(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        let fields_json: Option<String> = self
            .conn
            .query_row(
                "SELECT fields_json FROM documents WHERE collection = ?1 AND id = ?2",
                params![collection, id],
                |row| row.get(0),
            )
            .optional()?;

        fields_json
            .map(|json| decode(collection, id.to_string(), &json))
            .transpose()
    }

    fn set_document(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
    ) -> StoreResult<()> {
        let fields_json = serde_json::to_string(&fields).map_err(|source| StoreError::Corrupt {
            collection: collection.to_string(),
            id: id.to_string(),
            source,
        })?;

        self.conn.execute(
            r#"
            INSERT INTO documents (collection, id, fields_json)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(collection, id) DO UPDATE SET
              fields_json=excluded.fields_json,
              updated_at=strftime('%Y-%m-%dT%H:%M:%fZ','now')
            "#,
            params![collection, id, fields_json],
        )?;

        Ok(())
    }

    fn delete_document(&self, collection: &str, id: &str) -> StoreResult<()> {
        self.conn.execute(
            "DELETE FROM documents WHERE collection = ?1 AND id = ?2",
            params![collection, id],
        )?;
        Ok(())
    }
}
