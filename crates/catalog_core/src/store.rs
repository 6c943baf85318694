use crate::error::{StoreError, StoreResult};
use crate::schema::RawRecord;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Map<String, Value>,
}

impl From<Document> for RawRecord {
    fn from(doc: Document) -> Self {
        RawRecord::new(doc.id, doc.fields)
    }
}

pub trait DocumentStore {
    /// Documents ordered by id, at most `limit` of them when given.
    fn get_collection(&self, collection: &str, limit: Option<usize>) -> StoreResult<Vec<Document>>;

    fn get_document(&self, collection: &str, id: &str) -> StoreResult<Option<Document>>;

    /// Creates or fully replaces the document.
    fn set_document(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
    ) -> StoreResult<()>;

    /// Deleting a document that does not exist succeeds.
    fn delete_document(&self, collection: &str, id: &str) -> StoreResult<()>;
}

/// Serializes a typed value into document fields.
pub fn to_fields<T: Serialize>(
    collection: &str,
    id: &str,
    value: &T,
) -> StoreResult<Map<String, Value>> {
    let corrupt = |source| StoreError::Corrupt {
        collection: collection.to_string(),
        id: id.to_string(),
        source,
    };
    match serde_json::to_value(value).map_err(corrupt)? {
        Value::Object(fields) => Ok(fields),
        _ => Err(corrupt(serde::ser::Error::custom(
            "document must serialize to an object",
        ))),
    }
}

pub fn from_fields<T: DeserializeOwned>(collection: &str, doc: &Document) -> StoreResult<T> {
    serde_json::from_value(Value::Object(doc.fields.clone())).map_err(|source| {
        StoreError::Corrupt {
            collection: collection.to_string(),
            id: doc.id.clone(),
            source,
        }
    })
}

type Collections = BTreeMap<String, BTreeMap<String, Map<String, Value>>>;

/// In-process store. Mutations on documents marked with [`MemoryStore::deny`]
/// fail with [`StoreError::PermissionDenied`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RefCell<Collections>,
    denied: RefCell<BTreeSet<(String, String)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deny(&self, collection: &str, id: &str) {
        self.denied
            .borrow_mut()
            .insert((collection.to_string(), id.to_string()));
    }

    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .borrow()
            .get(collection)
            .map_or(0, BTreeMap::len)
    }

    fn check_write(&self, collection: &str, id: &str) -> StoreResult<()> {
        let key = (collection.to_string(), id.to_string());
        if self.denied.borrow().contains(&key) {
            return Err(StoreError::PermissionDenied {
                collection: key.0,
                id: key.1,
            });
        }
        Ok(())
    }
}

impl DocumentStore for MemoryStore {
    fn get_collection(&self, collection: &str, limit: Option<usize>) -> StoreResult<Vec<Document>> {
        let collections = self.collections.borrow();
        let Some(docs) = collections.get(collection) else {
            return Ok(Vec::new());
        };
        Ok(docs
            .iter()
            .take(limit.unwrap_or(usize::MAX))
            .map(|(id, fields)| Document {
                id: id.clone(),
                fields: fields.clone(),
            })
            .collect())
    }

    fn get_document(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        Ok(self
            .collections
            .borrow()
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|fields| Document {
                id: id.to_string(),
                fields: fields.clone(),
            }))
    }

    fn set_document(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
    ) -> StoreResult<()> {
        self.check_write(collection, id)?;
        self.collections
            .borrow_mut()
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), fields);
        Ok(())
    }

    fn delete_document(&self, collection: &str, id: &str) -> StoreResult<()> {
        self.check_write(collection, id)?;
        if let Some(docs) = self.collections.borrow_mut().get_mut(collection) {
            docs.remove(id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn collection_reads_are_ordered_and_limited() {
        let store = MemoryStore::new();
        for id in ["c", "a", "b"] {
            store
                .set_document("inventory", id, fields(json!({"n": id})))
                .unwrap();
        }

        let all: Vec<String> = store
            .get_collection("inventory", None)
            .unwrap()
            .into_iter()
            .map(|doc| doc.id)
            .collect();
        assert_eq!(all, vec!["a", "b", "c"]);
        assert_eq!(store.get_collection("inventory", Some(2)).unwrap().len(), 2);
        assert!(store.get_collection("missing", None).unwrap().is_empty());
    }

    #[test]
    fn set_overwrites_whole_document() {
        let store = MemoryStore::new();
        store
            .set_document("c", "1", fields(json!({"a": 1, "b": 2})))
            .unwrap();
        store.set_document("c", "1", fields(json!({"a": 3}))).unwrap();

        let doc = store.get_document("c", "1").unwrap().unwrap();
        assert_eq!(Value::Object(doc.fields), json!({"a": 3}));
    }

    #[test]
    fn denied_mutations_fail_without_touching_data() {
        let store = MemoryStore::new();
        store.set_document("c", "1", fields(json!({}))).unwrap();
        store.deny("c", "1");

        assert!(matches!(
            store.delete_document("c", "1"),
            Err(StoreError::PermissionDenied { .. })
        ));
        assert_eq!(store.len("c"), 1);
        assert!(store.delete_document("c", "missing").is_ok());
    }

    #[test]
    fn to_fields_rejects_non_objects() {
        assert!(matches!(
            to_fields("c", "1", &vec![1, 2]),
            Err(StoreError::Corrupt { .. })
        ));
    }
}
