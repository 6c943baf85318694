use crate::error::MutationFailure;
use crate::store::{Document, DocumentStore};
use anyhow::{Result, anyhow, bail};
use serde_json::Value;
use tracing::{info, warn};

/// Accepts either an array of objects carrying an `id` key, or an object
/// mapping id to fields. The `id` key is not stored as a field.
pub fn parse_documents(value: Value) -> Result<Vec<Document>> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                let Value::Object(mut fields) = item else {
                    bail!("entry {index} is not an object");
                };
                let id = match fields.remove("id") {
                    Some(Value::String(id)) if !id.is_empty() => id,
                    Some(Value::Number(id)) => id.to_string(),
                    _ => return Err(anyhow!("entry {index} has no usable id")),
                };
                Ok(Document { id, fields })
            })
            .collect(),
        Value::Object(map) => map
            .into_iter()
            .map(|(id, item)| match item {
                Value::Object(fields) => Ok(Document { id, fields }),
                _ => Err(anyhow!("document {id} is not an object")),
            })
            .collect(),
        _ => bail!("expected a JSON array or object of documents"),
    }
}

/// Writes every document, continuing past individual failures.
pub fn import_documents(
    store: &dyn DocumentStore,
    collection: &str,
    docs: Vec<Document>,
) -> (usize, Vec<MutationFailure>) {
    let mut written = 0;
    let mut failures = Vec::new();
    for doc in docs {
        match store.set_document(collection, &doc.id, doc.fields) {
            Ok(()) => written += 1,
            Err(error) => {
                warn!(collection, id = %doc.id, %error, "failed to import document");
                failures.push(MutationFailure { id: doc.id, error });
            }
        }
    }
    info!(collection, written, failed = failures.len(), "imported documents");
    (written, failures)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    #[test]
    fn parses_array_form() {
        let docs = parse_documents(json!([
            {"id": "eq-1", "tags": ["UTS 500"]},
            {"id": 7, "status": "active"},
        ]))
        .unwrap();

        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].id, "eq-1");
        assert!(!docs[0].fields.contains_key("id"));
        assert_eq!(docs[1].id, "7");
    }

    #[test]
    fn parses_map_form() {
        let docs = parse_documents(json!({"power-meters": {"name": "Power meters"}})).unwrap();
        assert_eq!(docs[0].id, "power-meters");
        assert_eq!(docs[0].fields["name"], json!("Power meters"));
    }

    #[test]
    fn rejects_entries_without_ids() {
        assert!(parse_documents(json!([{"name": "x"}])).is_err());
        assert!(parse_documents(json!([1, 2])).is_err());
        assert!(parse_documents(json!("nope")).is_err());
    }

    #[test]
    fn import_continues_past_failures() {
        let store = MemoryStore::new();
        store.deny("categories", "b");
        let docs = parse_documents(json!({"a": {}, "b": {}, "c": {}})).unwrap();

        let (written, failures) = import_documents(&store, "categories", docs);

        assert_eq!(written, 2);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].id, "b");
    }
}
