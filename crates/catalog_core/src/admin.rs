use crate::clock::Clock;
use crate::error::StoreResult;
use crate::schema::{AdminRecord, AdminRole};
use crate::store::{DocumentStore, from_fields, to_fields};
use serde_json::Value;
use tracing::{info, warn};

/// Administrator records keyed by email.
pub struct AdminDirectory<'a> {
    store: &'a dyn DocumentStore,
    collection: &'a str,
}

impl<'a> AdminDirectory<'a> {
    pub fn new(store: &'a dyn DocumentStore, collection: &'a str) -> Self {
        Self { store, collection }
    }

    /// Writes the record for `email`. An existing document keeps its original
    /// `createdAt`, even if the rest of it no longer decodes; everything else
    /// is overwritten.
    pub fn upsert(
        &self,
        email: &str,
        name: &str,
        source: &str,
        clock: &dyn Clock,
    ) -> StoreResult<AdminRecord> {
        let created_at = self
            .store
            .get_document(self.collection, email)?
            .and_then(|doc| {
                doc.fields
                    .get("createdAt")
                    .and_then(Value::as_str)
                    .filter(|value| !value.is_empty())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| clock.timestamp());

        let record = AdminRecord {
            email: email.to_string(),
            name: name.to_string(),
            role: AdminRole::Admin,
            created_at,
            source: source.to_string(),
        };

        let fields = to_fields(self.collection, email, &record)?;
        self.store.set_document(self.collection, email, fields)?;
        info!(email, source, "upserted admin");
        Ok(record)
    }

    pub fn get(&self, email: &str) -> StoreResult<Option<AdminRecord>> {
        self.store
            .get_document(self.collection, email)?
            .map(|doc| from_fields(self.collection, &doc))
            .transpose()
    }

    /// All admins, in whatever order the store returns them. Documents that
    /// do not parse as an admin record, or whose email differs from their
    /// key, are skipped.
    pub fn list(&self) -> StoreResult<Vec<AdminRecord>> {
        let docs = self.store.get_collection(self.collection, None)?;
        let mut admins = Vec::with_capacity(docs.len());
        for doc in &docs {
            match from_fields::<AdminRecord>(self.collection, doc) {
                Ok(record) if record.email == doc.id => admins.push(record),
                Ok(record) => warn!(
                    id = %doc.id,
                    email = %record.email,
                    "skipping admin record keyed under another email"
                ),
                Err(error) => warn!(id = %doc.id, %error, "skipping malformed admin record"),
            }
        }
        Ok(admins)
    }
}
