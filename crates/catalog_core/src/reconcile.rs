use crate::error::{MutationFailure, StoreResult};
use crate::schema::Category;
use crate::store::DocumentStore;
use std::collections::BTreeSet;
use tracing::{info, warn};

/// Category ids that are allowed to exist.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowList(BTreeSet<String>);

impl AllowList {
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(ids.into_iter().map(Into::into).collect())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.0.contains(id)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcilePlan {
    pub keep: BTreeSet<String>,
    pub remove: BTreeSet<String>,
}

impl ReconcilePlan {
    pub fn is_noop(&self) -> bool {
        self.remove.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct ReconcileReport {
    pub deleted: Vec<String>,
    pub failures: Vec<MutationFailure>,
}

impl ReconcileReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Splits the live ids into those to keep and those to remove. Allowed ids
/// that are not live are ignored; nothing is ever created.
pub fn reconcile(current: &[Category], allowed: &AllowList) -> ReconcilePlan {
    let mut plan = ReconcilePlan::default();
    for category in current {
        if allowed.contains(&category.id) {
            plan.keep.insert(category.id.clone());
        } else {
            plan.remove.insert(category.id.clone());
        }
    }
    plan
}

pub fn load_categories(store: &dyn DocumentStore, collection: &str) -> StoreResult<Vec<Category>> {
    let docs = store.get_collection(collection, None)?;
    Ok(docs
        .into_iter()
        .map(|doc| Category {
            name: doc
                .fields
                .get("name")
                .and_then(|value| value.as_str())
                .unwrap_or_default()
                .to_string(),
            id: doc.id,
        })
        .collect())
}

pub fn apply_plan(
    store: &dyn DocumentStore,
    collection: &str,
    plan: &ReconcilePlan,
) -> ReconcileReport {
    let mut report = ReconcileReport::default();
    for id in &plan.remove {
        match store.delete_document(collection, id) {
            Ok(()) => {
                info!(collection, id = %id, "deleted category");
                report.deleted.push(id.clone());
            }
            Err(error) => {
                warn!(collection, id = %id, %error, "failed to delete category");
                report.failures.push(MutationFailure {
                    id: id.clone(),
                    error,
                });
            }
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::store::MemoryStore;
    use serde_json::{Map, Value, json};

    fn categories(ids: &[&str]) -> Vec<Category> {
        ids.iter()
            .map(|id| Category {
                id: id.to_string(),
                name: id.to_uppercase(),
            })
            .collect()
    }

    fn ids(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    fn seed(store: &MemoryStore, ids: &[&str]) {
        for id in ids {
            let mut fields = Map::new();
            fields.insert("name".into(), Value::String(id.to_string()));
            store.set_document("categories", id, fields).unwrap();
        }
    }

    #[test]
    fn removes_everything_outside_the_allow_list() {
        let allowed = AllowList::new(["power-meters", "ct-pt-analyzer"]);
        let current = categories(&["power-meters", "giga-antiga", "ct-pt-analyzer"]);

        let plan = reconcile(&current, &allowed);

        assert_eq!(plan.remove, ids(&["giga-antiga"]));
        assert_eq!(plan.keep, ids(&["power-meters", "ct-pt-analyzer"]));
    }

    #[test]
    fn second_pass_is_a_noop() {
        let allowed = AllowList::new(["a", "b", "z"]);
        let current = categories(&["a", "b", "c", "d"]);

        let first = reconcile(&current, &allowed);
        let survivors: Vec<Category> = current
            .into_iter()
            .filter(|category| !first.remove.contains(&category.id))
            .collect();
        let second = reconcile(&survivors, &allowed);

        assert!(second.is_noop());
        assert_eq!(second.keep, first.keep);
    }

    #[test]
    fn never_grows_the_live_set() {
        let allowed = AllowList::new(["a", "b", "c"]);
        let current = categories(&["b", "x"]);

        let plan = reconcile(&current, &allowed);

        assert_eq!(plan.keep, ids(&["b"]));
        assert_eq!(plan.remove, ids(&["x"]));
        let live = ids(&["b", "x"]);
        assert!(plan.keep.is_subset(&live));
        assert!(plan.remove.is_subset(&live));
    }

    #[test]
    fn empty_allow_list_removes_all() {
        let plan = reconcile(&categories(&["a", "b"]), &AllowList::default());
        assert!(plan.keep.is_empty());
        assert_eq!(plan.remove, ids(&["a", "b"]));
    }

    #[test]
    fn apply_plan_deletes_only_removed_ids() {
        let store = MemoryStore::new();
        seed(&store, &["power-meters", "giga-antiga", "ct-pt-analyzer"]);
        let allowed = AllowList::new(["power-meters", "ct-pt-analyzer"]);

        let current = load_categories(&store, "categories").unwrap();
        let plan = reconcile(&current, &allowed);
        let report = apply_plan(&store, "categories", &plan);

        assert!(report.is_clean());
        assert_eq!(report.deleted, vec!["giga-antiga"]);
        let remaining: Vec<String> = load_categories(&store, "categories")
            .unwrap()
            .into_iter()
            .map(|category| category.id)
            .collect();
        assert_eq!(remaining, vec!["ct-pt-analyzer", "power-meters"]);
    }

    #[test]
    fn one_failed_deletion_does_not_stop_the_others() {
        let store = MemoryStore::new();
        seed(&store, &["keep", "old-1", "old-2", "old-3"]);
        store.deny("categories", "old-2");

        let current = load_categories(&store, "categories").unwrap();
        let plan = reconcile(&current, &AllowList::new(["keep"]));
        let report = apply_plan(&store, "categories", &plan);

        assert_eq!(report.deleted, vec!["old-1", "old-3"]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].id, "old-2");
        assert!(matches!(
            report.failures[0].error,
            StoreError::PermissionDenied { .. }
        ));
        assert_eq!(store.len("categories"), 2);
    }

    #[test]
    fn load_categories_defaults_missing_names() {
        let store = MemoryStore::new();
        let mut fields = Map::new();
        fields.insert("label".into(), json!("no name key"));
        store.set_document("categories", "bare", fields).unwrap();

        let loaded = load_categories(&store, "categories").unwrap();
        assert_eq!(
            loaded,
            vec![Category {
                id: "bare".into(),
                name: String::new(),
            }]
        );
    }
}
