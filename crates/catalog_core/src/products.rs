use crate::clock::Clock;
use crate::error::{MutationFailure, StoreResult};
use crate::resolve::resolve_all;
use crate::schema::{Product, RawRecord};
use crate::store::{DocumentStore, to_fields};
use tracing::{info, warn};

/// Reads raw inventory documents. A read failure ends the run.
pub fn load_inventory(
    store: &dyn DocumentStore,
    collection: &str,
    limit: Option<usize>,
) -> StoreResult<Vec<RawRecord>> {
    Ok(store
        .get_collection(collection, limit)?
        .into_iter()
        .map(RawRecord::from)
        .collect())
}

pub fn list_products(
    store: &dyn DocumentStore,
    collection: &str,
    limit: Option<usize>,
    clock: &dyn Clock,
) -> StoreResult<Vec<Product>> {
    let raw = load_inventory(store, collection, limit)?;
    Ok(resolve_all(&raw, clock))
}

#[derive(Debug, Default)]
pub struct SyncReport {
    pub written: Vec<String>,
    pub failures: Vec<MutationFailure>,
}

impl SyncReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Resolves every inventory document and writes the canonical product under
/// the same id in `target`. Individual write failures are collected.
pub fn sync_products(
    store: &dyn DocumentStore,
    source: &str,
    target: &str,
    limit: Option<usize>,
    clock: &dyn Clock,
) -> StoreResult<SyncReport> {
    let products = list_products(store, source, limit, clock)?;
    let mut report = SyncReport::default();

    for product in &products {
        let written = to_fields(target, &product.id, product)
            .and_then(|fields| store.set_document(target, &product.id, fields));
        match written {
            Ok(()) => report.written.push(product.id.clone()),
            Err(error) => {
                warn!(collection = target, id = %product.id, %error, "failed to write product");
                report.failures.push(MutationFailure {
                    id: product.id.clone(),
                    error,
                });
            }
        }
    }

    info!(
        source,
        target,
        written = report.written.len(),
        failed = report.failures.len(),
        "synced products"
    );
    Ok(report)
}
