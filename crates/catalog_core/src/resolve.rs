use crate::clock::{Clock, format_timestamp};
use crate::schema::{Product, ProductStatus, RawRecord};
use serde_json::{Map, Value};
use time::OffsetDateTime;
use tracing::debug;

pub const DEFAULT_NAME: &str = "Equipamento";

/// Upstream spelling of "available".
const ACTIVE_SENTINEL: &str = "active";

type Extractor<T> = fn(&RawRecord) -> Option<T>;

const NAME_CHAIN: &[Extractor<String>] = &[first_tag, first_accessory_name];
const DESCRIPTION_CHAIN: &[Extractor<String>] = &[description, notes];
const IMAGE_CHAIN: &[Extractor<String>] = &[first_accessory_image];
const DAILY_RATE_CHAIN: &[Extractor<f64>] = &[rent_price];
const MONTHLY_RATE_CHAIN: &[Extractor<f64>] = &[monthly_rate];
const STATUS_CHAIN: &[Extractor<String>] = &[status];
const SPECIFICATIONS_CHAIN: &[Extractor<Vec<String>>] = &[specifications];
const CATEGORY_CHAIN: &[Extractor<String>] = &[category];
const CREATED_AT_CHAIN: &[Extractor<String>] = &[created_at];

pub fn resolve(raw: &RawRecord, clock: &dyn Clock) -> Product {
    let now = clock.timestamp();

    let product = Product {
        id: raw.id.clone(),
        name: first_present(raw, NAME_CHAIN).unwrap_or_else(|| DEFAULT_NAME.to_string()),
        description: first_present(raw, DESCRIPTION_CHAIN).unwrap_or_default(),
        image: first_present(raw, IMAGE_CHAIN),
        daily_rate: first_present(raw, DAILY_RATE_CHAIN).unwrap_or(0.0),
        monthly_rate: first_present(raw, MONTHLY_RATE_CHAIN),
        status: normalize_status(first_present(raw, STATUS_CHAIN)),
        specifications: first_present(raw, SPECIFICATIONS_CHAIN).unwrap_or_default(),
        category: first_present(raw, CATEGORY_CHAIN).unwrap_or_default(),
        created_at: first_present(raw, CREATED_AT_CHAIN).unwrap_or_else(|| now.clone()),
        updated_at: now,
    };

    debug!(id = %product.id, name = %product.name, status = %product.status, "resolved product");
    product
}

pub fn resolve_all(records: &[RawRecord], clock: &dyn Clock) -> Vec<Product> {
    records.iter().map(|raw| resolve(raw, clock)).collect()
}

fn first_present<T>(raw: &RawRecord, chain: &[Extractor<T>]) -> Option<T> {
    chain.iter().find_map(|extract| extract(raw))
}

// "active" and the empty case both land on `available`.
fn normalize_status(value: Option<String>) -> ProductStatus {
    match value {
        Some(value) if value != ACTIVE_SENTINEL => ProductStatus::from(value),
        _ => ProductStatus::Available,
    }
}

fn first_tag(raw: &RawRecord) -> Option<String> {
    raw.get("tags")
        .and_then(Value::as_array)
        .and_then(|tags| tags.first())
        .and_then(non_empty_str)
}

fn first_accessory_name(raw: &RawRecord) -> Option<String> {
    first_accessory(raw)
        .and_then(|accessory| accessory.get("name"))
        .and_then(non_empty_str)
}

fn first_accessory_image(raw: &RawRecord) -> Option<String> {
    first_accessory(raw)
        .and_then(|accessory| accessory.get("imageUrl"))
        .and_then(non_empty_str)
}

fn description(raw: &RawRecord) -> Option<String> {
    string_field(raw, "description")
}

fn notes(raw: &RawRecord) -> Option<String> {
    string_field(raw, "notes")
}

fn rent_price(raw: &RawRecord) -> Option<f64> {
    raw.get("rentPrice").and_then(Value::as_f64)
}

fn monthly_rate(raw: &RawRecord) -> Option<f64> {
    raw.get("monthlyRate").and_then(Value::as_f64)
}

fn status(raw: &RawRecord) -> Option<String> {
    string_field(raw, "status")
}

fn specifications(raw: &RawRecord) -> Option<Vec<String>> {
    let specs: Vec<String> = raw
        .get("specifications")
        .and_then(Value::as_array)?
        .iter()
        .filter_map(Value::as_str)
        .map(str::to_string)
        .collect();
    (!specs.is_empty()).then_some(specs)
}

fn category(raw: &RawRecord) -> Option<String> {
    string_field(raw, "category")
}

fn created_at(raw: &RawRecord) -> Option<String> {
    raw.get("createdAt").and_then(coerce_timestamp)
}

fn first_accessory(raw: &RawRecord) -> Option<&Map<String, Value>> {
    raw.get("accessories")
        .and_then(Value::as_array)
        .and_then(|accessories| accessories.first())
        .and_then(Value::as_object)
}

fn string_field(raw: &RawRecord, key: &str) -> Option<String> {
    raw.get(key).and_then(non_empty_str)
}

fn non_empty_str(value: &Value) -> Option<String> {
    value
        .as_str()
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn coerce_timestamp(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Object(map) => timestamp_object(map),
        _ => None,
    }
}

// Native database timestamps arrive as {seconds, nanoseconds} (or the
// underscore-prefixed variant when exported through the admin SDK).
fn timestamp_object(map: &Map<String, Value>) -> Option<String> {
    let seconds = int_field(map, "seconds").or_else(|| int_field(map, "_seconds"))?;
    let nanos = int_field(map, "nanoseconds")
        .or_else(|| int_field(map, "_nanoseconds"))
        .unwrap_or(0);
    let total = i128::from(seconds) * 1_000_000_000 + i128::from(nanos);
    OffsetDateTime::from_unix_timestamp_nanos(total)
        .ok()
        .map(format_timestamp)
}

fn int_field(map: &Map<String, Value>, key: &str) -> Option<i64> {
    map.get(key).and_then(Value::as_i64)
}
