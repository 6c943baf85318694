use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// One source document exactly as stored upstream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord {
    pub id: String,
    pub fields: Map<String, Value>,
}

impl RawRecord {
    pub fn new(id: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// `None` means absent; a present value may still hold the wrong variant.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    pub description: String,
    pub image: Option<String>,
    pub daily_rate: f64,
    pub monthly_rate: Option<f64>,
    #[schemars(with = "String")]
    pub status: ProductStatus,
    pub specifications: Vec<String>,
    pub category: String,
    pub created_at: String, // RFC 3339 unless the source carried its own text
    pub updated_at: String, // RFC 3339, set at resolution time
}

/// `available`, or whatever other status the source reported verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ProductStatus {
    Available,
    Other(String),
}

impl ProductStatus {
    pub const AVAILABLE: &'static str = "available";

    pub fn as_str(&self) -> &str {
        match self {
            ProductStatus::Available => Self::AVAILABLE,
            ProductStatus::Other(value) => value,
        }
    }
}

impl From<String> for ProductStatus {
    fn from(value: String) -> Self {
        if value == Self::AVAILABLE {
            ProductStatus::Available
        } else {
            ProductStatus::Other(value)
        }
    }
}

impl From<ProductStatus> for String {
    fn from(value: ProductStatus) -> Self {
        match value {
            ProductStatus::Available => ProductStatus::AVAILABLE.to_string(),
            ProductStatus::Other(value) => value,
        }
    }
}

impl fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Category {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum AdminRole {
    Admin,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminRecord {
    pub email: String, // document key
    pub name: String,
    pub role: AdminRole,
    pub created_at: String, // RFC 3339
    pub source: String,     // e.g. "cli", "bootstrap-script"
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_serializes_as_plain_string() {
        assert_eq!(
            serde_json::to_value(ProductStatus::Available).unwrap(),
            json!("available")
        );
        assert_eq!(
            serde_json::to_value(ProductStatus::Other("maintenance".into())).unwrap(),
            json!("maintenance")
        );
        let parsed: ProductStatus = serde_json::from_value(json!("available")).unwrap();
        assert_eq!(parsed, ProductStatus::Available);
    }

    #[test]
    fn product_uses_camel_case_keys() {
        let product = Product {
            id: "p1".into(),
            name: "UTS 500".into(),
            description: String::new(),
            image: None,
            daily_rate: 120.0,
            monthly_rate: Some(2400.0),
            status: ProductStatus::Available,
            specifications: vec!["500 A".into()],
            category: "power-meters".into(),
            created_at: "2024-01-01T00:00:00Z".into(),
            updated_at: "2024-01-02T00:00:00Z".into(),
        };
        let value = serde_json::to_value(&product).unwrap();
        assert_eq!(value["dailyRate"], json!(120.0));
        assert_eq!(value["monthlyRate"], json!(2400.0));
        assert_eq!(value["image"], Value::Null);
        assert_eq!(value["createdAt"], json!("2024-01-01T00:00:00Z"));

        let back: Product = serde_json::from_value(value).unwrap();
        assert_eq!(back, product);
    }

    #[test]
    fn admin_role_is_lowercase() {
        let record = AdminRecord {
            email: "a@b.com".into(),
            name: "A".into(),
            role: AdminRole::Admin,
            created_at: "2024-01-01T00:00:00Z".into(),
            source: "cli".into(),
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["role"], json!("admin"));
        assert_eq!(value["createdAt"], json!("2024-01-01T00:00:00Z"));
    }
}
