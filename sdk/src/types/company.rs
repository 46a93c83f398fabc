//! Company-side entities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A customer company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    /// Company id.
    pub id: String,

    /// Display name.
    pub name: String,

    /// Logo URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,

    /// Owning user id.
    #[serde(rename = "ownerID", default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,

    /// Creation time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// A warehouse contracted by a company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Warehouse {
    /// Warehouse id.
    pub id: String,

    /// Display name.
    pub name: String,

    /// Street address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    /// Operating wms tenant.
    #[serde(rename = "wmsID", default, skip_serializing_if = "Option::is_none")]
    pub wms_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_company_deserialize_minimal() {
        let company: Company =
            serde_json::from_str(r#"{"id":"c1","name":"Acme"}"#).expect("company");
        assert_eq!(company.name, "Acme");
        assert!(company.owner_id.is_none());
    }

    #[test]
    fn test_warehouse_deserialize() {
        let warehouse: Warehouse = serde_json::from_str(
            r#"{"id":"wh1","name":"North","address":"1 Dock Rd","wmsID":"w1"}"#,
        )
        .expect("warehouse");
        assert_eq!(warehouse.wms_id.as_deref(), Some("w1"));
    }
}
