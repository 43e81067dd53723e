//! MDM inventory rows and the catalog records derived from them

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::BridgeError;

/// A per-(branch, source, SKU) inventory fact as held by the MDM.
///
/// Rows coming off the wire are normalized by the repository before they are
/// handed out, so every numeric field is present and `changed` is a real
/// boolean.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MdmRow {
    pub sku: String,
    pub jde_code: String,
    pub family_code: String,
    pub product_type: String,
    pub source_code: String,
    pub branch: u32,
    pub qty_stock: i64,
    pub tariff: f64,
    pub qty_received: i64,
    pub avg_sales: f64,
    pub last_updated_at: Option<DateTime<Utc>>,
    /// Parsed for display only; never used to order competing rows.
    pub last_synced_at: Option<DateTime<Utc>>,
    pub changed: bool,
}

impl MdmRow {
    /// Convenience constructor for the fields that drive a push.
    #[must_use]
    pub fn new(sku: impl Into<String>, source_code: impl Into<String>, qty_stock: i64) -> Self {
        Self { sku: sku.into(), source_code: source_code.into(), qty_stock, ..Self::default() }
    }

    /// Grid identity of this row.
    #[must_use]
    pub fn key(&self) -> RowKey {
        RowKey { source_code: self.source_code.clone(), sku: self.sku.clone() }
    }
}

/// Grid row identity, printed as `{sourceCode}-{sku}`.
///
/// Source codes never contain a dash while SKUs may, so parsing splits at
/// the first one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowKey {
    pub source_code: String,
    pub sku: String,
}

impl RowKey {
    #[must_use]
    pub fn new(source_code: impl Into<String>, sku: impl Into<String>) -> Self {
        Self { source_code: source_code.into(), sku: sku.into() }
    }
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.source_code, self.sku)
    }
}

impl FromStr for RowKey {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().split_once('-') {
            Some((source, sku)) if !source.is_empty() && !sku.is_empty() => {
                Ok(Self::new(source, sku))
            }
            _ => Err(BridgeError::Validation(format!("malformed row key: {s}"))),
        }
    }
}

/// Wire record accepted by the catalog's `inventory/source-items` endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceItem {
    pub sku: String,
    /// Catalog-side source code, never empty.
    pub source_code: String,
    pub quantity: i64,
    pub status: u8,
}

impl SourceItem {
    /// Builds an item from an MDM stock level, clamping negatives to zero and
    /// deriving the in-stock status from the clamped quantity.
    #[must_use]
    pub fn from_stock(
        sku: impl Into<String>,
        catalog_source: impl Into<String>,
        qty_stock: i64,
    ) -> Self {
        let quantity = qty_stock.max(0);
        Self {
            sku: sku.into(),
            source_code: catalog_source.into(),
            quantity,
            status: u8::from(quantity > 0),
        }
    }
}
