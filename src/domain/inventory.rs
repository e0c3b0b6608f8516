use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::json;

use super::record::Record;
use crate::store::document::{decimal_to_value, fields};
use crate::store::{Document, Fields, INVENTORY};

/// Decimal places kept for stock quantities (grams when the unit is kilograms).
pub const STOCK_SCALE: u32 = 3;

/// Cut a quantity down to [`STOCK_SCALE`] places. Never rounds up, so a stored stock
/// figure is at most the exact one.
pub fn round_stock(quantity: Decimal) -> Decimal {
    quantity.round_dp_with_strategy(STOCK_SCALE, RoundingStrategy::ToZero)
}

/// Whether `quantity` can be taken out of stock exactly.
pub fn is_stock_quantity(quantity: Decimal) -> bool {
    quantity > Decimal::ZERO && round_stock(quantity) == quantity
}

/// Stock for one product. Linked to the product by id only.
#[derive(Debug, Clone, PartialEq)]
pub struct InventoryRecord {
    pub id: String,
    pub product_id: String,
    pub stock_quantity: Decimal,
}

impl InventoryRecord {
    pub fn stock_fields(quantity: Decimal) -> Fields {
        fields([("stockQuantity", decimal_to_value(round_stock(quantity)))])
    }

    pub fn new_fields(product_id: &str, quantity: Decimal) -> Fields {
        let mut out = fields([("productId", json!(product_id))]);
        out.extend(Self::stock_fields(quantity));
        out
    }
}

impl Record for InventoryRecord {
    const COLLECTION: &'static str = INVENTORY;

    fn id(&self) -> &str {
        &self.id
    }

    /// Rows without a product reference cannot be attributed and are skipped.
    fn from_document(doc: &Document) -> Option<Self> {
        let product_id = match doc.field(&["productId", "productoId"])? {
            serde_json::Value::String(s) if !s.is_empty() => s.clone(),
            serde_json::Value::Number(n) => n.to_string(),
            _ => return None,
        };
        let stock_quantity = doc
            .decimal_field(&["stockQuantity", "stock"])
            .unwrap_or_default()
            .max(Decimal::ZERO);
        Some(Self {
            id: doc.id.clone(),
            product_id,
            stock_quantity,
        })
    }
}
