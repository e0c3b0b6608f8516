use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;

use crate::store::document::{first_of, value_to_decimal};

/// One line of a persisted order, in canonical shape.
///
/// Stored items come in three shapes: the canonical one written by this crate,
/// `{productId?, nombre, cantidad, precio, subtotal?}` and
/// `{id?, name, qtyKg, priceKg, subtotal?}`. [`OrderLine::normalize`] is the only place
/// that knows about them.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    pub name: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
}

impl OrderLine {
    pub fn new(product_id: impl Into<String>, name: impl Into<String>, quantity: Decimal, unit_price: Decimal) -> Self {
        Self {
            product_id: Some(product_id.into()),
            name: name.into(),
            quantity,
            unit_price,
            subtotal: quantity.saturating_mul(unit_price),
        }
    }

    pub fn normalize(item: &Value) -> Self {
        let empty = serde_json::Map::new();
        let map = item.as_object().unwrap_or(&empty);

        let product_id = first_of(map, &["productId", "productoId", "id"]).and_then(|v| match v {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        });
        let name = first_of(map, &["name", "nombre"])
            .and_then(Value::as_str)
            .unwrap_or("Producto")
            .to_string();
        let quantity = first_of(map, &["quantity", "cantidad", "qtyKg"])
            .and_then(value_to_decimal)
            .unwrap_or(Decimal::ONE);
        let unit_price = first_of(map, &["unitPrice", "precio", "priceKg"])
            .and_then(value_to_decimal)
            .unwrap_or(Decimal::ZERO);
        let subtotal = first_of(map, &["subtotal"])
            .and_then(value_to_decimal)
            .or_else(|| quantity.checked_mul(unit_price))
            .unwrap_or(Decimal::ZERO);

        Self {
            product_id,
            name,
            quantity,
            unit_price,
            subtotal,
        }
    }

    /// Canonical JSON shape written to new orders.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Sum of line subtotals, saturating instead of overflowing on absurd stored amounts.
pub fn sum_subtotals<'a>(lines: impl IntoIterator<Item = &'a OrderLine>) -> Decimal {
    lines
        .into_iter()
        .fold(Decimal::ZERO, |acc, line| acc.saturating_add(line.subtotal))
}
