use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use thiserror::Error;

use super::order_line::{sum_subtotals, OrderLine};
use super::record::{timestamp_from_value, timestamp_to_value, Record};
use crate::store::document::{decimal_to_value, fields};
use crate::store::{Document, Fields, ORDERS};

/// Fulfillment stage of an order. Only ever moves forward one step at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OrderStatus {
    Pending,
    Paid,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Illegal order transition: {from} -> {to}")]
pub struct TransitionError {
    pub from: OrderStatus,
    pub to: OrderStatus,
}

impl OrderStatus {
    /// Unknown or missing values are treated as pending.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_lowercase()).as_deref() {
            Some("paid" | "pagado") => OrderStatus::Paid,
            Some("completed" | "completado" | "entregado") => OrderStatus::Completed,
            _ => OrderStatus::Pending,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Completed => "completed",
        }
    }

    pub fn next(&self) -> Option<OrderStatus> {
        match self {
            OrderStatus::Pending => Some(OrderStatus::Paid),
            OrderStatus::Paid => Some(OrderStatus::Completed),
            OrderStatus::Completed => None,
        }
    }

    /// `pending -> paid -> completed`; anything else is rejected.
    pub fn advance(self, to: OrderStatus) -> Result<OrderStatus, TransitionError> {
        if self.next() == Some(to) {
            Ok(to)
        } else {
            Err(TransitionError { from: self, to })
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaymentMethod {
    Cash,
    Card,
    Mixed,
}

impl PaymentMethod {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "cash" | "efectivo" => Some(PaymentMethod::Cash),
            "card" | "tarjeta" => Some(PaymentMethod::Card),
            "mixed" | "ambos" => Some(PaymentMethod::Mixed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::Mixed => "mixed",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Display-only figures derived from an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub item_count: usize,
}

impl OrderTotals {
    pub fn compute(subtotal: Decimal, tax_rate: Decimal, item_count: usize) -> Self {
        let tax = subtotal.saturating_mul(tax_rate).round_dp(2);
        Self {
            subtotal,
            tax,
            total: subtotal.saturating_add(tax),
            item_count,
        }
    }
}

/// A persisted, submitted cart.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: String,
    pub customer_name: String,
    pub user_id: Option<String>,
    pub items: Vec<OrderLine>,
    /// Subtotal cached at submission time, if the document carries one.
    pub cached_subtotal: Option<Decimal>,
    pub status: OrderStatus,
    pub payment_method: Option<PaymentMethod>,
    pub created_at: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub stored_folio: Option<String>,
}

impl Order {
    pub fn recomputed_subtotal(&self) -> Decimal {
        sum_subtotals(&self.items)
    }

    /// The cached subtotal when present, otherwise the sum of the items.
    pub fn subtotal(&self) -> Decimal {
        self.cached_subtotal
            .unwrap_or_else(|| self.recomputed_subtotal())
    }

    pub fn totals(&self, tax_rate: Decimal) -> OrderTotals {
        OrderTotals::compute(self.subtotal(), tax_rate, self.items.len())
    }

    pub fn folio(&self) -> String {
        self.stored_folio
            .clone()
            .unwrap_or_else(|| folio_for(&self.id))
    }

    /// Canonical field map written for this order.
    pub fn to_fields(&self) -> Fields {
        let mut out = fields([
            ("customerName", json!(self.customer_name)),
            ("userId", json!(self.user_id)),
            (
                "items",
                Value::Array(self.items.iter().map(OrderLine::to_value).collect()),
            ),
            ("subtotal", decimal_to_value(self.subtotal())),
            ("status", json!(self.status.as_str())),
        ]);
        if let Some(method) = self.payment_method {
            out.insert("paymentMethod".into(), json!(method.as_str()));
        }
        for (key, at) in [
            ("createdAt", self.created_at),
            ("paidAt", self.paid_at),
            ("completedAt", self.completed_at),
        ] {
            if let Some(at) = at {
                out.insert(key.into(), timestamp_to_value(at));
            }
        }
        if let Some(folio) = &self.stored_folio {
            out.insert("folio".into(), json!(folio));
        }
        out
    }
}

/// Two-digit display code for an order id (FNV-1a). Cosmetic, not unique.
pub fn folio_for(id: &str) -> String {
    let hash = id.bytes().fold(0x811c_9dc5_u32, |acc, byte| {
        (acc ^ u32::from(byte)).wrapping_mul(0x0100_0193)
    });
    format!("{:02}", hash % 100)
}

impl Record for Order {
    const COLLECTION: &'static str = ORDERS;

    fn id(&self) -> &str {
        &self.id
    }

    fn from_document(doc: &Document) -> Option<Self> {
        let items = match doc.field(&["items"]) {
            Some(Value::Array(items)) => items.iter().map(OrderLine::normalize).collect(),
            _ => Vec::new(),
        };
        let stored_folio = doc.field(&["folio"]).and_then(|v| match v {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        });

        Some(Self {
            id: doc.id.clone(),
            customer_name: doc
                .str_field(&["customerName", "cliente"])
                .unwrap_or_default()
                .to_string(),
            user_id: doc.str_field(&["userId"]).map(str::to_string),
            items,
            cached_subtotal: doc.decimal_field(&["subtotal"]),
            status: OrderStatus::parse(doc.str_field(&["status", "estado"])),
            payment_method: doc
                .str_field(&["paymentMethod", "metodoPago"])
                .and_then(PaymentMethod::parse),
            created_at: doc.field(&["createdAt", "fecha"]).and_then(timestamp_from_value),
            paid_at: doc.field(&["paidAt", "pagadoEn"]).and_then(timestamp_from_value),
            completed_at: doc
                .field(&["completedAt", "completadoEn"])
                .and_then(timestamp_from_value),
            stored_folio,
        })
    }
}

/// Order document built from a cart at submission time.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub customer_name: String,
    pub user_id: Option<String>,
    pub lines: Vec<OrderLine>,
    pub created_at: DateTime<Utc>,
}

impl NewOrder {
    pub fn subtotal(&self) -> Decimal {
        sum_subtotals(&self.lines)
    }

    pub fn into_order(self, id: impl Into<String>) -> Order {
        let subtotal = self.subtotal();
        Order {
            id: id.into(),
            customer_name: self.customer_name,
            user_id: self.user_id,
            items: self.lines,
            cached_subtotal: Some(subtotal),
            status: OrderStatus::Pending,
            payment_method: None,
            created_at: Some(self.created_at),
            paid_at: None,
            completed_at: None,
            stored_folio: None,
        }
    }

    pub fn to_fields(&self) -> Fields {
        self.clone().into_order("").to_fields()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn legacy_order() -> Document {
        Document {
            id: "ord_abc".into(),
            fields: fields([
                ("cliente", json!("Ana")),
                ("estado", json!("cocina")),
                (
                    "items",
                    json!([
                        { "nombre": "Bistec", "cantidad": 2, "precio": 150 },
                        { "name": "Costilla", "qtyKg": 0.5, "priceKg": 120, "subtotal": 60 }
                    ]),
                ),
                ("createdAt", json!({ "seconds": 1_700_000_000_i64 })),
            ]),
            version: 3,
        }
    }

    #[test]
    fn decodes_legacy_order_and_recomputes_missing_subtotal() {
        let order = Order::from_document(&legacy_order()).unwrap();
        assert_eq!(order.customer_name, "Ana");
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.cached_subtotal, None);
        assert_eq!(order.subtotal(), Decimal::from(360));
        assert!(order.created_at.is_some());
    }

    #[test]
    fn maps_every_historical_status() {
        assert_eq!(OrderStatus::parse(Some("pendiente")), OrderStatus::Pending);
        assert_eq!(OrderStatus::parse(Some("cocina")), OrderStatus::Pending);
        assert_eq!(OrderStatus::parse(Some("pagado")), OrderStatus::Paid);
        assert_eq!(OrderStatus::parse(Some("entregado")), OrderStatus::Completed);
        assert_eq!(OrderStatus::parse(Some("completed")), OrderStatus::Completed);
        assert_eq!(OrderStatus::parse(Some("???")), OrderStatus::Pending);
        assert_eq!(OrderStatus::parse(None), OrderStatus::Pending);
    }

    #[test]
    fn canonical_status_wins_over_legacy_field() {
        let mut doc = legacy_order();
        doc.fields.insert("status".into(), json!("paid"));
        doc.fields.insert("paymentMethod".into(), json!("efectivo"));
        let order = Order::from_document(&doc).unwrap();
        assert_eq!(order.status, OrderStatus::Paid);
        assert_eq!(order.payment_method, Some(PaymentMethod::Cash));
    }

    #[test]
    fn totals_apply_tax_rate() {
        let order = Order::from_document(&legacy_order()).unwrap();
        let totals = order.totals(Decimal::new(16, 2));
        assert_eq!(totals.tax, Decimal::new(5760, 2));
        assert_eq!(totals.total, Decimal::new(41760, 2));
        assert_eq!(totals.item_count, 2);
    }

    #[test]
    fn absurd_items_saturate_instead_of_panicking() {
        let mut doc = legacy_order();
        doc.fields.insert(
            "items".into(),
            json!([
                { "name": "Huge", "qtyKg": 1e15, "priceKg": 1e15 },
                { "name": "Huge", "cantidad": 1, "precio": 1, "subtotal": 7e28 },
                { "name": "Huge", "cantidad": 1, "precio": 1, "subtotal": 7e28 }
            ]),
        );
        let order = Order::from_document(&doc).unwrap();
        assert_eq!(order.items[0].subtotal, Decimal::ZERO);
        assert_eq!(order.subtotal(), Decimal::MAX);

        let totals = order.totals(Decimal::new(16, 2));
        assert_eq!(totals.total, Decimal::MAX);
    }

    #[test]
    fn folio_prefers_stored_value_and_is_stable() {
        let mut order = Order::from_document(&legacy_order()).unwrap();
        let derived = order.folio();
        assert_eq!(derived.len(), 2);
        assert_eq!(derived, folio_for("ord_abc"));
        order.stored_folio = Some("A7".into());
        assert_eq!(order.folio(), "A7");
    }

    #[test]
    fn skipping_or_regressing_is_rejected() {
        assert_eq!(
            OrderStatus::Pending.advance(OrderStatus::Completed),
            Err(TransitionError {
                from: OrderStatus::Pending,
                to: OrderStatus::Completed
            })
        );
        assert!(OrderStatus::Completed.advance(OrderStatus::Paid).is_err());
        assert!(OrderStatus::Paid.advance(OrderStatus::Paid).is_err());
    }

    fn status() -> impl Strategy<Value = OrderStatus> {
        prop_oneof![
            Just(OrderStatus::Pending),
            Just(OrderStatus::Paid),
            Just(OrderStatus::Completed),
        ]
    }

    proptest! {
        #[test]
        fn statuses_only_move_forward(attempts in prop::collection::vec(status(), 0..20)) {
            let mut current = OrderStatus::Pending;
            let mut observed = vec![current];
            for target in attempts {
                if let Ok(next) = current.advance(target) {
                    current = next;
                    observed.push(current);
                }
            }
            prop_assert!(observed.windows(2).all(|w| w[0] < w[1]));
            prop_assert!(observed.len() <= 3);
        }

        #[test]
        fn cached_subtotal_matches_items(
            lines in prop::collection::vec((1i64..50_000, 0i64..100_000), 1..8)
        ) {
            let new_order = NewOrder {
                customer_name: "Ana".into(),
                user_id: None,
                lines: lines
                    .iter()
                    .enumerate()
                    .map(|(i, (qty, price))| {
                        OrderLine::new(format!("p{i}"), "Corte", Decimal::new(*qty, 3), Decimal::new(*price, 2))
                    })
                    .collect(),
                created_at: Utc::now(),
            };
            let doc = Document { id: "o1".into(), fields: new_order.to_fields(), version: 1 };
            let order = Order::from_document(&doc).unwrap();
            let tolerance = Decimal::new(1, 2);
            prop_assert!((order.subtotal() - order.recomputed_subtotal()).abs() <= tolerance);
            let expected: Decimal = order.items.iter().map(|l| l.quantity * l.unit_price).sum();
            prop_assert!((order.subtotal() - expected).abs() <= tolerance);
        }
    }
}
