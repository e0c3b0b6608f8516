use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::Decimal;

use crate::domain::{CategoryFilter, InventoryRecord, Product, Record};
use crate::live_view::{LiveView, Projection};
use crate::store::{Document, Snapshot, INVENTORY, PRODUCTS};

/// Advisory stock lookup. Values may be stale; the checkout transaction re-reads them.
pub trait StockLevels {
    /// Missing inventory counts as zero, never as unlimited.
    fn current_stock(&self, product_id: &str) -> Decimal;
}

impl StockLevels for HashMap<String, Decimal> {
    fn current_stock(&self, product_id: &str) -> Decimal {
        self.get(product_id).copied().unwrap_or(Decimal::ZERO)
    }
}

/// Inventory row designated for a product.
#[derive(Debug, Clone, PartialEq)]
pub struct StockEntry {
    pub inventory_id: String,
    pub quantity: Decimal,
}

/// Products plus per-product stock, projected from the `products` and `inventory`
/// collections.
#[derive(Debug, Clone, Default)]
pub struct CatalogSnapshot {
    products: Vec<Product>,
    stock: HashMap<String, StockEntry>,
}

impl CatalogSnapshot {
    pub fn from_parts(products: Vec<Product>, inventory: Vec<InventoryRecord>) -> Self {
        let mut stock: HashMap<String, StockEntry> = HashMap::new();
        for record in inventory {
            let candidate = designation(&record.id, &record.product_id);
            let replace = stock.get(&record.product_id).map_or(true, |entry| {
                candidate < designation(&entry.inventory_id, &record.product_id)
            });
            if replace {
                stock.insert(
                    record.product_id,
                    StockEntry {
                        inventory_id: record.id,
                        quantity: record.stock_quantity,
                    },
                );
            }
        }
        Self { products, stock }
    }

    pub fn products(&self, filter: &CategoryFilter) -> Vec<&Product> {
        self.products.iter().filter(|p| filter.matches(p)).collect()
    }

    pub fn product(&self, product_id: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.id == product_id)
    }

    /// The single inventory row used for a product: the row keyed by the product id,
    /// otherwise (older data) the row with the smallest id.
    pub fn stock_entry(&self, product_id: &str) -> Option<&StockEntry> {
        self.stock.get(product_id)
    }
}

impl StockLevels for CatalogSnapshot {
    fn current_stock(&self, product_id: &str) -> Decimal {
        self.stock
            .get(product_id)
            .map_or(Decimal::ZERO, |entry| entry.quantity)
    }
}

impl Projection for CatalogSnapshot {
    const COLLECTIONS: &'static [&'static str] = &[PRODUCTS, INVENTORY];

    fn project(snapshots: &[Arc<Snapshot>]) -> Self {
        let products = documents(snapshots, 0)
            .iter()
            .filter_map(Product::from_document)
            .collect();
        let inventory = documents(snapshots, 1)
            .iter()
            .filter_map(InventoryRecord::from_document)
            .collect();
        Self::from_parts(products, inventory)
    }
}

/// Sort key for competing rows of one product; the smallest wins.
fn designation<'a>(inventory_id: &'a str, product_id: &str) -> (bool, &'a str) {
    (inventory_id != product_id, inventory_id)
}

fn documents(snapshots: &[Arc<Snapshot>], index: usize) -> &[Document] {
    snapshots
        .get(index)
        .map(|snapshot| snapshot.documents.as_slice())
        .unwrap_or_default()
}

/// Live catalog/inventory view.
pub type CatalogView = LiveView<CatalogSnapshot>;
