//! Local cart state. Nothing here touches the store.

use rust_decimal::Decimal;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

use crate::catalog::StockLevels;
use crate::domain::{round_stock, OrderLine, Product, STOCK_SCALE};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum CartError {
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),
}

/// Parse a quantity typed by a user. Accepts `,` as the decimal separator.
pub fn parse_quantity(input: &str) -> Result<Decimal, CartError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(CartError::InvalidQuantity("Quantity is required".to_string()));
    }
    let quantity = Decimal::from_str(&trimmed.replace(',', "."))
        .map_err(|_| CartError::InvalidQuantity(format!("'{trimmed}' is not a number")))?;
    if quantity < Decimal::ZERO {
        return Err(CartError::InvalidQuantity(format!(
            "Quantity must be zero or more, got {quantity}"
        )));
    }
    if round_stock(quantity) != quantity {
        return Err(CartError::InvalidQuantity(format!(
            "At most {STOCK_SCALE} decimal places, got {quantity}"
        )));
    }
    Ok(quantity)
}

#[derive(Debug, Clone, PartialEq)]
pub struct CartLine {
    pub product_id: String,
    pub name: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
}

impl CartLine {
    pub fn to_order_line(&self) -> OrderLine {
        OrderLine::new(&self.product_id, &self.name, self.quantity, self.unit_price)
    }
}

/// At most one line per product, kept in the order products were first added.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the line for `product` to `desired`, clamped to `[0, stock]` and cut to
    /// [`STOCK_SCALE`] places. A kept value of zero removes the line. Returns the quantity
    /// actually kept.
    pub fn set_quantity<S: StockLevels + ?Sized>(&mut self, product: &Product, desired: Decimal, stock: &S) -> Decimal {
        let available = stock.current_stock(&product.id);
        let clamped = round_stock(desired.min(available).max(Decimal::ZERO));
        debug!(product_id = %product.id, %desired, %available, %clamped, "Setting cart quantity");

        if clamped <= Decimal::ZERO {
            self.remove_line(&product.id);
            return Decimal::ZERO;
        }

        let line = CartLine {
            product_id: product.id.clone(),
            name: product.name.clone(),
            quantity: clamped,
            unit_price: product.unit_price,
            subtotal: clamped.saturating_mul(product.unit_price),
        };
        match self.lines.iter_mut().find(|l| l.product_id == product.id) {
            Some(existing) => *existing = line,
            None => self.lines.push(line),
        }
        clamped
    }

    pub fn remove_line(&mut self, product_id: &str) {
        self.lines.retain(|line| line.product_id != product_id);
    }

    pub fn total(&self) -> Decimal {
        self.lines
            .iter()
            .fold(Decimal::ZERO, |acc, line| acc.saturating_add(line.subtotal))
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn line(&self, product_id: &str) -> Option<&CartLine> {
        self.lines.iter().find(|line| line.product_id == product_id)
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}
