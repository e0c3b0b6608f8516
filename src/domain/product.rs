use std::fmt;

use rust_decimal::Decimal;
use serde_json::json;

use super::record::Record;
use crate::store::document::{decimal_to_value, fields};
use crate::store::{Document, Fields, PRODUCTS};

/// Product family, used for filtering the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Category {
    Poultry,
    Beef,
    Pork,
    Fish,
    Sausage,
    Other(String),
}

impl Category {
    /// Accepts the English tags and the Spanish ones found in stored data.
    pub fn parse(tag: &str) -> Self {
        match tag.trim().to_lowercase().as_str() {
            "poultry" | "pollo" => Category::Poultry,
            "beef" | "res" => Category::Beef,
            "pork" | "cerdo" => Category::Pork,
            "fish" | "pescado" => Category::Fish,
            "sausage" | "embutido" => Category::Sausage,
            other => Category::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Category::Poultry => "poultry",
            Category::Beef => "beef",
            Category::Pork => "pork",
            Category::Fish => "fish",
            Category::Sausage => "sausage",
            Category::Other(tag) => tag,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Catalog filter. `"promos"` and the empty tag both mean "everything".
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(Category),
}

impl CategoryFilter {
    pub fn parse(tag: &str) -> Self {
        match tag.trim().to_lowercase().as_str() {
            "" | "promos" | "all" => CategoryFilter::All,
            other => CategoryFilter::Only(Category::parse(other)),
        }
    }

    pub fn matches(&self, product: &Product) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(category) => &product.category == category,
        }
    }
}

/// A sellable item.
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub category: Category,
    /// Price per kilogram or per unit.
    pub unit_price: Decimal,
    pub is_promotional: bool,
}

/// Payload for creating a new product.
#[derive(Debug, Clone)]
pub struct ProductDraft {
    pub name: String,
    pub category: Category,
    pub unit_price: Decimal,
    pub is_promotional: bool,
}

/// Payload for editing an existing product.
#[derive(Debug, Clone, Default)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub category: Option<Category>,
    pub unit_price: Option<Decimal>,
    pub is_promotional: Option<bool>,
}

impl ProductDraft {
    pub fn new(name: impl Into<String>, category: Category, unit_price: Decimal) -> Self {
        Self {
            name: name.into(),
            category,
            unit_price,
            is_promotional: false,
        }
    }

    pub fn to_fields(&self) -> Fields {
        fields([
            ("name", json!(self.name.trim())),
            ("category", json!(self.category.as_str())),
            ("unitPrice", decimal_to_value(self.unit_price)),
            ("isPromotional", json!(self.is_promotional)),
        ])
    }
}

impl ProductPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.category.is_none()
            && self.unit_price.is_none()
            && self.is_promotional.is_none()
    }

    pub fn to_fields(&self) -> Fields {
        let mut out = Fields::new();
        if let Some(name) = &self.name {
            out.insert("name".into(), json!(name.trim()));
        }
        if let Some(category) = &self.category {
            out.insert("category".into(), json!(category.as_str()));
        }
        if let Some(price) = self.unit_price {
            out.insert("unitPrice".into(), decimal_to_value(price));
        }
        if let Some(promo) = self.is_promotional {
            out.insert("isPromotional".into(), json!(promo));
        }
        out
    }
}

impl Record for Product {
    const COLLECTION: &'static str = PRODUCTS;

    fn id(&self) -> &str {
        &self.id
    }

    fn from_document(doc: &Document) -> Option<Self> {
        Some(Self {
            id: doc.id.clone(),
            name: doc
                .str_field(&["name", "nombre"])
                .unwrap_or("Producto")
                .to_string(),
            category: Category::parse(doc.str_field(&["category", "categoria"]).unwrap_or("")),
            unit_price: doc
                .decimal_field(&["unitPrice", "precio"])
                .unwrap_or_default()
                .max(Decimal::ZERO),
            is_promotional: doc.bool_field(&["isPromotional", "promo"]).unwrap_or(false),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_legacy_product_fields() {
        let doc = Document {
            id: "p1".into(),
            fields: fields([
                ("nombre", json!("Pechuga")),
                ("categoria", json!("pollo")),
                ("precio", json!(129.5)),
                ("promo", json!(true)),
            ]),
            version: 1,
        };
        let product = Product::from_document(&doc).unwrap();
        assert_eq!(product.name, "Pechuga");
        assert_eq!(product.category, Category::Poultry);
        assert_eq!(product.unit_price, Decimal::new(1295, 1));
        assert!(product.is_promotional);
    }

    #[test]
    fn promos_filter_means_everything() {
        assert_eq!(CategoryFilter::parse("promos"), CategoryFilter::All);
        assert_eq!(CategoryFilter::parse(""), CategoryFilter::All);
        assert_eq!(
            CategoryFilter::parse("res"),
            CategoryFilter::Only(Category::Beef)
        );
    }
}
