use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::{error, info, instrument};

use super::error::CatalogError;
use super::view::CatalogView;
use crate::domain::{round_stock, InventoryRecord, ProductDraft, ProductPatch, Record};
use crate::store::{run_transaction, StoreClient, StoreError, Transaction, TransactionBody, INVENTORY, PRODUCTS};

/// Product and inventory maintenance for administrators.
#[derive(Clone)]
pub struct CatalogAdmin {
    store: StoreClient,
    catalog: Arc<CatalogView>,
    max_attempts: u32,
}

impl CatalogAdmin {
    pub fn new(store: StoreClient, catalog: Arc<CatalogView>, max_attempts: u32) -> Self {
        Self {
            store,
            catalog,
            max_attempts,
        }
    }

    /// Create a product and its inventory row, initialized to zero stock. The row is
    /// keyed by the product id.
    #[instrument(skip(self, draft), fields(product_name = %draft.name))]
    pub async fn create_product(&self, draft: ProductDraft) -> Result<String, CatalogError> {
        validate_name(&draft.name)?;
        validate_price(draft.unit_price)?;

        let product_id = self.store.create(PRODUCTS, draft.to_fields()).await?;
        self.change_stock(product_id.clone(), &product_id, StockChange::Open)
            .await?;

        info!(product_id = %product_id, "Product created");
        Ok(product_id)
    }

    #[instrument(skip(self, patch))]
    pub async fn update_product(&self, product_id: &str, patch: ProductPatch) -> Result<(), CatalogError> {
        if let Some(name) = &patch.name {
            validate_name(name)?;
        }
        if let Some(price) = patch.unit_price {
            validate_price(price)?;
        }
        if patch.is_empty() {
            return Ok(());
        }

        self.store
            .update(PRODUCTS, product_id, patch.to_fields())
            .await
            .map_err(|e| not_found_as(e, product_id))?;
        info!("Product updated");
        Ok(())
    }

    /// Inventory rows and past orders keep their references to the deleted product.
    #[instrument(skip(self))]
    pub async fn delete_product(&self, product_id: &str) -> Result<(), CatalogError> {
        self.store
            .delete(PRODUCTS, product_id)
            .await
            .map_err(|e| not_found_as(e, product_id))?;
        info!("Product deleted");
        Ok(())
    }

    /// Restock to an absolute quantity. Creates the inventory row if the product has none.
    #[instrument(skip(self))]
    pub async fn set_stock(&self, product_id: &str, quantity: Decimal) -> Result<Decimal, CatalogError> {
        if quantity < Decimal::ZERO {
            return Err(CatalogError::ValidationError(format!(
                "Stock must be zero or more, got {quantity}"
            )));
        }
        self.change_stock(self.inventory_id(product_id), product_id, StockChange::Set(quantity))
            .await
    }

    /// Add (or, with a negative delta, remove) stock. The result may not go below zero.
    #[instrument(skip(self))]
    pub async fn adjust_stock(&self, product_id: &str, delta: Decimal) -> Result<Decimal, CatalogError> {
        self.change_stock(self.inventory_id(product_id), product_id, StockChange::Adjust(delta))
            .await
    }

    /// Older data may hold a row under another id, which only the catalog knows about.
    /// Everything else lives at the product id.
    fn inventory_id(&self, product_id: &str) -> String {
        self.catalog
            .current()
            .stock_entry(product_id)
            .map_or_else(|| product_id.to_string(), |entry| entry.inventory_id.clone())
    }

    async fn change_stock(
        &self,
        inventory_id: String,
        product_id: &str,
        change: StockChange,
    ) -> Result<Decimal, CatalogError> {
        let body = ChangeStock {
            inventory_id,
            product_id: product_id.to_string(),
            change,
        };
        match run_transaction(&self.store, self.max_attempts, &body).await {
            Ok((stock, _)) => {
                info!(stock = %stock, ?change, "Stock updated");
                Ok(stock)
            }
            Err(e) => {
                error!(error = %e, "Stock update failed");
                Err(e)
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum StockChange {
    /// Make sure the row exists; an existing row is left alone.
    Open,
    Set(Decimal),
    Adjust(Decimal),
}

struct ChangeStock {
    inventory_id: String,
    product_id: String,
    change: StockChange,
}

impl ChangeStock {
    fn not_found(&self) -> CatalogError {
        CatalogError::NotFound(self.product_id.clone())
    }
}

#[async_trait]
impl TransactionBody for ChangeStock {
    type Output = Decimal;
    type Error = CatalogError;

    async fn run(&self, tx: &mut Transaction) -> Result<Decimal, CatalogError> {
        let Some(doc) = tx.get(INVENTORY, &self.inventory_id).await? else {
            let opening = match self.change {
                StockChange::Open => Decimal::ZERO,
                StockChange::Set(quantity) => round_stock(quantity),
                StockChange::Adjust(_) => return Err(self.not_found()),
            };
            if self.inventory_id != self.product_id {
                return Err(self.not_found());
            }
            tx.insert(
                INVENTORY,
                &self.inventory_id,
                InventoryRecord::new_fields(&self.product_id, opening),
            );
            return Ok(opening);
        };

        let record = InventoryRecord::from_document(&doc)
            .filter(|record| record.product_id == self.product_id)
            .ok_or_else(|| self.not_found())?;
        let next = match self.change {
            StockChange::Open => return Ok(record.stock_quantity),
            StockChange::Set(quantity) => quantity,
            StockChange::Adjust(delta) => record.stock_quantity + delta,
        };
        if next < Decimal::ZERO {
            return Err(CatalogError::NegativeStock {
                product: self.product_id.clone(),
                available: record.stock_quantity,
            });
        }

        let next = round_stock(next);
        tx.update(INVENTORY, record.id(), InventoryRecord::stock_fields(next));
        Ok(next)
    }
}

fn validate_name(name: &str) -> Result<(), CatalogError> {
    if name.trim().is_empty() {
        return Err(CatalogError::ValidationError("Name is required".to_string()));
    }
    Ok(())
}

fn validate_price(price: Decimal) -> Result<(), CatalogError> {
    if price < Decimal::ZERO {
        return Err(CatalogError::ValidationError(format!(
            "Price must be zero or more, got {price}"
        )));
    }
    Ok(())
}

fn not_found_as(error: StoreError, product_id: &str) -> CatalogError {
    match error {
        StoreError::NotFound { .. } => CatalogError::NotFound(product_id.to_string()),
        other => other.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::StockLevels;
    use crate::domain::Category;
    use crate::live_view::LiveView;
    use crate::store::StoreActor;

    async fn admin_with_store() -> (CatalogAdmin, Arc<CatalogView>, StoreClient) {
        let (actor, store) = StoreActor::with_random_ids(32);
        tokio::spawn(actor.run());
        let catalog = Arc::new(LiveView::start(&store).await.unwrap());
        (CatalogAdmin::new(store.clone(), catalog.clone(), 3), catalog, store)
    }

    async fn admin() -> (CatalogAdmin, Arc<CatalogView>) {
        let (admin, catalog, _) = admin_with_store().await;
        (admin, catalog)
    }

    async fn rows_for(store: &StoreClient, product_id: &str) -> Vec<InventoryRecord> {
        store
            .subscribe(INVENTORY)
            .await
            .unwrap()
            .current()
            .documents
            .iter()
            .filter_map(InventoryRecord::from_document)
            .filter(|record| record.product_id == product_id)
            .collect()
    }

    #[tokio::test]
    async fn test_new_product_starts_with_zero_stock_row() {
        let (admin, catalog) = admin().await;
        let id = admin
            .create_product(ProductDraft::new("Arrachera", Category::Beef, Decimal::from(320)))
            .await
            .unwrap();

        let snapshot = catalog.wait_for(|c| c.stock_entry(&id).is_some()).await.unwrap();
        assert_eq!(snapshot.current_stock(&id), Decimal::ZERO);
        assert_eq!(snapshot.stock_entry(&id).unwrap().inventory_id, id);
        assert_eq!(snapshot.product(&id).unwrap().name, "Arrachera");
    }

    #[tokio::test]
    async fn test_rejects_invalid_drafts_before_touching_the_store() {
        let (admin, _) = admin().await;
        let blank = admin
            .create_product(ProductDraft::new("  ", Category::Pork, Decimal::ONE))
            .await;
        assert!(matches!(blank, Err(CatalogError::ValidationError(_))));

        let negative = admin
            .create_product(ProductDraft::new("Lomo", Category::Pork, Decimal::from(-5)))
            .await;
        assert!(matches!(negative, Err(CatalogError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_restock_and_adjust() {
        let (admin, catalog) = admin().await;
        let id = admin
            .create_product(ProductDraft::new("Chorizo", Category::Sausage, Decimal::from(90)))
            .await
            .unwrap();

        let stock = admin.set_stock(&id, Decimal::new(10_1234, 4)).await.unwrap();
        assert_eq!(stock, Decimal::new(10_123, 3));

        let stock = admin.adjust_stock(&id, Decimal::new(-123, 3)).await.unwrap();
        assert_eq!(stock, Decimal::from(10));

        let too_much = admin.adjust_stock(&id, Decimal::from(-11)).await;
        assert_eq!(
            too_much,
            Err(CatalogError::NegativeStock {
                product: id.clone(),
                available: Decimal::from(10),
            })
        );

        catalog
            .wait_for(|c| c.current_stock(&id) == Decimal::from(10))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_update_merges_patch() {
        let (admin, catalog) = admin().await;
        let id = admin
            .create_product(ProductDraft::new("Pierna", Category::Pork, Decimal::from(130)))
            .await
            .unwrap();

        let patch = ProductPatch {
            unit_price: Some(Decimal::from(125)),
            is_promotional: Some(true),
            ..ProductPatch::default()
        };
        admin.update_product(&id, patch).await.unwrap();

        let snapshot = catalog
            .wait_for(|c| c.product(&id).is_some_and(|p| p.is_promotional))
            .await
            .unwrap();
        let product = snapshot.product(&id).unwrap();
        assert_eq!(product.name, "Pierna");
        assert_eq!(product.unit_price, Decimal::from(125));

        let blank = ProductPatch {
            name: Some(" ".into()),
            ..ProductPatch::default()
        };
        assert!(matches!(
            admin.update_product(&id, blank).await,
            Err(CatalogError::ValidationError(_))
        ));
        assert_eq!(
            admin.update_product("missing", ProductPatch { is_promotional: Some(false), ..ProductPatch::default() }).await,
            Err(CatalogError::NotFound("missing".into()))
        );
    }

    #[tokio::test]
    async fn test_delete_keeps_inventory_row() {
        let (admin, catalog) = admin().await;
        let id = admin
            .create_product(ProductDraft::new("Mojarra", Category::Fish, Decimal::from(110)))
            .await
            .unwrap();
        admin.delete_product(&id).await.unwrap();

        let snapshot = catalog
            .wait_for(|c| c.product(&id).is_none() && c.stock_entry(&id).is_some())
            .await
            .unwrap();
        assert!(snapshot.stock_entry(&id).is_some());
        assert_eq!(
            admin.delete_product(&id).await,
            Err(CatalogError::NotFound(id.clone()))
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_restock_right_after_create_lands_on_the_one_row() {
        let (admin, catalog, store) = admin_with_store().await;

        let mut ids = Vec::new();
        for i in 0..50 {
            let id = admin
                .create_product(ProductDraft::new(format!("Corte {i}"), Category::Beef, Decimal::from(100)))
                .await
                .unwrap();
            admin.set_stock(&id, Decimal::TEN).await.unwrap();
            ids.push(id);
        }

        for id in &ids {
            let rows = rows_for(&store, id).await;
            assert_eq!(rows.len(), 1, "product {id}");
            assert_eq!(rows[0].id, *id);
            assert_eq!(rows[0].stock_quantity, Decimal::TEN);
        }
        catalog
            .wait_for(|c| ids.iter().all(|id| c.current_stock(id) == Decimal::TEN))
            .await
            .unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_product_without_row_gets_exactly_one() {
        let (admin, catalog, store) = admin_with_store().await;
        let id = store
            .create(PRODUCTS, ProductDraft::new("Suadero", Category::Beef, Decimal::from(180)).to_fields())
            .await
            .unwrap();

        assert_eq!(
            admin.adjust_stock(&id, Decimal::ONE).await,
            Err(CatalogError::NotFound(id.clone()))
        );

        let (a, b) = tokio::join!(
            admin.set_stock(&id, Decimal::from(4)),
            admin.set_stock(&id, Decimal::from(6)),
        );
        a.unwrap();
        b.unwrap();

        let rows = rows_for(&store, &id).await;
        assert_eq!(rows.len(), 1);
        assert!(rows[0].stock_quantity == Decimal::from(4) || rows[0].stock_quantity == Decimal::from(6));

        let stock = admin.adjust_stock(&id, Decimal::ONE).await.unwrap();
        assert_eq!(stock, rows[0].stock_quantity + Decimal::ONE);
        catalog.wait_for(|c| c.current_stock(&id) == stock).await.unwrap();
    }
}
