use rust_decimal::Decimal;
use tracing::{error, info, Instrument};

use butcher_pos::auth::{CredentialTable, Role};
use butcher_pos::cart::{parse_quantity, Cart};
use butcher_pos::catalog::StockLevels;
use butcher_pos::domain::{Category, PaymentMethod, ProductDraft};
use butcher_pos::{setup_tracing, ShopConfig, ShopSystem};

#[tokio::main]
async fn main() -> Result<(), String> {
    // Setup tracing once for the entire application
    setup_tracing();

    let config = ShopConfig::from_env().map_err(|e| e.to_string())?;
    info!(?config, "Starting shop");

    let system = ShopSystem::start(config).await.map_err(|e| e.to_string())?;

    let credentials = CredentialTable::new()
        .with("admin@shop.local", "admin", "u_admin", Role::Admin)
        .with("staff@shop.local", "staff", "u_staff", Role::Staff)
        .with("ana@shop.local", "ana", "u_ana", Role::Customer);
    let admin = credentials
        .sign_in("admin@shop.local", "admin")
        .map_err(|e| e.to_string())?;
    info!(role = %admin.role, "Admin signed in");

    // Stock the counter
    let span = tracing::info_span!("restock");
    let product_id = async {
        let id = system
            .admin
            .create_product(ProductDraft::new("Bistec de res", Category::Beef, Decimal::from(150)))
            .await
            .map_err(|e| e.to_string())?;
        system
            .admin
            .set_stock(&id, Decimal::from(10))
            .await
            .map_err(|e| e.to_string())?;
        Ok::<_, String>(id)
    }
    .instrument(span)
    .await?;

    let catalog = system
        .catalog
        .wait_for(|c| c.current_stock(&product_id) > Decimal::ZERO && c.product(&product_id).is_some())
        .await
        .map_err(|e| e.to_string())?;
    info!(product_id = %product_id, stock = %catalog.current_stock(&product_id), "Product stocked");

    // A customer orders 2 kg
    let customer = credentials
        .sign_in("ana@shop.local", "ana")
        .map_err(|e| e.to_string())?;
    let mut cart = Cart::new();
    if let Some(product) = catalog.product(&product_id) {
        let quantity = parse_quantity("2,0").map_err(|e| e.to_string())?;
        cart.set_quantity(product, quantity, catalog.as_ref());
    }

    let span = tracing::info_span!("checkout");
    let result = system
        .checkout
        .submit(&customer, "Ana", &mut cart)
        .instrument(span)
        .await;
    let submitted = match result {
        Ok(submitted) => submitted,
        Err(e) => {
            error!(error = %e, "Order submission failed");
            system.shutdown().await.map_err(|e| e.to_string())?;
            return Err(e.to_string());
        }
    };
    info!(
        order_id = %submitted.order_id,
        folio = %submitted.folio,
        total = %submitted.totals.total,
        "Order placed"
    );

    // Staff take payment and hand it over
    let span = tracing::info_span!("fulfillment");
    async {
        system
            .lifecycle
            .mark_paid(&submitted.order_id, PaymentMethod::Cash)
            .await
            .map_err(|e| e.to_string())?;
        system
            .lifecycle
            .mark_completed(&submitted.order_id)
            .await
            .map_err(|e| e.to_string())?;
        Ok::<_, String>(())
    }
    .instrument(span)
    .await?;

    let queues = system
        .fulfillment
        .wait_for(|q| !q.completed().is_empty())
        .await
        .map_err(|e| e.to_string())?;
    info!(
        pending = queues.pending().len(),
        paid = queues.paid().len(),
        completed = queues.completed().len(),
        "Fulfillment queues"
    );

    // Shutdown system gracefully
    system.shutdown().await.map_err(|e| e.to_string())?;

    info!("Application completed successfully");
    Ok(())
}
