//! 供應商帳本示例：期初餘額、訂單借方、付款貸方與餘額核對

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use icms::calc::{CostingEngine, OrderRequest, PaymentRequest, SkuDraft, SupplierDraft};
use icms::core::{ContainerSpec, ContainerType, Currency, FixedClock, ImportOrderItem};
use rust_decimal::Decimal;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("=== 供應商帳本示例 ===\n");

    let start = Utc
        .with_ymd_and_hms(2025, 1, 6, 9, 0, 0)
        .single()
        .ok_or("invalid start date")?;
    let engine = CostingEngine::in_memory().with_clock(Arc::new(FixedClock::new(start)));

    engine.create_container(ContainerSpec::new(
        ContainerType::Twenty,
        Decimal::from(18_000),
        Decimal::from(28),
    ))?;
    let supplier = engine.create_supplier(
        SupplierDraft::new("SUP-IN", "Pune Castings", Currency::Inr).with_opening_balance(Decimal::from(1_000)),
    )?;
    let sku = engine.create_sku(SkuDraft::new("CAST-01", Decimal::from(12), Decimal::new(2, 2)))?;

    let order = engine.build_order(
        OrderRequest::new("PO-IN-001", supplier.id, ContainerType::Twenty, Currency::Inr)
            .with_item(ImportOrderItem::priced(sku.id, 100, Decimal::from(50))),
    )?;

    engine.record_payment(
        PaymentRequest::new(order.id, Decimal::from(2_000), Currency::Inr)
            .with_date(start + Duration::days(10))
            .with_reference("NEFT-1001"),
    )?;

    let ledger = engine.build_supplier_ledger(supplier.id)?;
    println!("{} ({})", ledger.supplier.name, ledger.supplier.code);
    for entry in &ledger.entries {
        println!(
            "  {} {:<10} 借 {:>8} 貸 {:>8} 餘 {:>8}",
            entry.date.date_naive(),
            entry.reference,
            entry.debit,
            entry.credit,
            entry.balance
        );
    }

    let reconciliation = engine.reconcile_supplier_balance(supplier.id)?;
    println!(
        "\n即時餘額 {}，帳本餘額 {}，差異 {}",
        reconciliation.stored_balance, reconciliation.ledger_balance, reconciliation.difference
    );

    Ok(())
}
