//! 簡單訂單成本示例：建立訂單、計算到岸成本、記錄付款

use icms::calc::{CostingEngine, OrderRequest, PaymentRequest, PortDraft, SkuDraft, SupplierDraft};
use icms::core::{ContainerSpec, ContainerType, Currency, ImportOrderItem};
use rust_decimal::Decimal;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("=== 簡單訂單成本示例 ===\n");

    let engine = CostingEngine::in_memory();

    engine.create_container(ContainerSpec::new(
        ContainerType::Forty,
        Decimal::from(26_000),
        Decimal::from(67),
    ))?;
    let port = engine.create_port(PortDraft::new("INNSA", "Nhava Sheva").with_transit_days(28))?;
    let supplier = engine.create_supplier(
        SupplierDraft::new("SUP-001", "Ningbo Fasteners", Currency::Usd).with_credit_terms(45, "NET"),
    )?;

    let bolts = engine.create_sku(SkuDraft::new("BOLT-M8", Decimal::new(25, 1), Decimal::new(4, 3)))?;
    let nuts = engine.create_sku(SkuDraft::new("NUT-M8", Decimal::new(8, 1), Decimal::new(1, 3)))?;

    let order = engine.build_order(
        OrderRequest::new("PO-2025-001", supplier.id, ContainerType::Forty, Currency::Usd)
            .with_port(port.id)
            .with_item(ImportOrderItem::priced(bolts.id, 4_000, Decimal::new(35, 2)))
            .with_item(ImportOrderItem::priced(nuts.id, 6_000, Decimal::new(12, 2)))
            .with_charges(Decimal::from(1_800), Decimal::from(120), Decimal::from(250)),
    )?;

    println!("訂單 {}:", order.po_number);
    println!("  - 數量: {}", order.total_quantity);
    println!("  - 重量: {} kg", order.total_weight);
    println!("  - 材積: {} m³", order.total_volume);
    println!("  - 使用率: {}%", order.utilization_percentage.round_dp(2));
    if let Some(eta) = order.eta {
        println!("  - ETA: {}", eta.date_naive());
    }

    let landed = engine.compute_landed_cost(order.id)?;
    println!("\n到岸成本:");
    println!("  - CIF: {}", landed.summary.cif_value);
    println!("  - 關稅: {}", landed.summary.duty_amount);
    println!("  - 總計: {}", landed.total_landed_cost());
    for item in &landed.items {
        println!(
            "  - {}: 每單位 {}",
            item.sku_code.as_deref().unwrap_or("?"),
            item.per_unit_cost.round_dp(4)
        );
    }

    let payment = engine.record_payment(
        PaymentRequest::new(order.id, Decimal::from(1_000), Currency::Usd).with_reference("TT-0001"),
    )?;
    println!(
        "\n付款 {} {} → 本位幣 {}（匯率 {}）",
        payment.amount, payment.currency, payment.base_amount, payment.fx_rate
    );

    let scan = engine.scan_due_payments();
    println!("\n待付款: {} 筆，合計 {}", scan.due_payments.len(), scan.total_due());

    Ok(())
}
