//! 集成測試

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use icms::calc::{
    CostingEngine, LoadingRequest, OrderRequest, PaymentRequest, PaymentUpdate, PortDraft, Severity, SkuDraft,
    SupplierDraft,
};
use icms::core::{
    ContainerSpec, ContainerType, Currency, FixedClock, ImportOrderItem, LedgerEntryType, OrderStatus,
};
use icms::store::{MemoryStore, Store, StoreSnapshot};
use proptest::prelude::*;
use rstest::rstest;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()
}

fn engine_at(now: DateTime<Utc>) -> CostingEngine {
    CostingEngine::in_memory().with_clock(Arc::new(FixedClock::new(now)))
}

fn seed_container(engine: &CostingEngine) {
    engine
        .create_container(ContainerSpec::new(ContainerType::Twenty, dec!(18000), dec!(28)))
        .unwrap();
}

#[test]
fn test_order_payment_ledger_flow() {
    let engine = engine_at(t0());
    seed_container(&engine);

    let supplier = engine
        .create_supplier(
            SupplierDraft::new("SUP-S", "Supplier S", Currency::Inr)
                .with_opening_balance(dec!(1000))
                .with_credit_terms(30, "NET"),
        )
        .unwrap();
    let sku = engine.create_sku(SkuDraft::new("SKU-S", dec!(10), dec!(0.1))).unwrap();

    let order = engine
        .build_order(
            OrderRequest::new("PO-S-1", supplier.id, ContainerType::Twenty, Currency::Inr)
                .with_item(ImportOrderItem::priced(sku.id, 100, dec!(50))),
        )
        .unwrap();
    assert_eq!(order.total_value, dec!(5000));
    assert_eq!(order.status, OrderStatus::Draft);

    // 付款前的帳本
    let ledger = engine.build_supplier_ledger(supplier.id).unwrap();
    assert_eq!(ledger.entries.len(), 2);
    assert_eq!(ledger.entries[0].entry_type, LedgerEntryType::Opening);
    assert_eq!(ledger.entries[0].debit, dec!(1000));
    assert_eq!(ledger.entries[0].balance, dec!(1000));
    assert_eq!(ledger.entries[1].debit, dec!(5000));
    assert_eq!(ledger.entries[1].balance, dec!(6000));

    let payment_date = t0() + Duration::days(1);
    let payment = engine
        .record_payment(
            PaymentRequest::new(order.id, dec!(2000), Currency::Inr)
                .with_date(payment_date)
                .with_reference("NEFT-001"),
        )
        .unwrap();
    assert_eq!(payment.fx_rate, Decimal::ONE);
    assert_eq!(payment.base_amount, dec!(2000));

    // 即時餘額只隨付款扣減
    let supplier_now = engine.get_supplier(supplier.id).unwrap();
    assert_eq!(supplier_now.current_balance, dec!(-1000));

    let ledger = engine.build_supplier_ledger(supplier.id).unwrap();
    assert_eq!(ledger.entries.len(), 3);
    assert_eq!(ledger.entries[2].entry_type, LedgerEntryType::Payment);
    assert_eq!(ledger.entries[2].credit, dec!(2000));
    assert_eq!(ledger.entries[2].date, payment_date);
    assert_eq!(ledger.entries[2].balance, dec!(4000));
    assert_eq!(ledger.summary.closing_balance, dec!(4000));

    let reconciliation = engine.reconcile_supplier_balance(supplier.id).unwrap();
    assert!(!reconciliation.in_sync);
    assert_eq!(reconciliation.difference, dec!(-5000));
}

#[test]
fn test_utilization_tie_on_both_bases() {
    let engine = engine_at(t0());
    seed_container(&engine);

    let supplier = engine
        .create_supplier(SupplierDraft::new("SUP-U", "Utilization", Currency::Usd))
        .unwrap();
    let sku = engine.create_sku(SkuDraft::new("SKU-U", dec!(126), dec!(0.196))).unwrap();

    let order = engine
        .build_order(
            OrderRequest::new("PO-U-1", supplier.id, ContainerType::Twenty, Currency::Usd)
                .with_item(ImportOrderItem::priced(sku.id, 100, dec!(1))),
        )
        .unwrap();

    assert_eq!(order.total_weight, dec!(12600));
    assert_eq!(order.total_volume, dec!(19.6));
    assert_eq!(order.utilization_percentage, dec!(70));
}

#[test]
fn test_unknown_container_type_not_found() {
    let engine = engine_at(t0());
    let supplier = engine
        .create_supplier(SupplierDraft::new("SUP-C", "No Container", Currency::Usd))
        .unwrap();

    let err = engine
        .build_order(OrderRequest::new("PO-C-1", supplier.id, ContainerType::FortyHighCube, Currency::Usd))
        .unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn test_landed_cost_through_engine() {
    let engine = engine_at(t0());
    seed_container(&engine);

    let supplier = engine
        .create_supplier(SupplierDraft::new("SUP-L", "Landed", Currency::Usd))
        .unwrap();
    let heavy = engine.create_sku(SkuDraft::new("HEAVY", dec!(30), dec!(0.1))).unwrap();
    let bulky = engine.create_sku(SkuDraft::new("BULKY", dec!(10), dec!(0.3))).unwrap();

    let order = engine
        .build_order(
            OrderRequest::new("PO-L-1", supplier.id, ContainerType::Twenty, Currency::Usd)
                .with_item(ImportOrderItem::priced(heavy.id, 10, dec!(30)))
                .with_item(ImportOrderItem::priced(bulky.id, 10, dec!(10)))
                .with_duty_rate(dec!(0.1))
                .with_charges(dec!(400), dec!(0), dec!(80)),
        )
        .unwrap();

    let landed = engine.compute_landed_cost(order.id).unwrap();

    // 貨值 400 + 運費 400 = CIF 800，關稅 80
    assert_eq!(landed.summary.duty_amount, dec!(80));
    // 運費依材積 1 : 3，其他費用依重量 3 : 1
    assert_eq!(landed.items[0].freight_allocated, dec!(100));
    assert_eq!(landed.items[1].freight_allocated, dec!(300));
    assert_eq!(landed.items[0].other_allocated, dec!(60));
    assert_eq!(landed.items[1].other_allocated, dec!(20));

    let freight: Decimal = landed.items.iter().map(|i| i.freight_allocated).sum();
    let duty: Decimal = landed.items.iter().map(|i| i.duty_allocated).sum();
    assert_eq!(freight, dec!(400));
    assert_eq!(duty, dec!(80));
    assert_eq!(landed.total_landed_cost(), dec!(960));
}

#[test]
fn test_due_scan_after_partial_payment() {
    let created = t0();
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let setup = CostingEngine::new(store.clone(), Default::default()).with_clock(Arc::new(FixedClock::new(created)));
    seed_container(&setup);

    let supplier = setup
        .create_supplier(SupplierDraft::new("SUP-D", "Due", Currency::Usd).with_credit_terms(30, "NET"))
        .unwrap();
    let sku = setup.create_sku(SkuDraft::new("SKU-D", dec!(1), dec!(0.01))).unwrap();
    let order = setup
        .build_order(
            OrderRequest::new("PO-D-1", supplier.id, ContainerType::Twenty, Currency::Usd)
                .with_item(ImportOrderItem::priced(sku.id, 10, dec!(100))),
        )
        .unwrap();
    setup
        .record_payment(PaymentRequest::new(order.id, dec!(4), Currency::Usd))
        .unwrap();

    // 到期日前 2 天
    let later = CostingEngine::new(store, Default::default())
        .with_clock(Arc::new(FixedClock::new(created + Duration::days(28))));
    let scan = later.scan_due_payments();

    assert_eq!(scan.due_payments.len(), 1);
    // 已付 4 USD × 83 = 332 INR
    assert_eq!(scan.due_payments[0].balance_due, dec!(668));
    assert_eq!(scan.due_payments[0].days_until_due, 2);
    assert_eq!(scan.notifications.len(), 1);
    assert_eq!(scan.notifications[0].severity, Severity::High);
}

#[test]
fn test_fx_snapshot_survives_rate_updates() {
    let engine = engine_at(t0());
    seed_container(&engine);

    let supplier = engine
        .create_supplier(SupplierDraft::new("SUP-F", "FX", Currency::Eur))
        .unwrap();
    let order = engine
        .build_order(OrderRequest::new("PO-F-1", supplier.id, ContainerType::Twenty, Currency::Eur))
        .unwrap();

    let payment = engine
        .record_payment(PaymentRequest::new(order.id, dec!(100), Currency::Eur))
        .unwrap();
    assert_eq!(payment.base_amount, dec!(9000));

    engine.add_fx_rate(Currency::Eur, Currency::Inr, dec!(95)).unwrap();
    let edited = engine
        .update_payment(
            payment.id,
            PaymentUpdate {
                reference: Some("SWIFT-7".to_string()),
                ..Default::default()
            },
        )
        .unwrap();

    assert_eq!(edited.fx_rate, dec!(90.0));
    assert_eq!(edited.base_amount, dec!(9000));
}

#[test]
fn test_port_and_demurrage_flow() {
    let engine = engine_at(t0());
    seed_container(&engine);

    let supplier = engine
        .create_supplier(SupplierDraft::new("SUP-P", "Port", Currency::Usd))
        .unwrap();
    let port = engine
        .create_port(PortDraft::new("INNSA", "Nhava Sheva").with_demurrage(0, dec!(75)))
        .unwrap();
    let order = engine
        .build_order(OrderRequest::new("PO-P-1", supplier.id, ContainerType::Twenty, Currency::Usd).with_port(port.id))
        .unwrap();
    engine.update_order_status(order.id, OrderStatus::Arrived).unwrap();

    let report = engine.demurrage_clock();
    assert_eq!(report.details.len(), 1);
    assert!(report.details[0].at_risk);
    assert_eq!(report.total_demurrage_exposure, Decimal::ZERO);

    let kpi = engine.kpi_summary();
    assert_eq!(kpi.total_orders, 1);
}

#[rstest]
#[case(-1, Some(Severity::Critical))]
#[case(0, Some(Severity::High))]
#[case(3, Some(Severity::High))]
#[case(4, Some(Severity::Medium))]
#[case(7, Some(Severity::Medium))]
#[case(8, None)]
fn test_severity_boundaries_through_engine(#[case] days_until_due: i64, #[case] expected: Option<Severity>) {
    let created = t0();
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let setup = CostingEngine::new(store.clone(), Default::default()).with_clock(Arc::new(FixedClock::new(created)));
    seed_container(&setup);

    let supplier = setup
        .create_supplier(SupplierDraft::new("SUP-B", "Boundary", Currency::Inr).with_credit_terms(30, "NET"))
        .unwrap();
    let sku = setup.create_sku(SkuDraft::new("SKU-B", dec!(1), dec!(0.01))).unwrap();
    setup
        .build_order(
            OrderRequest::new("PO-B-1", supplier.id, ContainerType::Twenty, Currency::Inr)
                .with_item(ImportOrderItem::priced(sku.id, 1, dec!(100))),
        )
        .unwrap();

    let now = created + Duration::days(30 - days_until_due);
    let scan = CostingEngine::new(store, Default::default())
        .with_clock(Arc::new(FixedClock::new(now)))
        .scan_due_payments();

    assert_eq!(scan.due_payments.len(), 1);
    assert_eq!(scan.notifications.first().map(|n| n.severity), expected);
}

/// 非整點時鐘下，逾期未滿一天仍為 critical
#[rstest]
#[case(1)]
#[case(12)]
#[case(20)]
#[case(23)]
fn test_sub_day_overdue_through_engine(#[case] hours_past: i64) {
    let now = Utc.with_ymd_and_hms(2025, 5, 1, 12, 0, 0).unwrap();
    let engine = engine_at(now);
    seed_container(&engine);

    let supplier = engine
        .create_supplier(SupplierDraft::new("SUP-N", "Noon", Currency::Usd).with_credit_terms(30, "NET"))
        .unwrap();
    let sku = engine.create_sku(SkuDraft::new("SKU-N", dec!(1), dec!(0.01))).unwrap();
    engine
        .build_order(
            OrderRequest::new("PO-N-1", supplier.id, ContainerType::Twenty, Currency::Usd)
                .with_item(ImportOrderItem::priced(sku.id, 1, dec!(100)))
                .with_shipping_date(now - Duration::days(30) - Duration::hours(hours_past)),
        )
        .unwrap();

    let scan = engine.scan_due_payments();

    assert_eq!(scan.due_payments.len(), 1);
    assert!(scan.due_payments[0].is_overdue);
    assert_eq!(scan.overdue_count(), 1);
    assert_eq!(scan.notifications[0].severity, Severity::Critical);
    assert_eq!(scan.notifications[0].title, "Payment Overdue");
}

#[test]
fn test_creation_paths_accept_date_only_input() {
    let engine = engine_at(t0());
    seed_container(&engine);
    let supplier = engine
        .create_supplier(SupplierDraft::new("SUP-D", "Dates", Currency::Usd).with_credit_terms(15, "NET"))
        .unwrap();

    // 前端日期欄位只送出日期
    let request: OrderRequest = serde_json::from_str(&format!(
        r#"{{"po_number":"PO-D-1","supplier_id":"{}","container_type":"20FT","currency":"USD",
            "items":[],"eta":"2025-04-10","shipping_date":"2025-03-05"}}"#,
        supplier.id
    ))
    .unwrap();
    let order = engine.build_order(request).unwrap();
    assert_eq!(order.eta, Some(Utc.with_ymd_and_hms(2025, 4, 10, 0, 0, 0).unwrap()));
    assert_eq!(order.shipping_date, Some(Utc.with_ymd_and_hms(2025, 3, 5, 0, 0, 0).unwrap()));

    let request: PaymentRequest = serde_json::from_str(&format!(
        r#"{{"import_order_id":"{}","amount":"250","currency":"USD","payment_date":"2025-10-06","reference":"TT-D1"}}"#,
        order.id
    ))
    .unwrap();
    let payment = engine.record_payment(request).unwrap();
    assert_eq!(payment.payment_date, Utc.with_ymd_and_hms(2025, 10, 6, 0, 0, 0).unwrap());

    // 無法解析時以引擎時鐘的現在時間記錄
    let request: PaymentRequest = serde_json::from_str(&format!(
        r#"{{"import_order_id":"{}","amount":"50","currency":"USD","payment_date":"06/10/2025","reference":"TT-D2"}}"#,
        order.id
    ))
    .unwrap();
    let payment = engine.record_payment(request).unwrap();
    assert_eq!(payment.payment_date, t0());
    assert_eq!(engine.get_supplier(supplier.id).unwrap().current_balance, dec!(-300));

    let request: LoadingRequest = serde_json::from_str(&format!(
        r#"{{"order_id":"{}","items":[],"loading_date":"2025-03-04"}}"#,
        order.id
    ))
    .unwrap();
    let loading = engine.record_loading(request).unwrap();
    assert_eq!(loading.loading_date, Utc.with_ymd_and_hms(2025, 3, 4, 0, 0, 0).unwrap());

    let request: LoadingRequest =
        serde_json::from_str(&format!(r#"{{"order_id":"{}","items":[],"loading_date":"soon"}}"#, order.id)).unwrap();
    assert!(request.loading_date.is_none());
}

#[test]
fn test_snapshot_import_with_degraded_dates() {
    let store = Arc::new(MemoryStore::new());
    let engine = CostingEngine::new(store.clone(), Default::default()).with_clock(Arc::new(FixedClock::new(t0())));
    seed_container(&engine);
    let supplier = engine
        .create_supplier(SupplierDraft::new("SUP-R", "Restore", Currency::Usd).with_opening_balance(dec!(500)))
        .unwrap();
    let order = engine
        .build_order(OrderRequest::new("PO-R-1", supplier.id, ContainerType::Twenty, Currency::Usd))
        .unwrap();
    engine
        .record_payment(PaymentRequest::new(order.id, dec!(100), Currency::Usd))
        .unwrap();

    // 舊資料中的日期格式不一
    let mut raw = serde_json::to_value(store.snapshot()).unwrap();
    raw["suppliers"][0]["created_at"] = serde_json::json!("2025-01-15");
    raw["orders"][0]["shipping_date"] = serde_json::json!("2025-02-01 08:00:00");
    raw["orders"][0]["eta"] = serde_json::json!("TBD");
    raw["payments"][0]["payment_date"] = serde_json::json!("2025-02-20");
    raw["payments"][0]["created_at"] = serde_json::json!("garbage");

    let before = Utc::now();
    let snapshot = StoreSnapshot::from_json(&raw.to_string()).unwrap();
    let restored = MemoryStore::from_snapshot(snapshot).unwrap();

    let supplier = restored.get_supplier(supplier.id).unwrap();
    assert_eq!(supplier.created_at, Utc.with_ymd_and_hms(2025, 1, 15, 0, 0, 0).unwrap());
    assert_eq!(supplier.current_balance, dec!(400));

    let order = restored.get_order(order.id).unwrap();
    assert_eq!(order.shipping_date, Some(Utc.with_ymd_and_hms(2025, 2, 1, 8, 0, 0).unwrap()));
    assert_eq!(order.eta, None);

    let payment = &restored.list_payments()[0];
    assert_eq!(payment.payment_date, Utc.with_ymd_and_hms(2025, 2, 20, 0, 0, 0).unwrap());
    assert!(payment.created_at >= before);
}

proptest! {
    #[test]
    fn prop_payment_delete_restores_balance(
        opening in -100_000i64..100_000,
        amounts in prop::collection::vec(1i64..50_000, 1..8),
    ) {
        let engine = engine_at(t0());
        seed_container(&engine);
        let supplier = engine
            .create_supplier(
                SupplierDraft::new("SUP-PROP", "Prop", Currency::Usd).with_opening_balance(Decimal::from(opening)),
            )
            .unwrap();
        let order = engine
            .build_order(OrderRequest::new("PO-PROP", supplier.id, ContainerType::Twenty, Currency::Usd))
            .unwrap();

        let payments: Vec<_> = amounts
            .iter()
            .map(|a| engine.record_payment(PaymentRequest::new(order.id, Decimal::from(*a), Currency::Usd)).unwrap())
            .collect();

        for payment in payments.iter().rev() {
            engine.delete_payment(payment.id).unwrap();
        }

        let supplier = engine.get_supplier(supplier.id).unwrap();
        prop_assert_eq!(supplier.current_balance, Decimal::from(opening));
    }
}
