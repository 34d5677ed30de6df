//! 報表彙總
//!
//! 所有報表都是對已取得記錄的直線計算，不觸及儲存層。

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use icms_core::{
    ContainerType, Currency, EngineConfig, ImportOrder, OrderStage, OrderStatus, Payment, Port, Supplier,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::due_date::{DuePayment, DueScan, Notification, Severity};
use crate::landed_cost::LandedCost;
use crate::ledger::SupplierLedger;

// ---- 付款彙總 ----

/// 已付款記錄
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub payment_id: Uuid,
    pub reference: String,
    pub order_id: Uuid,
    pub po_number: Option<String>,
    pub amount: Decimal,
    pub currency: Currency,
    pub fx_rate: Decimal,
    pub base_amount: Decimal,
    pub payment_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentsMade {
    pub records: Vec<PaymentRecord>,
    pub total_count: usize,
    /// 本位幣合計
    pub total_amount: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentsDue {
    pub records: Vec<DuePayment>,
    pub total_count: usize,
    pub total_due: Decimal,
    pub overdue_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentTotals {
    pub total_paid: Decimal,
    pub total_due: Decimal,
    pub total_overdue: Decimal,
}

/// 付款彙總報表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentsSummary {
    pub payments_made: PaymentsMade,
    pub payments_due: PaymentsDue,
    pub summary: PaymentTotals,
}

impl PaymentsSummary {
    /// 已付款依付款日期新到舊排列
    pub fn build(payments: &[Payment], orders: &HashMap<Uuid, ImportOrder>, scan: &DueScan) -> Self {
        let mut records: Vec<PaymentRecord> = payments
            .iter()
            .map(|p| PaymentRecord {
                payment_id: p.id,
                reference: p.reference.clone(),
                order_id: p.order_id,
                po_number: orders.get(&p.order_id).map(|o| o.po_number.clone()),
                amount: p.amount,
                currency: p.currency,
                fx_rate: p.fx_rate,
                base_amount: p.base_amount,
                payment_date: p.payment_date,
            })
            .collect();
        records.sort_by(|a, b| b.payment_date.cmp(&a.payment_date));

        let total_paid: Decimal = records.iter().map(|r| r.base_amount).sum();

        Self {
            payments_made: PaymentsMade {
                total_count: records.len(),
                total_amount: total_paid,
                records,
            },
            payments_due: PaymentsDue {
                records: scan.due_payments.clone(),
                total_count: scan.due_payments.len(),
                total_due: scan.total_due(),
                overdue_count: scan.overdue_count(),
            },
            summary: PaymentTotals {
                total_paid,
                total_due: scan.total_due(),
                total_overdue: scan.total_overdue(),
            },
        }
    }
}

// ---- 通知 ----

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
}

/// 通知清單與各嚴重度筆數
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationFeed {
    pub notifications: Vec<Notification>,
    pub counts: SeverityCounts,
}

impl NotificationFeed {
    pub fn from_scan(scan: &DueScan) -> Self {
        let mut counts = SeverityCounts::default();
        for notification in &scan.notifications {
            match notification.severity {
                Severity::Critical => counts.critical += 1,
                Severity::High => counts.high += 1,
                Severity::Medium => counts.medium += 1,
            }
        }

        Self {
            notifications: scan.notifications.clone(),
            counts,
        }
    }
}

// ---- 供應商彙總 ----

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplierSummaryRow {
    pub supplier_id: Uuid,
    pub supplier_code: String,
    pub supplier_name: String,
    pub base_currency: Currency,
    pub pending_pos: usize,
    pub pending_value: Decimal,
    pub shipped_pos: usize,
    pub shipped_value: Decimal,
    pub delivered_pos: usize,
    pub delivered_value: Decimal,
    pub total_pos: usize,
    pub total_value: Decimal,
    pub total_paid: Decimal,
    pub balance_due: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SupplierTotals {
    pub total_suppliers: usize,
    pub total_pending_value: Decimal,
    pub total_shipped_value: Decimal,
    pub total_delivered_value: Decimal,
    pub total_paid: Decimal,
    pub total_balance_due: Decimal,
}

/// 供應商別彙總（不含已取消訂單）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupplierWiseSummary {
    pub suppliers: Vec<SupplierSummaryRow>,
    pub totals: SupplierTotals,
}

impl SupplierWiseSummary {
    pub fn build(suppliers: &[Supplier], orders: &[ImportOrder], payments: &[Payment]) -> Self {
        let live: HashMap<Uuid, &ImportOrder> = orders
            .iter()
            .filter(|o| o.status != OrderStatus::Cancelled)
            .map(|o| (o.id, o))
            .collect();

        let rows: Vec<SupplierSummaryRow> = suppliers
            .iter()
            .map(|supplier| {
                let mut row = SupplierSummaryRow {
                    supplier_id: supplier.id,
                    supplier_code: supplier.code.clone(),
                    supplier_name: supplier.name.clone(),
                    base_currency: supplier.base_currency,
                    pending_pos: 0,
                    pending_value: Decimal::ZERO,
                    shipped_pos: 0,
                    shipped_value: Decimal::ZERO,
                    delivered_pos: 0,
                    delivered_value: Decimal::ZERO,
                    total_pos: 0,
                    total_value: Decimal::ZERO,
                    total_paid: Decimal::ZERO,
                    balance_due: Decimal::ZERO,
                };

                for order in live.values().filter(|o| o.supplier_id == supplier.id) {
                    match order.status.stage() {
                        OrderStage::Pending => {
                            row.pending_pos += 1;
                            row.pending_value += order.total_value;
                        }
                        OrderStage::Shipped => {
                            row.shipped_pos += 1;
                            row.shipped_value += order.total_value;
                        }
                        OrderStage::Delivered => {
                            row.delivered_pos += 1;
                            row.delivered_value += order.total_value;
                        }
                        OrderStage::Cancelled => continue,
                    }
                    row.total_pos += 1;
                    row.total_value += order.total_value;
                }

                row.total_paid = payments
                    .iter()
                    .filter(|p| p.supplier_id == supplier.id && live.contains_key(&p.order_id))
                    .map(|p| p.base_amount)
                    .sum();
                row.balance_due = row.total_value - row.total_paid;
                row
            })
            .collect();

        let totals = SupplierTotals {
            total_suppliers: rows.len(),
            total_pending_value: rows.iter().map(|r| r.pending_value).sum(),
            total_shipped_value: rows.iter().map(|r| r.shipped_value).sum(),
            total_delivered_value: rows.iter().map(|r| r.delivered_value).sum(),
            total_paid: rows.iter().map(|r| r.total_paid).sum(),
            total_balance_due: rows.iter().map(|r| r.balance_due).sum(),
        };

        Self { suppliers: rows, totals }
    }
}

// ---- 貨櫃別彙總 ----

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusBucket {
    pub count: usize,
    pub value: Decimal,
    /// 採購單號
    pub orders: Vec<String>,
}

impl StatusBucket {
    fn push(&mut self, order: &ImportOrder) {
        self.count += 1;
        self.value += order.total_value;
        self.orders.push(order.po_number.clone());
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContainerBuckets {
    pub pending: StatusBucket,
    pub shipped: StatusBucket,
    pub in_transit: StatusBucket,
    pub delivered: StatusBucket,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContainerTotals {
    pub total_pending: usize,
    pub total_shipped: usize,
    pub total_in_transit: usize,
    pub total_delivered: usize,
}

/// 貨櫃別彙總（In Transit 獨立成欄，不含已取消訂單）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerWiseReport {
    pub containers: BTreeMap<String, ContainerBuckets>,
    pub totals: ContainerTotals,
}

impl ContainerWiseReport {
    pub fn build(orders: &[ImportOrder]) -> Self {
        let mut containers: BTreeMap<String, ContainerBuckets> = BTreeMap::new();
        let mut totals = ContainerTotals::default();

        for order in orders.iter().filter(|o| o.status.stage() != OrderStage::Cancelled) {
            let buckets = containers.entry(order.container_type.label().to_string()).or_default();
            match (order.status, order.status.stage()) {
                (_, OrderStage::Cancelled) => {}
                (OrderStatus::InTransit, _) => {
                    buckets.in_transit.push(order);
                    totals.total_in_transit += 1;
                }
                (_, OrderStage::Pending) => {
                    buckets.pending.push(order);
                    totals.total_pending += 1;
                }
                (_, OrderStage::Shipped) => {
                    buckets.shipped.push(order);
                    totals.total_shipped += 1;
                }
                (_, OrderStage::Delivered) => {
                    buckets.delivered.push(order);
                    totals.total_delivered += 1;
                }
            }
        }

        Self { containers, totals }
    }
}

// ---- KPI ----

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtilizationBands {
    pub underutilized: usize,
    pub optimal: usize,
    pub overutilized: usize,
}

/// 儀表板 KPI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiSummary {
    pub total_orders: usize,
    /// 未交付且未取消訂單的貨值合計
    pub pipeline_value: Decimal,
    /// 平均貨櫃使用率
    pub container_utilization: Decimal,
    /// 至少有一張訂單的供應商數
    pub active_suppliers: usize,
    pub utilization_bands: UtilizationBands,
    pub orders_by_status: BTreeMap<String, usize>,
}

impl KpiSummary {
    pub fn build(orders: &[ImportOrder], config: &EngineConfig) -> Self {
        let pipeline_value = orders.iter().filter(|o| o.status.is_open()).map(|o| o.total_value).sum();

        let container_utilization = if orders.is_empty() {
            Decimal::ZERO
        } else {
            orders.iter().map(|o| o.utilization_percentage).sum::<Decimal>() / Decimal::from(orders.len())
        };

        let mut bands = UtilizationBands::default();
        for order in orders {
            let utilization = order.utilization_percentage;
            if utilization < config.underutilized_below {
                bands.underutilized += 1;
            } else if utilization > config.overutilized_above {
                bands.overutilized += 1;
            } else {
                bands.optimal += 1;
            }
        }

        let mut active: Vec<Uuid> = orders.iter().map(|o| o.supplier_id).collect();
        active.sort();
        active.dedup();

        let mut orders_by_status = BTreeMap::new();
        for order in orders {
            *orders_by_status.entry(order.status.label().to_string()).or_insert(0) += 1;
        }

        Self {
            total_orders: orders.len(),
            pipeline_value,
            container_utilization,
            active_suppliers: active.len(),
            utilization_bands: bands,
            orders_by_status,
        }
    }
}

// ---- ERP 匯出 ----

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErpOrderData {
    pub order_id: Uuid,
    pub po_number: String,
    pub status: OrderStatus,
    pub supplier_id: Uuid,
    pub supplier_code: Option<String>,
    pub supplier_name: Option<String>,
    pub port_id: Option<Uuid>,
    pub port_code: Option<String>,
    pub container_type: ContainerType,
    pub eta: Option<DateTime<Utc>>,
    pub shipping_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErpFinancialData {
    pub total_value: Decimal,
    pub currency: Currency,
    pub freight_charges: Decimal,
    pub insurance_charges: Decimal,
    pub other_charges: Decimal,
    pub duty_rate: Decimal,
    pub cif_value: Decimal,
    pub duty_amount: Decimal,
    pub total_landed_cost: Decimal,
    pub total_paid: Decimal,
    pub balance_due: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErpItemData {
    pub sku_id: Uuid,
    pub sku_code: Option<String>,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub total_value: Decimal,
    pub landed_cost: Decimal,
    pub landed_cost_per_unit: Decimal,
}

/// ERP 匯出文件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErpExport {
    pub export_timestamp: DateTime<Utc>,
    pub order_data: ErpOrderData,
    pub financial_data: ErpFinancialData,
    pub items_data: Vec<ErpItemData>,
}

impl ErpExport {
    pub fn build(
        order: &ImportOrder,
        supplier: Option<&Supplier>,
        port: Option<&Port>,
        landed: &LandedCost,
        payments: &[Payment],
        now: DateTime<Utc>,
    ) -> Self {
        let total_paid: Decimal = payments.iter().map(|p| p.base_amount).sum();

        let items_data = order
            .items
            .iter()
            .zip(&landed.items)
            .map(|(item, cost)| ErpItemData {
                sku_id: item.sku_id,
                sku_code: cost.sku_code.clone(),
                quantity: item.quantity,
                unit_price: item.unit_price,
                total_value: item.total_value,
                landed_cost: cost.total_cost,
                landed_cost_per_unit: cost.per_unit_cost,
            })
            .collect();

        Self {
            export_timestamp: now,
            order_data: ErpOrderData {
                order_id: order.id,
                po_number: order.po_number.clone(),
                status: order.status,
                supplier_id: order.supplier_id,
                supplier_code: supplier.map(|s| s.code.clone()),
                supplier_name: supplier.map(|s| s.name.clone()),
                port_id: order.port_id,
                port_code: port.map(|p| p.code.clone()),
                container_type: order.container_type,
                eta: order.eta,
                shipping_date: order.shipping_date,
                created_at: order.created_at,
            },
            financial_data: ErpFinancialData {
                total_value: order.total_value,
                currency: order.currency,
                freight_charges: order.freight_charges,
                insurance_charges: order.insurance_charges,
                other_charges: order.other_charges,
                duty_rate: order.duty_rate,
                cif_value: landed.summary.cif_value,
                duty_amount: landed.summary.duty_amount,
                total_landed_cost: landed.summary.total_landed_cost,
                total_paid,
                balance_due: order.total_value - total_paid,
            },
            items_data,
        }
    }

    pub fn to_json(&self) -> icms_core::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

// ---- 餘額核對 ----

/// 儲存餘額與帳本餘額的核對結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceReconciliation {
    pub supplier_id: Uuid,
    pub supplier_code: String,
    /// 付款時增減的即時餘額
    pub stored_balance: Decimal,
    /// 帳本推導的餘額
    pub ledger_balance: Decimal,
    /// stored - ledger
    pub difference: Decimal,
    pub in_sync: bool,
}

impl BalanceReconciliation {
    pub fn build(supplier: &Supplier, ledger: &SupplierLedger) -> Self {
        let difference = supplier.current_balance - ledger.summary.closing_balance;
        Self {
            supplier_id: supplier.id,
            supplier_code: supplier.code.clone(),
            stored_balance: supplier.current_balance,
            ledger_balance: ledger.summary.closing_balance,
            difference,
            in_sync: difference.is_zero(),
        }
    }
}
