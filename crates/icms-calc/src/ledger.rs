//! 供應商帳本建構

use icms_core::{Currency, ImportOrder, LedgerEntry, Payment, Supplier};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 帳本表頭的供應商資訊
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerSupplier {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub base_currency: Currency,
    #[serde(rename = "payment_terms_days")]
    pub credit_term_days: u32,
    #[serde(rename = "payment_terms_type")]
    pub credit_term_type: String,
}

/// 帳本彙總
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerSummary {
    pub opening_balance: Decimal,
    pub total_orders: usize,
    pub total_order_value: Decimal,
    pub total_payments: usize,
    pub total_paid: Decimal,
    /// 帳本推導的最終餘額
    #[serde(rename = "current_balance")]
    pub closing_balance: Decimal,
}

/// 供應商帳本
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupplierLedger {
    pub supplier: LedgerSupplier,
    pub summary: LedgerSummary,
    #[serde(rename = "ledger")]
    pub entries: Vec<LedgerEntry>,
}

/// 帳本建構器
pub struct SupplierLedgerBuilder;

impl SupplierLedgerBuilder {
    /// 建構帳本
    ///
    /// 期初分錄以供應商建立時間為日期。訂單不論狀態一律記借方，付款記貸方；
    /// 依日期穩定排序後重算累計餘額，同日期維持 期初 → 訂單 → 付款 的順序。
    pub fn build(supplier: &Supplier, orders: &[ImportOrder], payments: &[Payment]) -> SupplierLedger {
        let mut entries = Vec::with_capacity(1 + orders.len() + payments.len());

        entries.push(LedgerEntry::opening(supplier.created_at, supplier.opening_balance));
        entries.extend(
            orders
                .iter()
                .map(|order| LedgerEntry::order(order.created_at, order.id, &order.po_number, order.total_value)),
        );
        entries.extend(payments.iter().map(|payment| {
            LedgerEntry::payment(payment.payment_date, payment.id, &payment.reference, payment.ledger_amount())
        }));

        // sort_by_key 為穩定排序
        entries.sort_by_key(|entry| entry.date);
        Self::apply_running_balance(&mut entries);

        let total_order_value = orders.iter().map(|o| o.total_value).sum();
        let total_paid = payments.iter().map(|p| p.ledger_amount()).sum();
        let closing_balance = entries.last().map(|e| e.balance).unwrap_or_default();

        tracing::debug!(
            "供應商 {} 帳本：{} 筆分錄，餘額 {}",
            supplier.code,
            entries.len(),
            closing_balance
        );

        SupplierLedger {
            supplier: LedgerSupplier {
                id: supplier.id,
                code: supplier.code.clone(),
                name: supplier.name.clone(),
                base_currency: supplier.base_currency,
                credit_term_days: supplier.credit_term_days,
                credit_term_type: supplier.credit_term_type.clone(),
            },
            summary: LedgerSummary {
                opening_balance: supplier.opening_balance,
                total_orders: orders.len(),
                total_order_value,
                total_payments: payments.len(),
                total_paid,
                closing_balance,
            },
            entries,
        }
    }

    /// 以前綴和重算累計餘額
    pub fn apply_running_balance(entries: &mut [LedgerEntry]) {
        let mut running = Decimal::ZERO;
        for entry in entries {
            running += entry.net();
            entry.balance = running;
        }
    }
}
