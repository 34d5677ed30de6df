//! 應付款到期掃描與通知分級

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use icms_core::{whole_days_between, Currency, EngineConfig, ImportOrder, Payment, Supplier};
use rayon::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 通知嚴重度（排序：critical → high → medium）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
}

impl Severity {
    /// 依是否逾期與距到期天數分級，超出 medium 門檻時不發通知
    ///
    /// 只要到期時刻已過即為 critical，不論逾期是否滿一天。
    pub fn classify(is_overdue: bool, days_until_due: i64, config: &EngineConfig) -> Option<Self> {
        if is_overdue {
            Some(Severity::Critical)
        } else if days_until_due <= config.high_severity_days {
            Some(Severity::High)
        } else if days_until_due <= config.medium_severity_days {
            Some(Severity::Medium)
        } else {
            None
        }
    }
}

/// 應付款記錄
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuePayment {
    pub order_id: Uuid,
    pub po_number: String,
    pub supplier_id: Uuid,
    pub supplier_name: String,
    pub currency: Currency,
    pub total_value: Decimal,
    pub total_paid: Decimal,
    pub balance_due: Decimal,
    pub due_date: DateTime<Utc>,
    pub days_overdue: i64,
    pub days_until_due: i64,
    pub is_overdue: bool,
}

/// 付款通知
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub order_id: Uuid,
    pub po_number: String,
    pub supplier_name: String,
    pub severity: Severity,
    pub title: String,
    pub message: String,
    pub balance_due: Decimal,
    pub due_date: DateTime<Utc>,
}

/// 掃描結果
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DueScan {
    pub due_payments: Vec<DuePayment>,
    pub notifications: Vec<Notification>,
}

impl DueScan {
    pub fn overdue_count(&self) -> usize {
        self.due_payments.iter().filter(|d| d.is_overdue).count()
    }

    pub fn total_due(&self) -> Decimal {
        self.due_payments.iter().map(|d| d.balance_due).sum()
    }

    pub fn total_overdue(&self) -> Decimal {
        self.due_payments
            .iter()
            .filter(|d| d.is_overdue)
            .map(|d| d.balance_due)
            .sum()
    }
}

/// 到期掃描器
pub struct DueScanner;

impl DueScanner {
    /// 掃描所有未結訂單
    ///
    /// 已付金額以 `base_amount` 加總；餘額 ≤ 0 的訂單不列入。找不到供應商的
    /// 訂單以 0 天信用期計算。
    pub fn scan(
        orders: &[ImportOrder],
        suppliers: &HashMap<Uuid, Supplier>,
        payments: &[Payment],
        config: &EngineConfig,
        now: DateTime<Utc>,
    ) -> DueScan {
        let mut paid_by_order: HashMap<Uuid, Decimal> = HashMap::new();
        for payment in payments {
            *paid_by_order.entry(payment.order_id).or_default() += payment.base_amount;
        }

        let mut due_payments: Vec<DuePayment> = orders
            .par_iter()
            .filter(|order| order.status.is_open())
            .filter_map(|order| {
                let total_paid = paid_by_order.get(&order.id).copied().unwrap_or_default();
                Self::evaluate(order, suppliers.get(&order.supplier_id), total_paid, now)
            })
            .collect();

        // 逾期最久優先，其次最快到期
        due_payments.sort_by(|a, b| a.due_date.cmp(&b.due_date).then_with(|| a.po_number.cmp(&b.po_number)));

        let mut notifications: Vec<Notification> = due_payments
            .iter()
            .filter_map(|due| {
                Severity::classify(due.is_overdue, due.days_until_due, config).map(|severity| Self::notify(due, severity))
            })
            .collect();
        notifications.sort_by_key(|n| n.severity);

        tracing::debug!(
            "到期掃描：{} 張訂單待付，{} 則通知",
            due_payments.len(),
            notifications.len()
        );

        DueScan {
            due_payments,
            notifications,
        }
    }

    /// 計算單張訂單的應付狀態
    pub fn evaluate(
        order: &ImportOrder,
        supplier: Option<&Supplier>,
        total_paid: Decimal,
        now: DateTime<Utc>,
    ) -> Option<DuePayment> {
        let balance_due = order.total_value - total_paid;
        if balance_due <= Decimal::ZERO {
            return None;
        }

        let credit_days = supplier.map(|s| i64::from(s.credit_term_days)).unwrap_or(0);
        let due_date = order.payment_base_date() + Duration::days(credit_days);

        // 天數欄位取整後不為負；逾期與否看實際時刻
        let days_overdue = whole_days_between(due_date, now).max(0);
        let days_until_due = whole_days_between(now, due_date).max(0);
        let is_overdue = due_date < now;

        Some(DuePayment {
            order_id: order.id,
            po_number: order.po_number.clone(),
            supplier_id: order.supplier_id,
            supplier_name: supplier.map(|s| s.name.clone()).unwrap_or_default(),
            currency: order.currency,
            total_value: order.total_value,
            total_paid,
            balance_due,
            due_date,
            days_overdue,
            days_until_due,
            is_overdue,
        })
    }

    fn notify(due: &DuePayment, severity: Severity) -> Notification {
        let (title, message) = match severity {
            Severity::Critical if due.days_overdue == 0 => (
                "Payment Overdue".to_string(),
                format!(
                    "Payment of {} {} for {} ({}) was due {} and is overdue",
                    due.balance_due.round_dp(2),
                    due.currency,
                    due.po_number,
                    due.supplier_name,
                    due.due_date.format("%Y-%m-%d %H:%M UTC")
                ),
            ),
            Severity::Critical => (
                "Payment Overdue".to_string(),
                format!(
                    "Payment of {} {} for {} ({}) is {} day(s) overdue",
                    due.balance_due.round_dp(2),
                    due.currency,
                    due.po_number,
                    due.supplier_name,
                    due.days_overdue
                ),
            ),
            Severity::High | Severity::Medium if due.days_until_due == 0 => (
                "Payment Due Today".to_string(),
                format!(
                    "Payment of {} {} for {} ({}) is due today",
                    due.balance_due.round_dp(2),
                    due.currency,
                    due.po_number,
                    due.supplier_name
                ),
            ),
            Severity::High | Severity::Medium => (
                "Payment Due Soon".to_string(),
                format!(
                    "Payment of {} {} for {} ({}) is due in {} day(s)",
                    due.balance_due.round_dp(2),
                    due.currency,
                    due.po_number,
                    due.supplier_name,
                    due.days_until_due
                ),
            ),
        };

        Notification {
            order_id: due.order_id,
            po_number: due.po_number.clone(),
            supplier_name: due.supplier_name.clone(),
            severity,
            title,
            message,
            balance_due: due.balance_due,
            due_date: due.due_date,
        }
    }
}
