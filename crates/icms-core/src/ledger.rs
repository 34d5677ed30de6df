//! 供應商帳本模型

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 帳本分錄類型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerEntryType {
    /// 期初餘額
    Opening,
    /// 訂單（借方）
    Order,
    /// 付款（貸方）
    Payment,
}

/// 帳本分錄
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub date: DateTime<Utc>,

    #[serde(rename = "type")]
    pub entry_type: LedgerEntryType,

    /// 參考號（採購單號或付款參考號）
    pub reference: String,

    pub description: String,

    /// 來源單據 ID（期初分錄為 None）
    pub source_id: Option<Uuid>,

    pub debit: Decimal,

    pub credit: Decimal,

    /// 累計餘額（排序後重新計算）
    pub balance: Decimal,
}

impl LedgerEntry {
    /// 期初分錄：正數記借方，負數記貸方
    pub fn opening(date: DateTime<Utc>, opening_balance: Decimal) -> Self {
        let (debit, credit) = if opening_balance >= Decimal::ZERO {
            (opening_balance, Decimal::ZERO)
        } else {
            (Decimal::ZERO, -opening_balance)
        };

        Self {
            date,
            entry_type: LedgerEntryType::Opening,
            reference: "OPENING".to_string(),
            description: "Opening balance".to_string(),
            source_id: None,
            debit,
            credit,
            balance: Decimal::ZERO,
        }
    }

    /// 訂單分錄（借方）
    pub fn order(date: DateTime<Utc>, order_id: Uuid, po_number: &str, amount: Decimal) -> Self {
        Self {
            date,
            entry_type: LedgerEntryType::Order,
            reference: po_number.to_string(),
            description: format!("Import order {}", po_number),
            source_id: Some(order_id),
            debit: amount,
            credit: Decimal::ZERO,
            balance: Decimal::ZERO,
        }
    }

    /// 付款分錄（貸方）
    pub fn payment(date: DateTime<Utc>, payment_id: Uuid, reference: &str, amount: Decimal) -> Self {
        Self {
            date,
            entry_type: LedgerEntryType::Payment,
            reference: reference.to_string(),
            description: format!("Payment {}", reference),
            source_id: Some(payment_id),
            debit: Decimal::ZERO,
            credit: amount,
            balance: Decimal::ZERO,
        }
    }

    /// 淨額（借方 - 貸方）
    pub fn net(&self) -> Decimal {
        self.debit - self.credit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opening_sign() {
        let now = Utc::now();

        let positive = LedgerEntry::opening(now, Decimal::from(1000));
        assert_eq!(positive.debit, Decimal::from(1000));
        assert_eq!(positive.credit, Decimal::ZERO);

        let negative = LedgerEntry::opening(now, Decimal::from(-250));
        assert_eq!(negative.debit, Decimal::ZERO);
        assert_eq!(negative.credit, Decimal::from(250));
        assert_eq!(negative.net(), Decimal::from(-250));
    }

    #[test]
    fn test_entry_serializes_type_field() {
        let entry = LedgerEntry::order(Utc::now(), Uuid::new_v4(), "PO-1", Decimal::from(5));
        let json = serde_json::to_value(&entry).unwrap();

        assert_eq!(json["type"], "order");
        assert_eq!(json["reference"], "PO-1");
    }
}
