//! 付款與匯率模型

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 幣別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    #[serde(rename = "USD")]
    Usd,
    #[serde(rename = "CNY")]
    Cny,
    #[serde(rename = "EUR")]
    Eur,
    #[serde(rename = "INR")]
    Inr,
}

impl Currency {
    pub const ALL: [Currency; 4] = [Currency::Usd, Currency::Cny, Currency::Eur, Currency::Inr];

    /// ISO 代碼
    pub fn code(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Cny => "CNY",
            Currency::Eur => "EUR",
            Currency::Inr => "INR",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.code().eq_ignore_ascii_case(code.trim()))
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// 匯率記錄
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FxRate {
    pub id: Uuid,
    pub from_currency: Currency,
    pub to_currency: Currency,
    pub rate: Decimal,
    /// 生效時間
    #[serde(deserialize_with = "crate::clock::lenient::timestamp")]
    pub as_of: DateTime<Utc>,
    /// 來源（例如外部 API 名稱）
    pub source: String,
}

impl FxRate {
    pub fn new(from_currency: Currency, to_currency: Currency, rate: Decimal, as_of: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            from_currency,
            to_currency,
            rate,
            as_of,
            source: "manual".to_string(),
        }
    }

    /// 建構器模式：設置來源
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// 是否為指定幣別對
    pub fn is_pair(&self, from: Currency, to: Currency) -> bool {
        self.from_currency == from && self.to_currency == to
    }
}

/// 付款狀態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    Pending,
    Partial,
    Paid,
    Overdue,
}

/// 付款
///
/// `fx_rate` 與 `base_amount` 在建立時快照，之後匯率表更新也不會重算
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,

    /// 所屬進口訂單
    pub order_id: Uuid,

    /// 供應商（由訂單推得）
    pub supplier_id: Uuid,

    /// 付款金額（付款幣別）
    pub amount: Decimal,

    /// 付款幣別
    pub currency: Currency,

    /// 付款當下的匯率快照
    pub fx_rate: Decimal,

    /// 本位幣金額 = amount × fx_rate
    pub base_amount: Decimal,

    /// 付款日期
    #[serde(deserialize_with = "crate::clock::lenient::timestamp")]
    pub payment_date: DateTime<Utc>,

    /// 參考號（例如電匯單號）
    pub reference: String,

    pub status: PaymentStatus,

    #[serde(deserialize_with = "crate::clock::lenient::timestamp")]
    pub created_at: DateTime<Utc>,
}

impl Payment {
    /// 創建新的付款記錄（狀態為 Paid）
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        order_id: Uuid,
        supplier_id: Uuid,
        amount: Decimal,
        currency: Currency,
        fx_rate: Decimal,
        payment_date: DateTime<Utc>,
        reference: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            order_id,
            supplier_id,
            amount,
            currency,
            fx_rate,
            base_amount: amount * fx_rate,
            payment_date,
            reference,
            status: PaymentStatus::Paid,
            created_at,
        }
    }

    /// 帳本使用的金額：本位幣金額，為零時退回原幣金額
    pub fn ledger_amount(&self) -> Decimal {
        if self.base_amount.is_zero() {
            self.amount
        } else {
            self.base_amount
        }
    }
}
