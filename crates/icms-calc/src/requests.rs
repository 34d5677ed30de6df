//! 引擎操作的輸入結構
//!
//! 更新類結構的欄位皆為 Option，只套用有提供的欄位。日期欄位以字串
//! 傳入並寬鬆解析，無法解析時以目前時間代替。

use chrono::{DateTime, Utc};
use icms_core::{Currency, IcmsError, LoadingLine, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

fn require_code(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(IcmsError::InvalidInput(format!("{} 不可為空", field)));
    }
    Ok(())
}

fn require_non_negative(field: &str, value: Decimal) -> Result<()> {
    if value < Decimal::ZERO {
        return Err(IcmsError::InvalidInput(format!("{} 不可為負數: {}", field, value)));
    }
    Ok(())
}

/// 新增 SKU
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkuDraft {
    pub sku_code: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub hsn_code: Option<String>,
    pub weight_per_unit: Decimal,
    #[serde(alias = "cbm_per_unit")]
    pub volume_per_unit: Decimal,
    #[serde(default)]
    pub unit_cost: Option<Decimal>,
    #[serde(default)]
    pub category: Option<String>,
}

impl SkuDraft {
    pub fn new(sku_code: impl Into<String>, weight_per_unit: Decimal, volume_per_unit: Decimal) -> Self {
        Self {
            sku_code: sku_code.into(),
            description: String::new(),
            hsn_code: None,
            weight_per_unit,
            volume_per_unit,
            unit_cost: None,
            category: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_unit_cost(mut self, unit_cost: Decimal) -> Self {
        self.unit_cost = Some(unit_cost);
        self
    }

    pub fn validate(&self) -> Result<()> {
        require_code("sku_code", &self.sku_code)?;
        require_non_negative("weight_per_unit", self.weight_per_unit)?;
        require_non_negative("volume_per_unit", self.volume_per_unit)
    }
}

/// 更新 SKU
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SkuUpdate {
    pub sku_code: Option<String>,
    pub description: Option<String>,
    pub hsn_code: Option<String>,
    pub weight_per_unit: Option<Decimal>,
    #[serde(alias = "cbm_per_unit")]
    pub volume_per_unit: Option<Decimal>,
    pub unit_cost: Option<Decimal>,
    pub category: Option<String>,
}

/// 新增供應商
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupplierDraft {
    pub code: String,
    pub name: String,
    pub base_currency: Currency,
    #[serde(default)]
    pub opening_balance: Decimal,
    #[serde(default, alias = "payment_terms_days")]
    pub credit_term_days: Option<u32>,
    #[serde(default, alias = "payment_terms_type")]
    pub credit_term_type: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

impl SupplierDraft {
    pub fn new(code: impl Into<String>, name: impl Into<String>, base_currency: Currency) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            base_currency,
            opening_balance: Decimal::ZERO,
            credit_term_days: None,
            credit_term_type: None,
            country: None,
        }
    }

    pub fn with_opening_balance(mut self, balance: Decimal) -> Self {
        self.opening_balance = balance;
        self
    }

    pub fn with_credit_terms(mut self, days: u32, term_type: impl Into<String>) -> Self {
        self.credit_term_days = Some(days);
        self.credit_term_type = Some(term_type.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        require_code("code", &self.code)?;
        require_code("name", &self.name)
    }
}

/// 更新供應商（`current_balance` 不可經由此處修改）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SupplierUpdate {
    pub code: Option<String>,
    pub name: Option<String>,
    pub base_currency: Option<Currency>,
    pub opening_balance: Option<Decimal>,
    #[serde(alias = "payment_terms_days")]
    pub credit_term_days: Option<u32>,
    #[serde(alias = "payment_terms_type")]
    pub credit_term_type: Option<String>,
    pub country: Option<String>,
}

/// 新增港口（未指定的參數取配置預設值）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortDraft {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub transit_days: Option<u32>,
    #[serde(default)]
    pub demurrage_free_days: Option<u32>,
    #[serde(default, alias = "demurrage_rate")]
    pub demurrage_daily_rate: Option<Decimal>,
}

impl PortDraft {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            country: None,
            transit_days: None,
            demurrage_free_days: None,
            demurrage_daily_rate: None,
        }
    }

    pub fn with_transit_days(mut self, days: u32) -> Self {
        self.transit_days = Some(days);
        self
    }

    pub fn with_demurrage(mut self, free_days: u32, daily_rate: Decimal) -> Self {
        self.demurrage_free_days = Some(free_days);
        self.demurrage_daily_rate = Some(daily_rate);
        self
    }
}

/// 更新訂單欄位（出貨後鎖定）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderUpdate {
    pub port_id: Option<Uuid>,
    pub duty_rate: Option<Decimal>,
    pub freight_charges: Option<Decimal>,
    pub insurance_charges: Option<Decimal>,
    pub other_charges: Option<Decimal>,
    /// ISO-8601
    pub eta: Option<String>,
    /// ISO-8601
    pub shipping_date: Option<String>,
}

impl OrderUpdate {
    pub fn validate(&self) -> Result<()> {
        let charges = [
            ("duty_rate", self.duty_rate),
            ("freight_charges", self.freight_charges),
            ("insurance_charges", self.insurance_charges),
            ("other_charges", self.other_charges),
        ];
        for (field, value) in charges {
            if let Some(value) = value {
                require_non_negative(field, value)?;
            }
        }
        Ok(())
    }
}

/// 記錄付款
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRequest {
    #[serde(alias = "import_order_id")]
    pub order_id: Uuid,
    pub amount: Decimal,
    pub currency: Currency,
    /// 未指定時為目前時間
    #[serde(default, deserialize_with = "icms_core::clock::lenient::optional_timestamp")]
    pub payment_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reference: String,
}

impl PaymentRequest {
    pub fn new(order_id: Uuid, amount: Decimal, currency: Currency) -> Self {
        Self {
            order_id,
            amount,
            currency,
            payment_date: None,
            reference: String::new(),
        }
    }

    pub fn with_date(mut self, date: DateTime<Utc>) -> Self {
        self.payment_date = Some(date);
        self
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = reference.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.amount <= Decimal::ZERO {
            return Err(IcmsError::InvalidInput(format!("付款金額必須大於 0: {}", self.amount)));
        }
        Ok(())
    }
}

/// 更新付款
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PaymentUpdate {
    pub amount: Option<Decimal>,
    pub currency: Option<Currency>,
    /// ISO-8601
    pub payment_date: Option<String>,
    pub reference: Option<String>,
}

/// 記錄實際裝櫃
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadingRequest {
    #[serde(alias = "import_order_id")]
    pub order_id: Uuid,
    pub items: Vec<LoadingLine>,
    #[serde(default, deserialize_with = "icms_core::clock::lenient::optional_timestamp")]
    pub loading_date: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_payment_request_wire_aliases() {
        let order_id = Uuid::new_v4();
        let raw = format!(
            r#"{{"import_order_id":"{}","amount":"2000","currency":"USD","reference":"TT-9"}}"#,
            order_id
        );
        let request: PaymentRequest = serde_json::from_str(&raw).unwrap();

        assert_eq!(request.order_id, order_id);
        assert_eq!(request.amount, dec!(2000));
        assert!(request.payment_date.is_none());
    }

    #[test]
    fn test_request_dates_parsed_leniently() {
        use chrono::TimeZone;

        let order_id = Uuid::new_v4();
        let raw = format!(
            r#"{{"order_id":"{}","amount":"10","currency":"USD","payment_date":"2025-10-06","reference":""}}"#,
            order_id
        );
        let request: PaymentRequest = serde_json::from_str(&raw).unwrap();
        assert_eq!(request.payment_date, Some(Utc.with_ymd_and_hms(2025, 10, 6, 0, 0, 0).unwrap()));

        // 無法解析的日期視為未提供，由引擎補上目前時間
        let raw = format!(
            r#"{{"order_id":"{}","amount":"10","currency":"USD","payment_date":"garbage","reference":""}}"#,
            order_id
        );
        let request: PaymentRequest = serde_json::from_str(&raw).unwrap();
        assert!(request.payment_date.is_none());

        let raw = format!(r#"{{"order_id":"{}","items":[],"loading_date":"2025-10-06 14:00:00"}}"#, order_id);
        let request: LoadingRequest = serde_json::from_str(&raw).unwrap();
        assert_eq!(request.loading_date, Some(Utc.with_ymd_and_hms(2025, 10, 6, 14, 0, 0).unwrap()));
    }

    #[test]
    fn test_validation() {
        assert!(PaymentRequest::new(Uuid::new_v4(), Decimal::ZERO, Currency::Usd).validate().is_err());
        assert!(SkuDraft::new("  ", dec!(1), dec!(1)).validate().is_err());
        assert!(SkuDraft::new("OK", dec!(-1), dec!(1)).validate().is_err());
        assert!(OrderUpdate {
            freight_charges: Some(dec!(-5)),
            ..Default::default()
        }
        .validate()
        .is_err());
    }

    #[test]
    fn test_sku_draft_cbm_alias() {
        let draft: SkuDraft =
            serde_json::from_str(r#"{"sku_code":"A","weight_per_unit":"1.5","cbm_per_unit":"0.02"}"#).unwrap();
        assert_eq!(draft.volume_per_unit, dec!(0.02));
    }
}
