//! 引擎配置模型

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::payment::Currency;

/// 靜態備援匯率（外部匯率來源不可用時使用）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FallbackRate {
    pub from_currency: Currency,
    pub to_currency: Currency,
    pub rate: Decimal,
}

impl FallbackRate {
    pub fn new(from_currency: Currency, to_currency: Currency, rate: Decimal) -> Self {
        Self {
            from_currency,
            to_currency,
            rate,
        }
    }
}

/// 成本引擎配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// 本位幣（所有付款換算的目標幣別）
    pub base_currency: Currency,

    /// 靜態備援匯率表
    pub fallback_rates: Vec<FallbackRate>,

    /// 預設關稅稅率
    pub default_duty_rate: Decimal,

    /// 港口未設定時的預設運輸天數
    pub default_transit_days: u32,

    /// 預設滯港免費天數
    pub default_demurrage_free_days: u32,

    /// 預設滯港日費率
    pub default_demurrage_daily_rate: Decimal,

    /// 距到期日 0..=N 天視為高嚴重度
    pub high_severity_days: i64,

    /// 距到期日 (high, N] 天視為中嚴重度
    pub medium_severity_days: i64,

    /// 低於此使用率視為未充分利用（%）
    pub underutilized_below: Decimal,

    /// 高於此使用率視為超額（%）
    pub overutilized_above: Decimal,
}

impl EngineConfig {
    /// 創建預設配置（本位幣 INR）
    pub fn new() -> Self {
        Self {
            base_currency: Currency::Inr,
            fallback_rates: vec![
                FallbackRate::new(Currency::Usd, Currency::Inr, Decimal::new(830, 1)),
                FallbackRate::new(Currency::Eur, Currency::Inr, Decimal::new(900, 1)),
                FallbackRate::new(Currency::Cny, Currency::Inr, Decimal::new(115, 1)),
                FallbackRate::new(Currency::Inr, Currency::Inr, Decimal::ONE),
            ],
            default_duty_rate: Decimal::new(1, 1),
            default_transit_days: 30,
            default_demurrage_free_days: 7,
            default_demurrage_daily_rate: Decimal::from(50),
            high_severity_days: 3,
            medium_severity_days: 7,
            underutilized_below: Decimal::from(70),
            overutilized_above: Decimal::from(90),
        }
    }

    /// 從 JSON 載入配置，缺少的欄位使用預設值
    pub fn from_json(raw: &str) -> crate::Result<Self> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// 建構器模式：設置本位幣
    pub fn with_base_currency(mut self, currency: Currency) -> Self {
        self.base_currency = currency;
        self
    }

    /// 建構器模式：設置備援匯率（同一幣別對會覆蓋）
    pub fn with_fallback_rate(mut self, from: Currency, to: Currency, rate: Decimal) -> Self {
        self.fallback_rates
            .retain(|r| !(r.from_currency == from && r.to_currency == to));
        self.fallback_rates.push(FallbackRate::new(from, to, rate));
        self
    }

    /// 建構器模式：設置預設關稅稅率
    pub fn with_default_duty_rate(mut self, rate: Decimal) -> Self {
        self.default_duty_rate = rate;
        self
    }

    /// 建構器模式：設置通知門檻（天）
    pub fn with_severity_days(mut self, high: i64, medium: i64) -> Self {
        self.high_severity_days = high;
        self.medium_severity_days = medium;
        self
    }

    /// 建構器模式：設置滯港預設值
    pub fn with_demurrage_defaults(mut self, free_days: u32, daily_rate: Decimal) -> Self {
        self.default_demurrage_free_days = free_days;
        self.default_demurrage_daily_rate = daily_rate;
        self
    }

    /// 查詢備援匯率；完全未知的幣別對回傳 1
    pub fn fallback_rate(&self, from: Currency, to: Currency) -> Decimal {
        if from == to {
            return Decimal::ONE;
        }
        self.fallback_rates
            .iter()
            .find(|r| r.from_currency == from && r.to_currency == to)
            .map(|r| r.rate)
            .unwrap_or(Decimal::ONE)
    }

    /// 檢查配置一致性
    pub fn validate(&self) -> crate::Result<()> {
        if self.high_severity_days < 0 || self.medium_severity_days < self.high_severity_days {
            return Err(crate::IcmsError::InvalidInput(format!(
                "通知門檻不合理: high={}, medium={}",
                self.high_severity_days, self.medium_severity_days
            )));
        }
        if self.fallback_rates.iter().any(|r| r.rate <= Decimal::ZERO) {
            return Err(crate::IcmsError::InvalidInput(
                "備援匯率必須大於 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}
