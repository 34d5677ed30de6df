//! 匯率換算
//!
//! 查詢順序：儲存中最新的匯率 → 配置的靜態備援表 → 1.0。

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use icms_core::{Currency, EngineConfig, FxRate};
use icms_store::Store;
use rust_decimal::Decimal;

/// 外部匯率來源
///
/// 回傳以 USD 為基準的匯率表（1 USD = rates[X] 單位的 X）。
pub trait FxRateProvider: Send + Sync {
    fn name(&self) -> &str;

    fn fetch_usd_rates(&self) -> anyhow::Result<HashMap<Currency, Decimal>>;
}

/// 換算結果（付款時的快照）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conversion {
    pub fx_rate: Decimal,
    pub base_amount: Decimal,
}

/// 匯率換算器
pub struct FxConverter<'a> {
    store: &'a dyn Store,
    config: &'a EngineConfig,
}

impl<'a> FxConverter<'a> {
    pub fn new(store: &'a dyn Store, config: &'a EngineConfig) -> Self {
        Self { store, config }
    }

    /// 指定幣別對的匯率
    pub fn rate(&self, from: Currency, to: Currency) -> Decimal {
        if from == to {
            return Decimal::ONE;
        }

        match self.store.latest_fx_rate(from, to) {
            Some(stored) => stored.rate,
            None => {
                let fallback = self.config.fallback_rate(from, to);
                tracing::debug!("{} → {} 無儲存匯率，使用備援匯率 {}", from, to, fallback);
                fallback
            }
        }
    }

    /// 換算為本位幣
    pub fn to_base(&self, amount: Decimal, currency: Currency) -> Conversion {
        let fx_rate = self.rate(currency, self.config.base_currency);
        Conversion {
            fx_rate,
            base_amount: amount * fx_rate,
        }
    }

    /// 從外部來源更新匯率表
    ///
    /// 失敗時回傳 false，儲存中的匯率保持不變。
    pub fn refresh(&self, provider: &dyn FxRateProvider, now: DateTime<Utc>) -> bool {
        let mut usd_rates = match provider.fetch_usd_rates() {
            Ok(rates) => rates,
            Err(err) => {
                tracing::warn!("匯率來源 {} 無法使用，改用既有匯率: {:#}", provider.name(), err);
                return false;
            }
        };
        usd_rates.entry(Currency::Usd).or_insert(Decimal::ONE);

        let base = self.config.base_currency;
        let Some(base_per_usd) = usd_rates.get(&base).copied().filter(|r| *r > Decimal::ZERO) else {
            tracing::warn!("匯率來源 {} 缺少本位幣 {}", provider.name(), base);
            return false;
        };

        let mut stored = 0;
        for currency in Currency::ALL {
            if currency == base {
                continue;
            }
            let Some(per_usd) = usd_rates.get(&currency).copied().filter(|r| *r > Decimal::ZERO) else {
                tracing::debug!("匯率來源缺少 {}，略過", currency);
                continue;
            };

            let rate = FxRate::new(currency, base, base_per_usd / per_usd, now).with_source(provider.name());
            match self.store.insert_fx_rate(rate) {
                Ok(_) => stored += 1,
                Err(err) => tracing::warn!("寫入匯率 {} → {} 失敗: {}", currency, base, err),
            }
        }

        tracing::info!("已從 {} 更新 {} 筆匯率", provider.name(), stored);
        stored > 0
    }
}
