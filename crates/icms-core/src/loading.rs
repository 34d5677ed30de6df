//! 實際裝櫃模型

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 裝櫃明細（計劃 vs 實際）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadingLine {
    pub sku_id: Uuid,

    pub planned_quantity: i64,
    pub actual_quantity: i64,
    /// 實際 - 計劃
    #[serde(default)]
    pub variance_quantity: i64,

    pub planned_weight: Decimal,
    pub actual_weight: Decimal,
    #[serde(default)]
    pub variance_weight: Decimal,

    pub planned_value: Decimal,
    pub actual_value: Decimal,
    #[serde(default)]
    pub variance_value: Decimal,
}

impl LoadingLine {
    /// 創建裝櫃明細（差異自動計算）
    pub fn new(sku_id: Uuid, planned_quantity: i64, actual_quantity: i64) -> Self {
        Self {
            sku_id,
            planned_quantity,
            actual_quantity,
            variance_quantity: actual_quantity - planned_quantity,
            planned_weight: Decimal::ZERO,
            actual_weight: Decimal::ZERO,
            variance_weight: Decimal::ZERO,
            planned_value: Decimal::ZERO,
            actual_value: Decimal::ZERO,
            variance_value: Decimal::ZERO,
        }
    }

    /// 建構器模式：設置重量
    pub fn with_weight(mut self, planned: Decimal, actual: Decimal) -> Self {
        self.planned_weight = planned;
        self.actual_weight = actual;
        self.variance_weight = actual - planned;
        self
    }

    /// 建構器模式：設置金額
    pub fn with_value(mut self, planned: Decimal, actual: Decimal) -> Self {
        self.planned_value = planned;
        self.actual_value = actual;
        self.variance_value = actual - planned;
        self
    }

    /// 重新計算差異（忽略呼叫端提供的差異欄位）
    pub fn recompute_variance(&mut self) {
        self.variance_quantity = self.actual_quantity - self.planned_quantity;
        self.variance_weight = self.actual_weight - self.planned_weight;
        self.variance_value = self.actual_value - self.planned_value;
    }
}

/// 實際裝櫃記錄（每張訂單最多一筆）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActualLoading {
    pub id: Uuid,
    pub order_id: Uuid,
    pub items: Vec<LoadingLine>,

    pub total_planned_quantity: i64,
    pub total_actual_quantity: i64,
    pub total_variance_quantity: i64,

    pub total_planned_weight: Decimal,
    pub total_actual_weight: Decimal,
    pub total_variance_weight: Decimal,

    pub total_planned_value: Decimal,
    pub total_actual_value: Decimal,
    pub total_variance_value: Decimal,

    /// 鎖定後不可修改或刪除
    pub is_locked: bool,

    #[serde(deserialize_with = "crate::clock::lenient::timestamp")]
    pub loading_date: DateTime<Utc>,
    #[serde(deserialize_with = "crate::clock::lenient::timestamp")]
    pub created_at: DateTime<Utc>,
}

impl ActualLoading {
    /// 創建裝櫃記錄並計算合計
    pub fn new(order_id: Uuid, items: Vec<LoadingLine>, loading_date: DateTime<Utc>, created_at: DateTime<Utc>) -> Self {
        let mut loading = Self {
            id: Uuid::new_v4(),
            order_id,
            items,
            total_planned_quantity: 0,
            total_actual_quantity: 0,
            total_variance_quantity: 0,
            total_planned_weight: Decimal::ZERO,
            total_actual_weight: Decimal::ZERO,
            total_variance_weight: Decimal::ZERO,
            total_planned_value: Decimal::ZERO,
            total_actual_value: Decimal::ZERO,
            total_variance_value: Decimal::ZERO,
            is_locked: false,
            loading_date,
            created_at,
        };
        loading.recompute_totals();
        loading
    }

    /// 替換明細並重新計算
    pub fn replace_items(&mut self, items: Vec<LoadingLine>) {
        self.items = items;
        self.recompute_totals();
    }

    /// 重新計算明細差異與合計
    pub fn recompute_totals(&mut self) {
        for line in &mut self.items {
            line.recompute_variance();
        }

        self.total_planned_quantity = self.items.iter().map(|l| l.planned_quantity).sum();
        self.total_actual_quantity = self.items.iter().map(|l| l.actual_quantity).sum();
        self.total_variance_quantity = self.total_actual_quantity - self.total_planned_quantity;

        self.total_planned_weight = self.items.iter().map(|l| l.planned_weight).sum();
        self.total_actual_weight = self.items.iter().map(|l| l.actual_weight).sum();
        self.total_variance_weight = self.total_actual_weight - self.total_planned_weight;

        self.total_planned_value = self.items.iter().map(|l| l.planned_value).sum();
        self.total_actual_value = self.items.iter().map(|l| l.actual_value).sum();
        self.total_variance_value = self.total_actual_value - self.total_planned_value;
    }
}
