//! 進口訂單模型

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::payment::Currency;

/// 櫃型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContainerType {
    #[serde(rename = "20FT")]
    Twenty,
    #[serde(rename = "40FT")]
    Forty,
    #[serde(rename = "40HC")]
    FortyHighCube,
}

impl ContainerType {
    pub fn label(&self) -> &'static str {
        match self {
            ContainerType::Twenty => "20FT",
            ContainerType::Forty => "40FT",
            ContainerType::FortyHighCube => "40HC",
        }
    }
}

impl std::fmt::Display for ContainerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// 訂單狀態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    Draft,
    Tentative,
    Confirmed,
    Loaded,
    Shipped,
    #[serde(rename = "In Transit")]
    InTransit,
    Arrived,
    #[serde(rename = "Customs Clearance")]
    CustomsClearance,
    Cleared,
    Delivered,
    Cancelled,
}

/// 訂單所處階段（報表分組用）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStage {
    /// 出貨前（Draft..Loaded）
    Pending,
    /// 已出貨未交付（Shipped..Cleared）
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn label(&self) -> &'static str {
        match self {
            OrderStatus::Draft => "Draft",
            OrderStatus::Tentative => "Tentative",
            OrderStatus::Confirmed => "Confirmed",
            OrderStatus::Loaded => "Loaded",
            OrderStatus::Shipped => "Shipped",
            OrderStatus::InTransit => "In Transit",
            OrderStatus::Arrived => "Arrived",
            OrderStatus::CustomsClearance => "Customs Clearance",
            OrderStatus::Cleared => "Cleared",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
        }
    }

    /// 是否禁止修改/刪除訂單
    pub fn is_edit_locked(&self) -> bool {
        matches!(
            self,
            OrderStatus::Shipped | OrderStatus::InTransit | OrderStatus::Arrived | OrderStatus::Delivered
        )
    }

    /// 是否仍為未結訂單（應付款掃描對象）
    pub fn is_open(&self) -> bool {
        !matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// 是否在港口計算滯港費
    pub fn is_at_port(&self) -> bool {
        matches!(self, OrderStatus::Arrived | OrderStatus::CustomsClearance)
    }

    pub fn stage(&self) -> OrderStage {
        match self {
            OrderStatus::Draft | OrderStatus::Tentative | OrderStatus::Confirmed | OrderStatus::Loaded => {
                OrderStage::Pending
            }
            OrderStatus::Shipped
            | OrderStatus::InTransit
            | OrderStatus::Arrived
            | OrderStatus::CustomsClearance
            | OrderStatus::Cleared => OrderStage::Shipped,
            OrderStatus::Delivered => OrderStage::Delivered,
            OrderStatus::Cancelled => OrderStage::Cancelled,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// 訂單明細
///
/// `total_value` 由呼叫端提供，不會重新以 數量 × 單價 推導
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportOrderItem {
    pub sku_id: Uuid,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub total_value: Decimal,
}

impl ImportOrderItem {
    pub fn new(sku_id: Uuid, quantity: u32, unit_price: Decimal, total_value: Decimal) -> Self {
        Self {
            sku_id,
            quantity,
            unit_price,
            total_value,
        }
    }

    /// 以 數量 × 單價 作為明細金額
    pub fn priced(sku_id: Uuid, quantity: u32, unit_price: Decimal) -> Self {
        Self::new(sku_id, quantity, unit_price, unit_price * Decimal::from(quantity))
    }
}

/// 進口訂單
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportOrder {
    pub id: Uuid,

    /// 採購單號（唯一）
    pub po_number: String,

    pub supplier_id: Uuid,

    pub port_id: Option<Uuid>,

    pub container_type: ContainerType,

    pub currency: Currency,

    pub items: Vec<ImportOrderItem>,

    pub total_quantity: u64,

    /// 總重量（kg）
    pub total_weight: Decimal,

    /// 總材積（m³）
    #[serde(alias = "total_cbm")]
    pub total_volume: Decimal,

    /// 貨值（明細金額合計）
    pub total_value: Decimal,

    /// 貨櫃使用率（%，可超過 100）
    pub utilization_percentage: Decimal,

    pub status: OrderStatus,

    #[serde(default, deserialize_with = "crate::clock::lenient::optional_timestamp")]
    pub eta: Option<DateTime<Utc>>,

    /// 出貨日期（應付款到期日的起算日）
    #[serde(default, deserialize_with = "crate::clock::lenient::optional_timestamp")]
    pub shipping_date: Option<DateTime<Utc>>,

    /// 滯港起算時間（狀態變為 Arrived 時設置）
    #[serde(default, deserialize_with = "crate::clock::lenient::optional_timestamp")]
    pub demurrage_start: Option<DateTime<Utc>>,

    /// 關稅稅率（預設 10%）
    pub duty_rate: Decimal,

    pub freight_charges: Decimal,

    pub insurance_charges: Decimal,

    pub other_charges: Decimal,

    #[serde(deserialize_with = "crate::clock::lenient::timestamp")]
    pub created_at: DateTime<Utc>,

    #[serde(deserialize_with = "crate::clock::lenient::timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl ImportOrder {
    /// 應付款到期日起算日：有出貨日期用出貨日期，否則用建立時間
    pub fn payment_base_date(&self) -> DateTime<Utc> {
        self.shipping_date.unwrap_or(self.created_at)
    }

    /// 是否引用指定 SKU
    pub fn references_sku(&self, sku_id: Uuid) -> bool {
        self.items.iter().any(|item| item.sku_id == sku_id)
    }

    /// 明細金額合計（用於驗證 total_value）
    pub fn items_value(&self) -> Decimal {
        self.items.iter().map(|item| item.total_value).sum()
    }
}
