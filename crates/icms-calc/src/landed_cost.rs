//! 到岸成本分攤
//!
//! 運費依材積、關稅依貨值、其他費用依重量分攤到各明細；每個比例的
//! 分母為零時比例視為 0。

use icms_core::{ratio, ImportOrder, Sku};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 訂單層級成本彙總
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostSummary {
    /// 貨值（FOB）
    #[serde(rename = "fob_value")]
    pub goods_value: Decimal,
    #[serde(rename = "freight")]
    pub freight_charges: Decimal,
    #[serde(rename = "insurance")]
    pub insurance_charges: Decimal,
    pub cif_value: Decimal,
    pub duty_rate: Decimal,
    #[serde(rename = "duty")]
    pub duty_amount: Decimal,
    pub other_charges: Decimal,
    pub total_landed_cost: Decimal,
    pub total_quantity: u64,
    pub per_unit_cost: Decimal,
}

/// 單一明細的成本拆解
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemCostBreakdown {
    pub sku_id: Uuid,
    pub sku_code: Option<String>,
    pub quantity: u32,
    pub item_value: Decimal,
    pub item_weight: Decimal,
    pub item_volume: Decimal,
    pub freight_allocated: Decimal,
    pub duty_allocated: Decimal,
    pub other_allocated: Decimal,
    pub total_cost: Decimal,
    pub per_unit_cost: Decimal,
}

/// 到岸成本計算結果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LandedCost {
    pub order_id: Uuid,
    pub po_number: String,
    #[serde(rename = "cost_breakdown")]
    pub summary: CostSummary,
    pub items: Vec<ItemCostBreakdown>,
}

impl LandedCost {
    pub fn total_landed_cost(&self) -> Decimal {
        self.summary.total_landed_cost
    }
}

/// 到岸成本計算器
pub struct LandedCostCalculator;

impl LandedCostCalculator {
    /// 計算訂單的到岸成本
    ///
    /// 明細的重量與材積由 SKU 推導；找不到 SKU 的明細以零重量、零材積計。
    pub fn calculate<F>(order: &ImportOrder, lookup_sku: F) -> LandedCost
    where
        F: Fn(Uuid) -> Option<Sku>,
    {
        let goods_value = order.total_value;
        let cif_value = goods_value + order.freight_charges + order.insurance_charges;
        let duty_amount = cif_value * order.duty_rate;
        let total_landed_cost = cif_value + duty_amount + order.other_charges;
        let per_unit_cost = ratio(total_landed_cost, Decimal::from(order.total_quantity));

        // 先推導明細的實體量，分母取明細合計
        let physical: Vec<(Option<Sku>, Decimal, Decimal)> = order
            .items
            .iter()
            .map(|item| {
                let sku = lookup_sku(item.sku_id);
                if sku.is_none() {
                    tracing::warn!("訂單 {} 的明細找不到 SKU {}，以零重量計", order.po_number, item.sku_id);
                }
                let weight = sku.as_ref().map(|s| s.weight_for(item.quantity)).unwrap_or_default();
                let volume = sku.as_ref().map(|s| s.volume_for(item.quantity)).unwrap_or_default();
                (sku, weight, volume)
            })
            .collect();

        let total_weight: Decimal = physical.iter().map(|(_, weight, _)| *weight).sum();
        let total_volume: Decimal = physical.iter().map(|(_, _, volume)| *volume).sum();

        let items = order
            .items
            .iter()
            .zip(physical)
            .map(|(item, (sku, item_weight, item_volume))| {
                let freight_allocated = order.freight_charges * ratio(item_volume, total_volume);
                let duty_allocated = duty_amount * ratio(item.total_value, goods_value);
                let other_allocated = order.other_charges * ratio(item_weight, total_weight);
                let total_cost = item.total_value + freight_allocated + duty_allocated + other_allocated;

                ItemCostBreakdown {
                    sku_id: item.sku_id,
                    sku_code: sku.map(|s| s.sku_code),
                    quantity: item.quantity,
                    item_value: item.total_value,
                    item_weight,
                    item_volume,
                    freight_allocated,
                    duty_allocated,
                    other_allocated,
                    total_cost,
                    per_unit_cost: ratio(total_cost, Decimal::from(item.quantity)),
                }
            })
            .collect();

        tracing::debug!(
            "訂單 {} 到岸成本 {}（CIF {}，關稅 {}）",
            order.po_number,
            total_landed_cost,
            cif_value,
            duty_amount
        );

        LandedCost {
            order_id: order.id,
            po_number: order.po_number.clone(),
            summary: CostSummary {
                goods_value,
                freight_charges: order.freight_charges,
                insurance_charges: order.insurance_charges,
                cif_value,
                duty_rate: order.duty_rate,
                duty_amount,
                other_charges: order.other_charges,
                total_landed_cost,
                total_quantity: order.total_quantity,
                per_unit_cost,
            },
            items,
        }
    }
}
