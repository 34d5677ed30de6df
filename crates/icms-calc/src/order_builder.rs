//! 訂單建構：彙總數量、重量、材積、貨值並計算貨櫃使用率

use chrono::{DateTime, Duration, Utc};
use icms_core::{
    ContainerSpec, ContainerType, Currency, IcmsError, ImportOrder, ImportOrderItem, OrderStatus, Port, Result, Sku,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 建立訂單的請求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    pub po_number: String,
    pub supplier_id: Uuid,
    #[serde(default)]
    pub port_id: Option<Uuid>,
    pub container_type: ContainerType,
    pub currency: Currency,
    pub items: Vec<ImportOrderItem>,
    /// 呼叫端指定的 ETA（有港口時會被覆蓋）
    #[serde(default, deserialize_with = "icms_core::clock::lenient::optional_timestamp")]
    pub eta: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "icms_core::clock::lenient::optional_timestamp")]
    pub shipping_date: Option<DateTime<Utc>>,
    /// 未指定時使用配置的預設稅率
    #[serde(default)]
    pub duty_rate: Option<Decimal>,
    #[serde(default)]
    pub freight_charges: Decimal,
    #[serde(default)]
    pub insurance_charges: Decimal,
    #[serde(default)]
    pub other_charges: Decimal,
}

impl OrderRequest {
    pub fn new(po_number: impl Into<String>, supplier_id: Uuid, container_type: ContainerType, currency: Currency) -> Self {
        Self {
            po_number: po_number.into(),
            supplier_id,
            port_id: None,
            container_type,
            currency,
            items: Vec::new(),
            eta: None,
            shipping_date: None,
            duty_rate: None,
            freight_charges: Decimal::ZERO,
            insurance_charges: Decimal::ZERO,
            other_charges: Decimal::ZERO,
        }
    }

    /// 建構器模式：加入明細
    pub fn with_item(mut self, item: ImportOrderItem) -> Self {
        self.items.push(item);
        self
    }

    pub fn with_port(mut self, port_id: Uuid) -> Self {
        self.port_id = Some(port_id);
        self
    }

    pub fn with_eta(mut self, eta: DateTime<Utc>) -> Self {
        self.eta = Some(eta);
        self
    }

    pub fn with_shipping_date(mut self, date: DateTime<Utc>) -> Self {
        self.shipping_date = Some(date);
        self
    }

    pub fn with_duty_rate(mut self, rate: Decimal) -> Self {
        self.duty_rate = Some(rate);
        self
    }

    /// 建構器模式：設置運費、保險費、其他費用
    pub fn with_charges(mut self, freight: Decimal, insurance: Decimal, other: Decimal) -> Self {
        self.freight_charges = freight;
        self.insurance_charges = insurance;
        self.other_charges = other;
        self
    }
}

/// 訂單彙總值
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTotals {
    pub total_quantity: u64,
    pub total_weight: Decimal,
    pub total_volume: Decimal,
    pub total_value: Decimal,
}

/// 訂單建構器
pub struct OrderBuilder;

impl OrderBuilder {
    /// 彙總明細
    ///
    /// 貨值直接採用明細的 `total_value`，重量與材積以 SKU 單位值乘上數量。
    pub fn aggregate<F>(items: &[ImportOrderItem], lookup_sku: F) -> Result<OrderTotals>
    where
        F: Fn(Uuid) -> Option<Sku>,
    {
        let mut totals = OrderTotals {
            total_quantity: 0,
            total_weight: Decimal::ZERO,
            total_volume: Decimal::ZERO,
            total_value: Decimal::ZERO,
        };

        for item in items {
            let sku = lookup_sku(item.sku_id).ok_or_else(|| IcmsError::not_found("sku", item.sku_id))?;

            totals.total_quantity += u64::from(item.quantity);
            totals.total_value += item.total_value;
            totals.total_weight += sku.weight_for(item.quantity);
            totals.total_volume += sku.volume_for(item.quantity);
        }

        Ok(totals)
    }

    /// 建構 Draft 訂單
    ///
    /// `container` 為 None 時回傳 NotFound；提供港口時 ETA = now + 運輸天數，
    /// 覆蓋呼叫端的 ETA。
    pub fn build<F>(
        request: OrderRequest,
        container: Option<&ContainerSpec>,
        port: Option<&Port>,
        lookup_sku: F,
        default_duty_rate: Decimal,
        now: DateTime<Utc>,
    ) -> Result<ImportOrder>
    where
        F: Fn(Uuid) -> Option<Sku>,
    {
        let container = container.ok_or_else(|| IcmsError::not_found("container type", request.container_type))?;

        let totals = Self::aggregate(&request.items, lookup_sku)?;
        let utilization = container.utilization(totals.total_weight, totals.total_volume);

        let eta = match port {
            Some(port) => Some(now + Duration::days(i64::from(port.transit_days))),
            None => request.eta,
        };

        tracing::debug!(
            "訂單 {} 彙總：數量 {}，重量 {}，材積 {}，使用率 {}%",
            request.po_number,
            totals.total_quantity,
            totals.total_weight,
            totals.total_volume,
            utilization
        );

        Ok(ImportOrder {
            id: Uuid::new_v4(),
            po_number: request.po_number,
            supplier_id: request.supplier_id,
            port_id: request.port_id,
            container_type: request.container_type,
            currency: request.currency,
            items: request.items,
            total_quantity: totals.total_quantity,
            total_weight: totals.total_weight,
            total_volume: totals.total_volume,
            total_value: totals.total_value,
            utilization_percentage: utilization,
            status: OrderStatus::Draft,
            eta,
            shipping_date: request.shipping_date,
            demurrage_start: None,
            duty_rate: request.duty_rate.unwrap_or(default_duty_rate),
            freight_charges: request.freight_charges,
            insurance_charges: request.insurance_charges,
            other_charges: request.other_charges,
            created_at: now,
            updated_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    fn catalog(skus: &[Sku]) -> HashMap<Uuid, Sku> {
        skus.iter().map(|s| (s.id, s.clone())).collect()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap()
    }

    #[test]
    fn test_utilization_tie_at_seventy_percent() {
        let sku = Sku::new("BOX".to_string(), dec!(12.6), dec!(0.0196));
        let skus = catalog(&[sku.clone()]);
        let container = ContainerSpec::new(ContainerType::Forty, dec!(18000), dec!(28));

        let request = OrderRequest::new("PO-70", Uuid::new_v4(), ContainerType::Forty, Currency::Usd)
            .with_item(ImportOrderItem::priced(sku.id, 1000, dec!(2)));

        let order = OrderBuilder::build(request, Some(&container), None, |id| skus.get(&id).cloned(), dec!(0.1), now())
            .unwrap();

        assert_eq!(order.total_weight, dec!(12600));
        assert_eq!(order.total_volume, dec!(19.6));
        assert_eq!(order.utilization_percentage, dec!(70));
        assert_eq!(order.status, OrderStatus::Draft);
        assert_eq!(order.total_value, dec!(2000));
    }

    #[test]
    fn test_utilization_exceeds_capacity() {
        let sku = Sku::new("HEAVY".to_string(), dec!(30), dec!(0.01));
        let skus = catalog(&[sku.clone()]);
        let container = ContainerSpec::new(ContainerType::Twenty, dec!(10000), dec!(28));

        let request = OrderRequest::new("PO-OVER", Uuid::new_v4(), ContainerType::Twenty, Currency::Usd)
            .with_item(ImportOrderItem::priced(sku.id, 400, dec!(1)));

        let order = OrderBuilder::build(request, Some(&container), None, |id| skus.get(&id).cloned(), dec!(0.1), now())
            .unwrap();

        assert_eq!(order.utilization_percentage, dec!(120));
    }

    #[test]
    fn test_value_is_trusted_from_caller() {
        let sku = Sku::new("A".to_string(), dec!(1), dec!(0.1));
        let skus = catalog(&[sku.clone()]);

        let totals = OrderBuilder::aggregate(&[ImportOrderItem::new(sku.id, 10, dec!(5), dec!(49))], |id| {
            skus.get(&id).cloned()
        })
        .unwrap();

        assert_eq!(totals.total_value, dec!(49));
        assert_eq!(totals.total_quantity, 10);
    }

    #[test]
    fn test_missing_container_and_sku() {
        let container = ContainerSpec::new(ContainerType::Forty, dec!(1), dec!(1));
        let request = OrderRequest::new("PO-X", Uuid::new_v4(), ContainerType::Forty, Currency::Usd)
            .with_item(ImportOrderItem::priced(Uuid::new_v4(), 1, dec!(1)));

        let err = OrderBuilder::build(request.clone(), None, None, |_| None, dec!(0.1), now()).unwrap_err();
        assert!(matches!(err, IcmsError::NotFound { entity: "container type", .. }));

        let err = OrderBuilder::build(request, Some(&container), None, |_| None, dec!(0.1), now()).unwrap_err();
        assert!(matches!(err, IcmsError::NotFound { entity: "sku", .. }));
    }

    #[test]
    fn test_port_overrides_eta() {
        let container = ContainerSpec::new(ContainerType::Forty, dec!(1), dec!(1));
        let port = Port::new("INNSA".to_string(), "Nhava Sheva".to_string()).with_transit_days(21);
        let caller_eta = now() + Duration::days(90);

        let request = OrderRequest::new("PO-ETA", Uuid::new_v4(), ContainerType::Forty, Currency::Usd)
            .with_port(port.id)
            .with_eta(caller_eta);

        let with_port =
            OrderBuilder::build(request.clone(), Some(&container), Some(&port), |_| None, dec!(0.1), now()).unwrap();
        assert_eq!(with_port.eta, Some(now() + Duration::days(21)));

        let without_port = OrderBuilder::build(request, Some(&container), None, |_| None, dec!(0.1), now()).unwrap();
        assert_eq!(without_port.eta, Some(caller_eta));
    }

    #[test]
    fn test_duty_rate_default() {
        let container = ContainerSpec::new(ContainerType::Forty, dec!(1), dec!(1));
        let request = OrderRequest::new("PO-D", Uuid::new_v4(), ContainerType::Forty, Currency::Cny);

        let order = OrderBuilder::build(request.clone(), Some(&container), None, |_| None, dec!(0.1), now()).unwrap();
        assert_eq!(order.duty_rate, dec!(0.1));

        let order = OrderBuilder::build(
            request.with_duty_rate(dec!(0.075)),
            Some(&container),
            None,
            |_| None,
            dec!(0.1),
            now(),
        )
        .unwrap();
        assert_eq!(order.duty_rate, dec!(0.075));
    }
}
