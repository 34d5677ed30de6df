//! 滯港費計時

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use icms_core::{whole_days_between, EngineConfig, ImportOrder, OrderStatus, Port};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 單張訂單的滯港狀況
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemurrageDetail {
    pub order_id: Uuid,
    pub po_number: String,
    pub status: OrderStatus,
    pub port_name: Option<String>,
    pub demurrage_start: DateTime<Utc>,
    pub days_in_port: i64,
    pub free_days: u32,
    pub chargeable_days: i64,
    pub daily_rate: Decimal,
    pub exposure: Decimal,
    pub at_risk: bool,
}

/// 滯港費報表
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DemurrageReport {
    pub orders_at_risk: usize,
    pub total_demurrage_exposure: Decimal,
    #[serde(rename = "demurrage_details")]
    pub details: Vec<DemurrageDetail>,
}

pub struct DemurrageCalculator;

impl DemurrageCalculator {
    /// 計算在港訂單（Arrived / Customs Clearance）的滯港費曝險
    pub fn calculate(
        orders: &[ImportOrder],
        ports: &HashMap<Uuid, Port>,
        config: &EngineConfig,
        now: DateTime<Utc>,
    ) -> DemurrageReport {
        let mut details: Vec<DemurrageDetail> = orders
            .iter()
            .filter(|order| order.status.is_at_port())
            .filter_map(|order| {
                let start = order.demurrage_start?;
                let port = order.port_id.and_then(|id| ports.get(&id));
                Some(Self::detail(order, start, port, config, now))
            })
            .collect();

        details.sort_by(|a, b| b.exposure.cmp(&a.exposure));

        DemurrageReport {
            orders_at_risk: details.iter().filter(|d| d.at_risk).count(),
            total_demurrage_exposure: details.iter().map(|d| d.exposure).sum(),
            details,
        }
    }

    fn detail(
        order: &ImportOrder,
        start: DateTime<Utc>,
        port: Option<&Port>,
        config: &EngineConfig,
        now: DateTime<Utc>,
    ) -> DemurrageDetail {
        let (free_days, daily_rate) = match port {
            Some(port) => (port.demurrage_free_days, port.demurrage_daily_rate),
            None => (config.default_demurrage_free_days, config.default_demurrage_daily_rate),
        };

        let days_in_port = whole_days_between(start, now).max(0);
        let chargeable_days = (days_in_port - i64::from(free_days)).max(0);

        DemurrageDetail {
            order_id: order.id,
            po_number: order.po_number.clone(),
            status: order.status,
            port_name: port.map(|p| p.name.clone()),
            demurrage_start: start,
            days_in_port,
            free_days,
            chargeable_days,
            daily_rate,
            exposure: Decimal::from(chargeable_days) * daily_rate,
            at_risk: days_in_port >= i64::from(free_days),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use icms_core::{ContainerType, Currency};
    use rust_decimal_macros::dec;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 8, 20, 12, 0, 0).unwrap()
    }

    fn arrived(po: &str, days_ago: i64, status: OrderStatus, port_id: Option<Uuid>) -> ImportOrder {
        let created = now() - Duration::days(60);
        ImportOrder {
            id: Uuid::new_v4(),
            po_number: po.to_string(),
            supplier_id: Uuid::new_v4(),
            port_id,
            container_type: ContainerType::FortyHighCube,
            currency: Currency::Usd,
            items: Vec::new(),
            total_quantity: 0,
            total_weight: Decimal::ZERO,
            total_volume: Decimal::ZERO,
            total_value: Decimal::ZERO,
            utilization_percentage: Decimal::ZERO,
            status,
            eta: None,
            shipping_date: None,
            demurrage_start: Some(now() - Duration::days(days_ago)),
            duty_rate: dec!(0.1),
            freight_charges: Decimal::ZERO,
            insurance_charges: Decimal::ZERO,
            other_charges: Decimal::ZERO,
            created_at: created,
            updated_at: created,
        }
    }

    #[test]
    fn test_exposure_by_port() {
        let port = Port::new("CNSHA".to_string(), "Shanghai".to_string()).with_demurrage(5, dec!(120));
        let ports: HashMap<_, _> = [(port.id, port.clone())].into();

        let orders = vec![
            arrived("PO-PORT", 8, OrderStatus::Arrived, Some(port.id)),
            arrived("PO-DEFAULT", 10, OrderStatus::CustomsClearance, None),
            arrived("PO-FRESH", 2, OrderStatus::Arrived, None),
            arrived("PO-GONE", 30, OrderStatus::Cleared, None),
        ];

        let report = DemurrageCalculator::calculate(&orders, &ports, &EngineConfig::new(), now());

        assert_eq!(report.details.len(), 3);
        // 8 天 - 5 免費 = 3 × 120
        assert_eq!(report.details[0].po_number, "PO-PORT");
        assert_eq!(report.details[0].exposure, dec!(360));
        // 10 天 - 7 免費 = 3 × 50
        assert_eq!(report.details[1].exposure, dec!(150));
        assert_eq!(report.details[2].exposure, Decimal::ZERO);
        assert_eq!(report.orders_at_risk, 2);
        assert_eq!(report.total_demurrage_exposure, dec!(510));
    }

    #[test]
    fn test_at_risk_on_last_free_day() {
        let orders = vec![arrived("PO-EDGE", 7, OrderStatus::Arrived, None)];
        let report = DemurrageCalculator::calculate(&orders, &HashMap::new(), &EngineConfig::new(), now());

        assert!(report.details[0].at_risk);
        assert_eq!(report.details[0].chargeable_days, 0);
        assert_eq!(report.total_demurrage_exposure, Decimal::ZERO);
    }

    #[test]
    fn test_missing_start_skipped() {
        let mut order = arrived("PO-NOSTART", 3, OrderStatus::Arrived, None);
        order.demurrage_start = None;

        let report = DemurrageCalculator::calculate(&[order], &HashMap::new(), &EngineConfig::new(), now());
        assert!(report.details.is_empty());
    }
}
