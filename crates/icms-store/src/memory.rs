//! 記憶體儲存實作

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use icms_core::{
    ActualLoading, ContainerSpec, ContainerType, Currency, FxRate, IcmsError, ImportOrder, Payment, Port, Result,
    Sku, Supplier,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::collection::Collection;
use crate::Store;

/// 儲存內容的可序列化快照（扁平鍵值記錄）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSnapshot {
    pub skus: Vec<Sku>,
    pub suppliers: Vec<Supplier>,
    pub ports: Vec<Port>,
    pub containers: Vec<ContainerSpec>,
    pub orders: Vec<ImportOrder>,
    pub payments: Vec<Payment>,
    pub fx_rates: Vec<FxRate>,
    pub loadings: Vec<ActualLoading>,
}

impl StoreSnapshot {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// 以 DashMap 為底的記憶體儲存
#[derive(Default)]
pub struct MemoryStore {
    skus: Collection<Sku>,
    suppliers: Collection<Supplier>,
    ports: Collection<Port>,
    containers: DashMap<ContainerType, ContainerSpec>,
    orders: Collection<ImportOrder>,
    payments: Collection<Payment>,
    fx_rates: Collection<FxRate>,
    loadings: Collection<ActualLoading>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 從快照重建儲存（唯一鍵照常檢查）
    pub fn from_snapshot(snapshot: StoreSnapshot) -> Result<Self> {
        let store = Self::new();

        for sku in snapshot.skus {
            store.skus.insert(sku)?;
        }
        for supplier in snapshot.suppliers {
            store.suppliers.insert(supplier)?;
        }
        for port in snapshot.ports {
            store.ports.insert(port)?;
        }
        for spec in snapshot.containers {
            store.insert_container(spec)?;
        }
        for order in snapshot.orders {
            store.orders.insert(order)?;
        }
        for payment in snapshot.payments {
            store.payments.insert(payment)?;
        }
        for rate in snapshot.fx_rates {
            store.fx_rates.insert(rate)?;
        }
        for loading in snapshot.loadings {
            store.loadings.insert(loading)?;
        }

        tracing::debug!(
            "從快照載入 {} 張訂單、{} 筆付款",
            store.orders.len(),
            store.payments.len()
        );

        Ok(store)
    }

    /// 匯出目前內容
    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            skus: self.skus.list(),
            suppliers: self.suppliers.list(),
            ports: self.ports.list(),
            containers: self.list_containers(),
            orders: self.orders.list(),
            payments: self.payments.list(),
            fx_rates: self.fx_rates.list(),
            loadings: self.loadings.list(),
        }
    }
}

impl Store for MemoryStore {
    fn insert_sku(&self, sku: Sku) -> Result<Sku> {
        self.skus.insert(sku)
    }

    fn get_sku(&self, id: Uuid) -> Option<Sku> {
        self.skus.get(id)
    }

    fn list_skus(&self) -> Vec<Sku> {
        self.skus.list()
    }

    fn update_sku(&self, sku: Sku) -> Result<Sku> {
        self.skus.replace(sku)
    }

    fn remove_sku(&self, id: Uuid) -> Result<Sku> {
        self.skus.remove(id)
    }

    fn insert_supplier(&self, supplier: Supplier) -> Result<Supplier> {
        self.suppliers.insert(supplier)
    }

    fn get_supplier(&self, id: Uuid) -> Option<Supplier> {
        self.suppliers.get(id)
    }

    fn list_suppliers(&self) -> Vec<Supplier> {
        self.suppliers.list()
    }

    fn update_supplier(&self, supplier: Supplier) -> Result<Supplier> {
        self.suppliers
            .replace_with(supplier, |stored, incoming| incoming.current_balance = stored.current_balance)
    }

    fn remove_supplier(&self, id: Uuid) -> Result<Supplier> {
        self.suppliers.remove(id)
    }

    fn adjust_supplier_balance(&self, id: Uuid, delta: Decimal) -> Result<Decimal> {
        self.suppliers.modify(id, |supplier| {
            supplier.current_balance += delta;
            Ok(supplier.current_balance)
        })
    }

    fn insert_port(&self, port: Port) -> Result<Port> {
        self.ports.insert(port)
    }

    fn get_port(&self, id: Uuid) -> Option<Port> {
        self.ports.get(id)
    }

    fn list_ports(&self) -> Vec<Port> {
        self.ports.list()
    }

    fn insert_container(&self, spec: ContainerSpec) -> Result<ContainerSpec> {
        match self.containers.entry(spec.container_type) {
            Entry::Occupied(_) => Err(IcmsError::Conflict(format!(
                "container {} 已存在",
                spec.container_type
            ))),
            Entry::Vacant(vacant) => {
                vacant.insert(spec.clone());
                Ok(spec)
            }
        }
    }

    fn get_container(&self, container_type: ContainerType) -> Option<ContainerSpec> {
        self.containers.get(&container_type).map(|spec| spec.clone())
    }

    fn list_containers(&self) -> Vec<ContainerSpec> {
        let mut specs: Vec<ContainerSpec> = self.containers.iter().map(|spec| spec.clone()).collect();
        specs.sort_by_key(|spec| spec.container_type.label());
        specs
    }

    fn insert_order(&self, order: ImportOrder) -> Result<ImportOrder> {
        self.orders.insert(order)
    }

    fn get_order(&self, id: Uuid) -> Option<ImportOrder> {
        self.orders.get(id)
    }

    fn list_orders(&self) -> Vec<ImportOrder> {
        self.orders.list()
    }

    fn update_order(&self, order: ImportOrder) -> Result<ImportOrder> {
        self.orders.replace(order)
    }

    fn remove_order(&self, id: Uuid) -> Result<ImportOrder> {
        self.orders.remove(id)
    }

    fn insert_payment(&self, payment: Payment) -> Result<Payment> {
        self.payments.insert(payment)
    }

    fn get_payment(&self, id: Uuid) -> Option<Payment> {
        self.payments.get(id)
    }

    fn list_payments(&self) -> Vec<Payment> {
        self.payments.list()
    }

    fn modify_payment(
        &self,
        id: Uuid,
        apply: &mut dyn FnMut(&mut Payment) -> Result<()>,
    ) -> Result<(Payment, Payment)> {
        self.payments.modify(id, |payment| {
            let mut updated = payment.clone();
            apply(&mut updated)?;
            Ok((std::mem::replace(payment, updated.clone()), updated))
        })
    }

    fn remove_payment(&self, id: Uuid) -> Result<Payment> {
        self.payments.remove(id)
    }

    fn insert_fx_rate(&self, rate: FxRate) -> Result<FxRate> {
        self.fx_rates.insert(rate)
    }

    fn latest_fx_rate(&self, from: Currency, to: Currency) -> Option<FxRate> {
        // 同一生效時間取最後寫入者
        self.fx_rates
            .list()
            .into_iter()
            .filter(|rate| rate.is_pair(from, to))
            .max_by(|a, b| a.as_of.cmp(&b.as_of))
    }

    fn list_fx_rates(&self) -> Vec<FxRate> {
        self.fx_rates.list()
    }

    fn insert_loading(&self, loading: ActualLoading) -> Result<ActualLoading> {
        self.loadings.insert(loading)
    }

    fn get_loading(&self, id: Uuid) -> Option<ActualLoading> {
        self.loadings.get(id)
    }

    fn list_loadings(&self) -> Vec<ActualLoading> {
        self.loadings.list()
    }

    fn update_loading(&self, loading: ActualLoading) -> Result<ActualLoading> {
        self.loadings.replace(loading)
    }

    fn remove_loading(&self, id: Uuid) -> Result<ActualLoading> {
        self.loadings.remove(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use rstest::rstest;
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use std::thread;

    fn supplier(code: &str) -> Supplier {
        Supplier::new(code.to_string(), format!("Supplier {}", code), Currency::Usd).with_opening_balance(dec!(1000))
    }

    #[test]
    fn test_update_supplier_keeps_current_balance() {
        let store = MemoryStore::new();
        let stored = store.insert_supplier(supplier("SUP-1")).unwrap();
        store.adjust_supplier_balance(stored.id, dec!(-400)).unwrap();

        let mut edited = stored.clone();
        edited.opening_balance = dec!(5000);
        edited.current_balance = dec!(5000);
        edited.name = "Renamed".to_string();
        let updated = store.update_supplier(edited).unwrap();

        assert_eq!(updated.opening_balance, dec!(5000));
        assert_eq!(updated.current_balance, dec!(600));
        assert_eq!(updated.name, "Renamed");
    }

    #[test]
    fn test_concurrent_balance_adjustments() {
        let store = Arc::new(MemoryStore::new());
        let id = store.insert_supplier(supplier("SUP-2")).unwrap().id;

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for _ in 0..50 {
                        store.adjust_supplier_balance(id, dec!(-1)).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.get_supplier(id).unwrap().current_balance, dec!(600));
    }

    /// 同一筆付款被多個執行緒修改，餘額差額取自鎖內原值
    #[test]
    fn test_concurrent_payment_modifications() {
        let store = Arc::new(MemoryStore::new());
        let supplier_id = store.insert_supplier(supplier("SUP-3")).unwrap().id;
        let now = Utc::now();
        let payment = Payment::new(
            Uuid::new_v4(),
            supplier_id,
            dec!(300),
            Currency::Usd,
            dec!(83),
            now,
            "TT-C".to_string(),
            now,
        );
        let payment_id = store.insert_payment(payment).unwrap().id;
        store.adjust_supplier_balance(supplier_id, dec!(-300)).unwrap();

        let handles: Vec<_> = (1..=8)
            .map(|n| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for i in 0..50 {
                        let amount = Decimal::from(n * 100 + i);
                        let (old, new) = store
                            .modify_payment(payment_id, &mut |p: &mut Payment| {
                                p.amount = amount;
                                Ok(())
                            })
                            .unwrap();
                        store.adjust_supplier_balance(supplier_id, old.amount - new.amount).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        // 餘額 = 期初 − 最終付款金額
        let final_amount = store.get_payment(payment_id).unwrap().amount;
        assert_eq!(store.get_supplier(supplier_id).unwrap().current_balance, dec!(1000) - final_amount);
    }

    #[test]
    fn test_modify_payment_error_keeps_record() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let payment = Payment::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            dec!(300),
            Currency::Usd,
            dec!(83),
            now,
            "TT-E".to_string(),
            now,
        );
        let id = store.insert_payment(payment).unwrap().id;

        let err = store
            .modify_payment(id, &mut |p: &mut Payment| {
                p.amount = dec!(1);
                Err(IcmsError::InvalidInput("拒絕".to_string()))
            })
            .unwrap_err();
        assert!(matches!(err, IcmsError::InvalidInput(_)));
        assert_eq!(store.get_payment(id).unwrap().amount, dec!(300));

        let err = store.modify_payment(Uuid::new_v4(), &mut |_: &mut Payment| Ok(())).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_adjust_unknown_supplier() {
        let store = MemoryStore::new();
        let err = store.adjust_supplier_balance(Uuid::new_v4(), dec!(1)).unwrap_err();
        assert!(err.is_not_found());
    }

    #[rstest]
    #[case(ContainerType::Twenty)]
    #[case(ContainerType::FortyHighCube)]
    fn test_container_unique_per_type(#[case] container_type: ContainerType) {
        let store = MemoryStore::new();
        store
            .insert_container(ContainerSpec::new(container_type, dec!(18000), dec!(28)))
            .unwrap();

        let err = store
            .insert_container(ContainerSpec::new(container_type, dec!(1), dec!(1)))
            .unwrap_err();
        assert!(matches!(err, IcmsError::Conflict(_)));
        assert_eq!(store.get_container(container_type).unwrap().max_weight, dec!(18000));
    }

    #[test]
    fn test_latest_fx_rate_by_as_of() {
        let store = MemoryStore::new();
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        store
            .insert_fx_rate(FxRate::new(Currency::Usd, Currency::Inr, dec!(84), t0 + Duration::days(2)))
            .unwrap();
        store
            .insert_fx_rate(FxRate::new(Currency::Usd, Currency::Inr, dec!(82), t0))
            .unwrap();
        store
            .insert_fx_rate(FxRate::new(Currency::Eur, Currency::Inr, dec!(91), t0 + Duration::days(5)))
            .unwrap();

        let latest = store.latest_fx_rate(Currency::Usd, Currency::Inr).unwrap();
        assert_eq!(latest.rate, dec!(84));
        assert!(store.latest_fx_rate(Currency::Cny, Currency::Inr).is_none());
    }

    #[test]
    fn test_snapshot_restores_records() {
        let store = MemoryStore::new();
        store.insert_supplier(supplier("A")).unwrap();
        store.insert_supplier(supplier("B")).unwrap();
        store
            .insert_sku(Sku::new("SKU-1".to_string(), dec!(2), dec!(0.1)))
            .unwrap();

        let json = store.snapshot().to_json().unwrap();
        let restored = MemoryStore::from_snapshot(StoreSnapshot::from_json(&json).unwrap()).unwrap();

        let codes: Vec<String> = restored.list_suppliers().into_iter().map(|s| s.code).collect();
        assert_eq!(codes, vec!["A", "B"]);
        assert_eq!(restored.list_skus().len(), 1);

        // 唯一鍵索引也一併重建
        assert!(restored.insert_supplier(supplier("A")).is_err());
    }
}
