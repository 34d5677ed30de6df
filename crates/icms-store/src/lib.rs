//! # ICMS Store
//!
//! 文件儲存抽象與記憶體實作
//!
//! 唯一鍵（SKU 代碼、供應商代碼、港口代碼、採購單號）由儲存層以原子
//! check-and-insert 保證；供應商餘額只能透過 [`Store::adjust_supplier_balance`]
//! 原子增減。

pub mod collection;
pub mod memory;

use icms_core::{
    ActualLoading, ContainerSpec, ContainerType, Currency, FxRate, ImportOrder, Payment, Port, Result, Sku,
    Supplier,
};
use rust_decimal::Decimal;
use uuid::Uuid;

// Re-export 主要類型
pub use memory::{MemoryStore, StoreSnapshot};

/// 引擎使用的資料存取介面
pub trait Store: Send + Sync {
    // ---- SKU ----
    fn insert_sku(&self, sku: Sku) -> Result<Sku>;
    fn get_sku(&self, id: Uuid) -> Option<Sku>;
    fn list_skus(&self) -> Vec<Sku>;
    fn update_sku(&self, sku: Sku) -> Result<Sku>;
    fn remove_sku(&self, id: Uuid) -> Result<Sku>;

    // ---- 供應商 ----
    fn insert_supplier(&self, supplier: Supplier) -> Result<Supplier>;
    fn get_supplier(&self, id: Uuid) -> Option<Supplier>;
    fn list_suppliers(&self) -> Vec<Supplier>;
    /// 更新主檔欄位；`current_balance` 保留儲存中的值
    fn update_supplier(&self, supplier: Supplier) -> Result<Supplier>;
    fn remove_supplier(&self, id: Uuid) -> Result<Supplier>;
    /// 原子增減目前餘額，回傳新餘額
    fn adjust_supplier_balance(&self, id: Uuid, delta: Decimal) -> Result<Decimal>;

    // ---- 港口 / 貨櫃 ----
    fn insert_port(&self, port: Port) -> Result<Port>;
    fn get_port(&self, id: Uuid) -> Option<Port>;
    fn list_ports(&self) -> Vec<Port>;
    fn insert_container(&self, spec: ContainerSpec) -> Result<ContainerSpec>;
    fn get_container(&self, container_type: ContainerType) -> Option<ContainerSpec>;
    fn list_containers(&self) -> Vec<ContainerSpec>;

    // ---- 訂單 ----
    fn insert_order(&self, order: ImportOrder) -> Result<ImportOrder>;
    fn get_order(&self, id: Uuid) -> Option<ImportOrder>;
    fn list_orders(&self) -> Vec<ImportOrder>;
    fn update_order(&self, order: ImportOrder) -> Result<ImportOrder>;
    fn remove_order(&self, id: Uuid) -> Result<ImportOrder>;

    // ---- 付款 ----
    fn insert_payment(&self, payment: Payment) -> Result<Payment>;
    fn get_payment(&self, id: Uuid) -> Option<Payment>;
    fn list_payments(&self) -> Vec<Payment>;
    /// 在付款記錄的鎖內套用修改，回傳（修改前, 修改後）
    ///
    /// `apply` 回傳錯誤時記錄保持不變。
    fn modify_payment(
        &self,
        id: Uuid,
        apply: &mut dyn FnMut(&mut Payment) -> Result<()>,
    ) -> Result<(Payment, Payment)>;
    fn remove_payment(&self, id: Uuid) -> Result<Payment>;

    // ---- 匯率 ----
    fn insert_fx_rate(&self, rate: FxRate) -> Result<FxRate>;
    /// 指定幣別對最新的匯率
    fn latest_fx_rate(&self, from: Currency, to: Currency) -> Option<FxRate>;
    fn list_fx_rates(&self) -> Vec<FxRate>;

    // ---- 實際裝櫃 ----
    fn insert_loading(&self, loading: ActualLoading) -> Result<ActualLoading>;
    fn get_loading(&self, id: Uuid) -> Option<ActualLoading>;
    fn list_loadings(&self) -> Vec<ActualLoading>;
    fn update_loading(&self, loading: ActualLoading) -> Result<ActualLoading>;
    fn remove_loading(&self, id: Uuid) -> Result<ActualLoading>;

    // ---- 衍生查詢 ----

    /// 訂單的付款（依建立順序）
    fn payments_for_order(&self, order_id: Uuid) -> Vec<Payment> {
        self.list_payments()
            .into_iter()
            .filter(|p| p.order_id == order_id)
            .collect()
    }

    /// 供應商的付款（依建立順序）
    fn payments_for_supplier(&self, supplier_id: Uuid) -> Vec<Payment> {
        self.list_payments()
            .into_iter()
            .filter(|p| p.supplier_id == supplier_id)
            .collect()
    }

    /// 供應商的訂單（依建立順序）
    fn orders_for_supplier(&self, supplier_id: Uuid) -> Vec<ImportOrder> {
        self.list_orders()
            .into_iter()
            .filter(|o| o.supplier_id == supplier_id)
            .collect()
    }

    /// 訂單的裝櫃記錄
    fn loading_for_order(&self, order_id: Uuid) -> Option<ActualLoading> {
        self.list_loadings().into_iter().find(|l| l.order_id == order_id)
    }
}
