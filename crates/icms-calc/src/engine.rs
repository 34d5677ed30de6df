//! 成本引擎
//!
//! [`CostingEngine`] 綁定儲存、時鐘與配置；每個操作都是獨立的短時間計算，
//! 共享狀態只有儲存層的唯一鍵與供應商餘額。

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use icms_core::{
    parse_timestamp_or, ActualLoading, Clock, ContainerSpec, Currency, EngineConfig, FxRate, IcmsError, ImportOrder,
    LoadingLine, OrderStatus, Payment, Port, Result, Sku, Supplier, SystemClock,
};
use icms_store::{MemoryStore, Store};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::demurrage::{DemurrageCalculator, DemurrageReport};
use crate::due_date::{DueScan, DueScanner};
use crate::fx::{FxConverter, FxRateProvider};
use crate::landed_cost::{LandedCost, LandedCostCalculator};
use crate::ledger::{SupplierLedger, SupplierLedgerBuilder};
use crate::loading::{VarianceAnalysis, VarianceAnalyzer};
use crate::order_builder::{OrderBuilder, OrderRequest};
use crate::reports::{
    BalanceReconciliation, ContainerWiseReport, ErpExport, KpiSummary, NotificationFeed, PaymentsSummary,
    SupplierWiseSummary,
};
use crate::requests::{
    LoadingRequest, OrderUpdate, PaymentRequest, PaymentUpdate, PortDraft, SkuDraft, SkuUpdate, SupplierDraft,
    SupplierUpdate,
};

/// 訂單成本與供應商帳務引擎
pub struct CostingEngine {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
}

impl CostingEngine {
    /// 創建引擎（系統時鐘）
    pub fn new(store: Arc<dyn Store>, config: EngineConfig) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            config,
        }
    }

    /// 以記憶體儲存與預設配置創建
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()), EngineConfig::default())
    }

    /// 建構器模式：替換時鐘
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    fn fx(&self) -> FxConverter<'_> {
        FxConverter::new(self.store.as_ref(), &self.config)
    }

    fn require_order(&self, id: Uuid) -> Result<ImportOrder> {
        self.store.get_order(id).ok_or_else(|| IcmsError::not_found("order", id))
    }

    fn require_supplier(&self, id: Uuid) -> Result<Supplier> {
        self.store.get_supplier(id).ok_or_else(|| IcmsError::not_found("supplier", id))
    }

    fn sku_lookup(&self) -> impl Fn(Uuid) -> Option<Sku> + '_ {
        move |id| self.store.get_sku(id)
    }

    // ==================== 主檔 ====================

    pub fn create_sku(&self, draft: SkuDraft) -> Result<Sku> {
        draft.validate()?;

        let mut sku = Sku::new(draft.sku_code, draft.weight_per_unit, draft.volume_per_unit)
            .with_description(draft.description);
        sku.hsn_code = draft.hsn_code;
        sku.unit_cost = draft.unit_cost;
        sku.category = draft.category;
        sku.created_at = self.now();

        let sku = self.store.insert_sku(sku)?;
        tracing::info!("新增 SKU {}", sku.sku_code);
        Ok(sku)
    }

    pub fn get_sku(&self, id: Uuid) -> Result<Sku> {
        self.store.get_sku(id).ok_or_else(|| IcmsError::not_found("sku", id))
    }

    pub fn list_skus(&self) -> Vec<Sku> {
        self.store.list_skus()
    }

    pub fn update_sku(&self, id: Uuid, update: SkuUpdate) -> Result<Sku> {
        let mut sku = self.get_sku(id)?;

        if let Some(code) = update.sku_code {
            sku.sku_code = code;
        }
        if let Some(description) = update.description {
            sku.description = description;
        }
        if let Some(hsn_code) = update.hsn_code {
            sku.hsn_code = Some(hsn_code);
        }
        if let Some(weight) = update.weight_per_unit {
            sku.weight_per_unit = weight;
        }
        if let Some(volume) = update.volume_per_unit {
            sku.volume_per_unit = volume;
        }
        if let Some(unit_cost) = update.unit_cost {
            sku.unit_cost = Some(unit_cost);
        }
        if let Some(category) = update.category {
            sku.category = Some(category);
        }

        SkuDraft::new(sku.sku_code.clone(), sku.weight_per_unit, sku.volume_per_unit).validate()?;
        self.store.update_sku(sku)
    }

    /// 刪除 SKU（被訂單引用時拒絕）
    pub fn delete_sku(&self, id: Uuid) -> Result<()> {
        let sku = self.get_sku(id)?;
        if self.store.list_orders().iter().any(|o| o.references_sku(id)) {
            return Err(IcmsError::Conflict(format!("SKU {} 已被進口訂單引用，無法刪除", sku.sku_code)));
        }

        self.store.remove_sku(id)?;
        tracing::info!("刪除 SKU {}", sku.sku_code);
        Ok(())
    }

    /// 新增供應商，目前餘額以期初餘額起算
    pub fn create_supplier(&self, draft: SupplierDraft) -> Result<Supplier> {
        draft.validate()?;

        let mut supplier = Supplier::new(draft.code, draft.name, draft.base_currency)
            .with_opening_balance(draft.opening_balance);
        if let Some(days) = draft.credit_term_days {
            supplier.credit_term_days = days;
        }
        if let Some(term_type) = draft.credit_term_type {
            supplier.credit_term_type = term_type;
        }
        supplier.country = draft.country;
        supplier.created_at = self.now();

        let supplier = self.store.insert_supplier(supplier)?;
        tracing::info!("新增供應商 {}（期初餘額 {}）", supplier.code, supplier.opening_balance);
        Ok(supplier)
    }

    pub fn get_supplier(&self, id: Uuid) -> Result<Supplier> {
        self.require_supplier(id)
    }

    pub fn list_suppliers(&self) -> Vec<Supplier> {
        self.store.list_suppliers()
    }

    /// 更新供應商主檔；修改期初餘額不影響目前餘額
    pub fn update_supplier(&self, id: Uuid, update: SupplierUpdate) -> Result<Supplier> {
        let mut supplier = self.require_supplier(id)?;

        if let Some(code) = update.code {
            supplier.code = code;
        }
        if let Some(name) = update.name {
            supplier.name = name;
        }
        if let Some(currency) = update.base_currency {
            supplier.base_currency = currency;
        }
        if let Some(opening) = update.opening_balance {
            supplier.opening_balance = opening;
        }
        if let Some(days) = update.credit_term_days {
            supplier.credit_term_days = days;
        }
        if let Some(term_type) = update.credit_term_type {
            supplier.credit_term_type = term_type;
        }
        if let Some(country) = update.country {
            supplier.country = Some(country);
        }

        self.store.update_supplier(supplier)
    }

    /// 刪除供應商（被訂單引用時拒絕）
    pub fn delete_supplier(&self, id: Uuid) -> Result<()> {
        let supplier = self.require_supplier(id)?;
        if !self.store.orders_for_supplier(id).is_empty() {
            return Err(IcmsError::Conflict(format!("供應商 {} 已被進口訂單引用，無法刪除", supplier.code)));
        }

        self.store.remove_supplier(id)?;
        tracing::info!("刪除供應商 {}", supplier.code);
        Ok(())
    }

    pub fn create_port(&self, draft: PortDraft) -> Result<Port> {
        if draft.code.trim().is_empty() {
            return Err(IcmsError::InvalidInput("港口代碼不可為空".to_string()));
        }

        let mut port = Port::new(draft.code, draft.name)
            .with_transit_days(draft.transit_days.unwrap_or(self.config.default_transit_days))
            .with_demurrage(
                draft.demurrage_free_days.unwrap_or(self.config.default_demurrage_free_days),
                draft
                    .demurrage_daily_rate
                    .unwrap_or(self.config.default_demurrage_daily_rate),
            );
        port.country = draft.country;
        port.created_at = self.now();

        self.store.insert_port(port)
    }

    pub fn list_ports(&self) -> Vec<Port> {
        self.store.list_ports()
    }

    /// 新增櫃型規格（每種櫃型一筆）
    pub fn create_container(&self, spec: ContainerSpec) -> Result<ContainerSpec> {
        if spec.max_weight <= Decimal::ZERO || spec.max_volume <= Decimal::ZERO {
            return Err(IcmsError::InvalidInput(format!("櫃型 {} 的容量必須大於 0", spec.container_type)));
        }
        self.store.insert_container(spec)
    }

    pub fn list_containers(&self) -> Vec<ContainerSpec> {
        self.store.list_containers()
    }

    // ==================== 訂單 ====================

    /// 建立並儲存 Draft 訂單
    pub fn build_order(&self, request: OrderRequest) -> Result<ImportOrder> {
        tracing::info!(
            "建立訂單 {}：{} 筆明細，櫃型 {}",
            request.po_number,
            request.items.len(),
            request.container_type
        );

        if request.po_number.trim().is_empty() {
            return Err(IcmsError::InvalidInput("採購單號不可為空".to_string()));
        }
        self.require_supplier(request.supplier_id)?;

        let container = self.store.get_container(request.container_type);
        let port = request.port_id.and_then(|id| self.store.get_port(id));
        if request.port_id.is_some() && port.is_none() {
            tracing::warn!("訂單 {} 的港口不存在，保留呼叫端的 ETA", request.po_number);
        }

        let order = OrderBuilder::build(
            request,
            container.as_ref(),
            port.as_ref(),
            self.sku_lookup(),
            self.config.default_duty_rate,
            self.now(),
        )?;

        let order = self.store.insert_order(order)?;
        tracing::info!(
            "訂單 {} 已建立：貨值 {}，使用率 {}%",
            order.po_number,
            order.total_value,
            order.utilization_percentage.round_dp(2)
        );
        Ok(order)
    }

    pub fn get_order(&self, id: Uuid) -> Result<ImportOrder> {
        self.require_order(id)
    }

    pub fn list_orders(&self) -> Vec<ImportOrder> {
        self.store.list_orders()
    }

    /// 變更訂單狀態；進入 Arrived 時開始滯港計時
    pub fn update_order_status(&self, id: Uuid, status: OrderStatus) -> Result<ImportOrder> {
        let mut order = self.require_order(id)?;
        let now = self.now();

        tracing::info!("訂單 {} 狀態 {} → {}", order.po_number, order.status, status);

        order.status = status;
        order.updated_at = now;
        if status == OrderStatus::Arrived {
            order.demurrage_start = Some(now);
        }

        self.store.update_order(order)
    }

    /// 修改訂單費用與日期
    pub fn update_order(&self, id: Uuid, update: OrderUpdate) -> Result<ImportOrder> {
        let mut order = self.require_order(id)?;
        Self::ensure_editable(&order)?;
        update.validate()?;

        let now = self.now();
        if let Some(port_id) = update.port_id {
            if self.store.get_port(port_id).is_none() {
                return Err(IcmsError::not_found("port", port_id));
            }
            order.port_id = Some(port_id);
        }
        if let Some(rate) = update.duty_rate {
            order.duty_rate = rate;
        }
        if let Some(freight) = update.freight_charges {
            order.freight_charges = freight;
        }
        if let Some(insurance) = update.insurance_charges {
            order.insurance_charges = insurance;
        }
        if let Some(other) = update.other_charges {
            order.other_charges = other;
        }
        if let Some(raw) = update.eta.as_deref() {
            order.eta = Some(parse_timestamp_or(raw, now));
        }
        if let Some(raw) = update.shipping_date.as_deref() {
            order.shipping_date = Some(parse_timestamp_or(raw, now));
        }
        order.updated_at = now;

        self.store.update_order(order)
    }

    /// 刪除訂單
    ///
    /// 已出貨的訂單與仍有付款的訂單不可刪除；未鎖定的裝櫃記錄一併刪除。
    pub fn delete_order(&self, id: Uuid) -> Result<()> {
        let order = self.require_order(id)?;
        Self::ensure_editable(&order)?;

        if !self.store.payments_for_order(id).is_empty() {
            return Err(IcmsError::Conflict(format!("訂單 {} 仍有付款記錄，無法刪除", order.po_number)));
        }

        if let Some(loading) = self.store.loading_for_order(id) {
            if loading.is_locked {
                return Err(IcmsError::InvalidState(format!("訂單 {} 的裝櫃記錄已鎖定", order.po_number)));
            }
            self.store.remove_loading(loading.id)?;
        }

        self.store.remove_order(id)?;
        tracing::info!("刪除訂單 {}", order.po_number);
        Ok(())
    }

    fn ensure_editable(order: &ImportOrder) -> Result<()> {
        if order.status.is_edit_locked() {
            return Err(IcmsError::InvalidState(format!(
                "訂單 {} 狀態為 {}，不可修改或刪除",
                order.po_number, order.status
            )));
        }
        Ok(())
    }

    /// 到岸成本
    pub fn compute_landed_cost(&self, order_id: Uuid) -> Result<LandedCost> {
        let order = self.require_order(order_id)?;
        Ok(LandedCostCalculator::calculate(&order, self.sku_lookup()))
    }

    // ==================== 實際裝櫃 ====================

    /// 記錄實際裝櫃，訂單狀態改為 Loaded
    pub fn record_loading(&self, request: LoadingRequest) -> Result<ActualLoading> {
        let mut order = self.require_order(request.order_id)?;
        let now = self.now();

        let loading = ActualLoading::new(order.id, request.items, request.loading_date.unwrap_or(now), now);
        let loading = self.store.insert_loading(loading)?;

        order.status = OrderStatus::Loaded;
        order.updated_at = now;
        self.store.update_order(order)?;

        tracing::info!(
            "訂單 {} 裝櫃完成：數量差異 {}，金額差異 {}",
            loading.order_id,
            loading.total_variance_quantity,
            loading.total_variance_value
        );
        Ok(loading)
    }

    fn require_unlocked_loading(&self, id: Uuid) -> Result<ActualLoading> {
        let loading = self.store.get_loading(id).ok_or_else(|| IcmsError::not_found("loading", id))?;
        if loading.is_locked {
            return Err(IcmsError::InvalidState(format!("裝櫃記錄 {} 已鎖定", id)));
        }
        Ok(loading)
    }

    /// 替換裝櫃明細並重算差異
    pub fn update_loading(&self, id: Uuid, items: Vec<LoadingLine>) -> Result<ActualLoading> {
        let mut loading = self.require_unlocked_loading(id)?;
        loading.replace_items(items);
        self.store.update_loading(loading)
    }

    /// 鎖定裝櫃記錄（重複鎖定不報錯）
    pub fn lock_loading(&self, id: Uuid) -> Result<ActualLoading> {
        let mut loading = self.store.get_loading(id).ok_or_else(|| IcmsError::not_found("loading", id))?;
        if loading.is_locked {
            return Ok(loading);
        }

        loading.is_locked = true;
        tracing::info!("鎖定裝櫃記錄 {}", id);
        self.store.update_loading(loading)
    }

    pub fn delete_loading(&self, id: Uuid) -> Result<()> {
        self.require_unlocked_loading(id)?;
        self.store.remove_loading(id)?;
        Ok(())
    }

    pub fn list_loadings(&self) -> Vec<ActualLoading> {
        self.store.list_loadings()
    }

    pub fn variance_analysis(&self) -> VarianceAnalysis {
        VarianceAnalyzer::analyze(&self.store.list_loadings())
    }

    // ==================== 付款與匯率 ====================

    /// 目前使用的匯率
    pub fn fx_rate(&self, from: Currency, to: Currency) -> Decimal {
        self.fx().rate(from, to)
    }

    /// 手動新增匯率
    pub fn add_fx_rate(&self, from: Currency, to: Currency, rate: Decimal) -> Result<FxRate> {
        if rate <= Decimal::ZERO {
            return Err(IcmsError::InvalidInput(format!("匯率必須大於 0: {}", rate)));
        }
        self.store.insert_fx_rate(FxRate::new(from, to, rate, self.now()))
    }

    /// 從外部來源更新匯率；失敗時回傳 false 並沿用既有匯率
    pub fn refresh_fx_rates(&self, provider: &dyn FxRateProvider) -> bool {
        self.fx().refresh(provider, self.now())
    }

    /// 記錄付款
    ///
    /// 匯率與本位幣金額在此刻快照；供應商目前餘額以原幣金額扣減。
    pub fn record_payment(&self, request: PaymentRequest) -> Result<Payment> {
        request.validate()?;
        let order = self.require_order(request.order_id)?;
        let now = self.now();

        let conversion = self.fx().to_base(request.amount, request.currency);
        let payment = Payment::new(
            order.id,
            order.supplier_id,
            request.amount,
            request.currency,
            conversion.fx_rate,
            request.payment_date.unwrap_or(now),
            request.reference,
            now,
        );

        let payment = self.store.insert_payment(payment)?;
        if let Err(err) = self.store.adjust_supplier_balance(order.supplier_id, -payment.amount) {
            self.store.remove_payment(payment.id)?;
            return Err(err);
        }

        tracing::info!(
            "訂單 {} 付款 {} {}（匯率 {}，本位幣 {}）",
            order.po_number,
            payment.amount,
            payment.currency,
            payment.fx_rate,
            payment.base_amount
        );
        Ok(payment)
    }

    pub fn get_payment(&self, id: Uuid) -> Result<Payment> {
        self.store.get_payment(id).ok_or_else(|| IcmsError::not_found("payment", id))
    }

    pub fn list_payments(&self) -> Vec<Payment> {
        self.store.list_payments()
    }

    pub fn payments_for_order(&self, order_id: Uuid) -> Result<Vec<Payment>> {
        self.require_order(order_id)?;
        Ok(self.store.payments_for_order(order_id))
    }

    /// 修改付款
    ///
    /// 供應商餘額依原幣金額差異調整；更換幣別時重新取匯率，否則沿用原匯率。
    pub fn update_payment(&self, id: Uuid, update: PaymentUpdate) -> Result<Payment> {
        let amount = update.amount;
        if let Some(amount) = amount.filter(|a| *a <= Decimal::ZERO) {
            return Err(IcmsError::InvalidInput(format!("付款金額必須大於 0: {}", amount)));
        }

        // 匯率與日期先在鎖外準備好
        let fresh_rate = update
            .currency
            .map(|currency| (currency, self.fx().to_base(Decimal::ONE, currency).fx_rate));
        let payment_date = update
            .payment_date
            .as_deref()
            .map(|raw| parse_timestamp_or(raw, self.now()));
        let mut reference = update.reference;

        let (old, payment) = self.store.modify_payment(id, &mut |payment: &mut Payment| {
            if let Some(amount) = amount {
                payment.amount = amount;
            }
            if let Some((currency, rate)) = fresh_rate.filter(|(c, _)| *c != payment.currency) {
                payment.currency = currency;
                payment.fx_rate = rate;
            }
            if let Some(date) = payment_date {
                payment.payment_date = date;
            }
            if let Some(reference) = reference.take() {
                payment.reference = reference;
            }
            payment.base_amount = payment.amount * payment.fx_rate;
            Ok(())
        })?;

        // 差額以鎖內讀到的原金額計算
        let delta = old.amount - payment.amount;
        if !delta.is_zero() {
            self.store.adjust_supplier_balance(payment.supplier_id, delta)?;
        }

        tracing::info!("修改付款 {}：金額 {} → {}", payment.reference, old.amount, payment.amount);
        Ok(payment)
    }

    /// 刪除付款並回補供應商餘額
    pub fn delete_payment(&self, id: Uuid) -> Result<Payment> {
        let payment = self.store.remove_payment(id)?;

        match self.store.adjust_supplier_balance(payment.supplier_id, payment.amount) {
            Ok(balance) => tracing::info!("刪除付款 {}，供應商餘額回補為 {}", payment.reference, balance),
            Err(err) if err.is_not_found() => {
                tracing::warn!("刪除付款 {} 時找不到供應商 {}", payment.reference, payment.supplier_id)
            }
            Err(err) => return Err(err),
        }

        Ok(payment)
    }

    // ==================== 掃描與報表 ====================

    fn supplier_map(&self) -> HashMap<Uuid, Supplier> {
        self.store.list_suppliers().into_iter().map(|s| (s.id, s)).collect()
    }

    /// 應付款到期掃描
    pub fn scan_due_payments(&self) -> DueScan {
        DueScanner::scan(
            &self.store.list_orders(),
            &self.supplier_map(),
            &self.store.list_payments(),
            &self.config,
            self.now(),
        )
    }

    pub fn notification_feed(&self) -> NotificationFeed {
        NotificationFeed::from_scan(&self.scan_due_payments())
    }

    pub fn payments_summary(&self) -> PaymentsSummary {
        let orders: HashMap<Uuid, ImportOrder> = self.store.list_orders().into_iter().map(|o| (o.id, o)).collect();
        PaymentsSummary::build(&self.store.list_payments(), &orders, &self.scan_due_payments())
    }

    /// 供應商帳本
    pub fn build_supplier_ledger(&self, supplier_id: Uuid) -> Result<SupplierLedger> {
        let supplier = self.require_supplier(supplier_id)?;
        let orders = self.store.orders_for_supplier(supplier_id);
        let payments = self.store.payments_for_supplier(supplier_id);

        Ok(SupplierLedgerBuilder::build(&supplier, &orders, &payments))
    }

    /// 核對儲存餘額與帳本餘額
    pub fn reconcile_supplier_balance(&self, supplier_id: Uuid) -> Result<BalanceReconciliation> {
        let ledger = self.build_supplier_ledger(supplier_id)?;
        let supplier = self.require_supplier(supplier_id)?;
        let reconciliation = BalanceReconciliation::build(&supplier, &ledger);

        if !reconciliation.in_sync {
            tracing::debug!(
                "供應商 {} 餘額差異 {}（儲存 {}，帳本 {}）",
                supplier.code,
                reconciliation.difference,
                reconciliation.stored_balance,
                reconciliation.ledger_balance
            );
        }
        Ok(reconciliation)
    }

    pub fn supplier_wise_summary(&self) -> SupplierWiseSummary {
        SupplierWiseSummary::build(
            &self.store.list_suppliers(),
            &self.store.list_orders(),
            &self.store.list_payments(),
        )
    }

    pub fn container_wise_report(&self) -> ContainerWiseReport {
        ContainerWiseReport::build(&self.store.list_orders())
    }

    pub fn kpi_summary(&self) -> KpiSummary {
        KpiSummary::build(&self.store.list_orders(), &self.config)
    }

    pub fn demurrage_clock(&self) -> DemurrageReport {
        let ports: HashMap<Uuid, Port> = self.store.list_ports().into_iter().map(|p| (p.id, p)).collect();
        DemurrageCalculator::calculate(&self.store.list_orders(), &ports, &self.config, self.now())
    }

    /// ERP 匯出
    pub fn erp_export(&self, order_id: Uuid) -> Result<ErpExport> {
        let order = self.require_order(order_id)?;
        let supplier = self.store.get_supplier(order.supplier_id);
        let port = order.port_id.and_then(|id| self.store.get_port(id));
        let landed = LandedCostCalculator::calculate(&order, self.sku_lookup());
        let payments = self.store.payments_for_order(order_id);

        Ok(ErpExport::build(
            &order,
            supplier.as_ref(),
            port.as_ref(),
            &landed,
            &payments,
            self.now(),
        ))
    }
}
