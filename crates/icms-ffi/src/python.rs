//! Python 綁定實現
//!
//! 輸入與輸出皆為 JSON 字串；金額以十進位字串序列化。

use std::sync::Arc;

use icms_calc::{
    CostingEngine, LoadingRequest, OrderRequest, OrderUpdate, PaymentRequest, PaymentUpdate, PortDraft, SkuDraft,
    SkuUpdate, SupplierDraft, SupplierUpdate,
};
use icms_core::{ContainerSpec, Currency, EngineConfig, IcmsError, LoadingLine, OrderStatus};
use icms_store::{MemoryStore, StoreSnapshot};
use pyo3::exceptions::{PyLookupError, PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

fn to_py_err(err: IcmsError) -> PyErr {
    match err {
        IcmsError::NotFound { .. } => PyLookupError::new_err(err.to_string()),
        IcmsError::InvalidState(_) => PyRuntimeError::new_err(err.to_string()),
        IcmsError::Conflict(_) | IcmsError::InvalidInput(_) | IcmsError::Serialization(_) => {
            PyValueError::new_err(err.to_string())
        }
    }
}

/// 安裝 tracing 日誌輸出
///
/// `filter` 為 EnvFilter 語法（例如 `"icms_calc=debug,info"`），未指定時讀取
/// `RUST_LOG`，再退回 `info`。已安裝過時回傳 False。
#[pyfunction]
#[pyo3(signature = (filter=None))]
pub fn init_logging(filter: Option<&str>) -> PyResult<bool> {
    let filter = match filter {
        Some(directives) => EnvFilter::try_new(directives)
            .map_err(|e| PyValueError::new_err(format!("Invalid log filter: {}", e)))?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    Ok(tracing_subscriber::fmt().with_env_filter(filter).try_init().is_ok())
}

fn from_json<T: DeserializeOwned>(raw: &str) -> PyResult<T> {
    serde_json::from_str(raw).map_err(|e| PyValueError::new_err(format!("Invalid JSON: {}", e)))
}

fn to_json<T: Serialize>(value: &T) -> PyResult<String> {
    serde_json::to_string(value).map_err(|e| PyValueError::new_err(format!("Serialization failed: {}", e)))
}

fn parse_id(raw: &str) -> PyResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| PyValueError::new_err(format!("Invalid id: {}", raw)))
}

fn parse_currency(raw: &str) -> PyResult<Currency> {
    Currency::from_code(raw).ok_or_else(|| PyValueError::new_err(format!("Unsupported currency: {}", raw)))
}

fn to_decimal(field: &str, value: f64) -> PyResult<Decimal> {
    Decimal::try_from(value).map_err(|_| PyValueError::new_err(format!("Invalid {}: {}", field, value)))
}

/// Python 引擎配置
#[pyclass(name = "EngineConfig")]
#[derive(Clone)]
pub struct PyEngineConfig {
    #[pyo3(get, set)]
    pub base_currency: String,
    #[pyo3(get, set)]
    pub default_duty_rate: f64,
    #[pyo3(get, set)]
    pub default_transit_days: u32,
    #[pyo3(get, set)]
    pub high_severity_days: i64,
    #[pyo3(get, set)]
    pub medium_severity_days: i64,
    #[pyo3(get, set)]
    pub default_demurrage_free_days: u32,
    #[pyo3(get, set)]
    pub default_demurrage_daily_rate: f64,
}

#[pymethods]
impl PyEngineConfig {
    #[new]
    #[pyo3(signature = (base_currency="INR", default_duty_rate=0.1))]
    fn new(base_currency: &str, default_duty_rate: f64) -> Self {
        let defaults = EngineConfig::default();
        Self {
            base_currency: base_currency.to_string(),
            default_duty_rate,
            default_transit_days: defaults.default_transit_days,
            high_severity_days: defaults.high_severity_days,
            medium_severity_days: defaults.medium_severity_days,
            default_demurrage_free_days: defaults.default_demurrage_free_days,
            default_demurrage_daily_rate: defaults.default_demurrage_daily_rate.to_f64().unwrap_or(50.0),
        }
    }
}

/// 內部方法實現（不暴露給 Python）
impl PyEngineConfig {
    pub(crate) fn to_rust_config(&self) -> PyResult<EngineConfig> {
        let config = EngineConfig::new()
            .with_base_currency(parse_currency(&self.base_currency)?)
            .with_default_duty_rate(to_decimal("default_duty_rate", self.default_duty_rate)?)
            .with_severity_days(self.high_severity_days, self.medium_severity_days)
            .with_demurrage_defaults(
                self.default_demurrage_free_days,
                to_decimal("default_demurrage_daily_rate", self.default_demurrage_daily_rate)?,
            );

        let config = EngineConfig {
            default_transit_days: self.default_transit_days,
            ..config
        };
        config.validate().map_err(to_py_err)?;
        Ok(config)
    }
}

/// Python 成本引擎（記憶體儲存）
#[pyclass(name = "CostingEngine")]
pub struct PyCostingEngine {
    engine: CostingEngine,
    store: Arc<MemoryStore>,
}

#[pymethods]
impl PyCostingEngine {
    #[new]
    #[pyo3(signature = (config=None, snapshot_json=None))]
    fn new(config: Option<PyRef<'_, PyEngineConfig>>, snapshot_json: Option<&str>) -> PyResult<Self> {
        let config = match config {
            Some(config) => config.to_rust_config()?,
            None => EngineConfig::default(),
        };
        let store = match snapshot_json {
            Some(raw) => {
                let snapshot = StoreSnapshot::from_json(raw).map_err(to_py_err)?;
                MemoryStore::from_snapshot(snapshot).map_err(to_py_err)?
            }
            None => MemoryStore::new(),
        };

        let store = Arc::new(store);
        Ok(Self {
            engine: CostingEngine::new(store.clone(), config),
            store,
        })
    }

    /// 匯出完整儲存快照
    fn export_snapshot(&self) -> PyResult<String> {
        self.store.snapshot().to_json().map_err(to_py_err)
    }

    // ----- 主檔 -----

    fn create_sku(&self, draft_json: &str) -> PyResult<String> {
        let draft: SkuDraft = from_json(draft_json)?;
        to_json(&self.engine.create_sku(draft).map_err(to_py_err)?)
    }

    fn update_sku(&self, sku_id: &str, update_json: &str) -> PyResult<String> {
        let update: SkuUpdate = from_json(update_json)?;
        to_json(&self.engine.update_sku(parse_id(sku_id)?, update).map_err(to_py_err)?)
    }

    fn delete_sku(&self, sku_id: &str) -> PyResult<()> {
        self.engine.delete_sku(parse_id(sku_id)?).map_err(to_py_err)
    }

    fn list_skus(&self) -> PyResult<String> {
        to_json(&self.engine.list_skus())
    }

    fn create_supplier(&self, draft_json: &str) -> PyResult<String> {
        let draft: SupplierDraft = from_json(draft_json)?;
        to_json(&self.engine.create_supplier(draft).map_err(to_py_err)?)
    }

    fn get_supplier(&self, supplier_id: &str) -> PyResult<String> {
        to_json(&self.engine.get_supplier(parse_id(supplier_id)?).map_err(to_py_err)?)
    }

    fn update_supplier(&self, supplier_id: &str, update_json: &str) -> PyResult<String> {
        let update: SupplierUpdate = from_json(update_json)?;
        to_json(&self.engine.update_supplier(parse_id(supplier_id)?, update).map_err(to_py_err)?)
    }

    fn delete_supplier(&self, supplier_id: &str) -> PyResult<()> {
        self.engine.delete_supplier(parse_id(supplier_id)?).map_err(to_py_err)
    }

    fn list_suppliers(&self) -> PyResult<String> {
        to_json(&self.engine.list_suppliers())
    }

    fn create_port(&self, draft_json: &str) -> PyResult<String> {
        let draft: PortDraft = from_json(draft_json)?;
        to_json(&self.engine.create_port(draft).map_err(to_py_err)?)
    }

    fn list_ports(&self) -> PyResult<String> {
        to_json(&self.engine.list_ports())
    }

    fn create_container(&self, spec_json: &str) -> PyResult<String> {
        let spec: ContainerSpec = from_json(spec_json)?;
        to_json(&self.engine.create_container(spec).map_err(to_py_err)?)
    }

    fn list_containers(&self) -> PyResult<String> {
        to_json(&self.engine.list_containers())
    }

    // ----- 訂單 -----

    fn build_order(&self, request_json: &str) -> PyResult<String> {
        let request: OrderRequest = from_json(request_json)?;
        to_json(&self.engine.build_order(request).map_err(to_py_err)?)
    }

    fn get_order(&self, order_id: &str) -> PyResult<String> {
        to_json(&self.engine.get_order(parse_id(order_id)?).map_err(to_py_err)?)
    }

    fn list_orders(&self) -> PyResult<String> {
        to_json(&self.engine.list_orders())
    }

    /// `status` 使用線上標籤，例如 "In Transit"
    fn update_order_status(&self, order_id: &str, status: &str) -> PyResult<String> {
        let status: OrderStatus = serde_json::from_value(serde_json::Value::String(status.to_string()))
            .map_err(|_| PyValueError::new_err(format!("Invalid order status: {}", status)))?;
        to_json(&self.engine.update_order_status(parse_id(order_id)?, status).map_err(to_py_err)?)
    }

    fn update_order(&self, order_id: &str, update_json: &str) -> PyResult<String> {
        let update: OrderUpdate = from_json(update_json)?;
        to_json(&self.engine.update_order(parse_id(order_id)?, update).map_err(to_py_err)?)
    }

    fn delete_order(&self, order_id: &str) -> PyResult<()> {
        self.engine.delete_order(parse_id(order_id)?).map_err(to_py_err)
    }

    fn landed_cost(&self, order_id: &str) -> PyResult<String> {
        to_json(&self.engine.compute_landed_cost(parse_id(order_id)?).map_err(to_py_err)?)
    }

    // ----- 裝櫃 -----

    fn record_loading(&self, request_json: &str) -> PyResult<String> {
        let request: LoadingRequest = from_json(request_json)?;
        to_json(&self.engine.record_loading(request).map_err(to_py_err)?)
    }

    fn update_loading(&self, loading_id: &str, items_json: &str) -> PyResult<String> {
        let items: Vec<LoadingLine> = from_json(items_json)?;
        to_json(&self.engine.update_loading(parse_id(loading_id)?, items).map_err(to_py_err)?)
    }

    fn lock_loading(&self, loading_id: &str) -> PyResult<String> {
        to_json(&self.engine.lock_loading(parse_id(loading_id)?).map_err(to_py_err)?)
    }

    fn delete_loading(&self, loading_id: &str) -> PyResult<()> {
        self.engine.delete_loading(parse_id(loading_id)?).map_err(to_py_err)
    }

    fn variance_analysis(&self) -> PyResult<String> {
        to_json(&self.engine.variance_analysis())
    }

    // ----- 付款與匯率 -----

    fn record_payment(&self, request_json: &str) -> PyResult<String> {
        let request: PaymentRequest = from_json(request_json)?;
        to_json(&self.engine.record_payment(request).map_err(to_py_err)?)
    }

    fn update_payment(&self, payment_id: &str, update_json: &str) -> PyResult<String> {
        let update: PaymentUpdate = from_json(update_json)?;
        to_json(&self.engine.update_payment(parse_id(payment_id)?, update).map_err(to_py_err)?)
    }

    fn delete_payment(&self, payment_id: &str) -> PyResult<String> {
        to_json(&self.engine.delete_payment(parse_id(payment_id)?).map_err(to_py_err)?)
    }

    fn list_payments(&self) -> PyResult<String> {
        to_json(&self.engine.list_payments())
    }

    fn add_fx_rate(&self, from_currency: &str, to_currency: &str, rate: f64) -> PyResult<String> {
        let stored = self
            .engine
            .add_fx_rate(
                parse_currency(from_currency)?,
                parse_currency(to_currency)?,
                to_decimal("rate", rate)?,
            )
            .map_err(to_py_err)?;
        to_json(&stored)
    }

    /// 目前匯率（十進位字串）
    fn fx_rate(&self, from_currency: &str, to_currency: &str) -> PyResult<String> {
        let rate = self
            .engine
            .fx_rate(parse_currency(from_currency)?, parse_currency(to_currency)?);
        Ok(rate.to_string())
    }

    // ----- 報表 -----

    fn scan_due_payments(&self) -> PyResult<String> {
        to_json(&self.engine.scan_due_payments())
    }

    fn notifications(&self) -> PyResult<String> {
        to_json(&self.engine.notification_feed())
    }

    fn payments_summary(&self) -> PyResult<String> {
        to_json(&self.engine.payments_summary())
    }

    fn supplier_ledger(&self, supplier_id: &str) -> PyResult<String> {
        to_json(&self.engine.build_supplier_ledger(parse_id(supplier_id)?).map_err(to_py_err)?)
    }

    fn reconcile_supplier_balance(&self, supplier_id: &str) -> PyResult<String> {
        to_json(
            &self
                .engine
                .reconcile_supplier_balance(parse_id(supplier_id)?)
                .map_err(to_py_err)?,
        )
    }

    fn supplier_wise_summary(&self) -> PyResult<String> {
        to_json(&self.engine.supplier_wise_summary())
    }

    fn container_wise_report(&self) -> PyResult<String> {
        to_json(&self.engine.container_wise_report())
    }

    fn kpi_summary(&self) -> PyResult<String> {
        to_json(&self.engine.kpi_summary())
    }

    fn demurrage_clock(&self) -> PyResult<String> {
        to_json(&self.engine.demurrage_clock())
    }

    fn erp_export(&self, order_id: &str) -> PyResult<String> {
        to_json(&self.engine.erp_export(parse_id(order_id)?).map_err(to_py_err)?)
    }
}
