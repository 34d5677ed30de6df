//! # ICMS Calculation Engine
//!
//! 訂單成本、付款匯率、到期提醒與供應商帳本計算

pub mod demurrage;
pub mod due_date;
pub mod engine;
pub mod fx;
pub mod landed_cost;
pub mod ledger;
pub mod loading;
pub mod order_builder;
pub mod reports;
pub mod requests;

// Re-export 主要類型
pub use demurrage::{DemurrageCalculator, DemurrageDetail, DemurrageReport};
pub use due_date::{DuePayment, DueScan, DueScanner, Notification, Severity};
pub use engine::CostingEngine;
pub use fx::{Conversion, FxConverter, FxRateProvider};
pub use landed_cost::{CostSummary, ItemCostBreakdown, LandedCost, LandedCostCalculator};
pub use ledger::{LedgerSummary, LedgerSupplier, SupplierLedger, SupplierLedgerBuilder};
pub use loading::{SkuVariance, VarianceAnalysis, VarianceAnalyzer, VarianceSummary};
pub use order_builder::{OrderBuilder, OrderRequest, OrderTotals};
pub use reports::{
    BalanceReconciliation, ContainerWiseReport, ErpExport, KpiSummary, NotificationFeed, PaymentsSummary,
    SupplierWiseSummary,
};
pub use requests::{
    LoadingRequest, OrderUpdate, PaymentRequest, PaymentUpdate, PortDraft, SkuDraft, SkuUpdate, SupplierDraft,
    SupplierUpdate,
};
