//! # ICMS Core
//!
//! 進口與貨櫃管理的核心資料模型與類型定義

pub mod clock;
pub mod config;
pub mod ledger;
pub mod loading;
pub mod order;
pub mod payment;
pub mod reference;

// Re-export 主要類型
pub use clock::{parse_timestamp, parse_timestamp_or, whole_days_between, Clock, FixedClock, SystemClock};
pub use config::{EngineConfig, FallbackRate};
pub use ledger::{LedgerEntry, LedgerEntryType};
pub use loading::{ActualLoading, LoadingLine};
pub use order::{ContainerType, ImportOrder, ImportOrderItem, OrderStage, OrderStatus};
pub use payment::{Currency, FxRate, Payment, PaymentStatus};
pub use reference::{ratio, ContainerSpec, Port, Sku, Supplier};

/// ICMS 錯誤類型
#[derive(Debug, thiserror::Error)]
pub enum IcmsError {
    #[error("找不到 {entity}: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("資料衝突: {0}")]
    Conflict(String),

    #[error("目前狀態不允許此操作: {0}")]
    InvalidState(String),

    #[error("無效的輸入: {0}")]
    InvalidInput(String),

    #[error("序列化錯誤: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl IcmsError {
    /// 建立 NotFound 錯誤
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, IcmsError>;
