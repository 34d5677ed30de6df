//! # ICMS
//!
//! 進口訂單成本與供應商帳務引擎
//!
//! - [`core`]：領域模型、配置、時鐘與錯誤類型
//! - [`store`]：儲存介面與記憶體實作
//! - [`calc`]：訂單、到岸成本、匯率、到期提醒、帳本與報表計算

pub use icms_calc as calc;
pub use icms_core as core;
pub use icms_store as store;

pub use icms_calc::CostingEngine;
pub use icms_core::{EngineConfig, IcmsError, Result};
