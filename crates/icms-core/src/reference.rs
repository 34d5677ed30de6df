//! 主檔資料模型（SKU、供應商、港口、貨櫃規格）

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::order::ContainerType;
use crate::payment::Currency;

/// 物料（SKU）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sku {
    pub id: Uuid,

    /// SKU 代碼（唯一）
    pub sku_code: String,

    pub description: String,

    /// HSN 稅則編號
    pub hsn_code: Option<String>,

    /// 單位重量（kg）
    pub weight_per_unit: Decimal,

    /// 單位材積（m³）
    #[serde(alias = "cbm_per_unit")]
    pub volume_per_unit: Decimal,

    /// 單位成本
    pub unit_cost: Option<Decimal>,

    pub category: Option<String>,

    #[serde(deserialize_with = "crate::clock::lenient::timestamp")]
    pub created_at: DateTime<Utc>,
}

impl Sku {
    /// 創建新的 SKU
    pub fn new(sku_code: String, weight_per_unit: Decimal, volume_per_unit: Decimal) -> Self {
        Self {
            id: Uuid::new_v4(),
            description: sku_code.clone(),
            sku_code,
            hsn_code: None,
            weight_per_unit,
            volume_per_unit,
            unit_cost: None,
            category: None,
            created_at: Utc::now(),
        }
    }

    /// 建構器模式：設置描述
    pub fn with_description(mut self, description: String) -> Self {
        self.description = description;
        self
    }

    /// 建構器模式：設置 HSN 編號
    pub fn with_hsn_code(mut self, hsn_code: String) -> Self {
        self.hsn_code = Some(hsn_code);
        self
    }

    /// 建構器模式：設置單位成本
    pub fn with_unit_cost(mut self, unit_cost: Decimal) -> Self {
        self.unit_cost = Some(unit_cost);
        self
    }

    /// 建構器模式：設置分類
    pub fn with_category(mut self, category: String) -> Self {
        self.category = Some(category);
        self
    }

    /// 指定數量的總重量
    pub fn weight_for(&self, quantity: u32) -> Decimal {
        self.weight_per_unit * Decimal::from(quantity)
    }

    /// 指定數量的總材積
    pub fn volume_for(&self, quantity: u32) -> Decimal {
        self.volume_per_unit * Decimal::from(quantity)
    }
}

/// 供應商
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Supplier {
    pub id: Uuid,

    /// 供應商代碼（唯一）
    pub code: String,

    pub name: String,

    /// 本位幣
    pub base_currency: Currency,

    /// 期初餘額
    pub opening_balance: Decimal,

    /// 目前餘額（只由付款建立/刪除/修改變動）
    pub current_balance: Decimal,

    /// 信用期（天）
    pub credit_term_days: u32,

    /// 信用條件類型（NET/COD/ADVANCE/LC 等，自由標籤）
    pub credit_term_type: String,

    pub country: Option<String>,

    #[serde(deserialize_with = "crate::clock::lenient::timestamp")]
    pub created_at: DateTime<Utc>,
}

impl Supplier {
    /// 創建新的供應商（預設 NET 30）
    pub fn new(code: String, name: String, base_currency: Currency) -> Self {
        Self {
            id: Uuid::new_v4(),
            code,
            name,
            base_currency,
            opening_balance: Decimal::ZERO,
            current_balance: Decimal::ZERO,
            credit_term_days: 30,
            credit_term_type: "NET".to_string(),
            country: None,
            created_at: Utc::now(),
        }
    }

    /// 建構器模式：設置期初餘額（同時作為目前餘額起點）
    pub fn with_opening_balance(mut self, balance: Decimal) -> Self {
        self.opening_balance = balance;
        self.current_balance = balance;
        self
    }

    /// 建構器模式：設置信用條件
    pub fn with_credit_terms(mut self, days: u32, term_type: impl Into<String>) -> Self {
        self.credit_term_days = days;
        self.credit_term_type = term_type.into();
        self
    }

    /// 建構器模式：設置國家
    pub fn with_country(mut self, country: String) -> Self {
        self.country = Some(country);
        self
    }
}

/// 港口
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Port {
    pub id: Uuid,

    /// 港口代碼（唯一）
    pub code: String,

    pub name: String,

    pub country: Option<String>,

    /// 運輸天數（用於計算 ETA）
    pub transit_days: u32,

    /// 滯港免費天數
    pub demurrage_free_days: u32,

    /// 滯港日費率
    pub demurrage_daily_rate: Decimal,

    #[serde(deserialize_with = "crate::clock::lenient::timestamp")]
    pub created_at: DateTime<Utc>,
}

impl Port {
    /// 創建新的港口（預設運輸 30 天、免費 7 天、日費率 50）
    pub fn new(code: String, name: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            code,
            name,
            country: None,
            transit_days: 30,
            demurrage_free_days: 7,
            demurrage_daily_rate: Decimal::from(50),
            created_at: Utc::now(),
        }
    }

    /// 建構器模式：設置運輸天數
    pub fn with_transit_days(mut self, days: u32) -> Self {
        self.transit_days = days;
        self
    }

    /// 建構器模式：設置滯港參數
    pub fn with_demurrage(mut self, free_days: u32, daily_rate: Decimal) -> Self {
        self.demurrage_free_days = free_days;
        self.demurrage_daily_rate = daily_rate;
        self
    }

    /// 建構器模式：設置國家
    pub fn with_country(mut self, country: String) -> Self {
        self.country = Some(country);
        self
    }
}

/// 貨櫃規格（每種櫃型一筆）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerSpec {
    pub container_type: ContainerType,

    /// 最大載重（kg）
    pub max_weight: Decimal,

    /// 最大材積（m³）
    #[serde(alias = "max_cbm")]
    pub max_volume: Decimal,

    /// 每櫃運費
    pub freight_rate: Decimal,
}

impl ContainerSpec {
    pub fn new(container_type: ContainerType, max_weight: Decimal, max_volume: Decimal) -> Self {
        Self {
            container_type,
            max_weight,
            max_volume,
            freight_rate: Decimal::ZERO,
        }
    }

    /// 建構器模式：設置運費
    pub fn with_freight_rate(mut self, rate: Decimal) -> Self {
        self.freight_rate = rate;
        self
    }

    /// 貨櫃使用率（%）：重量與材積比例取大者，不設上限
    pub fn utilization(&self, total_weight: Decimal, total_volume: Decimal) -> Decimal {
        let by_weight = ratio(total_weight, self.max_weight);
        let by_volume = ratio(total_volume, self.max_volume);
        by_weight.max(by_volume) * Decimal::ONE_HUNDRED
    }
}

/// 比例計算，分母為零時回傳 0
pub fn ratio(part: Decimal, whole: Decimal) -> Decimal {
    if whole.is_zero() {
        Decimal::ZERO
    } else {
        part / whole
    }
}
