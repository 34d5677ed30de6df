//! 裝櫃差異分析

use std::collections::HashMap;

use icms_core::{ActualLoading, LoadingLine};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 裝櫃差異彙總
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VarianceSummary {
    pub total_loadings: usize,
    pub avg_quantity_variance: Decimal,
    pub avg_weight_variance: Decimal,
    pub avg_value_variance: Decimal,
    /// 實裝多於計劃的筆數
    pub positive_variances: usize,
    /// 實裝少於計劃的筆數
    pub negative_variances: usize,
}

/// 單一 SKU 的累計差異
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkuVariance {
    pub sku_id: Uuid,
    pub total_variance_quantity: i64,
    pub total_variance_value: Decimal,
    pub occurrence_count: usize,
}

/// 差異分析結果
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VarianceAnalysis {
    pub summary: VarianceSummary,
    pub sku_variances: Vec<SkuVariance>,
}

pub struct VarianceAnalyzer;

impl VarianceAnalyzer {
    /// 彙總所有裝櫃記錄的差異
    ///
    /// SKU 依數量差異絕對值由大到小排序。
    pub fn analyze(loadings: &[ActualLoading]) -> VarianceAnalysis {
        if loadings.is_empty() {
            return VarianceAnalysis::default();
        }

        let count = Decimal::from(loadings.len());
        let summary = VarianceSummary {
            total_loadings: loadings.len(),
            avg_quantity_variance: loadings
                .iter()
                .map(|l| Decimal::from(l.total_variance_quantity))
                .sum::<Decimal>()
                / count,
            avg_weight_variance: loadings.iter().map(|l| l.total_variance_weight).sum::<Decimal>() / count,
            avg_value_variance: loadings.iter().map(|l| l.total_variance_value).sum::<Decimal>() / count,
            positive_variances: loadings.iter().filter(|l| l.total_variance_quantity > 0).count(),
            negative_variances: loadings.iter().filter(|l| l.total_variance_quantity < 0).count(),
        };

        let mut by_sku: HashMap<Uuid, SkuVariance> = HashMap::new();
        for line in loadings.iter().flat_map(|l| l.items.iter()) {
            Self::accumulate(&mut by_sku, line);
        }

        let mut sku_variances: Vec<SkuVariance> = by_sku.into_values().collect();
        sku_variances.sort_by(|a, b| {
            b.total_variance_quantity
                .abs()
                .cmp(&a.total_variance_quantity.abs())
                .then(a.sku_id.cmp(&b.sku_id))
        });

        VarianceAnalysis { summary, sku_variances }
    }

    fn accumulate(by_sku: &mut HashMap<Uuid, SkuVariance>, line: &LoadingLine) {
        let entry = by_sku.entry(line.sku_id).or_insert_with(|| SkuVariance {
            sku_id: line.sku_id,
            total_variance_quantity: 0,
            total_variance_value: Decimal::ZERO,
            occurrence_count: 0,
        });
        entry.total_variance_quantity += line.variance_quantity;
        entry.total_variance_value += line.variance_value;
        entry.occurrence_count += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    #[test]
    fn test_variance_summary() {
        let now = Utc::now();
        let sku_a = Uuid::new_v4();
        let sku_b = Uuid::new_v4();

        let loadings = vec![
            ActualLoading::new(
                Uuid::new_v4(),
                vec![
                    LoadingLine::new(sku_a, 100, 90).with_value(dec!(1000), dec!(900)),
                    LoadingLine::new(sku_b, 10, 12).with_value(dec!(100), dec!(120)),
                ],
                now,
                now,
            ),
            ActualLoading::new(
                Uuid::new_v4(),
                vec![LoadingLine::new(sku_a, 50, 46).with_value(dec!(500), dec!(460))],
                now,
                now,
            ),
        ];

        let analysis = VarianceAnalyzer::analyze(&loadings);

        assert_eq!(analysis.summary.total_loadings, 2);
        assert_eq!(analysis.summary.avg_quantity_variance, dec!(-6));
        assert_eq!(analysis.summary.negative_variances, 2);
        assert_eq!(analysis.summary.positive_variances, 0);

        assert_eq!(analysis.sku_variances[0].sku_id, sku_a);
        assert_eq!(analysis.sku_variances[0].total_variance_quantity, -14);
        assert_eq!(analysis.sku_variances[0].total_variance_value, dec!(-140));
        assert_eq!(analysis.sku_variances[0].occurrence_count, 2);
        assert_eq!(analysis.sku_variances[1].total_variance_quantity, 2);
    }

    #[test]
    fn test_empty_loadings() {
        let analysis = VarianceAnalyzer::analyze(&[]);
        assert_eq!(analysis.summary, VarianceSummary::default());
        assert!(analysis.sku_variances.is_empty());
    }
}
