//! Admin dashboard aggregates and audit log

use chrono::{Datelike, TimeZone, Utc};
use serde::Serialize;
use std::sync::Arc;

use super::Page;
use crate::analysis::{AnalyzerPerformance, ImageAnalyzer};
use crate::data::{AnalysisRow, Database, DashboardCounts, SystemLog};
use crate::error::AppError;

const RECENT_ANALYSES: i64 = 10;

#[derive(Debug, Clone, Serialize)]
pub struct CategoryShare {
    pub category: String,
    pub count: i64,
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct QualityStats {
    pub average_quality: f64,
    pub high_quality_count: i64,
    pub medium_quality_count: i64,
    pub low_quality_count: i64,
}

/// Analyzer report for the admin back-office
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub total_photos: i64,
    pub analyzed_photos: i64,
    pub analysis_accuracy: f64,
    pub category_distribution: Vec<CategoryShare>,
    pub quality_stats: QualityStats,
    pub recent_analysis: Vec<AnalysisRow>,
    pub system_performance: AnalyzerPerformance,
}

fn percentage(part: i64, whole: i64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    (part as f64 / whole as f64 * 1000.0).round() / 10.0
}

/// Dashboard service
pub struct DashboardService {
    db: Arc<Database>,
    analyzer: Arc<ImageAnalyzer>,
}

impl DashboardService {
    pub fn new(db: Arc<Database>, analyzer: Arc<ImageAnalyzer>) -> Self {
        Self { db, analyzer }
    }

    /// Site totals; "this month" starts at the first of the current UTC month
    pub async fn counts(&self) -> Result<DashboardCounts, AppError> {
        let now = Utc::now();
        let month_start = Utc
            .with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
            .single()
            .unwrap_or(now);
        self.db.dashboard_counts(month_start, now).await
    }

    pub async fn analysis(&self) -> Result<AnalysisReport, AppError> {
        let counts = self.db.analysis_counts().await?;
        let themes = self.db.theme_distribution().await?;
        let themed: i64 = themes.iter().map(|row| row.count).sum();

        let category_distribution = themes
            .into_iter()
            .map(|row| CategoryShare {
                percentage: percentage(row.count, themed),
                category: row.theme,
                count: row.count,
            })
            .collect();

        Ok(AnalysisReport {
            total_photos: counts.total_photos,
            analyzed_photos: counts.analyzed_photos,
            analysis_accuracy: percentage(counts.confident_photos, counts.analyzed_photos),
            category_distribution,
            quality_stats: QualityStats {
                average_quality: counts
                    .average_quality
                    .map(|q| (q * 1000.0).round() / 1000.0)
                    .unwrap_or(0.0),
                high_quality_count: counts.high_quality_count,
                medium_quality_count: counts.medium_quality_count,
                low_quality_count: counts.low_quality_count,
            },
            recent_analysis: self.db.recent_analyses(RECENT_ANALYSES).await?,
            system_performance: self.analyzer.performance(),
        })
    }

    /// Audit entries, newest first
    pub async fn logs(
        &self,
        action: Option<&str>,
        page: Page,
    ) -> Result<(Vec<SystemLog>, i64), AppError> {
        self.db
            .list_system_logs(action, page.limit(), page.offset())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentage_is_zero_without_a_base() {
        assert_eq!(percentage(3, 0), 0.0);
        assert_eq!(percentage(1, 3), 33.3);
        assert_eq!(percentage(4, 4), 100.0);
    }
}
