//! Service layer
//!
//! Contains business logic separated from HTTP handlers.
//! Services orchestrate the database, the strategy cache, media storage and
//! the image analyzer.

mod analytics;
mod appointment;
mod approval;
mod competition;
mod dashboard;
mod photo;
mod ranking;
mod settings;
mod user;

pub use analytics::{
    AnalyticsService, AppointmentPerformance, CompetitionStandings, DEFAULT_SUMMARY_DAYS,
    DEFAULT_TRENDING_HOURS, DEFAULT_TRENDING_LIMIT, InteractionSummary, MAX_SUMMARY_DAYS,
    MAX_TRENDING_HOURS, MAX_TRENDING_LIMIT, PhotographerPerformance, RankedEntry, ThemePopularity,
    TrendingEntry, UserReport, bounded, competition_score, theme_popularity,
};
pub use appointment::{
    ActionInput, AppointmentAction, AppointmentDetail, AppointmentService, AppointmentStatistics,
    BookingRequest,
};
pub use approval::{ApprovalService, ApprovalStats, BulkOutcome, approval_rate};
pub use competition::{CompetitionDetail, CompetitionInput, CompetitionService};
pub use dashboard::{AnalysisReport, CategoryShare, DashboardService, QualityStats};
pub use photo::{InteractionOutcome, PhotoDetail, PhotoService, UploadRequest};
pub use ranking::{
    DEFAULT_RANKING_LIMIT, MAX_RANKING_LIMIT, RankedPhotographer, RankingService, RankingStats,
    photographer_rating, validate_limit,
};
pub use settings::{
    AppointmentSettings, CompetitionRules, ImageProcessing, RolePermissions, SettingsService,
};
pub use user::{AdminUserChanges, IssuedToken, Registration, UserService, UserStatistics};

use chrono::{DateTime, NaiveTime, Utc};
use serde::Serialize;

use crate::error::AppError;

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Validated 1-based page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: i64,
    pub size: i64,
}

impl Page {
    /// # Errors
    /// `Validation` when `page < 1`, `size` is outside `1..=100`, or the
    /// offset would not fit in an `i64`
    pub fn new(page: Option<i64>, size: Option<i64>) -> Result<Self, AppError> {
        let page = page.unwrap_or(1);
        let size = size.unwrap_or(DEFAULT_PAGE_SIZE);
        if page < 1 {
            return Err(AppError::Validation("page must be at least 1".to_string()));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&size) {
            return Err(AppError::Validation(format!(
                "size must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }
        if (page - 1).checked_mul(size).is_none() {
            return Err(AppError::Validation("page is out of range".to_string()));
        }
        Ok(Self { page, size })
    }

    pub fn limit(&self) -> i64 {
        self.size
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.size
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            page: 1,
            size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// One page of results with totals
#[derive(Debug, Clone, Serialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub size: i64,
    pub pages: i64,
}

impl<T> Paginated<T> {
    pub fn new(items: Vec<T>, total: i64, page: Page) -> Self {
        Self {
            items,
            total,
            page: page.page,
            size: page.size,
            pages: (total + page.size - 1) / page.size,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            size: self.size,
            pages: self.pages,
        }
    }
}

/// Start of the UTC day containing `now`
pub fn utc_midnight(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive().and_time(NaiveTime::MIN).and_utc()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn page_defaults_and_offsets() {
        let page = Page::new(None, None).unwrap();
        assert_eq!(page, Page::default());
        assert_eq!(page.offset(), 0);

        let third = Page::new(Some(3), Some(10)).unwrap();
        assert_eq!(third.offset(), 20);
        assert_eq!(third.limit(), 10);
    }

    #[test]
    fn out_of_range_pages_are_rejected() {
        assert!(Page::new(Some(0), None).is_err());
        assert!(Page::new(None, Some(0)).is_err());
        assert!(Page::new(None, Some(101)).is_err());
        assert!(Page::new(None, Some(100)).is_ok());
    }

    #[test]
    fn pages_past_the_offset_range_are_rejected() {
        assert!(matches!(
            Page::new(Some(i64::MAX), Some(100)),
            Err(AppError::Validation(_))
        ));

        let last = i64::MAX / 100 + 1;
        assert_eq!(Page::new(Some(last), Some(100)).unwrap().offset(), (last - 1) * 100);
        assert!(Page::new(Some(last + 1), Some(100)).is_err());
    }

    #[test]
    fn pages_round_up() {
        let page = Page::new(Some(1), Some(20)).unwrap();
        assert_eq!(Paginated::new(vec![0; 20], 41, page).pages, 3);
        assert_eq!(Paginated::<i32>::new(vec![], 0, page).pages, 0);
    }

    #[test]
    fn midnight_truncates_the_clock() {
        let midnight = utc_midnight(Utc::now());
        assert_eq!(midnight.hour(), 0);
        assert_eq!(midnight.minute(), 0);
        assert_eq!(midnight.second(), 0);
    }
}
