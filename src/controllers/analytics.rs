use super::{Refresh, ResourceController, ScreenQuery};
use crate::domain::request::RequestDescriptor;
use crate::domain::ApiError;
use crate::infrastructure::api_client::RequestExecutor;
use crate::notify::LoadingIndicator;
use chrono::{Days, NaiveDate};
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DateRangeError {
    #[error("invalid date '{0}', expected YYYY-MM-DD")]
    Parse(String),
    #[error("end date {end} is before start date {start}")]
    Inverted { start: NaiveDate, end: NaiveDate },
}

/// Inclusive date range sent as `YYYY-MM-DD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, DateRangeError> {
        if end < start {
            return Err(DateRangeError::Inverted { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn parse(start: &str, end: &str) -> Result<Self, DateRangeError> {
        let parse = |s: &str| {
            NaiveDate::parse_from_str(s, DATE_FORMAT).map_err(|_| DateRangeError::Parse(s.to_string()))
        };
        Self::new(parse(start)?, parse(end)?)
    }

    /// The `days` days ending on `today`, inclusive.
    pub fn last_days(today: NaiveDate, days: u64) -> Self {
        let start = today
            .checked_sub_days(Days::new(days.saturating_sub(1)))
            .unwrap_or(NaiveDate::MIN);
        Self { start, end: today }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn start_param(&self) -> String {
        self.start.format(DATE_FORMAT).to_string()
    }

    pub fn end_param(&self) -> String {
        self.end.format(DATE_FORMAT).to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyticsQuery {
    pub shop: String,
    pub range: DateRange,
}

impl ScreenQuery for AnalyticsQuery {
    fn read_request(&self) -> Option<RequestDescriptor> {
        Some(
            RequestDescriptor::get("/api/analytics")
                .query("shop", &self.shop)
                .query("start_date", self.range.start_param())
                .query("end_date", self.range.end_param()),
        )
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DailyMetric {
    pub date: String,
    #[serde(default)]
    pub revenue: f64,
    #[serde(default)]
    pub orders: u64,
    #[serde(default)]
    pub views: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalyticsReport {
    #[serde(default, alias = "metrics")]
    pub daily: Vec<DailyMetric>,
    #[serde(default)]
    pub currency: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalyticsSummary {
    pub revenue: f64,
    pub orders: u64,
    pub views: u64,
    /// Orders per view, zero without views.
    pub conversion_rate: f64,
    pub days: usize,
}

impl AnalyticsReport {
    pub fn summary(&self) -> AnalyticsSummary {
        let revenue = self.daily.iter().map(|day| day.revenue).sum();
        let orders = self.daily.iter().map(|day| day.orders).sum();
        let views: u64 = self.daily.iter().map(|day| day.views).sum();
        let conversion_rate = if views == 0 {
            0.0
        } else {
            orders as f64 / views as f64
        };

        AnalyticsSummary {
            revenue,
            orders,
            views,
            conversion_rate,
            days: self.daily.len(),
        }
    }
}

pub struct AnalyticsController {
    resource: ResourceController<AnalyticsQuery>,
}

impl AnalyticsController {
    pub fn new(
        executor: Arc<RequestExecutor>,
        loading: Arc<dyn LoadingIndicator>,
        shop: impl Into<String>,
        range: DateRange,
    ) -> Self {
        let query = AnalyticsQuery {
            shop: shop.into(),
            range,
        };
        Self {
            resource: ResourceController::new(executor, loading, query),
        }
    }

    pub async fn load(&self) -> Result<Refresh, ApiError> {
        self.resource.load().await
    }

    pub async fn set_range(&self, range: DateRange) -> Result<Refresh, ApiError> {
        self.resource.update_query(|query| query.range = range).await
    }

    pub async fn report(&self) -> Result<Option<AnalyticsReport>, ApiError> {
        self.resource
            .data_as()
            .await
            .map_err(|e| ApiError::CorruptResponse(e.to_string()))
    }

    pub async fn summary(&self) -> Result<Option<AnalyticsSummary>, ApiError> {
        Ok(self.report().await?.map(|report| report.summary()))
    }
}
