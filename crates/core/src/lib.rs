pub mod config;
pub mod domain;
pub mod errors;
pub mod forecast;
pub mod lifecycle;
pub mod series;
pub mod stockout;
pub mod velocity;

pub use domain::inventory::{InventoryLevel, RawInventoryRow};
pub use domain::movement::{MovementEvent, MovementKind, RawMovementRow};
pub use domain::period::RawPeriodTotalsRow;
pub use domain::product::{ProductId, StoreId, SupplierId};
pub use domain::sale::{RawSaleRow, SaleRecord};
pub use domain::RejectReason;
pub use errors::{ApplicationError, EngineError};
pub use forecast::{
    BandWidening, ConfidenceBand, ForecastAccuracy, ForecastMetric, ForecastParams,
    ForecastResult, LinearTrend, TrendForecaster, TrendLabel,
};
pub use lifecycle::{
    GrowthRate, Lifecycle, LifecycleAssessment, LifecycleClassifier, PeriodTotals,
    PortfolioScores, ProductPerformanceRecord, ScoringWeights,
};
pub use series::{
    AggregatedSeries, DateRange, ProductSeriesSet, SeriesAggregator, WeeklyPoint,
};
pub use stockout::{
    RecordAssessment, Severity, StockoutAnalyzer, StockoutThresholds, StoreAlertSummary,
};
pub use velocity::{StockoutHorizon, VelocityEstimate, VelocityEstimator, VelocityRecord};
