//! Reductions over a user's transactions and the summary endpoints built on them.

mod handlers;
mod reduce;
mod summary;

pub use handlers::{
    get_average_summary, get_monthly_summary, get_statistics, get_summary, get_yearly_summary,
};
pub use reduce::{Bucket, BucketKey, GroupKey, GroupValue, Statistic, reduce, reduce_grouped};
pub use summary::{
    AggregationResult, WeeklySeries, summarize, summarize_with, today_income,
    transactions_within_last_days, weekly_series,
};
