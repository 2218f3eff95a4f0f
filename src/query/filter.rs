//! List filters.

use super::expr::OrderBy;
use sea_query::SimpleExpr;

/// What List, Count and Exists select.
///
/// Count and Exists only look at [`expressions`](Filter::expressions).
pub trait Filter: Send + Sync {
    fn offset(&self) -> u64 {
        0
    }

    /// Maximum number of rows; 0 means no limit.
    fn limit(&self) -> u64 {
        0
    }

    fn order(&self) -> Vec<OrderBy> {
        Vec::new()
    }

    /// Predicates, combined with AND.
    fn expressions(&self) -> Vec<SimpleExpr>;
}

/// A ready-made [`Filter`].
///
/// ```
/// use repokit::query::{col, ListFilter};
///
/// let page = ListFilter::new()
///     .filter(col("active").eq(true))
///     .order_by(col("created_at").desc())
///     .limit(20)
///     .offset(40);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    pub offset: u64,
    pub limit: u64,
    pub order: Vec<OrderBy>,
    pub expressions: Vec<SimpleExpr>,
}

impl ListFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, expr: SimpleExpr) -> Self {
        self.expressions.push(expr);
        self
    }

    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order.push(order);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }
}

impl Filter for ListFilter {
    fn offset(&self) -> u64 {
        self.offset
    }

    fn limit(&self) -> u64 {
        self.limit
    }

    fn order(&self) -> Vec<OrderBy> {
        self.order.clone()
    }

    fn expressions(&self) -> Vec<SimpleExpr> {
        self.expressions.clone()
    }
}
