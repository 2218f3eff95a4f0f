//! Column predicates and ordering.
//!
//! [`col`] names a column; its methods produce `sea_query` expressions whose
//! values are bound, never inlined. Combine them with
//! [`SimpleExpr::and`](sea_query::SimpleExpr::and),
//! [`or`](sea_query::SimpleExpr::or) and [`not`](sea_query::SimpleExpr::not),
//! or with a [`Cond`](sea_query::Cond).

use crate::models::ColumnValue;
use sea_query::{Alias, Expr, Order, SimpleExpr, Value};

/// A column reference used to build predicates.
#[derive(Debug, Clone)]
pub struct Column(String);

/// Refer to the column `name`.
pub fn col(name: impl Into<String>) -> Column {
    Column(name.into())
}

fn bound(value: impl Into<ColumnValue>) -> Value {
    value.into().into()
}

impl Column {
    fn expr(&self) -> Expr {
        Expr::col(Alias::new(self.0.as_str()))
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    pub fn eq(self, value: impl Into<ColumnValue>) -> SimpleExpr {
        self.expr().eq(bound(value))
    }

    pub fn ne(self, value: impl Into<ColumnValue>) -> SimpleExpr {
        self.expr().ne(bound(value))
    }

    pub fn lt(self, value: impl Into<ColumnValue>) -> SimpleExpr {
        self.expr().lt(bound(value))
    }

    pub fn le(self, value: impl Into<ColumnValue>) -> SimpleExpr {
        self.expr().lte(bound(value))
    }

    pub fn gt(self, value: impl Into<ColumnValue>) -> SimpleExpr {
        self.expr().gt(bound(value))
    }

    pub fn ge(self, value: impl Into<ColumnValue>) -> SimpleExpr {
        self.expr().gte(bound(value))
    }

    pub fn like(self, pattern: impl Into<String>) -> SimpleExpr {
        self.expr().like(pattern.into())
    }

    /// Membership test; an empty set matches nothing.
    pub fn is_in<I, V>(self, values: I) -> SimpleExpr
    where
        I: IntoIterator<Item = V>,
        V: Into<ColumnValue>,
    {
        self.expr().is_in(values.into_iter().map(bound))
    }

    pub fn is_null(self) -> SimpleExpr {
        self.expr().is_null()
    }

    pub fn is_not_null(self) -> SimpleExpr {
        self.expr().is_not_null()
    }

    pub fn asc(self) -> OrderBy {
        OrderBy {
            column: self.0,
            direction: OrderDirection::Asc,
        }
    }

    pub fn desc(self) -> OrderBy {
        OrderBy {
            column: self.0,
            direction: OrderDirection::Desc,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDirection {
    Asc,
    Desc,
}

impl From<OrderDirection> for Order {
    fn from(direction: OrderDirection) -> Self {
        match direction {
            OrderDirection::Asc => Order::Asc,
            OrderDirection::Desc => Order::Desc,
        }
    }
}

/// One ORDER BY term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub column: String,
    pub direction: OrderDirection,
}
