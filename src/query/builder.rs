//! Statement builders.
//!
//! Table and column names that would produce invalid SQL (an empty name) and
//! statements with nothing to write fail with `InvalidArgument`.

use super::expr::OrderBy;
use super::filter::Filter;
use super::lock::LockMode;
use super::{Dialect, Statement, ident, table_ref};
use crate::error::{DbError, DbResult};
use crate::models::ColumnMap;
use sea_query::{Alias, Asterisk, Expr, Func, Query, SelectStatement, SimpleExpr, Value};

/// `SELECT * FROM table ...`
#[derive(Debug, Clone)]
pub struct Select {
    query: SelectStatement,
    limit: u64,
    offset: u64,
    lock: Option<LockMode>,
}

impl Select {
    pub fn from(table: &str) -> DbResult<Self> {
        let mut query = Query::select();
        query.column(Asterisk).from(table_ref(table)?);
        Ok(Self {
            query,
            limit: 0,
            offset: 0,
            lock: None,
        })
    }

    pub fn filter(mut self, expr: SimpleExpr) -> Self {
        self.query.and_where(expr);
        self
    }

    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.query
            .order_by(Alias::new(order.column.as_str()), order.direction.into());
        self
    }

    /// 0 means no limit.
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    pub fn lock(mut self, lock: Option<LockMode>) -> Self {
        self.lock = lock;
        self
    }

    /// Take offset, limit, ordering and predicates from `filter`.
    pub fn apply<F: Filter + ?Sized>(mut self, filter: &F) -> Self {
        for expr in filter.expressions() {
            self = self.filter(expr);
        }
        for order in filter.order() {
            self = self.order_by(order);
        }
        self.limit = filter.limit();
        self.offset = filter.offset();
        self
    }

    pub fn build(&self, dialect: Dialect) -> Statement {
        let mut query = self.query.clone();

        if self.limit > 0 {
            query.limit(self.limit);
        } else if self.offset > 0 && dialect == Dialect::Sqlite {
            // SQLite only accepts OFFSET after a LIMIT; binding goes through i64
            query.limit(i64::MAX as u64);
        }
        if self.offset > 0 {
            query.offset(self.offset);
        }

        // SQLite locks the whole database for a write transaction and has no
        // row-lock syntax.
        if let Some(lock) = self.lock.filter(|_| dialect == Dialect::Postgres) {
            lock.apply(&mut query);
        }

        Statement::render(&query, dialect)
    }
}

fn filtered<F: Filter + ?Sized>(table: &str, filter: &F) -> DbResult<SelectStatement> {
    let mut query = Query::select();
    query.from(table_ref(table)?);
    for expr in filter.expressions() {
        query.and_where(expr);
    }
    Ok(query)
}

/// `SELECT COUNT(*) FROM table WHERE ...`; paging and ordering do not apply.
pub fn count<F: Filter + ?Sized>(table: &str, filter: &F, dialect: Dialect) -> DbResult<Statement> {
    let mut query = filtered(table, filter)?;
    query.expr(Func::count(Expr::col(Asterisk)));
    Ok(Statement::render(&query, dialect))
}

/// `SELECT EXISTS(SELECT * FROM table WHERE ...) AS "exists"`
pub fn exists<F: Filter + ?Sized>(table: &str, filter: &F, dialect: Dialect) -> DbResult<Statement> {
    let mut inner = filtered(table, filter)?;
    inner.column(Asterisk);

    let mut query = Query::select();
    query.expr_as(Expr::exists(inner), Alias::new("exists"));
    Ok(Statement::render(&query, dialect))
}

fn split(values: ColumnMap) -> DbResult<(Vec<Alias>, Vec<SimpleExpr>)> {
    let mut columns = Vec::with_capacity(values.len());
    let mut exprs = Vec::with_capacity(values.len());
    for (column, value) in values {
        columns.push(ident(&column)?);
        exprs.push(SimpleExpr::Value(Value::from(value)));
    }
    Ok((columns, exprs))
}

/// `INSERT INTO table (...) VALUES (...) RETURNING *`, columns in name order.
pub fn insert(table: &str, values: ColumnMap, dialect: Dialect) -> DbResult<Statement> {
    if values.is_empty() {
        return Err(DbError::invalid_argument("no columns for insert"));
    }

    let (columns, exprs) = split(values)?;
    let mut query = Query::insert();
    query
        .into_table(table_ref(table)?)
        .columns(columns)
        .values(exprs)
        .map_err(|e| DbError::invalid_argument(e.to_string()))?
        .returning_all();
    Ok(Statement::render(&query, dialect))
}

/// `UPDATE table SET ... WHERE filter RETURNING *`
pub fn update(
    table: &str,
    values: ColumnMap,
    filter: SimpleExpr,
    dialect: Dialect,
) -> DbResult<Statement> {
    if values.is_empty() {
        return Err(DbError::invalid_argument("no fields for update"));
    }

    let (columns, exprs) = split(values)?;
    let mut query = Query::update();
    query
        .table(table_ref(table)?)
        .values(columns.into_iter().zip(exprs))
        .and_where(filter)
        .returning_all();
    Ok(Statement::render(&query, dialect))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::models::ColumnValue;
    use crate::query::{ListFilter, col};

    #[test]
    fn test_select_all() {
        let stmt = Select::from("users").unwrap().build(Dialect::Postgres);
        assert_eq!(stmt.sql, r#"SELECT * FROM "users""#);
        assert_eq!(stmt.arg_count(), 0);
    }

    #[test]
    fn test_select_with_filter() {
        let filter = ListFilter::new()
            .filter(col("active").eq(true))
            .filter(col("age").gt(30))
            .order_by(col("name").asc())
            .order_by(col("id").desc())
            .limit(10)
            .offset(20);

        let stmt = Select::from("users")
            .unwrap()
            .apply(&filter)
            .build(Dialect::Postgres);
        assert_eq!(
            stmt.sql,
            r#"SELECT * FROM "users" WHERE "active" = $1 AND "age" > $2 ORDER BY "name" ASC, "id" DESC LIMIT $3 OFFSET $4"#
        );
        assert_eq!(stmt.values.0[0], Value::Bool(Some(true)));
        assert_eq!(stmt.values.0[1], Value::Int(Some(30)));
        assert_eq!(stmt.arg_count(), 4);
    }

    #[test]
    fn test_offset_without_limit() {
        let select = Select::from("users").unwrap().offset(5);
        assert_eq!(
            select.build(Dialect::Postgres).sql,
            r#"SELECT * FROM "users" OFFSET $1"#
        );

        let stmt = select.build(Dialect::Sqlite);
        assert_eq!(stmt.sql, r#"SELECT * FROM "users" LIMIT ? OFFSET ?"#);
        assert_eq!(stmt.values.0[0], Value::BigUnsigned(Some(i64::MAX as u64)));
    }

    #[test]
    fn test_select_lock_clause() {
        let select = Select::from("jobs")
            .unwrap()
            .filter(col("state").eq("queued"))
            .limit(1)
            .lock(Some(LockMode::for_update().skip_locked()));
        assert_eq!(
            select.build(Dialect::Postgres).sql,
            r#"SELECT * FROM "jobs" WHERE "state" = $1 LIMIT $2 FOR UPDATE SKIP LOCKED"#
        );
        assert_eq!(
            select.build(Dialect::Sqlite).sql,
            r#"SELECT * FROM "jobs" WHERE "state" = ? LIMIT ?"#
        );
    }

    #[test]
    fn test_empty_in_list_matches_nothing() {
        let stmt = Select::from("users")
            .unwrap()
            .filter(col("id").is_in(Vec::<i64>::new()))
            .build(Dialect::Sqlite);
        assert!(!stmt.sql.contains("IN ()"));
        assert_eq!(stmt.arg_count(), 0);
    }

    #[test]
    fn test_count_ignores_paging() {
        let filter = ListFilter::new()
            .filter(col("active").eq(true))
            .limit(5)
            .offset(5)
            .order_by(col("name").asc());
        let stmt = count("users", &filter, Dialect::Sqlite).unwrap();
        assert!(stmt.sql.starts_with("SELECT COUNT(*)"));
        assert!(stmt.sql.ends_with(r#"FROM "users" WHERE "active" = ?"#));
        assert_eq!(stmt.arg_count(), 1);
    }

    #[test]
    fn test_exists() {
        let filter = ListFilter::new().filter(col("email").eq("a@b.c"));
        let stmt = exists("users", &filter, Dialect::Postgres).unwrap();
        assert!(stmt.sql.starts_with("SELECT EXISTS"));
        assert!(stmt.sql.contains(r#"SELECT * FROM "users" WHERE "email" = $1"#));
        assert!(stmt.sql.ends_with(r#"AS "exists""#));
    }

    #[test]
    fn test_insert_is_column_ordered() {
        let mut values = ColumnMap::new();
        values.insert("name".into(), ColumnValue::from("ada"));
        values.insert("age".into(), ColumnValue::from(36_i64));

        let stmt = insert("users", values, Dialect::Postgres).unwrap();
        assert_eq!(
            stmt.sql,
            r#"INSERT INTO "users" ("age", "name") VALUES ($1, $2) RETURNING *"#
        );
        assert_eq!(stmt.values.0[0], Value::BigInt(Some(36)));
    }

    #[test]
    fn test_update() {
        let mut values = ColumnMap::new();
        values.insert("email".into(), ColumnValue::Text(None));
        values.insert("name".into(), ColumnValue::from("grace"));

        let stmt = update("users", values, col("id").eq(7_i64), Dialect::Postgres).unwrap();
        assert_eq!(
            stmt.sql,
            r#"UPDATE "users" SET "email" = $1, "name" = $2 WHERE "id" = $3 RETURNING *"#
        );
        assert_eq!(stmt.arg_count(), 3);
        assert_eq!(stmt.values.0[0], Value::String(None));
    }

    #[test]
    fn test_empty_update_rejected() {
        let err = update("users", ColumnMap::new(), col("id").eq(1), Dialect::Postgres)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_empty_insert_rejected() {
        let err = insert("users", ColumnMap::new(), Dialect::Sqlite).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_empty_column_name_rejected() {
        let mut values = ColumnMap::new();
        values.insert(String::new(), ColumnValue::from(1));
        let err = insert("users", values, Dialect::Postgres).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_build_is_deterministic() {
        let select = Select::from("users")
            .unwrap()
            .filter(col("a").eq(1).or(col("b").is_in([2, 3])))
            .order_by(col("a").asc())
            .limit(3);
        assert_eq!(
            select.build(Dialect::Postgres),
            select.build(Dialect::Postgres)
        );
    }
}
