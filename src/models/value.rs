//! Column values.
//!
//! [`ColumnValue`] is the owned, backend-neutral form of anything bound as a
//! statement argument. Every variant carries an `Option` so a NULL still knows
//! its SQL type; PostgreSQL refuses an untyped text NULL for, say, an integer
//! column.

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValue {
    Bool(Option<bool>),
    Int(Option<i32>),
    BigInt(Option<i64>),
    Double(Option<f64>),
    Text(Option<String>),
    Bytes(Option<Vec<u8>>),
    Uuid(Option<Uuid>),
    Timestamp(Option<DateTime<Utc>>),
    Json(Option<JsonValue>),
}

impl ColumnValue {
    /// Check if this value is a NULL of any type.
    pub fn is_null(&self) -> bool {
        match self {
            Self::Bool(v) => v.is_none(),
            Self::Int(v) => v.is_none(),
            Self::BigInt(v) => v.is_none(),
            Self::Double(v) => v.is_none(),
            Self::Text(v) => v.is_none(),
            Self::Bytes(v) => v.is_none(),
            Self::Uuid(v) => v.is_none(),
            Self::Timestamp(v) => v.is_none(),
            Self::Json(v) => v.is_none(),
        }
    }
}

/// A Rust type that can be written to a column.
pub trait SqlValue {
    fn to_value(&self) -> ColumnValue;

    /// A NULL of this type.
    fn null_value() -> ColumnValue;
}

macro_rules! sql_value {
    ($($ty:ty => $variant:ident),+ $(,)?) => {
        $(
            impl SqlValue for $ty {
                fn to_value(&self) -> ColumnValue {
                    ColumnValue::$variant(Some(self.clone()))
                }

                fn null_value() -> ColumnValue {
                    ColumnValue::$variant(None)
                }
            }

            impl From<$ty> for ColumnValue {
                fn from(value: $ty) -> Self {
                    ColumnValue::$variant(Some(value))
                }
            }
        )+
    };
}

sql_value! {
    bool => Bool,
    i32 => Int,
    i64 => BigInt,
    f64 => Double,
    String => Text,
    Vec<u8> => Bytes,
    Uuid => Uuid,
    DateTime<Utc> => Timestamp,
    JsonValue => Json,
}

impl<T: SqlValue> SqlValue for Option<T> {
    fn to_value(&self) -> ColumnValue {
        match self {
            Some(value) => value.to_value(),
            None => T::null_value(),
        }
    }

    fn null_value() -> ColumnValue {
        T::null_value()
    }
}

impl From<&str> for ColumnValue {
    fn from(value: &str) -> Self {
        ColumnValue::Text(Some(value.to_string()))
    }
}

impl From<ColumnValue> for sea_query::Value {
    fn from(value: ColumnValue) -> Self {
        match value {
            ColumnValue::Bool(v) => v.into(),
            ColumnValue::Int(v) => v.into(),
            ColumnValue::BigInt(v) => v.into(),
            ColumnValue::Double(v) => v.into(),
            ColumnValue::Text(v) => v.into(),
            ColumnValue::Bytes(v) => v.into(),
            ColumnValue::Uuid(v) => v.into(),
            ColumnValue::Timestamp(v) => v.into(),
            ColumnValue::Json(v) => v.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_keeps_type() {
        let null = <Option<i64> as SqlValue>::null_value();
        assert!(null.is_null());
        assert_eq!(null, ColumnValue::BigInt(None));
    }

    #[test]
    fn test_option_to_value() {
        let some: Option<String> = Some("ada".to_string());
        let none: Option<String> = None;
        assert_eq!(some.to_value(), ColumnValue::Text(Some("ada".to_string())));
        assert_eq!(none.to_value(), ColumnValue::Text(None));
    }

    #[test]
    fn test_typed_null_survives_binding() {
        let value = sea_query::Value::from(ColumnValue::BigInt(None));
        assert_eq!(value, sea_query::Value::BigInt(None));

        let value = sea_query::Value::from(ColumnValue::from("ada"));
        assert_eq!(value, sea_query::Value::from("ada"));
    }

    #[test]
    fn test_from_literals() {
        assert_eq!(ColumnValue::from(30), ColumnValue::Int(Some(30)));
        assert_eq!(ColumnValue::from(30_i64), ColumnValue::BigInt(Some(30)));
        assert_eq!(ColumnValue::from("x"), ColumnValue::Text(Some("x".into())));
        assert!(!ColumnValue::from(false).is_null());
    }
}
