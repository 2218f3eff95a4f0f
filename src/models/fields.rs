//! Sparse update fields.
//!
//! An update type is a struct of [`Required`] and [`Nullable`] fields, each
//! bound to a column through [`Changeset`]. [`column_map`] reduces such a value
//! to the assignments of the fields that were actually supplied:
//!
//! | field                       | assignment        |
//! |-----------------------------|-------------------|
//! | `Required` unset            | none              |
//! | `Required::new(v)`          | `col = v`         |
//! | `Nullable` unset            | none              |
//! | `Nullable::null()`          | `col = NULL`      |
//! | `Nullable::value(v)`        | `col = v`         |
//!
//! # Example
//!
//! ```
//! use repokit::changeset;
//! use repokit::models::{column_map, Nullable, Required};
//!
//! #[derive(Default)]
//! struct UpdateUser {
//!     name: Required<String>,
//!     email: Nullable<String>,
//! }
//!
//! changeset!(UpdateUser {
//!     name => "name",
//!     email => "email",
//! });
//!
//! let update = UpdateUser {
//!     email: Nullable::null(),
//!     ..Default::default()
//! };
//! let map = column_map(&update);
//! assert_eq!(map.len(), 1);
//! assert!(map["email"].is_null());
//! ```

use crate::models::value::{ColumnValue, SqlValue};
use std::collections::BTreeMap;

/// Column name to value. Ordered by column so one logical update always
/// renders the same statement.
pub type ColumnMap = BTreeMap<String, ColumnValue>;

/// A column value that may or may not have been supplied.
pub trait Field {
    fn is_set(&self) -> bool;

    /// Write this field's assignment for `column` into `map`.
    fn append_to(&self, column: &str, map: &mut ColumnMap);
}

/// Binds the fields of an update type to their columns.
///
/// Implement it with the [`changeset!`](crate::changeset) macro. Fields left
/// out of the list, or bound to an empty column name, never reach the map.
pub trait Changeset: Sync {
    /// Fields in declaration order, each with the column it writes.
    fn fields(&self) -> Vec<(&'static str, &dyn Field)>;
}

/// Field of a NOT NULL column.
#[derive(Debug, Clone, PartialEq)]
pub struct Required<T> {
    pub value: T,
    set: bool,
}

impl<T> Required<T> {
    /// A supplied value.
    pub fn new(value: T) -> Self {
        Self { value, set: true }
    }

    /// Supply `value`, replacing whatever was held.
    pub fn set(&mut self, value: T) {
        self.value = value;
        self.set = true;
    }

    /// Withdraw the field; the held value stays but is no longer written.
    pub fn clear(&mut self) {
        self.set = false;
    }

    pub fn get(&self) -> Option<&T> {
        self.set.then_some(&self.value)
    }
}

impl<T: Default> Required<T> {
    pub fn unset() -> Self {
        Self::default()
    }
}

impl<T: Default> Default for Required<T> {
    fn default() -> Self {
        Self {
            value: T::default(),
            set: false,
        }
    }
}

impl<T: SqlValue> Field for Required<T> {
    fn is_set(&self) -> bool {
        self.set
    }

    fn append_to(&self, column: &str, map: &mut ColumnMap) {
        map.insert(column.to_string(), self.value.to_value());
    }
}

/// Field of a nullable column.
#[derive(Debug, Clone, PartialEq)]
pub struct Nullable<T> {
    pub value: Option<T>,
    set: bool,
}

impl<T> Nullable<T> {
    /// A supplied value, where `None` means NULL.
    pub fn new(value: Option<T>) -> Self {
        Self { value, set: true }
    }

    /// Supplied as `value`.
    pub fn value(value: T) -> Self {
        Self::new(Some(value))
    }

    /// Supplied as NULL.
    pub fn null() -> Self {
        Self::new(None)
    }

    pub fn unset() -> Self {
        Self {
            value: None,
            set: false,
        }
    }

    pub fn set(&mut self, value: Option<T>) {
        self.value = value;
        self.set = true;
    }

    pub fn clear(&mut self) {
        self.set = false;
    }
}

impl<T> Default for Nullable<T> {
    fn default() -> Self {
        Self::unset()
    }
}

impl<T: SqlValue> Field for Nullable<T> {
    fn is_set(&self) -> bool {
        self.set
    }

    fn append_to(&self, column: &str, map: &mut ColumnMap) {
        let value = match &self.value {
            Some(value) => value.to_value(),
            None => T::null_value(),
        };
        map.insert(column.to_string(), value);
    }
}

/// Reduce `update` to the assignments of its supplied fields.
///
/// When two fields are bound to the same column, the one listed later wins.
pub fn column_map<U: Changeset + ?Sized>(update: &U) -> ColumnMap {
    let mut map = ColumnMap::new();

    for (column, field) in update.fields() {
        if column.is_empty() {
            continue;
        }
        if field.is_set() {
            field.append_to(column, &mut map);
        }
    }

    map
}
