//! Declarative macros for backend dispatch and column binding.
//!
//! `changeset!` and `entity!` map struct fields to column names at compile
//! time, so binding a struct costs no more than writing the map by hand.

/// Macro for generating database dispatch match arms.
///
/// This macro generates match arms for `DbPool` variants, reducing the need
/// to manually write repetitive match statements.
///
/// # Example
///
/// ```ignore
/// impl_db_dispatch!(pool, {
///     Postgres(p) => do_postgres(p),
///     SQLite(p) => do_sqlite(p),
/// });
/// ```
#[macro_export]
macro_rules! impl_db_dispatch {
    ($pool:expr, { $($variant:ident($p:ident) => $body:expr),+ $(,)? }) => {
        match $pool {
            $(
                $crate::db::pool::DbPool::$variant($p) => $body,
            )+
        }
    };
}

/// Bind the fields of an update type to columns.
///
/// Every listed field must implement [`Field`](crate::models::Field), so a
/// plain value listed by mistake is a compile error. Fields not listed are
/// ignored, as is a field bound to `""`. When two fields name the same
/// column the later one wins.
///
/// ```
/// use repokit::changeset;
/// use repokit::models::{Nullable, Required};
///
/// #[derive(Default)]
/// struct UpdateUser {
///     name: Required<String>,
///     bio: Nullable<String>,
/// }
///
/// changeset!(UpdateUser {
///     name => "name",
///     bio => "bio",
/// });
/// ```
#[macro_export]
macro_rules! changeset {
    ($ty:ty { $($field:ident => $column:expr),* $(,)? }) => {
        impl $crate::models::Changeset for $ty {
            fn fields(&self) -> ::std::vec::Vec<(&'static str, &dyn $crate::models::Field)> {
                ::std::vec![
                    $(($column, &self.$field as &dyn $crate::models::Field),)*
                ]
            }
        }
    };
}

/// Implement [`Entity`](crate::repo::Entity) by listing the columns written
/// on insert.
///
/// Decoding still goes through `#[derive(sqlx::FromRow)]`, so columns filled
/// in by the database (defaults, generated values) can be left out here and
/// still come back from `RETURNING *`.
///
/// ```
/// use repokit::entity;
/// use uuid::Uuid;
///
/// #[derive(Debug, sqlx::FromRow)]
/// struct User {
///     id: Uuid,
///     name: String,
///     email: Option<String>,
/// }
///
/// entity!(User {
///     id => "id",
///     name => "name",
///     email => "email",
/// });
/// ```
#[macro_export]
macro_rules! entity {
    ($ty:ty { $($field:ident => $column:expr),* $(,)? }) => {
        impl $crate::repo::Entity for $ty {
            fn columns(&self) -> $crate::models::ColumnMap {
                #[allow(unused_mut)]
                let mut map = $crate::models::ColumnMap::new();
                $(
                    map.insert(
                        ::std::string::String::from($column),
                        $crate::models::SqlValue::to_value(&self.$field),
                    );
                )*
                map
            }
        }
    };
}

pub use changeset;
pub use entity;
pub use impl_db_dispatch;
