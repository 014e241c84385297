use chrono::{DateTime, Duration, SubsecRound, Utc};
use sqlx::{Database, Encode, QueryBuilder, Type};

mod config;
mod data_store;
mod errors;
mod schema_validation;

pub use config::{DEFAULT_DATA_STORE_URL, DEFAULT_TABLE_PREFIX, DataStoreConfig, DataStoreType};
pub use data_store::{DataStore, connect};
pub use errors::StorageError;

pub(crate) use errors::is_unique_violation;
pub(crate) use schema_validation::{validate_postgres_table_schema, validate_sqlite_table_schema};

/// Current time at the precision every backend can hold (microseconds)
pub(crate) fn storage_now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Next `updated_at` for a row last written at `previous`; always later than it
pub(crate) fn next_updated_at(previous: DateTime<Utc>) -> DateTime<Utc> {
    let now = storage_now();
    if now > previous {
        now
    } else {
        previous + Duration::microseconds(1)
    }
}

/// How often a conditional update re-reads a row that keeps changing under it
pub(crate) const MAX_UPDATE_ATTEMPTS: usize = 8;

/// A value for one column of a partial `UPDATE`
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ColumnValue {
    Text(String),
    Bool(bool),
    Timestamp(DateTime<Utc>),
}

/// Append `, column = <bind>` for each change
pub(crate) fn push_assignments<'args, DB>(
    query: &mut QueryBuilder<'args, DB>,
    changes: &[(&'static str, ColumnValue)],
) where
    DB: Database,
    String: Encode<'args, DB> + Type<DB>,
    bool: Encode<'args, DB> + Type<DB>,
    DateTime<Utc>: Encode<'args, DB> + Type<DB>,
{
    for (column, value) in changes {
        query.push(", ").push(column).push(" = ");
        match value {
            ColumnValue::Text(v) => query.push_bind(v.clone()),
            ColumnValue::Bool(v) => query.push_bind(*v),
            ColumnValue::Timestamp(v) => query.push_bind(*v),
        };
    }
}

/// Render `values` as a SQL `IN` list body: `'a', 'b'`
///
/// Only used with the fixed label sets of the schema enums.
pub(crate) fn sql_in_list<'a>(values: impl IntoIterator<Item = &'a str>) -> String {
    values
        .into_iter()
        .map(|v| format!("'{}'", v.replace('\'', "''")))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sql_in_list_quotes_values() {
        assert_eq!(sql_in_list(["CEO", "R&D"]), "'CEO', 'R&D'");
        assert_eq!(sql_in_list(["it's"]), "'it''s'");
        assert_eq!(sql_in_list(std::iter::empty()), "");
    }

    #[test]
    fn test_next_updated_at_is_strictly_later() {
        let future = storage_now() + Duration::seconds(5);
        assert_eq!(next_updated_at(future), future + Duration::microseconds(1));

        let past = storage_now() - Duration::seconds(5);
        assert!(next_updated_at(past) > past);
    }

    #[test]
    fn test_push_assignments_binds_each_column() {
        let mut query = QueryBuilder::<sqlx::Sqlite>::new("UPDATE t SET updated_at = ");
        query.push_bind(storage_now());
        push_assignments(
            &mut query,
            &[
                ("first_name", ColumnValue::Text("Ada".to_string())),
                ("is_active", ColumnValue::Bool(false)),
            ],
        );

        assert_eq!(
            query.sql(),
            "UPDATE t SET updated_at = ?, first_name = ?, is_active = ?"
        );
    }
}
