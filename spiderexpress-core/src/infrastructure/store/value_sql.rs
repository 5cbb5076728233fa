// spiderexpress-core/src/infrastructure/store/value_sql.rs
//
// Bridges domain::Value to duckdb's dynamic parameter type, and maps the
// §3 column type declarations to DuckDB's DDL vocabulary.

use crate::domain::value::Value;
use crate::domain::ColumnType;
use duckdb::types::Value as SqlValue;

pub fn to_sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Text(s) => SqlValue::Text(s.clone()),
        Value::Integer(i) => SqlValue::BigInt(*i),
        Value::Float(f) => SqlValue::Double(*f),
        Value::List(items) => SqlValue::Text(
            items
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(","),
        ),
    }
}

pub fn ddl_type(column_type: ColumnType) -> &'static str {
    match column_type {
        ColumnType::Text => "VARCHAR",
        ColumnType::Integer => "BIGINT",
    }
}

pub fn from_sql_text_or_int(raw: &SqlValue) -> Value {
    match raw {
        SqlValue::Null => Value::Null,
        SqlValue::Text(s) => Value::Text(s.clone()),
        SqlValue::BigInt(i) => Value::Integer(*i),
        SqlValue::Int(i) => Value::Integer(*i as i64),
        SqlValue::Double(f) => Value::Float(*f),
        SqlValue::Float(f) => Value::Float(*f as f64),
        other => Value::Text(format!("{:?}", other)),
    }
}
