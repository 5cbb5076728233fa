// spiderexpress-core/src/domain/value.rs
//
// Connector records are dictionary-shaped (heterogeneous key -> value).
// We model that as a tagged union with typed accessors rather than
// reaching for `serde_json::Value` everywhere, so router/aggregator code
// resolves field names against the layer's column declaration once, at
// setup, instead of re-discovering shape on every row.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// The two column types a layer may declare (§3, §4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Text,
    Integer,
}

/// A single scalar or list value as returned by a connector, or carried on
/// a `RawEdge`/`Node` row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Text(String),
    Integer(i64),
    Float(f64),
    List(Vec<Value>),
}

impl Value {
    /// Flattens a scalar-or-list value into the scalars it denotes, in
    /// order. A scalar yields itself; a list yields its elements in
    /// declaration order; `Null` yields nothing.
    pub fn scalars(&self) -> Vec<&Value> {
        match self {
            Value::Null => Vec::new(),
            Value::List(items) => items.iter().collect(),
            scalar => vec![scalar],
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Value::Null) || matches!(self, Value::Text(s) if s.is_empty())
    }

    /// Coerces this value to the declared column type, returning `None`
    /// (a caller-visible warning, per §4.5) on failure rather than erroring.
    pub fn coerce(&self, ty: ColumnType) -> Option<Value> {
        match (ty, self) {
            (ColumnType::Text, Value::Text(s)) => Some(Value::Text(s.clone())),
            (ColumnType::Text, Value::Integer(i)) => Some(Value::Text(i.to_string())),
            (ColumnType::Text, Value::Float(f)) => Some(Value::Text(f.to_string())),
            (ColumnType::Integer, Value::Integer(i)) => Some(Value::Integer(*i)),
            (ColumnType::Integer, Value::Text(s)) => s.parse::<i64>().ok().map(Value::Integer),
            (ColumnType::Integer, Value::Float(f)) if f.fract() == 0.0 => {
                Some(Value::Integer(*f as i64))
            }
            (_, Value::Null) => Some(Value::Null),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Text(s) => write!(f, "{s}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}

/// A single heterogeneous record as returned by a connector, before
/// routing.
pub type Record = HashMap<String, Value>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_flattens_to_itself() {
        let v = Value::Text("a".into());
        assert_eq!(v.scalars(), vec![&v]);
    }

    #[test]
    fn list_flattens_to_elements_in_order() {
        let v = Value::List(vec![Value::Text("a".into()), Value::Text("b".into())]);
        let scalars = v.scalars();
        assert_eq!(scalars.len(), 2);
        assert_eq!(scalars[0].as_text(), Some("a"));
        assert_eq!(scalars[1].as_text(), Some("b"));
    }

    #[test]
    fn coerce_integer_text_to_integer() {
        let v = Value::Text("42".into());
        assert_eq!(v.coerce(ColumnType::Integer), Some(Value::Integer(42)));
    }

    #[test]
    fn coerce_failure_yields_none() {
        let v = Value::Text("not-a-number".into());
        assert_eq!(v.coerce(ColumnType::Integer), None);
    }
}
