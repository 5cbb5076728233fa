// spiderexpress-core/src/domain/router/spec.rs
//
// The declarative shape of `layers.<name>.routers[]` (§4.2). Parsed once
// at layer setup, re-used for every record routed through that layer.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A value an `<extra>` column may be bound to: either a field in the
/// incoming record, or a literal constant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TargetValue {
    Field { field: String },
    Literal(crate::domain::value::Value),
}

/// One emitter under `target: [...]` (§4.2).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetSpec {
    pub field: String,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub dispatch_with: Option<String>,
}

/// One `layers.<name>.routers[]` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouterSpec {
    pub source: String,
    pub target: Vec<TargetSpec>,
    /// Additional columns carried onto the RawEdge unchanged; keys are
    /// column names, values name a record field or a literal constant.
    #[serde(default, flatten)]
    pub extra_raw: HashMap<String, serde_yaml::Value>,
}

impl RouterSpec {
    /// Extra columns, excluding the reserved `source`/`target` keys,
    /// resolved into `TargetValue`s: a bare string is treated as a field
    /// reference when it matches no YAML scalar-literal heuristic; callers
    /// that need literal-vs-field precision should prefer
    /// `{ field: <name> }` / `{ literal: <value> }` mappings in YAML, but a
    /// bare scalar constant (number, bool) is always a literal.
    pub fn extra_columns(&self) -> HashMap<String, TargetValue> {
        let mut out = HashMap::new();
        for (key, raw) in &self.extra_raw {
            if key == "source" || key == "target" {
                continue;
            }
            out.insert(key.clone(), yaml_to_target_value(raw));
        }
        out
    }
}

fn yaml_to_target_value(raw: &serde_yaml::Value) -> TargetValue {
    match raw {
        serde_yaml::Value::String(s) => TargetValue::Field { field: s.clone() },
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                TargetValue::Literal(crate::domain::value::Value::Integer(i))
            } else {
                TargetValue::Literal(crate::domain::value::Value::Float(n.as_f64().unwrap_or(0.0)))
            }
        }
        serde_yaml::Value::Bool(b) => {
            TargetValue::Literal(crate::domain::value::Value::Text(b.to_string()))
        }
        serde_yaml::Value::Null => TargetValue::Literal(crate::domain::value::Value::Null),
        other => TargetValue::Literal(crate::domain::value::Value::Text(
            serde_yaml::to_string(other).unwrap_or_default(),
        )),
    }
}
