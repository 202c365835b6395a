//! Column metadata
//!
//! The ordered list of column names and coarse kinds that scopes global
//! search and tells the SQL compiler which comparison expressions to use.
//! Supplied by the caller and trusted as given.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::filters::{FilterError, Row};

/// Coarse column type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Number,
    Boolean,
    Text,
    Temporal,
}

impl ColumnKind {
    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnKind::Number)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMeta {
    pub name: String,
    pub kind: ColumnKind,
}

impl ColumnMeta {
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Ordered column list; serializes as a bare JSON array
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnSchema {
    columns: Vec<ColumnMeta>,
}

impl ColumnSchema {
    pub fn new(columns: Vec<ColumnMeta>) -> Self {
        Self { columns }
    }

    pub fn from_json(json_str: &str) -> Result<Self, FilterError> {
        serde_json::from_str(json_str).map_err(|e| FilterError::InvalidJson(e.to_string()))
    }

    pub fn get(&self, name: &str) -> Option<&ColumnMeta> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn kind(&self, name: &str) -> Option<ColumnKind> {
        self.get(name).map(|c| c.kind)
    }

    pub fn columns(&self) -> &[ColumnMeta] {
        &self.columns
    }

    pub fn names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Infer kinds from materialized rows.
    ///
    /// Columns appear in first-seen order. A column is `Number` when every
    /// non-null cell is a number, `Boolean` when every non-null cell is a
    /// bool, and `Text` otherwise (including all-null columns).
    pub fn infer(rows: &[Row]) -> Self {
        #[derive(Default)]
        struct Seen {
            numbers: bool,
            bools: bool,
            other: bool,
        }

        let mut order: Vec<String> = Vec::new();
        let mut seen: FxHashMap<String, Seen> = FxHashMap::default();

        for row in rows {
            for (name, cell) in row {
                let entry = seen.entry(name.clone()).or_insert_with(|| {
                    order.push(name.clone());
                    Seen::default()
                });
                match cell {
                    Value::Null => {}
                    Value::Number(_) => entry.numbers = true,
                    Value::Bool(_) => entry.bools = true,
                    _ => entry.other = true,
                }
            }
        }

        let columns = order
            .into_iter()
            .map(|name| {
                let kind = match seen.get(&name) {
                    Some(Seen {
                        numbers: true,
                        bools: false,
                        other: false,
                    }) => ColumnKind::Number,
                    Some(Seen {
                        numbers: false,
                        bools: true,
                        other: false,
                    }) => ColumnKind::Boolean,
                    _ => ColumnKind::Text,
                };
                ColumnMeta::new(name, kind)
            })
            .collect();
        Self { columns }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn rows(value: Value) -> Vec<Row> {
        value
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_object().unwrap().clone())
            .collect()
    }

    #[test]
    fn infer_kinds_in_first_seen_order() {
        let schema = ColumnSchema::infer(&rows(json!([
            {"name": "Alice", "age": 30, "active": true},
            {"name": "Bob", "age": null, "score": 1.5, "active": false},
            {"name": null, "age": 17, "mixed": 1},
            {"mixed": "x", "empty": null},
        ])));

        let kinds: Vec<(&str, ColumnKind)> = schema
            .columns()
            .iter()
            .map(|c| (c.name.as_str(), c.kind))
            .collect();
        assert_eq!(
            kinds,
            vec![
                ("name", ColumnKind::Text),
                ("age", ColumnKind::Number),
                ("active", ColumnKind::Boolean),
                ("score", ColumnKind::Number),
                ("mixed", ColumnKind::Text),
                ("empty", ColumnKind::Text),
            ]
        );
    }

    #[test]
    fn json_round_trip_is_a_bare_array() {
        let schema = ColumnSchema::new(vec![
            ColumnMeta::new("age", ColumnKind::Number),
            ColumnMeta::new("joined", ColumnKind::Temporal),
        ]);
        let json = serde_json::to_string(&schema).unwrap();
        assert_eq!(
            json,
            r#"[{"name":"age","kind":"number"},{"name":"joined","kind":"temporal"}]"#
        );
        assert_eq!(ColumnSchema::from_json(&json).unwrap(), schema);
        assert_eq!(schema.kind("joined"), Some(ColumnKind::Temporal));
        assert_eq!(schema.kind("missing"), None);
    }

    #[test]
    fn from_json_rejects_bad_kind() {
        assert!(matches!(
            ColumnSchema::from_json(r#"[{"name":"a","kind":"blob"}]"#),
            Err(FilterError::InvalidJson(_))
        ));
    }
}
