use super::error::EngineError;
use super::reference::OutputRef;
use crate::core::models::structure::Structure;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An argument or output tree in a flow graph.
///
/// Concrete data (`Literal`, `Structure`) and symbolic references (`Ref`) can be
/// mixed freely; the execution engine substitutes every `Ref` before a job runs.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    #[default]
    Null,
    Literal(serde_json::Value),
    Structure(Box<Structure>),
    Ref(OutputRef),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    pub fn literal<T: Serialize>(value: &T) -> Result<Self, EngineError> {
        Ok(Self::Literal(serde_json::to_value(value)?))
    }

    pub fn map<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Self::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Literal(_) => "literal",
            Self::Structure(_) => "structure",
            Self::Ref(_) => "output reference",
            Self::List(_) => "list",
            Self::Map(_) => "map",
        }
    }

    /// Attribute projection: extends a reference, or looks up a map entry.
    pub fn attr(&self, key: &str) -> Result<Self, EngineError> {
        match self {
            Self::Ref(r) => Ok(Self::Ref(r.attr(key))),
            Self::Map(entries) => entries
                .get(key)
                .cloned()
                .ok_or_else(|| EngineError::Projection {
                    key: key.to_string(),
                    kind: "map without that key",
                }),
            other => Err(EngineError::Projection {
                key: key.to_string(),
                kind: other.kind(),
            }),
        }
    }

    pub fn index(&self, idx: usize) -> Result<Self, EngineError> {
        match self {
            Self::Ref(r) => Ok(Self::Ref(r.index(idx))),
            Self::List(items) => items
                .get(idx)
                .cloned()
                .ok_or_else(|| EngineError::Projection {
                    key: idx.to_string(),
                    kind: "list shorter than the index",
                }),
            other => Err(EngineError::Projection {
                key: idx.to_string(),
                kind: other.kind(),
            }),
        }
    }

    pub fn as_output_ref(&self) -> Option<&OutputRef> {
        match self {
            Self::Ref(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Self::Map(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_literal(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Literal(v) => Some(v),
            _ => None,
        }
    }

    /// Every output reference in this tree, in depth-first order.
    pub fn references(&self) -> Vec<&OutputRef> {
        let mut refs = Vec::new();
        self.collect_references(&mut refs);
        refs
    }

    fn collect_references<'a>(&'a self, refs: &mut Vec<&'a OutputRef>) {
        match self {
            Self::Ref(r) => refs.push(r),
            Self::List(items) => items.iter().for_each(|v| v.collect_references(refs)),
            Self::Map(entries) => entries.values().for_each(|v| v.collect_references(refs)),
            Self::Null | Self::Literal(_) | Self::Structure(_) => {}
        }
    }
}

impl From<OutputRef> for Value {
    fn from(r: OutputRef) -> Self {
        Self::Ref(r)
    }
}

impl From<Structure> for Value {
    fn from(s: Structure) -> Self {
        Self::Structure(Box::new(s))
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::List(items)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(entries: BTreeMap<String, Value>) -> Self {
        Self::Map(entries)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Self::Literal(v)
    }
}

macro_rules! literal_from {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Self::Literal(serde_json::Value::from(v))
                }
            }
        )*
    };
}

literal_from!(bool, f64, i64, u32, usize, String, &str);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::ids::JobId;
    use crate::core::models::structure::{Lattice, Site};

    fn reference() -> OutputRef {
        OutputRef::new(JobId::new())
    }

    #[test]
    fn attr_on_reference_extends_path() {
        let r = reference();
        let projected = Value::from(r.clone()).attr("output").unwrap();
        assert_eq!(projected, Value::Ref(r.attr("output")));
    }

    #[test]
    fn attr_on_map_returns_entry() {
        let value = Value::map([("E0", Value::from(-3.5)), ("V0", Value::from(20.0))]);
        assert_eq!(value.attr("E0").unwrap(), Value::from(-3.5));
    }

    #[test]
    fn attr_on_map_with_missing_key_fails() {
        let value = Value::map([("E0", Value::from(-3.5))]);
        assert!(matches!(
            value.attr("V0"),
            Err(EngineError::Projection { .. })
        ));
    }

    #[test]
    fn attr_on_literal_fails_with_kind() {
        let err = Value::from(1.0).attr("energy").unwrap_err();
        match err {
            EngineError::Projection { key, kind } => {
                assert_eq!(key, "energy");
                assert_eq!(kind, "literal");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn index_on_reference_and_list() {
        let r = reference();
        assert_eq!(
            Value::from(r.clone()).index(4).unwrap(),
            Value::Ref(r.index(4))
        );
        let list = Value::from(vec![Value::from(1i64), Value::from(2i64)]);
        assert_eq!(list.index(1).unwrap(), Value::from(2i64));
        assert!(list.index(2).is_err());
    }

    #[test]
    fn references_walks_nested_containers_in_order() {
        let (a, b, c) = (reference(), reference(), reference());
        let tree = Value::map([
            ("first", Value::from(a.clone())),
            (
                "second",
                Value::from(vec![Value::from(b.clone()), Value::Null, Value::from(c.clone())]),
            ),
            ("third", Value::from("plain")),
        ]);
        let refs = tree.references();
        assert_eq!(refs, vec![&a, &b, &c]);
    }

    #[test]
    fn structures_and_literals_carry_no_references() {
        let structure = Structure::new(Lattice::cubic(3.0), vec![Site::new("Cu", [0.0; 3])]);
        assert!(Value::from(structure).references().is_empty());
        assert!(Value::literal(&[20u32, 20, 20]).unwrap().references().is_empty());
    }

    #[test]
    fn value_round_trips_through_tagged_json() {
        let value = Value::map([
            ("ref", Value::from(reference().attr("dir_name"))),
            ("mesh", Value::literal(&[20u32, 20, 20]).unwrap()),
        ]);
        let json = serde_json::to_string(&value).unwrap();
        assert!(json.contains("\"type\":\"ref\""));
        let back: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(back, value);
    }
}
