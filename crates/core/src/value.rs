//! Attribute values
//!
//! This module defines:
//! - Value: Runtime value stored in an entry attribute
//! - PrimitiveKind: The four scalar attribute kinds of the ontology format
//!
//! ## Type Rules
//!
//! - No implicit coercion: `Int(1) != Float(1.0)` and an `int` is never
//!   accepted where a `float` attribute is declared
//! - `Null` is the unset state of scalar and entry-reference attributes;
//!   container attributes are never null, they start empty
//! - `Entry` holds an `EntryRef`, never an owned copy of the target

use crate::types::EntryRef;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Runtime attribute value
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Value {
    /// Unset
    Null,
    /// Boolean value
    Bool(bool),
    /// 64-bit signed integer
    Int(i64),
    /// 64-bit floating point (IEEE-754)
    Float(f64),
    /// UTF-8 string
    String(String),
    /// Homogeneous list
    List(Vec<Value>),
    /// String-keyed map, ordered by key
    Map(BTreeMap<String, Value>),
    /// Reference to another entry
    Entry(EntryRef),
}

// IEEE-754 float semantics: NaN != NaN, -0.0 == 0.0
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Entry(a), Value::Entry(b)) => a == b,
            _ => false,
        }
    }
}

impl Value {
    /// Get the kind name as a string
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Bool(_) => "Bool",
            Value::Int(_) => "Int",
            Value::Float(_) => "Float",
            Value::String(_) => "String",
            Value::List(_) => "List",
            Value::Map(_) => "Map",
            Value::Entry(_) => "Entry",
        }
    }

    /// Check if this is the unset value
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Get as bool if this is a Bool value
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as i64 if this is an Int value
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Get as f64 if this is a Float value
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Get as &str if this is a String value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as a slice if this is a List value
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Get as a map if this is a Map value
    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Get the reference if this is an Entry value
    pub fn as_entry(&self) -> Option<EntryRef> {
        match self {
            Value::Entry(r) => Some(*r),
            _ => None,
        }
    }

    /// Every entry reference held by this value, including inside containers
    pub fn entry_refs(&self) -> Vec<EntryRef> {
        match self {
            Value::Entry(r) => vec![*r],
            Value::List(items) => items.iter().filter_map(Value::as_entry).collect(),
            Value::Map(m) => m.values().filter_map(Value::as_entry).collect(),
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::String(s) => write!(f, "{:?}", s),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            Value::Map(m) => {
                f.write_str("{")?;
                for (i, (k, v)) in m.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{:?}: {}", k, v)?;
                }
                f.write_str("}")
            }
            Value::Entry(r) => write!(f, "{}", r),
        }
    }
}

// ============================================================================
// From implementations for ergonomic API usage
// ============================================================================

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i as i64)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<EntryRef> for Value {
    fn from(r: EntryRef) -> Self {
        Value::Entry(r)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(m: BTreeMap<String, Value>) -> Self {
        Value::Map(m)
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Null
    }
}

// ============================================================================
// Primitive kinds
// ============================================================================

/// Scalar attribute kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrimitiveKind {
    /// `str`
    Str,
    /// `int`
    Int,
    /// `bool`
    Bool,
    /// `float`
    Float,
}

impl PrimitiveKind {
    /// Parse the ontology format's type keyword
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "str" => Some(PrimitiveKind::Str),
            "int" => Some(PrimitiveKind::Int),
            "bool" => Some(PrimitiveKind::Bool),
            "float" => Some(PrimitiveKind::Float),
            _ => None,
        }
    }

    /// The ontology format's type keyword
    pub const fn keyword(&self) -> &'static str {
        match self {
            PrimitiveKind::Str => "str",
            PrimitiveKind::Int => "int",
            PrimitiveKind::Bool => "bool",
            PrimitiveKind::Float => "float",
        }
    }

    /// Whether `value` is a non-null value of this kind
    pub fn accepts(&self, value: &Value) -> bool {
        matches!(
            (self, value),
            (PrimitiveKind::Str, Value::String(_))
                | (PrimitiveKind::Int, Value::Int(_))
                | (PrimitiveKind::Bool, Value::Bool(_))
                | (PrimitiveKind::Float, Value::Float(_))
        )
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}
