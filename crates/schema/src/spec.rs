//! Ontology specification wire format
//!
//! A document is JSON:
//!
//! ```json
//! {
//!   "ontology_name": "base_ontology",
//!   "additional_prefixes": ["edu.example"],
//!   "definitions": [
//!     {
//!       "entry_name": "ft.onto.Token",
//!       "parent_entry": "ontopack.top.Annotation",
//!       "attributes": [
//!         { "name": "pos", "type": "str" },
//!         { "name": "children", "type": "List", "item_type": "ft.onto.Token" }
//!       ]
//!     }
//!   ]
//! }
//! ```
//!
//! Unknown keys are ignored. `description` fields are kept for
//! documentation but have no effect on compilation.

use crate::descriptor::{AttributeDescriptor, ElementDecl, EntryTypeDescriptor, ValueKindDecl};
use ontopack_core::{PrimitiveKind, SchemaError, SchemaResult, StructuralRole, Value};
use serde::{Deserialize, Serialize};

/// Type keyword for lists
pub const LIST_KEYWORD: &str = "List";

/// Type keyword for string-keyed maps
pub const DICT_KEYWORD: &str = "Dict";

/// One ontology document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OntologySpec {
    /// Documentation only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ontology_name: Option<String>,
    /// Documentation only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Extra package prefixes entry names in this document may use
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub additional_prefixes: Vec<String>,
    /// Entry type records
    #[serde(default)]
    pub definitions: Vec<EntryDefinition>,
}

/// One entry type record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntryDefinition {
    /// Globally unique name
    pub entry_name: String,
    /// Parent record or built-in root; the Generic root when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_entry: Option<String>,
    /// Documentation only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Own attributes, in order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<AttributeSpec>,
    /// Link parent endpoint type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_type: Option<String>,
    /// Link child endpoint type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child_type: Option<String>,
    /// Group member type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member_type: Option<String>,
}

/// One attribute record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttributeSpec {
    /// Attribute name
    pub name: String,
    /// `str`, `int`, `bool`, `float`, `List`, `Dict`, or an entry type name
    #[serde(rename = "type")]
    pub type_name: String,
    /// Element type of a `List`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_type: Option<String>,
    /// Key type of a `Dict`; only `str` is supported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_type: Option<String>,
    /// Value type of a `Dict`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<String>,
    /// Documentation only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Initial value of a primitive attribute
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
}

impl OntologySpec {
    /// Parse a JSON document
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::Spec` if the text is not a well-formed document.
    pub fn from_json(json: &str) -> SchemaResult<Self> {
        serde_json::from_str(json).map_err(|e| SchemaError::Spec(e.to_string()))
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> SchemaResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| SchemaError::Spec(e.to_string()))
    }

    /// Convert every record into a descriptor, in declaration order
    pub fn to_descriptors(&self) -> SchemaResult<Vec<EntryTypeDescriptor>> {
        self.definitions.iter().map(EntryDefinition::to_descriptor).collect()
    }
}

impl EntryDefinition {
    /// Convert this record into a descriptor
    ///
    /// Only the attribute type vocabulary is checked here; names are resolved
    /// later by the resolver.
    pub fn to_descriptor(&self) -> SchemaResult<EntryTypeDescriptor> {
        let parent = self
            .parent_entry
            .clone()
            .unwrap_or_else(|| StructuralRole::Generic.root_name().to_string());

        let attributes = self
            .attributes
            .iter()
            .map(|a| a.to_descriptor(&self.entry_name))
            .collect::<SchemaResult<Vec<_>>>()?;

        Ok(EntryTypeDescriptor {
            name: self.entry_name.clone(),
            parent: Some(parent),
            role: None,
            attributes,
            parent_type: self.parent_type.clone(),
            child_type: self.child_type.clone(),
            member_type: self.member_type.clone(),
            description: self.description.clone(),
        })
    }
}

impl AttributeSpec {
    fn unsupported(&self, entry: &str, reason: impl Into<String>) -> SchemaError {
        SchemaError::UnsupportedAttributeType {
            entry: entry.to_string(),
            attribute: self.name.clone(),
            reason: reason.into(),
        }
    }

    fn element(&self, entry: &str, type_name: &str) -> SchemaResult<ElementDecl> {
        if type_name == LIST_KEYWORD || type_name == DICT_KEYWORD {
            return Err(self.unsupported(
                entry,
                format!("nested composite type {} is not supported", type_name),
            ));
        }
        Ok(match PrimitiveKind::from_keyword(type_name) {
            Some(p) => ElementDecl::Primitive(p),
            None => ElementDecl::EntryRef(type_name.to_string()),
        })
    }

    fn kind(&self, entry: &str) -> SchemaResult<ValueKindDecl> {
        match self.type_name.as_str() {
            LIST_KEYWORD => {
                let item = self
                    .item_type
                    .as_deref()
                    .ok_or_else(|| self.unsupported(entry, "List requires item_type"))?;
                Ok(ValueKindDecl::List(self.element(entry, item)?))
            }
            DICT_KEYWORD => {
                let key = self.key_type.as_deref().unwrap_or("str");
                if key != "str" {
                    return Err(self.unsupported(
                        entry,
                        format!("Dict key type {} is not supported, only str", key),
                    ));
                }
                let value = self
                    .value_type
                    .as_deref()
                    .ok_or_else(|| self.unsupported(entry, "Dict requires value_type"))?;
                Ok(ValueKindDecl::Map(self.element(entry, value)?))
            }
            other => Ok(match PrimitiveKind::from_keyword(other) {
                Some(p) => ValueKindDecl::Primitive(p),
                None => ValueKindDecl::EntryRef(other.to_string()),
            }),
        }
    }

    fn default_value(&self, entry: &str, kind: &ValueKindDecl) -> SchemaResult<Option<Value>> {
        let Some(raw) = &self.default else {
            return Ok(None);
        };
        let invalid = |reason: String| SchemaError::InvalidDefault {
            entry: entry.to_string(),
            attribute: self.name.clone(),
            reason,
        };
        let value = match raw {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::String(s) => Value::String(s.clone()),
            serde_json::Value::Number(n) => {
                // A JSON integer literal is a valid float default.
                let wants_float =
                    matches!(kind, ValueKindDecl::Primitive(PrimitiveKind::Float));
                match (n.as_i64(), n.as_f64()) {
                    (Some(i), _) if !wants_float => Value::Int(i),
                    (_, Some(f)) => Value::Float(f),
                    _ => return Err(invalid(format!("number {} is out of range", n))),
                }
            }
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
                return Err(invalid("only scalar defaults are supported".to_string()))
            }
        };
        Ok(Some(value))
    }

    /// Convert this record into a descriptor for an attribute of `entry`
    pub fn to_descriptor(&self, entry: &str) -> SchemaResult<AttributeDescriptor> {
        let kind = self.kind(entry)?;
        let default = self.default_value(entry, &kind)?;
        Ok(AttributeDescriptor {
            name: self.name.clone(),
            kind,
            default,
            description: self.description.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attr(json: &str) -> AttributeSpec {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_parse_minimal_document() {
        let spec = OntologySpec::from_json(
            r#"{"definitions": [{"entry_name": "ft.onto.Token", "parent_entry": "ontopack.top.Annotation"}]}"#,
        )
        .unwrap();
        assert_eq!(spec.definitions.len(), 1);
        assert!(spec.ontology_name.is_none());
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let spec = OntologySpec::from_json(
            r#"{"imports": ["base.json"], "definitions": [], "extra": 1}"#,
        )
        .unwrap();
        assert!(spec.definitions.is_empty());
    }

    #[test]
    fn test_malformed_document() {
        let err = OntologySpec::from_json("{\"definitions\": 3}").unwrap_err();
        assert!(matches!(err, SchemaError::Spec(_)));
    }

    #[test]
    fn test_missing_parent_defaults_to_generic() {
        let def = EntryDefinition {
            entry_name: "ft.onto.Meta".into(),
            ..Default::default()
        };
        let d = def.to_descriptor().unwrap();
        assert_eq!(d.parent.as_deref(), Some("ontopack.top.Generic"));
    }

    #[test]
    fn test_list_of_entries() {
        let a = attr(r#"{"name": "kids", "type": "List", "item_type": "ft.onto.Node"}"#);
        let d = a.to_descriptor("ft.onto.Node").unwrap();
        assert_eq!(
            d.kind,
            ValueKindDecl::List(ElementDecl::EntryRef("ft.onto.Node".into()))
        );
    }

    #[test]
    fn test_list_requires_item_type() {
        let a = attr(r#"{"name": "kids", "type": "List"}"#);
        assert!(matches!(
            a.to_descriptor("ft.onto.Node"),
            Err(SchemaError::UnsupportedAttributeType { .. })
        ));
    }

    #[test]
    fn test_nested_composite_rejected() {
        let a = attr(r#"{"name": "grid", "type": "List", "item_type": "List"}"#);
        assert!(matches!(
            a.to_descriptor("ft.onto.Node"),
            Err(SchemaError::UnsupportedAttributeType { .. })
        ));
    }

    #[test]
    fn test_dict_key_must_be_str() {
        let ok = attr(r#"{"name": "m", "type": "Dict", "value_type": "int"}"#);
        assert_eq!(
            ok.to_descriptor("e").unwrap().kind,
            ValueKindDecl::Map(ElementDecl::Primitive(PrimitiveKind::Int))
        );

        let bad = attr(r#"{"name": "m", "type": "Dict", "key_type": "int", "value_type": "str"}"#);
        assert!(matches!(
            bad.to_descriptor("e"),
            Err(SchemaError::UnsupportedAttributeType { .. })
        ));

        let missing = attr(r#"{"name": "m", "type": "Dict", "key_type": "str"}"#);
        assert!(missing.to_descriptor("e").is_err());
    }

    #[test]
    fn test_defaults() {
        let a = attr(r#"{"name": "score", "type": "float", "default": 1}"#);
        assert_eq!(a.to_descriptor("e").unwrap().default, Some(Value::Float(1.0)));

        let a = attr(r#"{"name": "n", "type": "int", "default": 3}"#);
        assert_eq!(a.to_descriptor("e").unwrap().default, Some(Value::Int(3)));

        let a = attr(r#"{"name": "tags", "type": "str", "default": ["a"]}"#);
        assert!(matches!(
            a.to_descriptor("e"),
            Err(SchemaError::InvalidDefault { .. })
        ));
    }

    #[test]
    fn test_json_roundtrip() {
        let spec = OntologySpec {
            ontology_name: Some("test".into()),
            definitions: vec![EntryDefinition {
                entry_name: "ft.onto.Token".into(),
                parent_entry: Some("ontopack.top.Annotation".into()),
                attributes: vec![attr(r#"{"name": "pos", "type": "str"}"#)],
                ..Default::default()
            }],
            ..Default::default()
        };
        let back = OntologySpec::from_json(&spec.to_json().unwrap()).unwrap();
        assert_eq!(spec, back);
    }
}
