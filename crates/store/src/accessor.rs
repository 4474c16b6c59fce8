//! Attribute access over resolved types
//!
//! `AttributeAccessor` is the only path that writes attribute slots. A write
//! is checked in full before anything changes:
//! - the name must be in the type's flattened attribute set
//! - the value kind must match the declared kind, container elements included
//! - entry references must resolve (through an `EntryResolver`) to an entry
//!   of the declared type or a subtype
//!
//! `Null` clears scalar and reference attributes. Containers cannot be
//! cleared to `Null`; assign an empty list or map instead.
//!
//! `AttributeValue` maps Rust types onto `Value` for typed access through
//! `Pack::get_as` and `Pack::set_as`.

use crate::entry::EntryInstance;
use ontopack_core::{EntryRef, InstanceError, InstanceResult, Value};
use ontopack_schema::{AttributeKind, ElementKind, ResolvedAttribute, TypeId, TypeTable};
use std::collections::BTreeMap;

// ============================================================================
// EntryResolver
// ============================================================================

/// Resolves entry references during attribute validation
///
/// A pack resolves its own entries and rejects references into other
/// packs; the multi-pack registry resolves references into any registered
/// pack.
pub trait EntryResolver {
    /// Exact type of the referenced entry
    ///
    /// # Errors
    ///
    /// `EntryNotFound` if the entry is not live, `CrossPackReference` if
    /// this resolver cannot see the entry's pack.
    fn resolve_type(&self, entry: EntryRef) -> InstanceResult<TypeId>;
}

// ============================================================================
// AttributeAccessor
// ============================================================================

/// Typed getter/setter over one type table
#[derive(Debug, Clone, Copy)]
pub struct AttributeAccessor<'t> {
    table: &'t TypeTable,
}

impl<'t> AttributeAccessor<'t> {
    /// Accessor over `table`
    pub fn new(table: &'t TypeTable) -> Self {
        Self { table }
    }

    /// Slot and descriptor of a flattened attribute
    pub fn lookup(
        &self,
        instance: &EntryInstance,
        name: &str,
    ) -> InstanceResult<(usize, &'t ResolvedAttribute)> {
        let ty = self.table.resolved(instance.type_id());
        ty.attribute_slot(name)
            .map(|slot| (slot, &ty.attributes()[slot]))
            .ok_or_else(|| InstanceError::UnknownAttribute {
                type_name: ty.name().to_string(),
                attribute: name.to_string(),
            })
    }

    /// Current value of an attribute
    pub fn get<'i>(&self, instance: &'i EntryInstance, name: &str) -> InstanceResult<&'i Value> {
        let (slot, _) = self.lookup(instance, name)?;
        Ok(&instance.values[slot])
    }

    /// Validate a write without performing it; returns the target slot
    pub fn check(
        &self,
        instance: &EntryInstance,
        name: &str,
        value: &Value,
        resolver: &dyn EntryResolver,
    ) -> InstanceResult<usize> {
        let (slot, attr) = self.lookup(instance, name)?;
        self.check_kind(&attr.name, attr.kind, value, resolver)?;
        Ok(slot)
    }

    /// Validate and perform a write; returns the previous value
    ///
    /// This does not maintain any pack bookkeeping; packs route writes
    /// through `Pack::set_attribute`.
    pub fn set(
        &self,
        instance: &mut EntryInstance,
        name: &str,
        value: Value,
        resolver: &dyn EntryResolver,
    ) -> InstanceResult<Value> {
        let slot = self.check(instance, name, &value, resolver)?;
        Ok(std::mem::replace(&mut instance.values[slot], value))
    }

    fn check_kind(
        &self,
        attribute: &str,
        kind: AttributeKind,
        value: &Value,
        resolver: &dyn EntryResolver,
    ) -> InstanceResult<()> {
        match (kind, value) {
            (AttributeKind::Primitive(_) | AttributeKind::Entry(_), Value::Null) => Ok(()),
            (AttributeKind::Primitive(p), v) if p.accepts(v) => Ok(()),
            (AttributeKind::Entry(expected), Value::Entry(r)) => {
                self.check_entry(attribute, expected, *r, resolver)
            }
            (AttributeKind::List(element), Value::List(items)) => items
                .iter()
                .try_for_each(|item| self.check_element(attribute, element, item, resolver)),
            (AttributeKind::Map(element), Value::Map(entries)) => entries
                .values()
                .try_for_each(|item| self.check_element(attribute, element, item, resolver)),
            _ => Err(InstanceError::TypeMismatch {
                attribute: attribute.to_string(),
                expected: self.table.describe_kind(&kind),
                found: value.type_name().to_string(),
            }),
        }
    }

    fn check_element(
        &self,
        attribute: &str,
        element: ElementKind,
        item: &Value,
        resolver: &dyn EntryResolver,
    ) -> InstanceResult<()> {
        match (element, item) {
            (ElementKind::Primitive(p), v) if p.accepts(v) => Ok(()),
            (ElementKind::Entry(expected), Value::Entry(r)) => {
                self.check_entry(attribute, expected, *r, resolver)
            }
            (ElementKind::Primitive(p), v) => Err(InstanceError::TypeMismatch {
                attribute: attribute.to_string(),
                expected: p.keyword().to_string(),
                found: v.type_name().to_string(),
            }),
            (ElementKind::Entry(expected), v) => Err(InstanceError::TypeMismatch {
                attribute: attribute.to_string(),
                expected: self.table.name_of(expected).to_string(),
                found: v.type_name().to_string(),
            }),
        }
    }

    fn check_entry(
        &self,
        attribute: &str,
        expected: TypeId,
        target: EntryRef,
        resolver: &dyn EntryResolver,
    ) -> InstanceResult<()> {
        let actual = resolver.resolve_type(target)?;
        if self.table.is_subtype(actual, expected) {
            Ok(())
        } else {
            Err(InstanceError::TypeMismatch {
                attribute: attribute.to_string(),
                expected: self.table.name_of(expected).to_string(),
                found: self.table.name_of(actual).to_string(),
            })
        }
    }
}

// ============================================================================
// AttributeValue
// ============================================================================

/// Rust types with a fixed `Value` representation
pub trait AttributeValue: Sized {
    /// Read from a value; `None` if the value has another kind
    fn from_value(value: &Value) -> Option<Self>;

    /// Convert into a value
    fn into_value(self) -> Value;
}

impl AttributeValue for String {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_str().map(str::to_string)
    }

    fn into_value(self) -> Value {
        Value::String(self)
    }
}

impl AttributeValue for i64 {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_int()
    }

    fn into_value(self) -> Value {
        Value::Int(self)
    }
}

impl AttributeValue for bool {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_bool()
    }

    fn into_value(self) -> Value {
        Value::Bool(self)
    }
}

impl AttributeValue for f64 {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_float()
    }

    fn into_value(self) -> Value {
        Value::Float(self)
    }
}

impl AttributeValue for EntryRef {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_entry()
    }

    fn into_value(self) -> Value {
        Value::Entry(self)
    }
}

impl<T: AttributeValue> AttributeValue for Vec<T> {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_list()?.iter().map(T::from_value).collect()
    }

    fn into_value(self) -> Value {
        Value::List(self.into_iter().map(T::into_value).collect())
    }
}

impl<T: AttributeValue> AttributeValue for BTreeMap<String, T> {
    fn from_value(value: &Value) -> Option<Self> {
        value
            .as_map()?
            .iter()
            .map(|(k, v)| T::from_value(v).map(|v| (k.clone(), v)))
            .collect()
    }

    fn into_value(self) -> Value {
        Value::Map(self.into_iter().map(|(k, v)| (k, v.into_value())).collect())
    }
}

/// `None` reads and writes `Null`
impl<T: AttributeValue> AttributeValue for Option<T> {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(None),
            other => T::from_value(other).map(Some),
        }
    }

    fn into_value(self) -> Value {
        match self {
            Some(v) => v.into_value(),
            None => Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::RoleData;
    use ontopack_core::{EntryId, PackId, PrimitiveKind, StructuralRole};
    use ontopack_schema::{
        resolve, AttributeDescriptor, ElementDecl, EntryTypeDescriptor, ValueKindDecl,
    };
    use rustc_hash::FxHashMap;

    /// Resolver over a fixed map of entries in one pack
    struct Fixed {
        pack: PackId,
        types: FxHashMap<EntryId, TypeId>,
    }

    impl EntryResolver for Fixed {
        fn resolve_type(&self, entry: EntryRef) -> InstanceResult<TypeId> {
            if !entry.is_in(self.pack) {
                return Err(InstanceError::CrossPackReference(entry));
            }
            self.types
                .get(&entry.entry)
                .copied()
                .ok_or(InstanceError::EntryNotFound(entry.entry))
        }
    }

    fn table() -> TypeTable {
        resolve(vec![
            EntryTypeDescriptor::under("ft.onto.Token", StructuralRole::Annotation),
            EntryTypeDescriptor::new("ft.onto.Word").with_parent("ft.onto.Token"),
            EntryTypeDescriptor::under("ft.onto.Sentence", StructuralRole::Annotation),
            EntryTypeDescriptor::under("ft.onto.Node", StructuralRole::Generic)
                .with_attribute(AttributeDescriptor::primitive("label", PrimitiveKind::Str))
                .with_attribute(AttributeDescriptor::primitive("score", PrimitiveKind::Float))
                .with_attribute(AttributeDescriptor::entry_ref("head", "ft.onto.Token"))
                .with_attribute(AttributeDescriptor::new(
                    "tags",
                    ValueKindDecl::List(ElementDecl::Primitive(PrimitiveKind::Str)),
                ))
                .with_attribute(AttributeDescriptor::new(
                    "by_role",
                    ValueKindDecl::Map(ElementDecl::EntryRef("ft.onto.Token".into())),
                )),
        ])
        .unwrap()
    }

    fn setup(table: &TypeTable) -> (EntryInstance, Fixed) {
        let pack = PackId::new();
        let node = table.get("ft.onto.Node").unwrap();
        let instance = EntryInstance {
            id: EntryId::new(0),
            pack,
            type_id: node.id(),
            type_name: node.name().to_string(),
            values: node.attributes().iter().map(|a| a.default.clone()).collect(),
            role: RoleData::Generic,
        };
        let mut types = FxHashMap::default();
        types.insert(EntryId::new(1), table.id_of("ft.onto.Word").unwrap());
        types.insert(EntryId::new(2), table.id_of("ft.onto.Sentence").unwrap());
        (instance, Fixed { pack, types })
    }

    #[test]
    fn test_get_defaults() {
        let table = table();
        let (instance, _) = setup(&table);
        let accessor = AttributeAccessor::new(&table);
        assert_eq!(accessor.get(&instance, "label").unwrap(), &Value::Null);
        assert_eq!(accessor.get(&instance, "tags").unwrap(), &Value::List(vec![]));
        assert!(matches!(
            accessor.get(&instance, "missing"),
            Err(InstanceError::UnknownAttribute { .. })
        ));
    }

    #[test]
    fn test_set_primitive() {
        let table = table();
        let (mut instance, resolver) = setup(&table);
        let accessor = AttributeAccessor::new(&table);

        let old = accessor
            .set(&mut instance, "label", Value::from("NP"), &resolver)
            .unwrap();
        assert_eq!(old, Value::Null);
        assert_eq!(accessor.get(&instance, "label").unwrap(), &Value::from("NP"));

        // No int to float coercion
        let err = accessor
            .set(&mut instance, "score", Value::Int(1), &resolver)
            .unwrap_err();
        assert_eq!(
            err,
            InstanceError::TypeMismatch {
                attribute: "score".into(),
                expected: "float".into(),
                found: "Int".into()
            }
        );
    }

    #[test]
    fn test_entry_reference_subtype() {
        let table = table();
        let (mut instance, resolver) = setup(&table);
        let accessor = AttributeAccessor::new(&table);

        let word = Value::Entry(EntryRef::new(resolver.pack, EntryId::new(1)));
        accessor.set(&mut instance, "head", word, &resolver).unwrap();

        let sentence = Value::Entry(EntryRef::new(resolver.pack, EntryId::new(2)));
        assert!(matches!(
            accessor.set(&mut instance, "head", sentence, &resolver),
            Err(InstanceError::TypeMismatch { .. })
        ));

        let missing = Value::Entry(EntryRef::new(resolver.pack, EntryId::new(9)));
        assert_eq!(
            accessor.set(&mut instance, "head", missing, &resolver),
            Err(InstanceError::EntryNotFound(EntryId::new(9)))
        );

        let foreign = EntryRef::new(PackId::new(), EntryId::new(1));
        assert_eq!(
            accessor.set(&mut instance, "head", Value::Entry(foreign), &resolver),
            Err(InstanceError::CrossPackReference(foreign))
        );
    }

    #[test]
    fn test_container_elements_checked() {
        let table = table();
        let (mut instance, resolver) = setup(&table);
        let accessor = AttributeAccessor::new(&table);

        let tags = Value::List(vec![Value::from("a"), Value::Int(2)]);
        assert!(accessor.set(&mut instance, "tags", tags, &resolver).is_err());
        assert_eq!(accessor.get(&instance, "tags").unwrap(), &Value::List(vec![]));

        assert!(matches!(
            accessor.set(&mut instance, "tags", Value::Null, &resolver),
            Err(InstanceError::TypeMismatch { .. })
        ));

        let mut roles = BTreeMap::new();
        roles.insert(
            "subj".to_string(),
            Value::Entry(EntryRef::new(resolver.pack, EntryId::new(1))),
        );
        accessor
            .set(&mut instance, "by_role", Value::Map(roles), &resolver)
            .unwrap();
    }

    #[test]
    fn test_attribute_value_roundtrip() {
        let v = vec![1i64, 2, 3].into_value();
        assert_eq!(Vec::<i64>::from_value(&v), Some(vec![1, 2, 3]));
        assert_eq!(Vec::<String>::from_value(&v), None);

        assert_eq!(Option::<String>::from_value(&Value::Null), Some(None));
        assert_eq!(Option::<String>::None.into_value(), Value::Null);

        let mut m = BTreeMap::new();
        m.insert("pos".to_string(), 0.5f64);
        let v = m.clone().into_value();
        assert_eq!(BTreeMap::<String, f64>::from_value(&v), Some(m));
    }
}
