//! Source introspection
//!
//! Strongly typed Source records describe themselves through [`Describable`]:
//! an ordered field declaration list, a by-name getter and a by-name setter.
//! There is no runtime reflection; every Source type enumerates its fields at
//! compile time and the mapper works through the object-safe [`SourceRecord`]
//! view that is blanket-implemented for every `Describable`.
//!
//! Copyright (c) 2025 Structbridge Team
//! Licensed under the Apache-2.0 license

use crate::{Error, Result};
use std::any::{Any, TypeId};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Field type as declared by a Source type, before classification
#[derive(Debug, Clone, PartialEq)]
pub enum DeclaredType {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    Text,
    List(Box<DeclaredType>),
    Set(Box<DeclaredType>),
    Map(Box<DeclaredType>, Box<DeclaredType>),
    /// Nested record; `None` when the concrete type cannot be named
    Record(Option<TypeRef>),
    /// Anything outside the fixed classification table
    Opaque(&'static str),
}

/// Copyable handle on a Source type
///
/// Identity is the Rust [`TypeId`]; the name is only used for display and
/// error messages.
#[derive(Clone, Copy)]
pub struct TypeRef {
    name: &'static str,
    id: TypeId,
    describe: fn() -> Vec<FieldDecl>,
    construct: fn() -> Box<dyn SourceRecord>,
}

fn construct_default<R: Describable>() -> Box<dyn SourceRecord> {
    Box::new(R::default())
}

impl TypeRef {
    pub fn of<R: Describable>() -> Self {
        Self {
            name: R::TYPE_NAME,
            id: TypeId::of::<R>(),
            describe: R::describe,
            construct: construct_default::<R>,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Declared fields in declaration order
    pub fn fields(&self) -> Vec<FieldDecl> {
        (self.describe)()
    }

    /// Fresh instance built with the type's default constructor
    pub fn construct(&self) -> Box<dyn SourceRecord> {
        (self.construct)()
    }
}

impl fmt::Debug for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TypeRef").field(&self.name).finish()
    }
}

impl PartialEq for TypeRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeRef {}

impl Hash for TypeRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// One declared field of a Source type
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    pub name: String,
    pub declared: DeclaredType,
    pub required: bool,
}

impl FieldDecl {
    pub fn new(name: impl Into<String>, declared: DeclaredType, required: bool) -> Self {
        Self {
            name: name.into(),
            declared,
            required,
        }
    }

    pub fn required<T: SourceField>(name: impl Into<String>) -> Self {
        Self::new(name, T::declared_type(), true)
    }

    pub fn optional<T: SourceField>(name: impl Into<String>) -> Self {
        Self::new(name, T::declared_type(), false)
    }

    /// Optional nested record field of type `R`
    pub fn record<R: Describable>(name: impl Into<String>) -> Self {
        Self::new(name, DeclaredType::Record(Some(TypeRef::of::<R>())), false)
    }

    pub fn mark_required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// Native value read from or written to a Source field
#[derive(Debug)]
pub enum SourceValue {
    Bool(bool),
    Byte(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    Double(f64),
    Str(String),
    List(Vec<SourceValue>),
    Set(Vec<SourceValue>),
    Map(Vec<(SourceValue, SourceValue)>),
    Struct(Box<dyn SourceRecord>),
}

impl SourceValue {
    pub fn kind(&self) -> &'static str {
        match self {
            SourceValue::Bool(_) => "Bool",
            SourceValue::Byte(_) => "Byte",
            SourceValue::I16(_) => "Int16",
            SourceValue::I32(_) => "Int32",
            SourceValue::I64(_) => "Int64",
            SourceValue::Double(_) => "Double",
            SourceValue::Str(_) => "String",
            SourceValue::List(_) => "List",
            SourceValue::Set(_) => "Set",
            SourceValue::Map(_) => "Map",
            SourceValue::Struct(_) => "Struct",
        }
    }
}

impl Clone for SourceValue {
    fn clone(&self) -> Self {
        match self {
            SourceValue::Bool(v) => SourceValue::Bool(*v),
            SourceValue::Byte(v) => SourceValue::Byte(*v),
            SourceValue::I16(v) => SourceValue::I16(*v),
            SourceValue::I32(v) => SourceValue::I32(*v),
            SourceValue::I64(v) => SourceValue::I64(*v),
            SourceValue::Double(v) => SourceValue::Double(*v),
            SourceValue::Str(v) => SourceValue::Str(v.clone()),
            SourceValue::List(items) => SourceValue::List(items.clone()),
            SourceValue::Set(items) => SourceValue::Set(items.clone()),
            SourceValue::Map(entries) => SourceValue::Map(entries.clone()),
            SourceValue::Struct(record) => SourceValue::Struct(record.clone_record()),
        }
    }
}

/// Compile-time introspection capability of a Source type
///
/// `field` returns `None` for an unset or null field; `set_field` receives
/// `None` for an explicit null.
pub trait Describable: fmt::Debug + Clone + Default + Send + Sync + 'static {
    /// Fully qualified display name
    const TYPE_NAME: &'static str;

    fn describe() -> Vec<FieldDecl>;

    fn field(&self, name: &str) -> Option<SourceValue>;

    fn set_field(&mut self, name: &str, value: Option<SourceValue>) -> Result<()>;
}

/// Object-safe view over any [`Describable`] record
pub trait SourceRecord: fmt::Debug + Send + Sync + Any {
    fn type_ref(&self) -> TypeRef;

    fn read_field(&self, name: &str) -> Option<SourceValue>;

    fn write_field(&mut self, name: &str, value: Option<SourceValue>) -> Result<()>;

    fn clone_record(&self) -> Box<dyn SourceRecord>;

    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<R: Describable> SourceRecord for R {
    fn type_ref(&self) -> TypeRef {
        TypeRef::of::<R>()
    }

    fn read_field(&self, name: &str) -> Option<SourceValue> {
        self.field(name)
    }

    fn write_field(&mut self, name: &str, value: Option<SourceValue>) -> Result<()> {
        self.set_field(name, value)
    }

    fn clone_record(&self) -> Box<dyn SourceRecord> {
        Box::new(self.clone())
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

/// Recover the concrete type behind a boxed record
pub fn downcast_record<R: Describable>(record: Box<dyn SourceRecord>) -> Result<R> {
    let actual = record.type_ref().name();
    record
        .into_any()
        .downcast::<R>()
        .map(|boxed| *boxed)
        .map_err(|_| Error::conversion(actual, R::TYPE_NAME))
}

/// Wrap a nested record as a field value
pub fn record_value<R: Describable>(record: &R) -> SourceValue {
    SourceValue::Struct(Box::new(record.clone()))
}

/// Unwrap a nested record field value; `None` stays `None`
pub fn record_from_value<R: Describable>(value: Option<SourceValue>) -> Result<Option<R>> {
    match value {
        None => Ok(None),
        Some(SourceValue::Struct(record)) => downcast_record(record).map(Some),
        Some(other) => Err(Error::conversion(other.kind(), R::TYPE_NAME)),
    }
}

/// Conversion between a native field type and [`SourceValue`]
///
/// Reading `None` into a non-optional type yields its zero value.
pub trait SourceField: Sized {
    fn declared_type() -> DeclaredType;

    fn to_source(&self) -> Option<SourceValue>;

    fn from_source(value: Option<SourceValue>) -> Result<Self>;
}

/// Implement [`SourceField`] for a [`Describable`] type so it can appear
/// inside `Option`, `Vec` and maps of other records
#[macro_export]
macro_rules! impl_source_field {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::source::SourceField for $ty {
                fn declared_type() -> $crate::source::DeclaredType {
                    $crate::source::DeclaredType::Record(Some($crate::source::TypeRef::of::<$ty>()))
                }

                fn to_source(&self) -> Option<$crate::source::SourceValue> {
                    Some($crate::source::record_value(self))
                }

                fn from_source(value: Option<$crate::source::SourceValue>) -> $crate::Result<Self> {
                    $crate::source::record_from_value::<$ty>(value).map(Option::unwrap_or_default)
                }
            }
        )+
    };
}

impl SourceField for bool {
    fn declared_type() -> DeclaredType {
        DeclaredType::Bool
    }

    fn to_source(&self) -> Option<SourceValue> {
        Some(SourceValue::Bool(*self))
    }

    fn from_source(value: Option<SourceValue>) -> Result<Self> {
        match value {
            None => Ok(false),
            Some(SourceValue::Bool(v)) => Ok(v),
            Some(other) => Err(Error::conversion(other.kind(), "Bool")),
        }
    }
}

macro_rules! impl_integer_field {
    ($($ty:ty => $declared:ident, $variant:ident, $name:literal);* $(;)?) => {
        $(
            impl SourceField for $ty {
                fn declared_type() -> DeclaredType {
                    DeclaredType::$declared
                }

                fn to_source(&self) -> Option<SourceValue> {
                    Some(SourceValue::$variant(*self))
                }

                fn from_source(value: Option<SourceValue>) -> Result<Self> {
                    match value {
                        None => Ok(0),
                        Some(SourceValue::Byte(v)) => Ok(v as $ty),
                        Some(SourceValue::I16(v)) => Ok(v as $ty),
                        Some(SourceValue::I32(v)) => Ok(v as $ty),
                        Some(SourceValue::I64(v)) => Ok(v as $ty),
                        Some(other) => Err(Error::conversion(other.kind(), $name)),
                    }
                }
            }
        )*
    };
}

impl_integer_field! {
    i8 => Int8, Byte, "Byte";
    i16 => Int16, I16, "Int16";
    i32 => Int32, I32, "Int32";
    i64 => Int64, I64, "Int64";
}

impl SourceField for f64 {
    fn declared_type() -> DeclaredType {
        DeclaredType::Float64
    }

    fn to_source(&self) -> Option<SourceValue> {
        Some(SourceValue::Double(*self))
    }

    fn from_source(value: Option<SourceValue>) -> Result<Self> {
        match value {
            None => Ok(0.0),
            Some(SourceValue::Double(v)) => Ok(v),
            Some(other) => Err(Error::conversion(other.kind(), "Double")),
        }
    }
}

impl SourceField for f32 {
    fn declared_type() -> DeclaredType {
        DeclaredType::Float32
    }

    fn to_source(&self) -> Option<SourceValue> {
        Some(SourceValue::Double(f64::from(*self)))
    }

    fn from_source(value: Option<SourceValue>) -> Result<Self> {
        f64::from_source(value).map(|v| v as f32)
    }
}

impl SourceField for String {
    fn declared_type() -> DeclaredType {
        DeclaredType::Text
    }

    fn to_source(&self) -> Option<SourceValue> {
        Some(SourceValue::Str(self.clone()))
    }

    fn from_source(value: Option<SourceValue>) -> Result<Self> {
        match value {
            None => Ok(String::new()),
            Some(SourceValue::Str(v)) => Ok(v),
            Some(other) => Err(Error::conversion(other.kind(), "String")),
        }
    }
}

impl<T: SourceField> SourceField for Option<T> {
    fn declared_type() -> DeclaredType {
        T::declared_type()
    }

    fn to_source(&self) -> Option<SourceValue> {
        self.as_ref().and_then(T::to_source)
    }

    fn from_source(value: Option<SourceValue>) -> Result<Self> {
        match value {
            None => Ok(None),
            some => T::from_source(some).map(Some),
        }
    }
}

fn elements_to_source<'a, T: SourceField + 'a>(
    items: impl Iterator<Item = &'a T>,
) -> Vec<SourceValue> {
    items.filter_map(T::to_source).collect()
}

fn elements_from_source<T: SourceField, C: FromIterator<T>>(
    value: Option<SourceValue>,
    collection: &str,
) -> Result<C> {
    match value {
        None => Ok(std::iter::empty::<T>().collect()),
        Some(SourceValue::List(items)) | Some(SourceValue::Set(items)) => items
            .into_iter()
            .map(|item| T::from_source(Some(item)))
            .collect(),
        Some(other) => Err(Error::conversion(other.kind(), collection)),
    }
}

fn entries_to_source<'a, K, V>(entries: impl Iterator<Item = (&'a K, &'a V)>) -> SourceValue
where
    K: SourceField + 'a,
    V: SourceField + 'a,
{
    SourceValue::Map(
        entries
            .filter_map(|(k, v)| Some((k.to_source()?, v.to_source()?)))
            .collect(),
    )
}

fn entries_from_source<K, V, C>(value: Option<SourceValue>) -> Result<C>
where
    K: SourceField,
    V: SourceField,
    C: FromIterator<(K, V)>,
{
    match value {
        None => Ok(std::iter::empty::<(K, V)>().collect()),
        Some(SourceValue::Map(entries)) => entries
            .into_iter()
            .map(|(k, v)| -> Result<(K, V)> {
                Ok((K::from_source(Some(k))?, V::from_source(Some(v))?))
            })
            .collect(),
        Some(other) => Err(Error::conversion(other.kind(), "Map")),
    }
}

impl<T: SourceField> SourceField for Vec<T> {
    fn declared_type() -> DeclaredType {
        DeclaredType::List(Box::new(T::declared_type()))
    }

    fn to_source(&self) -> Option<SourceValue> {
        Some(SourceValue::List(elements_to_source(self.iter())))
    }

    fn from_source(value: Option<SourceValue>) -> Result<Self> {
        elements_from_source(value, "List")
    }
}

impl<T: SourceField + Ord> SourceField for BTreeSet<T> {
    fn declared_type() -> DeclaredType {
        DeclaredType::Set(Box::new(T::declared_type()))
    }

    fn to_source(&self) -> Option<SourceValue> {
        Some(SourceValue::Set(elements_to_source(self.iter())))
    }

    fn from_source(value: Option<SourceValue>) -> Result<Self> {
        elements_from_source(value, "Set")
    }
}

impl<T: SourceField + Eq + Hash> SourceField for HashSet<T> {
    fn declared_type() -> DeclaredType {
        DeclaredType::Set(Box::new(T::declared_type()))
    }

    fn to_source(&self) -> Option<SourceValue> {
        Some(SourceValue::Set(elements_to_source(self.iter())))
    }

    fn from_source(value: Option<SourceValue>) -> Result<Self> {
        elements_from_source(value, "Set")
    }
}

impl<K: SourceField + Ord, V: SourceField> SourceField for BTreeMap<K, V> {
    fn declared_type() -> DeclaredType {
        DeclaredType::Map(Box::new(K::declared_type()), Box::new(V::declared_type()))
    }

    fn to_source(&self) -> Option<SourceValue> {
        Some(entries_to_source(self.iter()))
    }

    fn from_source(value: Option<SourceValue>) -> Result<Self> {
        entries_from_source(value)
    }
}

impl<K: SourceField + Eq + Hash, V: SourceField> SourceField for HashMap<K, V> {
    fn declared_type() -> DeclaredType {
        DeclaredType::Map(Box::new(K::declared_type()), Box::new(V::declared_type()))
    }

    fn to_source(&self) -> Option<SourceValue> {
        Some(entries_to_source(self.iter()))
    }

    fn from_source(value: Option<SourceValue>) -> Result<Self> {
        entries_from_source(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Point {
        x: i32,
        label: Option<String>,
    }

    impl Describable for Point {
        const TYPE_NAME: &'static str = "test.Point";

        fn describe() -> Vec<FieldDecl> {
            vec![
                FieldDecl::required::<i32>("x"),
                FieldDecl::optional::<Option<String>>("label"),
            ]
        }

        fn field(&self, name: &str) -> Option<SourceValue> {
            match name {
                "x" => self.x.to_source(),
                "label" => self.label.to_source(),
                _ => None,
            }
        }

        fn set_field(&mut self, name: &str, value: Option<SourceValue>) -> Result<()> {
            match name {
                "x" => self.x = SourceField::from_source(value)?,
                "label" => self.label = SourceField::from_source(value)?,
                other => return Err(Error::transformation(format!("unknown field '{}'", other))),
            }
            Ok(())
        }
    }

    #[test]
    fn test_type_ref_identity() {
        let a = TypeRef::of::<Point>();
        let b = TypeRef::of::<Point>();
        assert_eq!(a, b);
        assert_eq!(a.name(), "test.Point");
        assert_eq!(a.fields().len(), 2);
        assert!(a.fields()[0].required);
    }

    #[test]
    fn test_construct_and_downcast() {
        let mut record = TypeRef::of::<Point>().construct();
        record
            .write_field("x", Some(SourceValue::I64(7)))
            .unwrap();
        record
            .write_field("label", Some(SourceValue::Str("p".into())))
            .unwrap();

        let point: Point = downcast_record(record).unwrap();
        assert_eq!(point, Point { x: 7, label: Some("p".into()) });
    }

    #[test]
    fn test_null_into_native_field_is_zero() {
        let mut point = Point { x: 3, label: Some("a".into()) };
        point.set_field("x", None).unwrap();
        point.set_field("label", None).unwrap();
        assert_eq!(point, Point::default());
    }

    #[test]
    fn test_collection_fields() {
        let tags = vec!["a".to_string(), "b".to_string()];
        let value = tags.to_source().unwrap();
        assert!(matches!(value, SourceValue::List(ref items) if items.len() == 2));
        let back: BTreeSet<String> = SourceField::from_source(Some(value)).unwrap();
        assert_eq!(back.len(), 2);

        let mut map = BTreeMap::new();
        map.insert(1i32, 2.5f64);
        let back: HashMap<i32, f64> =
            SourceField::from_source(map.to_source()).unwrap();
        assert_eq!(back.get(&1), Some(&2.5));
    }

    #[test]
    fn test_mismatched_value_is_conversion_error() {
        let err = i32::from_source(Some(SourceValue::Str("1".into()))).unwrap_err();
        assert!(matches!(err, Error::Conversion { .. }));
        assert!(record_from_value::<Point>(Some(SourceValue::Bool(true))).is_err());
    }
}
