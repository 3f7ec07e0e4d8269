use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use crate::error::{PromiseError, ResolveError};
use crate::promise::Promise;
use crate::shape::{ScalarShape, Shape};

/// Dynamic representation of one argument or result flowing through the
/// resolver.
///
/// Composite variants may carry further promises at any depth; the resolver
/// replaces them guided by the expected [`Shape`](crate::Shape).
#[derive(Debug, Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// Nullable owning pointer.
    Ptr(Option<Box<Value>>),
    Seq(Vec<Value>),
    Map(HashMap<Key, Value>),
    /// Opted-in scalar payload of some concrete Rust type.
    Other(Opaque),
    /// An unresolved (or not-yet-read) promise of any payload type.
    Promise(PromiseArg),
}

impl Value {
    /// Short description of the runtime kind, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "bool",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Ptr(_) => "pointer",
            Value::Seq(_) => "sequence",
            Value::Map(_) => "mapping",
            Value::Other(payload) => payload.name,
            Value::Promise(_) => "promise",
        }
    }

    /// Wraps an arbitrary payload as an opaque scalar. Usually reached
    /// through [`opaque_value!`](crate::opaque_value) rather than directly.
    pub fn other<T: Any + Send + Sync>(payload: T) -> Value {
        Value::Other(Opaque {
            name: std::any::type_name::<T>(),
            payload: Arc::new(payload),
        })
    }
}

/// Concrete mapping key. Promises cannot appear in key position.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl Key {
    pub(crate) fn into_value(self) -> Value {
        match self {
            Key::Bool(b) => Value::Bool(b),
            Key::Int(i) => Value::Int(i),
            Key::Str(s) => Value::Str(s),
        }
    }

    pub(crate) fn from_value(value: Value) -> Result<Key, ResolveError> {
        match value {
            Value::Bool(b) => Ok(Key::Bool(b)),
            Value::Int(i) => Ok(Key::Int(i)),
            Value::Str(s) => Ok(Key::Str(s)),
            other => Err(ResolveError::Mismatch {
                expected: "mapping key".to_owned(),
                found: other.kind(),
            }),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Bool(b) => write!(f, "{b}"),
            Key::Int(i) => write!(f, "{i}"),
            Key::Str(s) => write!(f, "{s:?}"),
        }
    }
}

/// Type-erased scalar payload carried through resolution untouched.
#[derive(Clone)]
pub struct Opaque {
    pub(crate) name: &'static str,
    payload: Arc<dyn Any + Send + Sync>,
}

impl Opaque {
    pub(crate) fn type_id(&self) -> TypeId {
        self.payload.as_ref().type_id()
    }

    /// Recovers the concrete payload, failing with a mismatch naming both
    /// types if the payload is something else.
    pub fn downcast<T: Any + Clone + Send + Sync>(&self) -> Result<T, ResolveError> {
        self.payload
            .downcast_ref::<T>()
            .cloned()
            .ok_or_else(|| ResolveError::Mismatch {
                expected: std::any::type_name::<T>().to_owned(),
                found: self.name,
            })
    }
}

impl fmt::Debug for Opaque {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Opaque({})", self.name)
    }
}

/// Capability marker: tags a value as "a promise, whatever its payload".
///
/// Only [`Promise<T>`] can produce one. The erasing trait is crate-private
/// and the field is inaccessible, so external code cannot forge a value that
/// the resolver would mistake for a promise.
#[derive(Clone)]
pub struct PromiseArg(Arc<dyn ErasedPromise>);

impl PromiseArg {
    pub(crate) fn wait_value(&self) -> Result<Value, PromiseError> {
        self.0.wait_value()
    }
}

impl fmt::Debug for PromiseArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Promise(..)")
    }
}

pub(crate) trait ErasedPromise: Send + Sync {
    /// Blocks until the promise is ready, then hands back the payload in
    /// dynamic form.
    fn wait_value(&self) -> Result<Value, PromiseError>;
}

impl<T> ErasedPromise for Promise<T>
where
    T: IntoValue + Clone + Send + Sync + 'static,
{
    fn wait_value(&self) -> Result<Value, PromiseError> {
        self.wait().map(IntoValue::into_value)
    }
}

/// Conversion into the dynamic argument representation.
pub trait IntoValue {
    fn into_value(self) -> Value;
}

/// Conversion out of the dynamic representation. [`shape`](FromValue::shape)
/// names what the resolver should produce first; `from_value` then extracts
/// the typed result.
pub trait FromValue: Sized {
    fn shape() -> Shape;
    fn from_value(value: Value) -> Result<Self, ResolveError>;
}

impl IntoValue for Value {
    fn into_value(self) -> Value {
        self
    }
}

impl FromValue for Value {
    fn shape() -> Shape {
        Shape::Dynamic
    }

    fn from_value(value: Value) -> Result<Self, ResolveError> {
        Ok(value)
    }
}

impl IntoValue for bool {
    fn into_value(self) -> Value {
        Value::Bool(self)
    }
}

impl FromValue for bool {
    fn shape() -> Shape {
        Shape::Scalar(ScalarShape::Bool)
    }

    fn from_value(value: Value) -> Result<Self, ResolveError> {
        match value {
            Value::Bool(b) => Ok(b),
            Value::Nil => Ok(false),
            other => Err(ResolveError::type_mismatch(&Self::shape(), &other)),
        }
    }
}

impl IntoValue for i64 {
    fn into_value(self) -> Value {
        Value::Int(self)
    }
}

impl FromValue for i64 {
    fn shape() -> Shape {
        Shape::Scalar(ScalarShape::Int)
    }

    fn from_value(value: Value) -> Result<Self, ResolveError> {
        match value {
            Value::Int(i) => Ok(i),
            Value::Nil => Ok(0),
            other => Err(ResolveError::type_mismatch(&Self::shape(), &other)),
        }
    }
}

impl IntoValue for i32 {
    fn into_value(self) -> Value {
        Value::Int(i64::from(self))
    }
}

impl FromValue for i32 {
    fn shape() -> Shape {
        Shape::Scalar(ScalarShape::Int)
    }

    fn from_value(value: Value) -> Result<Self, ResolveError> {
        match value {
            Value::Int(i) => i32::try_from(i).map_err(|_| ResolveError::OutOfRange {
                value: i,
                target: "i32",
            }),
            Value::Nil => Ok(0),
            other => Err(ResolveError::type_mismatch(&Self::shape(), &other)),
        }
    }
}

impl IntoValue for u32 {
    fn into_value(self) -> Value {
        Value::Int(i64::from(self))
    }
}

impl FromValue for u32 {
    fn shape() -> Shape {
        Shape::Scalar(ScalarShape::Int)
    }

    fn from_value(value: Value) -> Result<Self, ResolveError> {
        match value {
            Value::Int(i) => u32::try_from(i).map_err(|_| ResolveError::OutOfRange {
                value: i,
                target: "u32",
            }),
            Value::Nil => Ok(0),
            other => Err(ResolveError::type_mismatch(&Self::shape(), &other)),
        }
    }
}

impl IntoValue for f64 {
    fn into_value(self) -> Value {
        Value::Float(self)
    }
}

impl FromValue for f64 {
    fn shape() -> Shape {
        Shape::Scalar(ScalarShape::Float)
    }

    fn from_value(value: Value) -> Result<Self, ResolveError> {
        match value {
            Value::Float(f) => Ok(f),
            Value::Int(i) => Ok(i as f64),
            Value::Nil => Ok(0.0),
            other => Err(ResolveError::type_mismatch(&Self::shape(), &other)),
        }
    }
}

impl IntoValue for f32 {
    fn into_value(self) -> Value {
        Value::Float(f64::from(self))
    }
}

impl FromValue for f32 {
    fn shape() -> Shape {
        Shape::Scalar(ScalarShape::Float)
    }

    fn from_value(value: Value) -> Result<Self, ResolveError> {
        match value {
            Value::Float(f) => Ok(f as f32),
            Value::Int(i) => Ok(i as f32),
            Value::Nil => Ok(0.0),
            other => Err(ResolveError::type_mismatch(&Self::shape(), &other)),
        }
    }
}

impl IntoValue for String {
    fn into_value(self) -> Value {
        Value::Str(self)
    }
}

impl IntoValue for &str {
    fn into_value(self) -> Value {
        Value::Str(self.to_owned())
    }
}

impl FromValue for String {
    fn shape() -> Shape {
        Shape::Scalar(ScalarShape::Str)
    }

    fn from_value(value: Value) -> Result<Self, ResolveError> {
        match value {
            Value::Str(s) => Ok(s),
            Value::Nil => Ok(String::new()),
            other => Err(ResolveError::type_mismatch(&Self::shape(), &other)),
        }
    }
}

impl<T: IntoValue> IntoValue for Option<Box<T>> {
    fn into_value(self) -> Value {
        Value::Ptr(self.map(|pointee| Box::new((*pointee).into_value())))
    }
}

impl<T: FromValue> FromValue for Option<Box<T>> {
    fn shape() -> Shape {
        Shape::Ptr(Box::new(T::shape()))
    }

    fn from_value(value: Value) -> Result<Self, ResolveError> {
        match value {
            Value::Ptr(None) | Value::Nil => Ok(None),
            Value::Ptr(Some(pointee)) => T::from_value(*pointee)
                .map(|inner| Some(Box::new(inner)))
                .map_err(|source| ResolveError::Pointee {
                    source: Box::new(source),
                }),
            other => Err(ResolveError::type_mismatch(&Self::shape(), &other)),
        }
    }
}

impl<T: IntoValue> IntoValue for Vec<T> {
    fn into_value(self) -> Value {
        Value::Seq(self.into_iter().map(IntoValue::into_value).collect())
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn shape() -> Shape {
        Shape::Seq(Box::new(T::shape()))
    }

    fn from_value(value: Value) -> Result<Self, ResolveError> {
        match value {
            Value::Seq(items) => items
                .into_iter()
                .enumerate()
                .map(|(index, item)| T::from_value(item).map_err(|e| e.at_index(index)))
                .collect(),
            Value::Nil => Ok(Vec::new()),
            other => Err(ResolveError::type_mismatch(&Self::shape(), &other)),
        }
    }
}

impl<T: IntoValue, const N: usize> IntoValue for [T; N] {
    fn into_value(self) -> Value {
        Value::Seq(self.into_iter().map(IntoValue::into_value).collect())
    }
}

impl<T: FromValue, const N: usize> FromValue for [T; N] {
    fn shape() -> Shape {
        Shape::FixedSeq(Box::new(T::shape()), N)
    }

    fn from_value(value: Value) -> Result<Self, ResolveError> {
        let items = match value {
            Value::Seq(items) => items,
            Value::Nil => vec![Value::Nil; N],
            other => return Err(ResolveError::type_mismatch(&Self::shape(), &other)),
        };
        if items.len() != N {
            return Err(ResolveError::Length {
                expected: N,
                found: items.len(),
            });
        }
        let converted = items
            .into_iter()
            .enumerate()
            .map(|(index, item)| T::from_value(item).map_err(|e| e.at_index(index)))
            .collect::<Result<Vec<_>, _>>()?;
        match converted.try_into() {
            Ok(array) => Ok(array),
            Err(items) => Err(ResolveError::Length {
                expected: N,
                found: items.len(),
            }),
        }
    }
}

impl<K: ValueKey, V: IntoValue> IntoValue for HashMap<K, V> {
    fn into_value(self) -> Value {
        Value::Map(
            self.into_iter()
                .map(|(key, value)| (key.into_key(), value.into_value()))
                .collect(),
        )
    }
}

impl<K: ValueKey, V: FromValue> FromValue for HashMap<K, V> {
    fn shape() -> Shape {
        Shape::Map(Box::new(K::key_shape()), Box::new(V::shape()))
    }

    fn from_value(value: Value) -> Result<Self, ResolveError> {
        match value {
            Value::Map(entries) => entries
                .into_iter()
                .map(|(key, value)| {
                    let value = V::from_value(value).map_err(|e| e.at_key(key.clone()))?;
                    Ok((K::from_key(key)?, value))
                })
                .collect(),
            Value::Nil => Ok(HashMap::new()),
            other => Err(ResolveError::type_mismatch(&Self::shape(), &other)),
        }
    }
}

impl<T> IntoValue for Promise<T>
where
    T: IntoValue + Clone + Send + Sync + 'static,
{
    fn into_value(self) -> Value {
        Value::Promise(PromiseArg(Arc::new(self)))
    }
}

/// Mapping key types usable on the typed side of the bridge.
pub trait ValueKey: Sized + Eq + Hash {
    fn key_shape() -> Shape;
    fn into_key(self) -> Key;
    fn from_key(key: Key) -> Result<Self, ResolveError>;
}

impl ValueKey for String {
    fn key_shape() -> Shape {
        Shape::Scalar(ScalarShape::Str)
    }

    fn into_key(self) -> Key {
        Key::Str(self)
    }

    fn from_key(key: Key) -> Result<Self, ResolveError> {
        match key {
            Key::Str(s) => Ok(s),
            other => Err(ResolveError::Mismatch {
                expected: "string".to_owned(),
                found: other.into_value().kind(),
            }),
        }
    }
}

impl ValueKey for i64 {
    fn key_shape() -> Shape {
        Shape::Scalar(ScalarShape::Int)
    }

    fn into_key(self) -> Key {
        Key::Int(self)
    }

    fn from_key(key: Key) -> Result<Self, ResolveError> {
        match key {
            Key::Int(i) => Ok(i),
            other => Err(ResolveError::Mismatch {
                expected: "integer".to_owned(),
                found: other.into_value().kind(),
            }),
        }
    }
}

impl ValueKey for i32 {
    fn key_shape() -> Shape {
        Shape::Scalar(ScalarShape::Int)
    }

    fn into_key(self) -> Key {
        Key::Int(i64::from(self))
    }

    fn from_key(key: Key) -> Result<Self, ResolveError> {
        match key {
            Key::Int(i) => i32::try_from(i).map_err(|_| ResolveError::OutOfRange {
                value: i,
                target: "i32",
            }),
            other => Err(ResolveError::Mismatch {
                expected: "integer".to_owned(),
                found: other.into_value().kind(),
            }),
        }
    }
}

impl ValueKey for bool {
    fn key_shape() -> Shape {
        Shape::Scalar(ScalarShape::Bool)
    }

    fn into_key(self) -> Key {
        Key::Bool(self)
    }

    fn from_key(key: Key) -> Result<Self, ResolveError> {
        match key {
            Key::Bool(b) => Ok(b),
            other => Err(ResolveError::Mismatch {
                expected: "bool".to_owned(),
                found: other.into_value().kind(),
            }),
        }
    }
}

/// Builds the dynamic argument list for [`run_async`](crate::run_async) and
/// [`run_sync`](crate::run_sync) from heterogeneous expressions.
///
/// ```
/// use parvar::{args, Promise, Value};
///
/// let p = Promise::ready(7i64);
/// let list: Vec<Value> = args![1, "two", p];
/// assert_eq!(list.len(), 3);
/// ```
#[macro_export]
macro_rules! args {
    () => {
        ::std::vec::Vec::<$crate::Value>::new()
    };
    ($($arg:expr),+ $(,)?) => {
        ::std::vec![$($crate::IntoValue::into_value($arg)),+]
    };
}

/// Opts user types in as opaque scalar values. The type is carried through
/// resolution untouched and matched by `TypeId`; a nil input stands for its
/// `Default` value.
#[macro_export]
macro_rules! opaque_value {
    ($($ty:ty),+ $(,)?) => {$(
        impl $crate::IntoValue for $ty {
            fn into_value(self) -> $crate::Value {
                $crate::Value::other(self)
            }
        }

        impl $crate::FromValue for $ty {
            fn shape() -> $crate::Shape {
                $crate::Shape::opaque::<$ty>()
            }

            fn from_value(value: $crate::Value) -> ::std::result::Result<Self, $crate::ResolveError> {
                match value {
                    $crate::Value::Other(payload) => payload.downcast::<$ty>(),
                    $crate::Value::Nil => ::std::result::Result::Ok(<$ty as ::std::default::Default>::default()),
                    other => ::std::result::Result::Err($crate::ResolveError::type_mismatch(
                        &<$ty as $crate::FromValue>::shape(),
                        &other,
                    )),
                }
            }
        }
    )+};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_macro_builds_heterogeneous_list() {
        let list = args![1, 2.5, "three", true];
        assert!(matches!(list[0], Value::Int(1)));
        assert!(matches!(list[1], Value::Float(_)));
        assert!(matches!(list[2], Value::Str(_)));
        assert!(matches!(list[3], Value::Bool(true)));
    }

    #[test]
    fn promise_argument_carries_the_capability_marker() {
        let list = args![Promise::ready(3i64)];
        assert_eq!(list[0].kind(), "promise");
    }

    #[test]
    fn opaque_downcast_mismatch_names_both_types() {
        let value = Value::other(42i64);
        let Value::Other(payload) = value else {
            panic!("expected an opaque value");
        };
        let err = payload.downcast::<String>().unwrap_err();
        assert!(matches!(err, ResolveError::Mismatch { .. }));
    }

    #[test]
    fn narrowing_extraction_is_range_checked() {
        let err = i32::from_value(Value::Int(i64::MAX)).unwrap_err();
        assert_eq!(
            err,
            ResolveError::OutOfRange {
                value: i64::MAX,
                target: "i32"
            }
        );
    }

    #[test]
    fn fixed_array_extraction_checks_length() {
        let err = <[i64; 2]>::from_value(Value::Seq(vec![Value::Int(1)])).unwrap_err();
        assert_eq!(
            err,
            ResolveError::Length {
                expected: 2,
                found: 1
            }
        );
    }
}
