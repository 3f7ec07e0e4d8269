use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;

use crate::value::Value;

/// Runtime description of the type a resolved value must conform to.
///
/// The resolver walks an input value against one of these, so descent depth
/// and container rebuilding are driven by what the receiving slot declares,
/// never by what the input happens to look like.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// No constraint: the value passes through once its top-level promise is
    /// unwrapped.
    Dynamic,
    Scalar(ScalarShape),
    /// Nullable owning pointer.
    Ptr(Box<Shape>),
    /// Ordered sequence with a uniform element shape.
    Seq(Box<Shape>),
    /// Sequence whose length is part of the type.
    FixedSeq(Box<Shape>, usize),
    /// Keyed mapping.
    Map(Box<Shape>, Box<Shape>),
}

/// Leaf shapes. Opaque scalars are matched by `TypeId` and otherwise carried
/// through resolution untouched.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarShape {
    Bool,
    Int,
    Float,
    Str,
    Opaque { id: TypeId, name: &'static str },
}

impl Shape {
    /// The shape of an opted-in opaque type.
    pub fn opaque<T: 'static>() -> Shape {
        Shape::Scalar(ScalarShape::Opaque {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        })
    }

    /// The value a nil input stands for under this shape.
    pub(crate) fn zero_value(&self) -> Value {
        match self {
            Shape::Dynamic => Value::Nil,
            Shape::Scalar(ScalarShape::Bool) => Value::Bool(false),
            Shape::Scalar(ScalarShape::Int) => Value::Int(0),
            Shape::Scalar(ScalarShape::Float) => Value::Float(0.0),
            Shape::Scalar(ScalarShape::Str) => Value::Str(String::new()),
            // Opaque zero values are produced on the typed side, where a
            // `Default` impl is in reach.
            Shape::Scalar(ScalarShape::Opaque { .. }) => Value::Nil,
            Shape::Ptr(_) => Value::Ptr(None),
            Shape::Seq(_) => Value::Seq(Vec::new()),
            Shape::FixedSeq(elem, len) => Value::Seq(vec![elem.zero_value(); *len]),
            Shape::Map(_, _) => Value::Map(HashMap::new()),
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Dynamic => f.write_str("dynamic"),
            Shape::Scalar(scalar) => scalar.fmt(f),
            Shape::Ptr(pointee) => write!(f, "pointer to {pointee}"),
            Shape::Seq(elem) => write!(f, "sequence of {elem}"),
            Shape::FixedSeq(elem, len) => write!(f, "sequence of {len} x {elem}"),
            Shape::Map(key, value) => write!(f, "mapping from {key} to {value}"),
        }
    }
}

impl fmt::Display for ScalarShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarShape::Bool => f.write_str("bool"),
            ScalarShape::Int => f.write_str("integer"),
            ScalarShape::Float => f.write_str("float"),
            ScalarShape::Str => f.write_str("string"),
            ScalarShape::Opaque { name, .. } => f.write_str(name),
        }
    }
}
