use std::collections::HashMap;

use crate::error::ResolveError;
use crate::shape::{ScalarShape, Shape};
use crate::value::{Key, Value};

/// Argument resolution depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Full depth-first descent: every promise reachable through pointers,
    /// sequences and mappings is replaced by its payload.
    #[default]
    Recursive,
    /// Only a top-level promise is unwrapped; everything else passes through
    /// untouched. For callers that know no nested promises are present.
    Shallow,
}

/// Produces a value of the expected shape with every reachable promise
/// replaced by its resolved payload, blocking on promises that are not yet
/// ready.
///
/// Descent is driven by the expected shape, not the input's runtime shape:
/// the declared parameter type is the only reliable anchor for how deep to
/// descend and how to rebuild containers, since plain values and promises
/// are indistinguishable inside an open container otherwise.
pub fn resolve_value(input: Value, expected: &Shape) -> Result<Value, ResolveError> {
    match input {
        Value::Nil => Ok(expected.zero_value()),
        // A promise may itself hold another promise, or a container bearing
        // promises; resolution is transitive.
        Value::Promise(promise) => resolve_value(promise.wait_value()?, expected),
        input => resolve_concrete(input, expected),
    }
}

/// Single top-level unwrap: the stripped-down alternative for arguments
/// known to carry no nested promises.
pub fn resolve_shallow(input: Value) -> Result<Value, ResolveError> {
    match input {
        Value::Promise(promise) => Ok(promise.wait_value()?),
        other => Ok(other),
    }
}

fn resolve_concrete(input: Value, expected: &Shape) -> Result<Value, ResolveError> {
    match expected {
        Shape::Dynamic => Ok(input),
        Shape::Ptr(pointee) => match input {
            Value::Ptr(None) => Ok(Value::Ptr(None)),
            Value::Ptr(Some(inner)) => {
                let resolved =
                    resolve_value(*inner, pointee).map_err(|source| ResolveError::Pointee {
                        source: Box::new(source),
                    })?;
                Ok(Value::Ptr(Some(Box::new(resolved))))
            }
            other => Err(ResolveError::type_mismatch(expected, &other)),
        },
        Shape::Seq(elem) => match input {
            Value::Seq(items) => resolve_elements(items, elem).map(Value::Seq),
            other => Err(ResolveError::type_mismatch(expected, &other)),
        },
        Shape::FixedSeq(elem, len) => match input {
            Value::Seq(items) => {
                if items.len() != *len {
                    return Err(ResolveError::Length {
                        expected: *len,
                        found: items.len(),
                    });
                }
                resolve_elements(items, elem).map(Value::Seq)
            }
            other => Err(ResolveError::type_mismatch(expected, &other)),
        },
        Shape::Map(key_shape, value_shape) => match input {
            Value::Map(entries) => {
                let mut resolved = HashMap::with_capacity(entries.len());
                for (key, value) in entries {
                    let value =
                        resolve_value(value, value_shape).map_err(|e| e.at_key(key.clone()))?;
                    resolved.insert(resolve_key(key, key_shape)?, value);
                }
                Ok(Value::Map(resolved))
            }
            other => Err(ResolveError::type_mismatch(expected, &other)),
        },
        Shape::Scalar(scalar) => resolve_scalar(input, scalar, expected),
    }
}

fn resolve_elements(items: Vec<Value>, elem: &Shape) -> Result<Vec<Value>, ResolveError> {
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| resolve_value(item, elem).map_err(|e| e.at_index(index)))
        .collect()
}

/// Keys are already concrete scalars, so resolving one is a kind check plus
/// the same widening rules scalars get elsewhere.
fn resolve_key(key: Key, expected: &Shape) -> Result<Key, ResolveError> {
    let resolved =
        resolve_value(key.clone().into_value(), expected).map_err(|e| e.at_key(key))?;
    Key::from_value(resolved)
}

fn resolve_scalar(
    input: Value,
    scalar: &ScalarShape,
    expected: &Shape,
) -> Result<Value, ResolveError> {
    match (input, scalar) {
        (Value::Bool(b), ScalarShape::Bool) => Ok(Value::Bool(b)),
        (Value::Int(i), ScalarShape::Int) => Ok(Value::Int(i)),
        (Value::Float(f), ScalarShape::Float) => Ok(Value::Float(f)),
        // Numeric widening, as an assignment would allow. The reverse is a
        // mismatch.
        (Value::Int(i), ScalarShape::Float) => Ok(Value::Float(i as f64)),
        (Value::Str(s), ScalarShape::Str) => Ok(Value::Str(s)),
        (Value::Other(payload), ScalarShape::Opaque { id, .. }) if payload.type_id() == *id => {
            Ok(Value::Other(payload))
        }
        (other, _) => Err(ResolveError::type_mismatch(expected, &other)),
    }
}
