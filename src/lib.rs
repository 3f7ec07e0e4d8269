//! Parallel variables: single-assignment promises with transparent
//! resolution of promise-bearing arguments.
//!
//! A [`Promise`] is a write-once slot with a blocking read: resolve it from
//! one thread, read it from as many as you like. [`run_async`] spawns a
//! plain function on its own thread and hands back a promise for the result;
//! [`run_sync`] runs it inline. Either way, arguments that are promises (or
//! containers bearing promises at any depth) are resolved against the
//! function's declared parameter types before the call, so ordinary code
//! composes into parallel pipelines without knowing promises exist.
//!
//! ```
//! use parvar::{args, run_async, run_sync, Promise};
//!
//! fn square(n: i64) -> i64 {
//!     n * n
//! }
//!
//! fn add(a: i64, b: i64) -> i64 {
//!     a + b
//! }
//!
//! # fn main() -> Result<(), parvar::CallError> {
//! let a: Promise<i64> = run_async(square, args![3])?;
//! let b: Promise<i64> = run_async(square, args![4])?;
//! let sum: i64 = run_sync(add, args![a, b])?;
//! assert_eq!(sum, 25);
//! # Ok(())
//! # }
//! ```
//!
//! Values cross into the dynamic layer through [`IntoValue`] and back out
//! through [`FromValue`]; user structs opt in with [`opaque_value!`]. The
//! resolver walks inputs against [`Shape`] descriptors derived from the
//! worker's signature, which is what lets a `Vec<Promise<i64>>` argument
//! satisfy a `Vec<i64>` parameter.

mod error;
mod make;
mod promise;
mod resolve;
mod run;
mod shape;
mod value;
mod worker;

pub use crate::error::{CallError, PromiseError, ResolveError};
pub use crate::make::{
    bounded_promise_channel, pending_vec, pending_vec_with_capacity, promise_channel, promise_map,
    ready_vec, ready_vec_with_capacity,
};
pub use crate::promise::Promise;
pub use crate::resolve::{resolve_shallow, resolve_value, Mode};
pub use crate::run::{run_async, run_async_with, run_sync, run_sync_with};
pub use crate::shape::{ScalarShape, Shape};
pub use crate::value::{FromValue, IntoValue, Key, Opaque, PromiseArg, Value, ValueKey};
pub use crate::worker::{IntoWorker, Signature, Worker};
