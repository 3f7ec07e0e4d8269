use std::panic::{self, AssertUnwindSafe};
use std::thread;

use tracing::{error, trace};

use crate::error::CallError;
use crate::promise::Promise;
use crate::resolve::{resolve_shallow, resolve_value, Mode};
use crate::value::{FromValue, Value};
use crate::worker::{IntoWorker, Worker};

/// Invokes `f` on a freshly spawned thread and immediately returns a promise
/// for its result.
///
/// Each argument is resolved recursively against the worker's corresponding
/// parameter shape before the invocation, blocking on any promise it bears.
/// The argument count is validated synchronously; everything past that point
/// happens on the spawned unit. If the unit fails (a worker panic or a
/// resolution error), the failure is reported to the diagnostic stream and
/// the promise is broken, releasing any blocked reader.
pub fn run_async<R, Args, F>(f: F, args: Vec<Value>) -> Result<Promise<R>, CallError>
where
    F: IntoWorker<Args>,
    R: FromValue + Send + 'static,
{
    run_async_with(Mode::Recursive, f, args)
}

/// [`run_async`] with an explicit resolution mode.
pub fn run_async_with<R, Args, F>(mode: Mode, f: F, args: Vec<Value>) -> Result<Promise<R>, CallError>
where
    F: IntoWorker<Args>,
    R: FromValue + Send + 'static,
{
    let worker = f.into_worker();
    check_arity(&worker, &args)?;
    let promise = Promise::pending();
    let result = promise.clone();
    thread::spawn(move || {
        trace!(arity = worker.signature().arity(), "worker unit started");
        match panic::catch_unwind(AssertUnwindSafe(|| execute::<R>(&worker, args, mode))) {
            Ok(Ok(value)) => result.resolve(value),
            Ok(Err(err)) => {
                error!(%err, "worker unit failed");
                result.break_with(err);
            }
            Err(payload) => {
                let err = CallError::Panicked(panic_message(&payload));
                error!(%err, "worker unit panicked");
                result.break_with(err);
            }
        }
    });
    Ok(promise)
}

/// Invokes `f` inline on the caller's thread, blocking until every
/// dependency promise is ready and `f` has returned. Worker panics propagate
/// synchronously to the caller.
pub fn run_sync<R, Args, F>(f: F, args: Vec<Value>) -> Result<R, CallError>
where
    F: IntoWorker<Args>,
    R: FromValue,
{
    run_sync_with(Mode::Recursive, f, args)
}

/// [`run_sync`] with an explicit resolution mode.
pub fn run_sync_with<R, Args, F>(mode: Mode, f: F, args: Vec<Value>) -> Result<R, CallError>
where
    F: IntoWorker<Args>,
    R: FromValue,
{
    let worker = f.into_worker();
    check_arity(&worker, &args)?;
    execute(&worker, args, mode)
}

fn check_arity(worker: &Worker, args: &[Value]) -> Result<(), CallError> {
    let expected = worker.signature().arity();
    if args.len() != expected {
        return Err(CallError::ArgCount {
            expected,
            got: args.len(),
        });
    }
    Ok(())
}

fn execute<R: FromValue>(worker: &Worker, args: Vec<Value>, mode: Mode) -> Result<R, CallError> {
    let shapes = worker.signature().params();
    let mut resolved = Vec::with_capacity(args.len());
    for (index, arg) in args.into_iter().enumerate() {
        let arg = match mode {
            Mode::Recursive => resolve_value(arg, &shapes[index]),
            Mode::Shallow => resolve_shallow(arg),
        }
        .map_err(|source| CallError::Argument { index, source })?;
        resolved.push(arg);
    }
    let output = worker.call(resolved)?;
    // The worker's concrete result must still satisfy the requested type.
    let output = resolve_value(output, &R::shape()).map_err(CallError::ReturnType)?;
    R::from_value(output).map_err(CallError::ReturnType)
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic payload of unknown type".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args;

    fn square(n: i64) -> i64 {
        n * n
    }

    fn add(a: i64, b: i64) -> i64 {
        a + b
    }

    #[test]
    fn argument_count_is_validated_before_spawning() {
        let result: Result<Promise<i64>, _> = run_async(add, args![1]);
        assert_eq!(
            result.unwrap_err(),
            CallError::ArgCount {
                expected: 2,
                got: 1
            }
        );
    }

    #[test]
    fn sync_invocation_runs_inline() {
        let out: i64 = run_sync(square, args![5]).unwrap();
        assert_eq!(out, 25);
    }

    #[test]
    fn return_type_mismatch_is_detected_after_invocation() {
        let result: Result<i64, _> = run_sync(|| "text", args![]);
        assert!(matches!(result.unwrap_err(), CallError::ReturnType(_)));
    }

    #[test]
    #[should_panic(expected = "sync workers fail loudly")]
    fn sync_worker_panics_propagate_to_the_caller() {
        let _: Result<i64, _> = run_sync(
            || -> i64 { panic!("sync workers fail loudly") },
            args![],
        );
    }

    #[test]
    fn shallow_mode_skips_the_recursive_walk() {
        let upstream = Promise::ready(6i64);
        let out: i64 = run_sync_with(Mode::Shallow, square, args![upstream]).unwrap();
        assert_eq!(out, 36);
    }

    #[test]
    fn shallow_mode_leaves_nested_promises_alone() {
        let nested = vec![Promise::ready(1i64)];
        let kinds = |items: Vec<Value>| -> String { items[0].kind().to_owned() };
        let out: String = run_sync_with(Mode::Shallow, kinds, args![nested]).unwrap();
        assert_eq!(out, "promise");
    }
}
