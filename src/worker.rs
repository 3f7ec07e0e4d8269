use crate::error::CallError;
use crate::shape::Shape;
use crate::value::{FromValue, IntoValue, Value};

/// Parameter shapes of a worker, built once when the worker is adapted.
#[derive(Debug, Clone)]
pub struct Signature {
    params: Vec<Shape>,
}

impl Signature {
    pub fn params(&self) -> &[Shape] {
        &self.params
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

/// A worker function adapted to the dynamic calling convention: resolved
/// argument values in, one result value out.
pub struct Worker {
    signature: Signature,
    call: Box<dyn Fn(Vec<Value>) -> Result<Value, CallError> + Send + Sync>,
}

impl Worker {
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub(crate) fn call(&self, args: Vec<Value>) -> Result<Value, CallError> {
        (self.call)(args)
    }
}

/// Adapts a plain function into a [`Worker`].
///
/// Implemented for `Fn` items of arity 0 through 8 whose parameters convert
/// from [`Value`] and whose single result converts back. Methods with
/// receivers and variadics have no such impl and are rejected by the
/// compiler rather than at run time.
pub trait IntoWorker<Args> {
    fn into_worker(self) -> Worker;
}

fn extract<T: FromValue>(value: Option<Value>, index: &mut usize) -> Result<T, CallError> {
    let current = *index;
    *index += 1;
    T::from_value(value.unwrap_or(Value::Nil))
        .map_err(|source| CallError::Argument {
            index: current,
            source,
        })
}

macro_rules! impl_into_worker {
    ($($param:ident),*) => {
        impl<Func, Out, $($param),*> IntoWorker<($($param,)*)> for Func
        where
            Func: Fn($($param),*) -> Out + Send + Sync + 'static,
            Out: IntoValue + 'static,
            $($param: FromValue + 'static,)*
        {
            #[allow(non_snake_case)]
            fn into_worker(self) -> Worker {
                Worker {
                    signature: Signature {
                        params: vec![$(<$param>::shape()),*],
                    },
                    call: Box::new(move |args: Vec<Value>| {
                        #[allow(unused_mut, unused_variables)]
                        let mut args = args.into_iter();
                        #[allow(unused_mut, unused_variables)]
                        let mut index = 0usize;
                        $(let $param = extract::<$param>(args.next(), &mut index)?;)*
                        Ok((self)($($param),*).into_value())
                    }),
                }
            }
        }
    };
}

impl_into_worker!();
impl_into_worker!(A0);
impl_into_worker!(A0, A1);
impl_into_worker!(A0, A1, A2);
impl_into_worker!(A0, A1, A2, A3);
impl_into_worker!(A0, A1, A2, A3, A4);
impl_into_worker!(A0, A1, A2, A3, A4, A5);
impl_into_worker!(A0, A1, A2, A3, A4, A5, A6);
impl_into_worker!(A0, A1, A2, A3, A4, A5, A6, A7);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ResolveError;
    use crate::shape::ScalarShape;

    fn add(a: i64, b: i64) -> i64 {
        a + b
    }

    #[test]
    fn signature_reflects_the_declared_parameters() {
        let worker = add.into_worker();
        assert_eq!(worker.signature().arity(), 2);
        assert_eq!(
            worker.signature().params(),
            &[
                Shape::Scalar(ScalarShape::Int),
                Shape::Scalar(ScalarShape::Int)
            ]
        );
    }

    #[test]
    fn call_converts_arguments_and_result() {
        let worker = add.into_worker();
        let out = worker.call(vec![Value::Int(2), Value::Int(3)]).unwrap();
        assert!(matches!(out, Value::Int(5)));
    }

    #[test]
    fn extraction_failures_carry_the_argument_index() {
        let worker = add.into_worker();
        let err = worker
            .call(vec![Value::Int(2), Value::Str("three".to_owned())])
            .unwrap_err();
        assert!(matches!(
            err,
            CallError::Argument {
                index: 1,
                source: ResolveError::Mismatch { .. }
            }
        ));
    }

    #[test]
    fn zero_arity_workers_are_supported() {
        let worker = (|| 99i64).into_worker();
        assert_eq!(worker.signature().arity(), 0);
        assert!(matches!(worker.call(Vec::new()).unwrap(), Value::Int(99)));
    }
}
