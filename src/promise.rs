use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Condvar, Mutex};
use std::task::{Context, Poll, Waker};

use crate::error::{CallError, PromiseError};

/// A parallel variable: a single-assignment slot holding a future value of
/// type `T`.
///
/// Cloning shares the slot: any number of readers may block on the same
/// promise while exactly one producer resolves it. The slot is observably
/// unset until resolution; after that the value never changes.
///
/// # Examples
///
/// ```
/// use parvar::Promise;
/// use std::thread;
///
/// let promise = Promise::pending();
/// let writer = promise.clone();
/// thread::spawn(move || writer.resolve(String::from("ready")));
/// assert_eq!(promise.get(), "ready");
/// ```
pub struct Promise<T> {
    inner: Arc<Inner<T>>,
}

struct Inner<T> {
    state: Mutex<State<T>>,
    ready: Condvar,
}

enum State<T> {
    /// Wakers of async readers parked on this slot. Every one of them must
    /// be woken on resolution; a single-waker slot drops readers when
    /// several tasks wait on one promise.
    Pending { wakers: Vec<Waker> },
    Ready(T),
    Broken(Arc<CallError>),
}

impl<T> Promise<T> {
    /// A promise that is not yet ready.
    pub fn pending() -> Self {
        Promise {
            inner: Arc::new(Inner {
                state: Mutex::new(State::Pending { wakers: Vec::new() }),
                ready: Condvar::new(),
            }),
        }
    }

    /// A promise that is ready from the start. Never blocks a reader.
    pub fn ready(value: T) -> Self {
        Promise {
            inner: Arc::new(Inner {
                state: Mutex::new(State::Ready(value)),
                ready: Condvar::new(),
            }),
        }
    }

    /// Sets the value and releases every reader.
    ///
    /// The first writer wins: second and later calls are no-ops, and readers
    /// never observe a torn or overwritten value.
    pub fn resolve(&self, value: T) {
        let mut state = self.inner.state.lock().unwrap();
        if let State::Pending { wakers } = &mut *state {
            let wakers = std::mem::take(wakers);
            *state = State::Ready(value);
            drop(state);
            self.inner.ready.notify_all();
            for waker in wakers {
                waker.wake();
            }
        }
    }

    /// Moves the slot to the terminal failed state and releases every
    /// reader. Only a spawned unit that cannot produce a value breaks its
    /// promise; a resolved promise stays resolved.
    pub(crate) fn break_with(&self, error: CallError) {
        let mut state = self.inner.state.lock().unwrap();
        if let State::Pending { wakers } = &mut *state {
            let wakers = std::mem::take(wakers);
            *state = State::Broken(Arc::new(error));
            drop(state);
            self.inner.ready.notify_all();
            for waker in wakers {
                waker.wake();
            }
        }
    }
}

impl<T: Clone> Promise<T> {
    /// Blocks the calling thread until the value is ready, then returns it.
    /// Safe to call from any number of readers, before or after resolution;
    /// always the same value once resolved.
    ///
    /// # Panics
    ///
    /// Propagates the failure if the producing task panicked or failed to
    /// resolve its arguments. Use [`wait`](Promise::wait) to handle that
    /// case as an error.
    pub fn get(&self) -> T {
        match self.wait() {
            Ok(value) => value,
            Err(err) => panic!("{err}"),
        }
    }

    /// Like [`get`](Promise::get), but a broken promise comes back as an
    /// error instead of a panic.
    pub fn wait(&self) -> Result<T, PromiseError> {
        let mut state = self.inner.state.lock().unwrap();
        loop {
            match &*state {
                State::Ready(value) => return Ok(value.clone()),
                State::Broken(err) => return Err(PromiseError::TaskFailed(err.clone())),
                State::Pending { .. } => state = self.inner.ready.wait(state).unwrap(),
            }
        }
    }

    /// Non-blocking peek: the value if the promise is ready, `None` while it
    /// is pending or broken.
    pub fn try_get(&self) -> Option<T> {
        match &*self.inner.state.lock().unwrap() {
            State::Ready(value) => Some(value.clone()),
            _ => None,
        }
    }
}

impl<T: Default> Promise<T> {
    /// A ready promise holding the zero value of `T`.
    pub fn ready_default() -> Self {
        Promise::ready(T::default())
    }
}

impl<T> Clone for Promise<T> {
    fn clone(&self) -> Self {
        Promise {
            inner: self.inner.clone(),
        }
    }
}

impl<T> fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &*self.inner.state.lock().unwrap() {
            State::Pending { .. } => "pending",
            State::Ready(_) => "ready",
            State::Broken(_) => "broken",
        };
        f.debug_struct("Promise").field("state", &state).finish()
    }
}

impl<T: Clone> Future for Promise<T> {
    type Output = Result<T, PromiseError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut state = self.inner.state.lock().unwrap();
        match &mut *state {
            State::Ready(value) => Poll::Ready(Ok(value.clone())),
            State::Broken(err) => Poll::Ready(Err(PromiseError::TaskFailed(err.clone()))),
            State::Pending { wakers } => {
                wakers.push(cx.waker().clone());
                Poll::Pending
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn ready_promise_never_blocks() {
        let promise = Promise::ready(10);
        assert_eq!(promise.get(), 10);
        assert_eq!(promise.try_get(), Some(10));
    }

    #[test]
    fn ready_default_holds_zero_value() {
        let promise: Promise<i64> = Promise::ready_default();
        assert_eq!(promise.get(), 0);
    }

    #[test]
    fn first_writer_wins() {
        let promise = Promise::pending();
        promise.resolve(1);
        promise.resolve(2);
        assert_eq!(promise.get(), 1);
    }

    #[test]
    fn pending_promise_blocks_until_resolved() {
        let promise: Promise<i64> = Promise::pending();
        assert_eq!(promise.try_get(), None);

        let (tx, rx) = mpsc::channel();
        let reader = promise.clone();
        thread::spawn(move || {
            tx.send(reader.get()).unwrap();
        });
        // The reader is parked while the slot is unset.
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
        promise.resolve(7);
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), 7);
    }

    #[test]
    fn every_reader_observes_the_same_value() {
        let promise: Promise<String> = Promise::pending();
        let readers: Vec<_> = (0..8)
            .map(|_| {
                let reader = promise.clone();
                thread::spawn(move || reader.get())
            })
            .collect();
        promise.resolve(String::from("shared"));
        for reader in readers {
            assert_eq!(reader.join().unwrap(), "shared");
        }
    }

    #[test]
    fn concurrent_writers_race_without_tearing() {
        let promise: Promise<i64> = Promise::pending();
        let writers: Vec<_> = (0..4)
            .map(|i| {
                let writer = promise.clone();
                thread::spawn(move || writer.resolve(i))
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }
        let first = promise.get();
        assert!((0..4).contains(&first));
        // Every later read sees the winner.
        assert_eq!(promise.get(), first);
    }

    #[test]
    fn awaiting_readers_are_all_woken() {
        let promise: Promise<i64> = Promise::pending();
        let a = promise.clone();
        let b = promise.clone();
        let task_a = thread::spawn(move || block_on(async { a.await }));
        let task_b = thread::spawn(move || block_on(async { b.await }));
        promise.resolve(21);
        assert_eq!(task_a.join().unwrap().unwrap(), 21);
        assert_eq!(task_b.join().unwrap().unwrap(), 21);
    }

    #[test]
    fn broken_promise_surfaces_as_error() {
        let promise: Promise<i64> = Promise::pending();
        promise.break_with(CallError::Panicked("boom".to_owned()));
        assert!(promise.wait().is_err());
        assert_eq!(promise.try_get(), None);
    }

    #[test]
    fn resolve_after_break_is_a_no_op() {
        let promise: Promise<i64> = Promise::pending();
        promise.break_with(CallError::Panicked("boom".to_owned()));
        promise.resolve(1);
        assert!(promise.wait().is_err());
    }
}
