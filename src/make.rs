use std::collections::HashMap;
use std::hash::Hash;
use std::sync::mpsc::{channel, sync_channel, Receiver, Sender, SyncSender};

use crate::promise::Promise;

/// Pre-allocates `len` ready, default-valued promises.
pub fn ready_vec<T: Default>(len: usize) -> Vec<Promise<T>> {
    ready_vec_with_capacity(len, len)
}

/// Like [`ready_vec`], reserving room for `capacity` promises.
pub fn ready_vec_with_capacity<T: Default>(len: usize, capacity: usize) -> Vec<Promise<T>> {
    let mut promises = Vec::with_capacity(capacity.max(len));
    promises.extend((0..len).map(|_| Promise::ready_default()));
    promises
}

/// Pre-allocates `len` unresolved promises.
pub fn pending_vec<T>(len: usize) -> Vec<Promise<T>> {
    pending_vec_with_capacity(len, len)
}

/// Like [`pending_vec`], reserving room for `capacity` promises.
pub fn pending_vec_with_capacity<T>(len: usize, capacity: usize) -> Vec<Promise<T>> {
    let mut promises = Vec::with_capacity(capacity.max(len));
    promises.extend((0..len).map(|_| Promise::pending()));
    promises
}

/// An empty promise mapping with a capacity hint.
pub fn promise_map<K: Eq + Hash, V>(capacity: usize) -> HashMap<K, Promise<V>> {
    HashMap::with_capacity(capacity)
}

/// An unbounded channel of promises.
pub fn promise_channel<T>() -> (Sender<Promise<T>>, Receiver<Promise<T>>) {
    channel()
}

/// A bounded channel of promises; sends block once `bound` promises are in
/// flight.
pub fn bounded_promise_channel<T>(bound: usize) -> (SyncSender<Promise<T>>, Receiver<Promise<T>>) {
    sync_channel(bound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn ready_vec_elements_hold_zero_values() {
        let promises: Vec<Promise<i64>> = ready_vec(3);
        assert_eq!(promises.len(), 3);
        for promise in &promises {
            assert_eq!(promise.get(), 0);
        }
    }

    #[test]
    fn pending_vec_elements_are_unresolved() {
        let promises: Vec<Promise<i64>> = pending_vec(3);
        for promise in &promises {
            assert_eq!(promise.try_get(), None);
        }
        promises[1].resolve(5);
        assert_eq!(promises[1].try_get(), Some(5));
        assert_eq!(promises[0].try_get(), None);
    }

    #[test]
    fn capacity_hints_do_not_change_length() {
        let promises: Vec<Promise<i64>> = pending_vec_with_capacity(2, 16);
        assert_eq!(promises.len(), 2);
        assert!(promises.capacity() >= 16);
    }

    #[test]
    fn promise_map_starts_empty() {
        let map: HashMap<String, Promise<i64>> = promise_map(8);
        assert!(map.is_empty());
    }

    #[test]
    fn promises_travel_through_the_channel() {
        let (tx, rx) = promise_channel::<i64>();
        let producer = thread::spawn(move || {
            let promise = Promise::pending();
            tx.send(promise.clone()).unwrap();
            promise.resolve(11);
        });
        let received = rx.recv().unwrap();
        assert_eq!(received.get(), 11);
        producer.join().unwrap();
    }
}
