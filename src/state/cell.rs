//! Deduplicating observable state cell
//!
//! A `StateCell` holds one value. Writes of a value equal to the current one
//! are dropped. Every subscriber gets the current value first, then each
//! accepted write, in publish order.
//!
//! Delivery contract: values are queued to each subscriber's channel on the
//! writer's thread while the cell lock is held; the subscriber receives them
//! on whatever thread pulls from its `Subscription`. Channels are unbounded,
//! so a slow subscriber never blocks a writer.

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

struct CellInner<T> {
    value: T,
    version: u64,
    subscribers: Vec<Sender<T>>,
}

pub struct StateCell<T> {
    name: &'static str,
    inner: Mutex<CellInner<T>>,
}

impl<T> StateCell<T>
where
    T: Clone + PartialEq + Send + std::fmt::Debug,
{
    pub fn new(name: &'static str, initial: T) -> Self {
        Self {
            name,
            inner: Mutex::new(CellInner {
                value: initial,
                version: 0,
                subscribers: Vec::new(),
            }),
        }
    }

    // Values are replaced whole, so a poisoned guard still holds a valid value.
    fn lock(&self) -> MutexGuard<'_, CellInner<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self) -> T {
        self.lock().value.clone()
    }

    /// Number of accepted writes since construction
    pub fn version(&self) -> u64 {
        self.lock().version
    }

    /// Publish `value`. Returns false when it equals the current value.
    pub fn set(&self, value: T) -> bool {
        let mut inner = self.lock();
        Self::publish(self.name, &mut inner, value)
    }

    /// Atomically derive the next value from the current one.
    ///
    /// `f` runs under the cell lock and must not touch this cell.
    pub fn update<E>(&self, f: impl FnOnce(&T) -> Result<T, E>) -> Result<bool, E> {
        let mut inner = self.lock();
        let next = f(&inner.value)?;
        Ok(Self::publish(self.name, &mut inner, next))
    }

    fn publish(name: &'static str, inner: &mut CellInner<T>, value: T) -> bool {
        if inner.value == value {
            log::debug!("{}: ignoring duplicate value {:?}", name, value);
            return false;
        }
        inner.value = value;
        inner.version += 1;
        let current = &inner.value;
        inner
            .subscribers
            .retain(|tx| tx.send(current.clone()).is_ok());
        true
    }

    pub fn subscribe(&self) -> Subscription<T> {
        let (tx, rx) = unbounded();
        let mut inner = self.lock();
        // Cannot fail: the receiver is alive in this scope.
        let _ = tx.send(inner.value.clone());
        inner.subscribers.push(tx);
        Subscription { rx }
    }

    /// Live subscribers; dropped ones are pruned on the next publish.
    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }
}

/// Receiving end of a cell subscription. Dropping it unsubscribes.
pub struct Subscription<T> {
    rx: Receiver<T>,
}

impl<T> Subscription<T> {
    /// Block until the next value. `None` once the cell is gone.
    pub fn recv(&self) -> Option<T> {
        self.rx.recv().ok()
    }

    pub fn try_recv(&self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<T> {
        match self.rx.recv_timeout(timeout) {
            Ok(value) => Some(value),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Everything queued right now, without blocking
    pub fn drain(&self) -> Vec<T> {
        self.rx.try_iter().collect()
    }

    /// Underlying channel, for use with `crossbeam_channel::select!`
    pub fn receiver(&self) -> &Receiver<T> {
        &self.rx
    }
}
