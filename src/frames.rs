//! Frame source: hot broadcast of processed frames
//!
//! Subscribers only see frames published after they subscribe. The most
//! recent frame is also kept in a latest-value slot for consumers that need
//! exactly one frame (photo capture).

use crate::errors::CameraError;
use crate::types::{Frame, PixelFormat};
use bytes::Bytes;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, Weak};
use std::time::{Duration, Instant};

/// Default per-subscriber queue depth
pub const DEFAULT_SUBSCRIBER_CAPACITY: usize = 8;

/// Contract of the component that emits processed frames
pub trait FrameSource: Send + Sync {
    /// Start receiving frames published from now on
    fn subscribe(&self) -> FrameSubscription;

    /// Most recently published frame.
    ///
    /// This call BLOCKS the current thread until the first frame exists or
    /// `timeout` elapses (`CameraError::Timeout`). Never call it from a
    /// thread that must stay responsive; use `spawn_blocking` from async code.
    fn latest(&self, timeout: Duration) -> Result<Frame, CameraError>;
}

struct Hub {
    capacity: usize,
    subscribers: Mutex<Vec<Subscriber>>,
    next_id: AtomicU64,
    latest: Mutex<Option<Frame>>,
    latest_ready: Condvar,
    closed: AtomicBool,
    dropped: AtomicU64,
    sequence: AtomicU64,
    start: Instant,
}

/// Hub side of a subscription. The receiver clone lets a full queue give
/// up its oldest frame; unsubscribing is explicit on drop.
struct Subscriber {
    id: u64,
    tx: Sender<Frame>,
    oldest: Receiver<Frame>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Hub {
    fn unsubscribe(&self, id: u64) {
        lock(&self.subscribers).retain(|sub| sub.id != id);
    }
}

/// In-process frame source fed by the effects engine's output callback
#[derive(Clone)]
pub struct FrameBroadcaster {
    hub: Arc<Hub>,
}

impl Default for FrameBroadcaster {
    fn default() -> Self {
        Self::new(DEFAULT_SUBSCRIBER_CAPACITY)
    }
}

impl FrameBroadcaster {
    pub fn new(subscriber_capacity: usize) -> Self {
        Self {
            hub: Arc::new(Hub {
                capacity: subscriber_capacity.max(1),
                subscribers: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(1),
                latest: Mutex::new(None),
                latest_ready: Condvar::new(),
                closed: AtomicBool::new(false),
                dropped: AtomicU64::new(0),
                sequence: AtomicU64::new(1),
                start: Instant::now(),
            }),
        }
    }

    /// Build a frame carrying this source's sequence number and timestamp
    pub fn stamp(&self, data: impl Into<Bytes>, width: u32, height: u32, format: PixelFormat) -> Frame {
        let mut frame = Frame::new(data, width, height, format);
        frame.sequence = self.hub.sequence.fetch_add(1, Ordering::Relaxed);
        frame.timestamp_us = self.hub.start.elapsed().as_micros() as u64;
        frame
    }

    /// Deliver `frame` to every current subscriber and make it the latest.
    ///
    /// A subscriber whose queue is full loses its oldest queued frame to
    /// make room; others are unaffected.
    pub fn publish(&self, frame: Frame) {
        if self.hub.closed.load(Ordering::Acquire) {
            return;
        }

        {
            let subscribers = lock(&self.hub.subscribers);
            for sub in subscribers.iter() {
                let mut pending = frame.clone();
                loop {
                    match sub.tx.try_send(pending) {
                        Ok(()) | Err(TrySendError::Disconnected(_)) => break,
                        Err(TrySendError::Full(back)) => {
                            pending = back;
                            if let Ok(stale) = sub.oldest.try_recv() {
                                self.hub.dropped.fetch_add(1, Ordering::Relaxed);
                                log::trace!("Subscriber {} lagging, dropped frame {}", sub.id, stale.sequence);
                            }
                        }
                    }
                }
            }
        }

        *lock(&self.hub.latest) = Some(frame);
        self.hub.latest_ready.notify_all();
    }

    /// Stop the source: subscribers disconnect and blocked `latest` calls fail.
    pub fn close(&self) {
        self.hub.closed.store(true, Ordering::Release);
        lock(&self.hub.subscribers).clear();
        // Take the slot lock so no waiter misses the wakeup.
        let _guard = lock(&self.hub.latest);
        self.hub.latest_ready.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.hub.closed.load(Ordering::Acquire)
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.hub.subscribers).len()
    }

    /// Frames missed by lagging subscribers, summed over all subscribers
    pub fn dropped_frames(&self) -> u64 {
        self.hub.dropped.load(Ordering::Relaxed)
    }
}

impl FrameSource for FrameBroadcaster {
    fn subscribe(&self) -> FrameSubscription {
        let (tx, rx) = bounded(self.hub.capacity);
        let id = self.hub.next_id.fetch_add(1, Ordering::Relaxed);
        if !self.is_closed() {
            lock(&self.hub.subscribers).push(Subscriber {
                id,
                tx,
                oldest: rx.clone(),
            });
        }
        FrameSubscription {
            id,
            rx,
            hub: Arc::downgrade(&self.hub),
        }
    }

    fn latest(&self, timeout: Duration) -> Result<Frame, CameraError> {
        let guard = lock(&self.hub.latest);
        let (guard, _) = self
            .hub
            .latest_ready
            .wait_timeout_while(guard, timeout, |slot| {
                slot.is_none() && !self.hub.closed.load(Ordering::Acquire)
            })
            .unwrap_or_else(PoisonError::into_inner);

        match guard.as_ref() {
            Some(frame) => Ok(frame.clone()),
            None if self.is_closed() => Err(CameraError::StreamError(
                "frame source closed before the first frame".to_string(),
            )),
            None => Err(CameraError::Timeout(timeout.as_millis() as u64)),
        }
    }
}

/// A live subscription. Dropping it unsubscribes synchronously.
pub struct FrameSubscription {
    id: u64,
    rx: Receiver<Frame>,
    hub: Weak<Hub>,
}

impl FrameSubscription {
    /// Wait for the next frame. `Ok(None)` on timeout; an error once the
    /// source has closed and the queue is drained.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<Frame>, CameraError> {
        match self.rx.recv_timeout(timeout) {
            Ok(frame) => Ok(Some(frame)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => {
                Err(CameraError::StreamError("frame source closed".to_string()))
            }
        }
    }

    pub fn try_recv(&self) -> Option<Frame> {
        self.rx.try_recv().ok()
    }

    pub fn receiver(&self) -> &Receiver<Frame> {
        &self.rx
    }
}

impl Drop for FrameSubscription {
    fn drop(&mut self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.unsubscribe(self.id);
        }
    }
}
