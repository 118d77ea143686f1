//! Per-device transfer queues
//!
//! Each child device owns two FIFO queues that decouple request arrival
//! from data production. Both are explicitly paired by producer/consumer
//! operations; nothing is delivered implicitly by the runtime.
//!
//! - The **data queue** parks host IN requests until an input report is
//!   produced, and buffers produced reports until a host read arrives.
//! - The **notification queue** parks management-layer requests until a
//!   device lifecycle/state event occurs, and buffers events until a
//!   request arrives.
//!
//! Draining completes every outstanding entry with a cancellation result in
//! FIFO order; no parked request is ever dropped without completion.

use crate::config::QueueSettings;
use crate::request::{Completer, PendingRequest};
use protocol::{CURRENT_VERSION, CreationError, DeviceNotification, Message, MessagePayload};
use std::collections::VecDeque;
use tracing::{debug, error, trace, warn};

/// FIFO queue pairing host IN requests with produced input reports
#[derive(Debug)]
pub struct DataQueue {
    /// Host requests waiting for report data, oldest first
    pending: VecDeque<PendingRequest>,
    /// Produced reports waiting for a host request, oldest first
    ready: VecDeque<Vec<u8>>,
    max_pending: usize,
    max_ready: usize,
    next_seq: u64,
}

impl DataQueue {
    fn new(max_pending: usize, max_ready: usize) -> Result<Self, CreationError> {
        if max_pending == 0 || max_ready == 0 {
            return Err(CreationError::QueueCreate {
                reason: "data queue depth must be at least 1".to_string(),
            });
        }
        Ok(Self {
            pending: VecDeque::with_capacity(max_pending),
            ready: VecDeque::with_capacity(max_ready),
            max_pending,
            max_ready,
            next_seq: 0,
        })
    }

    /// Park a host request until report data arrives
    ///
    /// When the queue is at its configured depth the oldest entry is
    /// completed with a cancellation result first.
    pub fn park(&mut self, endpoint: u8, capacity: usize, completer: Completer) {
        if self.pending.len() >= self.max_pending {
            if let Some(oldest) = self.pending.pop_front() {
                warn!(
                    seq = oldest.seq(),
                    "data queue full, cancelling oldest pending request"
                );
                oldest.cancel();
            }
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        trace!(seq, endpoint, capacity, "parking host read");
        self.pending
            .push_back(PendingRequest::new(seq, endpoint, capacity, completer));
    }

    /// Take the oldest buffered report, if any
    pub fn take_ready(&mut self) -> Option<Vec<u8>> {
        self.ready.pop_front()
    }

    /// Push a produced report; pairs with the oldest parked request or is
    /// buffered. Returns true if a request was completed.
    pub fn push_report(&mut self, report: Vec<u8>) -> bool {
        if let Some(request) = self.pending.pop_front() {
            let delivered = request.fulfill(report);
            trace!(delivered, "report paired with oldest pending request");
            true
        } else {
            if self.ready.len() >= self.max_ready {
                // Stale input is worthless; keep the freshest reports
                self.ready.pop_front();
                warn!("ready report buffer full, dropping oldest report");
            }
            self.ready.push_back(report);
            false
        }
    }

    /// Cancel every parked request addressing `endpoint`, in FIFO order.
    /// Returns the number of requests cancelled.
    pub fn cancel_pipe(&mut self, endpoint: u8) -> usize {
        let mut kept = VecDeque::with_capacity(self.pending.len());
        let mut cancelled = 0;

        for request in self.pending.drain(..) {
            if request.endpoint() == endpoint {
                request.cancel();
                cancelled += 1;
            } else {
                kept.push_back(request);
            }
        }

        self.pending = kept;
        cancelled
    }

    /// Cancel every parked request and discard buffered reports.
    /// Returns the number of requests cancelled.
    pub fn drain(&mut self) -> usize {
        let mut cancelled = 0;
        while let Some(request) = self.pending.pop_front() {
            request.cancel();
            cancelled += 1;
        }
        self.ready.clear();
        cancelled
    }

    /// Number of parked host requests
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Number of buffered reports
    pub fn ready_len(&self) -> usize {
        self.ready.len()
    }
}

impl Drop for DataQueue {
    fn drop(&mut self) {
        let cancelled = self.drain();
        if cancelled > 0 {
            debug!(cancelled, "data queue released with requests still parked");
        }
    }
}

/// FIFO queue pairing management-layer requests with lifecycle events
///
/// Completions carry the event as a framed protocol message, so the
/// management layer decodes exactly what the notification channel defines.
#[derive(Debug)]
pub struct NotificationQueue {
    waiters: VecDeque<PendingRequest>,
    ready: VecDeque<DeviceNotification>,
    max_waiters: usize,
    max_ready: usize,
    next_seq: u64,
}

impl NotificationQueue {
    fn new(max_waiters: usize, max_ready: usize) -> Result<Self, CreationError> {
        if max_waiters == 0 || max_ready == 0 {
            return Err(CreationError::QueueCreate {
                reason: "notification queue depth must be at least 1".to_string(),
            });
        }
        Ok(Self {
            waiters: VecDeque::with_capacity(max_waiters),
            ready: VecDeque::with_capacity(max_ready),
            max_waiters,
            max_ready,
            next_seq: 0,
        })
    }

    /// Park a management request until an event occurs; completes
    /// immediately when a buffered event is already waiting
    pub fn park(&mut self, completer: Completer) {
        if let Some(notification) = self.ready.pop_front() {
            Self::deliver(
                PendingRequest::new(self.next_seq, 0, usize::MAX, completer),
                notification,
            );
            self.next_seq += 1;
            return;
        }

        if self.waiters.len() >= self.max_waiters {
            if let Some(oldest) = self.waiters.pop_front() {
                warn!(
                    seq = oldest.seq(),
                    "notification queue full, cancelling oldest waiter"
                );
                oldest.cancel();
            }
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.waiters
            .push_back(PendingRequest::new(seq, 0, usize::MAX, completer));
    }

    /// Publish an event; completes the oldest waiter or buffers the event.
    /// Returns true if a waiter was completed.
    pub fn publish(&mut self, notification: DeviceNotification) -> bool {
        if let Some(waiter) = self.waiters.pop_front() {
            Self::deliver(waiter, notification);
            true
        } else {
            if self.ready.len() >= self.max_ready {
                self.ready.pop_front();
                warn!("notification event buffer full, dropping oldest event");
            }
            self.ready.push_back(notification);
            false
        }
    }

    fn deliver(waiter: PendingRequest, notification: DeviceNotification) {
        let message = Message {
            version: CURRENT_VERSION,
            payload: MessagePayload::DeviceNotification { notification },
        };
        match protocol::encode_framed(&message) {
            Ok(frame) => {
                waiter.fulfill(frame);
            }
            Err(e) => {
                // Framing a notification cannot plausibly exceed the size
                // bound; complete the waiter rather than leak it
                error!("failed to frame notification: {}", e);
                waiter.cancel();
            }
        }
    }

    /// Cancel every parked waiter and discard buffered events.
    /// Returns the number of waiters cancelled.
    pub fn drain(&mut self) -> usize {
        let mut cancelled = 0;
        while let Some(waiter) = self.waiters.pop_front() {
            waiter.cancel();
            cancelled += 1;
        }
        self.ready.clear();
        cancelled
    }

    /// Number of parked waiters
    pub fn waiter_len(&self) -> usize {
        self.waiters.len()
    }

    /// Number of buffered events
    pub fn ready_len(&self) -> usize {
        self.ready.len()
    }
}

impl Drop for NotificationQueue {
    fn drop(&mut self) {
        let cancelled = self.drain();
        if cancelled > 0 {
            debug!(cancelled, "notification queue released with waiters parked");
        }
    }
}

/// The two queues owned exclusively by one child device
#[derive(Debug)]
pub struct TransferQueues {
    pub data: DataQueue,
    pub notifications: NotificationQueue,
}

impl TransferQueues {
    /// Create both queues from configured depths
    pub fn new(settings: &QueueSettings) -> Result<Self, CreationError> {
        Ok(Self {
            data: DataQueue::new(settings.data_depth, settings.ready_report_depth)?,
            notifications: NotificationQueue::new(
                settings.notification_depth,
                settings.notification_event_depth,
            )?,
        })
    }

    /// Drain both queues, cancelling every outstanding entry in FIFO order.
    /// Returns (data requests cancelled, notification waiters cancelled).
    pub fn drain_all(&mut self) -> (usize, usize) {
        (self.data.drain(), self.notifications.drain())
    }
}
