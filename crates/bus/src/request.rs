//! Host request and completion plumbing
//!
//! Every request submitted to a child device carries a take-once completion
//! handle. The dispatcher either completes the request synchronously or
//! parks it on one of the device's queues; either way the submitter observes
//! exactly one completion on the receiver it kept. A handle that is still
//! armed when dropped completes itself with a cancellation result, so no
//! request can leave the core without an answer.

use protocol::{Completion, CompletionCode, PortRequest, Urb};
use tokio::sync::oneshot;

/// Outcome of dispatching one host request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The request was completed at the dispatcher's single exit point
    Completed {
        /// Result code the request was completed with
        code: CompletionCode,
        /// Payload bytes returned to the host
        bytes_returned: usize,
    },
    /// The request was moved onto a queue and will complete later, from the
    /// data-arrival or teardown path
    Pending,
}

/// Take-once completion handle of a host request
///
/// Completing consumes the handle, which makes double completion
/// unrepresentable. Dropping an armed handle sends `Cancelled`.
#[derive(Debug)]
pub struct Completer {
    tx: Option<oneshot::Sender<Completion>>,
}

impl Completer {
    pub(crate) fn from_sender(tx: oneshot::Sender<Completion>) -> Self {
        Self { tx: Some(tx) }
    }

    /// Complete the request with a result code and payload
    pub(crate) fn complete(mut self, code: CompletionCode, data: Vec<u8>) {
        if let Some(tx) = self.tx.take() {
            // The submitter may have dropped its receiver; nothing to do then
            let _ = tx.send(Completion { code, data });
        }
    }

    /// Complete the request with a cancellation result
    pub(crate) fn cancel(self) {
        self.complete(CompletionCode::Cancelled, Vec::new());
    }
}

impl Drop for Completer {
    fn drop(&mut self) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(Completion::empty(CompletionCode::Cancelled));
        }
    }
}

/// A host-submitted request paired with its completion handle
#[derive(Debug)]
pub struct HostRequest {
    pub(crate) request: PortRequest,
    pub(crate) completer: Completer,
}

impl HostRequest {
    /// Build a request; the returned receiver observes its completion
    pub fn new(request: PortRequest) -> (Self, oneshot::Receiver<Completion>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                request,
                completer: Completer::from_sender(tx),
            },
            rx,
        )
    }

    /// Build a submit-URB request
    pub fn submit_urb(urb: Urb) -> (Self, oneshot::Receiver<Completion>) {
        Self::new(PortRequest::SubmitUrb(urb))
    }

    /// Build a request from a raw control code (no request block)
    pub fn from_control_code(control_code: u32) -> (Self, oneshot::Receiver<Completion>) {
        Self::new(PortRequest::classify(control_code, None))
    }

    pub(crate) fn into_parts(self) -> (PortRequest, Completer) {
        (self.request, self.completer)
    }
}

/// A request parked on a queue, awaiting a data producer or teardown
///
/// Holds just enough context to complete the original request later: its
/// arrival order, the addressed endpoint, the host buffer capacity, and the
/// completion handle.
#[derive(Debug)]
pub struct PendingRequest {
    seq: u64,
    endpoint: u8,
    capacity: usize,
    completer: Completer,
}

impl PendingRequest {
    pub(crate) fn new(seq: u64, endpoint: u8, capacity: usize, completer: Completer) -> Self {
        Self {
            seq,
            endpoint,
            capacity,
            completer,
        }
    }

    /// Arrival sequence number (FIFO position)
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Endpoint the request addressed
    pub fn endpoint(&self) -> u8 {
        self.endpoint
    }

    /// Host buffer capacity of the request
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Complete with report data, truncated to the request's buffer
    /// capacity; returns the payload length actually delivered
    pub(crate) fn fulfill(self, mut data: Vec<u8>) -> usize {
        data.truncate(self.capacity);
        let delivered = data.len();
        self.completer.complete(CompletionCode::Success, data);
        delivered
    }

    /// Complete with a cancellation result
    pub(crate) fn cancel(self) {
        self.completer.cancel();
    }
}
