//! Async channel bridge between the management side and the bus worker thread
//!
//! The bus worker owns every live child device and runs on a dedicated
//! blocking thread; the management/producer side runs on the async runtime.
//! Commands flow one way, lifecycle events flow the other, and each command
//! that expects an answer carries its own oneshot response channel.

use async_channel::{Receiver, Sender, bounded};
use protocol::{
    Completion, CreationError, DeviceIdentity, PrepareError, ProvisioningStage, StageOutcome,
    TargetFamily,
};

/// Commands from the management/producer side to the bus worker thread
#[derive(Debug)]
pub enum BusCommand {
    /// Create and expose a new child device
    PlugIn {
        /// Identity record of the device to create
        identity: DeviceIdentity,
        /// Channel to send the creation result back
        response: tokio::sync::oneshot::Sender<Result<(), CreationError>>,
    },

    /// Run power-up hardware preparation for a child
    PrepareHardware {
        /// Serial number of the child
        serial: u32,
        /// Channel to send the preparation result back
        response: tokio::sync::oneshot::Sender<Result<(), PrepareError>>,
    },

    /// Push an input report produced for a child; pairs with the oldest
    /// pending host read or is buffered until one arrives
    SubmitReport {
        /// Serial number of the child
        serial: u32,
        /// Report bytes
        report: Vec<u8>,
        /// True if the report was accepted (the child exists)
        response: tokio::sync::oneshot::Sender<bool>,
    },

    /// Wait for the next device lifecycle/state notification of a child
    AwaitNotification {
        /// Serial number of the child
        serial: u32,
        /// Completed with the framed notification message, or `Cancelled`
        /// at teardown
        response: tokio::sync::oneshot::Sender<Completion>,
    },

    /// Tear down and remove a child device
    Unplug {
        /// Serial number of the child
        serial: u32,
        /// True if a child with that serial existed
        response: tokio::sync::oneshot::Sender<bool>,
    },

    /// Shutdown the bus worker thread gracefully
    Shutdown,
}

/// Bus lifecycle events from the worker thread
#[derive(Debug, Clone)]
pub enum BusEvent {
    /// A child device finished creation and is exposed to the host
    DevicePluggedIn {
        /// Serial number of the child
        serial: u32,
        /// Family the child impersonates
        family: TargetFamily,
    },

    /// A child device was torn down and removed
    DeviceUnplugged {
        /// Serial number of the child
        serial: u32,
    },

    /// A provisioning stage finished for a child
    StageReported {
        /// Milestone that finished
        stage: ProvisioningStage,
        /// Serial number of the child
        serial: u32,
        /// Outcome of the stage
        outcome: StageOutcome,
    },
}

/// Handle for the async management side
#[derive(Clone)]
pub struct BusBridge {
    cmd_tx: Sender<BusCommand>,
    event_rx: Receiver<BusEvent>,
}

impl BusBridge {
    /// Send a command to the bus worker thread
    pub async fn send_command(&self, cmd: BusCommand) -> crate::Result<()> {
        self.cmd_tx
            .send(cmd)
            .await
            .map_err(|e| crate::Error::Channel(e.to_string()))
    }

    /// Receive an event from the bus worker thread
    pub async fn recv_event(&self) -> crate::Result<BusEvent> {
        self.event_rx
            .recv()
            .await
            .map_err(|e| crate::Error::Channel(e.to_string()))
    }
}

/// Handle for the bus worker thread (blocking)
pub struct BusWorker {
    pub(crate) cmd_rx: Receiver<BusCommand>,
    /// Event sender (public so the worker thread can hand clones to the
    /// stage reporter)
    pub event_tx: Sender<BusEvent>,
}

impl BusWorker {
    /// Receive a command from the management side (blocking)
    pub fn recv_command(&self) -> crate::Result<BusCommand> {
        self.cmd_rx
            .recv_blocking()
            .map_err(|e| crate::Error::Channel(e.to_string()))
    }

    /// Try to receive a command without blocking
    pub fn try_recv_command(&self) -> Option<BusCommand> {
        self.cmd_rx.try_recv().ok()
    }

    /// Send an event to the management side (blocking)
    pub fn send_event(&self, event: BusEvent) -> crate::Result<()> {
        self.event_tx
            .send_blocking(event)
            .map_err(|e| crate::Error::Channel(e.to_string()))
    }
}

/// Create the channel bridge between the management side and the bus worker
///
/// Returns (BusBridge for the async side, BusWorker for the worker thread)
pub fn create_bus_bridge() -> (BusBridge, BusWorker) {
    let (cmd_tx, cmd_rx) = bounded(256);
    let (event_tx, event_rx) = bounded(256);

    (
        BusBridge { cmd_tx, event_rx },
        BusWorker { cmd_rx, event_tx },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::TargetFamily;

    #[tokio::test]
    async fn test_channel_bridge() {
        let (bridge, worker) = create_bus_bridge();

        // Spawn a thread to simulate the bus worker
        let handle = std::thread::spawn(move || {
            let cmd = worker.recv_command().unwrap();
            matches!(cmd, BusCommand::PlugIn { .. })
        });

        // Send command from async context
        let (tx, _rx) = tokio::sync::oneshot::channel();
        bridge
            .send_command(BusCommand::PlugIn {
                identity: DeviceIdentity {
                    serial: 1,
                    family: TargetFamily::Xbox360Wired,
                    vendor_id: 0x045E,
                    product_id: 0x028E,
                    owner_process_id: 99,
                },
                response: tx,
            })
            .await
            .unwrap();

        assert!(handle.join().unwrap());
    }

    #[tokio::test]
    async fn test_event_flow() {
        let (bridge, worker) = create_bus_bridge();

        worker
            .send_event(BusEvent::DeviceUnplugged { serial: 4 })
            .unwrap();

        match bridge.recv_event().await.unwrap() {
            BusEvent::DeviceUnplugged { serial } => assert_eq!(serial, 4),
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
