//! Bus worker thread
//!
//! Dedicated blocking thread owning the child list. Commands from the
//! management/producer side arrive over the bridge and are serviced one at
//! a time per device, so report arrival and teardown pair with parked
//! requests without racing the host-facing dispatch path.

use crate::config::BusConfig;
use crate::registry::ChildList;
use crate::reporter::EventStageReporter;
use common::{BusCommand, BusEvent, BusWorker};
use protocol::{Completion, CompletionCode, PrepareError};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Bus worker thread state
pub struct BusWorkerThread {
    children: ChildList,
    worker: BusWorker,
}

impl BusWorkerThread {
    /// Create a new bus worker
    pub fn new(worker: BusWorker, config: &BusConfig) -> Self {
        let reporter = Arc::new(EventStageReporter::new(worker.event_tx.clone()));
        let children = ChildList::new(reporter, config.queues.clone());

        Self { children, worker }
    }

    /// Run the worker loop until shutdown
    ///
    /// On exit every remaining child is torn down, so no queued request
    /// survives the bus.
    pub fn run(mut self) -> common::Result<()> {
        info!("bus worker thread started");

        loop {
            match self.worker.recv_command() {
                Ok(BusCommand::Shutdown) => {
                    info!("bus worker shutting down");
                    break;
                }
                Ok(cmd) => {
                    self.handle_command(cmd);
                }
                Err(e) => {
                    warn!("command channel closed: {}", e);
                    break;
                }
            }
        }

        for serial in self.children.serials() {
            self.children.unplug(serial);
            let _ = self
                .worker
                .send_event(BusEvent::DeviceUnplugged { serial });
        }

        info!("bus worker thread stopped");
        Ok(())
    }

    fn handle_command(&mut self, cmd: BusCommand) {
        match cmd {
            BusCommand::PlugIn { identity, response } => {
                debug!(serial = identity.serial, "plug-in requested");
                let result = self.children.plug_in(identity);
                if result.is_ok() {
                    let _ = self.worker.send_event(BusEvent::DevicePluggedIn {
                        serial: identity.serial,
                        family: identity.family,
                    });
                }
                let _ = response.send(result);
            }

            BusCommand::PrepareHardware { serial, response } => {
                debug!(serial, "prepare-hardware requested");
                let result = match self.children.get_mut(serial) {
                    Some(device) => device.prepare_hardware(),
                    None => Err(PrepareError::NoSuchDevice { serial }),
                };
                let _ = response.send(result);
            }

            BusCommand::SubmitReport {
                serial,
                report,
                response,
            } => {
                let accepted = match self.children.get_mut(serial) {
                    Some(device) => {
                        device.submit_report(report);
                        true
                    }
                    None => {
                        warn!(serial, "report for unknown serial dropped");
                        false
                    }
                };
                let _ = response.send(accepted);
            }

            BusCommand::AwaitNotification { serial, response } => {
                match self.children.get_mut(serial) {
                    Some(device) => device.await_notification(response),
                    None => {
                        let _ = response.send(Completion::empty(CompletionCode::Cancelled));
                    }
                }
            }

            BusCommand::Unplug { serial, response } => {
                debug!(serial, "unplug requested");
                let removed = self.children.unplug(serial);
                if removed {
                    let _ = self
                        .worker
                        .send_event(BusEvent::DeviceUnplugged { serial });
                }
                let _ = response.send(removed);
            }

            BusCommand::Shutdown => {
                // Handled in the main loop
                unreachable!()
            }
        }
    }
}

/// Spawn the bus worker thread
///
/// The thread runs until a Shutdown command is received or the command
/// channel closes.
pub fn spawn_bus_worker(
    worker: BusWorker,
    config: BusConfig,
) -> std::thread::JoinHandle<common::Result<()>> {
    std::thread::Builder::new()
        .name("bus-worker".to_string())
        .spawn(move || {
            let worker_thread = BusWorkerThread::new(worker, &config);
            worker_thread.run()
        })
        .expect("Failed to spawn bus worker thread")
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::create_bus_bridge;

    #[test]
    fn test_worker_creation() {
        let (_bridge, worker) = create_bus_bridge();
        let worker_thread = BusWorkerThread::new(worker, &BusConfig::default());

        assert!(worker_thread.children.is_empty());
    }
}
