//! Stage-result reporting toward the parent bus
//!
//! The reporting channel is a callback capability handed to each child at
//! construction. Reports are synchronous and fire-and-forget: nothing in
//! the core waits on, or branches on, the bus having consumed a report.

use common::BusEvent;
use protocol::{ProvisioningStage, StageOutcome};
use tracing::warn;

/// Callback capability for reporting provisioning milestones
pub trait StageReporter: Send + Sync {
    /// Report the outcome of a provisioning stage for one child
    fn report_stage(&self, stage: ProvisioningStage, serial: u32, outcome: &StageOutcome);
}

/// Reporter forwarding stage results onto the bridge's event channel
pub struct EventStageReporter {
    events: async_channel::Sender<BusEvent>,
}

impl EventStageReporter {
    pub fn new(events: async_channel::Sender<BusEvent>) -> Self {
        Self { events }
    }
}

impl StageReporter for EventStageReporter {
    fn report_stage(&self, stage: ProvisioningStage, serial: u32, outcome: &StageOutcome) {
        let event = BusEvent::StageReported {
            stage,
            serial,
            outcome: outcome.clone(),
        };
        // Must never block the core; a full channel loses the report
        if let Err(e) = self.events.try_send(event) {
            warn!(serial, "stage report not delivered: {}", e);
        }
    }
}
