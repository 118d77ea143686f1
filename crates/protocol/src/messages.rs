//! Protocol message definitions
//!
//! Messages exchanged between the bus core and the management layer over
//! the notification channel: provisioning stage reports and device
//! lifecycle/state notifications. Every message is wrapped in a versioned
//! envelope so the management layer can check compatibility.

use crate::types::{DeviceNotification, ProvisioningStage, StageOutcome};
use crate::version::ProtocolVersion;
use serde::{Deserialize, Serialize};

/// Top-level message envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Protocol version of this message
    pub version: ProtocolVersion,
    /// Message payload
    pub payload: MessagePayload,
}

/// All message types surfaced toward the management layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessagePayload {
    /// Provisioning milestone outcome for one child device
    StageReport {
        /// Milestone that finished
        stage: ProvisioningStage,
        /// Serial number of the child
        serial: u32,
        /// Outcome of the stage
        outcome: StageOutcome,
    },

    /// Device lifecycle/state event completing a management-layer wait
    DeviceNotification {
        /// The event
        notification: DeviceNotification,
    },

    /// Protocol-level error message
    Error {
        /// Human-readable error message
        message: String,
    },
}
