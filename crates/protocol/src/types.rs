//! Core type definitions for the virtual gamepad bus
//!
//! This module defines the device identity record, the emulated controller
//! families, completion codes, provisioning stages, and the error taxonomy
//! used when creating and powering up child devices.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use thiserror::Error;

/// Emulated controller family
///
/// Every child device on the bus impersonates one of three wired controller
/// protocols. The set is closed: family-specific behavior is selected by
/// matching on this enum, never through a virtual call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetFamily {
    /// Xbox 360 wired controller (XUSB protocol)
    Xbox360Wired,
    /// Sony DualShock 4 wired controller (HID)
    DualShock4Wired,
    /// Xbox One wired controller (GIP protocol)
    XboxOneWired,
}

impl fmt::Display for TargetFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TargetFamily::Xbox360Wired => "Xbox360Wired",
            TargetFamily::DualShock4Wired => "DualShock4Wired",
            TargetFamily::XboxOneWired => "XboxOneWired",
        };
        f.write_str(name)
    }
}

/// Immutable description of one virtual device
///
/// Produced by the bus management layer and consumed once at device
/// creation. The serial number is the sole deduplication key: two identity
/// records compare equal if and only if their serial numbers match,
/// regardless of any other field.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DeviceIdentity {
    /// Serial number, unique among live children on the bus
    pub serial: u32,
    /// Controller family this device impersonates
    pub family: TargetFamily,
    /// USB Vendor ID
    pub vendor_id: u16,
    /// USB Product ID
    pub product_id: u16,
    /// Process that owns this device
    pub owner_process_id: u32,
}

impl PartialEq for DeviceIdentity {
    fn eq(&self, other: &Self) -> bool {
        // Bus-level identity is the serial number alone
        self.serial == other.serial
    }
}

impl Eq for DeviceIdentity {}

impl Hash for DeviceIdentity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.serial.hash(state);
    }
}

/// Result code of a completed host request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompletionCode {
    /// Request handled (including the permissive default for codes the
    /// device does not recognize)
    Success,
    /// Protocol-level rejection signaled to the host; the addressed
    /// endpoint refuses the request
    Stall,
    /// Operation the emulated device does not support
    Unsupported,
    /// Queued request terminated by pipe abort or device teardown
    Cancelled,
}

impl CompletionCode {
    /// Whether this code represents a successful completion
    pub fn is_success(&self) -> bool {
        matches!(self, CompletionCode::Success)
    }
}

/// Completion of a host request: result code plus any payload produced
/// by the device (descriptor bytes, report data, status words)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    /// Result code
    pub code: CompletionCode,
    /// Payload returned to the host; empty when the request carried none
    #[serde(with = "serde_bytes")]
    pub data: Vec<u8>,
}

impl Completion {
    /// Completion with a result code and no payload
    pub fn empty(code: CompletionCode) -> Self {
        Self {
            code,
            data: Vec::new(),
        }
    }

    /// Successful completion carrying payload bytes
    pub fn with_data(data: Vec<u8>) -> Self {
        Self {
            code: CompletionCode::Success,
            data,
        }
    }
}

/// Device creation error
///
/// Returned when provisioning a child device fails. Each variant names the
/// creation step that failed; all previously acquired resources for the
/// device are released before the error is returned.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum CreationError {
    /// A live child with the same serial number already exists
    #[error("a device with serial {serial} is already plugged in")]
    DuplicateSerial { serial: u32 },

    /// Family-specific identifier/description preparation failed
    #[error("device identifier preparation failed: {reason}")]
    PreparePdo { reason: String },

    /// Family context population failed
    #[error("family context assignment failed: {reason}")]
    AssignContext { reason: String },

    /// Request queue creation failed
    #[error("queue creation failed: {reason}")]
    QueueCreate { reason: String },
}

/// Power-up (hardware preparation) error
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum PrepareError {
    /// The family context has not been populated with identity data
    #[error("family context for {family} has no identity assigned")]
    ContextNotAssigned { family: TargetFamily },

    /// No live child carries the addressed serial number
    #[error("no live device with serial {serial}")]
    NoSuchDevice { serial: u32 },
}

/// Provisioning milestone reported to the parent bus
///
/// After each milestone the child synchronously informs the bus of the
/// outcome so provisioning failures can be observed upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProvisioningStage {
    /// Device creation attempt finished (success or failure)
    Create,
    /// Power-up hardware preparation finished
    PrepareHardware,
    /// Enumeration complete; the device is fully operational
    InitFinished,
}

/// Outcome carried by a stage report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StageOutcome {
    /// Stage completed successfully
    Success,
    /// Stage failed with a reason
    Failed { reason: String },
}

impl StageOutcome {
    /// Whether the stage succeeded
    pub fn is_success(&self) -> bool {
        matches!(self, StageOutcome::Success)
    }

    /// Build an outcome from a step result
    pub fn from_result<T, E: fmt::Display>(result: &std::result::Result<T, E>) -> Self {
        match result {
            Ok(_) => StageOutcome::Success,
            Err(e) => StageOutcome::Failed {
                reason: e.to_string(),
            },
        }
    }
}

/// Device lifecycle/state event surfaced toward the management layer
///
/// Events complete management-layer requests waiting on the notification
/// queue of the device they concern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceNotification {
    /// Device finished creation and is exposed to the host
    PluggedIn {
        serial: u32,
        family: TargetFamily,
    },
    /// Power-up hardware preparation completed
    PrepareHardwareComplete { serial: u32 },
    /// Enumeration finished; the device is fully operational
    InitializationFinished { serial: u32 },
    /// The host wrote an output report (rumble, LED, lightbar) to the device
    OutputReport {
        serial: u32,
        #[serde(with = "serde_bytes")]
        data: Vec<u8>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(serial: u32, family: TargetFamily) -> DeviceIdentity {
        DeviceIdentity {
            serial,
            family,
            vendor_id: 0x045E,
            product_id: 0x028E,
            owner_process_id: 1000,
        }
    }

    #[test]
    fn test_identity_equality_is_serial_only() {
        let a = identity(7, TargetFamily::Xbox360Wired);
        let mut b = identity(7, TargetFamily::DualShock4Wired);
        b.vendor_id = 0x054C;
        b.owner_process_id = 4242;

        // Same serial, everything else different: still the same child
        assert_eq!(a, b);
        assert_ne!(a, identity(8, TargetFamily::Xbox360Wired));
    }

    #[test]
    fn test_identity_hash_follows_equality() {
        use std::collections::HashSet;

        let mut set = HashSet::new();
        set.insert(identity(1, TargetFamily::Xbox360Wired));
        assert!(set.contains(&identity(1, TargetFamily::XboxOneWired)));
        assert!(!set.contains(&identity(2, TargetFamily::Xbox360Wired)));
    }

    #[test]
    fn test_completion_code_success() {
        assert!(CompletionCode::Success.is_success());
        assert!(!CompletionCode::Stall.is_success());
        assert!(!CompletionCode::Unsupported.is_success());
        assert!(!CompletionCode::Cancelled.is_success());
    }

    #[test]
    fn test_stage_outcome_from_result() {
        let ok: Result<(), CreationError> = Ok(());
        assert!(StageOutcome::from_result(&ok).is_success());

        let err: Result<(), CreationError> = Err(CreationError::DuplicateSerial { serial: 3 });
        match StageOutcome::from_result(&err) {
            StageOutcome::Failed { reason } => {
                assert!(reason.contains("serial 3"));
            }
            StageOutcome::Success => panic!("expected failure outcome"),
        }
    }

    #[test]
    fn test_creation_error_display() {
        let err = CreationError::PreparePdo {
            reason: "vendor id is zero".to_string(),
        };
        assert!(format!("{}", err).contains("identifier preparation"));
    }
}
