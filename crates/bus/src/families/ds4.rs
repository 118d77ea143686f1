//! Sony DualShock 4 wired controller family
//!
//! A plain HID gamepad: class 0 at the device level, class 3 (HID) on the
//! single interface, interrupt IN 0x84 and interrupt OUT 0x03. The host
//! fetches the HID report descriptor from the interface and exchanges
//! feature reports for calibration and pairing data; output reports carry
//! rumble and lightbar state.

use super::{PdoDescription, hardware_id, language_descriptor, require_nonzero_ids,
    string_descriptor};
use protocol::{
    CompletionCode, CreationError, DeviceIdentity, PrepareError, TargetFamily, descriptor_type,
};
use tracing::{debug, trace};

pub(super) const CONFIGURATION_VALUE: u8 = 1;
pub(super) const INTERFACE_NUMBER: u8 = 0;

/// HID GET_REPORT / SET_REPORT class request codes
const HID_GET_REPORT: u8 = 0x01;
const HID_SET_REPORT: u8 = 0x09;

/// Report type field in the high byte of wValue
const REPORT_TYPE_FEATURE: u8 = 0x03;

/// Gamepad report descriptor served from the interface
const REPORT_DESCRIPTOR: [u8; 88] = [
    0x05, 0x01, // Usage Page (Generic Desktop)
    0x09, 0x05, // Usage (Gamepad)
    0xA1, 0x01, // Collection (Application)
    0x85, 0x01, //   Report ID (1)
    0x09, 0x30, //   Usage (X)
    0x09, 0x31, //   Usage (Y)
    0x09, 0x32, //   Usage (Z)
    0x09, 0x35, //   Usage (Rz)
    0x15, 0x00, //   Logical Minimum (0)
    0x26, 0xFF, 0x00, //   Logical Maximum (255)
    0x75, 0x08, //   Report Size (8)
    0x95, 0x04, //   Report Count (4)
    0x81, 0x02, //   Input (Data,Var,Abs)
    0x09, 0x39, //   Usage (Hat switch)
    0x15, 0x00, //   Logical Minimum (0)
    0x25, 0x07, //   Logical Maximum (7)
    0x35, 0x00, //   Physical Minimum (0)
    0x46, 0x3B, 0x01, //   Physical Maximum (315)
    0x65, 0x14, //   Unit (Degrees)
    0x75, 0x04, //   Report Size (4)
    0x95, 0x01, //   Report Count (1)
    0x81, 0x42, //   Input (Data,Var,Abs,Null)
    0x65, 0x00, //   Unit (None)
    0x05, 0x09, //   Usage Page (Button)
    0x19, 0x01, //   Usage Minimum (1)
    0x29, 0x0E, //   Usage Maximum (14)
    0x15, 0x00, //   Logical Minimum (0)
    0x25, 0x01, //   Logical Maximum (1)
    0x75, 0x01, //   Report Size (1)
    0x95, 0x0E, //   Report Count (14)
    0x81, 0x02, //   Input (Data,Var,Abs)
    0x75, 0x06, //   Report Size (6)
    0x95, 0x01, //   Report Count (1)
    0x81, 0x03, //   Input (Const)
    0x05, 0x01, //   Usage Page (Generic Desktop)
    0x09, 0x33, //   Usage (Rx)
    0x09, 0x34, //   Usage (Ry)
    0x15, 0x00, //   Logical Minimum (0)
    0x26, 0xFF, 0x00, //   Logical Maximum (255)
    0x75, 0x08, //   Report Size (8)
    0x95, 0x02, //   Report Count (2)
    0x81, 0x02, //   Input (Data,Var,Abs)
    0xC0, // End Collection
];

/// Configuration descriptor: one HID interface, interrupt IN 0x84 and
/// interrupt OUT 0x03, 64-byte packets. The HID descriptor's
/// wDescriptorLength matches `REPORT_DESCRIPTOR`.
const CONFIGURATION_DESCRIPTOR: [u8; 41] = [
    0x09, 0x02, 0x29, 0x00, 0x01, 0x01, 0x00, 0xC0, 0xFA, // configuration
    0x09, 0x04, 0x00, 0x00, 0x02, 0x03, 0x00, 0x00, 0x00, // interface (HID)
    0x09, 0x21, 0x11, 0x01, 0x00, 0x01, 0x22, 0x58, 0x00, // HID descriptor
    0x07, 0x05, 0x84, 0x03, 0x40, 0x00, 0x05, // endpoint IN
    0x07, 0x05, 0x03, 0x03, 0x40, 0x00, 0x05, // endpoint OUT
];

/// Feature report 0x02: motion calibration data
const FEATURE_CALIBRATION: [u8; 37] = [
    0x02, 0xFD, 0xFF, 0x04, 0x00, 0x02, 0x00, 0x9E, 0x22, 0x63, 0xDD, 0x95, 0x22, 0x65, 0xDD,
    0x92, 0x22, 0x74, 0xDD, 0x1C, 0x02, 0x1C, 0x02, 0xE4, 0x1F, 0x7B, 0xE0, 0x38, 0x20, 0x3C,
    0xE0, 0x4B, 0x20, 0x15, 0xE0, 0x06, 0x00,
];

/// Feature report 0x12: pairing information (device address block)
const FEATURE_PAIRING: [u8; 16] = [
    0x12, 0x8B, 0x09, 0x07, 0x6D, 0x66, 0x1C, 0x08, 0x25, 0x00, 0x4C, 0x46, 0x49, 0x02, 0x00,
    0x00,
];

const MANUFACTURER: &str = "Sony Interactive Entertainment";
const PRODUCT: &str = "Wireless Controller";

pub(super) fn prepare_pdo(identity: &DeviceIdentity) -> Result<PdoDescription, CreationError> {
    require_nonzero_ids(identity)?;
    Ok(PdoDescription {
        device_id: format!("{}&REV_0100", hardware_id(identity)),
        description: "Virtual DualShock 4 Controller".to_string(),
    })
}

/// Per-device DualShock 4 context
#[derive(Debug)]
pub struct Ds4Context {
    vendor_id: u16,
    product_id: u16,
    serial: u32,
    owner_process_id: u32,
    assigned: bool,
    /// Last output report the host wrote (rumble/lightbar state)
    last_output: Option<Vec<u8>>,
}

impl Ds4Context {
    pub(super) fn allocate() -> Self {
        Self {
            vendor_id: 0,
            product_id: 0,
            serial: 0,
            owner_process_id: 0,
            assigned: false,
            last_output: None,
        }
    }

    pub(super) fn assign(&mut self, identity: &DeviceIdentity) -> Result<(), CreationError> {
        if identity.vendor_id == 0 || identity.product_id == 0 {
            return Err(CreationError::AssignContext {
                reason: "vendor/product id must be nonzero".to_string(),
            });
        }
        self.vendor_id = identity.vendor_id;
        self.product_id = identity.product_id;
        self.serial = identity.serial;
        self.owner_process_id = identity.owner_process_id;
        self.assigned = true;
        debug!(
            serial = self.serial,
            owner = self.owner_process_id,
            "ds4 context assigned"
        );
        Ok(())
    }

    pub(super) fn prepare_hardware(&mut self) -> Result<(), PrepareError> {
        if !self.assigned {
            return Err(PrepareError::ContextNotAssigned {
                family: TargetFamily::DualShock4Wired,
            });
        }
        Ok(())
    }

    /// Last output report written by the host, if any
    pub fn last_output(&self) -> Option<&[u8]> {
        self.last_output.as_deref()
    }

    pub(super) fn descriptor(
        &self,
        descriptor_type: u8,
        index: u8,
        _language_id: u16,
    ) -> Option<Vec<u8>> {
        match descriptor_type {
            descriptor_type::DEVICE => Some(self.device_descriptor()),
            descriptor_type::CONFIGURATION => Some(CONFIGURATION_DESCRIPTOR.to_vec()),
            descriptor_type::STRING => match index {
                0 => Some(language_descriptor()),
                1 => Some(string_descriptor(MANUFACTURER)),
                2 => Some(string_descriptor(PRODUCT)),
                _ => None,
            },
            _ => None,
        }
    }

    pub(super) fn class_interface(
        &mut self,
        request: u8,
        value: u16,
        _index: u16,
        data: &[u8],
    ) -> (CompletionCode, Vec<u8>) {
        let report_type = (value >> 8) as u8;
        let report_id = (value & 0xFF) as u8;

        match request {
            HID_GET_REPORT if report_type == REPORT_TYPE_FEATURE => match report_id {
                0x02 => (CompletionCode::Success, FEATURE_CALIBRATION.to_vec()),
                0x12 => (CompletionCode::Success, FEATURE_PAIRING.to_vec()),
                other => {
                    debug!(report_id = other, "unknown feature report requested");
                    (CompletionCode::Success, Vec::new())
                }
            },
            HID_SET_REPORT => {
                trace!(report_id, len = data.len(), "output state written");
                self.last_output = Some(data.to_vec());
                (CompletionCode::Success, Vec::new())
            }
            other => {
                debug!(request = other, "unhandled class request acknowledged");
                (CompletionCode::Success, Vec::new())
            }
        }
    }

    pub(super) fn interface_descriptor(
        &self,
        descriptor_type: u8,
        _index: u8,
    ) -> (CompletionCode, Vec<u8>) {
        match descriptor_type {
            descriptor_type::HID_REPORT => {
                (CompletionCode::Success, REPORT_DESCRIPTOR.to_vec())
            }
            other => {
                trace!(
                    descriptor_type = other,
                    "interface descriptor request acknowledged"
                );
                (CompletionCode::Success, Vec::new())
            }
        }
    }

    /// 18-byte device descriptor with the context's vendor/product ids
    fn device_descriptor(&self) -> Vec<u8> {
        let vid = self.vendor_id.to_le_bytes();
        let pid = self.product_id.to_le_bytes();
        vec![
            0x12, 0x01, 0x00, 0x02, 0x00, 0x00, 0x00, 0x40, // USB 2.0, class on interface, ep0 64
            vid[0], vid[1], pid[0], pid[1], 0x00, 0x01, // bcdDevice 1.00
            0x01, 0x02, 0x00, 0x01, // strings (no serial), 1 configuration
        ]
    }
}
