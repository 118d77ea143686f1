//! Xbox One wired controller (GIP) family
//!
//! Vendor-specific protocol: class FF/47/D0 on both the device and its
//! single interface, one interrupt IN and one interrupt OUT endpoint. After
//! power-up the pad announces itself with a fixed GIP packet before the
//! host sees any input.

use super::{PdoDescription, hardware_id, language_descriptor, require_nonzero_ids,
    string_descriptor};
use protocol::{
    CompletionCode, CreationError, DeviceIdentity, PrepareError, TargetFamily, descriptor_type,
};
use tracing::{debug, trace};

pub(super) const CONFIGURATION_VALUE: u8 = 1;
pub(super) const INTERFACE_NUMBER: u8 = 0;

/// GIP announce packet staged at power-up
const ANNOUNCE_PACKET: [u8; 32] = [
    0x02, 0x20, 0x01, 0x1C, 0x7E, 0xED, 0x82, 0x8B, 0xEC, 0x97, 0x00, 0x00, 0xD1, 0x02, 0x5E,
    0x04, 0x03, 0x00, 0x01, 0x00, 0x01, 0x00, 0x01, 0x00, 0x17, 0x00, 0x01, 0x00, 0x01, 0x00,
    0x01, 0x00,
];

/// Configuration descriptor: one interface (FF/47/D0), interrupt IN 0x81
/// and interrupt OUT 0x01, 64-byte packets
const CONFIGURATION_DESCRIPTOR: [u8; 32] = [
    0x09, 0x02, 0x20, 0x00, 0x01, 0x01, 0x00, 0xA0, 0xFA, // configuration
    0x09, 0x04, 0x00, 0x00, 0x02, 0xFF, 0x47, 0xD0, 0x00, // interface
    0x07, 0x05, 0x81, 0x03, 0x40, 0x00, 0x04, // endpoint IN
    0x07, 0x05, 0x01, 0x03, 0x40, 0x00, 0x08, // endpoint OUT
];

const MANUFACTURER: &str = "Microsoft Corporation";
const PRODUCT: &str = "Controller";

pub(super) fn prepare_pdo(identity: &DeviceIdentity) -> Result<PdoDescription, CreationError> {
    require_nonzero_ids(identity)?;
    Ok(PdoDescription {
        device_id: hardware_id(identity),
        description: "Virtual Xbox One Controller".to_string(),
    })
}

/// Per-device GIP context
#[derive(Debug)]
pub struct XgipContext {
    vendor_id: u16,
    product_id: u16,
    serial: u32,
    owner_process_id: u32,
    assigned: bool,
    /// Announce packet staged by power-up, consumed once by the data path
    announce: Option<Vec<u8>>,
}

impl XgipContext {
    pub(super) fn allocate() -> Self {
        Self {
            vendor_id: 0,
            product_id: 0,
            serial: 0,
            owner_process_id: 0,
            assigned: false,
            announce: None,
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
            "gip context assigned"
        );
        Ok(())
    }

    pub(super) fn prepare_hardware(&mut self) -> Result<(), PrepareError> {
        if !self.assigned {
            return Err(PrepareError::ContextNotAssigned {
                family: TargetFamily::XboxOneWired,
            });
        }
        self.announce = Some(ANNOUNCE_PACKET.to_vec());
        trace!(serial = self.serial, "gip announce packet staged");
        Ok(())
    }

    /// Take the staged announce packet, if power-up armed one
    pub(super) fn take_announce(&mut self) -> Option<Vec<u8>> {
        self.announce.take()
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
                3 => Some(string_descriptor(&format!("{:08}", self.serial))),
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
        _data: &[u8],
    ) -> (CompletionCode, Vec<u8>) {
        debug!(request, value, "gip class-interface request acknowledged");
        (CompletionCode::Success, Vec::new())
    }

    pub(super) fn interface_descriptor(
        &self,
        descriptor_type: u8,
        _index: u8,
    ) -> (CompletionCode, Vec<u8>) {
        trace!(
            descriptor_type,
            "gip interface descriptor request acknowledged"
        );
        (CompletionCode::Success, Vec::new())
    }

    /// 18-byte device descriptor with the context's vendor/product ids
    fn device_descriptor(&self) -> Vec<u8> {
        let vid = self.vendor_id.to_le_bytes();
        let pid = self.product_id.to_le_bytes();
        vec![
            0x12, 0x01, 0x00, 0x02, 0xFF, 0x47, 0xD0, 0x40, // USB 2.0, class FF/47/D0, ep0 64
            vid[0], vid[1], pid[0], pid[1], 0x90, 0x02, // bcdDevice 2.90
            0x01, 0x02, 0x03, 0x01, // strings, 1 configuration
        ]
    }
}
