//! Xbox 360 wired controller (XUSB) family
//!
//! Vendor-specific protocol: the device reports class FF/FF/FF at the
//! device level and FF/5D/01 on its single interface, with one interrupt IN
//! and one interrupt OUT endpoint. Early host probing reads fixed handshake
//! payloads out of a per-device blob.

use super::{PdoDescription, hardware_id, language_descriptor, require_nonzero_ids,
    string_descriptor};
use protocol::{
    CompletionCode, CreationError, DeviceIdentity, PrepareError, TargetFamily, descriptor_type,
};
use tracing::{debug, trace};

pub(super) const CONFIGURATION_VALUE: u8 = 1;
pub(super) const INTERFACE_NUMBER: u8 = 0;

/// Fixed payloads the pad hands back during early host probing
const HANDSHAKE_BLOB: [u8; 40] = [
    0x01, 0x03, 0x0E, 0x00, 0x02, 0x03, 0x00, 0x00, //
    0x03, 0x03, 0x03, 0x00, 0x08, 0x03, 0x00, 0x00, //
    0x49, 0x4B, 0x00, 0x00, 0x01, 0x03, 0x09, 0x00, //
    0x00, 0x03, 0x09, 0x00, 0x06, 0x03, 0x00, 0x00, //
    0x05, 0x03, 0x00, 0x00, 0x31, 0x3F, 0x00, 0x00, //
];

/// Offset of the 4-byte slice answering the short vendor probe
const HANDSHAKE_PROBE_OFFSET: usize = 0x10;

/// Configuration descriptor: one interface (FF/5D/01), interrupt IN 0x81
/// and interrupt OUT 0x01, 32-byte packets
const CONFIGURATION_DESCRIPTOR: [u8; 32] = [
    0x09, 0x02, 0x20, 0x00, 0x01, 0x01, 0x00, 0xA0, 0xFA, // configuration
    0x09, 0x04, 0x00, 0x00, 0x02, 0xFF, 0x5D, 0x01, 0x00, // interface
    0x07, 0x05, 0x81, 0x03, 0x20, 0x00, 0x04, // endpoint IN
    0x07, 0x05, 0x01, 0x03, 0x20, 0x00, 0x08, // endpoint OUT
];

const MANUFACTURER: &str = "Microsoft Corporation";
const PRODUCT: &str = "Controller";

pub(super) fn prepare_pdo(identity: &DeviceIdentity) -> Result<PdoDescription, CreationError> {
    require_nonzero_ids(identity)?;
    Ok(PdoDescription {
        device_id: hardware_id(identity),
        description: "Virtual Xbox 360 Controller".to_string(),
    })
}

/// Per-device XUSB context
#[derive(Debug)]
pub struct XusbContext {
    vendor_id: u16,
    product_id: u16,
    serial: u32,
    owner_process_id: u32,
    assigned: bool,
    handshake_blob: [u8; 40],
}

impl XusbContext {
    pub(super) fn allocate() -> Self {
        Self {
            vendor_id: 0,
            product_id: 0,
            serial: 0,
            owner_process_id: 0,
            assigned: false,
            handshake_blob: HANDSHAKE_BLOB,
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
            "xusb context assigned"
        );
        Ok(())
    }

    pub(super) fn prepare_hardware(&mut self) -> Result<(), PrepareError> {
        if !self.assigned {
            return Err(PrepareError::ContextNotAssigned {
                family: TargetFamily::Xbox360Wired,
            });
        }
        Ok(())
    }

    /// The 4-byte slice answering the short vendor probe
    pub fn handshake_probe(&self) -> [u8; 4] {
        let mut probe = [0u8; 4];
        probe.copy_from_slice(
            &self.handshake_blob[HANDSHAKE_PROBE_OFFSET..HANDSHAKE_PROBE_OFFSET + 4],
        );
        probe
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
        // XUSB is a vendor protocol; class traffic from generic host
        // drivers is acknowledged without effect
        trace!(request, value, "xusb class-interface request acknowledged");
        (CompletionCode::Success, Vec::new())
    }

    pub(super) fn interface_descriptor(
        &self,
        descriptor_type: u8,
        _index: u8,
    ) -> (CompletionCode, Vec<u8>) {
        trace!(
            descriptor_type,
            "xusb interface descriptor request acknowledged"
        );
        (CompletionCode::Success, Vec::new())
    }

    /// 18-byte device descriptor with the context's vendor/product ids
    fn device_descriptor(&self) -> Vec<u8> {
        let vid = self.vendor_id.to_le_bytes();
        let pid = self.product_id.to_le_bytes();
        vec![
            0x12, 0x01, 0x00, 0x02, 0xFF, 0xFF, 0xFF, 0x08, // USB 2.0, class FF/FF/FF, ep0 8
            vid[0], vid[1], pid[0], pid[1], 0x14, 0x01, // bcdDevice 1.14
            0x01, 0x02, 0x03, 0x01, // strings, 1 configuration
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assigned_context() -> XusbContext {
        let mut ctx = XusbContext::allocate();
        ctx.assign(&DeviceIdentity {
            serial: 7,
            family: TargetFamily::Xbox360Wired,
            vendor_id: 0x045E,
            product_id: 0x028E,
            owner_process_id: 42,
        })
        .unwrap();
        ctx
    }

    #[test]
    fn test_device_descriptor_carries_identity_ids() {
        let desc = assigned_context().device_descriptor();

        assert_eq!(desc.len(), 0x12);
        assert_eq!(desc[0], 0x12);
        assert_eq!(desc[1], descriptor_type::DEVICE);
        assert_eq!(&desc[8..12], &[0x5E, 0x04, 0x8E, 0x02]);
    }

    #[test]
    fn test_configuration_descriptor_total_length() {
        let desc = CONFIGURATION_DESCRIPTOR;
        let total = u16::from_le_bytes([desc[2], desc[3]]) as usize;
        assert_eq!(total, desc.len());
        // One interface, two endpoints
        assert_eq!(desc[4], 1);
        assert_eq!(desc[13], 2);
    }

    #[test]
    fn test_handshake_probe_slice() {
        let probe = assigned_context().handshake_probe();
        assert_eq!(
            probe,
            [
                HANDSHAKE_BLOB[HANDSHAKE_PROBE_OFFSET],
                HANDSHAKE_BLOB[HANDSHAKE_PROBE_OFFSET + 1],
                HANDSHAKE_BLOB[HANDSHAKE_PROBE_OFFSET + 2],
                HANDSHAKE_BLOB[HANDSHAKE_PROBE_OFFSET + 3],
            ]
        );
    }

    #[test]
    fn test_prepare_hardware_requires_assignment() {
        let mut ctx = XusbContext::allocate();
        assert!(ctx.prepare_hardware().is_err());

        let mut ctx = assigned_context();
        assert!(ctx.prepare_hardware().is_ok());
    }

    #[test]
    fn test_string_table_indexes() {
        let ctx = assigned_context();
        assert!(ctx.descriptor(descriptor_type::STRING, 0, 0x0409).is_some());
        assert!(ctx.descriptor(descriptor_type::STRING, 3, 0x0409).is_some());
        assert!(ctx.descriptor(descriptor_type::STRING, 9, 0x0409).is_none());
    }
}
